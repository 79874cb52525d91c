/// Serializes `pairs` as `key=value;key=value` in the given order, without escaping.
pub fn join_pairs(pairs: &[(&str, &str)]) -> String {
	pairs.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join(";")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn pairs_keep_insertion_order() {
		assert_eq!(join_pairs(&[("type", "0"), ("key", "a=b"), ("time", "1")]), "type=0;key=a=b;time=1");
		assert_eq!(join_pairs(&[]), "");
	}
}
