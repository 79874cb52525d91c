//! UTF-8 safe normalization and chunking.

// std
use std::borrow::Cow;
// self
use crate::error::EncryptionError;

/// Replaces every character outside the Basic Multilingual Plane with `&#<code point>;`.
///
/// Returns the input unchanged (borrowed) when it has no such character.
pub fn escape_astral(input: &str) -> Cow<'_, str> {
	if input.chars().all(|ch| ch.len_utf16() == 1) {
		return Cow::Borrowed(input);
	}

	let mut escaped = String::with_capacity(input.len() + 8);

	for ch in input.chars() {
		if ch.len_utf16() == 1 {
			escaped.push(ch);
		} else {
			escaped.push_str("&#");
			escaped.push_str(&u32::from(ch).to_string());
			escaped.push(';');
		}
	}

	Cow::Owned(escaped)
}

/// Splits `input` into the fewest chunks of at most `limit` bytes, never cutting a character.
///
/// Chunks are accumulated greedily, character by character. Empty input yields no chunks.
pub fn split_chunks(input: &str, limit: usize) -> Result<Vec<&str>, EncryptionError> {
	let mut chunks = Vec::with_capacity(input.len() / limit.max(1) + 1);
	let mut start = 0;

	for (index, ch) in input.char_indices() {
		let width = ch.len_utf8();

		if width > limit {
			return Err(EncryptionError::ChunkLimitTooSmall { limit });
		}
		if index + width - start > limit {
			chunks.push(&input[start..index]);
			start = index;
		}
	}

	if start < input.len() {
		chunks.push(&input[start..]);
	}

	Ok(chunks)
}
