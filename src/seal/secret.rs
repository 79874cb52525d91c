//! Project secret wrapper that redacts sensitive material.

// self
use crate::_prelude::*;

/// Static project secret used as HMAC key and sent in the secure header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretCode(String);
impl SecretCode {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for SecretCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SecretCode").field(&"<redacted>").finish()
	}
}
impl Display for SecretCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
