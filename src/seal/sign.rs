//! Canonical signing string and HMAC-SHA256 signature.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
// self
use crate::{error::EncryptionError, request::Method, seal::SecretCode};

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
	hex::encode(Sha256::digest(input.as_bytes()))
}

/// Attributes covered by the request signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningContext {
	/// Unix timestamp in seconds.
	pub timestamp: i64,
	/// Request method.
	pub method: Method,
	/// Request path as sent.
	pub path: String,
	/// Canonical query string (empty when there are no params).
	pub query: String,
	/// Lowercase hex SHA-256 of the sent body, or of `""` when no body is sent.
	pub body_hash: String,
}
impl SigningContext {
	/// Builds a context, hashing `body` (or the empty string when absent).
	pub fn new(
		timestamp: i64,
		method: Method,
		path: impl Into<String>,
		query: impl Into<String>,
		body: Option<&str>,
	) -> Self {
		Self {
			timestamp,
			method,
			path: path.into(),
			query: query.into(),
			body_hash: sha256_hex(body.unwrap_or_default()),
		}
	}

	/// `timestamp`, `METHOD`, `path`, `query`, and `body_hash` joined by `\n`.
	pub fn canonical(&self) -> String {
		format!(
			"{}\n{}\n{}\n{}\n{}",
			self.timestamp, self.method, self.path, self.query, self.body_hash
		)
	}

	/// Base64 HMAC-SHA256 of [`Self::canonical`] keyed by `secret`.
	pub fn sign(&self, secret: &SecretCode) -> Result<String, EncryptionError> {
		let mut mac = HmacSha256::new_from_slice(secret.expose().as_bytes())
			.map_err(|_| EncryptionError::InvalidSigningKey)?;

		mac.update(self.canonical().as_bytes());

		Ok(STANDARD.encode(mac.finalize().into_bytes()))
	}
}
