//! Signing & Encryption Engine.
//!
//! Every outbound request gets a secure header of the form
//! `key=<secret-code>;secret=<encrypted-project-key>;signature=<hmac>`. Mutating requests
//! (`POST`, `PUT`, `PATCH`) additionally have their JSON body replaced by its chunk-encrypted
//! base64 form; other methods send no body. The signature covers the timestamp, method, path,
//! query string, and the SHA-256 of the body actually sent.

mod chunk;
mod cipher;
mod pairs;
mod secret;
mod sign;

pub use chunk::*;
pub use cipher::*;
pub use pairs::*;
pub use secret::*;
pub use sign::*;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	error::EncryptionError,
	interceptor::{RequestStage, StageFuture},
	request::{Body, RequestDescriptor},
};

/// Default name of the secure header.
pub const SECURITY_HEADER: &str = "X-Content-Security";
/// Content type forced on sealed requests.
pub const CONTENT_TYPE: &str = "content-type";

/// Builds secure headers and encrypted bodies.
#[derive(Clone)]
pub struct Sealer {
	cipher: Arc<dyn ChunkCipher>,
	secret: SecretCode,
	header_name: String,
}
impl Sealer {
	/// Creates a sealer using `cipher` for encryption and `secret` for signing.
	pub fn new(cipher: Arc<dyn ChunkCipher>, secret: SecretCode) -> Self {
		Self { cipher, secret, header_name: SECURITY_HEADER.into() }
	}

	/// Overrides the secure header name.
	pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
		self.header_name = name.into();

		self
	}

	/// Name of the header written by [`Self::seal`].
	pub fn header_name(&self) -> &str {
		&self.header_name
	}

	/// Encrypts `plaintext` with the configured cipher.
	pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
		cipher::encrypt(self.cipher.as_ref(), plaintext)
	}

	/// Encrypts the ephemeral `type=0;key=<base64 secret>;time=<timestamp>` blob.
	pub fn project_key(&self, timestamp: i64) -> Result<String, EncryptionError> {
		let key = STANDARD.encode(self.secret.expose());
		let time = timestamp.to_string();

		self.encrypt(&join_pairs(&[("type", "0"), ("key", &key), ("time", &time)]))
	}

	/// Seals `request` in place for `timestamp`.
	///
	/// A POST signs an empty query and the ciphertext it sends. Other methods sign their query
	/// string and the empty-string hash; a body they carry is passed through as is.
	///
	/// On error the request is left without a secure header and must not be sent.
	pub fn seal(
		&self,
		request: &mut RequestDescriptor,
		timestamp: i64,
	) -> Result<(), EncryptionError> {
		let secret = self.project_key(timestamp)?;
		let (query, body) = if request.method.is_mutating() {
			let plaintext = match request.body.take() {
				Some(Body::Json(value)) => serde_json::to_string(&value)?,
				Some(Body::Text(text)) => serde_json::to_string(&text)?,
				None => "{}".to_owned(),
			};

			(String::new(), Some(self.encrypt(&plaintext)?))
		} else {
			(request.query_string(), None)
		};
		let signature = SigningContext::new(
			timestamp,
			request.method,
			request.path.as_str(),
			query,
			body.as_deref(),
		)
		.sign(&self.secret)?;
		let header = join_pairs(&[
			("key", self.secret.expose()),
			("secret", &secret),
			("signature", &signature),
		]);

		if let Some(body) = body {
			request.body = Some(Body::Text(body));
		}
		request.headers.insert(self.header_name.clone(), header);
		request.headers.insert(CONTENT_TYPE.into(), "application/json".into());

		Ok(())
	}
}
impl Debug for Sealer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Sealer")
			.field("max_plaintext_len", &self.cipher.max_plaintext_len())
			.field("secret", &self.secret)
			.field("header_name", &self.header_name)
			.finish()
	}
}

/// Request stage that seals every request with the current Unix timestamp.
#[derive(Clone, Debug)]
pub struct SealStage {
	sealer: Sealer,
}
impl SealStage {
	/// Creates a stage backed by `sealer`.
	pub fn new(sealer: Sealer) -> Self {
		Self { sealer }
	}
}
impl RequestStage for SealStage {
	fn on_request(&self, mut request: RequestDescriptor) -> StageFuture<'_, RequestDescriptor> {
		let sealed = self
			.sealer
			.seal(&mut request, OffsetDateTime::now_utc().unix_timestamp())
			.map(|_| request)
			.map_err(Error::from);

		Box::pin(async move { sealed })
	}
}
