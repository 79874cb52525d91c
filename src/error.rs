//! Client-level error types shared across the interceptor chain, coordinator, and seal engine.

// self
use crate::{_prelude::*, classify::BusinessError, request::Response};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request sealing failed; the request was never sent.
	#[error(transparent)]
	Encryption(#[from] EncryptionError),

	/// Backend answered with a status outside `[200, 400)`.
	#[error("Request failed with status code {}.", .0.status)]
	Status(Box<Response>),
	/// Business envelope reported a non-success code.
	#[error("Request failed with business code {}: {}.", .0.code, .0.message)]
	Business(BusinessError),
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
	/// Final payload could not be decoded into the requested type.
	#[error("Response payload could not be decoded.")]
	Decode {
		/// Structured decoding failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// External refresh function failed.
	#[error("Token refresh failed: {reason}.")]
	Refresh {
		/// Caller-supplied reason string.
		reason: String,
	},
}
impl Error {
	/// Returns the HTTP status associated with the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(response) => Some(response.status),
			Self::Business(business) => Some(business.status),
			_ => None,
		}
	}

	/// Returns a server-provided message (`error`, then `message`), if the failure carries a
	/// payload that has one.
	pub fn payload_message(&self) -> Option<&str> {
		let payload = match self {
			Self::Status(response) => &response.body,
			Self::Business(business) => return Some(business.message.as_str()),
			_ => return None,
		};

		["error", "message"]
			.into_iter()
			.filter_map(|field| payload.get(field).and_then(Value::as_str))
			.find(|message| !message.is_empty())
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or joined request URL cannot be parsed.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// URL text that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Public key PEM could not be decoded.
	#[error("Public key is not a valid PKCS#1 or SPKI PEM document.")]
	InvalidPublicKey {
		/// Underlying decoding failure.
		#[source]
		source: BoxError,
	},
	/// Configuration document does not match the expected shape.
	#[error("Configuration is invalid.")]
	Parse {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Object storage settings lack a required field.
	#[error("Storage configuration is missing `{field}`.")]
	MissingStorageField {
		/// PascalCase name of the missing field.
		field: &'static str,
	},
	/// A required collaborator was not supplied to the builder.
	#[error("Client builder is missing the {collaborator}.")]
	MissingCollaborator {
		/// Name of the missing collaborator.
		collaborator: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network Error: {source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The per-request timeout elapsed.
	#[error("Request timeout exceeded.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Failures raised by the chunked encryption primitive or the signer.
#[derive(Debug, ThisError)]
pub enum EncryptionError {
	/// The cipher rejected one chunk; the whole request build is aborted.
	#[error("Encrypting the chunk at byte offset {offset} failed.")]
	Chunk {
		/// Byte offset of the failing chunk inside the normalized plaintext.
		offset: usize,
		/// Cipher-specific failure.
		#[source]
		source: BoxError,
	},
	/// The cipher's per-operation limit cannot hold a single UTF-8 character.
	#[error("Chunk limit of {limit} bytes cannot hold a UTF-8 character.")]
	ChunkLimitTooSmall {
		/// Configured limit in bytes.
		limit: usize,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
	/// HMAC key was rejected.
	#[error("Signing key is invalid.")]
	InvalidSigningKey,
	/// Ciphertext is not valid base64.
	#[error("Ciphertext is not valid base64.")]
	Base64(#[from] base64::DecodeError),
	/// Ciphertext length is not a multiple of the key size.
	#[error("Ciphertext of {len} bytes is not a multiple of the {block}-byte block size.")]
	Misaligned {
		/// Decoded ciphertext length.
		len: usize,
		/// Expected block size.
		block: usize,
	},
	/// A ciphertext block could not be decrypted.
	#[error("Decrypting the block at byte offset {offset} failed.")]
	Decrypt {
		/// Byte offset of the failing block.
		offset: usize,
		/// Cipher-specific failure.
		#[source]
		source: BoxError,
	},
	/// Decrypted plaintext is not valid UTF-8.
	#[error("Decrypted plaintext is not valid UTF-8.")]
	Utf8(#[from] std::string::FromUtf8Error),
}
impl EncryptionError {
	/// Wraps a cipher failure for the chunk starting at `offset`.
	pub fn chunk(offset: usize, src: impl Into<BoxError>) -> Self {
		Self::Chunk { offset, source: src.into() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn transport_errors_chain_their_source() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
		let error: Error = TransportError::network(io).into();

		assert!(error.to_string().contains("Network Error"));
		assert!(StdError::source(&error).is_some());
		assert_eq!(error.status(), None);
	}

	#[test]
	fn business_errors_expose_status_and_message() {
		let error = Error::Business(BusinessError {
			status: 200,
			code: Value::from(1001),
			message: "参数错误".into(),
			payload: serde_json::json!({ "code": 1001, "msg": "参数错误" }),
		});

		assert_eq!(error.status(), Some(200));
		assert_eq!(error.payload_message(), Some("参数错误"));
		assert!(error.to_string().contains("1001"));
	}
}
