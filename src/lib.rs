//! Sealed request pipeline for authenticated backends: an ordered interceptor chain, a
//! single-flight credential refresh coordinator, and signed, chunk-encrypted request bodies.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod obs;
pub mod request;
pub mod seal;
pub mod storage;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::OnceLock;
	// crates.io
	use rsa::{RsaPrivateKey, RsaPublicKey, rand_core::OsRng};
	// self
	use crate::{
		error::TransportError,
		http::{Transport, TransportFuture, TransportRequest, TransportResponse},
		seal::{RsaChunkCipher, RsaChunkDecryptor, SecretCode, Sealer},
	};

	/// Secret code shared by seal-related tests.
	pub const TEST_SECRET_CODE: &str = "NTYyYjMyZmEyNmQ4M2ZlMjkzOGNhNzJkYTQ1Yzg4MGU=";

	type Handler =
		dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

	/// In-memory [`Transport`] that answers every call through a handler and records the
	/// requests it saw.
	#[derive(Clone)]
	pub struct ScriptedTransport {
		handler: Arc<Handler>,
		seen: Arc<Mutex<Vec<TransportRequest>>>,
	}
	impl ScriptedTransport {
		/// Builds a transport backed by `handler`.
		pub fn new<F>(handler: F) -> Self
		where
			F: 'static
				+ Send
				+ Sync
				+ Fn(&TransportRequest) -> Result<TransportResponse, TransportError>,
		{
			Self { handler: Arc::new(handler), seen: Default::default() }
		}

		/// Returns every request dispatched so far, in order.
		pub fn requests(&self) -> Vec<TransportRequest> {
			self.seen.lock().clone()
		}
	}
	impl Transport for ScriptedTransport {
		fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
			let result = (self.handler)(&request);

			self.seen.lock().push(request);

			Box::pin(async move { result })
		}
	}

	/// Builds a JSON transport response with the provided status.
	pub fn json_response(status: u16, body: serde_json::Value) -> TransportResponse {
		let mut headers = BTreeMap::new();

		headers.insert("content-type".into(), "application/json".into());

		TransportResponse { status, headers, body: body.to_string().into_bytes() }
	}

	/// Returns a process-wide 512-bit RSA key used by seal tests.
	pub fn test_private_key() -> &'static RsaPrivateKey {
		static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

		KEY.get_or_init(|| {
			RsaPrivateKey::new(&mut OsRng, 512).expect("Failed to generate the RSA test key.")
		})
	}

	/// Chunk cipher bound to [`test_private_key`].
	pub fn test_cipher() -> RsaChunkCipher {
		RsaChunkCipher::new(RsaPublicKey::from(test_private_key()))
	}

	/// Decryptor bound to [`test_private_key`].
	pub fn test_decryptor() -> RsaChunkDecryptor {
		RsaChunkDecryptor::new(test_private_key().clone())
	}

	/// Sealer using the test key and [`TEST_SECRET_CODE`].
	pub fn test_sealer() -> Sealer {
		Sealer::new(Arc::new(test_cipher()), SecretCode::new(TEST_SECRET_CODE))
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport() -> crate::http::ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		crate::http::ReqwestTransport::with_client(client)
	}

	/// Client builder pointed at `base_url` over [`test_reqwest_transport`].
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client(base_url: &str) -> crate::client::RequestClientBuilder {
		build_reqwest_test_client_with(crate::config::ClientConfig::new(
			Url::parse(base_url).expect("Mock server URL should parse."),
		))
	}

	/// Client builder for `config` over [`test_reqwest_transport`].
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client_with(
		config: crate::config::ClientConfig,
	) -> crate::client::RequestClientBuilder {
		crate::client::RequestClient::builder(config).transport(test_reqwest_transport())
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
