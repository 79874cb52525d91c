//! Transport Core primitives.
//!
//! The pipeline issues every network call through [`Transport`], which is its only dependency
//! on an HTTP stack. Implementations return a [`TransportResponse`] for any status the server
//! produced and fail only when no response exists at all (network, timeout, IO). Status
//! validation and envelope handling live above this layer.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::TransportError, request::Method};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Issues one network call.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// every clone of a client and by resubmissions issued from the refresh coordinator.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with whatever response the server produced.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Fully prepared request handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Header mapping.
	pub headers: BTreeMap<String, String>,
	/// Wire body, if any.
	pub body: Option<Vec<u8>>,
	/// Per-request timeout.
	pub timeout: Option<StdDuration>,
}
impl TransportRequest {
	/// Returns the body as UTF-8 text, if it is valid UTF-8.
	pub fn body_text(&self) -> Option<&str> {
		self.body.as_deref().and_then(|bytes| std::str::from_utf8(bytes).ok())
	}
}

/// Raw response captured by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lowercase names.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with a default timeout applied to every call.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(reqwest_method(request.method), request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
		Method::Head => reqwest::Method::HEAD,
		Method::Options => reqwest::Method::OPTIONS,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn body_text_requires_utf8() {
		let mut request = TransportRequest {
			method: Method::Post,
			url: Url::parse("https://api.example.com/x").expect("Fixture URL should parse."),
			headers: BTreeMap::new(),
			body: Some(b"sealed".to_vec()),
			timeout: None,
		};

		assert_eq!(request.body_text(), Some("sealed"));

		request.body = Some(vec![0xff, 0xfe]);

		assert_eq!(request.body_text(), None);
	}
}
