//! The request client: interceptor chain + Transport Core.

mod builder;

pub use builder::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::AuthCoordinator,
	config::ClientConfig,
	error::ConfigError,
	http::{Transport, TransportRequest},
	interceptor::{Dispatch, InterceptorChain, Reply, StageFuture},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{Body, Method, RequestDescriptor, Response},
};

/// Issues requests through the interceptor chain.
///
/// Cloning is cheap; clones share the transport, the chain, and the Auth Coordinator.
#[derive(Clone)]
pub struct RequestClient {
	transport: Arc<dyn Transport>,
	base_url: Url,
	chain: Arc<InterceptorChain>,
	timeout: Option<StdDuration>,
	coordinator: Option<Arc<AuthCoordinator>>,
}
impl RequestClient {
	/// Creates a client from already-assembled parts.
	pub fn new(transport: Arc<dyn Transport>, base_url: Url, chain: InterceptorChain) -> Self {
		Self { transport, base_url, chain: Arc::new(chain), timeout: None, coordinator: None }
	}

	/// Returns a builder seeded with `config`.
	pub fn builder(config: ClientConfig) -> RequestClientBuilder {
		RequestClientBuilder::new(config)
	}

	/// Sets the default per-request timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Base URL every request path is appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Registered stages.
	pub fn chain(&self) -> &InterceptorChain {
		&self.chain
	}

	/// Auth Coordinator wired by the builder, if any.
	pub fn coordinator(&self) -> Option<&Arc<AuthCoordinator>> {
		self.coordinator.as_ref()
	}

	/// Runs one logical call: request stages, transport, then every response stage.
	pub async fn request(&self, request: RequestDescriptor) -> Result<Reply> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let state = self.send(request).await.map(Reply::Response);

				self.chain.run_response(self, state).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Runs `request` and decodes the final payload into `T`.
	pub async fn call<T>(&self, request: RequestDescriptor) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.request(request).await?.decode()
	}

	/// `GET path`, decoding the final payload.
	pub async fn get<T>(&self, path: impl Into<String>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(RequestDescriptor::get(path)).await
	}

	/// `POST path` with a JSON body, decoding the final payload.
	pub async fn post<T, B>(&self, path: impl Into<String>, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.call(RequestDescriptor::post(path, serde_json::to_value(body)?)).await
	}

	/// `PUT path` with a JSON body, decoding the final payload.
	pub async fn put<T, B>(&self, path: impl Into<String>, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let request =
			RequestDescriptor::new(Method::Put, path)
				.with_body(Body::Json(serde_json::to_value(body)?));

		self.call(request).await
	}

	/// `DELETE path`, decoding the final payload.
	pub async fn delete<T>(&self, path: impl Into<String>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(RequestDescriptor::new(Method::Delete, path)).await
	}

	/// Joins the base URL, `path`, and the query string.
	pub fn url_for(&self, request: &RequestDescriptor) -> Result<Url, ConfigError> {
		let absolute =
			request.path.starts_with("http://") || request.path.starts_with("https://");
		let joined = if absolute {
			request.path.clone()
		} else {
			format!(
				"{}/{}",
				self.base_url.as_str().trim_end_matches('/'),
				request.path.trim_start_matches('/')
			)
		};
		let mut url = Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidUrl { url: joined.clone(), source })?;
		let query = request.query_string();

		if !query.is_empty() {
			url.set_query(Some(&query));
		}

		Ok(url)
	}

	async fn send(&self, request: RequestDescriptor) -> Result<Response> {
		let prepared = self.chain.run_request(request.clone()).await?;
		let url = self.url_for(&prepared)?;
		let body = prepared.body.as_ref().map(Body::to_bytes).transpose()?;
		let raw = self
			.transport
			.send(TransportRequest {
				method: prepared.method,
				url,
				headers: prepared.headers,
				body,
				timeout: prepared.timeout.or(self.timeout),
			})
			.await?;
		let response = Response::decode(raw, request);

		if response.is_transport_success() {
			Ok(response)
		} else {
			Err(Error::Status(Box::new(response)))
		}
	}
}
impl Debug for RequestClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClient")
			.field("base_url", &self.base_url.as_str())
			.field("chain", &self.chain)
			.field("timeout", &self.timeout)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
impl Dispatch for RequestClient {
	fn dispatch(&self, request: RequestDescriptor) -> StageFuture<'_, Response> {
		Box::pin(self.send(request))
	}
}
