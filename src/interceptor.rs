//! Ordered request/response stages composed around the Transport Core.
//!
//! Request stages run in registration order and each receives and returns the
//! [`RequestDescriptor`]. Response stages also run in registration order, threading a
//! `Result<Reply>` through the chain: an `Ok` value goes to the next stage's
//! [`ResponseStage::fulfilled`], an `Err` to its [`ResponseStage::rejected`]. A stage that
//! fails routes control to the rejection handlers after it; a rejection handler that resolves
//! puts the chain back on the success path. Whatever is left after the last stage is what the
//! caller sees.

mod envelope;
mod headers;
mod report;

pub use envelope::*;
pub use headers::*;
pub use report::*;

// self
use crate::{
	_prelude::*,
	request::{RequestDescriptor, Response},
};

/// Boxed future returned by stages and dispatchers.
pub type StageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Value flowing through the response stages.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
	/// Decoded response that no stage has unwrapped yet.
	Response(Response),
	/// Payload produced by an envelope stage.
	Payload(Value),
}
impl Reply {
	/// Returns the payload, or the full decoded body when still a response.
	pub fn into_value(self) -> Value {
		match self {
			Self::Response(response) => response.body,
			Self::Payload(value) => value,
		}
	}

	/// Returns the response, if no stage unwrapped it.
	pub fn into_response(self) -> Option<Response> {
		match self {
			Self::Response(response) => Some(response),
			Self::Payload(_) => None,
		}
	}

	/// Decodes the payload into `T`, reporting the failing JSON path.
	pub fn decode<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(self.into_value())
			.map_err(|source| Error::Decode { source })
	}
}

/// Re-issues a request through the request stages and the Transport Core.
///
/// Response stages receive a dispatcher so they can resubmit a request (e.g., after a
/// credential refresh) without owning the client.
pub trait Dispatch
where
	Self: Send + Sync,
{
	/// Runs request stages on `request`, sends it, and validates the status.
	fn dispatch(&self, request: RequestDescriptor) -> StageFuture<'_, Response>;
}

/// Transforms outbound requests.
pub trait RequestStage
where
	Self: Send + Sync,
{
	/// Receives the descriptor and returns it, possibly mutated.
	fn on_request(&self, request: RequestDescriptor) -> StageFuture<'_, RequestDescriptor>;
}

/// Transforms replies or recovers from failures.
///
/// Both handlers default to passing their input through unchanged.
pub trait ResponseStage
where
	Self: Send + Sync,
{
	/// Handles a successful reply from the previous stage.
	fn fulfilled<'a>(
		&'a self,
		_dispatcher: &'a dyn Dispatch,
		reply: Reply,
	) -> StageFuture<'a, Reply> {
		Box::pin(async move { Ok(reply) })
	}

	/// Handles a failure from the previous stage.
	fn rejected<'a>(
		&'a self,
		_dispatcher: &'a dyn Dispatch,
		error: Error,
	) -> StageFuture<'a, Reply> {
		Box::pin(async move { Err(error) })
	}
}

/// Ordered stage registries.
#[derive(Clone, Default)]
pub struct InterceptorChain {
	request: Vec<Arc<dyn RequestStage>>,
	response: Vec<Arc<dyn ResponseStage>>,
}
impl InterceptorChain {
	/// Appends a request stage.
	pub fn add_request_stage(&mut self, stage: impl 'static + RequestStage) {
		self.request.push(Arc::new(stage));
	}

	/// Appends a response stage.
	pub fn add_response_stage(&mut self, stage: impl 'static + ResponseStage) {
		self.response.push(Arc::new(stage));
	}

	/// Number of registered request stages.
	pub fn request_len(&self) -> usize {
		self.request.len()
	}

	/// Number of registered response stages.
	pub fn response_len(&self) -> usize {
		self.response.len()
	}

	/// Runs every request stage in registration order.
	pub async fn run_request(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor> {
		for stage in &self.request {
			request = stage.on_request(request).await?;
		}

		Ok(request)
	}

	/// Threads `state` through every response stage in registration order.
	pub async fn run_response(
		&self,
		dispatcher: &dyn Dispatch,
		mut state: Result<Reply>,
	) -> Result<Reply> {
		for stage in &self.response {
			state = match state {
				Ok(reply) => stage.fulfilled(dispatcher, reply).await,
				Err(error) => stage.rejected(dispatcher, error).await,
			};
		}

		state
	}
}
impl Debug for InterceptorChain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InterceptorChain")
			.field("request_stages", &self.request.len())
			.field("response_stages", &self.response.len())
			.finish()
	}
}
