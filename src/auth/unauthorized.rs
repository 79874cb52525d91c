//! Response stage reacting to HTTP 401 rejections.

// self
use crate::{
	_prelude::*,
	auth::{AuthCoordinator, Resumption},
	interceptor::{Dispatch, Reply, ResponseStage, StageFuture},
	obs::FlowKind,
	request::Response,
};

const UNAUTHORIZED: u16 = 401;

/// Refreshes the credential once per request when the backend answers 401.
///
/// When refresh is disabled, the request was already retried, or the refresh fails, the
/// session is re-authenticated and the rejection continues down the chain.
#[derive(Clone, Debug)]
pub struct UnauthorizedStage {
	coordinator: Arc<AuthCoordinator>,
	enable_refresh: bool,
}
impl UnauthorizedStage {
	/// Creates a stage sharing `coordinator` with the rest of the client.
	pub fn new(coordinator: Arc<AuthCoordinator>, enable_refresh: bool) -> Self {
		Self { coordinator, enable_refresh }
	}

	async fn handle(&self, dispatcher: &dyn Dispatch, response: Box<Response>) -> Result<Reply> {
		if !self.enable_refresh || response.request.is_http_retry() {
			self.coordinator.reauthenticate().await?;

			return Err(Error::Status(response));
		}

		let mut request = response.request.clone();

		request.mark_http_retry();

		let token = match self.coordinator.single_flight(FlowKind::UnauthorizedRefresh).await {
			Resumption::Led(Ok(token)) | Resumption::Resumed(token) => token,
			Resumption::Led(Err(error)) => {
				self.coordinator.reauthenticate().await?;

				return Err(error);
			},
		};

		request.set_authorization(self.coordinator.format_token(&token));

		dispatcher.dispatch(request).await.map(Reply::Response)
	}
}
impl ResponseStage for UnauthorizedStage {
	fn rejected<'a>(
		&'a self,
		dispatcher: &'a dyn Dispatch,
		error: Error,
	) -> StageFuture<'a, Reply> {
		Box::pin(async move {
			match error {
				Error::Status(response) if response.status == UNAUTHORIZED =>
					self.handle(dispatcher, response).await,
				error => Err(error),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{auth::MemoryTokenContext, request::RequestDescriptor};

	struct OkDispatch(AtomicUsize);
	impl Dispatch for OkDispatch {
		fn dispatch(&self, request: RequestDescriptor) -> StageFuture<'_, Response> {
			self.0.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				Ok(Response {
					status: 200,
					headers: BTreeMap::new(),
					body: json!({ "code": 0, "data": request.authorization() }),
					request,
				})
			})
		}
	}

	fn unauthorized(request: RequestDescriptor) -> Error {
		Error::Status(Box::new(Response {
			status: UNAUTHORIZED,
			headers: BTreeMap::new(),
			body: Value::Null,
			request,
		}))
	}

	fn stage_with(
		enable_refresh: bool,
		refresh: fn() -> Result<String>,
		logouts: Arc<AtomicUsize>,
	) -> UnauthorizedStage {
		let logout = move || {
			let logouts = logouts.clone();

			async move {
				logouts.fetch_add(1, Ordering::SeqCst);

				Ok::<_, Error>(())
			}
		};
		let coordinator = AuthCoordinator::new(
			Arc::new(MemoryTokenContext::with_token("stale")),
			Arc::new(move || async move { refresh() }),
			Arc::new(logout),
		);

		UnauthorizedStage::new(Arc::new(coordinator), enable_refresh)
	}

	#[tokio::test]
	async fn refreshes_and_resubmits_once() {
		let stage = stage_with(true, || Ok("fresh".into()), Default::default());
		let dispatcher = OkDispatch(AtomicUsize::new(0));
		let reply = stage
			.rejected(&dispatcher, unauthorized(RequestDescriptor::get("/x")))
			.await
			.expect("The resubmission succeeds.");
		let response = reply.into_response().expect("The resubmission yields a response.");

		assert_eq!(response.body["data"], json!("fresh"));
		assert!(response.request.is_http_retry());
		assert_eq!(dispatcher.0.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retried_or_disabled_requests_reauthenticate() {
		let logouts = Arc::new(AtomicUsize::new(0));
		let dispatcher = OkDispatch(AtomicUsize::new(0));
		let disabled = stage_with(false, || Ok("unused".into()), logouts.clone());
		let error = disabled
			.rejected(&dispatcher, unauthorized(RequestDescriptor::get("/x")))
			.await
			.expect_err("Disabled refresh rejects.");

		assert_eq!(error.status(), Some(UNAUTHORIZED));

		let enabled = stage_with(true, || Ok("unused".into()), logouts.clone());
		let mut request = RequestDescriptor::get("/x");

		request.mark_http_retry();

		let error = enabled
			.rejected(&dispatcher, unauthorized(request))
			.await
			.expect_err("A retried request rejects.");

		assert_eq!(error.status(), Some(UNAUTHORIZED));
		assert_eq!(logouts.load(Ordering::SeqCst), 2);
		assert_eq!(dispatcher.0.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn failed_refresh_reauthenticates_and_rejects_with_refresh_error() {
		let logouts = Arc::new(AtomicUsize::new(0));
		let stage =
			stage_with(true, || Err(Error::Refresh { reason: "expired".into() }), logouts.clone());
		let dispatcher = OkDispatch(AtomicUsize::new(0));
		let error = stage
			.rejected(&dispatcher, unauthorized(RequestDescriptor::get("/x")))
			.await
			.expect_err("A failed refresh rejects.");

		assert!(matches!(error, Error::Refresh { .. }));
		assert_eq!(logouts.load(Ordering::SeqCst), 1);
		assert_eq!(dispatcher.0.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn other_failures_pass_through() {
		let stage = stage_with(true, || Ok("unused".into()), Default::default());
		let dispatcher = OkDispatch(AtomicUsize::new(0));
		let error = stage
			.rejected(&dispatcher, Error::Refresh { reason: "other".into() })
			.await
			.expect_err("Unrelated failures are not recovered.");

		assert!(matches!(error, Error::Refresh { .. }));
	}
}
