//! Response stage reacting to refresh/relogin business codes.

// self
use crate::{
	_prelude::*,
	auth::{AuthCoordinator, Resumption},
	classify::{Classification, Classifier},
	interceptor::{Dispatch, Reply, ResponseStage, StageFuture},
	obs::FlowKind,
	request::{Response, ResponseReturn},
};

/// Drives the Auth Coordinator from business envelope codes.
///
/// Relogin responses trigger re-authentication and are returned unretried. Refresh responses
/// go through the single-flight refresh and are resubmitted once with the new token; a
/// request that was already resubmitted by this stage is returned as-is.
#[derive(Clone, Debug)]
pub struct BusinessRefreshStage {
	classifier: Classifier,
	coordinator: Arc<AuthCoordinator>,
}
impl BusinessRefreshStage {
	/// Creates a stage sharing `coordinator` with the rest of the client.
	pub fn new(classifier: Classifier, coordinator: Arc<AuthCoordinator>) -> Self {
		Self { classifier, coordinator }
	}

	async fn handle(&self, dispatcher: &dyn Dispatch, response: Response) -> Result<Reply> {
		if response.request.response_return == ResponseReturn::Raw {
			return Ok(Reply::Response(response));
		}

		match self.classifier.classify(response.status, &response.body) {
			Classification::BusinessRelogin(_) => {
				self.coordinator.reauthenticate().await?;

				Ok(Reply::Response(response))
			},
			Classification::BusinessRefresh(business) if !response.request.is_business_retry() => {
				let mut request = response.request.clone();

				request.mark_business_retry();

				let token = match self.coordinator.single_flight(FlowKind::BusinessRefresh).await {
					Resumption::Led(Ok(token)) | Resumption::Resumed(token) => token,
					Resumption::Led(Err(_)) => return Err(Error::Business(business)),
				};

				if let Some(authorization) = self.coordinator.format_token(&token) {
					request.set_authorization(Some(authorization));
				}

				dispatcher.dispatch(request).await.map(Reply::Response)
			},
			_ => Ok(Reply::Response(response)),
		}
	}
}
impl ResponseStage for BusinessRefreshStage {
	fn fulfilled<'a>(
		&'a self,
		dispatcher: &'a dyn Dispatch,
		reply: Reply,
	) -> StageFuture<'a, Reply> {
		Box::pin(async move {
			match reply {
				Reply::Response(response) => self.handle(dispatcher, response).await,
				payload => Ok(payload),
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
	use tokio::sync::Notify;
	// self
	use super::*;
	use crate::{
		auth::{MemoryTokenContext, TokenContext},
		request::{AUTHORIZATION, RequestDescriptor},
	};

	/// Answers every dispatch with a success envelope echoing the Authorization header.
	#[derive(Default)]
	struct EchoDispatch {
		calls: Mutex<Vec<RequestDescriptor>>,
	}
	impl Dispatch for EchoDispatch {
		fn dispatch(&self, request: RequestDescriptor) -> StageFuture<'_, Response> {
			self.calls.lock().push(request.clone());

			let body = json!({
				"code": 0,
				"data": request.headers.get(AUTHORIZATION).cloned(),
			});

			Box::pin(async move {
				Ok(Response { status: 200, headers: BTreeMap::new(), body, request })
			})
		}
	}

	fn stage_with(
		tokens: MemoryTokenContext,
		refresh: fn() -> Result<String>,
		logouts: Arc<AtomicUsize>,
	) -> BusinessRefreshStage {
		let logout = move || {
			let logouts = logouts.clone();

			async move {
				logouts.fetch_add(1, Ordering::SeqCst);

				Ok::<_, Error>(())
			}
		};
		let coordinator = AuthCoordinator::new(
			Arc::new(tokens),
			Arc::new(move || async move { refresh() }),
			Arc::new(logout),
		);

		BusinessRefreshStage::new(Classifier::default(), Arc::new(coordinator))
	}

	fn response(body: Value, request: RequestDescriptor) -> Reply {
		Reply::Response(Response { status: 200, headers: BTreeMap::new(), body, request })
	}

	fn refresh_trigger() -> Reply {
		response(json!({ "code": 1004, "msg": "刷新token" }), RequestDescriptor::get("/x"))
	}

	async fn wait_until(mut condition: impl FnMut() -> bool) {
		while !condition() {
			tokio::task::yield_now().await;
		}
	}

	#[tokio::test]
	async fn refresh_code_resubmits_with_new_token() {
		let tokens = MemoryTokenContext::with_token("stale");
		let stage = stage_with(tokens.clone(), || Ok("fresh".into()), Default::default());
		let dispatcher = EchoDispatch::default();
		let reply = stage
			.fulfilled(&dispatcher, refresh_trigger())
			.await
			.expect("Refresh should succeed.");
		let response = reply.into_response().expect("The resubmission yields a response.");
		let calls = dispatcher.calls.lock();

		assert_eq!(response.body["data"], json!("fresh"));
		assert_eq!(calls.len(), 1);
		assert!(calls[0].is_business_retry());
		assert_eq!(tokens.get_token().as_deref(), Some("fresh"));
	}

	#[tokio::test]
	async fn retried_request_is_returned_as_is() {
		let stage =
			stage_with(MemoryTokenContext::default(), || Ok("fresh".into()), Default::default());
		let dispatcher = EchoDispatch::default();
		let mut request = RequestDescriptor::get("/x");

		request.mark_business_retry();

		let body = json!({ "code": 1004, "msg": "刷新token" });
		let reply = stage
			.fulfilled(&dispatcher, response(body.clone(), request))
			.await
			.expect("A retried response passes through.");

		assert_eq!(reply.into_value(), body);
		assert!(dispatcher.calls.lock().is_empty());
		assert_eq!(stage.coordinator.metrics.attempts(), 0);
	}

	#[tokio::test]
	async fn relogin_code_reauthenticates_without_retry() {
		let logouts = Arc::new(AtomicUsize::new(0));
		let tokens = MemoryTokenContext::with_token("t");
		let stage = stage_with(tokens.clone(), || Ok("unused".into()), logouts.clone());
		let dispatcher = EchoDispatch::default();
		let reply = stage
			.fulfilled(
				&dispatcher,
				response(
					json!({ "code": 1003, "msg": "信息过期, 请重新登录" }),
					RequestDescriptor::get("/x"),
				),
			)
			.await
			.expect("Relogin returns the response.");

		assert!(reply.into_response().is_some());
		assert_eq!(logouts.load(Ordering::SeqCst), 1);
		assert_eq!(tokens.get_token(), None);
		assert!(dispatcher.calls.lock().is_empty());
	}

	#[tokio::test]
	async fn failed_refresh_surfaces_original_response() {
		let stage = stage_with(
			MemoryTokenContext::with_token("stale"),
			|| Err(Error::Refresh { reason: "denied".into() }),
			Default::default(),
		);
		let dispatcher = EchoDispatch::default();
		let error = stage
			.fulfilled(&dispatcher, refresh_trigger())
			.await
			.expect_err("A failed refresh rejects.");
		let Error::Business(business) = error else {
			panic!("Expected the original business failure.");
		};

		assert_eq!(business.code, json!(1004));
		assert!(dispatcher.calls.lock().is_empty());
		assert!(!stage.coordinator.is_refreshing());
	}

	#[tokio::test]
	async fn queued_caller_resumes_after_failed_refresh() {
		let gate = Arc::new(Notify::new());
		let refresher = {
			let gate = gate.clone();

			move || {
				let gate = gate.clone();

				async move {
					gate.notified().await;

					Err::<String, _>(Error::Refresh { reason: "denied".into() })
				}
			}
		};
		let tokens = MemoryTokenContext::with_token("stale");
		let coordinator = Arc::new(AuthCoordinator::new(
			Arc::new(tokens.clone()),
			Arc::new(refresher),
			Arc::new(|| async { Ok::<_, Error>(()) }),
		));
		let stage = Arc::new(BusinessRefreshStage::new(Classifier::default(), coordinator.clone()));
		let dispatcher = Arc::new(EchoDispatch::default());
		let spawn_call = || {
			let stage = stage.clone();
			let dispatcher = dispatcher.clone();

			tokio::spawn(async move { stage.fulfilled(&*dispatcher, refresh_trigger()).await })
		};
		let leader = spawn_call();

		wait_until(|| coordinator.is_refreshing()).await;

		let follower = spawn_call();

		wait_until(|| coordinator.pending() == 1).await;
		gate.notify_one();

		let leader = leader.await.expect("Leader task should not panic.");
		let follower = follower
			.await
			.expect("Follower task should not panic.")
			.expect("The follower is resubmitted once.")
			.into_response()
			.expect("The resubmission yields a response.");
		let calls = dispatcher.calls.lock();

		assert!(matches!(leader, Err(Error::Business(_))));
		assert_eq!(follower.body["data"], Value::Null);
		assert_eq!(calls.len(), 1);
		assert!(calls[0].is_business_retry());
		assert_eq!(calls[0].authorization(), None);
		assert_eq!(coordinator.metrics.failures(), 1);
		assert_eq!(coordinator.metrics.queued(), 1);
		assert!(!coordinator.is_refreshing());
		assert_eq!(tokens.get_token().as_deref(), Some("stale"));
	}
}
