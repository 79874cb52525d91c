#![cfg(feature = "reqwest")]

// std
use std::{
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use request_seal::{
	_preludet::*,
	auth::{MemoryTokenContext, TokenContext},
	client::RequestClient,
	config::{ClientConfig, RefreshPath},
};

#[derive(Debug, PartialEq, Deserialize)]
struct UserInfo {
	id: u64,
	name: String,
}

fn client(
	server: &MockServer,
	tokens: &MemoryTokenContext,
	refreshes: &Arc<AtomicUsize>,
	logouts: &Arc<AtomicUsize>,
	refresh_delay: StdDuration,
) -> RequestClient {
	let config =
		ClientConfig::new(Url::parse(&server.base_url()).expect("Mock server URL should parse."));

	client_with(config, tokens, refreshes, logouts, refresh_delay)
}

fn client_with(
	config: ClientConfig,
	tokens: &MemoryTokenContext,
	refreshes: &Arc<AtomicUsize>,
	logouts: &Arc<AtomicUsize>,
	refresh_delay: StdDuration,
) -> RequestClient {
	let refreshes = refreshes.clone();
	let logouts = logouts.clone();

	build_reqwest_test_client_with(config)
		.tokens(tokens.clone())
		.refresher(move || {
			let refreshes = refreshes.clone();

			async move {
				tokio::time::sleep(refresh_delay).await;
				refreshes.fetch_add(1, Ordering::SeqCst);

				Ok::<_, Error>("fresh".to_owned())
			}
		})
		.reauthenticator(move || {
			let logouts = logouts.clone();

			async move {
				logouts.fetch_add(1, Ordering::SeqCst);

				Ok::<_, Error>(())
			}
		})
		.build()
		.expect("Client should build against the mock server.")
}

#[tokio::test]
async fn refresh_code_reissues_request_with_new_token() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/info").header("authorization", "stale");
			then.status(200).json_body(json!({ "code": 1004, "msg": "刷新token" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/info").header("authorization", "fresh");
			then.status(200)
				.json_body(json!({ "code": 0, "msg": "ok", "data": { "id": 1, "name": "admin" } }));
		})
		.await;
	let tokens = MemoryTokenContext::with_token("stale");
	let refreshes = Arc::new(AtomicUsize::new(0));
	let logouts = Arc::new(AtomicUsize::new(0));
	let client = client(&server, &tokens, &refreshes, &logouts, StdDuration::ZERO);
	let user = client
		.get::<UserInfo>("/basic/v1/user/info")
		.await
		.expect("The reissued request should succeed.");

	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert_eq!(user, UserInfo { id: 1, name: "admin".into() });
	assert_eq!(refreshes.load(Ordering::SeqCst), 1);
	assert_eq!(logouts.load(Ordering::SeqCst), 0);
	assert_eq!(tokens.get_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn relogin_code_logs_out_without_retry() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/info");
			then.status(200).json_body(json!({ "code": 1003, "msg": "信息过期, 请重新登录" }));
		})
		.await;
	let tokens = MemoryTokenContext::with_token("expired");
	let refreshes = Arc::new(AtomicUsize::new(0));
	let logouts = Arc::new(AtomicUsize::new(0));
	let client = client(&server, &tokens, &refreshes, &logouts, StdDuration::ZERO);
	let error = client
		.get::<UserInfo>("/basic/v1/user/info")
		.await
		.expect_err("A relogin response is a business failure for the caller.");

	mock.assert_calls_async(1).await;

	let Error::Business(business) = error else {
		panic!("Expected a business error, got {error:?}.");
	};

	assert_eq!(business.code, json!(1003));
	assert_eq!(refreshes.load(Ordering::SeqCst), 0);
	assert_eq!(logouts.load(Ordering::SeqCst), 1);
	assert_eq!(tokens.get_token(), None);
}

#[tokio::test]
async fn concurrent_refresh_codes_share_one_refresh() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "stale");
			then.status(200).json_body(json!({ "code": 1004, "msg": "刷新token" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "fresh");
			then.status(200).json_body(json!({ "code": 0, "data": { "id": 2, "name": "queued" } }));
		})
		.await;
	let tokens = MemoryTokenContext::with_token("stale");
	let refreshes = Arc::new(AtomicUsize::new(0));
	let logouts = Arc::new(AtomicUsize::new(0));
	let client =
		client(&server, &tokens, &refreshes, &logouts, StdDuration::from_millis(500));
	let (first, second) = tokio::join!(
		client.get::<UserInfo>("/basic/v1/user/info"),
		client.get::<UserInfo>("/basic/v1/user/profile"),
	);

	assert_eq!(first.expect("Leader should succeed.").name, "queued");
	assert_eq!(second.expect("Queued request should succeed.").name, "queued");
	assert_eq!(refreshes.load(Ordering::SeqCst), 1);

	stale.assert_calls_async(2).await;
	fresh.assert_calls_async(2).await;

	let coordinator = client.coordinator().expect("Business refresh wires a coordinator.");

	assert_eq!(coordinator.metrics.attempts(), 1);
	assert_eq!(coordinator.metrics.queued(), 1);
	assert!(!coordinator.is_refreshing());
}

#[tokio::test]
async fn repeated_refresh_code_is_not_retried_twice() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/info");
			then.status(200).json_body(json!({ "code": 1004, "msg": "刷新token" }));
		})
		.await;
	let tokens = MemoryTokenContext::with_token("stale");
	let refreshes = Arc::new(AtomicUsize::new(0));
	let logouts = Arc::new(AtomicUsize::new(0));
	let client = client(&server, &tokens, &refreshes, &logouts, StdDuration::ZERO);
	let error = client
		.get::<UserInfo>("/basic/v1/user/info")
		.await
		.expect_err("A second refresh code surfaces to the caller.");

	mock.assert_calls_async(2).await;

	assert!(matches!(error, Error::Business(_)));
	assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthorized_status_refreshes_and_reissues() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/info").header("authorization", "stale");
			then.status(401).json_body(json!({ "message": "token expired" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/info").header("authorization", "fresh");
			then.status(200).json_body(json!({ "code": 0, "data": { "id": 3, "name": "http" } }));
		})
		.await;
	let tokens = MemoryTokenContext::with_token("stale");
	let refreshes = Arc::new(AtomicUsize::new(0));
	let logouts = Arc::new(AtomicUsize::new(0));
	let config = ClientConfig {
		refresh_path: RefreshPath::Unauthorized,
		..ClientConfig::new(Url::parse(&server.base_url()).expect("Mock server URL should parse."))
	};
	let client = client_with(config, &tokens, &refreshes, &logouts, StdDuration::ZERO);
	let user = client
		.get::<UserInfo>("/basic/v1/user/info")
		.await
		.expect("The reissued request should succeed.");

	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert_eq!(user, UserInfo { id: 3, name: "http".into() });
	assert_eq!(refreshes.load(Ordering::SeqCst), 1);
	assert_eq!(logouts.load(Ordering::SeqCst), 0);
	assert_eq!(tokens.get_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn unauthorized_status_without_refresh_logs_out() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/info");
			then.status(401).json_body(json!({ "message": "token expired" }));
		})
		.await;
	let tokens = MemoryTokenContext::with_token("stale");
	let refreshes = Arc::new(AtomicUsize::new(0));
	let logouts = Arc::new(AtomicUsize::new(0));
	let config = ClientConfig {
		refresh_path: RefreshPath::Unauthorized,
		enable_refresh_token: false,
		..ClientConfig::new(Url::parse(&server.base_url()).expect("Mock server URL should parse."))
	};
	let client = client_with(config, &tokens, &refreshes, &logouts, StdDuration::ZERO);
	let error = client
		.get::<UserInfo>("/basic/v1/user/info")
		.await
		.expect_err("A 401 without refresh rejects.");

	mock.assert_calls_async(1).await;

	assert_eq!(error.status(), Some(401));
	assert_eq!(refreshes.load(Ordering::SeqCst), 0);
	assert_eq!(logouts.load(Ordering::SeqCst), 1);
	assert_eq!(tokens.get_token(), None);
}
