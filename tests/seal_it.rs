#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use request_seal::{
	_preludet::*,
	config::{ClientConfig, RefreshPath},
	interceptor::FailureKind,
	seal::SECURITY_HEADER,
};

#[tokio::test]
async fn sealed_post_carries_secure_header_and_ciphertext() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/basic/v1/user/save")
				.header("content-type", "application/json")
				.header_exists(SECURITY_HEADER.to_ascii_lowercase());
			then.status(200).json_body(json!({ "code": 0, "data": true }));
		})
		.await;
	let client = build_reqwest_test_client(&server.base_url())
		.refresher(|| async { Ok::<_, Error>("unused".to_owned()) })
		.reauthenticator(|| async { Ok::<_, Error>(()) })
		.sealer(test_sealer())
		.build()
		.expect("Client should build against the mock server.");
	let saved = client
		.post::<bool, _>("/basic/v1/user/save", &json!({ "name": "张三", "tags": ["a"] }))
		.await
		.expect("Sealed request should be accepted.");

	mock.assert_calls_async(1).await;

	assert!(saved);
}

#[tokio::test]
async fn failures_are_reported_with_server_message() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/basic/v1/user/missing");
			then.status(404).json_body(json!({ "message": "user not found" }));
		})
		.await;
	let reported = Arc::new(Mutex::new(Vec::new()));
	let sink = reported.clone();
	let config = ClientConfig {
		refresh_path: RefreshPath::Disabled,
		..ClientConfig::new(Url::parse(&server.base_url()).expect("Mock server URL should parse."))
	};
	let client = build_reqwest_test_client_with(config)
		.reporter(move |message, error| {
			sink.lock().push((
				FailureKind::of(error),
				error.payload_message().unwrap_or(message).to_owned(),
			));
		})
		.build()
		.expect("Client should build against the mock server.");
	let error = client
		.get::<Value>("/basic/v1/user/missing")
		.await
		.expect_err("A 404 should reject.");

	mock.assert_async().await;

	assert_eq!(error.status(), Some(404));
	assert_eq!(*reported.lock(), [(FailureKind::NotFound, "user not found".to_owned())]);
}
