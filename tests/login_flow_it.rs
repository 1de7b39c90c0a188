#![cfg(feature = "reqwest")]

// std
use std::collections::HashMap;
// crates.io
use httpmock::prelude::*;
// self
use oauth2_login_engine::{
	_preludet::*,
	config::DriverConfig,
	driver::StateCookie,
	error::StateError,
};

fn mock_config(server: &MockServer) -> DriverConfig {
	test_config(
		Url::parse(&server.url("/authorize")).expect("Mock authorize URL should parse."),
		Url::parse(&server.url("/token")).expect("Mock token URL should parse."),
		Url::parse(&server.url("/me")).expect("Mock user-info URL should parse."),
	)
}

fn state_of(url: &Url) -> String {
	url.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("Redirect URL should carry a state parameter.")
}

#[tokio::test]
async fn full_happy_path_yields_a_normalized_user() {
	let server = MockServer::start_async().await;
	let driver = build_reqwest_test_driver(mock_config(&server));
	let issue = driver.redirect().expect("Redirect issuance should succeed.");
	let pairs: HashMap<_, _> = issue.url.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("response_type"), Some(&"code".into()));
	assert_eq!(pairs.get("client_id"), Some(&"client-it".into()));
	assert_eq!(pairs.get("redirect_uri"), Some(&"https://app.example.com/callback".into()));
	assert_eq!(pairs.get("scope"), Some(&"email profile".into()));
	assert!(pairs.contains_key("state"));
	assert!(issue.cookie.header_value().contains("HttpOnly"));

	let nonce = state_of(&issue.url);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok1\",\"token_type\":\"bearer\"}");
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer tok1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"u1\",\"name\":\"Ann\"}");
		})
		.await;
	// Simulated provider callback carrying the code and the round-tripped state.
	let callback = Url::parse(&format!("https://app.example.com/callback?code=xyz&state={nonce}"))
		.expect("Callback URL fixture should parse.");
	let params = driver.callback_params(&callback);

	assert!(!driver.access_denied(&params));

	let user = driver
		.user(&params, Some(&issue.cookie.value))
		.await
		.expect("The full authorization pipeline should succeed.");

	token_mock.assert_async().await;
	user_mock.assert_async().await;

	assert_eq!(user.id, "u1");
	assert_eq!(user.name.as_deref(), Some("Ann"));
	assert_eq!(user.token.token, "tok1");
	assert_eq!(user.token.token_type, "bearer");

	// The host clears the state cookie after the round-trip completes.
	assert!(StateCookie::clearing_header_value("oauth_state").contains("Max-Age=0"));
}

#[tokio::test]
async fn denial_short_circuits_before_any_network_call() {
	let server = MockServer::start_async().await;
	let driver = build_reqwest_test_driver(mock_config(&server));
	let issue = driver.redirect().expect("Redirect issuance should succeed.");
	let callback = Url::parse("https://app.example.com/callback?error=access_denied")
		.expect("Callback URL fixture should parse.");
	let params = driver.callback_params(&callback);

	assert!(driver.access_denied(&params));

	let err = driver
		.user(&params, Some(&issue.cookie.value))
		.await
		.expect_err("Denied callbacks should not proceed to the exchange.");

	assert!(matches!(err, Error::AccessDenied));
}

#[tokio::test]
async fn foreign_state_fails_verification_before_the_exchange() {
	let server = MockServer::start_async().await;
	let driver = build_reqwest_test_driver(mock_config(&server));
	let issue = driver.redirect().expect("Redirect issuance should succeed.");
	let callback = Url::parse("https://app.example.com/callback?code=xyz&state=forged-state")
		.expect("Callback URL fixture should parse.");
	let params = driver.callback_params(&callback);
	let err = driver
		.user(&params, Some(&issue.cookie.value))
		.await
		.expect_err("A foreign state parameter should fail the pipeline.");

	assert!(matches!(err, Error::State(StateError::Mismatch)));

	let err = driver
		.user(&params, None)
		.await
		.expect_err("A missing state cookie should fail the pipeline.");

	assert!(matches!(err, Error::State(StateError::Missing)));
}

#[tokio::test]
async fn state_expires_after_its_ttl_elapses() {
	let server = MockServer::start_async().await;
	let driver = build_reqwest_test_driver(mock_config(&server))
		.with_state_ttl(Duration::minutes(10));
	let issued_at = OffsetDateTime::now_utc();
	let issued = driver.state_manager.issue_state_at(issued_at);
	let err = driver
		.state_manager
		.verify_state_at(
			Some(&issued.cookie_value),
			&issued.nonce,
			issued_at + Duration::minutes(11),
		)
		.expect_err("State older than its TTL should fail verification.");

	assert_eq!(err, StateError::Expired);
}
