//! Provider redirect URL construction.
//!
//! Builds the authorization endpoint URL the end user is sent to. The engine treats the
//! configured authorize URL as parameter-free and owns every query pair it appends, so a URL
//! that already carries a query string is rejected instead of merged.

// self
use crate::{_prelude::*, config::DriverConfig, error::ConfigError};

/// Composes the provider redirect URL for one authorization attempt.
///
/// Appends `response_type=code`, `client_id`, `redirect_uri`, the joined `scope` value (falling
/// back to the config's default scopes when `requested_scopes` is `None`), the `state` nonce, and
/// any caller-supplied extra pairs. All values are percent-encoded by the URL writer.
pub fn build_redirect_url(
	config: &DriverConfig,
	nonce: &str,
	requested_scopes: Option<&[String]>,
	extra_params: &[(String, String)],
) -> Result<Url, ConfigError> {
	if config.authorize_url.query().is_some() {
		return Err(ConfigError::MalformedAuthorizeUrl { url: config.authorize_url.to_string() });
	}

	let scopes = requested_scopes.unwrap_or(&config.scopes);
	let mut url = config.authorize_url.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", &config.client_id);
	pairs.append_pair("redirect_uri", config.callback_url.as_str());

	if let Some(scope_value) = format_scope(scopes, config.scope_separator) {
		pairs.append_pair(&config.params.scope, &scope_value);
	}

	pairs.append_pair(&config.params.state, nonce);

	for (key, value) in extra_params {
		pairs.append_pair(key, value);
	}

	drop(pairs);

	Ok(url)
}

/// Joins scopes with the provider's separator when building the `scope` parameter.
pub(crate) fn format_scope(scopes: &[String], separator: char) -> Option<String> {
	if scopes.is_empty() {
		return None;
	}

	let mut buf = String::new();

	for (idx, value) in scopes.iter().enumerate() {
		if idx > 0 {
			buf.push(separator);
		}

		buf.push_str(value);
	}

	Some(buf)
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse redirect fixture URL.")
	}

	fn config() -> DriverConfig {
		DriverConfig::builder("client-id", "client-secret")
			.callback_url(url("https://app.example.com/cb?from=login"))
			.authorize_url(url("https://provider.example.com/oauth/authorize"))
			.access_token_url(url("https://provider.example.com/oauth/token"))
			.user_info_url(url("https://provider.example.com/api/me"))
			.scopes(["email", "profile"])
			.build()
			.expect("Redirect fixture config should build successfully.")
	}

	#[test]
	fn redirect_url_carries_every_required_parameter() {
		let built = build_redirect_url(&config(), "nonce-abc123", None, &[])
			.expect("Redirect URL should build for a valid config.");
		let pairs: HashMap<_, _> = built.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("response_type"), Some(&"code".into()));
		assert_eq!(pairs.get("client_id"), Some(&"client-id".into()));
		assert_eq!(pairs.get("redirect_uri"), Some(&"https://app.example.com/cb?from=login".into()));
		assert_eq!(pairs.get("scope"), Some(&"email profile".into()));
		assert_eq!(pairs.get("state"), Some(&"nonce-abc123".into()));

		// The nested callback query must be percent-encoded in the raw URL.
		assert!(built.as_str().contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb%3Ffrom%3Dlogin"));

		let states: Vec<_> =
			built.query_pairs().filter(|(key, _)| key == "state").map(|(_, v)| v).collect();

		assert_eq!(states, vec!["nonce-abc123"]);
	}

	#[test]
	fn requested_scopes_override_config_defaults() {
		let mut config = config();

		config.scope_separator = ',';

		let requested = vec!["openid".to_string(), "email".to_string()];
		let built = build_redirect_url(&config, "n", Some(&requested), &[])
			.expect("Redirect URL should build with requested scopes.");
		let pairs: HashMap<_, _> = built.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("scope"), Some(&"openid,email".into()));
	}

	#[test]
	fn empty_scopes_omit_the_scope_parameter() {
		let built = build_redirect_url(&config(), "n", Some(&[]), &[])
			.expect("Redirect URL should build without scopes.");

		assert!(built.query_pairs().all(|(key, _)| key != "scope"));
	}

	#[test]
	fn extra_params_are_appended() {
		let extra = vec![("prompt".to_string(), "consent".to_string())];
		let built = build_redirect_url(&config(), "n", None, &extra)
			.expect("Redirect URL should build with extra parameters.");
		let pairs: HashMap<_, _> = built.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("prompt"), Some(&"consent".into()));
	}

	#[test]
	fn authorize_url_with_query_is_rejected() {
		let mut config = config();

		config.authorize_url = url("https://provider.example.com/oauth/authorize?tenant=a");

		let err = build_redirect_url(&config, "n", None, &[])
			.expect_err("Authorize URLs with a preexisting query should be rejected.");

		assert!(matches!(err, ConfigError::MalformedAuthorizeUrl { .. }));
	}
}
