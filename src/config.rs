//! Immutable per-provider driver configuration.
//!
//! A provider is data, not a subclass: endpoints, parameter names, and quirks all live in
//! [`DriverConfig`], and one driver instance owns exactly one config. Values are validated once
//! at build time and never mutated afterwards.

// self
use crate::{_prelude::*, error::ConfigError};

/// Minimum accepted state-signing secret length in bytes.
pub const MIN_STATE_SECRET_LEN: usize = 32;

const DEFAULT_STATE_COOKIE_NAME: &str = "oauth_state";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::seconds(10);

/// Where the access token is placed on user-info requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPlacement {
	/// `Authorization: Bearer <token>` request header.
	BearerHeader,
	/// Query parameter carrying the raw token under the given name.
	QueryParam(String),
}

/// HTTP method used for the user-info request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserInfoMethod {
	#[default]
	/// Plain authenticated GET (the common case).
	Get,
	/// Authenticated POST for providers that require it.
	Post,
}

/// Query parameter names used on the provider callback and redirect.
///
/// Providers occasionally rename the standard parameters, so every name is configurable; the
/// defaults follow RFC 6749.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackParamNames {
	/// Name of the authorization-code parameter on the callback.
	pub code: String,
	/// Name of the error parameter on the callback.
	pub error: String,
	/// Name of the state parameter on both redirect and callback.
	pub state: String,
	/// Name of the scope parameter on the redirect.
	pub scope: String,
}
impl Default for CallbackParamNames {
	fn default() -> Self {
		Self { code: "code".into(), error: "error".into(), state: "state".into(), scope: "scope".into() }
	}
}

/// Immutable provider configuration consumed by every engine component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: String,
	/// Redirect/callback URI registered with the provider.
	pub callback_url: Url,
	/// Authorization endpoint the end user is redirected to. Must be query-free.
	pub authorize_url: Url,
	/// Token endpoint used for the code exchange.
	pub access_token_url: Url,
	/// User-info endpoint queried with the access token.
	pub user_info_url: Url,
	/// Default scopes requested when the caller supplies none.
	pub scopes: Vec<String>,
	/// Character used to join scopes when constructing the `scope` parameter.
	pub scope_separator: char,
	/// Query parameter names for the redirect and callback.
	pub params: CallbackParamNames,
	/// Cookie name the host should use for the signed state value.
	pub state_cookie_name: String,
	/// Error parameter values the provider uses to signal "the user said no".
	pub denial_values: Vec<String>,
	/// Where the access token goes on user-info requests.
	pub token_placement: TokenPlacement,
	/// HTTP method for the user-info request.
	pub user_info_method: UserInfoMethod,
	/// Timeout applied to each outbound provider call.
	pub http_timeout: Duration,
}
impl DriverConfig {
	/// Creates a new builder for the provided client credentials.
	pub fn builder(client_id: impl Into<String>, client_secret: impl Into<String>) -> DriverConfigBuilder {
		DriverConfigBuilder::new(client_id, client_secret)
	}

	/// Checks whether a callback error value means the end user denied access.
	pub fn is_denial_value(&self, error: &str) -> bool {
		self.denial_values.iter().any(|value| value == error)
	}
}

/// Parses a caller-supplied endpoint string, attributing failures to the named field.
pub fn parse_endpoint(field: &'static str, value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|source| ConfigError::InvalidUrl { field, source })
}

/// Builder for [`DriverConfig`] values.
#[derive(Debug)]
pub struct DriverConfigBuilder {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: String,
	/// Redirect/callback URI registered with the provider.
	pub callback_url: Option<Url>,
	/// Authorization endpoint (required, query-free).
	pub authorize_url: Option<Url>,
	/// Token endpoint (required).
	pub access_token_url: Option<Url>,
	/// User-info endpoint (required).
	pub user_info_url: Option<Url>,
	/// Default scopes.
	pub scopes: Vec<String>,
	/// Scope join character.
	pub scope_separator: char,
	/// Parameter name overrides.
	pub params: CallbackParamNames,
	/// State cookie name override.
	pub state_cookie_name: String,
	/// Denial value overrides.
	pub denial_values: Vec<String>,
	/// Token placement override.
	pub token_placement: TokenPlacement,
	/// User-info method override.
	pub user_info_method: UserInfoMethod,
	/// Outbound call timeout override.
	pub http_timeout: Duration,
}
impl DriverConfigBuilder {
	/// Creates a new builder seeded with client credentials and RFC 6749 defaults.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			callback_url: None,
			authorize_url: None,
			access_token_url: None,
			user_info_url: None,
			scopes: Vec::new(),
			scope_separator: ' ',
			params: CallbackParamNames::default(),
			state_cookie_name: DEFAULT_STATE_COOKIE_NAME.into(),
			denial_values: vec!["access_denied".into(), "user_denied".into()],
			token_placement: TokenPlacement::BearerHeader,
			user_info_method: UserInfoMethod::default(),
			http_timeout: DEFAULT_HTTP_TIMEOUT,
		}
	}

	/// Sets the registered callback URI.
	pub fn callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorize_url(mut self, url: Url) -> Self {
		self.authorize_url = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn access_token_url(mut self, url: Url) -> Self {
		self.access_token_url = Some(url);

		self
	}

	/// Sets the user-info endpoint.
	pub fn user_info_url(mut self, url: Url) -> Self {
		self.user_info_url = Some(url);

		self
	}

	/// Replaces the default scope list.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the scope join character (defaults to a space).
	pub fn scope_separator(mut self, separator: char) -> Self {
		self.scope_separator = separator;

		self
	}

	/// Overrides the callback/redirect parameter names.
	pub fn params(mut self, params: CallbackParamNames) -> Self {
		self.params = params;

		self
	}

	/// Overrides the state cookie name.
	///
	/// Prefix the provider name (`facebook_oauth_state`) when one host serves several providers,
	/// so concurrent flows never clobber each other's cookies.
	pub fn state_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.state_cookie_name = name.into();

		self
	}

	/// Replaces the error values treated as an end-user denial.
	pub fn denial_values<I, S>(mut self, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.denial_values = values.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides how the access token is attached to user-info requests.
	pub fn token_placement(mut self, placement: TokenPlacement) -> Self {
		self.token_placement = placement;

		self
	}

	/// Overrides the user-info HTTP method.
	pub fn user_info_method(mut self, method: UserInfoMethod) -> Self {
		self.user_info_method = method;

		self
	}

	/// Overrides the outbound call timeout (defaults to 10 seconds).
	pub fn http_timeout(mut self, timeout: Duration) -> Self {
		self.http_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<DriverConfig, ConfigError> {
		if self.client_id.is_empty() {
			return Err(ConfigError::MissingRequiredField { field: "client_id" });
		}
		if self.client_secret.is_empty() {
			return Err(ConfigError::MissingRequiredField { field: "client_secret" });
		}

		let callback_url =
			self.callback_url.ok_or(ConfigError::MissingRequiredField { field: "callback_url" })?;
		let authorize_url =
			self.authorize_url.ok_or(ConfigError::MissingRequiredField { field: "authorize_url" })?;

		if authorize_url.query().is_some() {
			return Err(ConfigError::MalformedAuthorizeUrl { url: authorize_url.to_string() });
		}

		let access_token_url = self
			.access_token_url
			.ok_or(ConfigError::MissingRequiredField { field: "access_token_url" })?;
		let user_info_url =
			self.user_info_url.ok_or(ConfigError::MissingRequiredField { field: "user_info_url" })?;

		Ok(DriverConfig {
			client_id: self.client_id,
			client_secret: self.client_secret,
			callback_url,
			authorize_url,
			access_token_url,
			user_info_url,
			scopes: self.scopes,
			scope_separator: self.scope_separator,
			params: self.params,
			state_cookie_name: self.state_cookie_name,
			denial_values: self.denial_values,
			token_placement: self.token_placement,
			user_info_method: self.user_info_method,
			http_timeout: self.http_timeout,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse config fixture URL.")
	}

	fn builder() -> DriverConfigBuilder {
		DriverConfig::builder("client-id", "client-secret")
			.callback_url(url("https://app.example.com/callback"))
			.authorize_url(url("https://provider.example.com/oauth/authorize"))
			.access_token_url(url("https://provider.example.com/oauth/token"))
			.user_info_url(url("https://provider.example.com/api/me"))
	}

	#[test]
	fn build_applies_defaults() {
		let config = builder().build().expect("Config fixture should build successfully.");

		assert_eq!(config.scope_separator, ' ');
		assert_eq!(config.state_cookie_name, "oauth_state");
		assert_eq!(config.params.code, "code");
		assert_eq!(config.params.error, "error");
		assert_eq!(config.params.state, "state");
		assert_eq!(config.http_timeout, Duration::seconds(10));
		assert!(config.is_denial_value("access_denied"));
		assert!(config.is_denial_value("user_denied"));
		assert!(!config.is_denial_value("server_error"));
	}

	#[test]
	fn build_rejects_missing_required_fields() {
		let err = DriverConfig::builder("", "secret")
			.build()
			.expect_err("Empty client identifier should be rejected.");

		assert!(matches!(err, ConfigError::MissingRequiredField { field: "client_id" }));

		let err = DriverConfig::builder("client-id", "client-secret")
			.callback_url(url("https://app.example.com/callback"))
			.build()
			.expect_err("Missing authorize URL should be rejected.");

		assert!(matches!(err, ConfigError::MissingRequiredField { field: "authorize_url" }));
	}

	#[test]
	fn build_rejects_authorize_url_with_query() {
		let err = builder()
			.authorize_url(url("https://provider.example.com/oauth/authorize?foo=bar"))
			.build()
			.expect_err("Authorize URLs carrying a query string should be rejected.");

		assert!(matches!(err, ConfigError::MalformedAuthorizeUrl { .. }));
	}

	#[test]
	fn parse_endpoint_attributes_failures_to_field() {
		let err = parse_endpoint("user_info_url", "not a url")
			.expect_err("Invalid endpoint strings should be rejected.");

		assert!(matches!(err, ConfigError::InvalidUrl { field: "user_info_url", .. }));
	}
}
