//! Driver orchestration for one provider.
//!
//! [`Driver`] composes the engine components around a single [`DriverConfig`]: it issues
//! redirects, parses callbacks, verifies state, exchanges codes, and fetches user profiles. Per
//! authorization attempt the flow is strictly
//! `redirect -> callback -> (denied | state failure | verify -> exchange -> fetch)`; nothing
//! skips verification because the exchange consumes a [`VerifiedState`] by value.
//!
//! Drivers hold no mutable state, so one instance serves any number of concurrent attempts;
//! attempts share only the config and the HTTP transport.

// self
use crate::{
	_prelude::*,
	config::DriverConfig,
	error::{ConfigError, StateError, TokenError},
	http::LoginHttpClient,
	obs::{FlowKind, FlowSpan},
	redirect::build_redirect_url,
	state::{StateManager, VerifiedState},
	token::{AccessToken, TokenExchangeClient},
	user::{NormalizedUser, RequestHook, UserInfoFetcher, UserMapper, UserProfile},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Driver specialized for the crate's default reqwest transport.
pub type ReqwestDriver = Driver<ReqwestHttpClient>;

/// Query parameters extracted from the provider callback request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
	/// Authorization code, when the provider granted one.
	pub code: Option<String>,
	/// Returned state parameter.
	pub state: Option<String>,
	/// Provider-reported error value.
	pub error: Option<String>,
}
impl CallbackParams {
	/// Extracts the configured parameters from a callback URL's query string.
	pub fn from_url(config: &DriverConfig, url: &Url) -> Self {
		let mut params = Self::default();

		for (key, value) in url.query_pairs() {
			if key == config.params.code.as_str() {
				params.code = Some(value.into_owned());
			} else if key == config.params.state.as_str() {
				params.state = Some(value.into_owned());
			} else if key == config.params.error.as_str() {
				params.error = Some(value.into_owned());
			}
		}

		params
	}

	/// Whether the provider reported that the end user denied the request.
	///
	/// A pure comparison against the configured denial values; no network involved.
	pub fn denied(&self, config: &DriverConfig) -> bool {
		self.error.as_deref().is_some_and(|error| config.is_denial_value(error))
	}
}

/// State cookie the host must set alongside the redirect response.
///
/// The engine only produces the value; storing it, sending it `HttpOnly` with at least
/// `SameSite=Lax`, and clearing it after verification are the host's job.
#[derive(Clone, Debug)]
pub struct StateCookie {
	/// Configured cookie name.
	pub name: String,
	/// Signed state value.
	pub value: String,
	/// Cookie lifetime, matching the state TTL.
	pub max_age: Duration,
}
impl StateCookie {
	/// Renders a `Set-Cookie` header value with the recommended attributes.
	pub fn header_value(&self) -> String {
		format!(
			"{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Lax",
			self.name,
			self.value,
			self.max_age.whole_seconds(),
		)
	}

	/// Renders a `Set-Cookie` header value that clears the cookie after verification.
	pub fn clearing_header_value(name: &str) -> String {
		format!("{name}=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=Lax")
	}
}

/// Redirect URL plus the state cookie to set, produced by [`Driver::redirect`].
#[derive(Clone, Debug)]
pub struct RedirectIssue {
	/// Fully-formed provider authorize URL to send the end user to.
	pub url: Url,
	/// Signed state cookie the host must set on the redirect response.
	pub cookie: StateCookie,
}

/// Coordinates the Authorization Code flow against a single provider config.
#[derive(Clone)]
pub struct Driver<C>
where
	C: ?Sized + LoginHttpClient,
{
	/// Immutable provider configuration.
	pub config: DriverConfig,
	/// Anti-forgery state issuer/verifier.
	pub state_manager: StateManager,
	/// HTTP transport shared by both outbound calls.
	pub http_client: Arc<C>,
	mapper: Option<Arc<UserMapper>>,
}
impl<C> Driver<C>
where
	C: ?Sized + LoginHttpClient,
{
	/// Creates a driver reusing a caller-provided transport.
	///
	/// `state_secret` signs the anti-forgery cookie and must be at least 32 bytes.
	pub fn with_http_client(
		config: DriverConfig,
		state_secret: impl Into<Vec<u8>>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		let state_manager = StateManager::new(state_secret)?;

		Ok(Self { config, state_manager, http_client: http_client.into(), mapper: None })
	}

	/// Overrides the state TTL (defaults to 10 minutes).
	pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
		self.state_manager = self.state_manager.with_ttl(ttl);

		self
	}

	/// Installs a per-provider field mapping applied to user-info responses.
	pub fn with_user_mapper<F>(mut self, mapper: F) -> Self
	where
		F: 'static + Fn(&JsonMap) -> UserProfile + Send + Sync,
	{
		self.mapper = Some(Arc::new(mapper));

		self
	}

	/// Issues state and builds the provider redirect, using the config's default scopes.
	pub fn redirect(&self) -> Result<RedirectIssue> {
		self.redirect_with(None, &[])
	}

	/// Issues state and builds the provider redirect with scope and parameter overrides.
	pub fn redirect_with(
		&self,
		requested_scopes: Option<&[String]>,
		extra_params: &[(String, String)],
	) -> Result<RedirectIssue> {
		let _guard = FlowSpan::new(FlowKind::Redirect, "redirect").entered();
		let issued = self.state_manager.issue_state();
		let url =
			build_redirect_url(&self.config, &issued.nonce, requested_scopes, extra_params)?;
		let cookie = StateCookie {
			name: self.config.state_cookie_name.clone(),
			value: issued.cookie_value,
			max_age: self.state_manager.ttl(),
		};

		Ok(RedirectIssue { url, cookie })
	}

	/// Extracts the configured callback parameters from a callback URL.
	pub fn callback_params(&self, url: &Url) -> CallbackParams {
		CallbackParams::from_url(&self.config, url)
	}

	/// Whether the callback reports an end-user denial.
	///
	/// Check this before [`verify_state`](Self::verify_state): a denial carries no valid
	/// `code`/`state` to verify.
	pub fn access_denied(&self, params: &CallbackParams) -> bool {
		params.denied(&self.config)
	}

	/// Verifies the callback state against the cookie set on redirect.
	pub fn verify_state(
		&self,
		cookie_value: Option<&str>,
		params: &CallbackParams,
	) -> Result<VerifiedState, StateError> {
		self.state_manager.verify_state(cookie_value, params.state.as_deref().unwrap_or_default())
	}

	/// Exchanges an authorization code for an access token.
	pub async fn exchange_code(
		&self,
		code: &str,
		verified: VerifiedState,
	) -> Result<AccessToken> {
		self.exchange_code_with(code, verified, &[]).await
	}

	/// Exchanges an authorization code with extra provider-specific form parameters.
	pub async fn exchange_code_with(
		&self,
		code: &str,
		verified: VerifiedState,
		extra_params: &[(String, String)],
	) -> Result<AccessToken> {
		let span = FlowSpan::new(FlowKind::TokenExchange, "exchange_code");
		let client = TokenExchangeClient::<C>::new(self.http_client.clone());
		let token =
			span.instrument(client.exchange(&self.config, code, verified, extra_params)).await?;

		Ok(token)
	}

	/// Runs the full callback pipeline: denial check, state verification, code exchange, and
	/// user-info fetch.
	pub async fn user(
		&self,
		params: &CallbackParams,
		cookie_value: Option<&str>,
	) -> Result<NormalizedUser> {
		self.user_with(params, cookie_value, None).await
	}

	/// [`user`](Self::user) with a pre-request hook for the user-info call.
	pub async fn user_with(
		&self,
		params: &CallbackParams,
		cookie_value: Option<&str>,
		configure: Option<&RequestHook>,
	) -> Result<NormalizedUser> {
		if self.access_denied(params) {
			return Err(Error::AccessDenied);
		}

		let verified = self.verify_state(cookie_value, params)?;
		let code = params.code.as_deref().ok_or_else(|| TokenError::InvalidGrant {
			reason: "callback carried no authorization code".into(),
		})?;
		let token = self.exchange_code(code, verified).await?;

		self.fetch_user(token, configure).await
	}

	/// Fetches the user profile for a caller-held bearer token obtained out of band.
	pub async fn user_from_token(&self, access_token: &str) -> Result<NormalizedUser> {
		self.fetch_user(AccessToken::bearer(access_token), None).await
	}

	/// Fetches and normalizes the user profile for an exchanged token.
	pub async fn fetch_user(
		&self,
		token: AccessToken,
		configure: Option<&RequestHook>,
	) -> Result<NormalizedUser> {
		let span = FlowSpan::new(FlowKind::UserInfo, "fetch_user");
		let fetcher = UserInfoFetcher::<C>::new(self.http_client.clone());
		let user = span
			.instrument(fetcher.fetch(&self.config, token, self.mapper.as_deref(), configure))
			.await?;

		Ok(user)
	}
}
#[cfg(feature = "reqwest")]
impl Driver<ReqwestHttpClient> {
	/// Creates a driver with the crate's default reqwest transport.
	pub fn new(
		config: DriverConfig,
		state_secret: impl Into<Vec<u8>>,
	) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::new()?;

		Self::with_http_client(config, state_secret, http_client)
	}
}
impl<C> Debug for Driver<C>
where
	C: ?Sized + LoginHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Driver")
			.field("config", &self.config.authorize_url.as_str())
			.field("client_id", &self.config.client_id)
			.field("mapper_set", &self.mapper.is_some())
			.finish()
	}
}
