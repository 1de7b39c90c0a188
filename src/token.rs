//! Authorization-code → access-token exchange.
//!
//! One server-to-server POST per exchange, never retried: authorization codes are single-use, so
//! a blind retry after a provider-side success would fail anyway. Transient transport failures
//! surface as [`TokenError::Network`] for the caller to decide whether to restart the whole flow.

// self
use crate::{
	_prelude::*,
	config::DriverConfig,
	error::TokenError,
	http::{LoginHttpClient, OutboundRequest},
	state::VerifiedState,
};

/// Access token produced by a successful code exchange.
///
/// Owned by the calling request's lifecycle; the engine never persists it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessToken {
	/// The access token secret.
	pub token: String,
	/// Token type, normalized to lowercase; virtually always `bearer`.
	pub token_type: String,
	/// Provider-reported validity window, when supplied.
	pub expires_in: Option<Duration>,
	/// Refresh token, when the provider issues one.
	pub refresh_token: Option<String>,
	/// Full token endpoint response for provider-specific fields.
	pub raw: JsonMap,
}
impl AccessToken {
	/// Wraps a caller-held bearer token without raw response context.
	///
	/// Used by the `user_from_token` path where the token was obtained out of band.
	pub fn bearer(token: impl Into<String>) -> Self {
		Self {
			token: token.into(),
			token_type: "bearer".into(),
			expires_in: None,
			refresh_token: None,
			raw: JsonMap::new(),
		}
	}

	/// Renders the `Authorization` header value for authenticated provider calls.
	pub fn authorization_header_value(&self) -> String {
		format!("Bearer {}", self.token)
	}
}

/// Executes the authorization-code exchange against a provider token endpoint.
#[derive(Clone, Debug)]
pub struct TokenExchangeClient<C>
where
	C: ?Sized + LoginHttpClient,
{
	http_client: Arc<C>,
}
impl<C> TokenExchangeClient<C>
where
	C: ?Sized + LoginHttpClient,
{
	/// Creates a client around a shared transport.
	pub fn new(http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into() }
	}

	/// Exchanges an authorization code for an access token.
	///
	/// Requires a [`VerifiedState`] by value: the proof exists only after
	/// [`StateManager::verify_state`](crate::state::StateManager::verify_state) succeeds and is
	/// consumed here, so one verification authorizes at most one exchange.
	pub async fn exchange(
		&self,
		config: &DriverConfig,
		code: &str,
		verified: VerifiedState,
		extra_params: &[(String, String)],
	) -> Result<AccessToken, TokenError> {
		let _ = verified;

		let mut form = vec![
			("grant_type".to_string(), "authorization_code".to_string()),
			("client_id".to_string(), config.client_id.clone()),
			("client_secret".to_string(), config.client_secret.clone()),
			("code".to_string(), code.to_string()),
			("redirect_uri".to_string(), config.callback_url.to_string()),
		];

		form.extend(extra_params.iter().cloned());

		let mut request = OutboundRequest::post_form(config.access_token_url.clone(), form)
			.header("accept", "application/json");

		if let Ok(timeout) = config.http_timeout.try_into() {
			request = request.timeout(timeout);
		}

		let response =
			self.http_client.execute(request).await.map_err(TokenError::network)?;

		parse_token_response(response.status, &response.body)
	}
}

/// Typed view of the expected 2xx token endpoint payload.
#[derive(Debug, Deserialize)]
struct TokenResponsePayload {
	access_token: String,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	refresh_token: Option<String>,
}

pub(crate) fn decode_json_object(
	body: &[u8],
) -> Result<JsonMap, serde_path_to_error::Error<serde_json::Error>> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let value: serde_json::Value = serde_path_to_error::deserialize(&mut deserializer)?;

	match value {
		serde_json::Value::Object(map) => Ok(map),
		other => {
			// Re-run a map deserialization to produce a typed error with path context.
			Err(serde_path_to_error::deserialize::<_, JsonMap>(other)
				.expect_err("Non-object JSON values cannot deserialize into a map."))
		},
	}
}

fn parse_token_response(status: u16, body: &[u8]) -> Result<AccessToken, TokenError> {
	if !(200..300).contains(&status) {
		return Err(classify_error_response(status, body));
	}

	let raw = decode_json_object(body)
		.map_err(|source| TokenError::MalformedResponse { source, status })?;
	let payload: TokenResponsePayload =
		serde_path_to_error::deserialize(serde_json::Value::Object(raw.clone()))
			.map_err(|source| TokenError::MalformedResponse { source, status })?;
	let token_type =
		payload.token_type.map(|value| value.to_ascii_lowercase()).unwrap_or_else(|| "bearer".into());
	let expires_in = payload.expires_in.filter(|secs| *secs > 0).map(Duration::seconds);

	Ok(AccessToken {
		token: payload.access_token,
		token_type,
		expires_in,
		refresh_token: payload.refresh_token,
		raw,
	})
}

fn classify_error_response(status: u16, body: &[u8]) -> TokenError {
	let value: Option<serde_json::Value> = serde_json::from_slice(body).ok();
	let error = value
		.as_ref()
		.and_then(|v| v.get("error"))
		.and_then(|e| e.as_str())
		.map(str::to_owned);
	let description = value
		.as_ref()
		.and_then(|v| v.get("error_description"))
		.and_then(|d| d.as_str())
		.map(str::to_owned);
	let body_text = String::from_utf8_lossy(body).into_owned();

	if reports_invalid_grant(status, error.as_deref(), &body_text) {
		let reason = description
			.or_else(|| error.clone())
			.unwrap_or_else(|| format!("token endpoint returned HTTP {status}"));

		return TokenError::InvalidGrant { reason };
	}

	TokenError::Provider { status, error, body: body_text }
}

/// The code was rejected as expired, already used, or otherwise invalid.
///
/// Prefers the structured OAuth `error` field; falls back to a body hint for providers that
/// return `invalid_grant` inside non-standard payload shapes.
fn reports_invalid_grant(status: u16, error: Option<&str>, body: &str) -> bool {
	if let Some(error) = error {
		return error.eq_ignore_ascii_case("invalid_grant");
	}

	(400..500).contains(&status) && body.to_ascii_lowercase().contains("invalid_grant")
}
