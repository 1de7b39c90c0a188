//! Token-authenticated user-info fetch and profile normalization.
//!
//! The fetcher issues one authenticated request to the provider's user-info endpoint and maps
//! the raw JSON into a provider-agnostic [`NormalizedUser`]. Field mapping is a pure function
//! injected per provider; the default handles the conventional key names most providers use.

// self
use crate::{
	_prelude::*,
	config::{DriverConfig, TokenPlacement, UserInfoMethod},
	error::UserFetchError,
	http::{LoginHttpClient, OutboundRequest},
	token::{AccessToken, decode_json_object},
};

/// Pure per-provider mapping from a raw user-info payload to profile fields.
pub type UserMapper = dyn Fn(&JsonMap) -> UserProfile + Send + Sync;

/// Hook invoked exactly once to mutate the outgoing user-info request before dispatch.
pub type RequestHook = dyn Fn(&mut OutboundRequest) + Send + Sync;

/// Profile fields extracted by a [`UserMapper`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
	/// Provider-scoped user identifier.
	pub id: Option<String>,
	/// Email address, when exposed.
	pub email: Option<String>,
	/// Whether the provider vouches for the email address.
	pub email_verified: Option<bool>,
	/// Display name.
	pub name: Option<String>,
	/// Handle or username.
	pub nick_name: Option<String>,
	/// Avatar image URL.
	pub avatar_url: Option<String>,
}

/// Provider-agnostic user record returned to the caller.
///
/// Transient: produced from a valid [`AccessToken`], never persisted by the engine.
#[derive(Clone, Debug)]
pub struct NormalizedUser {
	/// Provider-scoped user identifier.
	pub id: String,
	/// Email address, when exposed.
	pub email: Option<String>,
	/// Whether the provider vouches for the email address.
	pub email_verified: Option<bool>,
	/// Display name.
	pub name: Option<String>,
	/// Handle or username.
	pub nick_name: Option<String>,
	/// Avatar image URL.
	pub avatar_url: Option<String>,
	/// Access token the profile was fetched with.
	pub token: AccessToken,
	/// Full user-info response for provider-specific fields.
	pub raw: JsonMap,
}

/// Default mapping over the conventional field names.
///
/// Providers that deviate supply their own [`UserMapper`]; this covers the common aliases
/// (`id`/`sub`/`user_id`, `nickname`/`login`, `avatar_url`/`picture`, ...) so simple providers
/// work without any mapping code.
pub fn default_mapper(raw: &JsonMap) -> UserProfile {
	UserProfile {
		id: first_string(raw, &["id", "sub", "user_id"]),
		email: first_string(raw, &["email"]),
		email_verified: first_bool(raw, &["email_verified", "verified_email"]),
		name: first_string(raw, &["name"]),
		nick_name: first_string(raw, &["nickname", "nick_name", "login", "username"]),
		avatar_url: first_string(raw, &["avatar_url", "picture", "avatar"]),
	}
}

fn first_string(raw: &JsonMap, keys: &[&str]) -> Option<String> {
	keys.iter().find_map(|key| {
		let value = raw.get(*key)?;

		match value {
			serde_json::Value::String(text) => Some(text.clone()),
			serde_json::Value::Number(number) => Some(number.to_string()),
			_ => None,
		}
	})
}

fn first_bool(raw: &JsonMap, keys: &[&str]) -> Option<bool> {
	keys.iter().find_map(|key| raw.get(*key)?.as_bool())
}

/// Fetches and normalizes user profiles from a provider's user-info endpoint.
#[derive(Clone, Debug)]
pub struct UserInfoFetcher<C>
where
	C: ?Sized + LoginHttpClient,
{
	http_client: Arc<C>,
}
impl<C> UserInfoFetcher<C>
where
	C: ?Sized + LoginHttpClient,
{
	/// Creates a fetcher around a shared transport.
	pub fn new(http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into() }
	}

	/// Fetches the user profile authenticated by `token` and normalizes it.
	///
	/// `mapper` overrides the default field mapping; `configure` runs exactly once against the
	/// outgoing request before dispatch, after the engine's own configuration, so callers can
	/// override headers or add provider-specific parameters.
	pub async fn fetch(
		&self,
		config: &DriverConfig,
		token: AccessToken,
		mapper: Option<&UserMapper>,
		configure: Option<&RequestHook>,
	) -> Result<NormalizedUser, UserFetchError> {
		let url = config.user_info_url.clone();
		let mut request = match config.user_info_method {
			UserInfoMethod::Get => OutboundRequest::get(url),
			UserInfoMethod::Post => OutboundRequest::post(url),
		};

		request = request.header("accept", "application/json");

		match &config.token_placement {
			TokenPlacement::BearerHeader => {
				request = request.header("authorization", token.authorization_header_value());
			},
			TokenPlacement::QueryParam(name) => {
				request.append_query_pair(name, &token.token);
			},
		}

		if let Ok(timeout) = config.http_timeout.try_into() {
			request = request.timeout(timeout);
		}
		if let Some(configure) = configure {
			configure(&mut request);
		}

		let response =
			self.http_client.execute(request).await.map_err(UserFetchError::network)?;

		if response.status == 401 {
			return Err(UserFetchError::Unauthorized);
		}
		if !response.is_success() {
			return Err(UserFetchError::Provider {
				status: response.status,
				body: response.body_text(),
			});
		}

		let raw = decode_json_object(&response.body)
			.map_err(|source| UserFetchError::MalformedResponse { source, status: response.status })?;
		let profile = match mapper {
			Some(mapper) => mapper(&raw),
			None => default_mapper(&raw),
		};
		let id = profile.id.ok_or(UserFetchError::MissingUserId)?;

		Ok(NormalizedUser {
			id,
			email: profile.email,
			email_verified: profile.email_verified,
			name: profile.name,
			nick_name: profile.nick_name,
			avatar_url: profile.avatar_url,
			token,
			raw,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn raw(json: &str) -> JsonMap {
		serde_json::from_str(json).expect("Mapper fixture should be a JSON object.")
	}

	#[test]
	fn default_mapper_reads_conventional_fields() {
		let profile = default_mapper(&raw(
			r#"{
				"id": "123",
				"email": "a@b.com",
				"email_verified": true,
				"name": "Ann",
				"login": "ann",
				"avatar_url": "https://img.example.com/ann.png"
			}"#,
		));

		assert_eq!(profile.id.as_deref(), Some("123"));
		assert_eq!(profile.email.as_deref(), Some("a@b.com"));
		assert_eq!(profile.email_verified, Some(true));
		assert_eq!(profile.name.as_deref(), Some("Ann"));
		assert_eq!(profile.nick_name.as_deref(), Some("ann"));
		assert_eq!(profile.avatar_url.as_deref(), Some("https://img.example.com/ann.png"));
	}

	#[test]
	fn default_mapper_handles_oidc_and_numeric_shapes() {
		let profile = default_mapper(&raw(
			r#"{"sub": 42, "verified_email": false, "picture": "https://img.example.com/p.png"}"#,
		));

		assert_eq!(profile.id.as_deref(), Some("42"), "Numeric identifiers must be stringified.");
		assert_eq!(profile.email_verified, Some(false));
		assert_eq!(profile.avatar_url.as_deref(), Some("https://img.example.com/p.png"));
		assert_eq!(profile.email, None);
	}

	#[test]
	fn default_mapper_yields_no_id_for_unconventional_payloads() {
		let profile = default_mapper(&raw(r#"{"identifier": "u1"}"#));

		assert_eq!(profile.id, None);
	}
}
