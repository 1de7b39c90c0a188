//! Engine-level error types shared across state handling, exchanges, and user fetches.

// self
use crate::_prelude::*;

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical engine error exposed by the driver-level APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Anti-forgery state verification failure.
	#[error(transparent)]
	State(#[from] StateError),
	/// Authorization-code exchange failure.
	#[error(transparent)]
	Token(#[from] TokenError),
	/// User-info fetch failure.
	#[error(transparent)]
	UserFetch(#[from] UserFetchError),

	/// The end user denied the authorization request at the provider.
	///
	/// A denial carries no usable `code`/`state`, so callers should check
	/// [`Driver::access_denied`](crate::driver::Driver::access_denied) before attempting state
	/// verification.
	#[error("The end user denied the authorization request.")]
	AccessDenied,
}

/// Configuration and validation failures raised while constructing a driver.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required configuration field was left empty.
	#[error("Missing required configuration field `{field}`.")]
	MissingRequiredField {
		/// Name of the absent field.
		field: &'static str,
	},
	/// The authorize URL must be query-free; the engine owns every query parameter it appends.
	#[error("Authorize URL must not carry a query string: {url}.")]
	MalformedAuthorizeUrl {
		/// Offending URL, verbatim.
		url: String,
	},
	/// A configured endpoint could not be parsed as a URL.
	#[error("Configuration field `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Name of the offending field.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// State-signing secrets below the minimum length are rejected outright.
	#[error("State signing secret must be at least {minimum} bytes.")]
	WeakStateSecret {
		/// Minimum accepted secret length in bytes.
		minimum: usize,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Anti-forgery state verification failures.
///
/// Every variant is terminal for the current authorization attempt; the host should restart the
/// flow from the redirect step rather than retry verification.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum StateError {
	/// No state cookie accompanied the callback request.
	#[error("State cookie is missing from the callback request.")]
	Missing,
	/// The issued state outlived its TTL.
	#[error("State cookie expired before the callback arrived.")]
	Expired,
	/// The `state` query parameter does not match the nonce recovered from the cookie.
	#[error("State parameter does not match the issued nonce.")]
	Mismatch,
	/// The cookie signature failed verification; the value was forged or corrupted.
	#[error("State cookie failed signature verification.")]
	TamperDetected,
}

/// Authorization-code exchange failures.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Transport failure (timeout, DNS, connection reset) before a response arrived.
	///
	/// Authorization codes are single-use, so the engine never retries; the caller decides
	/// whether to restart the whole flow.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Provider reported the code as expired, already used, or otherwise invalid.
	#[error("Provider rejected the authorization code: {reason}.")]
	InvalidGrant {
		/// Provider- or engine-supplied reason string.
		reason: String,
	},
	/// Any other non-2xx token endpoint response, with the raw payload preserved.
	#[error("Token endpoint returned HTTP {status}.")]
	Provider {
		/// HTTP status code returned by the provider.
		status: u16,
		/// Provider-supplied OAuth `error` field, when present.
		error: Option<String>,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// A 2xx response could not be parsed into the expected token shape.
	#[error("Token endpoint returned a malformed token response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the malformed response.
		status: u16,
	},
}
impl TokenError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// User-info fetch failures.
#[derive(Debug, ThisError)]
pub enum UserFetchError {
	/// Provider returned 401; the access token is invalid or expired.
	///
	/// Not retryable without a fresh token.
	#[error("User-info endpoint rejected the access token.")]
	Unauthorized,
	/// Transport failure before a response arrived.
	#[error("Network error occurred while calling the user-info endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Any other non-2xx user-info response, with the raw payload preserved.
	#[error("User-info endpoint returned HTTP {status}.")]
	Provider {
		/// HTTP status code returned by the provider.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// The mapped response carried no user identifier.
	#[error("User-info response did not yield a user identifier.")]
	MissingUserId,
	/// A 2xx response body was not the expected JSON object.
	#[error("User-info endpoint returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the malformed response.
		status: u16,
	},
}
impl UserFetchError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
