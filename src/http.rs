//! Transport primitives for outbound provider calls.
//!
//! The module exposes [`LoginHttpClient`], the engine's only dependency on an HTTP stack.
//! Requests are described with crate-owned [`OutboundRequest`] values so custom transports never
//! depend on reqwest-specific structures; the default [`ReqwestHttpClient`] lives behind the
//! `reqwest` feature. Both engine calls (token exchange, user-info fetch) go through this trait,
//! and dropping the returned future aborts the in-flight call, which is how host-side request
//! cancellation propagates.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::_prelude::*;

/// Future type returned by [`LoginHttpClient::execute`].
pub type TransportFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// HTTP methods the engine issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
	/// Plain GET.
	Get,
	/// POST, optionally form-encoded.
	Post,
}

/// Body attached to an outbound request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
	/// No body (GET and bodyless POST requests).
	Empty,
	/// `application/x-www-form-urlencoded` key/value pairs.
	Form(Vec<(String, String)>),
}

/// Crate-owned description of one outbound provider call.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Fully-formed request URL, query included.
	pub url: Url,
	/// Request headers as name/value pairs.
	pub headers: Vec<(String, String)>,
	/// Request body.
	pub body: RequestBody,
	/// Per-request timeout; transports surface elapsed timeouts as their transport error.
	pub timeout: Option<StdDuration>,
}
impl OutboundRequest {
	/// Creates a bodyless GET request.
	pub fn get(url: Url) -> Self {
		Self { method: HttpMethod::Get, url, headers: Vec::new(), body: RequestBody::Empty, timeout: None }
	}

	/// Creates a bodyless POST request.
	pub fn post(url: Url) -> Self {
		Self { method: HttpMethod::Post, url, headers: Vec::new(), body: RequestBody::Empty, timeout: None }
	}

	/// Creates a form-encoded POST request.
	pub fn post_form(url: Url, form: Vec<(String, String)>) -> Self {
		Self {
			method: HttpMethod::Post,
			url,
			headers: Vec::new(),
			body: RequestBody::Form(form),
			timeout: None,
		}
	}

	/// Appends a request header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the per-request timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Appends a percent-encoded query pair to the request URL.
	pub fn append_query_pair(&mut self, name: &str, value: &str) {
		self.url.query_pairs_mut().append_pair(name, value);
	}
}

/// Raw response handed back by a transport.
#[derive(Clone, Debug)]
pub struct OutboundResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes, fully buffered.
	pub body: Vec<u8>,
}
impl OutboundResponse {
	/// Whether the status code is in the 2xx range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Lossy UTF-8 view of the body for diagnostics.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Abstraction over HTTP transports capable of executing the engine's provider calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared across
/// concurrent authorization attempts behind an `Arc`, and the returned future must be `Send` so
/// driver futures can hop executors. Transport errors are wrapped into
/// [`TokenError::Network`](crate::error::TokenError) or
/// [`UserFetchError::Network`](crate::error::UserFetchError) with the source preserved.
pub trait LoginHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes one request and buffers the full response.
	fn execute(&self, request: OutboundRequest)
	-> TransportFuture<'_, OutboundResponse, Self::TransportError>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The default construction disables redirect following: token and user-info endpoints return
/// results directly, and silently following a redirect could leak credentials to another origin.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds the default client with redirect following disabled.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().redirect(Policy::none()).build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		Self::new().expect("Failed to initialize the default reqwest transport.")
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl LoginHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(
		&self,
		request: OutboundRequest,
	) -> TransportFuture<'_, OutboundResponse, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = match request.method {
				HttpMethod::Get => client.get(request.url),
				HttpMethod::Post => client.post(request.url),
			};

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let RequestBody::Form(pairs) = &request.body {
				builder = builder.form(pairs);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(OutboundResponse { status, body })
		})
	}
}
