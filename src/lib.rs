//! Generic OAuth 2.0 Authorization Code login engine: signed-state CSRF cookies, single-shot code
//! exchanges, and normalized user profiles for any social provider described as configuration.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod obs;
pub mod redirect;
pub mod state;
pub mod token;
pub mod user;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::DriverConfig,
		driver::Driver,
		http::ReqwestHttpClient,
	};

	/// Driver type alias used by reqwest-backed integration tests.
	pub type ReqwestTestDriver = Driver<ReqwestHttpClient>;

	/// State-signing secret shared across integration tests.
	pub const TEST_STATE_SECRET: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

	/// Builds a config whose endpoints all point at a mock provider.
	pub fn test_config(authorize: Url, token: Url, user_info: Url) -> DriverConfig {
		DriverConfig::builder("client-it", "secret-it")
			.callback_url(
				Url::parse("https://app.example.com/callback")
					.expect("Test callback URL should parse successfully."),
			)
			.authorize_url(authorize)
			.access_token_url(token)
			.user_info_url(user_info)
			.scopes(["email", "profile"])
			.build()
			.expect("Test driver config should build successfully.")
	}

	/// Constructs a [`Driver`] backed by the default reqwest transport for integration tests.
	pub fn build_reqwest_test_driver(config: DriverConfig) -> ReqwestTestDriver {
		Driver::new(config, TEST_STATE_SECRET)
			.expect("Failed to build reqwest-backed driver for tests.")
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::{
		JsonMap,
		error::{Error, Result},
	};
}

/// JSON object map carrying raw provider payloads.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, oauth2_login_engine as _, tokio as _};
