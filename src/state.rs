//! Anti-forgery state issuance and verification.
//!
//! Each redirect issues a fresh random nonce. The nonce travels to the provider inside the
//! `state` query parameter and simultaneously back to the browser inside a signed, short-lived
//! cookie value. On callback the two must agree, the signature must check out, and the TTL must
//! not have elapsed. Successful verification yields a [`VerifiedState`] capability token that the
//! code exchange consumes by value, so an exchange without verified state does not type-check.
//!
//! The cookie itself should be set `HttpOnly` with at least `SameSite=Lax`; the host clears it
//! after verification, which is what makes the state single-use across requests.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	config::MIN_STATE_SECRET_LEN,
	error::{ConfigError, StateError},
};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 32;
const DEFAULT_TTL: Duration = Duration::minutes(10);

/// State payload round-tripped through the signed cookie value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationState {
	/// Random nonce embedded in the redirect URL's `state` parameter.
	pub nonce: String,
	/// Issuance instant, unix timestamp seconds.
	#[serde(with = "time::serde::timestamp")]
	pub issued_at: OffsetDateTime,
	/// Validity window starting at `issued_at`.
	pub ttl: Duration,
}
impl AuthorizationState {
	/// Instant after which verification fails with [`StateError::Expired`].
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at + self.ttl
	}
}

/// Nonce plus signed cookie value produced by [`StateManager::issue_state`].
#[derive(Clone, Debug)]
pub struct IssuedState {
	/// Raw nonce for the redirect URL's `state` parameter.
	pub nonce: String,
	/// Tamper-evident value the host should store in the state cookie.
	pub cookie_value: String,
}

/// Proof that state verification succeeded for one authorization attempt.
///
/// The type is deliberately not `Clone`: APIs that require verified state take it by value, so a
/// single verification authorizes at most one code exchange.
pub struct VerifiedState {
	nonce: String,
}
impl VerifiedState {
	/// The nonce that was verified.
	pub fn nonce(&self) -> &str {
		&self.nonce
	}
}
impl Debug for VerifiedState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("VerifiedState").field("nonce", &self.nonce).finish()
	}
}

/// Issues and verifies signed anti-forgery state values.
///
/// Holds only the signing secret and TTL; concurrent authorization attempts share a manager
/// freely because issuance draws fresh randomness per call and verification is pure.
#[derive(Clone)]
pub struct StateManager {
	secret: Vec<u8>,
	ttl: Duration,
}
impl StateManager {
	/// Creates a manager signing with the provided secret.
	///
	/// Secrets shorter than [`MIN_STATE_SECRET_LEN`] bytes are rejected; a guessable signing key
	/// would let an attacker mint valid state cookies.
	pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
		let secret = secret.into();

		if secret.len() < MIN_STATE_SECRET_LEN {
			return Err(ConfigError::WeakStateSecret { minimum: MIN_STATE_SECRET_LEN });
		}

		Ok(Self { secret, ttl: DEFAULT_TTL })
	}

	/// Overrides the state TTL (defaults to 10 minutes).
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// The TTL applied to issued state.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Generates a fresh nonce and packages it into a signed cookie value.
	pub fn issue_state(&self) -> IssuedState {
		self.issue_state_at(OffsetDateTime::now_utc())
	}

	/// Clock-injected variant of [`issue_state`](Self::issue_state).
	pub fn issue_state_at(&self, now: OffsetDateTime) -> IssuedState {
		let nonce = random_nonce();
		let state = AuthorizationState { nonce: nonce.clone(), issued_at: now, ttl: self.ttl };
		let cookie_value = self.seal(&state);

		IssuedState { nonce, cookie_value }
	}

	/// Verifies the callback's state parameter against the cookie set on redirect.
	///
	/// Checks run strictest-first: signature, then TTL, then nonce equality. Callers must clear
	/// the cookie after a successful verification; the engine signals consumption through the
	/// returned [`VerifiedState`] but cookie storage belongs to the host.
	pub fn verify_state(
		&self,
		cookie_value: Option<&str>,
		state_param: &str,
	) -> Result<VerifiedState, StateError> {
		self.verify_state_at(cookie_value, state_param, OffsetDateTime::now_utc())
	}

	/// Clock-injected variant of [`verify_state`](Self::verify_state).
	pub fn verify_state_at(
		&self,
		cookie_value: Option<&str>,
		state_param: &str,
		now: OffsetDateTime,
	) -> Result<VerifiedState, StateError> {
		let cookie_value = cookie_value.ok_or(StateError::Missing)?;
		let state = self.unseal(cookie_value)?;

		if now > state.expires_at() {
			return Err(StateError::Expired);
		}
		if state.nonce != state_param {
			return Err(StateError::Mismatch);
		}

		Ok(VerifiedState { nonce: state.nonce })
	}

	fn seal(&self, state: &AuthorizationState) -> String {
		let payload = serde_json::to_vec(state)
			.expect("AuthorizationState serialization cannot fail for in-memory values.");
		let mut mac = HmacSha256::new_from_slice(&self.secret)
			.expect("HMAC accepts keys of any length above the enforced minimum.");

		mac.update(&payload);

		let tag = mac.finalize().into_bytes();

		format!("{}.{}", URL_SAFE_NO_PAD.encode(&payload), URL_SAFE_NO_PAD.encode(tag))
	}

	fn unseal(&self, cookie_value: &str) -> Result<AuthorizationState, StateError> {
		let (payload_part, tag_part) =
			cookie_value.split_once('.').ok_or(StateError::TamperDetected)?;
		let payload =
			URL_SAFE_NO_PAD.decode(payload_part).map_err(|_| StateError::TamperDetected)?;
		let tag = URL_SAFE_NO_PAD.decode(tag_part).map_err(|_| StateError::TamperDetected)?;
		let mut mac = HmacSha256::new_from_slice(&self.secret)
			.expect("HMAC accepts keys of any length above the enforced minimum.");

		mac.update(&payload);
		mac.verify_slice(&tag).map_err(|_| StateError::TamperDetected)?;

		serde_json::from_slice(&payload).map_err(|_| StateError::TamperDetected)
	}
}
impl Debug for StateManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StateManager").field("ttl", &self.ttl).finish()
	}
}

fn random_nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashSet;
	// self
	use super::*;

	fn manager() -> StateManager {
		StateManager::new(*b"0123456789abcdef0123456789abcdef")
			.expect("Test secret should satisfy the minimum length.")
	}

	#[test]
	fn rejects_short_secrets() {
		let err = StateManager::new(b"too-short".to_vec())
			.expect_err("Secrets below the minimum length should be rejected.");

		assert!(matches!(err, ConfigError::WeakStateSecret { .. }));
	}

	#[test]
	fn issue_then_verify_roundtrips() {
		let manager = manager();
		let issued = manager.issue_state();
		let verified = manager
			.verify_state(Some(&issued.cookie_value), &issued.nonce)
			.expect("Freshly issued state should verify successfully.");

		assert_eq!(verified.nonce(), issued.nonce);
	}

	#[test]
	fn missing_cookie_fails_with_missing() {
		let err = manager()
			.verify_state(None, "whatever")
			.expect_err("Absent cookies should fail verification.");

		assert_eq!(err, StateError::Missing);
	}

	#[test]
	fn mismatched_param_fails_with_mismatch() {
		let manager = manager();
		let issued = manager.issue_state();
		let err = manager
			.verify_state(Some(&issued.cookie_value), "not-the-nonce")
			.expect_err("A foreign state parameter should fail verification.");

		assert_eq!(err, StateError::Mismatch);
	}

	#[test]
	fn tampered_cookie_fails_with_tamper_detected() {
		let manager = manager();
		let issued = manager.issue_state();
		// Flip the first payload character; the MAC no longer matches.
		let mut forged: Vec<char> = issued.cookie_value.chars().collect();

		forged[0] = if forged[0] == 'A' { 'B' } else { 'A' };

		let forged: String = forged.into_iter().collect();
		let err = manager
			.verify_state(Some(&forged), &issued.nonce)
			.expect_err("A modified cookie value should fail verification.");

		assert_eq!(err, StateError::TamperDetected);

		let err = manager
			.verify_state(Some("no-dot-separator"), &issued.nonce)
			.expect_err("A structurally invalid cookie value should fail verification.");

		assert_eq!(err, StateError::TamperDetected);
	}

	#[test]
	fn cookie_signed_with_other_key_fails_with_tamper_detected() {
		let issued = manager().issue_state();
		let other = StateManager::new(*b"ffffffffffffffffffffffffffffffff")
			.expect("Test secret should satisfy the minimum length.");
		let err = other
			.verify_state(Some(&issued.cookie_value), &issued.nonce)
			.expect_err("A cookie signed under a different key should fail verification.");

		assert_eq!(err, StateError::TamperDetected);
	}

	#[test]
	fn elapsed_ttl_fails_with_expired() {
		let manager = manager().with_ttl(Duration::minutes(10));
		let issued_at = OffsetDateTime::now_utc();
		let issued = manager.issue_state_at(issued_at);
		let err = manager
			.verify_state_at(
				Some(&issued.cookie_value),
				&issued.nonce,
				issued_at + Duration::minutes(11),
			)
			.expect_err("State older than its TTL should fail verification.");

		assert_eq!(err, StateError::Expired);

		// Still valid one minute before the deadline.
		manager
			.verify_state_at(
				Some(&issued.cookie_value),
				&issued.nonce,
				issued_at + Duration::minutes(9),
			)
			.expect("State within its TTL should verify successfully.");
	}

	#[test]
	fn nonces_are_never_reused() {
		let manager = manager();
		let mut seen = HashSet::new();

		for _ in 0..10_000 {
			assert!(
				seen.insert(manager.issue_state().nonce),
				"Issued nonces must be distinct across draws."
			);
		}
	}
}
