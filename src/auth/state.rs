//! Held bearer token, its expiry, and the lifecycle status derived from them.

// self
use crate::{_prelude::*, auth::Secret};

/// Lifecycle status of the held token relative to a buffer period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// No token has ever been obtained.
	Unset,
	/// Token is present, not expired, and outside the buffer window.
	Valid,
	/// Token is expired or inside the buffer window and must be refreshed before use.
	Stale,
}

/// Token material held by a credential provider.
///
/// A state is only ever replaced as a whole, so a failed exchange can never leave a new token
/// paired with an old expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialState {
	/// Bearer token; empty until the first successful exchange.
	pub token: Secret,
	/// Absolute expiry; meaningful only when `token` is non-empty.
	pub expires_at: OffsetDateTime,
}
impl CredentialState {
	/// State of a provider that has never obtained a token.
	pub fn unset() -> Self {
		Self { token: Secret::default(), expires_at: OffsetDateTime::UNIX_EPOCH }
	}

	/// State holding a freshly minted token.
	pub fn new(token: Secret, expires_at: OffsetDateTime) -> Self {
		Self { token, expires_at }
	}

	/// Returns `true` if no token is held.
	pub fn is_empty(&self) -> bool {
		self.token.is_empty()
	}

	/// Returns `true` if the token has expired at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}

	/// Returns `true` if the time left until expiry is within `buffer`.
	pub fn is_in_buffer_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
		self.expires_at - now <= buffer
	}

	/// Time left until expiry; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Computes the lifecycle status at `now` for the given buffer period.
	pub fn status_at(&self, now: OffsetDateTime, buffer: Duration) -> TokenStatus {
		if self.is_empty() {
			return TokenStatus::Unset;
		}
		if self.is_expired_at(now) || self.is_in_buffer_at(now, buffer) {
			return TokenStatus::Stale;
		}

		TokenStatus::Valid
	}
}
impl Default for CredentialState {
	fn default() -> Self {
		Self::unset()
	}
}
impl Debug for CredentialState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialState")
			.field("token", &if self.is_empty() { "<empty>" } else { "<redacted>" })
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
