//! Credential providers and the token lifecycle controller.
//!
//! [`CredentialProvider`] owns the bearer token and its expiry and knows how to mint a fresh one
//! from either OAuth2 client credentials or a username/password pair. [`TokenController`] sits in
//! front of it and decides, before each outbound request, whether the held token must be
//! refreshed.

pub mod basic;
pub mod lifecycle;
pub mod oauth;
pub mod provider;
pub mod secret;
pub mod state;

pub use basic::*;
pub use lifecycle::*;
pub use oauth::*;
pub use provider::*;
pub use secret::*;
pub use state::*;
