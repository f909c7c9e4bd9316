//! Basic-auth-derived bearer tokens.
//!
//! The username/password pair is sent once per refresh as an `Authorization: Basic` header; the
//! server answers with a bearer token and its absolute expiry.

// crates.io
use ::http::{
	Method,
	header::{ACCEPT, AUTHORIZATION, HeaderValue},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{MintedToken, Secret, provider},
	error::{AuthProtocolError, ConfigError},
	http::HttpRequest,
	obs::FlowKind,
};

/// Path of the basic-auth token endpoint, relative to the server base URL.
pub const BASIC_TOKEN_PATH: &str = "/api/v1/auth/token";

/// Token endpoint response for basic-auth exchanges.
#[derive(Clone, Deserialize)]
pub struct BasicTokenResponse {
	/// Bearer token; must be non-empty.
	pub token: String,
	/// Absolute expiry as an RFC 3339 timestamp.
	#[serde(with = "time::serde::rfc3339")]
	pub expires: OffsetDateTime,
}
impl Debug for BasicTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BasicTokenResponse")
			.field("token", &"<redacted>")
			.field("expires", &self.expires)
			.finish()
	}
}

/// Username/password pair exchanged for a bearer token.
#[derive(Clone, Debug)]
pub struct BasicAuthCredentials {
	username: String,
	password: Secret,
}
impl BasicAuthCredentials {
	/// Validates and stores the account credentials.
	pub fn new(
		username: impl Into<String>,
		password: impl Into<Secret>,
	) -> Result<Self, ConfigError> {
		let username = username.into();
		let password = password.into();

		if username.is_empty() {
			return Err(ConfigError::MissingCredential { field: "username" });
		}
		if password.is_empty() {
			return Err(ConfigError::MissingCredential { field: "password" });
		}

		Ok(Self { username, password })
	}

	/// Configured account name.
	pub fn username(&self) -> &str {
		&self.username
	}

	/// Builds the token request carrying the `Authorization: Basic` header.
	pub fn token_request(&self, base_url: &Url) -> Result<HttpRequest> {
		let endpoint = provider::endpoint_url(base_url, BASIC_TOKEN_PATH)?;
		let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password.expose()));
		let mut authorization = HeaderValue::from_str(&format!("Basic {encoded}"))
			.map_err(|e| ConfigError::from(::http::Error::from(e)))?;

		authorization.set_sensitive(true);

		let request = ::http::Request::builder()
			.method(Method::POST)
			.uri(endpoint.as_str())
			.header(AUTHORIZATION, authorization)
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;

		Ok(request)
	}

	/// Reads the bearer token and its absolute expiry out of a token endpoint response.
	pub fn parse_token(body: &[u8]) -> Result<MintedToken> {
		const FLOW: FlowKind = FlowKind::BasicToken;

		let response: BasicTokenResponse = provider::parse_json(FLOW, body)?;

		if response.token.is_empty() {
			return Err(AuthProtocolError::EmptyToken { flow: FLOW }.into());
		}

		Ok(MintedToken { token: Secret::new(response.token), expires_at: response.expires })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn empty_credentials_are_rejected() {
		assert!(matches!(
			BasicAuthCredentials::new("", "password"),
			Err(ConfigError::MissingCredential { field: "username" })
		));
		assert!(matches!(
			BasicAuthCredentials::new("admin", ""),
			Err(ConfigError::MissingCredential { field: "password" })
		));
	}

	#[test]
	fn token_request_carries_basic_authorization() {
		let credentials =
			BasicAuthCredentials::new("admin", "hunter2").expect("Basic fixture should be valid.");
		let base = Url::parse("https://jamf.example.com").expect("Base URL fixture should parse.");
		let request = credentials.token_request(&base).expect("Token request should build.");
		let authorization = request
			.headers()
			.get(AUTHORIZATION)
			.expect("Authorization header should be present.");

		assert_eq!(*request.method(), Method::POST);
		assert_eq!(request.uri(), "https://jamf.example.com/api/v1/auth/token");
		assert_eq!(authorization.to_str().ok(), Some("Basic YWRtaW46aHVudGVyMg=="));
		assert!(authorization.is_sensitive());

		let tenant =
			Url::parse("https://jamf.example.com/tenant").expect("Base URL fixture should parse.");
		let request = credentials.token_request(&tenant).expect("Token request should build.");

		assert_eq!(request.uri(), "https://jamf.example.com/tenant/api/v1/auth/token");
	}

	#[test]
	fn parse_token_uses_absolute_expiry() {
		let minted = BasicAuthCredentials::parse_token(
			b"{\"token\":\"basic-token\",\"expires\":\"2025-01-01T00:30:00.123Z\"}",
		)
		.expect("Token response should parse.");

		assert_eq!(minted.token.expose(), "basic-token");
		assert_eq!(
			minted.expires_at,
			macros::datetime!(2025-01-01 00:30:00.123 UTC)
		);
	}

	#[test]
	fn parse_token_rejects_unusable_responses() {
		assert!(matches!(
			BasicAuthCredentials::parse_token(
				b"{\"token\":\"\",\"expires\":\"2025-01-01T00:30:00Z\"}"
			),
			Err(Error::AuthProtocol(AuthProtocolError::EmptyToken { .. }))
		));

		match BasicAuthCredentials::parse_token(b"{\"token\":\"t\",\"expires\":\"tomorrow\"}") {
			Err(Error::AuthProtocol(AuthProtocolError::MalformedResponse { source, .. })) =>
				assert_eq!(source.path().to_string(), "expires"),
			other => panic!("Unexpected parse result: {other:?}."),
		}
	}
}
