//! OAuth2 `client_credentials` token minting.

// crates.io
use ::http::{
	Method,
	header::{ACCEPT, CONTENT_TYPE},
};
use url::form_urlencoded::Serializer as FormSerializer;
// self
use crate::{
	_prelude::*,
	auth::{MintedToken, Secret, provider},
	error::{AuthProtocolError, ConfigError},
	http::HttpRequest,
	obs::FlowKind,
};

/// Path of the OAuth2 token endpoint, relative to the server base URL.
pub const OAUTH_TOKEN_PATH: &str = "/api/oauth/token";

/// Token endpoint response for the `client_credentials` grant.
#[derive(Clone, Deserialize)]
pub struct OAuthTokenResponse {
	/// Bearer token; must be non-empty.
	pub access_token: String,
	/// Lifetime in seconds, counted from receipt.
	pub expires_in: i64,
	/// Token type reported by the server (normally `Bearer`).
	#[serde(default)]
	pub token_type: Option<String>,
	/// Refresh token, when the server issues one.
	#[serde(default)]
	pub refresh_token: Option<String>,
}
impl Debug for OAuthTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthTokenResponse")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// API client id/secret pair exchanged through the `client_credentials` grant.
#[derive(Clone, Debug)]
pub struct OAuthClientCredentials {
	client_id: String,
	client_secret: Secret,
}
impl OAuthClientCredentials {
	/// Validates and stores the API client credentials.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
	) -> Result<Self, ConfigError> {
		let client_id = client_id.into();
		let client_secret = client_secret.into();

		if client_id.is_empty() {
			return Err(ConfigError::MissingCredential { field: "client_id" });
		}
		if client_secret.is_empty() {
			return Err(ConfigError::MissingCredential { field: "client_secret" });
		}

		Ok(Self { client_id, client_secret })
	}

	/// Configured API client id.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Builds the form-encoded token request.
	pub fn token_request(&self, base_url: &Url) -> Result<HttpRequest> {
		let endpoint = provider::endpoint_url(base_url, OAUTH_TOKEN_PATH)?;
		let body = FormSerializer::new(String::new())
			.append_pair("client_id", &self.client_id)
			.append_pair("client_secret", self.client_secret.expose())
			.append_pair("grant_type", "client_credentials")
			.finish();
		let request = ::http::Request::builder()
			.method(Method::POST)
			.uri(endpoint.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json")
			.body(body.into_bytes())
			.map_err(ConfigError::from)?;

		Ok(request)
	}

	/// Reads the access token out of a token endpoint response received at `now`.
	pub fn parse_token(body: &[u8], now: OffsetDateTime) -> Result<MintedToken> {
		const FLOW: FlowKind = FlowKind::ClientCredentials;

		let response: OAuthTokenResponse = provider::parse_json(FLOW, body)?;

		if response.access_token.is_empty() {
			return Err(AuthProtocolError::EmptyToken { flow: FLOW }.into());
		}

		let expires_at = now
			.checked_add(Duration::seconds(response.expires_in))
			.ok_or(AuthProtocolError::ExpiryOutOfRange { flow: FLOW })?;

		Ok(MintedToken { token: Secret::new(response.access_token), expires_at })
	}
}
