//! Credential provider shared by every auth method.
//!
//! The provider owns the [`CredentialState`] and is the only code that mutates it. Each
//! [`AuthMethod`] variant knows how to build its identity request and how to read the token out of
//! the response; the provider runs the exchange, records the diagnostic, and swaps the new state
//! in only once every check has passed.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{BasicAuthCredentials, CredentialState, OAuthClientCredentials, Secret, TokenStatus},
	clock::Clock,
	error::{AuthProtocolError, ConfigError, TransportError},
	http::{HttpExecutor, HttpRequest},
	obs::{self, ExchangeDiagnostic, FlowKind, FlowOutcome, FlowSpan},
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Token returned by a successful identity exchange, not yet installed.
#[derive(Debug)]
pub struct MintedToken {
	/// Bearer token.
	pub token: Secret,
	/// Absolute expiry derived from the response.
	pub expires_at: OffsetDateTime,
}

/// Authentication strategy, selected once at construction.
#[derive(Clone, Debug)]
pub enum AuthMethod {
	/// OAuth2 `client_credentials` grant.
	OAuth(OAuthClientCredentials),
	/// Username/password exchanged for a bearer token.
	Basic(BasicAuthCredentials),
}
impl AuthMethod {
	/// Short label describing the method (`oauth2` or `basic`).
	pub const fn descriptor(&self) -> &'static str {
		match self {
			Self::OAuth(_) => "oauth2",
			Self::Basic(_) => "basic",
		}
	}

	/// Flow label used for spans, metrics, and error context.
	pub const fn flow(&self) -> FlowKind {
		match self {
			Self::OAuth(_) => FlowKind::ClientCredentials,
			Self::Basic(_) => FlowKind::BasicToken,
		}
	}

	/// Builds the identity endpoint request relative to `base_url`.
	pub fn token_request(&self, base_url: &Url) -> Result<HttpRequest> {
		match self {
			Self::OAuth(credentials) => credentials.token_request(base_url),
			Self::Basic(credentials) => credentials.token_request(base_url),
		}
	}

	/// Reads the token and its expiry out of a successful response body.
	pub fn parse_token(&self, body: &[u8], now: OffsetDateTime) -> Result<MintedToken> {
		match self {
			Self::OAuth(_) => OAuthClientCredentials::parse_token(body, now),
			Self::Basic(_) => BasicAuthCredentials::parse_token(body),
		}
	}
}
impl From<OAuthClientCredentials> for AuthMethod {
	fn from(value: OAuthClientCredentials) -> Self {
		Self::OAuth(value)
	}
}
impl From<BasicAuthCredentials> for AuthMethod {
	fn from(value: BasicAuthCredentials) -> Self {
		Self::Basic(value)
	}
}

/// Holds one bearer token and mints replacements through the configured [`AuthMethod`].
pub struct CredentialProvider<E>
where
	E: ?Sized + HttpExecutor,
{
	method: AuthMethod,
	base_url: Url,
	buffer: Duration,
	hide_sensitive_data: bool,
	executor: Arc<E>,
	clock: Arc<dyn Clock>,
	state: CredentialState,
}
impl<E> CredentialProvider<E>
where
	E: ?Sized + HttpExecutor,
{
	/// Creates a provider with an empty token.
	pub fn new(
		method: impl Into<AuthMethod>,
		base_url: Url,
		buffer: Duration,
		executor: impl Into<Arc<E>>,
		clock: Arc<dyn Clock>,
	) -> Result<Self, ConfigError> {
		if buffer.is_negative() {
			return Err(ConfigError::NegativeBufferPeriod);
		}

		Ok(Self {
			method: method.into(),
			base_url,
			buffer,
			hide_sensitive_data: false,
			executor: executor.into(),
			clock,
			state: CredentialState::unset(),
		})
	}

	/// Keeps identity response bodies out of diagnostics when `hide` is set.
	pub fn with_hide_sensitive_data(mut self, hide: bool) -> Self {
		self.hide_sensitive_data = hide;

		self
	}

	/// Performs one exchange against the identity endpoint and installs the returned token.
	///
	/// On any failure the previously held token and expiry are left untouched.
	pub async fn obtain_token(&mut self) -> Result<()> {
		let kind = self.method.flow();
		let span = FlowSpan::new(kind, "obtain_token");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result: Result<MintedToken> = span
			.instrument(async {
				let request = self.method.token_request(&self.base_url)?;
				let body =
					exchange(self.executor.as_ref(), kind, request, self.hide_sensitive_data).await?;

				self.method.parse_token(&body, self.clock.now())
			})
			.await;

		match result {
			Ok(minted) => {
				obs::record_token_obtained(kind, minted.expires_at);
				obs::record_flow_outcome(kind, FlowOutcome::Success);

				self.state = CredentialState::new(minted.token, minted.expires_at);

				Ok(())
			},
			Err(e) => {
				obs::record_flow_outcome(kind, FlowOutcome::Failure);

				Err(e)
			},
		}
	}

	/// Current token verbatim; empty until the first successful exchange.
	pub fn token_string(&self) -> &str {
		self.state.token.expose()
	}

	/// Returns `true` once the expiry instant has been reached.
	pub fn expired(&self) -> bool {
		self.state.is_expired_at(self.clock.now())
	}

	/// Returns `true` when the time left until expiry is within the buffer period.
	pub fn in_buffer(&self) -> bool {
		self.state.is_in_buffer_at(self.clock.now(), self.buffer)
	}

	/// Returns `true` if no token has been obtained yet.
	pub fn empty(&self) -> bool {
		self.state.is_empty()
	}

	/// Absolute expiry of the held token.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.state.expires_at
	}

	/// Lifecycle status of the held token right now.
	pub fn status(&self) -> TokenStatus {
		self.state.status_at(self.clock.now(), self.buffer)
	}

	/// Time left until the held token expires; negative once expired.
	pub fn remaining(&self) -> Duration {
		self.state.remaining_at(self.clock.now())
	}

	/// Configured buffer period.
	pub fn buffer_period(&self) -> Duration {
		self.buffer
	}

	/// Configured auth method.
	pub fn method(&self) -> &AuthMethod {
		&self.method
	}

	/// Base URL identity endpoints are resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Whether identity response bodies are kept out of diagnostics.
	pub fn hides_sensitive_data(&self) -> bool {
		self.hide_sensitive_data
	}

	/// Executor shared with the rest of the integration.
	pub fn executor(&self) -> &Arc<E> {
		&self.executor
	}

	/// Clock used for every expiry check.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}
}
impl<E> Debug for CredentialProvider<E>
where
	E: ?Sized + HttpExecutor,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialProvider")
			.field("method", &self.method)
			.field("base_url", &self.base_url.as_str())
			.field("buffer", &self.buffer)
			.field("hide_sensitive_data", &self.hide_sensitive_data)
			.field("state", &self.state)
			.finish()
	}
}

/// Sends an identity request and returns the body of a 2xx response.
pub(crate) async fn exchange<E>(
	executor: &E,
	flow: FlowKind,
	request: HttpRequest,
	hide_sensitive_data: bool,
) -> Result<Vec<u8>>
where
	E: ?Sized + HttpExecutor,
{
	let endpoint = request.uri().to_string();
	let response =
		executor.execute(request).await.map_err(|e| TransportError::network(flow, e))?;
	let status = response.status();
	let body = response.into_body();

	obs::record_exchange(&ExchangeDiagnostic::new(
		flow,
		&endpoint,
		status.as_u16(),
		&body,
		hide_sensitive_data,
	));

	if !status.is_success() {
		let body_preview =
			if hide_sensitive_data { String::new() } else { truncate_preview(&body) };

		return Err(
			AuthProtocolError::UnexpectedStatus { flow, status: status.as_u16(), body_preview }
				.into(),
		);
	}

	Ok(body)
}

/// Appends `endpoint` to `base_url`, keeping any path prefix of the base.
pub(crate) fn endpoint_url(base_url: &Url, endpoint: &str) -> Result<Url, ConfigError> {
	let raw = format!(
		"{}/{}",
		base_url.as_str().trim_end_matches('/'),
		endpoint.trim_start_matches('/')
	);

	Url::parse(&raw)
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source })
}

/// Deserializes a JSON identity response, keeping the path of the offending field.
pub(crate) fn parse_json<T>(flow: FlowKind, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AuthProtocolError::MalformedResponse { flow, source }.into())
}

fn truncate_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}
