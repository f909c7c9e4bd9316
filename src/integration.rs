//! Orchestrator-facing facade over the token lifecycle and affinity resolver.
//!
//! An [`Integration`] targets one Jamf Pro server. It owns a [`TokenController`] and an
//! [`AffinityResolver`] that share one [`HttpExecutor`] and one [`Clock`], and exposes what a
//! request orchestrator needs before sending each request: URL construction, request preparation
//! (bearer header, sticky cookie, default headers), and sticky-session discovery.
//!
//! Methods take `&mut self`; callers that share one integration across tasks wrap it in a
//! [`SharedIntegration`], which serializes access through an async mutex.

// crates.io
use ::http::header::{ACCEPT, COOKIE, HeaderValue, USER_AGENT};
// self
use crate::{
	_prelude::*,
	affinity::{
		Affinity, AffinityResolver, DEFAULT_AFFINITY_COOKIE, DEFAULT_AFFINITY_TIMEOUT,
		SessionCookie,
	},
	auth::{
		AuthMethod, BasicAuthCredentials, CredentialProvider, OAuthClientCredentials, Secret,
		TokenController, provider,
	},
	clock::{Clock, SystemClock},
	error::ConfigError,
	http::{HttpExecutor, HttpRequest},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestExecutor;

/// Buffer period applied when none is configured.
pub const DEFAULT_BUFFER_PERIOD: Duration = Duration::seconds(10);
/// `User-Agent` sent when the request does not carry one.
pub const DEFAULT_USER_AGENT: &str = concat!("jamfpro-session/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
enum CredentialInput {
	OAuth { client_id: String, client_secret: Secret },
	Basic { username: String, password: Secret },
}
impl CredentialInput {
	fn into_method(self) -> Result<AuthMethod, ConfigError> {
		Ok(match self {
			Self::OAuth { client_id, client_secret } =>
				OAuthClientCredentials::new(client_id, client_secret)?.into(),
			Self::Basic { username, password } =>
				BasicAuthCredentials::new(username, password)?.into(),
		})
	}
}

/// Builder for [`Integration`] values; every setting is validated in one place when building.
#[derive(Clone)]
pub struct IntegrationBuilder {
	fqdn: String,
	credentials: Option<CredentialInput>,
	buffer_period: Duration,
	expected_token_lifetime: Option<Duration>,
	hide_sensitive_data: bool,
	affinity_timeout: Duration,
	affinity_cookie_name: String,
	user_agent: String,
	clock: Option<Arc<dyn Clock>>,
}
impl IntegrationBuilder {
	/// Creates a builder targeting `fqdn` (a bare host or a full `http(s)://` base URL).
	pub fn new(fqdn: impl Into<String>) -> Self {
		Self {
			fqdn: fqdn.into(),
			credentials: None,
			buffer_period: DEFAULT_BUFFER_PERIOD,
			expected_token_lifetime: None,
			hide_sensitive_data: false,
			affinity_timeout: DEFAULT_AFFINITY_TIMEOUT,
			affinity_cookie_name: DEFAULT_AFFINITY_COOKIE.into(),
			user_agent: DEFAULT_USER_AGENT.into(),
			clock: None,
		}
	}

	/// Authenticates with an API client through the OAuth2 `client_credentials` grant.
	pub fn oauth(mut self, client_id: impl Into<String>, client_secret: impl Into<Secret>) -> Self {
		self.credentials = Some(CredentialInput::OAuth {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
		});

		self
	}

	/// Authenticates with a username/password pair exchanged for a bearer token.
	pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
		self.credentials =
			Some(CredentialInput::Basic { username: username.into(), password: password.into() });

		self
	}

	/// Sets how long before expiry a token is already treated as stale.
	pub fn buffer_period(mut self, buffer: Duration) -> Self {
		self.buffer_period = buffer;

		self
	}

	/// Declares the token lifetime the server is known to issue, so an oversized buffer period is
	/// rejected before any exchange.
	pub fn expected_token_lifetime(mut self, lifetime: Duration) -> Self {
		self.expected_token_lifetime = Some(lifetime);

		self
	}

	/// Keeps identity response bodies out of diagnostics and error previews.
	pub fn hide_sensitive_data(mut self, hide: bool) -> Self {
		self.hide_sensitive_data = hide;

		self
	}

	/// Bounds each sticky-session probing run (defaults to 7 seconds).
	pub fn affinity_timeout(mut self, timeout: Duration) -> Self {
		self.affinity_timeout = timeout;

		self
	}

	/// Overrides the sticky-session cookie name (defaults to `jpro-ingress`).
	pub fn affinity_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.affinity_cookie_name = name.into();

		self
	}

	/// Overrides the default `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Injects the clock used for expiry checks and probing deadlines.
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);

		self
	}

	/// Validates the settings and assembles an integration around `executor`.
	///
	/// No network traffic happens here; see [`connect_with_executor`](Self::connect_with_executor)
	/// to also mint the first token.
	pub fn build_with_executor<E>(
		self,
		executor: impl Into<Arc<E>>,
	) -> Result<Integration<E>, ConfigError>
	where
		E: ?Sized + HttpExecutor,
	{
		let base_url = parse_base_url(&self.fqdn)?;
		let method = self.credentials.ok_or(ConfigError::MissingAuthMethod)?.into_method()?;

		if let Some(lifetime) =
			self.expected_token_lifetime.filter(|lifetime| self.buffer_period >= *lifetime)
		{
			return Err(ConfigError::BufferExceedsLifetime { buffer: self.buffer_period, lifetime });
		}

		let user_agent = HeaderValue::from_str(&self.user_agent)
			.map_err(|e| ConfigError::from(::http::Error::from(e)))?;
		let executor = executor.into();
		let clock: Arc<dyn Clock> = match self.clock {
			Some(clock) => clock,
			None => Arc::new(SystemClock),
		};
		let provider = CredentialProvider::new(
			method,
			base_url.clone(),
			self.buffer_period,
			executor.clone(),
			clock.clone(),
		)?
		.with_hide_sensitive_data(self.hide_sensitive_data);
		let resolver = AffinityResolver::new(executor, clock)
			.with_cookie_name(self.affinity_cookie_name)
			.with_timeout(self.affinity_timeout)?;
		let fqdn = base_url.as_str().trim_end_matches('/').to_owned();

		Ok(Integration {
			fqdn,
			base_url,
			controller: TokenController::new(provider),
			resolver,
			affinity: None,
			user_agent,
		})
	}

	/// Builds the integration, then mints the first token.
	///
	/// A buffer period that is not shorter than the lifetime the server actually issues is
	/// reported here as [`ConfigError::BufferExceedsLifetime`].
	pub async fn connect_with_executor<E>(
		self,
		executor: impl Into<Arc<E>>,
	) -> Result<Integration<E>>
	where
		E: ?Sized + HttpExecutor,
	{
		let mut integration = self.build_with_executor(executor)?;

		integration.ensure_fresh().await?;

		Ok(integration)
	}

	/// Builds the integration on top of a fresh reqwest client.
	#[cfg(feature = "reqwest")]
	pub fn build(self) -> Result<Integration<ReqwestExecutor>, ConfigError> {
		let client = ReqwestClient::builder().build()?;

		self.build_with_executor(ReqwestExecutor::with_client(client))
	}

	/// Builds the integration on top of a fresh reqwest client, then mints the first token.
	#[cfg(feature = "reqwest")]
	pub async fn connect(self) -> Result<Integration<ReqwestExecutor>> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		self.connect_with_executor(ReqwestExecutor::with_client(client)).await
	}
}
impl Debug for IntegrationBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IntegrationBuilder")
			.field("fqdn", &self.fqdn)
			.field("credentials", &self.credentials)
			.field("buffer_period", &self.buffer_period)
			.field("expected_token_lifetime", &self.expected_token_lifetime)
			.field("hide_sensitive_data", &self.hide_sensitive_data)
			.field("affinity_timeout", &self.affinity_timeout)
			.field("affinity_cookie_name", &self.affinity_cookie_name)
			.field("user_agent", &self.user_agent)
			.finish()
	}
}

/// Session layer for one Jamf Pro server.
pub struct Integration<E>
where
	E: ?Sized + HttpExecutor,
{
	fqdn: String,
	base_url: Url,
	controller: TokenController<E>,
	resolver: AffinityResolver<E>,
	affinity: Option<Affinity>,
	user_agent: HeaderValue,
}
impl<E> Integration<E>
where
	E: ?Sized + HttpExecutor,
{
	/// Base URL of the target server, without a trailing slash.
	pub fn fqdn(&self) -> &str {
		&self.fqdn
	}

	/// Parsed base URL of the target server.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Label of the configured auth method (`oauth2` or `basic`).
	pub fn auth_method_descriptor(&self) -> &'static str {
		self.controller.provider().method().descriptor()
	}

	/// Appends `endpoint` (e.g. `/api/v1/computers-inventory`) to the base URL.
	pub fn construct_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
		provider::endpoint_url(&self.base_url, endpoint)
	}

	/// Token lifecycle controller.
	pub fn token_controller(&self) -> &TokenController<E> {
		&self.controller
	}

	/// Mutable access to the token lifecycle controller.
	pub fn token_controller_mut(&mut self) -> &mut TokenController<E> {
		&mut self.controller
	}

	/// Refreshes the held token if it is empty, expired, or inside the buffer window.
	pub async fn ensure_fresh(&mut self) -> Result<()> {
		self.controller.ensure_fresh().await
	}

	/// Makes `request` ready to send.
	///
	/// Stamps a fresh bearer token, attaches the cached sticky-session cookie (if any), and fills
	/// in `Accept: application/json` and the configured `User-Agent` when they are missing.
	pub async fn prepare_request(&mut self, request: &mut HttpRequest) -> Result<()> {
		self.controller.authorize(request).await?;

		if let Some(cookie) = self.affinity.as_ref().map(|affinity| &affinity.cookie) {
			attach_cookie(request, cookie)?;
		}

		let headers = request.headers_mut();

		if !headers.contains_key(ACCEPT) {
			headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
		}
		if !headers.contains_key(USER_AGENT) {
			headers.insert(USER_AGENT, self.user_agent.clone());
		}

		Ok(())
	}

	/// Probes `url` and returns the selected sticky-session backend without caching it.
	pub async fn resolve_affinity(&mut self, url: &Url) -> Result<Affinity> {
		self.resolver.resolve(&mut self.controller, url).await
	}

	/// Resolves the sticky-session cookie for `url` and caches it for later
	/// [`prepare_request`](Self::prepare_request) calls.
	pub async fn session_cookies(&mut self, url: &Url) -> Result<Vec<SessionCookie>> {
		let affinity = self.resolve_affinity(url).await?;
		let cookies = vec![affinity.cookie.clone()];

		self.affinity = Some(affinity);

		Ok(cookies)
	}

	/// Cached affinity from the last [`session_cookies`](Self::session_cookies) call.
	pub fn affinity(&self) -> Option<&Affinity> {
		self.affinity.as_ref()
	}

	/// Forgets the cached affinity so requests are no longer pinned.
	pub fn clear_affinity(&mut self) -> Option<Affinity> {
		self.affinity.take()
	}

	/// Moves the integration behind an async mutex for shared use.
	pub fn into_shared(self) -> SharedIntegration<E> {
		SharedIntegration::new(self)
	}
}
impl<E> Debug for Integration<E>
where
	E: ?Sized + HttpExecutor,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Integration")
			.field("fqdn", &self.fqdn)
			.field("controller", &self.controller)
			.field("resolver", &self.resolver)
			.field("affinity", &self.affinity)
			.finish()
	}
}

/// Cloneable handle that serializes access to one [`Integration`].
pub struct SharedIntegration<E>
where
	E: ?Sized + HttpExecutor,
{
	inner: Arc<AsyncMutex<Integration<E>>>,
}
impl<E> SharedIntegration<E>
where
	E: ?Sized + HttpExecutor,
{
	/// Wraps `integration` in an async mutex.
	pub fn new(integration: Integration<E>) -> Self {
		Self { inner: Arc::new(AsyncMutex::new(integration)) }
	}

	/// Locks the integration for a sequence of calls.
	pub async fn lock(&self) -> async_lock::MutexGuard<'_, Integration<E>> {
		self.inner.lock().await
	}

	/// [`Integration::prepare_request`] under the lock.
	pub async fn prepare_request(&self, request: &mut HttpRequest) -> Result<()> {
		self.inner.lock().await.prepare_request(request).await
	}

	/// [`Integration::session_cookies`] under the lock.
	pub async fn session_cookies(&self, url: &Url) -> Result<Vec<SessionCookie>> {
		self.inner.lock().await.session_cookies(url).await
	}
}
impl<E> Clone for SharedIntegration<E>
where
	E: ?Sized + HttpExecutor,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<E> Debug for SharedIntegration<E>
where
	E: ?Sized + HttpExecutor,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SharedIntegration(..)")
	}
}

fn parse_base_url(fqdn: &str) -> Result<Url, ConfigError> {
	let invalid = |source| ConfigError::InvalidFqdn { fqdn: fqdn.to_owned(), source };
	let input = fqdn.trim();
	let (scheme, authority) = input.split_once("://").unwrap_or(("https", input));
	let authority = authority.trim_end_matches('/');

	if authority.is_empty() {
		return Err(invalid(None));
	}

	let url = Url::parse(&format!("{scheme}://{authority}")).map_err(|e| invalid(Some(e)))?;

	if !matches!(url.scheme(), "http" | "https")
		|| url.host_str().is_none_or(str::is_empty)
		|| url.query().is_some()
		|| url.fragment().is_some()
	{
		return Err(invalid(None));
	}

	Ok(url)
}

fn attach_cookie(request: &mut HttpRequest, cookie: &SessionCookie) -> Result<(), ConfigError> {
	if cookie.is_empty() {
		return Ok(());
	}

	let pair = cookie.header_value();
	let merged = match request.headers().get(COOKIE).and_then(|value| value.to_str().ok()) {
		Some(existing) if !existing.is_empty() => format!("{existing}; {pair}"),
		_ => pair,
	};
	let value =
		HeaderValue::from_str(&merged).map_err(|e| ConfigError::from(::http::Error::from(e)))?;

	request.headers_mut().insert(COOKIE, value);

	Ok(())
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::header::{AUTHORIZATION, HeaderName};
	// self
	use super::*;
	use crate::{_preludet::*, auth::TokenStatus, error::AuthProtocolError};

	const TOKEN: &str = "{\"access_token\":\"tok1\",\"expires_in\":60}";

	fn builder() -> IntegrationBuilder {
		let (_clock, shared) = test_clock();

		IntegrationBuilder::new("jamf.example.com")
			.oauth("client-id", "client-secret")
			.buffer_period(Duration::seconds(10))
			.clock(shared)
	}

	fn build(
		builder: IntegrationBuilder,
		steps: Vec<ScriptedStep>,
	) -> Result<Integration<ScriptedExecutor>, ConfigError> {
		builder.build_with_executor(ScriptedExecutor::new(steps))
	}

	async fn connect(
		builder: IntegrationBuilder,
		steps: Vec<ScriptedStep>,
	) -> Result<Integration<ScriptedExecutor>> {
		builder.connect_with_executor(ScriptedExecutor::new(steps)).await
	}

	fn header(request: &HttpRequest, name: HeaderName) -> Option<&str> {
		request.headers().get(name).and_then(|value| value.to_str().ok())
	}

	#[test]
	fn builder_rejects_invalid_fqdns() {
		for fqdn in [
			"",
			"   ",
			"/",
			"https://",
			"https:///",
			" http:// ",
			"ftp://jamf.example.com",
			"jamf.example.com?x=1",
		] {
			assert!(
				matches!(
					build(IntegrationBuilder::new(fqdn).oauth("id", "secret"), Vec::new()),
					Err(ConfigError::InvalidFqdn { .. })
				),
				"{fqdn:?} must be rejected"
			);
		}
	}

	#[test]
	fn builder_rejects_missing_credentials() {
		assert!(matches!(
			build(IntegrationBuilder::new("jamf.example.com"), Vec::new()),
			Err(ConfigError::MissingAuthMethod)
		));

		for (builder, field) in [
			(IntegrationBuilder::new("jamf.example.com").oauth("", "secret"), "client_id"),
			(IntegrationBuilder::new("jamf.example.com").oauth("id", ""), "client_secret"),
			(IntegrationBuilder::new("jamf.example.com").basic_auth("", "password"), "username"),
			(IntegrationBuilder::new("jamf.example.com").basic_auth("admin", ""), "password"),
		] {
			match build(builder, Vec::new()) {
				Err(ConfigError::MissingCredential { field: missing }) => assert_eq!(missing, field),
				other => panic!("Unexpected build result for {field}: {other:?}."),
			}
		}
	}

	#[test]
	fn builder_rejects_invalid_settings() {
		assert!(matches!(
			build(builder().buffer_period(Duration::seconds(-1)), Vec::new()),
			Err(ConfigError::NegativeBufferPeriod)
		));
		assert!(matches!(
			build(
				builder()
					.buffer_period(Duration::minutes(10))
					.expected_token_lifetime(Duration::seconds(60)),
				Vec::new()
			),
			Err(ConfigError::BufferExceedsLifetime { .. })
		));
		assert!(matches!(
			build(builder().affinity_timeout(Duration::seconds(-1)), Vec::new()),
			Err(ConfigError::NegativeAffinityTimeout)
		));
		assert!(matches!(
			build(builder().user_agent("bad\nagent"), Vec::new()),
			Err(ConfigError::HttpRequest(_))
		));
		assert!(
			build(builder().expected_token_lifetime(Duration::seconds(60)), Vec::new()).is_ok()
		);
	}

	#[test]
	fn fqdn_is_normalized_into_base_url() {
		for fqdn in ["jamf.example.com", "https://jamf.example.com/", " jamf.example.com/ "] {
			let integration =
				build(IntegrationBuilder::new(fqdn).basic_auth("admin", "password"), Vec::new())
					.expect("Integration should build.");

			assert_eq!(integration.fqdn(), "https://jamf.example.com");
			assert_eq!(integration.auth_method_descriptor(), "basic");
		}

		let integration = build(builder(), Vec::new()).expect("Integration should build.");

		assert_eq!(integration.auth_method_descriptor(), "oauth2");
		assert_eq!(
			integration.construct_url("/api/v1/jamf-pro-version").map(String::from).ok().as_deref(),
			Some("https://jamf.example.com/api/v1/jamf-pro-version")
		);
		assert_eq!(
			integration.construct_url("JSSResource/computers").map(String::from).ok().as_deref(),
			Some("https://jamf.example.com/JSSResource/computers")
		);
	}

	#[tokio::test]
	async fn path_prefixed_base_url_applies_to_every_request() {
		let executor = Arc::new(
			ScriptedExecutor::new([
				ScriptedStep::json(200, TOKEN),
				ScriptedStep::cookies(["jpro-ingress=node-a"]),
				ScriptedStep::cookies(["jpro-ingress=node-b"]),
			]),
		);
		let mut integration: Integration<ScriptedExecutor> =
			IntegrationBuilder::new("https://jamf.example.com/tenant/")
				.oauth("client-id", "client-secret")
				.clock(test_clock().1)
				.build_with_executor(executor.clone())
				.expect("Integration should build.");

		assert_eq!(integration.fqdn(), "https://jamf.example.com/tenant");

		let url = integration
			.construct_url("/api/v1/jamf-pro-version")
			.expect("Probe URL should be valid.");

		assert_eq!(url.as_str(), "https://jamf.example.com/tenant/api/v1/jamf-pro-version");

		integration.session_cookies(&url).await.expect("Affinity should resolve.");

		let uris = executor.requests().into_iter().map(|(_, uri, _)| uri).collect::<Vec<_>>();

		assert_eq!(
			uris,
			[
				"https://jamf.example.com/tenant/api/oauth/token",
				"https://jamf.example.com/tenant/api/v1/jamf-pro-version",
				"https://jamf.example.com/tenant/api/v1/jamf-pro-version",
			]
		);
	}

	#[tokio::test]
	async fn connect_mints_the_first_token() {
		let integration = connect(builder(), vec![ScriptedStep::json(200, TOKEN)])
			.await
			.expect("Connection should succeed.");

		assert_eq!(integration.token_controller().status(), TokenStatus::Valid);
		assert_eq!(integration.token_controller().provider().token_string(), "tok1");
	}

	#[tokio::test]
	async fn connect_rejects_buffer_longer_than_issued_lifetime() {
		let err = connect(
			builder().buffer_period(Duration::minutes(10)),
			vec![ScriptedStep::json(200, TOKEN)],
		)
		.await
		.expect_err("Oversized buffer periods must fail at connect time.");

		assert!(err.is_fatal());
		assert!(matches!(err, Error::Config(ConfigError::BufferExceedsLifetime { .. })));
	}

	#[tokio::test]
	async fn connect_surfaces_exchange_errors() {
		let err = connect(
			builder(),
			vec![ScriptedStep::json(200, "{\"access_token\":\"\",\"expires_in\":60}")],
		)
		.await
		.expect_err("Empty tokens must fail at connect time.");

		assert!(matches!(err, Error::AuthProtocol(AuthProtocolError::EmptyToken { .. })));
	}

	#[tokio::test]
	async fn prepare_request_applies_token_cookie_and_defaults() {
		let mut integration = build(
			builder(),
			vec![
				ScriptedStep::json(200, TOKEN),
				ScriptedStep::cookies(["jpro-ingress=node-b"]),
				ScriptedStep::cookies(["jpro-ingress=node-a"]),
			],
		)
		.expect("Integration should build.");
		let url = integration
			.construct_url("/api/v1/jamf-pro-version")
			.expect("Probe URL should be valid.");
		let mut request = HttpRequest::new(Vec::new());

		integration.prepare_request(&mut request).await.expect("Preparation should succeed.");

		assert_eq!(header(&request, AUTHORIZATION), Some("Bearer tok1"));
		assert_eq!(header(&request, ACCEPT), Some("application/json"));
		assert_eq!(header(&request, USER_AGENT), Some(DEFAULT_USER_AGENT));
		assert_eq!(header(&request, COOKIE), None);

		let cookies = integration.session_cookies(&url).await.expect("Affinity should resolve.");

		assert_eq!(cookies, vec![SessionCookie::new("jpro-ingress", "node-a")]);
		assert!(integration.affinity().is_some_and(Affinity::converged));

		let mut request = ::http::Request::builder()
			.header(ACCEPT, "application/xml")
			.header(COOKIE, "theme=dark")
			.body(Vec::new())
			.expect("Request fixture should build.");

		integration.prepare_request(&mut request).await.expect("Preparation should succeed.");

		assert_eq!(header(&request, ACCEPT), Some("application/xml"));
		assert_eq!(header(&request, COOKIE), Some("theme=dark; jpro-ingress=node-a"));
		assert!(integration.clear_affinity().is_some());

		let mut request = HttpRequest::new(Vec::new());

		integration.prepare_request(&mut request).await.expect("Preparation should succeed.");

		assert_eq!(header(&request, COOKIE), None);
	}

	#[tokio::test]
	async fn shared_integration_serializes_refreshes() {
		let executor = Arc::new(ScriptedExecutor::new([ScriptedStep::json(200, TOKEN)]));
		let shared: SharedIntegration<ScriptedExecutor> = builder()
			.build_with_executor(executor.clone())
			.expect("Integration should build.")
			.into_shared();
		let tasks = (0..4)
			.map(|_| {
				let shared = shared.clone();

				tokio::spawn(async move {
					let mut request = HttpRequest::new(Vec::new());

					shared.prepare_request(&mut request).await.map(|()| request)
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			let request =
				task.await.expect("Task should not panic.").expect("Preparation should succeed.");

			assert_eq!(header(&request, AUTHORIZATION), Some("Bearer tok1"));
		}

		assert_eq!(executor.calls(), 1);
		assert_eq!(shared.lock().await.token_controller().status(), TokenStatus::Valid);
	}
}
