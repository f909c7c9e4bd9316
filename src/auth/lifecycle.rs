//! Token lifecycle controller.
//!
//! [`TokenController::ensure_fresh`] is the single gate every outbound request passes through. A
//! held token is either unset, valid, or stale (expired or inside the buffer window); staleness is
//! detected lazily on the next check rather than by a timer. The controller never retries: a
//! failed exchange leaves the state untouched and the error goes straight back to the caller.

// crates.io
use ::http::header::{AUTHORIZATION, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{CredentialProvider, TokenStatus},
	error::{AuthProtocolError, ConfigError},
	http::{HttpExecutor, HttpRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Decides, before each request, whether the held token must be refreshed.
pub struct TokenController<E>
where
	E: ?Sized + HttpExecutor,
{
	provider: CredentialProvider<E>,
}
impl<E> TokenController<E>
where
	E: ?Sized + HttpExecutor,
{
	/// Wraps a provider; no exchange happens until the first [`ensure_fresh`](Self::ensure_fresh).
	pub fn new(provider: CredentialProvider<E>) -> Self {
		Self { provider }
	}

	/// Underlying credential provider.
	pub fn provider(&self) -> &CredentialProvider<E> {
		&self.provider
	}

	/// Mutable access to the underlying credential provider, e.g. to force a refresh.
	pub fn provider_mut(&mut self) -> &mut CredentialProvider<E> {
		&mut self.provider
	}

	/// Consumes the controller and returns its provider.
	pub fn into_provider(self) -> CredentialProvider<E> {
		self.provider
	}

	/// Lifecycle status of the held token right now.
	pub fn status(&self) -> TokenStatus {
		self.provider.status()
	}

	/// Refreshes the token when it is empty, expired, or inside the buffer window.
	///
	/// Exchange errors propagate unchanged. If a freshly minted token is still expired or inside
	/// the buffer window the buffer period is not shorter than the token lifetime, and
	/// [`ConfigError::BufferExceedsLifetime`] is returned; repeating the call reproduces it.
	pub async fn ensure_fresh(&mut self) -> Result<()> {
		const KIND: FlowKind = FlowKind::TokenRefresh;

		let span = FlowSpan::new(KIND, "ensure_fresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async {
				let provider = &mut self.provider;

				if provider.empty() {
					obs::record_empty_token();
				}
				if !(provider.empty() || provider.expired() || provider.in_buffer()) {
					return Ok(());
				}

				provider.obtain_token().await?;

				if provider.expired() || provider.in_buffer() {
					return Err(ConfigError::BufferExceedsLifetime {
						buffer: provider.buffer_period(),
						lifetime: provider.remaining(),
					}
					.into());
				}

				Ok(())
			})
			.await;

		obs::record_flow_outcome(
			KIND,
			if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
		);

		result
	}

	/// Runs [`ensure_fresh`](Self::ensure_fresh), then stamps `Authorization: Bearer <token>`.
	pub async fn authorize(&mut self, request: &mut HttpRequest) -> Result<()> {
		self.ensure_fresh().await?;

		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.provider.token_string()))
			.map_err(|_| AuthProtocolError::InvalidTokenCharacters {
				flow: self.provider.method().flow(),
			})?;

		value.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(())
	}
}
impl<E> Debug for TokenController<E>
where
	E: ?Sized + HttpExecutor,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenController").field("provider", &self.provider).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	#[cfg(feature = "tracing")] use tracing_test::traced_test;
	// self
	use super::*;
	use crate::{_preludet::*, auth::OAuthClientCredentials, clock::ManualClock};

	fn controller(
		steps: Vec<ScriptedStep>,
		buffer: Duration,
	) -> (TokenController<ScriptedExecutor>, ManualClock) {
		let (clock, shared) = test_clock();
		let method = OAuthClientCredentials::new("client-id", "client-secret")
			.expect("OAuth fixture should be valid.");
		let provider = CredentialProvider::new(
			method,
			Url::parse("https://jamf.example.com").expect("Base URL fixture should parse."),
			buffer,
			Arc::new(ScriptedExecutor::new(steps)),
			shared,
		)
		.expect("Provider fixture should build.");

		(TokenController::new(provider), clock)
	}

	fn token_body(token: &str, expires_in: i64) -> ScriptedStep {
		ScriptedStep::json(
			200,
			&format!("{{\"access_token\":\"{token}\",\"expires_in\":{expires_in}}}"),
		)
	}

	#[tokio::test]
	async fn ensure_fresh_only_refreshes_stale_tokens() {
		let (mut controller, clock) = controller(
			vec![token_body("tok1", 60), token_body("tok2", 60)],
			Duration::seconds(10),
		);

		controller.ensure_fresh().await.expect("First refresh should succeed.");
		controller.ensure_fresh().await.expect("Valid token should be reused.");

		assert_eq!(controller.provider().executor().calls(), 1);
		assert_eq!(controller.provider().token_string(), "tok1");
		assert_eq!(controller.status(), TokenStatus::Valid);

		clock.advance(Duration::seconds(49));
		controller.ensure_fresh().await.expect("Token outside the buffer should be reused.");

		assert_eq!(controller.provider().executor().calls(), 1);

		clock.advance(Duration::seconds(2));
		controller.ensure_fresh().await.expect("Buffered token should be refreshed.");

		assert_eq!(controller.provider().executor().calls(), 2);
		assert_eq!(controller.provider().token_string(), "tok2");
		assert_eq!(controller.provider().expires_at(), test_epoch() + Duration::seconds(111));
	}

	#[tokio::test]
	async fn buffer_not_shorter_than_lifetime_is_fatal() {
		for (buffer, lifetime) in [(10, 10), (61, 60), (600, 60), (0, 0), (5, -30)] {
			let (mut controller, _clock) =
				controller(vec![token_body("tok1", lifetime)], Duration::seconds(buffer));
			let err = controller
				.ensure_fresh()
				.await
				.expect_err("Buffer periods not shorter than the lifetime must be rejected.");

			assert!(err.is_fatal(), "buffer {buffer}s / lifetime {lifetime}s");
			assert!(matches!(err, Error::Config(ConfigError::BufferExceedsLifetime { .. })));
		}
	}

	#[tokio::test]
	async fn exchange_errors_propagate_without_retry() {
		let (mut controller, _clock) = controller(
			vec![ScriptedStep::json(401, "{\"error\":\"invalid_client\"}")],
			Duration::seconds(10),
		);
		let err = controller.ensure_fresh().await.expect_err("HTTP 401 must be surfaced.");

		assert!(matches!(
			err,
			Error::AuthProtocol(AuthProtocolError::UnexpectedStatus { status: 401, .. })
		));
		assert!(!err.is_fatal());
		assert_eq!(controller.provider().executor().calls(), 1);
		assert!(controller.provider().empty());
		assert_eq!(controller.status(), TokenStatus::Unset);
	}

	#[tokio::test]
	async fn authorize_stamps_bearer_header() {
		let (mut controller, _clock) =
			controller(vec![token_body("tok1", 60)], Duration::seconds(10));
		let mut request = HttpRequest::new(Vec::new());

		controller.authorize(&mut request).await.expect("Authorization should succeed.");

		let header =
			request.headers().get(AUTHORIZATION).expect("Authorization header should be set.");

		assert_eq!(header.to_str().ok(), Some("Bearer tok1"));
		assert!(header.is_sensitive());
	}

	#[tokio::test]
	async fn tokens_unfit_for_headers_are_rejected() {
		let (mut controller, _clock) =
			controller(vec![token_body("tok\\u000a1", 60)], Duration::seconds(10));
		let mut request = HttpRequest::new(Vec::new());
		let err = controller
			.authorize(&mut request)
			.await
			.expect_err("Tokens with control characters must be rejected.");

		assert!(matches!(
			err,
			Error::AuthProtocol(AuthProtocolError::InvalidTokenCharacters { .. })
		));
		assert!(request.headers().get(AUTHORIZATION).is_none());
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	#[traced_test]
	async fn empty_token_warning_is_logged_on_first_use() {
		let (mut controller, _clock) =
			controller(vec![token_body("tok1", 60)], Duration::seconds(10));

		controller.ensure_fresh().await.expect("First refresh should succeed.");

		assert!(logs_contain("Token empty before processing - disregard if first run."));
	}
}
