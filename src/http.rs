//! Transport primitives for identity exchanges and affinity probes.
//!
//! [`HttpExecutor`] is the crate's only dependency on an HTTP stack: given a fully built
//! [`HttpRequest`], it returns the [`HttpResponse`] or a transport error. Everything above it
//! (token minting, freshness checks, cookie probing) is transport agnostic, which lets tests
//! substitute scripted executors.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{HeaderMap, header::SET_COOKIE};
// self
use crate::_prelude::*;

/// Outbound request handed to an [`HttpExecutor`].
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Fully buffered response returned by an [`HttpExecutor`].
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpExecutor::execute`].
pub type ExecuteFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Pluggable request-execution capability.
///
/// Implementations must be `Send + Sync + 'static` so one executor can be shared across
/// integrations, and the returned future must be `Send` so session futures can hop executors.
/// Dropping the future must abort the in-flight request; affinity probing relies on this to stay
/// cancellable.
pub trait HttpExecutor
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and buffers the full response.
	fn execute(&self, request: HttpRequest) -> ExecuteFuture<'_, Self::TransportError>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Cookies are read straight from `Set-Cookie` headers, so the wrapped client must not run its
/// own cookie store; otherwise probes would replay the sticky cookie and pin themselves to the
/// first backend they hit.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestExecutor(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestExecutor {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestExecutor {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestExecutor {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestExecutor(..)")
	}
}
#[cfg(feature = "reqwest")]
impl HttpExecutor for ReqwestExecutor {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> ExecuteFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok::<_, ReqwestError>(response_new)
		})
	}
}

/// Yields the `(name, value)` pair of every `Set-Cookie` header, skipping attributes.
///
/// Headers that are not valid UTF-8 or lack an `=` are ignored. Names are trimmed; values are
/// returned untouched so callers decide how to normalize them.
pub fn set_cookie_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
	headers.get_all(SET_COOKIE).iter().filter_map(|value| {
		let raw = value.to_str().ok()?;
		let pair = raw.split(';').next()?;
		let (name, value) = pair.split_once('=')?;

		Some((name.trim(), value))
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::HeaderValue;
	// self
	use super::*;

	#[test]
	fn set_cookie_pairs_strip_attributes() {
		let mut headers = HeaderMap::new();

		headers.append(SET_COOKIE, HeaderValue::from_static("jpro-ingress=abc; Path=/; HttpOnly"));
		headers.append(SET_COOKIE, HeaderValue::from_static("session=xyz"));
		headers.append(SET_COOKIE, HeaderValue::from_static("malformed"));
		headers.append(SET_COOKIE, HeaderValue::from_static(" jpro-ingress = padded ; Secure"));

		let pairs = set_cookie_pairs(&headers).collect::<Vec<_>>();

		assert_eq!(
			pairs,
			vec![("jpro-ingress", "abc"), ("session", "xyz"), ("jpro-ingress", " padded ")]
		);
	}
}
