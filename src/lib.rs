//! Session layer for Jamf Pro API clients: bearer token lifecycle with proactive refresh and
//! sticky-session affinity for round-robin load balancers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod affinity;
pub mod auth;
pub mod clock;
pub mod error;
pub mod http;
pub mod integration;
pub mod obs;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		clock::{Clock, ManualClock},
		http::{ExecuteFuture, HttpExecutor, HttpRequest, HttpResponse},
	};

	/// Transport failure emitted by [`ScriptedExecutor`] once its script runs dry or a step
	/// requests a failure.
	#[derive(Debug, ThisError)]
	#[error("Scripted transport failure: {0}.")]
	pub struct ScriptedTransportError(pub String);

	/// Single scripted exchange replayed by [`ScriptedExecutor`].
	#[derive(Debug)]
	pub enum ScriptedStep {
		/// Respond with the given status, `Set-Cookie` values, and body.
		Respond {
			/// HTTP status code.
			status: u16,
			/// Raw `Set-Cookie` header values.
			set_cookies: Vec<String>,
			/// Response body.
			body: Vec<u8>,
		},
		/// Fail the request at the transport layer.
		Fail(String),
	}
	impl ScriptedStep {
		/// Successful response carrying one `Set-Cookie` header per entry.
		pub fn cookies<I, S>(set_cookies: I) -> Self
		where
			I: IntoIterator<Item = S>,
			S: Into<String>,
		{
			Self::Respond {
				status: 200,
				set_cookies: set_cookies.into_iter().map(Into::into).collect(),
				body: Vec::new(),
			}
		}

		/// Successful JSON response without cookies.
		pub fn json(status: u16, body: &str) -> Self {
			Self::Respond { status, set_cookies: Vec::new(), body: body.as_bytes().to_vec() }
		}
	}

	/// Executor that replays a fixed script, records every request, and advances a
	/// [`ManualClock`] on each call so deadline logic can be exercised without sleeping.
	#[derive(Debug)]
	pub struct ScriptedExecutor {
		steps: Mutex<VecDeque<ScriptedStep>>,
		repeat_last: bool,
		last: Mutex<Option<(u16, Vec<String>)>>,
		requests: Mutex<Vec<(String, String, Option<String>)>>,
		clock: Option<(ManualClock, Duration)>,
	}
	impl ScriptedExecutor {
		/// Replays `steps` once, then fails every further request.
		pub fn new<I>(steps: I) -> Self
		where
			I: IntoIterator<Item = ScriptedStep>,
		{
			Self {
				steps: Mutex::new(steps.into_iter().collect()),
				repeat_last: false,
				last: Mutex::new(None),
				requests: Mutex::new(Vec::new()),
				clock: None,
			}
		}

		/// Keeps answering with the last successful step once the script runs dry.
		pub fn repeat_last(mut self) -> Self {
			self.repeat_last = true;

			self
		}

		/// Advances `clock` by `step` whenever a request is executed.
		pub fn advancing(mut self, clock: ManualClock, step: Duration) -> Self {
			self.clock = Some((clock, step));

			self
		}

		/// Number of requests executed so far.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}

		/// `(method, uri, authorization header)` tuples for every executed request.
		pub fn requests(&self) -> Vec<(String, String, Option<String>)> {
			self.requests.lock().clone()
		}

		fn respond(status: u16, set_cookies: &[String], body: Vec<u8>) -> HttpResponse {
			let mut response = HttpResponse::new(body);

			*response.status_mut() =
				::http::StatusCode::from_u16(status).unwrap_or(::http::StatusCode::OK);

			for cookie in set_cookies {
				if let Ok(value) = ::http::HeaderValue::from_str(cookie) {
					response.headers_mut().append(::http::header::SET_COOKIE, value);
				}
			}

			response
		}
	}
	impl HttpExecutor for ScriptedExecutor {
		type TransportError = ScriptedTransportError;

		fn execute(&self, request: HttpRequest) -> ExecuteFuture<'_, Self::TransportError> {
			Box::pin(async move {
				let authorization = request
					.headers()
					.get(::http::header::AUTHORIZATION)
					.and_then(|value| value.to_str().ok())
					.map(str::to_owned);

				self.requests.lock().push((
					request.method().to_string(),
					request.uri().to_string(),
					authorization,
				));

				if let Some((clock, step)) = &self.clock {
					clock.advance(*step);
				}

				let next = self.steps.lock().pop_front();

				match next {
					Some(ScriptedStep::Respond { status, set_cookies, body }) => {
						let response = Self::respond(status, &set_cookies, body);

						*self.last.lock() = Some((status, set_cookies));

						Ok(response)
					},
					Some(ScriptedStep::Fail(message)) => Err(ScriptedTransportError(message)),
					None if self.repeat_last => match self.last.lock().clone() {
						Some((status, set_cookies)) =>
							Ok(Self::respond(status, &set_cookies, Vec::new())),
						None => Err(ScriptedTransportError("script is empty".into())),
					},
					None => Err(ScriptedTransportError("script exhausted".into())),
				}
			})
		}
	}

	/// Fixed instant used as "now" across deterministic tests.
	pub fn test_epoch() -> OffsetDateTime {
		time::macros::datetime!(2025-01-01 00:00 UTC)
	}

	/// Manual clock pinned to [`test_epoch`], shared as a trait object.
	pub fn test_clock() -> (ManualClock, Arc<dyn Clock>) {
		let clock = ManualClock::new(test_epoch());
		let shared: Arc<dyn Clock> = Arc::new(clock.clone());

		(clock, shared)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeSet,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_test as _};
