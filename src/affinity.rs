//! Sticky-session affinity for round-robin load balancers.
//!
//! A Jamf Pro cluster behind a round-robin balancer hands each client a sticky cookie naming the
//! backend that served it. [`AffinityResolver::resolve`] probes one URL until it has seen at least
//! two distinct cookie values (proof the balancer is rotating) or its wall-clock deadline passes,
//! then picks one value deterministically so every request of the session lands on the same
//! backend.

// crates.io
use ::http::{HeaderMap, Method};
// self
use crate::{
	_prelude::*,
	auth::TokenController,
	clock::Clock,
	error::{ConfigError, TransportError},
	http::{self, HttpExecutor},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Cookie the Jamf Cloud ingress uses to pin a client to one backend.
pub const DEFAULT_AFFINITY_COOKIE: &str = "jpro-ingress";
/// Default wall-clock bound of one probing run.
pub const DEFAULT_AFFINITY_TIMEOUT: Duration = Duration::seconds(7);

/// Cookie attached to requests so they reach the chosen backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionCookie {
	/// Cookie name.
	pub name: String,
	/// Cookie value; empty when no value was observed.
	pub value: String,
}
impl SessionCookie {
	/// Creates a cookie from its name and value.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into() }
	}

	/// Returns `true` when no backend value is available.
	pub fn is_empty(&self) -> bool {
		self.value.is_empty()
	}

	/// Renders the `name=value` pair used in a `Cookie` request header.
	pub fn header_value(&self) -> String {
		format!("{}={}", self.name, self.value)
	}
}

/// Outcome of one probing run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Affinity {
	/// Cookie carrying the chosen backend value.
	pub cookie: SessionCookie,
	/// Every distinct value observed during the run.
	pub observed: BTreeSet<String>,
	/// Number of probe requests sent.
	pub probes: usize,
}
impl Affinity {
	fn new(cookie_name: &str, observed: BTreeSet<String>, probes: usize) -> Self {
		let cookie = SessionCookie::new(cookie_name, choose_affinity_value(&observed));

		Self { cookie, observed, probes }
	}

	/// Returns `true` once at least two distinct backends were observed.
	pub fn converged(&self) -> bool {
		self.observed.len() > 1
	}

	/// Returns `true` when the deadline passed with fewer than two distinct values.
	///
	/// The chosen cookie is then a best guess (one value) or empty (none); callers proceed with
	/// best-effort stickiness rather than failing.
	pub fn is_degraded(&self) -> bool {
		!self.converged()
	}
}

/// Deterministically selects the lexicographically smallest value, or `""` for an empty set.
pub fn choose_affinity_value(observed: &BTreeSet<String>) -> String {
	observed.first().cloned().unwrap_or_default()
}

/// Trims and deduplicates raw cookie values; values that are empty after trimming are dropped.
pub fn collect_cookie_values<'a, I>(raw: I) -> BTreeSet<String>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut observed = BTreeSet::new();

	extend_observed(&mut observed, raw);

	observed
}

fn extend_observed<'a, I>(observed: &mut BTreeSet<String>, raw: I)
where
	I: IntoIterator<Item = &'a str>,
{
	for value in raw.into_iter().map(str::trim).filter(|value| !value.is_empty()) {
		if !observed.contains(value) {
			observed.insert(value.to_owned());
		}
	}
}

fn observe(observed: &mut BTreeSet<String>, headers: &HeaderMap, cookie_name: &str) {
	extend_observed(
		observed,
		http::set_cookie_pairs(headers)
			.filter(|(name, _)| *name == cookie_name)
			.map(|(_, value)| value),
	);
}

/// Probes a load-balanced URL and selects a sticky-session backend.
pub struct AffinityResolver<E>
where
	E: ?Sized + HttpExecutor,
{
	executor: Arc<E>,
	clock: Arc<dyn Clock>,
	cookie_name: String,
	timeout: Duration,
}
impl<E> AffinityResolver<E>
where
	E: ?Sized + HttpExecutor,
{
	/// Creates a resolver watching [`DEFAULT_AFFINITY_COOKIE`] for [`DEFAULT_AFFINITY_TIMEOUT`].
	pub fn new(executor: impl Into<Arc<E>>, clock: Arc<dyn Clock>) -> Self {
		Self {
			executor: executor.into(),
			clock,
			cookie_name: DEFAULT_AFFINITY_COOKIE.into(),
			timeout: DEFAULT_AFFINITY_TIMEOUT,
		}
	}

	/// Overrides the sticky-session cookie name.
	pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
		self.cookie_name = cookie_name.into();

		self
	}

	/// Overrides the probing deadline; must not be negative.
	pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
		if timeout.is_negative() {
			return Err(ConfigError::NegativeAffinityTimeout);
		}

		self.timeout = timeout;

		Ok(self)
	}

	/// Sticky-session cookie name.
	pub fn cookie_name(&self) -> &str {
		&self.cookie_name
	}

	/// Probing deadline measured from the start of each run.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Probes `url` until two distinct backends are seen or the deadline passes.
	///
	/// Every probe is authorized through `controller`, so token refreshes happen transparently
	/// and their errors abort the run, as do transport failures. Response statuses are not
	/// inspected; only `Set-Cookie` headers matter. At least one probe is always sent.
	pub async fn resolve(&self, controller: &mut TokenController<E>, url: &Url) -> Result<Affinity> {
		const KIND: FlowKind = FlowKind::AffinityProbe;

		let span = FlowSpan::new(KIND, "resolve");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<Affinity> = span
			.instrument(async {
				let deadline = self.clock.now() + self.timeout;
				let mut observed = BTreeSet::new();
				let mut probes = 0;

				loop {
					let mut request = ::http::Request::builder()
						.method(Method::GET)
						.uri(url.as_str())
						.body(Vec::new())
						.map_err(ConfigError::from)?;

					controller.authorize(&mut request).await?;

					let response = self
						.executor
						.execute(request)
						.await
						.map_err(|e| TransportError::network(KIND, e))?;

					probes += 1;

					observe(&mut observed, response.headers(), &self.cookie_name);
					obs::record_affinity_probe(probes, observed.len());

					if observed.len() > 1 || self.clock.now() >= deadline {
						break;
					}
				}

				Ok(Affinity::new(&self.cookie_name, observed, probes))
			})
			.await;

		if let Ok(affinity) = &result {
			obs::record_affinity_choice(
				&affinity.cookie.value,
				affinity.observed.len(),
				affinity.is_degraded(),
			);
		}

		obs::record_affinity_outcome(&result);

		result
	}
}
impl<E> Debug for AffinityResolver<E>
where
	E: ?Sized + HttpExecutor,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AffinityResolver")
			.field("cookie_name", &self.cookie_name)
			.field("timeout", &self.timeout)
			.finish()
	}
}
