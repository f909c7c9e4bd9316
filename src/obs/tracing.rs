// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by session flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("jamfpro_session.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Diagnostic record of one identity endpoint exchange.
///
/// The body is only captured when sensitive data is not hidden, so the record itself is what
/// guarantees secrets never reach the log sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeDiagnostic {
	/// Exchange kind.
	pub flow: FlowKind,
	/// Identity endpoint that was called.
	pub endpoint: String,
	/// HTTP status returned by the endpoint.
	pub status: u16,
	/// Response body, present only when sensitive data may be logged.
	pub body: Option<String>,
}
impl ExchangeDiagnostic {
	/// Builds a record, dropping the body when `hide_sensitive_data` is set.
	pub fn new(
		flow: FlowKind,
		endpoint: &str,
		status: u16,
		body: &[u8],
		hide_sensitive_data: bool,
	) -> Self {
		let body =
			if hide_sensitive_data { None } else { Some(String::from_utf8_lossy(body).into_owned()) };

		Self { flow, endpoint: endpoint.to_owned(), status, body }
	}
}

/// Emits an [`ExchangeDiagnostic`] at debug level.
pub fn record_exchange(diagnostic: &ExchangeDiagnostic) {
	#[cfg(feature = "tracing")]
	{
		match &diagnostic.body {
			Some(body) => tracing::debug!(
				flow = diagnostic.flow.as_str(),
				endpoint = %diagnostic.endpoint,
				status = diagnostic.status,
				body = %body,
				"Identity endpoint exchange completed."
			),
			None => tracing::debug!(
				flow = diagnostic.flow.as_str(),
				endpoint = %diagnostic.endpoint,
				status = diagnostic.status,
				"Identity endpoint exchange completed."
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = diagnostic;
	}
}

/// Warns that the held token was empty when a request was prepared.
pub fn record_empty_token() {
	#[cfg(feature = "tracing")]
	tracing::warn!("Token empty before processing - disregard if first run.");
}

/// Notes a successfully minted token and its expiry.
pub fn record_token_obtained(flow: FlowKind, expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::info!(flow = flow.as_str(), expiry = %expires_at, "Token obtained successfully.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (flow, expires_at);
	}
}

/// Traces the state of an affinity probing run after one probe.
pub fn record_affinity_probe(probe: usize, distinct: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(probe, distinct, "Sticky-session probe completed.");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (probe, distinct);
	}
}

/// Notes the outcome of an affinity probing run.
pub fn record_affinity_choice(chosen: &str, distinct: usize, degraded: bool) {
	#[cfg(feature = "tracing")]
	{
		if degraded {
			tracing::warn!(
				chosen,
				distinct,
				"Affinity probing reached its deadline before observing multiple backends."
			);
		} else {
			tracing::info!(chosen, distinct, "Sticky-session backend selected.");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (chosen, distinct, degraded);
	}
}
