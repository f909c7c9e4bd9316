//! Optional observability helpers for session flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `jamfpro_session.flow` with the `flow` and
//!   `stage` (call site) fields, plus leveled events for token exchanges and affinity probes.
//! - Enable `metrics` to increment the `jamfpro_session_flow_total` counter for every
//!   attempt/success/degraded/failure, labeled by `flow` + `outcome`, and record completed
//!   affinity runs in the `jamfpro_session_affinity_probes` histogram.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Session flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// OAuth2 `client_credentials` exchange.
	ClientCredentials,
	/// Basic-auth-derived bearer token exchange.
	BasicToken,
	/// Freshness check run before each outbound request.
	TokenRefresh,
	/// Sticky-session cookie discovery.
	AffinityProbe,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::BasicToken => "basic_token",
			FlowKind::TokenRefresh => "token_refresh",
			FlowKind::AffinityProbe => "affinity_probe",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a session helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Completed, but with a degraded result.
	Degraded,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Degraded => "degraded",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
