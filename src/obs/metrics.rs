// self
use crate::{
	_prelude::*,
	affinity::Affinity,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"jamfpro_session_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how an affinity run ended, plus the number of probes it took when it completed.
pub fn record_affinity_outcome(result: &Result<Affinity>) {
	let outcome = affinity_outcome(result);

	record_flow_outcome(FlowKind::AffinityProbe, outcome);

	#[cfg(feature = "metrics")]
	{
		if let Ok(affinity) = result {
			metrics::histogram!(
				"jamfpro_session_affinity_probes",
				"outcome" => outcome.as_str()
			)
			.record(affinity.probes as f64);
		}
	}
}

fn affinity_outcome(result: &Result<Affinity>) -> FlowOutcome {
	match result {
		Ok(affinity) if affinity.is_degraded() => FlowOutcome::Degraded,
		Ok(_) => FlowOutcome::Success,
		Err(_) => FlowOutcome::Failure,
	}
}
