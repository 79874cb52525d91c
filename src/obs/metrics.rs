// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per recorded flow outcome.
pub const FLOW_COUNTER: &str = "request_seal_flow_total";

/// Records a flow outcome via the global metrics recorder (when enabled).
///
/// The [`FLOW_COUNTER`] is labeled with `flow` (`dispatch`, `business_refresh`,
/// `unauthorized_refresh` or `reauthenticate`) and `outcome` (`attempt`, `success` or
/// `failure`). Refresh cycles are counted once per leader; queued callers show up in
/// [`RefreshMetrics`](crate::auth::RefreshMetrics) instead.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashSet;
	// self
	use super::*;

	const KINDS: [FlowKind; 4] = [
		FlowKind::Dispatch,
		FlowKind::BusinessRefresh,
		FlowKind::UnauthorizedRefresh,
		FlowKind::Reauthenticate,
	];

	#[test]
	fn flow_labels_are_distinct() {
		let labels = KINDS.iter().map(|kind| kind.as_str()).collect::<HashSet<_>>();

		assert_eq!(labels.len(), KINDS.len());
		assert!(
			labels.iter().all(|label| label.chars().all(|c| c.is_ascii_lowercase() || c == '_'))
		);
	}

	#[test]
	fn every_flow_and_outcome_can_be_recorded() {
		for kind in KINDS {
			for outcome in [FlowOutcome::Attempt, FlowOutcome::Success, FlowOutcome::Failure] {
				record_flow_outcome(kind, outcome);
			}
		}
	}
}
