//! Optional observability helpers for client calls and refresh cycles.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `request_seal.flow` with the `flow` and
//!   `stage` fields, plus `warn` events for failed refresh cycles.
//! - Enable `metrics` to increment the `request_seal_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline flows observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// One logical call through the interceptor chain.
	Dispatch,
	/// Refresh triggered by a business refresh code.
	BusinessRefresh,
	/// Refresh triggered by an HTTP 401.
	UnauthorizedRefresh,
	/// Forced logout or login-expired flagging.
	Reauthenticate,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Dispatch => "dispatch",
			FlowKind::BusinessRefresh => "business_refresh",
			FlowKind::UnauthorizedRefresh => "unauthorized_refresh",
			FlowKind::Reauthenticate => "reauthenticate",
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
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
