//! Optional observability helpers for gateway operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `pixelpen_gateway.op` with the `op` and
//!   `stage` (call site) fields, plus warn events when a refresh or logout notification fails.
//! - Enable `metrics` to increment the `pixelpen_gateway_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatewayOp {
	/// Authenticated API call through [`Gateway::send`](crate::gateway::Gateway::send).
	Send,
	/// Call to the refresh endpoint.
	Refresh,
	/// Logout notification or explicit logout.
	Logout,
	/// Login, registration, or auth check.
	Session,
	/// Remote code execution.
	Execute,
}
impl GatewayOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GatewayOp::Send => "send",
			GatewayOp::Refresh => "refresh",
			GatewayOp::Logout => "logout",
			GatewayOp::Session => "session",
			GatewayOp::Execute => "execute",
		}
	}
}
impl Display for GatewayOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a gateway helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the final outcome of `result` for `op`.
pub fn record_result<T, E>(op: GatewayOp, result: &Result<T, E>) {
	match result {
		Ok(_) => record_op_outcome(op, OpOutcome::Success),
		Err(_) => record_op_outcome(op, OpOutcome::Failure),
	}
}
