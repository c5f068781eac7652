//! Observability helpers for gateway operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `booking_gateway.op` with
//!   the `op` (facade operation) and `stage` (call site) fields, plus events for refreshes and
//!   failures.
//! - Enable `metrics` to increment the `booking_gateway_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.
//!
//! Payloads that reach a log line pass through [`redact`] first.

pub mod redact;

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatewayOp {
	/// `list_bookings` facade call.
	ListBookings,
	/// `create_booking` facade call.
	CreateBooking,
	/// `update_booking` facade call.
	UpdateBooking,
	/// `cancel_booking` facade call.
	CancelBooking,
	/// Refresh triggered by an authorization failure.
	Refresh,
}
impl GatewayOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GatewayOp::ListBookings => "list_bookings",
			GatewayOp::CreateBooking => "create_booking",
			GatewayOp::UpdateBooking => "update_booking",
			GatewayOp::CancelBooking => "cancel_booking",
			GatewayOp::Refresh => "refresh",
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
	/// Entry to a gateway operation.
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
