// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, error::ErrorKind, obs::GatewayOp};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by gateway operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: GatewayOp, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("booking_gateway.op", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
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

/// RAII guard returned by [`OpSpan::entered`].
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

/// Emits a warning event for a failed operation.
///
/// `details` must already be redacted.
pub fn record_failure_event(op: GatewayOp, kind: ErrorKind, message: &str, details: &Value) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(op = op.as_str(), kind = kind.as_str(), %details, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, kind, message, details);
	}
}

/// Emits an info event once a scope holds a refreshed credential.
///
/// Only the token fingerprint is logged; `shared` marks reuse of a peer's refresh.
pub fn record_refresh_event(scope: &str, fingerprint: &str, shared: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(scope, fingerprint, shared, "credential refreshed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (scope, fingerprint, shared);
	}
}
