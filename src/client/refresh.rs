//! Refresh orchestration with single-flight guards, CAS rotation, and metrics.
//!
//! A caller whose request was rejected acquires the scope's guard and re-reads the store.
//! When a peer already rotated the credential (the stored access token differs from the
//! one that failed) the stored credential is reused; otherwise the refresh token is
//! exchanged and the result is written back via
//! [`CredentialStore::compare_and_swap_refresh`](crate::store::CredentialStore::compare_and_swap_refresh).
//!
//! A failed exchange is shared the same way: callers that were already queued on the guard
//! when it finished receive its [`AuthError::RefreshFailed`] instead of exchanging again.
//! Callers arriving afterwards start a new exchange.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScope, TokenSecret},
	client::TokenRefreshClient,
	error::AuthError,
	exchange::{self, TransportErrorMapper},
	http::UpstreamHttpClient,
	obs::{self, GatewayOp, OpOutcome, OpSpan},
	store::CompareAndSwapOutcome,
};

/// Per-scope single-flight state.
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
	// Number of exchanges that have completed for the scope.
	finished: AtomicU64,
	last_failure: AsyncMutex<Option<RefreshFailure>>,
}

#[derive(Debug)]
struct RefreshFailure {
	exchange: u64,
	reason: String,
	status: Option<u16>,
}

impl<C, M> TokenRefreshClient<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Produces a credential newer than `failed`, exchanging the refresh token at most once
	/// per rotation across concurrent callers of the same scope.
	///
	/// Callers queued behind an exchange share its outcome, success or failure.
	pub(crate) async fn refresh_after_failure(
		&self,
		scope: &CredentialScope,
		failed: &Credential,
	) -> Result<Credential> {
		const OP: GatewayOp = GatewayOp::Refresh;

		let span = OpSpan::new(OP, "refresh_after_failure");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.refresh_metrics.record_attempt();

				let gate = self.refresh_gate(scope);
				let ticket = gate.finished.load(Ordering::Acquire);
				let mut last_failure = gate.last_failure.lock().await;
				let current = self
					.bounded("get", self.store.get(scope))
					.await?
					.ok_or(Error::from(AuthError::MissingCredential))?;

				if !current.same_access_token(failed) {
					self.refresh_metrics.record_shared();
					obs::record_refresh_event(
						&scope.key(),
						&current.access_token.fingerprint(),
						true,
					);

					return Ok(current);
				}
				if let Some(failure) = last_failure.as_ref().filter(|f| f.exchange > ticket) {
					self.refresh_metrics.record_shared();

					let shared = AuthError::refresh_failed(failure.reason.clone(), failure.status);

					return Err(shared.into());
				}

				self.refresh_metrics.record_exchange();

				let exchanged = exchange::exchange_refresh(
					&self.descriptor,
					self.http_client.as_ref(),
					self.transport_mapper.as_ref(),
					&current,
				)
				.await;
				let exchange = gate.finished.fetch_add(1, Ordering::AcqRel) + 1;
				let updated = match exchanged {
					Ok(updated) => {
						*last_failure = None;

						updated
					},
					Err(err) => {
						*last_failure = match &err {
							Error::Auth(AuthError::RefreshFailed { reason, status }) =>
								Some(RefreshFailure {
									exchange,
									reason: reason.clone(),
									status: *status,
								}),
							_ => None,
						};

						return Err(err);
					},
				};
				let expected = current.refresh_token.as_ref().map(TokenSecret::expose);
				let outcome = self
					.bounded(
						"compare_and_swap_refresh",
						self.store.compare_and_swap_refresh(scope, expected, updated.clone()),
					)
					.await?;
				let stored = match outcome {
					CompareAndSwapOutcome::Updated => updated,
					CompareAndSwapOutcome::Missing => {
						self.bounded("put", self.store.put(updated.clone())).await?;

						updated
					},
					CompareAndSwapOutcome::RefreshMismatch =>
						match self.bounded("get", self.store.get(scope)).await? {
							Some(existing) => existing,
							None => {
								self.bounded("put", self.store.put(updated.clone())).await?;

								updated
							},
						},
				};

				obs::record_refresh_event(&scope.key(), &stored.access_token.fingerprint(), false);

				Ok(stored)
			})
			.await;

		match &result {
			Ok(_) => {
				self.refresh_metrics.record_success();
				obs::record_op_outcome(OP, OpOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_op_outcome(OP, OpOutcome::Failure);
			},
		}

		result
	}
}
