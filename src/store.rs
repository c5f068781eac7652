//! Credential storage contracts and built-in backends.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScope, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for per-scope credentials.
///
/// Writes must be visible to every subsequent [`get`](CredentialStore::get) from callers
/// sharing the backend. Durable backends persist before resolving the future.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the credential stored for `scope`, if present.
	fn get<'a>(&'a self, scope: &'a CredentialScope) -> StoreFuture<'a, Option<Credential>>;

	/// Persists or replaces the credential for its scope.
	fn put(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Atomically replaces the credential if its refresh secret still matches `expected_refresh`.
	fn compare_and_swap_refresh<'a>(
		&'a self,
		scope: &'a CredentialScope,
		expected_refresh: Option<&'a str>,
		replacement: Credential,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Result of a refresh-token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh secret matched the expected value and the credential was replaced.
	Updated,
	/// A credential exists but its refresh secret did not match.
	RefreshMismatch,
	/// No credential is stored for the scope.
	Missing,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The backend did not answer within the configured store timeout.
	#[error("Store {operation} timed out after {millis}ms.")]
	Timeout {
		/// Store operation that timed out.
		operation: String,
		/// Timeout that elapsed, in milliseconds.
		millis: u64,
	},
}

pub(crate) fn refresh_matches(current: Option<&TokenSecret>, expected: Option<&str>) -> bool {
	match (current.map(TokenSecret::expose), expected) {
		(None, None) => true,
		(Some(cur), Some(exp)) => cur == exp,
		_ => false,
	}
}

pub(crate) fn swap_in_map(
	map: &mut HashMap<CredentialScope, Credential>,
	scope: &CredentialScope,
	expected_refresh: Option<&str>,
	replacement: Credential,
) -> CompareAndSwapOutcome {
	let outcome = match map.get(scope) {
		Some(existing) if refresh_matches(existing.refresh_token.as_ref(), expected_refresh) =>
			CompareAndSwapOutcome::Updated,
		Some(_) => CompareAndSwapOutcome::RefreshMismatch,
		None => CompareAndSwapOutcome::Missing,
	};

	if matches!(outcome, CompareAndSwapOutcome::Updated) {
		map.insert(scope.clone(), replacement);
	}

	outcome
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_matching_requires_both_sides_to_agree() {
		let secret = TokenSecret::new("refresh-1");

		assert!(refresh_matches(None, None));
		assert!(refresh_matches(Some(&secret), Some("refresh-1")));
		assert!(!refresh_matches(Some(&secret), Some("refresh-2")));
		assert!(!refresh_matches(Some(&secret), None));
		assert!(!refresh_matches(None, Some("refresh-1")));
	}

	#[test]
	fn timeout_error_names_operation() {
		let err = StoreError::Timeout { operation: "get".into(), millis: 5_000 };

		assert_eq!(err.to_string(), "Store get timed out after 5000ms.");
	}

	#[test]
	fn compare_and_swap_outcome_serializes() {
		let payload = serde_json::to_string(&CompareAndSwapOutcome::RefreshMismatch)
			.expect("CompareAndSwapOutcome should serialize to JSON.");

		assert_eq!(payload, "\"RefreshMismatch\"");
	}
}
