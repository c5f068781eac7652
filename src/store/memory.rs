//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScope},
	store::{self, CompareAndSwapOutcome, CredentialStore, StoreFuture},
};

type CredentialMap = Arc<RwLock<HashMap<CredentialScope, Credential>>>;

/// Process-local credential store; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(CredentialMap);
impl MemoryStore {
	/// Number of scopes with a stored credential.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no credential is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get<'a>(&'a self, scope: &'a CredentialScope) -> StoreFuture<'a, Option<Credential>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(scope).cloned()) })
	}

	fn put(&self, credential: Credential) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(credential.scope.clone(), credential);

			Ok(())
		})
	}

	fn compare_and_swap_refresh<'a>(
		&'a self,
		scope: &'a CredentialScope,
		expected_refresh: Option<&'a str>,
		replacement: Credential,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let map = self.0.clone();

		Box::pin(async move {
			let mut guard = map.write();

			Ok(store::swap_in_map(&mut guard, scope, expected_refresh, replacement))
		})
	}
}
