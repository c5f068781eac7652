//! File-backed [`CredentialStore`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScope},
	store::{self, CompareAndSwapOutcome, CredentialStore, StoreError, StoreFuture},
};

type Snapshot = HashMap<CredentialScope, Credential>;

/// Persists credentials to a JSON snapshot after each mutation.
///
/// Snapshots are written to a sibling `.tmp` file, synced, and renamed over the target so a
/// crash never leaves a half-written file behind. The file I/O runs on Tokio's blocking pool;
/// one writer at a time builds the next snapshot, and readers keep seeing the previous
/// contents until it is on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
	writer: Arc<AsyncMutex<()>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)), writer: Default::default() })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	// The writer guard moves into the blocking task and is only released once the snapshot
	// is in place, even when the awaiting caller is dropped.
	async fn persist(
		&self,
		writer: MutexGuardArc<()>,
		contents: &Snapshot,
	) -> Result<MutexGuardArc<()>, StoreError> {
		let serialized = serialize_snapshot(contents)?;
		let path = self.path.clone();
		let (writer, written) = tokio::task::spawn_blocking(move || {
			let written = write_snapshot(&path, &serialized);

			(writer, written)
		})
		.await
		.map_err(|e| StoreError::Backend { message: format!("Snapshot writer stopped: {e}") })?;

		written.map(|()| writer)
	}
}
impl CredentialStore for FileStore {
	fn get<'a>(&'a self, scope: &'a CredentialScope) -> StoreFuture<'a, Option<Credential>> {
		Box::pin(async move { Ok(self.inner.read().get(scope).cloned()) })
	}

	fn put(&self, credential: Credential) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let writer = self.writer.lock_arc().await;
			let mut next = self.inner.read().clone();

			next.insert(credential.scope.clone(), credential);

			let _writer = self.persist(writer, &next).await?;

			*self.inner.write() = next;

			Ok(())
		})
	}

	fn compare_and_swap_refresh<'a>(
		&'a self,
		scope: &'a CredentialScope,
		expected_refresh: Option<&'a str>,
		replacement: Credential,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let writer = self.writer.lock_arc().await;
			let mut next = self.inner.read().clone();
			let outcome = store::swap_in_map(&mut next, scope, expected_refresh, replacement);

			if !matches!(outcome, CompareAndSwapOutcome::Updated) {
				return Ok(outcome);
			}

			let _writer = self.persist(writer, &next).await?;

			*self.inner.write() = next;

			Ok(outcome)
		})
	}
}

fn serialize_snapshot(contents: &Snapshot) -> Result<Vec<u8>, StoreError> {
	let mut snapshot: Vec<&Credential> = contents.values().collect();

	snapshot.sort_by(|a, b| a.scope.cmp(&b.scope));

	serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize credential snapshot: {e}"),
	})
}

fn write_snapshot(path: &Path, serialized: &[u8]) -> Result<(), StoreError> {
	ensure_parent_exists(path)?;

	let mut tmp_path = path.to_path_buf();

	tmp_path.set_extension("tmp");

	{
		let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

		file.write_all(serialized).map_err(|e| backend("write", &tmp_path, e))?;
		file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
	}

	fs::rename(&tmp_path, path).map_err(|e| backend("replace", path, e))
}

fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
	if !path.exists() {
		return Ok(HashMap::new());
	}

	let bytes = fs::read(path).map_err(|e| backend("read", path, e))?;

	if bytes.is_empty() {
		return Ok(HashMap::new());
	}

	let entries: Vec<Credential> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(entries.into_iter().map(|credential| (credential.scope.clone(), credential)).collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
	}

	Ok(())
}

fn backend(action: &str, path: &Path, e: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::TenantId;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"booking_gateway_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn tenant_scope() -> CredentialScope {
		CredentialScope::Tenant(TenantId::new("host-file").expect("Tenant fixture should be valid."))
	}

	fn credential(scope: CredentialScope, access: &str, refresh: &str) -> Credential {
		Credential::builder(scope)
			.access_token(access)
			.refresh_token(refresh)
			.build()
			.expect("Failed to build file-store test credential.")
	}

	#[test]
	fn put_survives_reopen() {
		let path = temp_path("reopen");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.put(credential(tenant_scope(), "access-1", "refresh-1")))
			.expect("Failed to save tenant credential.");
		rt.block_on(store.put(credential(CredentialScope::Global, "access-g", "refresh-g")))
			.expect("Failed to save global credential.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.get(&tenant_scope()))
			.expect("Failed to fetch tenant credential.")
			.expect("File store lost credential after reopen.");

		assert_eq!(fetched.access_token.expose(), "access-1");
		assert!(rt.block_on(reopened.get(&CredentialScope::Global)).expect("Fetch failed.").is_some());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn compare_and_swap_persists_rotation() {
		let path = temp_path("cas");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let scope = tenant_scope();

		rt.block_on(store.put(credential(scope.clone(), "access-old", "refresh-old")))
			.expect("Failed to seed credential.");

		let mismatch = rt
			.block_on(store.compare_and_swap_refresh(
				&scope,
				Some("refresh-other"),
				credential(scope.clone(), "access-x", "refresh-x"),
			))
			.expect("CAS should not fail on mismatch.");

		assert_eq!(mismatch, CompareAndSwapOutcome::RefreshMismatch);

		let updated = rt
			.block_on(store.compare_and_swap_refresh(
				&scope,
				Some("refresh-old"),
				credential(scope.clone(), "access-new", "refresh-new"),
			))
			.expect("CAS should succeed.");

		assert_eq!(updated, CompareAndSwapOutcome::Updated);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.get(&scope))
			.expect("Fetch failed.")
			.expect("Rotated credential should be persisted.");

		assert_eq!(fetched.access_token.expose(), "access-new");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn puts_queue_behind_an_unfinished_snapshot_without_stalling_the_runtime() {
		let path = temp_path("queued");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let scope = tenant_scope();
		let in_flight = store.writer.lock_arc().await;
		let queued = tokio::time::timeout(
			std::time::Duration::from_millis(100),
			store.put(credential(scope.clone(), "access-q", "refresh-q")),
		)
		.await;

		assert!(queued.is_err(), "A put must wait for the snapshot already being written.");
		assert!(store.get(&scope).await.expect("Fetch failed.").is_none());

		drop(in_flight);

		store
			.put(credential(scope.clone(), "access-q", "refresh-q"))
			.await
			.expect("Put should succeed once the writer is free.");

		assert!(store.get(&scope).await.expect("Fetch failed.").is_some());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn concurrent_puts_all_reach_the_snapshot() {
		let path = temp_path("concurrent");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let scope = |id: &str| {
			CredentialScope::Tenant(TenantId::new(id).expect("Tenant fixture should be valid."))
		};
		let (first, second, third) = tokio::join!(
			store.put(credential(scope("tenant-a"), "access-a", "refresh-a")),
			store.put(credential(scope("tenant-b"), "access-b", "refresh-b")),
			store.put(credential(CredentialScope::Global, "access-g", "refresh-g")),
		);

		first.expect("First put should succeed.");
		second.expect("Second put should succeed.");
		third.expect("Third put should succeed.");

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		for expected in [scope("tenant-a"), scope("tenant-b"), CredentialScope::Global] {
			assert!(
				reopened.get(&expected).await.expect("Fetch failed.").is_some(),
				"Snapshot lost the credential for {expected:?}."
			);
		}

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_a_serialization_error() {
		let path = temp_path("corrupt");

		fs::write(&path, b"{not json").expect("Failed to write corrupt snapshot.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshot must be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
