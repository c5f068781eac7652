//! Booking gateway for reservation platforms: scoped credential stores, single-flight token
//! refresh, booking normalization, and envelope-aware response classification in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod booking;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod http;
pub mod obs;
pub mod store;
pub mod upstream;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		booking::BookingDefaults,
		client::TokenRefreshClient,
		exchange::ReqwestTransportErrorMapper,
		gateway::{BookingGateway, ReqwestBookingGateway},
		http::ReqwestHttpClient,
		store::{CredentialStore, MemoryStore},
		upstream::{DefaultUpstreamStrategy, UpstreamDescriptor, UpstreamStrategy},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		test_reqwest_http_client_with_timeout(ReqwestHttpClient::DEFAULT_TIMEOUT)
	}

	/// Same as [`test_reqwest_http_client`] with a caller-chosen request bound.
	pub fn test_reqwest_http_client_with_timeout(timeout: Duration) -> ReqwestHttpClient {
		let client = ReqwestHttpClient::builder(timeout)
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`BookingGateway`] backed by an in-memory store, the default upstream
	/// strategy, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_gateway(
		descriptor: UpstreamDescriptor,
	) -> (ReqwestBookingGateway, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let strategy: Arc<dyn UpstreamStrategy> = Arc::new(DefaultUpstreamStrategy);
		let http_client = test_reqwest_http_client();
		let mapper = Arc::new(ReqwestTransportErrorMapper);
		let client =
			TokenRefreshClient::with_http_client(store, descriptor, strategy, http_client, mapper);

		(BookingGateway::new(client, BookingDefaults::default()), store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
