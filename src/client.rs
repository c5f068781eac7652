//! Token-refreshing upstream client.
//!
//! [`TokenRefreshClient::execute`] attaches the scope's access token to an upstream call,
//! and when the upstream reports an authorization failure it refreshes the credential
//! under a per-scope single-flight guard, persists it, and replays the call exactly once.

mod metrics;
mod refresh;
mod request;

pub use metrics::RefreshMetrics;
pub use request::*;

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{self, HeaderValue, header},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialScope, TokenSecret},
	error::{AuthError, UpstreamError},
	exchange::{CallStage, TransportErrorMapper},
	http::{ResponseMetadataSlot, UpstreamHttpClient},
	store::{CredentialStore, StoreError, StoreFuture},
	upstream::{AuthScheme, ResponseContext, UpstreamDescriptor, UpstreamStrategy},
};
use refresh::RefreshGate;
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Refresh client specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenRefreshClient = TokenRefreshClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// What the global scope uses when no credential is stored for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalFallback {
	/// Send the call without any credential.
	Anonymous,
	/// Send the call with a static access token that is never refreshed.
	StaticToken(TokenSecret),
}

/// Executes upstream calls on behalf of a scope, refreshing its credential on demand.
///
/// The client owns the HTTP transport, the credential store, and the upstream descriptor
/// so the facade only deals with requests and responses. Refreshes for one scope are
/// serialized; different scopes refresh independently.
#[derive(Clone)]
pub struct TokenRefreshClient<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound upstream request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Credential store shared with every other gateway instance.
	pub store: Arc<dyn CredentialStore>,
	/// Upstream descriptor that defines endpoints, auth scheme, and refresh method.
	pub descriptor: UpstreamDescriptor,
	/// Strategy that recognizes provider-specific authorization failures.
	pub strategy: Arc<dyn UpstreamStrategy>,
	/// Fallback applied to the global scope when nothing is stored for it.
	pub global_fallback: Option<GlobalFallback>,
	/// Upper bound for every credential store call.
	pub store_timeout: Duration,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_gates: Arc<Mutex<HashMap<CredentialScope, Arc<RefreshGate>>>>,
}
impl<C, M> TokenRefreshClient<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Default bound for credential store calls.
	pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::seconds(5);

	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		descriptor: UpstreamDescriptor,
		strategy: Arc<dyn UpstreamStrategy>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			strategy,
			global_fallback: None,
			store_timeout: Self::DEFAULT_STORE_TIMEOUT,
			refresh_metrics: Default::default(),
			refresh_gates: Default::default(),
		}
	}

	/// Sets the fallback used by the global scope when no credential is stored.
	pub fn with_global_fallback(mut self, fallback: GlobalFallback) -> Self {
		self.global_fallback = Some(fallback);

		self
	}

	/// Overrides the store call bound (defaults to five seconds; negative values clamp to zero).
	pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
		self.store_timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		self
	}

	/// Sends `request` for `scope`, refreshing and replaying it once on an authorization failure.
	///
	/// Non-authorization failures (transport errors, timeouts, any other status) are returned
	/// as-is and never retried.
	pub async fn execute(
		&self,
		scope: &CredentialScope,
		request: &UpstreamRequest,
	) -> Result<UpstreamResponse> {
		let stored = self.bounded("get", self.store.get(scope)).await?;
		let credential = match stored {
			Some(credential) => Some(credential),
			None => match (&self.global_fallback, scope.is_global()) {
				(Some(_), true) => None,
				_ => return Err(AuthError::MissingCredential.into()),
			},
		};
		let token = match (&credential, &self.global_fallback) {
			(Some(credential), _) => Some(&credential.access_token),
			(None, Some(GlobalFallback::StaticToken(token))) => Some(token),
			(None, _) => None,
		};
		let response = self.send(request, token).await?;

		if !self.is_authorization_failure(&response) {
			return Ok(response);
		}

		// Fallback credentials have no refresh token to exchange.
		let Some(failed) = credential else {
			return Err(AuthError::MissingCredential.into());
		};
		let fresh = self.refresh_after_failure(scope, &failed).await?;
		let retried = self.send(request, Some(&fresh.access_token)).await?;

		if self.is_authorization_failure(&retried) {
			return Err(AuthError::RetryFailed.into());
		}

		Ok(retried)
	}

	fn is_authorization_failure(&self, response: &UpstreamResponse) -> bool {
		let ctx = ResponseContext::new(response.status.as_u16()).with_body(&response.body);

		self.strategy.is_authorization_failure(&ctx, &self.descriptor.quirks)
	}

	async fn send(
		&self,
		request: &UpstreamRequest,
		token: Option<&TokenSecret>,
	) -> Result<UpstreamResponse> {
		let http_request = self.build_request(request, token)?;
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());
		let response = handle.call(http_request).await.map_err(|err| {
			let meta = slot.take();

			self.transport_mapper.map_transport_error(CallStage::Booking, meta.as_ref(), err)
		})?;
		let (parts, body) = response.into_parts();

		Ok(UpstreamResponse { status: parts.status, headers: parts.headers, body })
	}

	fn build_request(
		&self,
		request: &UpstreamRequest,
		token: Option<&TokenSecret>,
	) -> Result<http::Request<Vec<u8>>> {
		let mut builder = http::Request::builder()
			.method(request.method.clone())
			.uri(request.url.as_str())
			.header(header::ACCEPT, HeaderValue::from_static("application/json"));

		if let Some(token) = token {
			builder = match &self.descriptor.auth_scheme {
				AuthScheme::Bearer =>
					builder.header(header::AUTHORIZATION, format!("Bearer {}", token.expose())),
				AuthScheme::Header { name } => builder.header(name.as_str(), token.expose()),
			};
		}

		let body = match &request.body {
			Some(json) => {
				builder = builder
					.header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

				serde_json::to_vec(json).map_err(|e| {
					Error::validation(
						"request body could not be serialized",
						serde_json::json!({ "cause": e.to_string() }),
					)
				})?
			},
			None => Vec::new(),
		};

		builder.body(body).map_err(|e| Error::from(UpstreamError::Request(e)))
	}

	/// Runs a store call under the configured timeout; an elapsed timeout is a storage failure.
	pub(crate) async fn bounded<T>(
		&self,
		operation: &'static str,
		fut: StoreFuture<'_, T>,
	) -> Result<T> {
		match tokio::time::timeout(self.store_timeout.unsigned_abs(), fut).await {
			Ok(result) => result.map_err(Error::from),
			Err(_) => Err(StoreError::Timeout {
				operation: operation.into(),
				millis: u64::try_from(self.store_timeout.whole_milliseconds()).unwrap_or(u64::MAX),
			}
			.into()),
		}
	}

	pub(crate) fn refresh_gate(&self, scope: &CredentialScope) -> Arc<RefreshGate> {
		let mut gates = self.refresh_gates.lock();

		gates.entry(scope.clone()).or_default().clone()
	}
}
#[cfg(feature = "reqwest")]
impl TokenRefreshClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new client for the provided descriptor.
	///
	/// The client provisions its own reqwest-backed transport, bounded by
	/// [`ReqwestHttpClient::DEFAULT_TIMEOUT`] with redirects disabled. Use
	/// [`ReqwestHttpClient::with_timeout`] with [`TokenRefreshClient::with_http_client`] for a
	/// different bound.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		descriptor: UpstreamDescriptor,
		strategy: Arc<dyn UpstreamStrategy>,
	) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::with_timeout(ReqwestHttpClient::DEFAULT_TIMEOUT)?;

		Ok(Self::with_http_client(
			store,
			descriptor,
			strategy,
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for TokenRefreshClient<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefreshClient")
			.field("descriptor", &self.descriptor.id)
			.field("global_fallback_set", &self.global_fallback.is_some())
			.field("store_timeout", &self.store_timeout)
			.finish()
	}
}
