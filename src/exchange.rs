//! Refresh-token exchanges against the upstream token endpoint.
//!
//! Two methods are supported, selected by the descriptor's [`RefreshMethod`]: the
//! standard OAuth 2.0 refresh grant (delegated to the `oauth2` crate) and a
//! header-based exchange where the refresh token travels in a named request header
//! and the endpoint answers with a small JSON document.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, ClientId, ClientSecret, HttpClientError, RefreshToken, RequestTokenError,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
	http::{self, Method, header},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	error::{AuthError, UpstreamError},
	http::{ResponseMetadata, ResponseMetadataSlot, UpstreamHttpClient},
	obs::redact,
	upstream::{RefreshMethod, UpstreamDescriptor, strategy},
};

/// Which kind of upstream call a transport failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallStage {
	/// Booking list/write call.
	Booking,
	/// Refresh-token exchange.
	Refresh,
}
impl CallStage {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallStage::Booking => "booking",
			CallStage::Refresh => "refresh",
		}
	}
}

/// Maps HTTP transport failures into gateway [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a gateway error.
	fn map_transport_error(
		&self,
		stage: CallStage,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_stage: CallStage,
		_meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => UpstreamError::from(*inner).into(),
			HttpClientError::Http(inner) => UpstreamError::Request(inner).into(),
			HttpClientError::Io(inner) => UpstreamError::Io(inner).into(),
			HttpClientError::Other(message) => UpstreamError::network(OtherTransportError(message)).into(),
			_ => UpstreamError::network(OtherTransportError("unknown transport failure".into())).into(),
		}
	}
}

/// Free-form transport failure reported by an HTTP client as a string.
#[derive(Debug, ThisError)]
#[error("{0}")]
pub struct OtherTransportError(pub String);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeaderTokenResponse {
	#[serde(alias = "accessToken", alias = "access_token")]
	token: String,
	#[serde(default, alias = "refresh_token")]
	refresh_token: Option<String>,
	#[serde(default, alias = "expires_in")]
	expires_in: Option<i64>,
}

/// Exchanges the refresh token of `current` for a new credential.
///
/// Every failure is reported as [`AuthError::RefreshFailed`]; the caller never retries it.
/// When the upstream does not rotate the refresh token, the old one is kept.
pub(crate) async fn exchange_refresh<C, M>(
	descriptor: &UpstreamDescriptor,
	http_client: &C,
	mapper: &M,
	current: &Credential,
) -> Result<Credential>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let refresh = current.refresh_token.as_ref().ok_or_else(|| {
		AuthError::refresh_failed("no refresh token is stored for the scope", None)
	})?;
	let (access, rotated, expires_in) = match &descriptor.refresh_method {
		RefreshMethod::OAuth2 { client_id, client_secret } =>
			oauth2_exchange(
				descriptor,
				http_client,
				mapper,
				client_id,
				client_secret.as_ref(),
				refresh,
			)
			.await?,
		RefreshMethod::HeaderExchange { header } =>
			header_exchange(descriptor, http_client, mapper, header, refresh).await?,
	};
	let mut builder = Credential::builder(current.scope.clone())
		.access_token(access)
		.issued_at(OffsetDateTime::now_utc());

	builder = match rotated {
		Some(secret) => builder.refresh_token(secret),
		None => builder.refresh_secret(Some(refresh.clone())),
	};

	if let Some(secs) = expires_in.filter(|secs| *secs > 0) {
		builder = builder.expires_in(Duration::seconds(secs));
	}

	builder.build().map_err(|e| AuthError::refresh_failed(e.to_string(), None).into())
}

type Exchanged = (String, Option<String>, Option<i64>);

async fn oauth2_exchange<C, M>(
	descriptor: &UpstreamDescriptor,
	http_client: &C,
	mapper: &M,
	client_id: &str,
	client_secret: Option<&TokenSecret>,
	refresh: &TokenSecret,
) -> Result<Exchanged>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
		.map_err(|e| AuthError::refresh_failed(format!("token endpoint is invalid: {e}"), None))?;
	let mut client = BasicClient::new(ClientId::new(client_id.to_owned())).set_token_uri(token_url);

	if let Some(secret) = client_secret {
		client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
	}

	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());
	let response = client
		.exchange_refresh_token(&RefreshToken::new(refresh.expose().to_owned()))
		.request_async(&handle)
		.await
		.map_err(|err| map_oauth2_error(slot.take(), err, mapper, refresh))?;
	let expires_in = response.expires_in().and_then(|ttl| i64::try_from(ttl.as_secs()).ok());

	Ok((
		response.access_token().secret().to_owned(),
		response.refresh_token().map(|token| token.secret().to_owned()),
		expires_in,
	))
}

async fn header_exchange<C, M>(
	descriptor: &UpstreamDescriptor,
	http_client: &C,
	mapper: &M,
	header_name: &str,
	refresh: &TokenSecret,
) -> Result<Exchanged>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let request = http::Request::builder()
		.method(Method::GET)
		.uri(descriptor.endpoints.token.as_str())
		.header(header::ACCEPT, "application/json")
		.header(header_name, refresh.expose())
		.body(Vec::new())
		.map_err(|e| {
			AuthError::refresh_failed(format!("token request could not be built: {e}"), None)
		})?;
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());
	let response = handle.call(request).await.map_err(|err| {
		let meta = slot.take();
		let mapped = mapper.map_transport_error(CallStage::Refresh, meta.as_ref(), err);

		AuthError::refresh_failed(mapped.to_string(), meta.and_then(|m| m.status))
	})?;
	let status = response.status().as_u16();

	if !response.status().is_success() {
		let preview = strategy::truncate_preview(&String::from_utf8_lossy(response.body()));
		let reason = without_secret(preview, refresh);

		return Err(AuthError::refresh_failed(reason, Some(status)).into());
	}

	let deserializer = &mut serde_json::Deserializer::from_slice(response.body());
	let parsed: HeaderTokenResponse = serde_path_to_error::deserialize(deserializer).map_err(|e| {
		let reason = format!("malformed token response at {}: {}", e.path(), e.inner());

		AuthError::refresh_failed(reason, Some(status))
	})?;

	if parsed.token.is_empty() {
		let reason = "token endpoint returned an empty token";

		return Err(AuthError::refresh_failed(reason, Some(status)).into());
	}

	Ok((parsed.token, parsed.refresh_token.filter(|token| !token.is_empty()), parsed.expires_in))
}

fn map_oauth2_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
	refresh: &TokenSecret,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|m| m.status);
	let reason = match err {
		RequestTokenError::ServerResponse(response) => match response.error_description() {
			Some(description) => format!("{}: {description}", response.error().as_ref()),
			None => response.error().as_ref().to_string(),
		},
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(CallStage::Refresh, meta.as_ref(), error).to_string(),
		RequestTokenError::Parse(error, _body) => format!("malformed token response: {error}"),
		RequestTokenError::Other(message) => message,
	};

	AuthError::refresh_failed(without_secret(reason, refresh), status).into()
}

// Upstream error text sometimes echoes the rejected refresh token back.
fn without_secret(reason: String, refresh: &TokenSecret) -> String {
	let secret = refresh.expose();

	if secret.is_empty() { reason } else { reason.replace(secret, redact::REDACTED) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn header_token_response_accepts_aliases() {
		let parsed: HeaderTokenResponse =
			serde_json::from_str("{\"access_token\":\"a\",\"refresh_token\":\"r\",\"expires_in\":60}")
				.expect("Snake-case token response should parse.");

		assert_eq!(parsed.token, "a");
		assert_eq!(parsed.refresh_token.as_deref(), Some("r"));
		assert_eq!(parsed.expires_in, Some(60));

		let parsed: HeaderTokenResponse = serde_json::from_str("{\"token\":\"b\",\"expiresIn\":86400}")
			.expect("Platform token response should parse.");

		assert_eq!(parsed.token, "b");
		assert!(parsed.refresh_token.is_none());
	}

	#[test]
	fn echoed_refresh_tokens_are_removed_from_reasons() {
		let refresh = TokenSecret::new("opaque-refresh-42");
		let reason =
			without_secret("unknown token opaque-refresh-42 (opaque-refresh-42)".into(), &refresh);

		assert_eq!(reason, "unknown token <redacted> (<redacted>)");
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_mapper_reports_other_errors_as_unavailable() {
		let err = ReqwestTransportErrorMapper.map_transport_error(
			CallStage::Booking,
			None,
			HttpClientError::Other("connection reset".into()),
		);

		assert_eq!(err.kind(), crate::error::ErrorKind::UpstreamUnavailable);
	}
}
