//! Gateway error taxonomy shared by the client, classifier, stores, and facade.

// crates.io
use serde_json::{Value, json};
// self
use crate::{_prelude::*, obs::redact};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Caller-visible outcome of a facade operation.
pub type GatewayResult<T> = std::result::Result<T, GatewayFailure>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable error categories callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Credential missing, refresh failed, or the post-refresh retry was still rejected.
	Auth,
	/// The operation is disallowed by a business rule.
	Permission,
	/// The upstream (or local normalization) rejected the payload content.
	Validation,
	/// The upstream response matched no known envelope.
	UnexpectedShape,
	/// Network failure, timeout, throttling, or a 5xx from the upstream.
	UpstreamUnavailable,
	/// Credential persistence failed.
	Storage,
}
impl ErrorKind {
	/// Returns a stable label suitable for span, metric, or JSON fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Auth => "auth",
			ErrorKind::Permission => "permission",
			ErrorKind::Validation => "validation",
			ErrorKind::UnexpectedShape => "unexpected_shape",
			ErrorKind::UpstreamUnavailable => "upstream_unavailable",
			ErrorKind::Storage => "storage",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical gateway error produced by every layer below the facade.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential problem; never retried beyond the single post-refresh retry.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Business rule rejected the operation before any network call.
	#[error("{reason}")]
	Permission {
		/// Human-readable reason.
		reason: String,
	},
	/// Payload content was rejected.
	#[error("{message}")]
	Validation {
		/// Joined validation messages.
		message: String,
		/// Raw upstream (or local) details for logging.
		details: Value,
	},
	/// Response did not match any known envelope.
	#[error("{message}")]
	UnexpectedShape {
		/// Short description of the mismatch.
		message: String,
		/// Raw response (or preview) for logging.
		details: Value,
	},
	/// Upstream could not be reached or answered with a server-side failure.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Message used when an upstream response matches none of the known envelopes.
	pub const UNRECOGNIZED_RESPONSE: &'static str = "unrecognized upstream response";

	/// Builds a [`Error::Permission`] value.
	pub fn permission(reason: impl Into<String>) -> Self {
		Self::Permission { reason: reason.into() }
	}

	/// Builds a [`Error::Validation`] value.
	pub fn validation(message: impl Into<String>, details: Value) -> Self {
		Self::Validation { message: message.into(), details }
	}

	/// Builds the fail-closed [`Error::UnexpectedShape`] value for an unmatched response.
	pub fn unexpected_shape(details: Value) -> Self {
		Self::UnexpectedShape { message: Self::UNRECOGNIZED_RESPONSE.into(), details }
	}

	/// Taxonomy category of the error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Auth(_) => ErrorKind::Auth,
			Self::Permission { .. } => ErrorKind::Permission,
			Self::Validation { .. } => ErrorKind::Validation,
			Self::UnexpectedShape { .. } => ErrorKind::UnexpectedShape,
			Self::Upstream(_) => ErrorKind::UpstreamUnavailable,
			Self::Storage(_) => ErrorKind::Storage,
		}
	}

	/// Structured details suitable for logging (not yet redacted).
	pub fn details(&self) -> Value {
		match self {
			Self::Auth(err) => err.details(),
			Self::Permission { .. } => Value::Null,
			Self::Validation { details, .. } | Self::UnexpectedShape { details, .. } =>
				details.clone(),
			Self::Upstream(err) => err.details(),
			Self::Storage(err) => json!({ "store": err.to_string() }),
		}
	}
}

/// Credential failures raised by the token refresh client.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// No credential is stored for the scope and no fallback applies.
	#[error("missing credential")]
	MissingCredential,
	/// The refresh exchange was rejected or could not be completed.
	#[error("refresh failed")]
	RefreshFailed {
		/// Provider- or gateway-supplied reason.
		reason: String,
		/// HTTP status of the token endpoint, when available.
		status: Option<u16>,
	},
	/// The request was still rejected after a successful refresh.
	#[error("retry failed")]
	RetryFailed,
}
impl AuthError {
	/// Builds a [`AuthError::RefreshFailed`] value.
	pub fn refresh_failed(reason: impl Into<String>, status: Option<u16>) -> Self {
		Self::RefreshFailed { reason: reason.into(), status }
	}

	fn details(&self) -> Value {
		match self {
			Self::RefreshFailed { reason, status } => json!({ "reason": reason, "status": status }),
			_ => Value::Null,
		}
	}
}

/// Transport-level and server-side upstream failures.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Upstream answered with a 5xx or throttling status.
	#[error("Upstream returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint, if supplied.
		retry_after: Option<Duration>,
		/// Truncated response body.
		body: String,
	},
	/// The call exceeded the configured request timeout.
	#[error("Upstream request timed out.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The outbound request could not be assembled.
	#[error("Upstream request could not be built.")]
	Request(#[from] oauth2::http::Error),
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream API.")]
	Io(#[from] std::io::Error),
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	fn details(&self) -> Value {
		match self {
			Self::Status { status, retry_after, body } => json!({
				"status": status,
				"retry_after_secs": retry_after.map(|d| d.whole_seconds()),
				"body": body,
			}),
			Self::Network { source } => json!({ "cause": source.to_string() }),
			Self::Io(err) => json!({ "cause": err.to_string() }),
			Self::Request(err) => json!({ "cause": err.to_string() }),
			Self::Timeout => Value::Null,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Construction-time configuration failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL cannot be parsed.
	#[error("The {name} URL is invalid.")]
	InvalidUrl {
		/// Setting that holds the URL.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Upstream descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::upstream::DescriptorError),
	/// A required environment variable is absent.
	#[error("Environment variable `{name}` is required.")]
	MissingVar {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable holds an unusable value.
	#[error("Environment variable `{name}` is invalid: {reason}.")]
	InvalidVar {
		/// Variable name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// A static fallback credential could not be built.
	#[error("Unable to build the configured credential.")]
	Credential(#[from] crate::auth::CredentialBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Caller-visible failure: a stable kind, a short message, and redacted details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ThisError)]
#[error("{kind}: {message}")]
pub struct GatewayFailure {
	/// Taxonomy category.
	pub kind: ErrorKind,
	/// Human-readable message (never raw credentials).
	pub message: String,
	/// Redacted structured details for logging.
	pub details: Value,
}
impl From<Error> for GatewayFailure {
	fn from(err: Error) -> Self {
		Self {
			kind: err.kind(),
			message: redact::redact_text(&err.to_string()),
			details: redact::redact_value(err.details()),
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let err: Error = store_error.clone().into();

		assert_eq!(err.kind(), ErrorKind::Storage);
		assert!(err.to_string().contains("database unreachable"));

		let source =
			StdError::source(&err).expect("Gateway error should expose the store error as source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn auth_messages_match_taxonomy() {
		assert_eq!(Error::from(AuthError::MissingCredential).to_string(), "missing credential");
		assert_eq!(
			Error::from(AuthError::refresh_failed("invalid_grant", Some(400))).to_string(),
			"refresh failed"
		);
		assert_eq!(Error::from(AuthError::RetryFailed).to_string(), "retry failed");
	}

	#[test]
	fn failure_conversion_redacts_tokens() {
		let err = Error::validation(
			"date conflict",
			json!({ "bookings": [{ "success": false }], "token": "leaked-token" }),
		);
		let failure = GatewayFailure::from(err);

		assert_eq!(failure.kind, ErrorKind::Validation);
		assert_eq!(failure.message, "date conflict");
		assert_eq!(failure.details["token"], "<redacted>");
		assert_eq!(failure.details["bookings"][0]["success"], false);
	}

	#[test]
	fn failure_conversion_scrubs_body_previews() {
		let status = Error::from(UpstreamError::Status {
			status: 502,
			retry_after: None,
			body: "proxy rejected Authorization: Bearer live-access-7".into(),
		});
		let failure = GatewayFailure::from(status);

		assert_eq!(failure.details["body"], "proxy rejected Authorization: Bearer <redacted>");
		assert!(!failure.to_string().contains("live-access-7"));

		let refresh = Error::from(AuthError::refresh_failed(
			"{\"error\":\"invalid_grant\",\"refresh_token\":\"stale-refresh\"}",
			Some(400),
		));
		let failure = GatewayFailure::from(refresh);

		assert!(!failure.details["reason"].to_string().contains("stale-refresh"));
		assert_eq!(failure.details["status"], 400);

		let shaped = Error::validation("rejected token=abc123", json!({}));

		assert_eq!(GatewayFailure::from(shaped).message, "rejected token=<redacted>");
	}

	#[test]
	fn kinds_serialize_as_snake_case() {
		let payload = serde_json::to_string(&ErrorKind::UpstreamUnavailable)
			.expect("ErrorKind should serialize to JSON.");

		assert_eq!(payload, "\"upstream_unavailable\"");
	}
}
