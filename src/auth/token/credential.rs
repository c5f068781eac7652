//! Credential pairs persisted per scope, plus their builder.

// self
use crate::{
	_prelude::*,
	auth::{CredentialScope, token::secret::TokenSecret},
};

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when the access token is an empty string.
	#[error("Access token cannot be empty.")]
	EmptyAccessToken,
}

/// Access/refresh token pair for one [`CredentialScope`].
///
/// At most one live credential exists per scope. Records are replaced in place after a
/// refresh exchange and are never deleted by the gateway.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// Partition that owns the credential.
	pub scope: CredentialScope,
	/// Token attached to upstream calls.
	pub access_token: TokenSecret,
	/// Token exchanged for a new access token after an authorization failure.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the access token was issued or loaded.
	pub issued_at: OffsetDateTime,
	/// Expiry reported by the token endpoint, when known.
	#[serde(default)]
	pub expires_at: Option<OffsetDateTime>,
}
impl Credential {
	/// Returns a builder for the provided scope.
	pub fn builder(scope: CredentialScope) -> CredentialBuilder {
		CredentialBuilder::new(scope)
	}

	/// Returns `true` if the upstream-reported expiry has passed at `instant`.
	///
	/// Credentials without an expiry never report themselves expired; the upstream's
	/// authorization failure is the source of truth for those.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expiry| instant >= expiry)
	}

	/// Returns `true` if `other` carries the same access token.
	pub fn same_access_token(&self, other: &Credential) -> bool {
		self.access_token == other.access_token
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("scope", &self.scope)
			.field("access_token", &self.access_token.fingerprint())
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug)]
pub struct CredentialBuilder {
	scope: CredentialScope,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	fn new(scope: CredentialScope) -> Self {
		Self {
			scope,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Keeps an existing refresh secret (used when the upstream does not rotate it).
	pub fn refresh_secret(mut self, secret: Option<TokenSecret>) -> Self {
		self.refresh_token = secret;

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self.access_token.ok_or(CredentialBuilderError::MissingAccessToken)?;

		if access_token.expose().is_empty() {
			return Err(CredentialBuilderError::EmptyAccessToken);
		}

		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = self.expires_at.or_else(|| self.expires_in.map(|delta| issued_at + delta));

		Ok(Credential {
			scope: self.scope,
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
		})
	}
}
