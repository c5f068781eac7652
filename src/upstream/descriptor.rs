//! Upstream descriptor data structures shared by the refresh client and the facade.

/// Builder API for assembling upstream descriptors.
pub mod builder;
/// Platform-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, TokenSecret},
};

/// How the access token is attached to outbound requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
	/// `Authorization: Bearer <token>`.
	#[default]
	Bearer,
	/// Raw token in a platform-specific header (e.g. `token: <token>`).
	Header {
		/// Header name.
		name: String,
	},
}

/// How a refresh token is exchanged for a new access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMethod {
	/// RFC 6749 `grant_type=refresh_token` against the token endpoint.
	OAuth2 {
		/// OAuth client identifier.
		client_id: String,
		/// Optional client secret for confidential clients.
		client_secret: Option<TokenSecret>,
	},
	/// `GET <token endpoint>` with the refresh token in a named header.
	HeaderExchange {
		/// Header that carries the refresh token.
		header: String,
	},
}
impl Default for RefreshMethod {
	fn default() -> Self {
		Self::HeaderExchange { header: "refreshToken".into() }
	}
}

/// Endpoint set declared by an upstream descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamEndpoints {
	/// API base URL (always ends with `/`).
	pub api_base: Url,
	/// Bookings collection endpoint (`GET` lists, `POST` writes).
	pub bookings: Url,
	/// Token endpoint used for refresh exchanges.
	pub token: Url,
}

/// Immutable upstream descriptor consumed by the refresh client and facade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions.
	pub endpoints: UpstreamEndpoints,
	/// Access-token attachment scheme.
	pub auth_scheme: AuthScheme,
	/// Refresh exchange method.
	pub refresh_method: RefreshMethod,
	/// Platform-specific quirks.
	pub quirks: UpstreamQuirks,
}
impl UpstreamDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> UpstreamDescriptorBuilder {
		UpstreamDescriptorBuilder::new(id)
	}
}
