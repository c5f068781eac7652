// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	upstream::{AuthScheme, RefreshMethod, UpstreamDescriptor, UpstreamEndpoints, UpstreamQuirks},
};

const DEFAULT_BOOKINGS_PATH: &str = "bookings";

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DescriptorError {
	/// API base URL is mandatory.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// API base cannot be used as a base for relative paths.
	#[error("The API base URL cannot carry relative paths: {url}.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Bookings path could not be joined onto the API base.
	#[error("The bookings path `{path}` is invalid.")]
	InvalidBookingsPath {
		/// Offending path.
		path: String,
	},
	/// Header names used for tokens must be non-empty visible ASCII.
	#[error("Header name `{name}` is invalid.")]
	InvalidHeaderName {
		/// Offending header name.
		name: String,
	},
	/// OAuth refresh requires a client identifier.
	#[error("OAuth refresh requires a non-empty client identifier.")]
	MissingClientId,
}

/// Builder for [`UpstreamDescriptor`] values.
#[derive(Debug)]
pub struct UpstreamDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// API base URL.
	pub api_base: Option<Url>,
	/// Token endpoint used for refresh exchanges.
	pub token_endpoint: Option<Url>,
	/// Bookings collection path relative to the API base.
	pub bookings_path: String,
	/// Access-token attachment scheme.
	pub auth_scheme: AuthScheme,
	/// Refresh exchange method.
	pub refresh_method: RefreshMethod,
	/// Platform-specific quirks.
	pub quirks: UpstreamQuirks,
}
impl UpstreamDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			api_base: None,
			token_endpoint: None,
			bookings_path: DEFAULT_BOOKINGS_PATH.into(),
			auth_scheme: AuthScheme::default(),
			refresh_method: RefreshMethod::default(),
			quirks: UpstreamQuirks::default(),
		}
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the bookings collection path (defaults to `bookings`).
	pub fn bookings_path(mut self, path: impl Into<String>) -> Self {
		self.bookings_path = path.into();

		self
	}

	/// Overrides the access-token attachment scheme.
	pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
		self.auth_scheme = scheme;

		self
	}

	/// Overrides the refresh exchange method.
	pub fn refresh_method(mut self, method: RefreshMethod) -> Self {
		self.refresh_method = method;

		self
	}

	/// Overrides the platform quirks.
	pub fn quirks(mut self, quirks: UpstreamQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<UpstreamDescriptor, DescriptorError> {
		let mut api_base = self.api_base.ok_or(DescriptorError::MissingApiBase)?;
		let token = self.token_endpoint.ok_or(DescriptorError::MissingTokenEndpoint)?;

		validate_endpoint("api", &api_base)?;
		validate_endpoint("token", &token)?;

		if api_base.cannot_be_a_base() {
			return Err(DescriptorError::CannotBeABase { url: api_base.to_string() });
		}
		if !api_base.path().ends_with('/') {
			let path = format!("{}/", api_base.path());

			api_base.set_path(&path);
		}

		let relative = self.bookings_path.trim_start_matches('/');

		if relative.is_empty() {
			return Err(DescriptorError::InvalidBookingsPath { path: self.bookings_path });
		}

		let bookings = api_base
			.join(relative)
			.map_err(|_| DescriptorError::InvalidBookingsPath { path: self.bookings_path.clone() })?;

		if let AuthScheme::Header { name } = &self.auth_scheme {
			validate_header_name(name)?;
		}

		match &self.refresh_method {
			RefreshMethod::HeaderExchange { header } => validate_header_name(header)?,
			RefreshMethod::OAuth2 { client_id, .. } if client_id.trim().is_empty() =>
				return Err(DescriptorError::MissingClientId),
			RefreshMethod::OAuth2 { .. } => {},
		}

		Ok(UpstreamDescriptor {
			id: self.id,
			endpoints: UpstreamEndpoints { api_base, bookings, token },
			auth_scheme: self.auth_scheme,
			refresh_method: self.refresh_method,
			quirks: self.quirks,
		})
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DescriptorError> {
	if url.scheme() != "https" {
		Err(DescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn validate_header_name(name: &str) -> Result<(), DescriptorError> {
	let valid = !name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'));

	if valid { Ok(()) } else { Err(DescriptorError::InvalidHeaderName { name: name.into() }) }
}
