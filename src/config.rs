//! Gateway configuration sourced from code or `BOOKING_GATEWAY_*` environment variables.
//!
//! | Variable | Default |
//! | --- | --- |
//! | `BOOKING_GATEWAY_API_BASE` | required |
//! | `BOOKING_GATEWAY_TOKEN_URL` | required |
//! | `BOOKING_GATEWAY_PROVIDER_ID` | `upstream` |
//! | `BOOKING_GATEWAY_BOOKINGS_PATH` | `bookings` |
//! | `BOOKING_GATEWAY_AUTH_HEADER` | unset (`Authorization: Bearer`) |
//! | `BOOKING_GATEWAY_REFRESH_METHOD` | `header` (`header` or `oauth2`) |
//! | `BOOKING_GATEWAY_REFRESH_HEADER` | `refreshToken` |
//! | `BOOKING_GATEWAY_CLIENT_ID` / `BOOKING_GATEWAY_CLIENT_SECRET` | required for `oauth2` |
//! | `BOOKING_GATEWAY_FORBIDDEN_IS_UNAUTHORIZED` | `false` |
//! | `BOOKING_GATEWAY_DEFAULT_PROPERTY_ID` / `BOOKING_GATEWAY_DEFAULT_ROOM_ID` | unset |
//! | `BOOKING_GATEWAY_CREATE_STATUS` | `confirmed` |
//! | `BOOKING_GATEWAY_CANCEL_STATUS` | `cancelled` |
//! | `BOOKING_GATEWAY_DIRECT_CHANNEL` | `direct` |
//! | `BOOKING_GATEWAY_REQUEST_TIMEOUT_SECS` | `30` |
//! | `BOOKING_GATEWAY_STORE_TIMEOUT_MS` | `5000` |
//! | `BOOKING_GATEWAY_GLOBAL_FALLBACK` | `none` (`none`, `anonymous`, or `static`) |
//! | `BOOKING_GATEWAY_STATIC_TOKEN` | required for `static` |
//! | `BOOKING_GATEWAY_ACCESS_TOKEN` / `BOOKING_GATEWAY_REFRESH_TOKEN` | unset (global seed) |
//! | `BOOKING_GATEWAY_STORE_PATH` | unset (in-memory store) |

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScope, ProviderId, TokenSecret},
	booking::{BookingDefaults, DEFAULT_CANCEL_STATUS, DEFAULT_CREATE_STATUS},
	client::GlobalFallback,
	error::ConfigError,
	gateway::DEFAULT_DIRECT_CHANNEL_MARKER,
	upstream::{AuthScheme, RefreshMethod, UpstreamDescriptor, UpstreamQuirks},
};
#[cfg(feature = "reqwest")]
use crate::{
	client::TokenRefreshClient,
	exchange::ReqwestTransportErrorMapper,
	gateway::{BookingGateway, ReqwestBookingGateway},
	http::ReqwestHttpClient,
	store::{CredentialStore, FileStore, MemoryStore},
	upstream::{DefaultUpstreamStrategy, UpstreamStrategy},
};

const PREFIX: &str = "BOOKING_GATEWAY_";
const DEFAULT_PROVIDER_ID: &str = "upstream";

/// Everything needed to assemble a [`BookingGateway`](crate::gateway::BookingGateway).
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// Validated upstream descriptor.
	pub descriptor: UpstreamDescriptor,
	/// Normalization fallbacks.
	pub defaults: BookingDefaults,
	/// Case-insensitive marker of the direct-booking channel.
	pub direct_channel_marker: String,
	/// Total bound for each upstream HTTP call.
	pub request_timeout: Duration,
	/// Bound for each credential store call.
	pub store_timeout: Duration,
	/// Fallback for the global scope when nothing is stored.
	pub global_fallback: Option<GlobalFallback>,
	/// Global credential written on startup when the store has none.
	pub seed_credential: Option<Credential>,
	/// JSON snapshot path for a durable store; in-memory when unset.
	pub store_path: Option<PathBuf>,
}
impl GatewayConfig {
	/// Default bound for upstream HTTP calls.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);
	/// Default bound for credential store calls.
	pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::seconds(5);

	/// Returns a builder with defaults for everything but the descriptor.
	pub fn builder(descriptor: UpstreamDescriptor) -> GatewayConfigBuilder {
		GatewayConfigBuilder {
			config: Self {
				descriptor,
				defaults: BookingDefaults::default(),
				direct_channel_marker: DEFAULT_DIRECT_CHANNEL_MARKER.into(),
				request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
				store_timeout: Self::DEFAULT_STORE_TIMEOUT,
				global_fallback: None,
				seed_credential: None,
				store_path: None,
			},
		}
	}

	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(std::env::vars())
	}

	/// Reads the configuration from `(name, value)` pairs; names without the
	/// `BOOKING_GATEWAY_` prefix are ignored.
	pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		let vars = Vars(
			vars.into_iter()
				.filter(|(key, _)| key.as_ref().starts_with(PREFIX))
				.map(|(key, value)| (key.as_ref().to_owned(), value.into()))
				.collect(),
		);
		let mut builder = Self::builder(read_descriptor(&vars)?).defaults(BookingDefaults {
			property_id: vars.parse("BOOKING_GATEWAY_DEFAULT_PROPERTY_ID")?,
			room_id: vars.parse("BOOKING_GATEWAY_DEFAULT_ROOM_ID")?,
			create_status: vars
				.get("BOOKING_GATEWAY_CREATE_STATUS")
				.unwrap_or(DEFAULT_CREATE_STATUS)
				.to_owned(),
			cancel_status: vars
				.get("BOOKING_GATEWAY_CANCEL_STATUS")
				.unwrap_or(DEFAULT_CANCEL_STATUS)
				.to_owned(),
		});

		if let Some(marker) = vars.get("BOOKING_GATEWAY_DIRECT_CHANNEL") {
			builder = builder.direct_channel_marker(marker);
		}
		if let Some(secs) = vars.parse::<u32>("BOOKING_GATEWAY_REQUEST_TIMEOUT_SECS")? {
			builder = builder.request_timeout(Duration::seconds(i64::from(secs)));
		}
		if let Some(millis) = vars.parse::<u32>("BOOKING_GATEWAY_STORE_TIMEOUT_MS")? {
			builder = builder.store_timeout(Duration::milliseconds(i64::from(millis)));
		}

		match vars.get("BOOKING_GATEWAY_GLOBAL_FALLBACK").unwrap_or("none") {
			"none" => {},
			"anonymous" => builder = builder.global_fallback(GlobalFallback::Anonymous),
			"static" => {
				let token = vars.require("BOOKING_GATEWAY_STATIC_TOKEN")?;

				builder = builder.global_fallback(GlobalFallback::StaticToken(TokenSecret::new(token)));
			},
			other =>
				return Err(invalid(
					"BOOKING_GATEWAY_GLOBAL_FALLBACK",
					format!("unknown fallback `{other}`"),
				)),
		}

		if let Some(access) = vars.get("BOOKING_GATEWAY_ACCESS_TOKEN") {
			let credential = Credential::builder(CredentialScope::Global)
				.access_token(access)
				.refresh_secret(vars.get("BOOKING_GATEWAY_REFRESH_TOKEN").map(TokenSecret::new))
				.build()?;

			builder = builder.seed_credential(credential);
		}
		if let Some(path) = vars.get("BOOKING_GATEWAY_STORE_PATH") {
			builder = builder.store_path(path);
		}

		builder.build()
	}

	/// Checks cross-field constraints the individual setters cannot.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.direct_channel_marker.trim().is_empty() {
			return Err(ConfigError::InvalidVar {
				name: "BOOKING_GATEWAY_DIRECT_CHANNEL",
				reason: "the marker cannot be empty".into(),
			});
		}
		if self.request_timeout <= Duration::ZERO {
			return Err(ConfigError::InvalidVar {
				name: "BOOKING_GATEWAY_REQUEST_TIMEOUT_SECS",
				reason: "the timeout must be positive".into(),
			});
		}
		if self.store_timeout <= Duration::ZERO {
			return Err(ConfigError::InvalidVar {
				name: "BOOKING_GATEWAY_STORE_TIMEOUT_MS",
				reason: "the timeout must be positive".into(),
			});
		}

		Ok(())
	}

	/// Builds the reqwest-backed gateway: opens the store, seeds the global credential if
	/// the store has none, and applies every timeout.
	#[cfg(feature = "reqwest")]
	pub async fn connect(self) -> Result<ReqwestBookingGateway> {
		self.validate().map_err(config_error)?;

		let store: Arc<dyn CredentialStore> = match &self.store_path {
			Some(path) => Arc::new(FileStore::open(path)?),
			None => Arc::new(MemoryStore::default()),
		};
		let http_client = ReqwestHttpClient::with_timeout(self.request_timeout).map_err(config_error)?;
		let strategy: Arc<dyn UpstreamStrategy> = Arc::new(DefaultUpstreamStrategy);
		let mut client = TokenRefreshClient::with_http_client(
			store,
			self.descriptor,
			strategy,
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_store_timeout(self.store_timeout);

		if let Some(fallback) = self.global_fallback {
			client = client.with_global_fallback(fallback);
		}
		if let Some(seed) = self.seed_credential {
			let existing = client.bounded("get", client.store.get(&seed.scope)).await?;

			if existing.is_none() {
				client.bounded("put", client.store.put(seed)).await?;
			}
		}

		Ok(BookingGateway::new(client, self.defaults)
			.with_direct_channel_marker(self.direct_channel_marker))
	}
}

/// Validating builder for [`GatewayConfig`].
#[derive(Clone, Debug)]
pub struct GatewayConfigBuilder {
	config: GatewayConfig,
}
impl GatewayConfigBuilder {
	/// Sets the normalization fallbacks.
	pub fn defaults(mut self, defaults: BookingDefaults) -> Self {
		self.config.defaults = defaults;

		self
	}

	/// Sets the direct-booking channel marker.
	pub fn direct_channel_marker(mut self, marker: impl Into<String>) -> Self {
		self.config.direct_channel_marker = marker.into();

		self
	}

	/// Sets the upstream request bound.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;

		self
	}

	/// Sets the credential store call bound.
	pub fn store_timeout(mut self, timeout: Duration) -> Self {
		self.config.store_timeout = timeout;

		self
	}

	/// Sets the global-scope fallback.
	pub fn global_fallback(mut self, fallback: GlobalFallback) -> Self {
		self.config.global_fallback = Some(fallback);

		self
	}

	/// Sets the global credential written on startup when the store has none.
	pub fn seed_credential(mut self, credential: Credential) -> Self {
		self.config.seed_credential = Some(credential);

		self
	}

	/// Persists credentials to a JSON snapshot at `path`.
	pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.config.store_path = Some(path.into());

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

#[cfg(feature = "reqwest")]
fn config_error(err: ConfigError) -> Error {
	Error::validation(err.to_string(), serde_json::Value::Null)
}

fn read_descriptor(vars: &Vars) -> Result<UpstreamDescriptor, ConfigError> {
	let id = ProviderId::new(vars.get("BOOKING_GATEWAY_PROVIDER_ID").unwrap_or(DEFAULT_PROVIDER_ID))
		.map_err(|e| invalid("BOOKING_GATEWAY_PROVIDER_ID", e.to_string()))?;
	let api_base = vars.url("BOOKING_GATEWAY_API_BASE")?;
	let token = vars.url("BOOKING_GATEWAY_TOKEN_URL")?;
	let auth_scheme = match vars.get("BOOKING_GATEWAY_AUTH_HEADER") {
		Some(name) => AuthScheme::Header { name: name.to_owned() },
		None => AuthScheme::Bearer,
	};
	let refresh_method = match vars.get("BOOKING_GATEWAY_REFRESH_METHOD").unwrap_or("header") {
		"header" => match vars.get("BOOKING_GATEWAY_REFRESH_HEADER") {
			Some(header) => RefreshMethod::HeaderExchange { header: header.to_owned() },
			None => RefreshMethod::default(),
		},
		"oauth2" => RefreshMethod::OAuth2 {
			client_id: vars.require("BOOKING_GATEWAY_CLIENT_ID")?,
			client_secret: vars.get("BOOKING_GATEWAY_CLIENT_SECRET").map(TokenSecret::new),
		},
		other =>
			return Err(invalid(
				"BOOKING_GATEWAY_REFRESH_METHOD",
				format!("unknown refresh method `{other}`"),
			)),
	};
	let quirks = UpstreamQuirks {
		forbidden_is_unauthorized: vars
			.parse("BOOKING_GATEWAY_FORBIDDEN_IS_UNAUTHORIZED")?
			.unwrap_or(false),
		..UpstreamQuirks::default()
	};
	let mut builder = UpstreamDescriptor::builder(id)
		.api_base(api_base)
		.token_endpoint(token)
		.auth_scheme(auth_scheme)
		.refresh_method(refresh_method)
		.quirks(quirks);

	if let Some(path) = vars.get("BOOKING_GATEWAY_BOOKINGS_PATH") {
		builder = builder.bookings_path(path);
	}

	Ok(builder.build()?)
}

struct Vars(HashMap<String, String>);
impl Vars {
	fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
	}

	fn require(&self, name: &'static str) -> Result<String, ConfigError> {
		self.get(name).map(str::to_owned).ok_or(ConfigError::MissingVar { name })
	}

	fn parse<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: Display,
	{
		self.get(name)
			.map(|raw| raw.trim().parse::<T>().map_err(|e| invalid(name, e.to_string())))
			.transpose()
	}

	fn url(&self, name: &'static str) -> Result<Url, ConfigError> {
		let raw = self.get(name).ok_or(ConfigError::MissingVar { name })?;

		Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
	}
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
	ConfigError::InvalidVar { name, reason }
}
