//! Booking gateway facade: the only entry point dashboard handlers call.
//!
//! Each operation resolves the credential scope, normalizes its payload, executes the call
//! through [`TokenRefreshClient`], classifies the response, and returns a
//! [`GatewayResult`]. Failures are logged with their kind and redacted details before they
//! are handed back.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{CredentialScope, TenantId},
	booking::{
		self, Ack, BookingDefaults, BookingQuery, BookingReceipt, NormalizedBooking, RawBooking,
		Reservation,
	},
	classify::{self, Classified},
	client::{TokenRefreshClient, UpstreamRequest},
	error::{GatewayFailure, GatewayResult},
	exchange::TransportErrorMapper,
	http::UpstreamHttpClient,
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")]
use crate::{exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

/// Marker a booking's source channel must contain to be cancellable here.
pub const DEFAULT_DIRECT_CHANNEL_MARKER: &str = "direct";

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport stack.
pub type ReqwestBookingGateway = BookingGateway<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Facade over the upstream reservation API.
#[derive(Clone)]
pub struct BookingGateway<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Refresh-aware client used for every upstream call.
	pub client: TokenRefreshClient<C, M>,
	/// Fallbacks applied while normalizing payloads.
	pub defaults: BookingDefaults,
	/// Case-insensitive marker identifying the direct-booking channel.
	pub direct_channel_marker: String,
}
impl<C, M> BookingGateway<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a gateway with the default direct-channel marker.
	pub fn new(client: TokenRefreshClient<C, M>, defaults: BookingDefaults) -> Self {
		Self { client, defaults, direct_channel_marker: DEFAULT_DIRECT_CHANNEL_MARKER.into() }
	}

	/// Overrides the direct-channel marker.
	///
	/// Surrounding whitespace is trimmed; a blank marker is ignored and the previous one kept.
	pub fn with_direct_channel_marker(mut self, marker: impl Into<String>) -> Self {
		let marker = marker.into();
		let trimmed = marker.trim();

		if !trimmed.is_empty() {
			self.direct_channel_marker = trimmed.to_owned();
		}

		self
	}

	/// Lists bookings matching `query`.
	pub async fn list_bookings(
		&self,
		tenant: Option<&TenantId>,
		query: &BookingQuery,
	) -> GatewayResult<Vec<Reservation>> {
		const OP: GatewayOp = GatewayOp::ListBookings;

		let span = OpSpan::new(OP, "list_bookings");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let scope = CredentialScope::resolve(tenant.cloned());
				let mut url = self.client.descriptor.endpoints.bookings.clone();

				url.query_pairs_mut().extend_pairs(query.to_pairs(&self.defaults)?);

				let classified = self.call(&scope, UpstreamRequest::get(url)).await?;

				decode_reservations(classified.items)
			})
			.await;

		finish(OP, result)
	}

	/// Creates a booking from dashboard input.
	pub async fn create_booking(
		&self,
		tenant: Option<&TenantId>,
		raw: &RawBooking,
	) -> GatewayResult<BookingReceipt> {
		const OP: GatewayOp = GatewayOp::CreateBooking;

		let span = OpSpan::new(OP, "create_booking");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let booking = booking::normalize_create(raw, &self.defaults)?;
				let classified = self.write(tenant, booking).await?;

				Ok(receipt(classified, None))
			})
			.await;

		finish(OP, result)
	}

	/// Applies `patch` to booking `id`.
	pub async fn update_booking(
		&self,
		tenant: Option<&TenantId>,
		id: u64,
		patch: &RawBooking,
	) -> GatewayResult<BookingReceipt> {
		const OP: GatewayOp = GatewayOp::UpdateBooking;

		let span = OpSpan::new(OP, "update_booking");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let booking = booking::normalize_update(id, patch, &self.defaults)?;
				let classified = self.write(tenant, booking).await?;

				Ok(receipt(classified, Some(id)))
			})
			.await;

		finish(OP, result)
	}

	/// Cancels booking `id` if it came through the direct-booking channel.
	///
	/// Bookings from any other channel (or with no recorded channel) are refused with
	/// [`Error::Permission`] before any network call.
	pub async fn cancel_booking(
		&self,
		tenant: Option<&TenantId>,
		id: u64,
		source_channel: Option<&str>,
		property_id: Option<u64>,
		room_id: Option<u64>,
	) -> GatewayResult<Ack> {
		const OP: GatewayOp = GatewayOp::CancelBooking;

		let span = OpSpan::new(OP, "cancel_booking");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				if !self.is_direct_channel(source_channel) {
					return Err(Error::permission(format!(
						"only bookings from the {} channel can be cancelled here",
						self.direct_channel_marker
					)));
				}

				let (property_id, room_id) =
					booking::cancel_target(property_id, room_id, &self.defaults)?;
				let booking =
					booking::normalize_cancel(id, property_id, room_id, &self.defaults.cancel_status);

				self.write(tenant, booking).await?;

				Ok(Ack { id })
			})
			.await;

		finish(OP, result)
	}

	/// Returns `true` when `source_channel` contains the direct-channel marker
	/// (case-insensitive).
	///
	/// A blank marker matches nothing.
	pub fn is_direct_channel(&self, source_channel: Option<&str>) -> bool {
		let marker = self.direct_channel_marker.trim().to_lowercase();

		if marker.is_empty() {
			return false;
		}

		source_channel.is_some_and(|channel| channel.to_lowercase().contains(&marker))
	}

	async fn write(
		&self,
		tenant: Option<&TenantId>,
		booking: NormalizedBooking,
	) -> Result<Classified> {
		let scope = CredentialScope::resolve(tenant.cloned());
		let body = serde_json::to_value(vec![booking]).map_err(|e| {
			Error::validation(
				"booking could not be serialized",
				serde_json::json!({ "cause": e.to_string() }),
			)
		})?;
		let url = self.client.descriptor.endpoints.bookings.clone();
		let classified = self.call(&scope, UpstreamRequest::post_json(url, body)).await?;

		if classified.items.is_empty() {
			return Err(Error::unexpected_shape(classified.payload));
		}

		Ok(classified)
	}

	async fn call(&self, scope: &CredentialScope, request: UpstreamRequest) -> Result<Classified> {
		let response = self.client.execute(scope, &request).await?;

		classify::classify_response(&response)
	}
}
impl<C, M> Debug for BookingGateway<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BookingGateway")
			.field("client", &self.client)
			.field("defaults", &self.defaults)
			.field("direct_channel_marker", &self.direct_channel_marker)
			.finish()
	}
}

fn finish<T>(op: GatewayOp, result: Result<T>) -> GatewayResult<T> {
	match result {
		Ok(value) => {
			obs::record_op_outcome(op, OpOutcome::Success);

			Ok(value)
		},
		Err(err) => {
			let failure = GatewayFailure::from(err);

			obs::record_op_outcome(op, OpOutcome::Failure);
			obs::record_failure_event(op, failure.kind, &failure.message, &failure.details);

			Err(failure)
		},
	}
}

fn decode_reservations(items: Vec<Value>) -> Result<Vec<Reservation>> {
	let value = Value::Array(items);
	let decoded: std::result::Result<Vec<Reservation>, _> = serde_path_to_error::deserialize(&value);

	decoded.map_err(|e| Error::UnexpectedShape {
		message: Error::UNRECOGNIZED_RESPONSE.into(),
		details: serde_json::json!({ "path": e.path().to_string(), "cause": e.inner().to_string() }),
	})
}

fn receipt(classified: Classified, fallback_id: Option<u64>) -> BookingReceipt {
	let result = classified.items.into_iter().next().unwrap_or(Value::Null);
	let id = reported_id(&result).or(fallback_id);

	BookingReceipt { id, result }
}

fn reported_id(result: &Value) -> Option<u64> {
	const KEYS: [&str; 3] = ["id", "bookId", "bookingId"];

	let direct = |value: &Value| {
		KEYS.iter().find_map(|key| value.get(*key).and_then(booking::coerce_u64))
	};

	direct(result).or_else(|| result.get("new").and_then(&direct))
}
