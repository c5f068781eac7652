//! Booking payloads: loosely typed dashboard input, the upstream request shape, and the
//! typed records handed back to callers.

pub mod normalize;
pub mod normalized;
pub mod raw;

pub use normalize::*;
pub use normalized::*;
pub use raw::*;

// crates.io
use serde::{Deserializer, de::Error as _};
use serde_json::{Map, Number, Value};
// self
use crate::_prelude::*;

/// Status sent for new bookings when the input carries none.
pub const DEFAULT_CREATE_STATUS: &str = "confirmed";
/// Status sent when cancelling a booking.
pub const DEFAULT_CANCEL_STATUS: &str = "cancelled";

/// Configured fallbacks applied while normalizing payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDefaults {
	/// Property used when the input omits `propertyId`.
	pub property_id: Option<u64>,
	/// Room used when the input omits `roomId`.
	pub room_id: Option<u64>,
	/// Status for new bookings without an explicit status.
	pub create_status: String,
	/// Status written by `cancel_booking`.
	pub cancel_status: String,
}
impl Default for BookingDefaults {
	fn default() -> Self {
		Self {
			property_id: None,
			room_id: None,
			create_status: DEFAULT_CREATE_STATUS.into(),
			cancel_status: DEFAULT_CANCEL_STATUS.into(),
		}
	}
}

/// Filters for `list_bookings`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingQuery {
	/// Property filter (falls back to [`BookingDefaults::property_id`]).
	pub property_id: Option<u64>,
	/// Room filter (falls back to [`BookingDefaults::room_id`]).
	pub room_id: Option<u64>,
	/// Earliest arrival date, `YYYY-MM-DD`.
	pub arrival_from: Option<String>,
	/// Asks the upstream to embed invoice items.
	pub include_invoice: bool,
	/// Free-form upstream filter expression.
	pub filter: Option<String>,
}
impl BookingQuery {
	/// Returns the query pairs sent to the upstream, in a stable order.
	pub fn to_pairs(&self, defaults: &BookingDefaults) -> Result<Vec<(&'static str, String)>> {
		let mut pairs = Vec::new();

		if let Some(property) = self.property_id.or(defaults.property_id) {
			pairs.push(("propertyId", property.to_string()));
		}
		if let Some(room) = self.room_id.or(defaults.room_id) {
			pairs.push(("roomId", room.to_string()));
		}
		if let Some(arrival) = self.arrival_from.as_deref().filter(|s| !s.trim().is_empty()) {
			pairs.push(("arrivalFrom", normalize::canonical_date("arrivalFrom", arrival)?));
		}

		pairs.push(("includeInvoice", self.include_invoice.to_string()));

		if let Some(filter) = self.filter.as_deref().filter(|s| !s.is_empty()) {
			pairs.push(("filter", filter.to_owned()));
		}

		Ok(pairs)
	}
}

/// Booking record returned by `list_bookings`.
///
/// Well-known fields are typed (identifiers tolerate numeric strings); everything else the
/// upstream sends is preserved in [`Reservation::extra`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
	/// Upstream booking identifier.
	#[serde(deserialize_with = "lenient_u64")]
	pub id: u64,
	/// Property the booking belongs to.
	#[serde(default, deserialize_with = "lenient_opt_u64", skip_serializing_if = "Option::is_none")]
	pub property_id: Option<u64>,
	/// Booked room.
	#[serde(default, deserialize_with = "lenient_opt_u64", skip_serializing_if = "Option::is_none")]
	pub room_id: Option<u64>,
	/// Arrival date.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arrival: Option<String>,
	/// Departure date.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub departure: Option<String>,
	/// Guest first name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	/// Guest last name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	/// Upstream status string.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	/// Source channel the booking came from.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub referer: Option<String>,
	/// Total price.
	#[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
	pub price: Option<f64>,
	/// Invoice items, verbatim (present when requested with `includeInvoice`).
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub invoice_items: Vec<Value>,
	/// Remaining upstream fields.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Outcome of a create or update call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingReceipt {
	/// Identifier of the created or modified booking, when known.
	pub id: Option<u64>,
	/// First per-item result reported by the upstream.
	pub result: Value,
}

/// Acknowledgement of a cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
	/// Cancelled booking.
	pub id: u64,
}

/// Coerces a JSON number or numeric string to `f64`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok(),
		_ => None,
	}
	.filter(|v| v.is_finite())
}

/// Coerces a JSON number or numeric string to a non-negative integer identifier.
pub fn coerce_u64(value: &Value) -> Option<u64> {
	match value {
		Value::Number(n) => n.as_u64(),
		Value::String(s) => s.trim().parse::<u64>().ok(),
		_ => None,
	}
}

/// Converts an amount to a JSON number, emitting whole values as integers.
pub(crate) fn amount_number(value: f64) -> Option<Number> {
	const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

	let rounded = (value * 100.0).round() / 100.0;

	if rounded.fract() == 0.0 && rounded.abs() < MAX_EXACT {
		Some(Number::from(rounded as i64))
	} else {
		Number::from_f64(rounded)
	}
}

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;

	coerce_u64(&value).ok_or_else(|| D::Error::custom(format!("expected an identifier, got {value}")))
}

fn lenient_opt_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
		Some(value) => coerce_u64(&value)
			.map(Some)
			.ok_or_else(|| D::Error::custom(format!("expected an identifier, got {value}"))),
	}
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(coerce_f64))
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn reservations_tolerate_string_ids_and_keep_extras() {
		let reservation: Reservation = serde_json::from_value(json!({
			"id": "4101",
			"propertyId": 17,
			"roomId": "",
			"arrival": "2026-11-02",
			"referer": "Direct booking",
			"price": "199.5",
			"numAdult": 2,
		}))
		.expect("Lenient reservation should deserialize.");

		assert_eq!(reservation.id, 4101);
		assert_eq!(reservation.property_id, Some(17));
		assert_eq!(reservation.room_id, None);
		assert_eq!(reservation.price, Some(199.5));
		assert_eq!(reservation.extra.get("numAdult"), Some(&json!(2)));
	}

	#[test]
	fn query_pairs_fall_back_to_defaults() {
		let defaults = BookingDefaults { property_id: Some(7), ..BookingDefaults::default() };
		let query = BookingQuery {
			arrival_from: Some("2026-11-01".into()),
			filter: Some("arrivals".into()),
			..BookingQuery::default()
		};
		let pairs = query.to_pairs(&defaults).expect("Query should encode.");

		assert_eq!(
			pairs,
			vec![
				("propertyId", "7".to_owned()),
				("arrivalFrom", "2026-11-01".to_owned()),
				("includeInvoice", "false".to_owned()),
				("filter", "arrivals".to_owned()),
			]
		);
		assert!(BookingQuery { arrival_from: Some("11/01/2026".into()), ..query }
			.to_pairs(&defaults)
			.is_err());
	}

	#[test]
	fn amounts_render_whole_values_as_integers() {
		assert_eq!(amount_number(350.0), Some(Number::from(350)));
		assert_eq!(amount_number(0.1 + 0.2).and_then(|n| n.as_f64()), Some(0.3));
	}
}
