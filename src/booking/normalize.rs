//! Conversion from dashboard input to upstream request objects.
//!
//! Every check here runs before any network call; problems are reported together as one
//! [`Error::Validation`] whose message joins the individual issues with `"; "`.

// crates.io
use serde_json::{Number, Value, json};
use time::{Date, macros::format_description};
// self
use crate::{
	_prelude::*,
	booking::{
		BookingDefaults, InvoiceItem, NormalizedBooking, RawBooking, RawInvoiceItem,
		amount_number, coerce_f64, coerce_u64,
	},
};

/// Normalizes a create payload.
///
/// `propertyId`, `roomId`, both dates, and both guest names are required (identifiers fall
/// back to `defaults`). Status defaults to [`BookingDefaults::create_status`]. The price is
/// the explicit price when non-zero, otherwise the sum of invoice amounts, and is omitted
/// when that sum is zero.
pub fn normalize_create(raw: &RawBooking, defaults: &BookingDefaults) -> Result<NormalizedBooking> {
	let mut issues = Issues::default();
	let property_id = issues.id("propertyId", raw.property_id.as_ref()).or(defaults.property_id);
	let room_id = issues.id("roomId", raw.room_id.as_ref()).or(defaults.room_id);
	let (arrival, departure) = issues.stay(raw.arrival.as_deref(), raw.departure.as_deref());
	let num_adult = issues.count("numAdult", raw.num_adult.as_ref());
	let num_child = issues.count("numChild", raw.num_child.as_ref());

	issues.require("propertyId", property_id.is_some());
	issues.require("roomId", room_id.is_some());
	issues.require("arrival", arrival.is_some());
	issues.require("departure", departure.is_some());
	issues.require("firstName", is_present(raw.first_name.as_deref()));
	issues.require("lastName", is_present(raw.last_name.as_deref()));
	issues.finish()?;

	let status =
		raw.status.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(&defaults.create_status);

	Ok(NormalizedBooking::builder()
		.property_id(property_id)
		.room_id(room_id)
		.stay(arrival, departure)
		.guest(raw.first_name.as_deref(), raw.last_name.as_deref())
		.status(Some(status))
		.contact(raw.email.as_deref(), raw.phone.as_deref(), raw.mobile.as_deref())
		.postal(
			raw.address.as_deref(),
			raw.city.as_deref(),
			raw.postcode.as_deref(),
			raw.country.as_deref(),
		)
		.occupancy(num_adult, num_child)
		.notes(raw.notes.as_deref())
		.price(derive_price(raw.price.as_ref(), &raw.invoice))
		.invoice_items(invoice_items(&raw.invoice))
		.build())
}

/// Normalizes an update patch for booking `id`.
///
/// Only fields present on the patch are emitted, except `propertyId` and `roomId`, which are
/// always sent (patch values, else configured defaults). `notes: ""` is sent as-is.
pub fn normalize_update(
	id: u64,
	patch: &RawBooking,
	defaults: &BookingDefaults,
) -> Result<NormalizedBooking> {
	let mut issues = Issues::default();
	let property_id = issues.id("propertyId", patch.property_id.as_ref()).or(defaults.property_id);
	let room_id = issues.id("roomId", patch.room_id.as_ref()).or(defaults.room_id);
	let (arrival, departure) = issues.stay(patch.arrival.as_deref(), patch.departure.as_deref());
	let num_adult = issues.count("numAdult", patch.num_adult.as_ref());
	let num_child = issues.count("numChild", patch.num_child.as_ref());

	issues.require("propertyId", property_id.is_some());
	issues.require("roomId", room_id.is_some());
	issues.finish()?;

	let price = patch.price.as_ref().and_then(coerce_f64).and_then(amount_number);

	Ok(NormalizedBooking::builder()
		.id(id)
		.property_id(property_id)
		.room_id(room_id)
		.stay(arrival, departure)
		.guest(patch.first_name.as_deref(), patch.last_name.as_deref())
		.status(patch.status.as_deref())
		.contact(patch.email.as_deref(), patch.phone.as_deref(), patch.mobile.as_deref())
		.postal(
			patch.address.as_deref(),
			patch.city.as_deref(),
			patch.postcode.as_deref(),
			patch.country.as_deref(),
		)
		.occupancy(num_adult, num_child)
		.notes(patch.notes.as_deref())
		.price(price)
		.build())
}

/// Normalizes a cancellation of booking `id`.
pub fn normalize_cancel(
	id: u64,
	property_id: u64,
	room_id: u64,
	cancel_status: &str,
) -> NormalizedBooking {
	NormalizedBooking::builder()
		.id(id)
		.property_id(Some(property_id))
		.room_id(Some(room_id))
		.status(Some(cancel_status))
		.build()
}

/// Resolves the property and room a cancellation targets, falling back to `defaults`.
pub fn cancel_target(
	property_id: Option<u64>,
	room_id: Option<u64>,
	defaults: &BookingDefaults,
) -> Result<(u64, u64)> {
	let mut issues = Issues::default();
	let property_id = property_id.or(defaults.property_id);
	let room_id = room_id.or(defaults.room_id);

	issues.require("propertyId", property_id.is_some());
	issues.require("roomId", room_id.is_some());
	issues.finish()?;

	match (property_id, room_id) {
		(Some(property_id), Some(room_id)) => Ok((property_id, room_id)),
		_ => Err(Error::validation("propertyId and roomId are required", Value::Null)),
	}
}

/// Derives the booking price: explicit non-zero price first, else the invoice total.
///
/// Non-numeric amounts contribute zero. Returns `None` when the result is zero.
pub fn derive_price(explicit: Option<&Value>, invoice: &[RawInvoiceItem]) -> Option<Number> {
	let total = explicit.and_then(coerce_f64).filter(|price| *price != 0.0).unwrap_or_else(|| {
		invoice.iter().filter_map(|item| item.amount.as_ref().and_then(coerce_f64)).sum()
	});

	amount_number(total).filter(|n| n.as_f64().is_some_and(|v| v != 0.0))
}

/// Parses a `YYYY-MM-DD` date and returns it in canonical form.
pub fn canonical_date(field: &'static str, raw: &str) -> Result<String> {
	parse_date(raw).map(format_date).ok_or_else(|| {
		Error::validation(
			format!("{field} must be a YYYY-MM-DD date"),
			json!({ "field": field, "value": raw }),
		)
	})
}

fn invoice_items(invoice: &[RawInvoiceItem]) -> Vec<InvoiceItem> {
	invoice
		.iter()
		.filter_map(|item| {
			let amount = item.amount.as_ref().and_then(coerce_f64).and_then(amount_number)?;
			let mut line = InvoiceItem::charge(amount);

			line.description =
				item.description.as_deref().map(str::trim).filter(|d| !d.is_empty()).map(str::to_owned);
			line.qty = item.qty.as_ref().and_then(coerce_f64).and_then(amount_number);

			Some(line)
		})
		.collect()
}

fn parse_date(raw: &str) -> Option<Date> {
	Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

fn format_date(date: Date) -> String {
	format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

fn is_present(value: Option<&str>) -> bool {
	value.is_some_and(|v| !v.trim().is_empty())
}

fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.trim().is_empty(),
		_ => false,
	}
}

#[derive(Default)]
struct Issues(Vec<(&'static str, String)>);
impl Issues {
	fn push(&mut self, field: &'static str, message: String) {
		self.0.push((field, message));
	}

	fn require(&mut self, field: &'static str, present: bool) {
		if !present && !self.0.iter().any(|(f, _)| *f == field) {
			self.push(field, format!("{field} is required"));
		}
	}

	fn id(&mut self, field: &'static str, value: Option<&Value>) -> Option<u64> {
		let value = value.filter(|v| !is_blank(v))?;
		let id = coerce_u64(value);

		if id.is_none() {
			self.push(field, format!("{field} must be a numeric identifier"));
		}

		id
	}

	fn count(&mut self, field: &'static str, value: Option<&Value>) -> Option<u64> {
		let value = value.filter(|v| !is_blank(v))?;
		let count = coerce_u64(value);

		if count.is_none() {
			self.push(field, format!("{field} must be a non-negative whole number"));
		}

		count
	}

	fn date(&mut self, field: &'static str, value: Option<&str>) -> Option<Date> {
		let value = value.filter(|v| !v.trim().is_empty())?;
		let date = parse_date(value);

		if date.is_none() {
			self.push(field, format!("{field} must be a YYYY-MM-DD date"));
		}

		date
	}

	fn stay(
		&mut self,
		arrival: Option<&str>,
		departure: Option<&str>,
	) -> (Option<String>, Option<String>) {
		let arrival = self.date("arrival", arrival);
		let departure = self.date("departure", departure);

		if matches!((arrival, departure), (Some(from), Some(to)) if to <= from) {
			self.push("departure", "departure must be after arrival".into());
		}

		(arrival.map(format_date), departure.map(format_date))
	}

	fn finish(self) -> Result<()> {
		if self.0.is_empty() {
			return Ok(());
		}

		let message = self.0.iter().map(|(_, m)| m.as_str()).collect::<Vec<_>>().join("; ");
		let fields = self
			.0
			.iter()
			.map(|(field, message)| json!({ "field": field, "message": message }))
			.collect::<Vec<_>>();

		Err(Error::validation(message, json!({ "fields": fields })))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn raw(value: Value) -> RawBooking {
		serde_json::from_value(value).expect("Raw booking fixture should deserialize.")
	}

	fn defaults() -> BookingDefaults {
		BookingDefaults { property_id: Some(17), room_id: Some(42), ..BookingDefaults::default() }
	}

	#[test]
	fn create_sums_invoice_when_price_is_missing() {
		let booking = normalize_create(
			&raw(json!({
				"arrival": "2026-11-02",
				"departure": "2026-11-05",
				"firstName": "Ada",
				"lastName": "Lovelace",
				"invoice": [{ "amount": 300 }, { "amount": "50", "description": "Cleaning" }],
			})),
			&defaults(),
		)
		.expect("Create payload should normalize.");
		let payload = serde_json::to_value(&booking).expect("Booking should serialize.");

		assert_eq!(payload["price"], json!(350));
		assert_eq!(payload["status"], "confirmed");
		assert_eq!(payload["propertyId"], 17);
		assert_eq!(
			payload["invoiceItems"],
			json!([
				{ "type": "charge", "amount": 300 },
				{ "type": "charge", "description": "Cleaning", "amount": 50 },
			])
		);
		assert!(payload.get("email").is_none());
		assert!(payload.get("notes").is_none());
	}

	#[test]
	fn explicit_price_wins_and_zero_is_omitted() {
		let invoice = vec![RawInvoiceItem { amount: Some(json!(80)), ..RawInvoiceItem::default() }];

		assert_eq!(derive_price(Some(&json!("120.5")), &invoice), Number::from_f64(120.5));
		assert_eq!(derive_price(Some(&json!(0)), &invoice), Some(Number::from(80)));
		assert_eq!(derive_price(None, &[]), None);

		let garbage = vec![RawInvoiceItem { amount: Some(json!("n/a")), ..RawInvoiceItem::default() }];

		assert_eq!(derive_price(None, &garbage), None);
	}

	#[test]
	fn create_reports_every_issue_at_once() {
		let err = normalize_create(
			&raw(json!({
				"propertyId": "seventeen",
				"arrival": "2026-11-05",
				"departure": "2026-11-02",
				"firstName": "Ada",
			})),
			&BookingDefaults::default(),
		)
		.expect_err("Invalid payload must be rejected.");

		assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
		assert_eq!(
			err.to_string(),
			"propertyId must be a numeric identifier; departure must be after arrival; roomId is required; lastName is required"
		);
	}

	#[test]
	fn update_sends_empty_notes_and_falls_back_to_defaults() {
		let booking = normalize_update(9001, &raw(json!({ "notes": "", "email": "" })), &defaults())
			.expect("Patch should normalize.");
		let payload = serde_json::to_value(&booking).expect("Booking should serialize.");

		assert_eq!(payload, json!({ "id": 9001, "propertyId": 17, "roomId": 42, "notes": "" }));
	}

	#[test]
	fn update_without_property_or_room_fails_locally() {
		let patch = raw(json!({ "notes": "late arrival" }));
		let err = normalize_update(9001, &patch, &BookingDefaults::default())
			.expect_err("Missing identifiers must be rejected.");

		assert_eq!(err.to_string(), "propertyId is required; roomId is required");
	}

	#[test]
	fn cancel_sets_status_string() {
		let payload = serde_json::to_value(normalize_cancel(5, 17, 42, "cancelled"))
			.expect("Booking should serialize.");

		assert_eq!(payload, json!({ "id": 5, "propertyId": 17, "roomId": 42, "status": "cancelled" }));
		assert!(cancel_target(None, Some(42), &BookingDefaults::default()).is_err());
		assert_eq!(cancel_target(None, None, &defaults()).expect("Defaults should apply."), (17, 42));
	}

	#[test]
	fn canonical_dates_are_zero_padded() {
		assert_eq!(canonical_date("arrival", " 2026-01-09 ").expect("Date should parse."), "2026-01-09");
		assert!(canonical_date("arrival", "2026-1-9").is_err());
	}
}
