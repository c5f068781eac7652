//! Upstream-shaped booking request and its builder.

// crates.io
use serde_json::Number;
// self
use crate::_prelude::*;

const INVOICE_CHARGE: &str = "charge";

/// Booking object in the shape the upstream `POST bookings` endpoint expects.
///
/// Absent optional fields are omitted from the JSON entirely. Which fields are required
/// depends on the operation, so this type only carries values; the functions in
/// [`normalize`](crate::booking::normalize) decide what must be present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBooking {
	/// Target booking for updates and cancellations.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	/// Property identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub property_id: Option<u64>,
	/// Room identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub room_id: Option<u64>,
	/// Arrival date, `YYYY-MM-DD`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub arrival: Option<String>,
	/// Departure date, `YYYY-MM-DD`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub departure: Option<String>,
	/// Guest first name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	/// Guest last name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	/// Booking status string.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	/// Guest email.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Guest phone.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	/// Guest mobile.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mobile: Option<String>,
	/// Street address.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	/// City.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	/// Postal code.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub postcode: Option<String>,
	/// Country.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
	/// Adult guests.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub num_adult: Option<u64>,
	/// Child guests.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub num_child: Option<u64>,
	/// Notes; an empty string is sent verbatim to clear the upstream value.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Total price; never zero.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub price: Option<Number>,
	/// Invoice lines (creates only).
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub invoice_items: Vec<InvoiceItem>,
}
impl NormalizedBooking {
	/// Returns a builder with every field unset.
	pub fn builder() -> NormalizedBookingBuilder {
		NormalizedBookingBuilder::default()
	}
}

/// Invoice line in upstream form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
	/// Line type; always `charge` for dashboard-entered lines.
	#[serde(rename = "type")]
	pub kind: String,
	/// Line description.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Quantity.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub qty: Option<Number>,
	/// Line amount.
	pub amount: Number,
}
impl InvoiceItem {
	/// Creates a charge line.
	pub fn charge(amount: Number) -> Self {
		Self { kind: INVOICE_CHARGE.into(), description: None, qty: None, amount }
	}
}

/// Explicit builder for [`NormalizedBooking`].
///
/// Text setters take `Option<&str>` and drop `None` as well as empty or whitespace-only
/// strings, so the upstream never receives a blank value it would store. `notes` is the
/// exception: [`NormalizedBookingBuilder::notes`] keeps `""` so a patch can clear it.
/// [`NormalizedBookingBuilder::price`] drops zero.
#[derive(Clone, Debug, Default)]
pub struct NormalizedBookingBuilder {
	booking: NormalizedBooking,
}
impl NormalizedBookingBuilder {
	/// Sets the target booking identifier.
	pub fn id(mut self, id: u64) -> Self {
		self.booking.id = Some(id);

		self
	}

	/// Sets the property identifier.
	pub fn property_id(mut self, id: Option<u64>) -> Self {
		self.booking.property_id = id;

		self
	}

	/// Sets the room identifier.
	pub fn room_id(mut self, id: Option<u64>) -> Self {
		self.booking.room_id = id;

		self
	}

	/// Sets the stay dates (already canonical `YYYY-MM-DD`).
	pub fn stay(mut self, arrival: Option<String>, departure: Option<String>) -> Self {
		self.booking.arrival = arrival;
		self.booking.departure = departure;

		self
	}

	/// Sets the guest name.
	pub fn guest(mut self, first_name: Option<&str>, last_name: Option<&str>) -> Self {
		self.booking.first_name = present(first_name);
		self.booking.last_name = present(last_name);

		self
	}

	/// Sets the status string.
	pub fn status(mut self, status: Option<&str>) -> Self {
		self.booking.status = present(status);

		self
	}

	/// Sets the contact fields.
	pub fn contact(
		mut self,
		email: Option<&str>,
		phone: Option<&str>,
		mobile: Option<&str>,
	) -> Self {
		self.booking.email = present(email);
		self.booking.phone = present(phone);
		self.booking.mobile = present(mobile);

		self
	}

	/// Sets the postal address fields.
	pub fn postal(
		mut self,
		address: Option<&str>,
		city: Option<&str>,
		postcode: Option<&str>,
		country: Option<&str>,
	) -> Self {
		self.booking.address = present(address);
		self.booking.city = present(city);
		self.booking.postcode = present(postcode);
		self.booking.country = present(country);

		self
	}

	/// Sets the occupancy.
	pub fn occupancy(mut self, adults: Option<u64>, children: Option<u64>) -> Self {
		self.booking.num_adult = adults;
		self.booking.num_child = children;

		self
	}

	/// Sets the notes, keeping an empty string.
	pub fn notes(mut self, notes: Option<&str>) -> Self {
		self.booking.notes = notes.map(str::to_owned);

		self
	}

	/// Sets the price, dropping zero.
	pub fn price(mut self, price: Option<Number>) -> Self {
		self.booking.price = price.filter(|n| n.as_f64().is_some_and(|v| v != 0.0));

		self
	}

	/// Sets the invoice lines.
	pub fn invoice_items(mut self, items: Vec<InvoiceItem>) -> Self {
		self.booking.invoice_items = items;

		self
	}

	/// Returns the assembled booking.
	pub fn build(self) -> NormalizedBooking {
		self.booking
	}
}

fn present(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn builder_omits_blank_fields_but_keeps_empty_notes() {
		let booking = NormalizedBooking::builder()
			.id(12)
			.contact(Some(" "), None, Some("+44 7700 900123"))
			.notes(Some(""))
			.price(Some(Number::from(0)))
			.build();
		let payload = serde_json::to_value(&booking).expect("Booking should serialize.");

		assert_eq!(payload, json!({ "id": 12, "mobile": "+44 7700 900123", "notes": "" }));
	}

	#[test]
	fn invoice_items_serialize_with_type_tag() {
		let item = InvoiceItem::charge(Number::from(300));

		assert_eq!(
			serde_json::to_value(&item).expect("Invoice item should serialize."),
			json!({ "type": "charge", "amount": 300 })
		);
	}
}
