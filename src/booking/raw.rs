//! Loosely typed booking input as the dashboard submits it.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Booking create payload or update patch.
///
/// Every field is optional so the same type serves creates and partial updates. Numeric
/// fields keep their raw JSON value because the dashboard sends numbers and numeric strings
/// interchangeably; the normalizer coerces them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawBooking {
	/// Property identifier.
	pub property_id: Option<Value>,
	/// Room identifier.
	pub room_id: Option<Value>,
	/// Arrival date, `YYYY-MM-DD`.
	pub arrival: Option<String>,
	/// Departure date, `YYYY-MM-DD`.
	pub departure: Option<String>,
	/// Guest first name.
	pub first_name: Option<String>,
	/// Guest last name.
	pub last_name: Option<String>,
	/// Booking status.
	pub status: Option<String>,
	/// Guest email.
	pub email: Option<String>,
	/// Guest phone.
	pub phone: Option<String>,
	/// Guest mobile.
	pub mobile: Option<String>,
	/// Street address.
	pub address: Option<String>,
	/// City.
	pub city: Option<String>,
	/// Postal code.
	pub postcode: Option<String>,
	/// Country.
	pub country: Option<String>,
	/// Adult guests.
	pub num_adult: Option<Value>,
	/// Child guests.
	pub num_child: Option<Value>,
	/// Free-form notes; `""` clears the upstream value.
	pub notes: Option<String>,
	/// Explicit total price.
	pub price: Option<Value>,
	/// Itemized invoice lines.
	#[serde(alias = "invoiceItems")]
	pub invoice: Vec<RawInvoiceItem>,
}

/// Invoice line as the dashboard submits it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInvoiceItem {
	/// Line description.
	pub description: Option<String>,
	/// Quantity.
	pub qty: Option<Value>,
	/// Line amount (number or numeric string).
	pub amount: Option<Value>,
}
