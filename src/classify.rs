//! Upstream response classification.
//!
//! The upstream reports per-item failures inconsistently, so bodies are matched against
//! known envelopes in a fixed order and the first structural match wins:
//!
//! 1. an object with a non-empty top-level `errors` array,
//! 2. an object with a `bookings` array of per-item results,
//! 3. a bare array of per-item results.
//!
//! Anything else is [`Error::UnexpectedShape`]; the classifier never guesses success.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	client::UpstreamResponse,
	error::UpstreamError,
	http::parse_retry_after,
	upstream::strategy::truncate_preview,
};

const ITEM_REJECTED: &str = "booking rejected by upstream";

/// Envelope matched by a successful [`classify`] call.
///
/// A top-level `errors` envelope always classifies as a failure, so it has no variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Envelope {
	/// `{ "bookings": [ { "success", "errors" }, ... ] }`.
	Bookings,
	/// `[ { "success"?, "errors"? }, ... ]`.
	BareArray,
}

/// Successfully classified response.
#[derive(Clone, Debug, PartialEq)]
pub struct Classified {
	/// Matched envelope.
	pub envelope: Envelope,
	/// Per-item results (booking records for list calls).
	pub items: Vec<Value>,
	/// Whole decoded body.
	pub payload: Value,
}

/// Classifies a decoded upstream body.
///
/// Failure indicators (`success: false` or a non-empty per-item `errors`) produce
/// [`Error::Validation`] with the collected messages joined by `"; "` and the raw body as
/// details.
pub fn classify(value: Value) -> Result<Classified> {
	if let Some(errors) = top_level_errors(&value) {
		let message = join_messages(errors);

		return Err(Error::validation(message, value));
	}

	let (envelope, items) = match &value {
		Value::Object(map) => match map.get("bookings") {
			Some(Value::Array(items)) => (Envelope::Bookings, items),
			_ => return Err(Error::unexpected_shape(value)),
		},
		Value::Array(items) => (Envelope::BareArray, items),
		_ => return Err(Error::unexpected_shape(value)),
	};
	let mut messages = Vec::new();
	let mut failed = false;
	let mut malformed = false;

	for item in items {
		match item_outcome(item) {
			ItemOutcome::Ok => {},
			ItemOutcome::Failed(mut item_messages) => {
				failed = true;

				messages.append(&mut item_messages);
			},
			ItemOutcome::Malformed => {
				malformed = true;

				break;
			},
		}
	}

	if malformed {
		return Err(Error::unexpected_shape(value));
	}
	if failed {
		return Err(Error::validation(messages.join("; "), value));
	}

	let items = items.clone();

	Ok(Classified { envelope, items, payload: value })
}

/// Classifies a raw upstream response, status code included.
///
/// 5xx and 429 are [`UpstreamError::Status`]; a body that is not JSON is unexpected; other
/// non-2xx statuses run the matchers, and a non-failure outcome on them is still unexpected.
pub fn classify_response(response: &UpstreamResponse) -> Result<Classified> {
	let status = response.status;

	if status.is_server_error() || status.as_u16() == 429 {
		return Err(UpstreamError::Status {
			status: status.as_u16(),
			retry_after: parse_retry_after(&response.headers),
			body: truncate_preview(&response.text()),
		}
		.into());
	}

	let value = serde_json::from_slice::<Value>(&response.body).map_err(|e| Error::UnexpectedShape {
		message: Error::UNRECOGNIZED_RESPONSE.into(),
		details: json!({
			"status": status.as_u16(),
			"body": truncate_preview(&response.text()),
			"cause": e.to_string(),
		}),
	})?;
	let classified = classify(value)?;

	if !status.is_success() {
		return Err(Error::unexpected_shape(json!({
			"status": status.as_u16(),
			"body": classified.payload,
		})));
	}

	Ok(classified)
}

enum ItemOutcome {
	Ok,
	Failed(Vec<String>),
	Malformed,
}

fn top_level_errors(value: &Value) -> Option<&[Value]> {
	match value.get("errors") {
		Some(Value::Array(errors)) if !errors.is_empty() && value.is_object() => Some(errors),
		_ => None,
	}
}

fn item_outcome(item: &Value) -> ItemOutcome {
	let Value::Object(map) = item else {
		return ItemOutcome::Malformed;
	};
	let success = match map.get("success") {
		None | Some(Value::Null) => None,
		Some(Value::Bool(flag)) => Some(*flag),
		Some(_) => return ItemOutcome::Malformed,
	};
	let errors: &[Value] = match map.get("errors") {
		None | Some(Value::Null) => &[],
		Some(Value::Array(errors)) => errors,
		Some(_) => return ItemOutcome::Malformed,
	};

	if success == Some(false) || !errors.is_empty() {
		let mut messages = errors.iter().map(entry_message).collect::<Vec<_>>();

		if messages.is_empty() {
			let message = map.get("message").and_then(Value::as_str).unwrap_or(ITEM_REJECTED);

			messages.push(message.to_owned());
		}

		ItemOutcome::Failed(messages)
	} else {
		ItemOutcome::Ok
	}
}

fn join_messages(errors: &[Value]) -> String {
	errors.iter().map(entry_message).collect::<Vec<_>>().join("; ")
}

fn entry_message(entry: &Value) -> String {
	match entry {
		Value::String(message) => message.clone(),
		Value::Object(map) => match map.get("message") {
			Some(Value::String(message)) => message.clone(),
			_ => entry.to_string(),
		},
		other => other.to_string(),
	}
}
