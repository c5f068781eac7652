//! Token redaction for payloads that reach logs or caller-visible failure details.

// crates.io
use serde_json::Value;

/// Replacement written in place of every token-bearing value.
pub const REDACTED: &str = "<redacted>";

const SENSITIVE_KEYS: &[&str] = &[
	"token",
	"accesstoken",
	"access_token",
	"refreshtoken",
	"refresh_token",
	"authorization",
	"client_secret",
	"clientsecret",
	"password",
	"apikey",
	"api_key",
];

const SCHEMES: &[&str] = &["bearer", "basic"];

/// Returns `true` when `key` names a credential-bearing field (case-insensitive).
pub fn is_sensitive_key(key: &str) -> bool {
	let lowered = key.to_ascii_lowercase();

	SENSITIVE_KEYS.contains(&lowered.as_str())
}

/// Replaces credential fragments inside free text with [`REDACTED`].
///
/// Covers `Bearer <token>` / `Basic <token>` authorization values and `key: value` or
/// `key=value` pairs whose key is credential-bearing, quoted or not. Body previews and
/// upstream error descriptions go through this before they are logged or returned.
pub fn redact_text(text: &str) -> String {
	let mut redacted = String::with_capacity(text.len());
	let mut rest = text;

	while let Some(value_start) = next_secret_value(&rest.to_ascii_lowercase()) {
		let value_len = rest[value_start..].find(is_value_end).unwrap_or(rest.len() - value_start);

		redacted.push_str(&rest[..value_start]);

		if value_len > 0 {
			redacted.push_str(REDACTED);
		}

		rest = &rest[value_start + value_len..];
	}

	redacted.push_str(rest);

	redacted
}

/// Recursively replaces the values of credential-bearing keys with [`REDACTED`].
///
/// String leaves under other keys are scrubbed with [`redact_text`].
pub fn redact_value(value: Value) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(key, inner)| {
					if is_sensitive_key(&key) {
						(key, Value::String(REDACTED.into()))
					} else {
						(key, redact_value(inner))
					}
				})
				.collect(),
		),
		Value::Array(items) => Value::Array(items.into_iter().map(redact_value).collect()),
		Value::String(text) => Value::String(redact_text(&text)),
		other => other,
	}
}

// Byte offset (in `lowered`) where the earliest secret value starts.
fn next_secret_value(lowered: &str) -> Option<usize> {
	let mut earliest: Option<(usize, usize)> = None;

	let keys = SENSITIVE_KEYS.iter().filter(|key| **key != "authorization");

	for marker in SCHEMES.iter().chain(keys) {
		let scheme = SCHEMES.contains(marker);
		let mut from = 0;

		while let Some(offset) = lowered[from..].find(marker) {
			let start = from + offset;

			from = start + marker.len();

			if earliest.is_some_and(|(best, _)| best <= start) {
				break;
			}

			let value = if scheme {
				scheme_value(lowered, start, marker.len())
			} else {
				pair_value(lowered, start, marker.len())
			};

			if let Some(value) = value {
				earliest = Some((start, value));

				break;
			}
		}
	}

	earliest.map(|(_, value)| value)
}

fn scheme_value(lowered: &str, start: usize, len: usize) -> Option<usize> {
	if !starts_word(lowered, start) {
		return None;
	}

	let after = start + len;
	let value = skip(lowered, after, |c| c == b' ' || c == b'\t');

	(value > after).then_some(value)
}

fn pair_value(lowered: &str, start: usize, len: usize) -> Option<usize> {
	if !starts_word(lowered, start) {
		return None;
	}

	let bytes = lowered.as_bytes();
	let separator = skip(lowered, skip(lowered, start + len, is_quote), |c| c == b' ');

	if !matches!(bytes.get(separator), Some(b':' | b'=')) {
		return None;
	}

	Some(skip(lowered, skip(lowered, separator + 1, |c| c == b' '), is_quote))
}

fn starts_word(lowered: &str, start: usize) -> bool {
	match start.checked_sub(1).map(|prev| lowered.as_bytes()[prev]) {
		Some(prev) => !(prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'-'),
		None => true,
	}
}

fn skip(lowered: &str, mut at: usize, pred: impl Fn(u8) -> bool) -> usize {
	let bytes = lowered.as_bytes();

	while bytes.get(at).is_some_and(|c| pred(*c)) {
		at += 1;
	}

	at
}

fn is_quote(c: u8) -> bool {
	matches!(c, b'"' | b'\'' | b'\\')
}

fn is_value_end(c: char) -> bool {
	c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | ',' | '&' | ';' | '}' | ']' | ')')
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn nested_tokens_are_redacted() {
		let redacted = redact_value(json!({
			"bookings": [{ "success": false, "refreshToken": "r-1" }],
			"Authorization": "Bearer a-1",
			"message": "token expired",
		}));

		assert_eq!(redacted["bookings"][0]["refreshToken"], REDACTED);
		assert_eq!(redacted["bookings"][0]["success"], false);
		assert_eq!(redacted["Authorization"], REDACTED);
		assert_eq!(redacted["message"], "token expired");
	}

	#[test]
	fn scalars_pass_through() {
		assert_eq!(redact_value(json!("plain")), json!("plain"));
		assert_eq!(redact_value(Value::Null), Value::Null);
	}

	#[test]
	fn free_text_credentials_are_scrubbed() {
		assert_eq!(
			redact_text("rejected header Authorization: Bearer abc.def-1 for tenant"),
			"rejected header Authorization: Bearer <redacted> for tenant"
		);
		assert_eq!(
			redact_text("{\"error\":\"invalid\",\"refreshToken\": \"r-9\",\"token\":\"a-9\"}"),
			"{\"error\":\"invalid\",\"refreshToken\": \"<redacted>\",\"token\":\"<redacted>\"}"
		);
		assert_eq!(
			redact_text("callback?code=1&access_token=a-1&state=x"),
			"callback?code=1&access_token=<redacted>&state=x"
		);
		assert_eq!(
			redact_text("Authorization: Basic dXNlcjpwYXNz"),
			"Authorization: Basic <redacted>"
		);
	}

	#[test]
	fn free_text_without_credentials_is_unchanged() {
		for text in ["token expired", "maintenance", "bearer", "tokenizer: ok", "retoken=1", ""] {
			assert_eq!(redact_text(text), text);
		}
	}

	#[test]
	fn string_leaves_are_scrubbed() {
		let redacted = redact_value(json!({
			"status": 503,
			"body": "upstream echo: Bearer abc.def",
			"nested": ["password=hunter2"],
		}));

		assert_eq!(redacted["status"], 503);
		assert_eq!(redacted["body"], "upstream echo: Bearer <redacted>");
		assert_eq!(redacted["nested"][0], "password=<redacted>");
	}
}
