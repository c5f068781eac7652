// crates.io
use oauth2::http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
// self
use crate::_prelude::*;

/// Outbound upstream call, replayable so it can be re-sent after a refresh.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL, query string included.
	pub url: Url,
	/// JSON body, if any.
	pub body: Option<Value>,
}
impl UpstreamRequest {
	/// `GET` request for the provided URL.
	pub fn get(url: Url) -> Self {
		Self { method: Method::GET, url, body: None }
	}

	/// `POST` request carrying a JSON body.
	pub fn post_json(url: Url, body: Value) -> Self {
		Self { method: Method::POST, url, body: Some(body) }
	}
}

/// Raw upstream response handed back to the caller for classification.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl UpstreamResponse {
	/// Lossy UTF-8 view of the body, handy for diagnostics.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
