//! Strategy hooks that recognize authorization failures on upstream responses.
//!
//! Platforms disagree on how an expired access token is reported: most answer 401, some
//! answer 403 or even 400 with a message in the body. The refresh client consults an
//! [`UpstreamStrategy`] instead of hard-coding status checks.

// self
use crate::{_prelude::*, upstream::UpstreamQuirks};

/// Strategy hook that decides whether a response means "refresh and retry".
pub trait UpstreamStrategy: Send + Sync {
	/// Returns `true` when the response reports an invalid or expired access token.
	fn is_authorization_failure(&self, ctx: &ResponseContext, quirks: &UpstreamQuirks) -> bool;
}

/// Context passed to strategies when inspecting an upstream response.
///
/// Only primitive data (status code and a body preview) is kept so strategies stay
/// decoupled from the HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseContext {
	/// HTTP status code returned by the upstream.
	pub status: u16,
	/// Lossy UTF-8 preview of the response body.
	pub body_preview: Option<String>,
}
impl ResponseContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context for the provided status.
	pub fn new(status: u16) -> Self {
		Self { status, body_preview: None }
	}

	/// Adds a body preview, truncated to a fixed number of characters.
	pub fn with_body(mut self, body: &[u8]) -> Self {
		if !body.is_empty() {
			self.body_preview = Some(truncate_preview(&String::from_utf8_lossy(body)));
		}

		self
	}
}

/// Default strategy: 401 always, 403 when the quirk says so, and 400/403 bodies that
/// carry one of the configured expired-token markers.
#[derive(Debug, Default)]
pub struct DefaultUpstreamStrategy;
impl Display for DefaultUpstreamStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-upstream-strategy")
	}
}
impl UpstreamStrategy for DefaultUpstreamStrategy {
	fn is_authorization_failure(&self, ctx: &ResponseContext, quirks: &UpstreamQuirks) -> bool {
		match ctx.status {
			401 => true,
			403 if quirks.forbidden_is_unauthorized => true,
			400 | 403 => body_has_marker(ctx.body_preview.as_deref(), &quirks.auth_failure_markers),
			_ => false,
		}
	}
}

/// Truncates a body to the preview limit, appending `…` when cut.
pub(crate) fn truncate_preview(body: &str) -> String {
	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ResponseContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}

		buf.push(ch);
	}

	buf
}

fn body_has_marker(body: Option<&str>, markers: &[String]) -> bool {
	let Some(body) = body else {
		return false;
	};
	let lowered = body.to_ascii_lowercase();

	markers.iter().any(|marker| lowered.contains(marker.as_str()))
}
