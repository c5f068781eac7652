// self
use crate::_prelude::*;

/// Platform-specific quirks that influence how authorization failures are recognized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamQuirks {
	/// Treats every 403 as an expired credential rather than a permission failure.
	pub forbidden_is_unauthorized: bool,
	/// Lower-case body fragments that flag an expired token on a 400/403 response.
	pub auth_failure_markers: Vec<String>,
}
impl Default for UpstreamQuirks {
	fn default() -> Self {
		Self {
			forbidden_is_unauthorized: false,
			auth_failure_markers: vec![
				"token expired".into(),
				"expired token".into(),
				"invalid token".into(),
			],
		}
	}
}
