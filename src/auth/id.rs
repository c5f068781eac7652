//! Validated identifiers used to partition credentials and name upstream descriptors.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				check_identifier($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				check_identifier($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (tenant, provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace or control characters.
	#[error("{kind} identifier contains whitespace or control characters.")]
	InvalidCharacter {
		/// Kind of identifier (tenant, provider).
		kind: &'static str,
	},
	/// The identifier collides with the reserved `:` scope separator.
	#[error("{kind} identifier cannot contain ':'.")]
	ReservedSeparator {
		/// Kind of identifier (tenant, provider).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed byte length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (tenant, provider).
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

def_id! { TenantId, "Dashboard tenant (property host account) that owns a credential.", "Tenant" }
def_id! { ProviderId, "Name of an upstream reservation platform descriptor.", "Provider" }

fn check_identifier(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(|c| c.is_whitespace() || c.is_control()) {
		return Err(IdentifierError::InvalidCharacter { kind });
	}
	if view.contains(':') {
		return Err(IdentifierError::ReservedSeparator { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn tenant_ids_reject_whitespace_and_separators() {
		assert!(TenantId::new(" host-1").is_err(), "Leading whitespace must be rejected.");
		assert!(TenantId::new("host\t1").is_err());
		assert!(matches!(
			TenantId::new("tenant:host-1"),
			Err(IdentifierError::ReservedSeparator { kind: "Tenant" })
		));
		assert!(matches!(TenantId::new(""), Err(IdentifierError::Empty { .. })));

		let tenant = TenantId::new("host-1").expect("Tenant fixture should be valid.");

		assert_eq!(tenant.as_ref(), "host-1");
		assert_eq!(format!("{tenant:?}"), "Tenant(host-1)");
	}

	#[test]
	fn length_limit_is_inclusive() {
		TenantId::new("h".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		assert!(matches!(
			ProviderId::new("p".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN, .. })
		));
	}

	#[test]
	fn deserialization_runs_validation() {
		let tenant: TenantId =
			serde_json::from_str("\"host-42\"").expect("Tenant should deserialize successfully.");

		assert_eq!(tenant.as_ref(), "host-42");
		assert!(serde_json::from_str::<TenantId>("\"host 42\"").is_err());
	}

	#[test]
	fn borrow_allows_str_lookup() {
		let map: HashMap<TenantId, u8> = HashMap::from_iter([(
			TenantId::new("host-7").expect("Tenant used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("host-7"), Some(&7));
	}
}
