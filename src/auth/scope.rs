//! Credential partitioning: a specific tenant or the global default.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, TenantId},
};

const GLOBAL_KEY: &str = "global";
const TENANT_PREFIX: &str = "tenant:";

/// Partition under which an upstream call is authenticated.
///
/// The scope doubles as the store key, so it serializes to a stable string:
/// `"global"` or `"tenant:<id>"`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CredentialScope {
	/// Shared credential used when no tenant is supplied.
	Global,
	/// Credential owned by a single tenant.
	Tenant(TenantId),
}
impl CredentialScope {
	/// Resolves the scope for a call: the tenant's when one is supplied, else global.
	pub fn resolve(tenant: Option<TenantId>) -> Self {
		match tenant {
			Some(tenant) => Self::Tenant(tenant),
			None => Self::Global,
		}
	}

	/// Returns `true` for the global default scope.
	pub fn is_global(&self) -> bool {
		matches!(self, Self::Global)
	}

	/// Tenant behind the scope, if any.
	pub fn tenant(&self) -> Option<&TenantId> {
		match self {
			Self::Global => None,
			Self::Tenant(tenant) => Some(tenant),
		}
	}

	/// Stable string key used by stores and span fields.
	pub fn key(&self) -> String {
		match self {
			Self::Global => GLOBAL_KEY.into(),
			Self::Tenant(tenant) => format!("{TENANT_PREFIX}{tenant}"),
		}
	}
}
impl From<TenantId> for CredentialScope {
	fn from(tenant: TenantId) -> Self {
		Self::Tenant(tenant)
	}
}
impl From<Option<TenantId>> for CredentialScope {
	fn from(tenant: Option<TenantId>) -> Self {
		Self::resolve(tenant)
	}
}
impl From<CredentialScope> for String {
	fn from(scope: CredentialScope) -> Self {
		scope.key()
	}
}
impl TryFrom<String> for CredentialScope {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl FromStr for CredentialScope {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == GLOBAL_KEY {
			return Ok(Self::Global);
		}

		match s.strip_prefix(TENANT_PREFIX) {
			Some(tenant) => Ok(Self::Tenant(TenantId::new(tenant)?)),
			None => Ok(Self::Tenant(TenantId::new(s)?)),
		}
	}
}
impl Debug for CredentialScope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CredentialScope({})", self.key())
	}
}
impl Display for CredentialScope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.key())
	}
}
