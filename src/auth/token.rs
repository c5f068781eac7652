//! Token secrets and the credential records that carry them.

pub mod credential;
pub mod secret;
