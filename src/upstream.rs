//! Upstream reservation platform descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated metadata ([`UpstreamDescriptor`]) covering HTTPS-only
//! endpoints, how access tokens are attached, how refresh tokens are exchanged, and
//! platform quirks. `strategy` defines [`UpstreamStrategy`], the hook the refresh client
//! uses to recognize authorization failures that the platform does not report as a
//! plain 401.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
