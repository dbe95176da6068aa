//! Decoders turning `ip` output into the shared network model.
//!
//! Two strategies exist because iproute2 builds differ:
//!
//! * [`structured`] - `ip -j` JSON output, schema-validated with serde
//! * [`legacy`] - plain `ip addr show` text for builds without `-j`
//!
//! Both produce the same [`netgate_shared::NetworkInterface`] values for the
//! same host state, except for the link type which the text parser never
//! reports.

pub mod legacy;
pub mod structured;

pub use legacy::{Line, parse_interfaces_text, tokenize};
pub use structured::{parse_interfaces_json, parse_routes_json};
