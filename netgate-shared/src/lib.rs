//! Shared types and message definitions for netgate.
//!
//! This crate contains the network state model returned by the appliance API
//! and the payloads used by its control routes. Everything here is transient:
//! the backend rebuilds a [`NetworkInfo`] from scratch on every request.
//!
//! # Key Components
//!
//! * [`NetworkInterface`] - Interface with its operational state and addresses
//! * [`Address`] - A validated IPv4/IPv6 address assignment
//! * [`Route`] - A routing table entry
//! * [`NetworkInfo`] - Interfaces and routes combined into one response
//! * [`MessageResponse`]/[`ErrorResponse`] - JSON bodies of the HTTP routes
//!
//! # Wire Format
//!
//! ```text
//! GET /network
//!   {"interfaces": [{"name", "state", "type", "mtu", "addresses": [...]}],
//!    "routes":     [{"destination", "gateway", "device", "protocol", "scope", "metric"}]}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod errors;

/// Link type reported when the source output does not expose one.
pub const UNKNOWN_LINK_TYPE: &str = "unknown";

/// Operational state of a network interface, as reported by the kernel.
///
/// Parsing is case-insensitive (`ip` prints `UP`, the JSON output may use
/// either case). Values outside the kernel's operstate vocabulary are kept
/// lower-cased in [`InterfaceState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InterfaceState {
    Up,
    Down,
    #[default]
    Unknown,
    Dormant,
    LowerLayerDown,
    NotPresent,
    Testing,
    Other(String),
}

impl InterfaceState {
    /// Normalizes a raw operstate string.
    pub fn from_operstate(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "up" => InterfaceState::Up,
            "down" => InterfaceState::Down,
            "" | "unknown" => InterfaceState::Unknown,
            "dormant" => InterfaceState::Dormant,
            "lowerlayerdown" => InterfaceState::LowerLayerDown,
            "notpresent" => InterfaceState::NotPresent,
            "testing" => InterfaceState::Testing,
            _ => InterfaceState::Other(lowered),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InterfaceState::Up => "up",
            InterfaceState::Down => "down",
            InterfaceState::Unknown => "unknown",
            InterfaceState::Dormant => "dormant",
            InterfaceState::LowerLayerDown => "lowerlayerdown",
            InterfaceState::NotPresent => "notpresent",
            InterfaceState::Testing => "testing",
            InterfaceState::Other(state) => state,
        }
    }
}

impl fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for InterfaceState {
    fn from(raw: String) -> Self {
        InterfaceState::from_operstate(&raw)
    }
}

impl From<InterfaceState> for String {
    fn from(state: InterfaceState) -> Self {
        state.as_str().to_string()
    }
}

/// Address family of an [`Address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    /// Maps the `ip` family keyword (`inet`, `inet6`) to a family.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "inet" => Some(AddressFamily::Inet),
            "inet6" => Some(AddressFamily::Inet6),
            _ => None,
        }
    }

    /// Largest valid prefix length for this family.
    pub fn max_prefix(self) -> u8 {
        match self {
            AddressFamily::Inet => 32,
            AddressFamily::Inet6 => 128,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Inet => "inet",
            AddressFamily::Inet6 => "inet6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An address assigned to an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub family: AddressFamily,
    /// Literal address without the prefix length
    pub ip: String,
    pub prefix: u8,
    /// Reachability scope ("global", "link", "host", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Address {
    /// Builds an address from loosely typed parts.
    ///
    /// Returns `None` unless the family is recognized, the IP is non-empty and
    /// the prefix is present and fits the family. Both output parsers go
    /// through here so they agree on what a valid address is.
    pub fn from_parts(
        family: &str,
        ip: &str,
        prefix: Option<u64>,
        scope: Option<String>,
    ) -> Option<Self> {
        let family = AddressFamily::from_keyword(family)?;
        if ip.is_empty() {
            return None;
        }
        let prefix = u8::try_from(prefix?).ok()?;
        if prefix > family.max_prefix() {
            return None;
        }

        Some(Self {
            family,
            ip: ip.to_string(),
            prefix,
            scope: scope.filter(|s| !s.is_empty()),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.family, self.ip, self.prefix)
    }
}

/// Network interface representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Interface name (e.g., "eth0", "wlan0"), unique within one query
    pub name: String,
    pub state: InterfaceState,
    /// Link layer type ("ether", "loopback", ...), `"unknown"` if not reported
    #[serde(rename = "type")]
    pub link_type: String,
    /// Maximum transmission unit, 0 if not reported
    pub mtu: u32,
    /// Addresses in the order the kernel lists them
    pub addresses: Vec<Address>,
}

impl NetworkInterface {
    /// Creates an interface with unknown state, link type and MTU.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: InterfaceState::Unknown,
            link_type: UNKNOWN_LINK_TYPE.to_string(),
            mtu: 0,
            addresses: Vec::new(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.state == InterfaceState::Up
    }
}

/// A routing table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Destination in CIDR notation, or `"default"`
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    /// Outgoing interface name
    pub device: String,
    /// Routing protocol that installed the route ("kernel", "dhcp", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Route metric as a whole number string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
}

impl Route {
    /// Destination used when the source record has none.
    pub const DEFAULT_DESTINATION: &'static str = "default";

    pub fn is_default(&self) -> bool {
        self.destination == Self::DEFAULT_DESTINATION
    }
}

/// Interfaces and routes of the host, as returned by `GET /network`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub interfaces: Vec<NetworkInterface>,
    pub routes: Vec<Route>,
}

/// Successful response body of the API routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error response body of the API routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.details = (!details.is_empty()).then_some(details);
        self
    }
}
