//! Decoder for `ip -j addr show` and `ip -j route show`.
//!
//! Records are decoded into typed structs. Optional fields use a lenient
//! deserializer: a value of the wrong type is treated as absent instead of
//! failing the whole document. The hard requirements are a string `ifname`
//! on every interface record and, when present, a string `dst` on a route.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use tracing::{debug, instrument};

use netgate_shared::errors::{ParseError, ParseResult};
use netgate_shared::{
    Address, InterfaceState, NetworkInterface, Route, UNKNOWN_LINK_TYPE,
};

/// Deserializes an optional field, mapping type mismatches to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Deserialize)]
struct RawInterface {
    #[serde(default)]
    ifname: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    operstate: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    mtu: Option<Number>,
    #[serde(default, deserialize_with = "lenient")]
    link_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    addr_info: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawAddress {
    #[serde(default, deserialize_with = "lenient")]
    family: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    local: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    prefixlen: Option<Number>,
    #[serde(default, deserialize_with = "lenient")]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    #[serde(default)]
    dst: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    gateway: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    dev: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    protocol: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    scope: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    metric: Option<Number>,
}

/// Truncates an integer or floating-point JSON number to a non-negative integer.
fn whole_number(number: &Number) -> Option<u64> {
    if let Some(n) = number.as_u64() {
        return Some(n);
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 => Some(f.trunc() as u64),
        _ => None,
    }
}

/// Formats a metric with zero decimal digits (`100.0` becomes `"100"`).
fn format_metric(number: &Number) -> Option<String> {
    if let Some(n) = number.as_u64() {
        return Some(n.to_string());
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 => Some(format!("{:.0}", f)),
        _ => None,
    }
}

impl RawAddress {
    fn into_address(self) -> Option<Address> {
        Address::from_parts(
            self.family.as_deref()?,
            self.local.as_deref()?,
            self.prefixlen.as_ref().and_then(whole_number),
            self.scope,
        )
    }
}

impl RawInterface {
    fn into_interface(self, index: usize) -> ParseResult<NetworkInterface> {
        let name = match self.ifname {
            Some(Value::String(name)) => name,
            None | Some(Value::Null) => {
                return Err(ParseError::MissingField {
                    index,
                    field: "ifname",
                });
            }
            Some(_) => {
                return Err(ParseError::InvalidType {
                    index,
                    field: "ifname",
                    expected: "string",
                });
            }
        };

        let mut addresses = Vec::new();
        for (position, raw) in self.addr_info.unwrap_or_default().into_iter().enumerate() {
            match serde_json::from_value::<RawAddress>(raw)
                .ok()
                .and_then(RawAddress::into_address)
            {
                Some(address) => addresses.push(address),
                None => debug!("Skipping invalid address #{} on {}", position, name),
            }
        }

        Ok(NetworkInterface {
            state: self
                .operstate
                .as_deref()
                .map(InterfaceState::from_operstate)
                .unwrap_or_default(),
            link_type: self
                .link_type
                .unwrap_or_else(|| UNKNOWN_LINK_TYPE.to_string()),
            mtu: self
                .mtu
                .as_ref()
                .and_then(whole_number)
                .map(|mtu| u32::try_from(mtu).unwrap_or(u32::MAX))
                .unwrap_or(0),
            name,
            addresses,
        })
    }
}

impl RawRoute {
    fn into_route(self) -> Option<Route> {
        let destination = match self.dst {
            Some(Value::String(dst)) => dst,
            None | Some(Value::Null) => Route::DEFAULT_DESTINATION.to_string(),
            Some(_) => return None,
        };

        Some(Route {
            destination,
            gateway: self.gateway,
            device: self.dev?,
            protocol: self.protocol,
            scope: self.scope,
            metric: self.metric.as_ref().and_then(format_metric),
        })
    }
}

/// Decodes `ip -j addr show` output.
///
/// Fails if the document is not an array of objects or if any record lacks a
/// string `ifname`. Invalid address entries are dropped.
#[instrument(skip_all, fields(bytes = bytes.len()))]
pub fn parse_interfaces_json(bytes: &[u8]) -> ParseResult<Vec<NetworkInterface>> {
    let records: Vec<RawInterface> =
        serde_json::from_slice(bytes).map_err(|source| ParseError::Malformed {
            source_name: "interface",
            source,
        })?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_interface(index))
        .collect()
}

/// Decodes `ip -j route show` output.
///
/// Records without an outgoing device (`unreachable`, `blackhole`, ...) or
/// with a non-string `dst` are skipped. A missing `dst` means `default`.
#[instrument(skip_all, fields(bytes = bytes.len()))]
pub fn parse_routes_json(bytes: &[u8]) -> ParseResult<Vec<Route>> {
    let records: Vec<RawRoute> =
        serde_json::from_slice(bytes).map_err(|source| ParseError::Malformed {
            source_name: "route",
            source,
        })?;

    let total = records.len();
    let routes: Vec<Route> = records.into_iter().filter_map(RawRoute::into_route).collect();
    if routes.len() != total {
        debug!("Skipped {} malformed or device-less route(s)", total - routes.len());
    }
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgate_shared::AddressFamily;

    #[test]
    fn test_interface_count_and_state_normalization() {
        let json = br#"[
            {"ifname": "lo", "operstate": "UNKNOWN", "mtu": 65536, "link_type": "loopback"},
            {"ifname": "eth0", "operstate": "UP", "mtu": 1500, "link_type": "ether"},
            {"ifname": "wlan0", "operstate": "DOWN", "mtu": 1500},
            {"ifname": "wwan0", "operstate": "Dormant"}
        ]"#;

        let interfaces = parse_interfaces_json(json).unwrap();

        assert_eq!(interfaces.len(), 4);
        let states: Vec<&str> = interfaces.iter().map(|i| i.state.as_str()).collect();
        assert_eq!(states, vec!["unknown", "up", "down", "dormant"]);
        assert_eq!(interfaces[2].link_type, "unknown");
        assert_eq!(interfaces[3].mtu, 0);
    }

    #[test]
    fn test_mtu_accepts_float() {
        let json = br#"[{"ifname": "eth0", "operstate": "UP", "mtu": 1500.0}]"#;
        let interfaces = parse_interfaces_json(json).unwrap();
        assert_eq!(interfaces[0].mtu, 1500);

        let json = br#"[{"ifname": "eth0", "mtu": 9000.7}]"#;
        let interfaces = parse_interfaces_json(json).unwrap();
        assert_eq!(interfaces[0].mtu, 9000);
    }

    #[test]
    fn test_missing_ifname_is_error() {
        let json = br#"[{"ifname": "lo"}, {"operstate": "UP"}]"#;
        let err = parse_interfaces_json(json).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField {
                index: 1,
                field: "ifname"
            }
        ));
    }

    #[test]
    fn test_non_string_ifname_is_error() {
        let json = br#"[{"ifname": 42}]"#;
        let err = parse_interfaces_json(json).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidType {
                index: 0,
                field: "ifname",
                expected: "string"
            }
        ));
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(matches!(
            parse_interfaces_json(b"Option \"-j\" is unknown"),
            Err(ParseError::Malformed { .. })
        ));
        assert!(matches!(
            parse_interfaces_json(br#"{"ifname": "lo"}"#),
            Err(ParseError::Malformed { .. })
        ));
        assert!(parse_interfaces_json(b"").is_err());
    }

    #[test]
    fn test_invalid_addresses_skipped_individually() {
        let json = br#"[
            {"ifname": "eth0", "operstate": "UP", "mtu": 1500, "addr_info": [
                {"family": "inet", "local": "192.168.1.10", "prefixlen": 24, "scope": "global"},
                {"local": "10.0.0.1", "prefixlen": 8},
                {"family": "inet", "prefixlen": 8},
                {"family": "inet", "local": "10.0.0.2"},
                {"family": "inet", "local": 12, "prefixlen": 8},
                "not-an-object",
                {"family": "inet6", "local": "fe80::1", "prefixlen": 64.0, "scope": "link"}
            ]},
            {"ifname": "lo", "operstate": "UNKNOWN", "addr_info": [
                {"family": "inet", "local": "127.0.0.1", "prefixlen": 8, "scope": "host"}
            ]}
        ]"#;

        let interfaces = parse_interfaces_json(json).unwrap();

        assert_eq!(interfaces.len(), 2);
        let eth0 = &interfaces[0];
        assert_eq!(eth0.addresses.len(), 2);
        assert_eq!(eth0.addresses[0].ip, "192.168.1.10");
        assert_eq!(eth0.addresses[0].prefix, 24);
        assert_eq!(eth0.addresses[0].scope.as_deref(), Some("global"));
        assert_eq!(eth0.addresses[1].family, AddressFamily::Inet6);
        assert_eq!(eth0.addresses[1].prefix, 64);
        assert_eq!(interfaces[1].addresses.len(), 1);
    }

    #[test]
    fn test_optional_fields_with_wrong_type_are_defaults() {
        let json = br#"[{"ifname": "eth0", "operstate": 1, "mtu": "big", "link_type": null, "addr_info": {}}]"#;
        let interfaces = parse_interfaces_json(json).unwrap();

        let eth0 = &interfaces[0];
        assert_eq!(eth0.state, InterfaceState::Unknown);
        assert_eq!(eth0.mtu, 0);
        assert_eq!(eth0.link_type, "unknown");
        assert!(eth0.addresses.is_empty());
    }

    #[test]
    fn test_route_metric_float_formatted_without_decimals() {
        let json = br#"[{"dst": "default", "gateway": "192.168.1.1", "dev": "eth0", "protocol": "dhcp", "metric": 100.0}]"#;
        let routes = parse_routes_json(json).unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].metric.as_deref(), Some("100"));
        assert_eq!(routes[0].gateway.as_deref(), Some("192.168.1.1"));
        assert_eq!(routes[0].protocol.as_deref(), Some("dhcp"));
    }

    #[test]
    fn test_route_defaults() {
        let json = br#"[
            {"gateway": "10.0.0.1", "dev": "eth0"},
            {"dst": "10.0.0.0/24", "dev": "eth0", "scope": "link", "metric": 600},
            {"dst": "10.1.0.0/16", "dev": "eth0", "metric": -1}
        ]"#;
        let routes = parse_routes_json(json).unwrap();

        assert_eq!(routes[0].destination, "default");
        assert!(routes[0].is_default());
        assert!(routes[0].metric.is_none());
        assert_eq!(routes[1].metric.as_deref(), Some("600"));
        assert_eq!(routes[1].scope.as_deref(), Some("link"));
        assert!(routes[2].metric.is_none());
    }

    #[test]
    fn test_route_without_device_skipped() {
        let json = br#"[
            {"type": "unreachable", "dst": "10.99.0.0/16", "flags": []},
            {"dst": "192.168.1.0/24", "dev": "eth0", "protocol": "kernel"}
        ]"#;
        let routes = parse_routes_json(json).unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].device, "eth0");
    }

    #[test]
    fn test_route_with_non_string_destination_skipped() {
        let json = br#"[
            {"dst": 42, "dev": "eth0"},
            {"dst": ["10.0.0.0/8"], "dev": "eth0"},
            {"dst": null, "gateway": "10.0.0.1", "dev": "eth1"}
        ]"#;
        let routes = parse_routes_json(json).unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].device, "eth1");
        assert!(routes[0].is_default());
    }

    #[test]
    fn test_empty_route_table() {
        assert!(parse_routes_json(b"[]").unwrap().is_empty());
    }
}
