//! Line-oriented decoder for plain `ip addr show` output.
//!
//! Each line is first split into whitespace-delimited fields by [`tokenize`],
//! which recognizes interface header lines and indented `inet`/`inet6`
//! lines. [`parse_interfaces_text`] then folds those lines through a
//! two-state machine: either no interface is open, or one is and addresses
//! are appended to it until the next header.
//!
//! ```text
//! 2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc mq state UP group default qlen 1000
//!     link/ether dc:a6:32:12:34:56 brd ff:ff:ff:ff:ff:ff
//!     inet 192.168.1.42/24 brd 192.168.1.255 scope global dynamic eth0
//!        valid_lft 85634sec preferred_lft 85634sec
//! ```

use tracing::{debug, instrument};

use netgate_shared::{Address, InterfaceState, NetworkInterface};

/// One tokenized line of `ip addr show` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// `<index>: <name>: <FLAGS> mtu <n> ... state <word> ...`
    Header {
        name: &'a str,
        state: Option<&'a str>,
        mtu: Option<u32>,
    },
    /// Indented `inet <ip>/<prefix> ... scope <word> ...`, or `inet <ip> peer <ip>/<prefix> ...`
    Address {
        family: &'a str,
        ip: &'a str,
        prefix: Option<u64>,
        scope: Option<&'a str>,
    },
    /// Anything else (link lines, lifetimes, blank lines)
    Other,
}

/// Returns the field following `keyword`, if any.
fn keyword_value<'a>(fields: &[&'a str], keyword: &str) -> Option<&'a str> {
    fields
        .windows(2)
        .find(|pair| pair[0] == keyword)
        .map(|pair| pair[1])
}

/// Splits a line into fields and classifies it.
pub fn tokenize(line: &str) -> Line<'_> {
    let indented = line.starts_with(char::is_whitespace);
    let fields: Vec<&str> = line.split_whitespace().collect();

    if !indented && line.contains(": ") {
        let Some(raw_name) = fields.get(1).copied() else {
            return Line::Other;
        };
        // "eth0@if5:" -> "eth0"; JSON output reports the peer separately
        let name = raw_name.trim_end_matches(':');
        let name = name.split('@').next().unwrap_or(name);
        if name.is_empty() {
            return Line::Other;
        }

        return Line::Header {
            name,
            state: keyword_value(&fields, "state"),
            mtu: keyword_value(&fields, "mtu").and_then(|mtu| mtu.parse().ok()),
        };
    }

    match fields[..] {
        [family @ ("inet" | "inet6"), local, ..] if indented => {
            // "inet 10.8.0.1 peer 10.8.0.2/32": the prefix rides on the peer
            let peer_prefix = || {
                keyword_value(&fields, "peer")
                    .and_then(|peer| peer.split_once('/'))
                    .map(|(_, prefix)| (local, prefix))
            };
            let Some((ip, prefix)) = local.split_once('/').or_else(peer_prefix) else {
                return Line::Other;
            };
            Line::Address {
                family,
                ip,
                prefix: prefix.parse().ok(),
                scope: keyword_value(&fields, "scope"),
            }
        }
        _ => Line::Other,
    }
}

enum ParserState {
    NoCurrentInterface,
    InCurrentInterface(NetworkInterface),
}

/// Decodes `ip addr show` output. Never fails; unrecognized lines are ignored.
#[instrument(skip_all, fields(bytes = text.len()))]
pub fn parse_interfaces_text(text: &str) -> Vec<NetworkInterface> {
    let mut interfaces = Vec::new();
    let mut state = ParserState::NoCurrentInterface;

    for line in text.lines() {
        state = match (state, tokenize(line)) {
            (current, Line::Header { name, state, mtu }) => {
                if let ParserState::InCurrentInterface(done) = current {
                    interfaces.push(done);
                }
                let mut iface = NetworkInterface::new(name);
                iface.state = state
                    .map(InterfaceState::from_operstate)
                    .unwrap_or_default();
                iface.mtu = mtu.unwrap_or(0);
                ParserState::InCurrentInterface(iface)
            }
            (
                ParserState::InCurrentInterface(mut iface),
                Line::Address {
                    family,
                    ip,
                    prefix,
                    scope,
                },
            ) => {
                match Address::from_parts(family, ip, prefix, scope.map(str::to_string)) {
                    Some(address) => iface.addresses.push(address),
                    None => debug!("Skipping invalid address line on {}: {}", iface.name, line),
                }
                ParserState::InCurrentInterface(iface)
            }
            (current, _) => current,
        };
    }

    if let ParserState::InCurrentInterface(done) = state {
        interfaces.push(done);
    }

    interfaces
}
