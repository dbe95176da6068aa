//! Network state aggregation.
//!
//! [`NetworkInfoService`] builds one [`NetworkInfo`] per call from the raw
//! `ip` queries, applying the partial-failure policy:
//!
//! * interfaces: structured JSON first; on any command or decode failure the
//!   plain-text listing is parsed instead. Only when that command fails too is
//!   the whole request failed with [`NetworkInfoError`].
//! * routes: structured JSON only; any failure degrades to an empty list.

use tracing::{info, instrument, warn};

use netgate_shared::errors::{InterfaceQueryError, NetworkInfoError};
use netgate_shared::{NetworkInfo, NetworkInterface, Route};

use crate::parser::{parse_interfaces_json, parse_interfaces_text, parse_routes_json};
use crate::query::QueryExecutor;

/// Aggregates interfaces and routes into the `/network` response.
#[derive(Clone)]
pub struct NetworkInfoService {
    queries: QueryExecutor,
}

impl NetworkInfoService {
    pub fn new(queries: QueryExecutor) -> Self {
        Self { queries }
    }

    /// Collects the current host network state. Nothing is cached.
    #[instrument(skip(self))]
    pub async fn get_network_info(&self) -> Result<NetworkInfo, NetworkInfoError> {
        let interfaces = self.interfaces().await?;
        let routes = self.routes().await;

        info!(
            "Collected {} interfaces and {} routes",
            interfaces.len(),
            routes.len()
        );
        Ok(NetworkInfo { interfaces, routes })
    }

    async fn interfaces(&self) -> Result<Vec<NetworkInterface>, NetworkInfoError> {
        let structured = match self.structured_interfaces().await {
            Ok(interfaces) => return Ok(interfaces),
            Err(e) => e,
        };
        warn!(
            "Structured interface query failed, falling back to text output: {}",
            structured
        );

        match self.queries.list_interfaces_text().await {
            Ok(bytes) => Ok(parse_interfaces_text(&String::from_utf8_lossy(&bytes))),
            Err(legacy) => Err(NetworkInfoError::InterfacesUnavailable { structured, legacy }),
        }
    }

    async fn structured_interfaces(&self) -> Result<Vec<NetworkInterface>, InterfaceQueryError> {
        let bytes = self.queries.list_interfaces_json().await?;
        Ok(parse_interfaces_json(&bytes)?)
    }

    async fn routes(&self) -> Vec<Route> {
        let bytes = match self.queries.list_routes_json().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Route query failed, reporting no routes: {}", e);
                return Vec::new();
            }
        };

        parse_routes_json(&bytes).unwrap_or_else(|e| {
            warn!("Route output unusable, reporting no routes: {}", e);
            Vec::new()
        })
    }
}
