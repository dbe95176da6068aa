//! Raw `ip` queries routed through the execution resolver.

use std::sync::Arc;

use tracing::{debug, instrument};

use netgate_shared::errors::CommandResult;

use crate::execution::{CommandRunner, CommandSpec, ExecutionContextResolver};

/// Runs the enumeration commands the network state is built from.
///
/// Each call spawns exactly one process; there are no retries.
#[derive(Clone)]
pub struct QueryExecutor {
    resolver: ExecutionContextResolver,
    runner: Arc<dyn CommandRunner>,
}

impl QueryExecutor {
    pub fn new(resolver: ExecutionContextResolver, runner: Arc<dyn CommandRunner>) -> Self {
        Self { resolver, runner }
    }

    /// `ip -j addr show`
    pub async fn list_interfaces_json(&self) -> CommandResult<Vec<u8>> {
        self.query(CommandSpec::new("ip", ["-j", "addr", "show"]))
            .await
    }

    /// `ip -j route show`
    pub async fn list_routes_json(&self) -> CommandResult<Vec<u8>> {
        self.query(CommandSpec::new("ip", ["-j", "route", "show"]))
            .await
    }

    /// `ip addr show`, for iproute2 builds without JSON output
    pub async fn list_interfaces_text(&self) -> CommandResult<Vec<u8>> {
        self.query(CommandSpec::new("ip", ["addr", "show"])).await
    }

    #[instrument(skip(self), fields(command = %command))]
    async fn query(&self, command: CommandSpec) -> CommandResult<Vec<u8>> {
        let resolved = self.resolver.resolve(command).await;
        debug!("Running {:?} query: {}", resolved.path, resolved.command);
        let output = self.runner.run(&resolved.command).await?;
        Ok(output.stdout)
    }
}
