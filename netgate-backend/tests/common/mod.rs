//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use netgate_backend::api::AppState;
use netgate_backend::control::{BridgeConfig, ControlService, HotspotConfig};
use netgate_backend::environment::Environment;
use netgate_backend::execution::{
    BoxFuture, CommandOutput, CommandRunner, CommandSpec, ExecutionContextResolver,
};
use netgate_backend::network::NetworkInfoService;
use netgate_backend::query::QueryExecutor;
use netgate_shared::errors::{CommandError, CommandResult};

pub const IP_ADDR_JSON: &str = "ip -j addr show";
pub const IP_ROUTE_JSON: &str = "ip -j route show";
pub const IP_ADDR_TEXT: &str = "ip addr show";

pub fn fixture(name: &str) -> Vec<u8> {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
        .iter()
        .collect();
    std::fs::read(&path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

/// Runner answering from a table keyed by the displayed command line.
///
/// Commands missing from the table fail as if the tool were not installed.
#[derive(Default)]
pub struct ScriptedRunner {
    script: HashMap<String, Result<Vec<u8>, String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, command: &str, stdout: impl Into<Vec<u8>>) -> Self {
        self.script.insert(command.to_string(), Ok(stdout.into()));
        self
    }

    /// Scripts a non-zero exit with the given stderr.
    pub fn fail(mut self, command: &str, stderr: &str) -> Self {
        self.script
            .insert(command.to_string(), Err(stderr.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        let line = command.to_string();
        self.calls.lock().unwrap().push(line.clone());

        let result = match self.script.get(&line) {
            Some(Ok(stdout)) => Ok(CommandOutput {
                stdout: stdout.clone(),
                stderr: Vec::new(),
            }),
            Some(Err(stderr)) => Err(CommandError::NonZeroExit {
                command: line,
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: stderr.clone(),
            }),
            None => Err(CommandError::NotFound {
                program: command.program.clone(),
            }),
        };

        Box::pin(async move { result })
    }
}

/// Environment with fixed answers.
pub struct StaticEnvironment {
    pub containerized: bool,
    pub host_network: bool,
}

impl StaticEnvironment {
    /// A process running directly on the host.
    pub fn host() -> Arc<Self> {
        Arc::new(Self {
            containerized: false,
            host_network: false,
        })
    }

    /// A container with its own network namespace.
    pub fn isolated_container() -> Arc<Self> {
        Arc::new(Self {
            containerized: true,
            host_network: false,
        })
    }
}

impl Environment for StaticEnvironment {
    fn is_containerized(&self) -> bool {
        self.containerized
    }

    fn looks_like_host_network(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.host_network })
    }
}

pub fn network_service(
    runner: Arc<ScriptedRunner>,
    environment: Arc<StaticEnvironment>,
) -> NetworkInfoService {
    let resolver = ExecutionContextResolver::new(environment);
    NetworkInfoService::new(QueryExecutor::new(resolver, runner))
}

pub fn app_state(runner: Arc<ScriptedRunner>) -> AppState {
    let resolver = ExecutionContextResolver::new(StaticEnvironment::host());
    let network = NetworkInfoService::new(QueryExecutor::new(resolver.clone(), runner.clone()));
    let control = ControlService::new(
        runner,
        resolver,
        HotspotConfig {
            password: Some("correct-horse".to_string()),
            ..Default::default()
        },
        BridgeConfig::default(),
    );
    AppState::new(network, control)
}
