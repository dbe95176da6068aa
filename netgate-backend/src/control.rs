//! Device control actions: Wi-Fi hotspot, Ethernet bridge and shutdown.
//!
//! Every action is a fixed sequence of external commands run through the same
//! [`CommandRunner`] as the network queries. A sequence stops at the first
//! failing step, which is reported as [`ControlError::StepFailed`].
//!
//! The `ip` steps of the bridge go through the [`ExecutionContextResolver`]
//! so they change the host's links, not a container's. `nmcli` and
//! `systemctl` talk to host daemons over D-Bus and always run directly.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use netgate_shared::errors::{ControlError, ControlResult};

use crate::execution::{CommandRunner, CommandSpec, ExecutionContextResolver};

/// Default Wi-Fi interface carrying the hotspot.
pub const DEFAULT_HOTSPOT_IFNAME: &str = "wlan0";
/// Default NetworkManager connection name of the hotspot.
pub const DEFAULT_HOTSPOT_CONNECTION: &str = "Hotspot";
/// Default SSID broadcast by the hotspot.
pub const DEFAULT_HOTSPOT_SSID: &str = "Entreprise";
/// Default bridge device name.
pub const DEFAULT_BRIDGE_NAME: &str = "br0";
/// Default bridged Ethernet interfaces.
pub const DEFAULT_BRIDGE_MEMBERS: [&str; 2] = ["eth0", "eth1"];

/// WPA2 passphrase length bounds accepted by NetworkManager.
pub const HOTSPOT_PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=63;

/// Wi-Fi hotspot settings.
#[derive(Clone, PartialEq, Eq)]
pub struct HotspotConfig {
    pub ifname: String,
    pub connection: String,
    pub ssid: String,
    pub password: Option<String>,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            ifname: DEFAULT_HOTSPOT_IFNAME.to_string(),
            connection: DEFAULT_HOTSPOT_CONNECTION.to_string(),
            ssid: DEFAULT_HOTSPOT_SSID.to_string(),
            password: None,
        }
    }
}

impl fmt::Debug for HotspotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotspotConfig")
            .field("ifname", &self.ifname)
            .field("connection", &self.connection)
            .field("ssid", &self.ssid)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Bridge settings: a bridge device and the two interfaces enslaved to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub name: String,
    pub members: [String; 2],
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_BRIDGE_NAME.to_string(),
            members: DEFAULT_BRIDGE_MEMBERS.map(str::to_string),
        }
    }
}

impl BridgeConfig {
    /// The ordered `ip` steps creating the bridge.
    pub fn steps(&self) -> Vec<CommandSpec> {
        let ip = |args: &[&str]| CommandSpec::new("ip", args.iter().copied());
        let br = self.name.as_str();
        let [a, b] = [self.members[0].as_str(), self.members[1].as_str()];

        vec![
            ip(&["link", "add", "name", br, "type", "bridge"]),
            ip(&["link", "set", a, "master", br]),
            ip(&["link", "set", b, "master", br]),
            ip(&["link", "set", br, "up"]),
            ip(&["link", "set", a, "up"]),
            ip(&["link", "set", b, "up"]),
            ip(&["link", "set", a, "promisc", "on"]),
            ip(&["link", "set", b, "promisc", "on"]),
            ip(&["addr", "flush", "dev", a]),
            ip(&["addr", "flush", "dev", b]),
        ]
    }
}

/// Runs the control actions exposed by the API.
#[derive(Clone)]
pub struct ControlService {
    runner: Arc<dyn CommandRunner>,
    resolver: ExecutionContextResolver,
    hotspot: HotspotConfig,
    bridge: BridgeConfig,
}

impl ControlService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        resolver: ExecutionContextResolver,
        hotspot: HotspotConfig,
        bridge: BridgeConfig,
    ) -> Self {
        Self {
            runner,
            resolver,
            hotspot,
            bridge,
        }
    }

    /// Creates the Wi-Fi hotspot with `nmcli`.
    #[instrument(skip(self), fields(ifname = %self.hotspot.ifname, ssid = %self.hotspot.ssid))]
    pub async fn start_hotspot(&self) -> ControlResult<()> {
        let password = self
            .hotspot
            .password
            .as_deref()
            .ok_or(ControlError::HotspotNotConfigured)?;

        let command = CommandSpec::new(
            "nmcli",
            [
                "device",
                "wifi",
                "hotspot",
                "ifname",
                self.hotspot.ifname.as_str(),
                "con-name",
                self.hotspot.connection.as_str(),
                "ssid",
                self.hotspot.ssid.as_str(),
                "password",
                password,
            ],
        )
        .redact(password);

        self.step("hotspot", &command).await?;
        info!("Hotspot '{}' is up", self.hotspot.connection);
        Ok(())
    }

    /// Deletes the hotspot connection profile.
    #[instrument(skip(self), fields(connection = %self.hotspot.connection))]
    pub async fn delete_hotspot(&self) -> ControlResult<()> {
        let command = CommandSpec::new(
            "nmcli",
            ["connection", "delete", "id", self.hotspot.connection.as_str()],
        );
        self.step("delete hotspot", &command).await
    }

    /// Halts the device.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> ControlResult<()> {
        warn!("Halting the device");
        self.step("shutdown", &CommandSpec::new("systemctl", ["halt"]))
            .await
    }

    /// Creates the bridge and enslaves both members, stopping at the first failure.
    #[instrument(skip(self), fields(bridge = %self.bridge.name))]
    pub async fn setup_bridge(&self) -> ControlResult<()> {
        for step in self.bridge.steps() {
            let resolved = self.resolver.resolve(step).await;
            self.step("bridge", &resolved.command).await?;
        }

        info!(
            "Bridge {} created over {} and {}",
            self.bridge.name, self.bridge.members[0], self.bridge.members[1]
        );
        Ok(())
    }

    async fn step(&self, action: &'static str, command: &CommandSpec) -> ControlResult<()> {
        match self.runner.run(command).await {
            Ok(output) => {
                debug!(
                    "{} step '{}' done: stdout={:?} stderr={:?}",
                    action,
                    command,
                    output.stdout_lossy().trim(),
                    output.stderr_lossy().trim()
                );
                Ok(())
            }
            Err(source) => {
                warn!("{} step '{}' failed: {}", action, command, source);
                Err(ControlError::StepFailed {
                    action,
                    step: command.to_string(),
                    source,
                })
            }
        }
    }
}
