//! CLI argument parsing for the netgate backend.
//!
//! This module handles command line argument parsing using clap and provides
//! a structured representation of CLI configuration that the application
//! configuration is built from.

use std::net::SocketAddr;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use crate::control::{
    DEFAULT_BRIDGE_MEMBERS, DEFAULT_BRIDGE_NAME, DEFAULT_HOTSPOT_CONNECTION,
    DEFAULT_HOTSPOT_IFNAME, DEFAULT_HOTSPOT_SSID,
};

/// Environment variable read by `--hotspot-password`.
pub const HOTSPOT_PASSWORD_ENV: &str = "NETGATE_HOTSPOT_PASSWORD";

/// CLI configuration structure containing all parsed command line arguments
#[derive(Clone)]
pub struct CliConfig {
    pub verbose: bool,
    pub listen: String,
    pub command_timeout_secs: Option<u64>,
    pub hotspot_on_start: bool,
    pub hotspot_ifname: String,
    pub hotspot_connection: String,
    pub hotspot_ssid: String,
    pub hotspot_password: Option<String>,
    pub bridge_name: String,
    pub bridge_members: Vec<String>,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("verbose", &self.verbose)
            .field("listen", &self.listen)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("hotspot_on_start", &self.hotspot_on_start)
            .field("hotspot_ifname", &self.hotspot_ifname)
            .field("hotspot_connection", &self.hotspot_connection)
            .field("hotspot_ssid", &self.hotspot_ssid)
            .field(
                "hotspot_password",
                &self.hotspot_password.as_ref().map(|_| "********"),
            )
            .field("bridge_name", &self.bridge_name)
            .field("bridge_members", &self.bridge_members)
            .finish()
    }
}

impl CliConfig {
    /// Parse CLI arguments and create CliConfig
    pub fn from_args() -> Result<Self> {
        let matches = Self::build_cli().get_matches();
        Self::from_matches(&matches)
    }

    /// Create CliConfig from pre-parsed ArgMatches (useful for testing)
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let verbose = matches.get_flag("verbose");
        let hotspot_on_start = matches.get_flag("hotspot-on-start");

        let required = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Option --{} is required", id))
        };

        let bridge_members: Vec<String> = matches
            .get_many::<String>("bridge-members")
            .map(|vals| vals.map(|m| m.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            verbose,
            listen: required("listen")?,
            command_timeout_secs: matches.get_one::<u64>("command-timeout-secs").copied(),
            hotspot_on_start,
            hotspot_ifname: required("hotspot-ifname")?,
            hotspot_connection: required("hotspot-connection")?,
            hotspot_ssid: required("hotspot-ssid")?,
            hotspot_password: matches.get_one::<String>("hotspot-password").cloned(),
            bridge_name: required("bridge-name")?,
            bridge_members,
        })
    }

    /// Build the clap Command structure
    pub fn build_cli() -> Command {
        Command::new("netgate-backend")
            .version(env!("CARGO_PKG_VERSION"))
            .about("netgate - on-device network appliance control API")
            .long_about("An HTTP service exposing the host network state (interfaces and routes) \
                       and a few control actions: Wi-Fi hotspot, Ethernet bridge and shutdown. \
                       When running in a container with a private network namespace, network \
                       queries are executed in the host namespace through nsenter.")
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue)
                    .help("Enable verbose logging")
                    .long_help("Enable verbose debug logging. This shows the execution path chosen \
                              for every command and the output of control actions."),
            )
            .arg(
                Arg::new("listen")
                    .short('l')
                    .long("listen")
                    .value_name("ADDR")
                    .help("Address the HTTP API listens on")
                    .default_value("0.0.0.0:8080"),
            )
            .arg(
                Arg::new("command-timeout-secs")
                    .long("command-timeout-secs")
                    .value_name("SECS")
                    .value_parser(clap::value_parser!(u64).range(1..))
                    .help("Kill external commands running longer than this")
                    .long_help("Kill external commands (ip, nmcli, systemctl) that run longer than \
                              this many seconds and report them as failed. Disabled by default."),
            )
            .arg(
                Arg::new("hotspot-on-start")
                    .long("hotspot-on-start")
                    .action(clap::ArgAction::SetTrue)
                    .help("Create the Wi-Fi hotspot when the service starts")
                    .long_help("Create the Wi-Fi hotspot when the service starts. A failure is \
                              logged and the service keeps starting. Requires a hotspot password."),
            )
            .arg(
                Arg::new("hotspot-ifname")
                    .long("hotspot-ifname")
                    .value_name("IFNAME")
                    .help("Wi-Fi interface carrying the hotspot")
                    .default_value(DEFAULT_HOTSPOT_IFNAME),
            )
            .arg(
                Arg::new("hotspot-connection")
                    .long("hotspot-connection")
                    .value_name("NAME")
                    .help("NetworkManager connection name of the hotspot")
                    .default_value(DEFAULT_HOTSPOT_CONNECTION),
            )
            .arg(
                Arg::new("hotspot-ssid")
                    .long("hotspot-ssid")
                    .value_name("SSID")
                    .help("SSID broadcast by the hotspot")
                    .default_value(DEFAULT_HOTSPOT_SSID),
            )
            .arg(
                Arg::new("hotspot-password")
                    .long("hotspot-password")
                    .value_name("PASSWORD")
                    .env(HOTSPOT_PASSWORD_ENV)
                    .hide_env_values(true)
                    .help("WPA2 passphrase of the hotspot (8 to 63 characters)"),
            )
            .arg(
                Arg::new("bridge-name")
                    .long("bridge-name")
                    .value_name("NAME")
                    .help("Name of the bridge created by POST /bridge")
                    .default_value(DEFAULT_BRIDGE_NAME),
            )
            .arg(
                Arg::new("bridge-members")
                    .long("bridge-members")
                    .value_name("IF1,IF2")
                    .action(clap::ArgAction::Append)
                    .value_delimiter(',')
                    .help("The two Ethernet interfaces to bridge (comma-separated)")
                    .default_values(DEFAULT_BRIDGE_MEMBERS),
            )
    }

    /// Validate CLI configuration
    pub fn validate(&self) -> Result<()> {
        self.listen.parse::<SocketAddr>().map_err(|e| {
            anyhow::anyhow!("Invalid listen address '{}': {}", self.listen, e)
        })?;

        for (option, value) in [
            ("hotspot-ifname", &self.hotspot_ifname),
            ("hotspot-connection", &self.hotspot_connection),
            ("hotspot-ssid", &self.hotspot_ssid),
            ("bridge-name", &self.bridge_name),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("--{} cannot be empty", option));
            }
        }

        match self.bridge_members.as_slice() {
            [a, b] if !a.is_empty() && !b.is_empty() && a != b => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "--bridge-members needs exactly two distinct interface names, got {:?}",
                    self.bridge_members
                ));
            }
        }

        if self.hotspot_on_start && self.hotspot_password.is_none() {
            return Err(anyhow::anyhow!(
                "--hotspot-on-start requires --hotspot-password or {}",
                HOTSPOT_PASSWORD_ENV
            ));
        }

        Ok(())
    }
}
