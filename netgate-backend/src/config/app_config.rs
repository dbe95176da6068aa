//! Application configuration management for the netgate backend.
//!
//! This module turns the parsed CLI into typed settings (listen address,
//! command timeout, hotspot and bridge parameters) and owns logging setup.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use super::cli::CliConfig;
use crate::control::{BridgeConfig, HOTSPOT_PASSWORD_LEN, HotspotConfig};

/// Default HTTP listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Dependencies whose logs are capped unless explicitly requested.
const NOISY_TARGETS: &str = "hyper=warn,hyper_util=warn,h2=warn";

/// Request tracing, capped unless verbose.
const HTTP_TRACE_TARGET: &str = "tower_http=warn";

/// Log level enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub listen: SocketAddr,
    /// `None` lets commands run as long as they need
    pub command_timeout: Option<Duration>,
    pub hotspot_on_start: bool,
    pub hotspot: HotspotConfig,
    pub bridge: BridgeConfig,
}

impl AppConfig {
    /// Create application configuration from CLI config
    pub fn from_cli(cli_config: &CliConfig) -> Result<Self> {
        let log_level = if cli_config.verbose {
            LogLevel::Debug
        } else {
            match env::var("RUST_LOG") {
                Ok(level_str) => Self::parse_log_level(&level_str),
                Err(_) => LogLevel::Info,
            }
        };

        let listen = cli_config.listen.parse::<SocketAddr>().map_err(|e| {
            anyhow::anyhow!("Invalid listen address '{}': {}", cli_config.listen, e)
        })?;

        let members = match cli_config.bridge_members.as_slice() {
            [a, b] => [a.clone(), b.clone()],
            other => {
                return Err(anyhow::anyhow!(
                    "Expected two bridge members, got {}",
                    other.len()
                ));
            }
        };

        Ok(Self {
            log_level,
            listen,
            command_timeout: cli_config.command_timeout_secs.map(Duration::from_secs),
            hotspot_on_start: cli_config.hotspot_on_start,
            hotspot: HotspotConfig {
                ifname: cli_config.hotspot_ifname.clone(),
                connection: cli_config.hotspot_connection.clone(),
                ssid: cli_config.hotspot_ssid.clone(),
                password: cli_config.hotspot_password.clone(),
            },
            bridge: BridgeConfig {
                name: cli_config.bridge_name.clone(),
                members,
            },
        })
    }

    /// Parse log level from string
    fn parse_log_level(level_str: &str) -> LogLevel {
        // Only the global directive of a RUST_LOG value counts
        let main_level = level_str
            .split(',')
            .next()
            .unwrap_or(level_str)
            .split('=')
            .next()
            .unwrap_or(level_str)
            .to_lowercase();

        match main_level.as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    /// Filter directives for the subscriber, given the current `RUST_LOG`.
    fn log_filter(&self, rust_log: Option<&str>) -> String {
        let verbose = self.log_level == LogLevel::Debug;
        let base = match rust_log {
            Some(existing) if !existing.is_empty() && !verbose => existing,
            _ => self.log_level.to_filter_string(),
        };

        if verbose {
            format!("{},{}", base, NOISY_TARGETS)
        } else {
            format!("{},{},{}", base, NOISY_TARGETS, HTTP_TRACE_TARGET)
        }
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        let rust_log = env::var("RUST_LOG").ok();
        let filter = EnvFilter::try_new(self.log_filter(rust_log.as_deref()))
            .map_err(|e| anyhow::anyhow!("Invalid log filter: {}", e))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true)
            .event_format(
                tracing_subscriber::fmt::format()
                    .with_target(false)
                    .compact(),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        tracing::info!("Logging initialized with level: {:?}", self.log_level);
        Ok(())
    }

    /// Validate application configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(password) = &self.hotspot.password {
            let len = password.chars().count();
            if !HOTSPOT_PASSWORD_LEN.contains(&len) {
                return Err(anyhow::anyhow!(
                    "Hotspot password must be {} to {} characters long, got {}",
                    HOTSPOT_PASSWORD_LEN.start(),
                    HOTSPOT_PASSWORD_LEN.end(),
                    len
                ));
            }
        } else if self.hotspot_on_start {
            return Err(anyhow::anyhow!(
                "Hotspot on start is enabled but no hotspot password is configured"
            ));
        }

        let [a, b] = &self.bridge.members;
        if a.is_empty() || b.is_empty() || a == b {
            return Err(anyhow::anyhow!(
                "Bridge members must be two distinct interfaces, got '{}' and '{}'",
                a,
                b
            ));
        }

        if self.bridge.name.is_empty() {
            return Err(anyhow::anyhow!("Bridge name cannot be empty"));
        }

        if self.command_timeout == Some(Duration::ZERO) {
            return Err(anyhow::anyhow!("Command timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// Builder pattern for AppConfig
pub struct AppConfigBuilder {
    log_level: Option<LogLevel>,
    listen: Option<SocketAddr>,
    command_timeout: Option<Duration>,
    hotspot_on_start: Option<bool>,
    hotspot: Option<HotspotConfig>,
    bridge: Option<BridgeConfig>,
}

impl AppConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            log_level: None,
            listen: None,
            command_timeout: None,
            hotspot_on_start: None,
            hotspot: None,
            bridge: None,
        }
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set listen address
    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.listen = Some(addr);
        self
    }

    /// Set command timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Set hotspot on start flag
    pub fn hotspot_on_start(mut self, enabled: bool) -> Self {
        self.hotspot_on_start = Some(enabled);
        self
    }

    /// Set hotspot settings
    pub fn hotspot(mut self, hotspot: HotspotConfig) -> Self {
        self.hotspot = Some(hotspot);
        self
    }

    /// Set bridge settings
    pub fn bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig> {
        let listen = match self.listen {
            Some(addr) => addr,
            None => DEFAULT_LISTEN
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid default listen address: {}", e))?,
        };

        let config = AppConfig {
            log_level: self.log_level.unwrap_or(LogLevel::Info),
            listen,
            command_timeout: self.command_timeout,
            hotspot_on_start: self.hotspot_on_start.unwrap_or(false),
            hotspot: self.hotspot.unwrap_or_default(),
            bridge: self.bridge.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_config() -> CliConfig {
        CliConfig {
            verbose: false,
            listen: "127.0.0.1:8080".to_string(),
            command_timeout_secs: Some(10),
            hotspot_on_start: false,
            hotspot_ifname: "wlan0".to_string(),
            hotspot_connection: "Hotspot".to_string(),
            hotspot_ssid: "Entreprise".to_string(),
            hotspot_password: Some("correct-horse".to_string()),
            bridge_name: "br0".to_string(),
            bridge_members: vec!["eth0".to_string(), "eth1".to_string()],
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(AppConfig::parse_log_level("info"), LogLevel::Info);
        assert_eq!(AppConfig::parse_log_level("debug"), LogLevel::Debug);
        assert_eq!(AppConfig::parse_log_level("warn"), LogLevel::Warn);
        assert_eq!(AppConfig::parse_log_level("error"), LogLevel::Error);
        assert_eq!(AppConfig::parse_log_level("trace"), LogLevel::Trace);
        assert_eq!(AppConfig::parse_log_level("invalid"), LogLevel::Info);
    }

    #[test]
    fn test_log_level_complex_parsing() {
        assert_eq!(
            AppConfig::parse_log_level("info,tower_http=debug,hyper=warn"),
            LogLevel::Info
        );
        assert_eq!(
            AppConfig::parse_log_level("debug,some_crate=info"),
            LogLevel::Debug
        );
    }

    #[test]
    fn test_log_filter() {
        let mut config = AppConfigBuilder::new().build().unwrap();

        assert_eq!(
            config.log_filter(None),
            format!("info,{},tower_http=warn", NOISY_TARGETS)
        );
        assert_eq!(
            config.log_filter(Some("warn,netgate_backend=debug")),
            format!("warn,netgate_backend=debug,{},tower_http=warn", NOISY_TARGETS)
        );

        // --verbose wins over RUST_LOG and lets request traces through
        config.log_level = LogLevel::Debug;
        let verbose = config.log_filter(Some("warn"));
        assert_eq!(verbose, format!("debug,{}", NOISY_TARGETS));
        assert!(!verbose.contains("tower_http"));
        assert!(verbose.contains("hyper=warn"));
    }

    #[test]
    fn test_app_config_from_cli() {
        let app_config = AppConfig::from_cli(&cli_config()).unwrap();

        assert_eq!(app_config.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(app_config.command_timeout, Some(Duration::from_secs(10)));
        assert_eq!(app_config.hotspot.ssid, "Entreprise");
        assert_eq!(
            app_config.hotspot.password.as_deref(),
            Some("correct-horse")
        );
        assert_eq!(app_config.bridge.name, "br0");
        assert_eq!(app_config.bridge.members, ["eth0", "eth1"]);
        assert!(app_config.validate().is_ok());
    }

    #[test]
    fn test_app_config_from_cli_verbose() {
        let cli = CliConfig {
            verbose: true,
            command_timeout_secs: None,
            ..cli_config()
        };

        let app_config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(app_config.log_level, LogLevel::Debug);
        assert!(app_config.command_timeout.is_none());
    }

    #[test]
    fn test_app_config_from_cli_rejects_bad_members() {
        let cli = CliConfig {
            bridge_members: vec!["eth0".to_string()],
            ..cli_config()
        };
        assert!(AppConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn test_app_config_validation_password_length() {
        let too_long = "x".repeat(64);
        for password in ["short", too_long.as_str()] {
            let config = AppConfig::from_cli(&CliConfig {
                hotspot_password: Some(password.to_string()),
                ..cli_config()
            })
            .unwrap();
            assert!(config.validate().is_err());
        }

        let config = AppConfig::from_cli(&CliConfig {
            hotspot_password: Some("x".repeat(63)),
            ..cli_config()
        })
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_validation_hotspot_on_start() {
        let config = AppConfig::from_cli(&CliConfig {
            hotspot_on_start: true,
            hotspot_password: None,
            ..cli_config()
        })
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_config_validation_duplicate_members() {
        let result = AppConfigBuilder::new()
            .bridge(BridgeConfig {
                name: "br0".to_string(),
                members: ["eth0".to_string(), "eth0".to_string()],
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_app_config_builder() {
        let config = AppConfigBuilder::new()
            .log_level(LogLevel::Debug)
            .listen("127.0.0.1:3000".parse().unwrap())
            .command_timeout(Duration::from_secs(5))
            .hotspot_on_start(true)
            .hotspot(HotspotConfig {
                password: Some("correct-horse".to_string()),
                ..Default::default()
            })
            .build()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.listen.port(), 3000);
        assert_eq!(config.command_timeout, Some(Duration::from_secs(5)));
        assert!(config.hotspot_on_start);
    }

    #[test]
    fn test_app_config_builder_defaults() {
        let config = AppConfigBuilder::new().build().unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.listen, DEFAULT_LISTEN.parse().unwrap());
        assert!(config.command_timeout.is_none());
        assert!(!config.hotspot_on_start);
        assert_eq!(config.hotspot, HotspotConfig::default());
        assert_eq!(config.bridge, BridgeConfig::default());
    }

    #[test]
    fn test_app_config_builder_rejects_zero_timeout() {
        let result = AppConfigBuilder::new()
            .command_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }
}
