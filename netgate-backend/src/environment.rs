//! Runtime environment detection.
//!
//! Answers two questions for the [`ExecutionContextResolver`]:
//!
//! 1. Is the backend running inside a container? Decided by the presence of
//!    the `/.dockerenv` marker that Docker-compatible runtimes create.
//! 2. Does that container share the host's network namespace? Decided by
//!    comparing the identity (device + inode) of `/proc/self/ns/net` with
//!    `/proc/1/ns/net`. Only when those links cannot be inspected does the
//!    detector fall back to guessing from interface names.
//!
//! [`ExecutionContextResolver`]: crate::execution::ExecutionContextResolver

use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::sys::stat::stat;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::execution::{BoxFuture, CommandRunner, CommandSpec};

/// Marker file created by Docker-compatible container runtimes.
pub const CONTAINER_MARKER: &str = "/.dockerenv";

/// Network namespace link of the calling process.
pub const SELF_NET_NAMESPACE: &str = "/proc/self/ns/net";

/// Network namespace link of PID 1.
pub const INIT_NET_NAMESPACE: &str = "/proc/1/ns/net";

/// Interface name fragments the fallback heuristic treats as host-only.
///
/// Substring matches, so `vlan` also hits `vlan10` and `eth1` hits `eth10`.
pub const HOST_INTERFACE_HINTS: [&str; 4] = ["wlan0", "eth1", "vlan", "br0"];

/// Errors raised while identifying a network namespace.
#[derive(Error, Debug)]
pub enum NamespaceError {
    #[error("Failed to inspect namespace {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
}

/// Identity of a network namespace (device and inode of its nsfs entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId {
    pub device: u64,
    pub inode: u64,
}

impl NamespaceId {
    /// Reads the identity of the namespace behind `path`.
    pub fn of(path: &Path) -> Result<Self, NamespaceError> {
        let st = stat(path).map_err(|source| NamespaceError::Inspect {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            device: u64::from(st.st_dev),
            inode: u64::from(st.st_ino),
        })
    }
}

/// Answers the questions the execution resolver needs about the runtime.
pub trait Environment: Send + Sync {
    /// Whether the process runs inside a container.
    fn is_containerized(&self) -> bool;

    /// Whether the process already sees the host's network namespace.
    ///
    /// Never fails: anything inconclusive counts as "isolated".
    fn looks_like_host_network(&self) -> BoxFuture<'_, bool>;
}

/// Returns true if an interface listing mentions a host-typical interface.
pub fn has_host_interface_hint(listing: &str) -> bool {
    HOST_INTERFACE_HINTS
        .iter()
        .any(|hint| listing.contains(hint))
}

/// [`Environment`] backed by the real filesystem and `/proc`.
pub struct EnvironmentDetector {
    container_marker: PathBuf,
    self_namespace: PathBuf,
    init_namespace: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl EnvironmentDetector {
    /// Creates a detector using the standard marker and `/proc` paths.
    ///
    /// `runner` is only used by the interface-name fallback, always directly.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_paths(
            runner,
            CONTAINER_MARKER,
            SELF_NET_NAMESPACE,
            INIT_NET_NAMESPACE,
        )
    }

    pub fn with_paths(
        runner: Arc<dyn CommandRunner>,
        container_marker: impl Into<PathBuf>,
        self_namespace: impl Into<PathBuf>,
        init_namespace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            container_marker: container_marker.into(),
            self_namespace: self_namespace.into(),
            init_namespace: init_namespace.into(),
            runner,
        }
    }

    /// Compares our network namespace with PID 1's.
    pub fn shares_init_namespace(&self) -> Result<bool, NamespaceError> {
        let ours = NamespaceId::of(&self.self_namespace)?;
        let init = NamespaceId::of(&self.init_namespace)?;
        debug!("Namespace identities: self={:?} init={:?}", ours, init);
        Ok(ours == init)
    }

    /// Interface-name guess used when namespace identities are unreadable.
    #[instrument(skip(self))]
    async fn guess_from_interface_names(&self) -> bool {
        let command = CommandSpec::new("ip", ["addr", "show"]);
        match self.runner.run(&command).await {
            Ok(output) => {
                let found = has_host_interface_hint(&output.stdout_lossy());
                debug!("Host interface hint found: {}", found);
                found
            }
            Err(e) => {
                debug!("Interface listing failed, assuming isolated namespace: {}", e);
                false
            }
        }
    }
}

impl Environment for EnvironmentDetector {
    fn is_containerized(&self) -> bool {
        self.container_marker.exists()
    }

    fn looks_like_host_network(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.shares_init_namespace() {
                Ok(shared) => shared,
                Err(e) => {
                    warn!("{}; falling back to interface-name heuristic", e);
                    self.guess_from_interface_names().await
                }
            }
        })
    }
}
