//! The set of FRR daemon sockets managed together.

use crate::atomic::atomic_write;
use crate::config::{DEFAULT_TIMEOUT, VtyConfig};
use crate::connection::Connection;
use crate::error::{JoinedErrors, Result, VtyError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// FRR daemons reachable over a VTY socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Daemon {
    Bgp,
    Bfd,
    Mgmt,
    Zebra,
}

impl Daemon {
    /// Bulk order used by connect, close and dump.
    pub const ALL: [Daemon; 4] = [Daemon::Bgp, Daemon::Bfd, Daemon::Mgmt, Daemon::Zebra];

    pub fn socket_name(&self) -> &'static str {
        match self {
            Self::Bgp => "bgpd.vty",
            Self::Bfd => "bfdd.vty",
            Self::Mgmt => "mgmtd.vty",
            Self::Zebra => "zebra.vty",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bgp => "bgp",
            Self::Bfd => "bfd",
            Self::Mgmt => "mgmt",
            Self::Zebra => "zebra",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Bgp => 0,
            Self::Bfd => 1,
            Self::Mgmt => 2,
            Self::Zebra => 3,
        }
    }
}

impl fmt::Display for Daemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown daemon {0:?} (expected bgp, bfd, mgmt or zebra)")]
pub struct UnknownDaemon(String);

impl FromStr for Daemon {
    type Err = UnknownDaemon;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bgp" | "bgpd" => Ok(Self::Bgp),
            "bfd" | "bfdd" => Ok(Self::Bfd),
            "mgmt" | "mgmtd" => Ok(Self::Mgmt),
            "zebra" => Ok(Self::Zebra),
            _ => Err(UnknownDaemon(s.to_string())),
        }
    }
}

/// Connections to the BGP, BFD, Mgmt and Zebra sockets.
///
/// Connections are stored once, indexed by [`Daemon`]; the named helpers
/// and the bulk operations reach the same instances.
#[derive(Debug)]
pub struct Sockets {
    connections: [Connection; 4],
    frr_config_path: PathBuf,
    config_mode: u32,
}

impl Sockets {
    /// Build unconnected sockets under `frr_run_dir`.
    pub fn new(frr_config_path: impl Into<PathBuf>, frr_run_dir: impl AsRef<Path>) -> Self {
        Self::with_timeout(frr_config_path, frr_run_dir, DEFAULT_TIMEOUT)
    }

    /// Like [`Sockets::new`] with a custom per-command timeout.
    pub fn with_timeout(
        frr_config_path: impl Into<PathBuf>,
        frr_run_dir: impl AsRef<Path>,
        timeout: Duration,
    ) -> Self {
        let run_dir = frr_run_dir.as_ref();
        let connections =
            Daemon::ALL.map(|d| Connection::with_timeout(run_dir.join(d.socket_name()), timeout));

        Self {
            connections,
            frr_config_path: frr_config_path.into(),
            config_mode: crate::config::DEFAULT_FRR_CONFIG_MODE,
        }
    }

    pub fn from_config(config: &VtyConfig) -> Self {
        let mut sockets = Self::with_timeout(&config.config_path, &config.run_dir, config.timeout);
        sockets.config_mode = config.config_mode;
        sockets
    }

    pub fn config_path(&self) -> &Path {
        &self.frr_config_path
    }

    pub fn connection(&self, daemon: Daemon) -> &Connection {
        &self.connections[daemon.index()]
    }

    pub fn connection_mut(&mut self, daemon: Daemon) -> &mut Connection {
        &mut self.connections[daemon.index()]
    }

    /// All connections in bulk order.
    pub fn connections(&self) -> impl Iterator<Item = (Daemon, &Connection)> {
        Daemon::ALL.into_iter().zip(self.connections.iter())
    }

    /// Connect every socket.
    ///
    /// Every dial is attempted. If any fails, all sockets are closed again
    /// and every failure (including close failures) is returned.
    pub async fn connect(&mut self, deadline: Option<Instant>) -> Result<()> {
        let mut errors = JoinedErrors::new();
        for conn in &mut self.connections {
            errors.push_result(conn.connect(deadline).await);
        }

        if errors.is_empty() {
            return Ok(());
        }

        debug!("Connect failed for {} socket(s), closing all", errors.len());
        if let Err(e) = self.close().await {
            errors.push(e);
        }
        errors.into_result()
    }

    /// Close every socket, continuing past failures.
    pub async fn close(&mut self) -> Result<()> {
        let mut errors = JoinedErrors::new();
        for conn in &mut self.connections {
            errors.push_result(conn.close().await);
        }
        errors.into_result()
    }

    /// Run a command on `daemon`'s socket.
    pub async fn execute(
        &mut self,
        daemon: Daemon,
        cmd: impl AsRef<[u8]>,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>> {
        self.connection_mut(daemon).execute(cmd, deadline).await
    }

    pub async fn execute_bgp(&mut self, cmd: impl AsRef<[u8]>, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.execute(Daemon::Bgp, cmd, deadline).await
    }

    pub async fn execute_bfd(&mut self, cmd: impl AsRef<[u8]>, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.execute(Daemon::Bfd, cmd, deadline).await
    }

    pub async fn execute_mgmt(&mut self, cmd: impl AsRef<[u8]>, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.execute(Daemon::Mgmt, cmd, deadline).await
    }

    pub async fn execute_zebra(&mut self, cmd: impl AsRef<[u8]>, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.execute(Daemon::Zebra, cmd, deadline).await
    }

    /// Pass newline-separated configuration to `daemon`.
    pub async fn apply_config(&mut self, daemon: Daemon, config: &[u8], deadline: Option<Instant>) -> Result<()> {
        self.connection_mut(daemon).apply_config(config, deadline).await
    }

    pub async fn apply_bgp_config(&mut self, config: &[u8], deadline: Option<Instant>) -> Result<()> {
        self.apply_config(Daemon::Bgp, config, deadline).await
    }

    pub async fn apply_mgmt_config(&mut self, config: &[u8], deadline: Option<Instant>) -> Result<()> {
        self.apply_config(Daemon::Mgmt, config, deadline).await
    }

    pub async fn show_running_config(&mut self, daemon: Daemon, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.connection_mut(daemon).show_running_config(deadline).await
    }

    pub async fn show_running_config_bgp(&mut self, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.show_running_config(Daemon::Bgp, deadline).await
    }

    pub async fn show_running_config_mgmt(&mut self, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.show_running_config(Daemon::Mgmt, deadline).await
    }

    /// Collect every daemon's running configuration and atomically write
    /// the merged result to `dst_file` with `mode` permissions.
    ///
    /// Each section is preceded by `! <socket path>`. If any daemon fails,
    /// nothing is written.
    pub async fn dump_running_config(&mut self, dst_file: &Path, mode: u32, deadline: Option<Instant>) -> Result<()> {
        let mut merged = Vec::new();
        for (daemon, conn) in Daemon::ALL.into_iter().zip(self.connections.iter_mut()) {
            let resp = conn
                .show_running_config(deadline)
                .await
                .map_err(|e| VtyError::sequence(format!("show running config for {}", daemon), e))?;

            merged.extend_from_slice(format!("! {}\n", conn.socket_path().display()).as_bytes());
            merged.extend_from_slice(&resp);
        }

        atomic_write(dst_file, &merged, mode).await?;
        info!("Wrote running config ({} bytes) to {}", merged.len(), dst_file.display());
        Ok(())
    }

    /// Dump the running configuration to the configured config path.
    pub async fn save_running_config(&mut self, deadline: Option<Instant>) -> Result<()> {
        let dst = self.frr_config_path.clone();
        let mode = self.config_mode;
        self.dump_running_config(&dst, mode, deadline).await
    }
}
