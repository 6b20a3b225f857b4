//! A single VTY socket session.
//!
//! A [`Connection`] is created unconnected. `connect` dials the daemon's
//! Unix socket, `close` drops it again; the presence of the stream is the
//! only connected/disconnected state. Every `execute` sends one
//! NUL-terminated command and reads one framed response under a single
//! deadline.

use crate::config::DEFAULT_TIMEOUT;
use crate::error::{Result, VtyError};
use crate::frame::{self, deadline_exceeded};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

/// Connection to one daemon's VTY socket.
#[derive(Debug)]
pub struct Connection {
    socket_path: PathBuf,
    /// Default per-call timeout when no deadline is given
    timeout: Duration,
    stream: Option<UnixStream>,
}

impl Connection {
    /// Create a connection for `socket_path`. Nothing is dialed yet.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self::with_timeout(socket_path, DEFAULT_TIMEOUT)
    }

    /// Like [`Connection::new`] with a custom default timeout.
    pub fn with_timeout(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
            stream: None,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Dial the socket, bounded by `deadline` if one is given.
    ///
    /// Connecting again replaces the current stream.
    pub async fn connect(&mut self, deadline: Option<Instant>) -> Result<()> {
        let dial = UnixStream::connect(&self.socket_path);
        let result = match deadline {
            Some(deadline) => timeout_at(deadline, dial)
                .await
                .unwrap_or_else(|_| Err(deadline_exceeded())),
            None => dial.await,
        };

        let stream = result.map_err(|source| VtyError::Dial {
            path: self.socket_path.clone(),
            source,
        })?;

        debug!("Connected to {}", self.socket_path.display());
        self.stream = Some(stream);
        Ok(())
    }

    /// Close the socket. Safe to call when not connected.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        debug!("Closing {}", self.socket_path.display());
        match stream.shutdown().await {
            Ok(()) => Ok(()),
            // Peer already hung up; the descriptor is released on drop either way.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(source) => Err(VtyError::Close {
                path: self.socket_path.clone(),
                source,
            }),
        }
    }

    /// Run one command and return its plaintext output.
    ///
    /// The command bytes are sent as-is. `deadline` covers the write and
    /// every read; without one the connection's default timeout applies
    /// from now. Only `CMD_SUCCESS`, `CMD_WARNING` and `CMD_SUCCESS_DAEMON`
    /// are accepted, any other status is returned as
    /// [`VtyError::Rejected`] with the output attached.
    pub async fn execute(&mut self, command: impl AsRef<[u8]>, deadline: Option<Instant>) -> Result<Vec<u8>> {
        let command = command.as_ref();
        let Some(stream) = self.stream.as_mut() else {
            return Err(VtyError::NotConnected {
                path: self.socket_path.clone(),
            });
        };

        // Errors and logs carry a printable copy; the wire gets the raw bytes.
        let label = String::from_utf8_lossy(command);

        let deadline = deadline.unwrap_or_else(|| Instant::now() + self.timeout);
        if deadline <= Instant::now() {
            return Err(VtyError::Write {
                command: label.into_owned(),
                path: self.socket_path.clone(),
                source: deadline_exceeded(),
            });
        }

        let written = timeout_at(deadline, frame::write_command(stream, command))
            .await
            .unwrap_or_else(|_| Err(deadline_exceeded()));
        if let Err(source) = written {
            return Err(VtyError::Write {
                command: label.into_owned(),
                path: self.socket_path.clone(),
                source,
            });
        }

        let response = match frame::read_frame(stream, deadline).await {
            Ok(response) => response,
            Err(failure) => {
                return Err(VtyError::Read {
                    command: label.into_owned(),
                    path: self.socket_path.clone(),
                    output: failure.partial,
                    source: failure.source,
                });
            }
        };

        debug!(
            "{} on {}: {} ({} bytes)",
            label,
            self.socket_path.display(),
            response.status,
            response.plaintext.len()
        );

        if !response.status.is_accepted() {
            warn!(
                "Command {:?} rejected by {}: {}",
                label,
                self.socket_path.display(),
                response.status
            );
            return Err(VtyError::Rejected {
                command: label.into_owned(),
                path: self.socket_path.clone(),
                status: response.status,
                output: response.plaintext,
            });
        }

        Ok(response.plaintext)
    }

    /// Apply newline-separated configuration commands.
    ///
    /// Runs `enable` and `configure`, each non-blank trimmed line, then
    /// `exit` and `disable`, stopping at the first failure. After an error
    /// the session is left in an unknown CLI mode and should be closed.
    pub async fn apply_config(&mut self, config: &[u8], deadline: Option<Instant>) -> Result<()> {
        for cmd in ["enable", "configure"] {
            self.execute(cmd, deadline)
                .await
                .map_err(|e| VtyError::sequence(format!("could not run {} command", cmd), e))?;
        }

        for line in config.split(|b| *b == b'\n') {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            self.execute(line, deadline).await.map_err(|e| {
                VtyError::sequence(
                    format!(
                        "exec command '{}' on frr socket {} while applying config",
                        String::from_utf8_lossy(line),
                        self.socket_path.display()
                    ),
                    e,
                )
            })?;
        }

        for cmd in ["exit", "disable"] {
            self.execute(cmd, deadline)
                .await
                .map_err(|e| VtyError::sequence(format!("could not run {} command", cmd), e))?;
        }
        Ok(())
    }

    /// Fetch the daemon's running configuration (`do write terminal`).
    ///
    /// After an error the session should be closed.
    pub async fn show_running_config(&mut self, deadline: Option<Instant>) -> Result<Vec<u8>> {
        self.execute("enable", deadline)
            .await
            .map_err(|e| VtyError::sequence("show running config `enable` command", e))?;

        // analog of 'show running-config'
        let config = self
            .execute("do write terminal", deadline)
            .await
            .map_err(|e| VtyError::sequence("show running config `do write terminal` command", e))?;

        self.execute("disable", deadline)
            .await
            .map_err(|e| VtyError::sequence("show running config `disable` command", e))?;

        Ok(config)
    }
}
