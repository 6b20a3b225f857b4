//! vty-core: Client for the VTY management sockets exposed by FRR daemons.
//!
//! This crate provides:
//! - Framing for the NUL-terminated command / trailer-terminated response protocol
//! - [`Connection`]: one session to one daemon socket, with per-call deadlines
//! - [`Sockets`]: the BGP, BFD, Mgmt and Zebra sockets managed as a set,
//!   including an atomic merged dump of their running configuration
//!
//! Command output is returned as opaque bytes.

pub mod atomic;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod sockets;
pub mod status;

pub use config::{ConfigError, DEFAULT_FRR_CONFIG_MODE, DEFAULT_TIMEOUT, VtyConfig};
pub use connection::Connection;
pub use error::{AtomicWriteError, JoinedErrors, Result, VtyError};
pub use sockets::{Daemon, Sockets, UnknownDaemon};
pub use status::StatusCode;
