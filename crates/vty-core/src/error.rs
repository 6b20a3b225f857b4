//! Error types for VTY operations.

use crate::status::StatusCode;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VtyError {
    #[error("connection is not established for socket {}", .path.display())]
    NotConnected { path: PathBuf },

    #[error("dial socket {}: {source}", .path.display())]
    Dial {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write {command:?} to socket {}: {source}", .path.display())]
    Write {
        command: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read response to {command:?} from socket {}: {source}", .path.display())]
    Read {
        command: String,
        path: PathBuf,
        /// Plaintext received before the failure.
        output: Vec<u8>,
        #[source]
        source: io::Error,
    },

    #[error("not acceptable status code, command {command:?} on socket {}: {status}", .path.display())]
    Rejected {
        command: String,
        path: PathBuf,
        status: StatusCode,
        output: Vec<u8>,
    },

    #[error("socket connection close {}: {source}", .path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A multi-command sequence stopped at `step`.
    #[error("{step}: {source}")]
    Sequence {
        step: String,
        #[source]
        source: Box<VtyError>,
    },

    #[error(transparent)]
    File(#[from] AtomicWriteError),

    #[error(transparent)]
    Joined(#[from] JoinedErrors),
}

pub type Result<T> = std::result::Result<T, VtyError>;

impl VtyError {
    pub(crate) fn sequence(step: impl Into<String>, source: VtyError) -> Self {
        Self::Sequence {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Daemon output attached to the error, if any.
    ///
    /// Set for rejected commands and for reads that failed part-way.
    pub fn output(&self) -> Option<&[u8]> {
        match self {
            Self::Read { output, .. } | Self::Rejected { output, .. } => Some(output.as_slice()),
            Self::Sequence { source, .. } => source.output(),
            _ => None,
        }
    }

    /// Status code of a rejected command, looking through sequences.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Sequence { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether the call ran into its deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Dial { source, .. } | Self::Write { source, .. } | Self::Read { source, .. } => {
                source.kind() == io::ErrorKind::TimedOut
            }
            Self::Sequence { source, .. } => source.is_timeout(),
            Self::Joined(joined) => joined.errors().iter().any(VtyError::is_timeout),
            _ => false,
        }
    }
}

/// Failure of an atomic temp-write-then-rename.
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("writing temporary file {}: {source}", .path.display())]
    WriteTemp {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("renaming temporary file {} to destination file {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Several independent failures reported together.
#[derive(Debug, Default)]
pub struct JoinedErrors {
    errors: Vec<VtyError>,
}

impl JoinedErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the error from `result`, if any.
    pub fn push_result(&mut self, result: Result<()>) {
        if let Err(e) = result {
            self.push(e);
        }
    }

    /// Record an error; nested joins are flattened.
    pub fn push(&mut self, err: VtyError) {
        match err {
            VtyError::Joined(inner) => self.errors.extend(inner.errors),
            other => self.errors.push(other),
        }
    }

    pub fn errors(&self) -> &[VtyError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` if nothing was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(VtyError::Joined(self))
        }
    }
}

impl fmt::Display for JoinedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinedErrors {}

impl IntoIterator for JoinedErrors {
    type Item = VtyError;
    type IntoIter = std::vec::IntoIter<VtyError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
