//! Command status codes returned in the response trailer.
//!
//! Values follow FRR's `lib/command.h`, in declaration order.

use std::fmt;

/// Outcome of a single VTY command, carried as the last byte of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    Warning,
    ErrNoMatch,
    ErrAmbiguous,
    ErrIncomplete,
    ErrExeedArgcMax,
    ErrNothingTodo,
    CompleteFullMatch,
    CompleteMatch,
    CompleteListMatch,
    SuccessDaemon,
    ErrNoFile,
    Suspend,
    WarningConfigFailed,
    NotMyInstance,
    NoLevelUp,
    ErrNoDaemon,
    /// A byte outside the known range; kept so it can still be reported.
    Unknown(u8),
}

/// Label used for bytes that don't map to a known status.
pub const UNKNOWN_STATUS: &str = "unknown status code";

impl StatusCode {
    /// Returns the FRR mnemonic (e.g. `CMD_SUCCESS`).
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Success => "CMD_SUCCESS",
            Self::Warning => "CMD_WARNING",
            Self::ErrNoMatch => "CMD_ERR_NO_MATCH",
            Self::ErrAmbiguous => "CMD_ERR_AMBIGUOUS",
            Self::ErrIncomplete => "CMD_ERR_INCOMPLETE",
            Self::ErrExeedArgcMax => "CMD_ERR_EXEED_ARGC_MAX",
            Self::ErrNothingTodo => "CMD_ERR_NOTHING_TODO",
            Self::CompleteFullMatch => "CMD_COMPLETE_FULL_MATCH",
            Self::CompleteMatch => "CMD_COMPLETE_MATCH",
            Self::CompleteListMatch => "CMD_COMPLETE_LIST_MATCH",
            Self::SuccessDaemon => "CMD_SUCCESS_DAEMON",
            Self::ErrNoFile => "CMD_ERR_NO_FILE",
            Self::Suspend => "CMD_SUSPEND",
            Self::WarningConfigFailed => "CMD_WARNING_CONFIG_FAILED",
            Self::NotMyInstance => "CMD_NOT_MY_INSTANCE",
            Self::NoLevelUp => "CMD_NO_LEVEL_UP",
            Self::ErrNoDaemon => "CMD_ERR_NO_DAEMON",
            Self::Unknown(_) => UNKNOWN_STATUS,
        }
    }

    /// Raw wire value.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Warning => 1,
            Self::ErrNoMatch => 2,
            Self::ErrAmbiguous => 3,
            Self::ErrIncomplete => 4,
            Self::ErrExeedArgcMax => 5,
            Self::ErrNothingTodo => 6,
            Self::CompleteFullMatch => 7,
            Self::CompleteMatch => 8,
            Self::CompleteListMatch => 9,
            Self::SuccessDaemon => 10,
            Self::ErrNoFile => 11,
            Self::Suspend => 12,
            Self::WarningConfigFailed => 13,
            Self::NotMyInstance => 14,
            Self::NoLevelUp => 15,
            Self::ErrNoDaemon => 16,
            Self::Unknown(b) => *b,
        }
    }

    /// Whether a command with this status counts as executed.
    ///
    /// Mirrors the check vtysh does in `vtysh_execute_no_pager`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Success | Self::Warning | Self::SuccessDaemon)
    }
}

impl From<u8> for StatusCode {
    fn from(b: u8) -> Self {
        match b {
            0 => Self::Success,
            1 => Self::Warning,
            2 => Self::ErrNoMatch,
            3 => Self::ErrAmbiguous,
            4 => Self::ErrIncomplete,
            5 => Self::ErrExeedArgcMax,
            6 => Self::ErrNothingTodo,
            7 => Self::CompleteFullMatch,
            8 => Self::CompleteMatch,
            9 => Self::CompleteListMatch,
            10 => Self::SuccessDaemon,
            11 => Self::ErrNoFile,
            12 => Self::Suspend,
            13 => Self::WarningConfigFailed,
            14 => Self::NotMyInstance,
            15 => Self::NoLevelUp,
            16 => Self::ErrNoDaemon,
            other => Self::Unknown(other),
        }
    }
}

impl From<StatusCode> for u8 {
    fn from(sc: StatusCode) -> Self {
        sc.as_u8()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
