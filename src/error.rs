use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::adb::protocol::ReplyStatus;

/// Which of the three standard streams an API call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdStream::Stdin => write!(f, "stdin"),
            StdStream::Stdout => write!(f, "stdout"),
            StdStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Exit status reported by a remote shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    code: u8,
}

impl ExitStatus {
    pub fn new(code: u8) -> Self {
        Self { code }
    }

    /// The remote process's exit code (0-255).
    pub fn code(&self) -> i32 {
        i32::from(self.code)
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Error, Debug)]
pub enum AdbError {
    // Connection errors
    #[error("ADB connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("adb transport: failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("socket connection broken")]
    ConnectionBroken,

    // Protocol violations
    #[error("unknown reply status: {0:?}")]
    UnknownStatus(String),

    #[error("unsupported reply status {0} on host connection")]
    UnsupportedStatus(ReplyStatus),

    #[error("invalid length prefix: {0:?}")]
    InvalidLength(String),

    #[error("peer sent length {len}, limit is {max}")]
    LengthTooLarge { len: usize, max: usize },

    #[error("command too long: {0} bytes (max 65535)")]
    CommandTooLong(usize),

    #[error("unexpected shell message type {0}")]
    UnknownShellMessage(u8),

    #[error("exit message carried no exit code")]
    MalformedExit,

    #[error("sync commands must have length 4, got {0:?}")]
    InvalidSyncCommand(String),

    #[error("sync verify status: unknown status {0:?}")]
    UnknownSyncStatus(String),

    // Remote-reported failures
    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("sync failed: {0}")]
    SyncFailed(String),

    // Shell outcomes
    #[error("unexpected exit code {}", .0.code())]
    Exit(ExitStatus),

    #[error("command exited without exit status")]
    ExitMissing,

    #[error("session aborted before the command completed")]
    SessionAborted,

    // Session misuse
    #[error("start() already called")]
    AlreadyStarted,

    #[error("wait() called before start()")]
    NotStarted,

    #[error("wait() called twice or after close()")]
    AlreadyWaited,

    #[error("{0} already set for this session")]
    StreamAlreadySet(StdStream),

    #[error("{0} pipe requested after start()")]
    PipeAfterStart(StdStream),

    // Facade errors
    #[error("adb shell: command cannot be empty")]
    EmptyCommand,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}", join_messages(.0))]
    Joined(Vec<AdbError>),
}

fn join_messages(errors: &[AdbError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl AdbError {
    /// Merges a primary outcome with a teardown outcome. Neither error is dropped.
    pub fn with_teardown<T>(primary: Result<T>, teardown: Result<()>) -> Result<T> {
        match (primary, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
            (Err(AdbError::Joined(mut errors)), Err(e)) => {
                errors.push(e);
                Err(AdbError::Joined(errors))
            }
            (Err(primary), Err(teardown)) => Err(AdbError::Joined(vec![primary, teardown])),
        }
    }

    pub fn join(primary: Result<()>, teardown: Result<()>) -> Result<()> {
        Self::with_teardown(primary, teardown)
    }

    /// True for faults that leave the connection unusable.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            AdbError::Io(_) | AdbError::Connect { .. } | AdbError::Timeout(_) | AdbError::ConnectionBroken
        )
    }

    /// The remote exit status, if this error (or the primary error of a join) carries one.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            AdbError::Exit(status) => Some(*status),
            AdbError::Joined(errors) => errors.first().and_then(|e| e.exit_status()),
            _ => None,
        }
    }
}

impl From<String> for AdbError {
    fn from(s: String) -> Self {
        AdbError::Parse(s)
    }
}

impl From<std::num::ParseIntError> for AdbError {
    fn from(e: std::num::ParseIntError) -> Self {
        AdbError::Parse(e.to_string())
    }
}

impl From<std::str::Utf8Error> for AdbError {
    fn from(e: std::str::Utf8Error) -> Self {
        AdbError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdbError>;
