pub mod connection;
pub mod host;
pub mod protocol;
pub mod session;
pub mod shell;
pub mod sync;

pub use connection::{AdbStream, Connection};
pub use host::{DeviceConnection, HostTransport};
pub use protocol::{ReplyStatus, ShellMessage, ShellMessageType};
pub use session::{PipeReader, PipeWriter, Session, SessionCloser, ShellOutput};
pub use sync::{DirectoryEntry, FileStat, SyncTransport};

// Re-export commonly used types
pub use crate::error::Result;
