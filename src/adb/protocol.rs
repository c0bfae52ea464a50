use crate::error::{AdbError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Largest command the 4-hex-digit length prefix can describe.
pub const MAX_COMMAND_LEN: usize = 0xFFFF;

/// Largest shell v2 payload accepted from a peer.
pub const MAX_SHELL_PAYLOAD: usize = 1024 * 1024;

/// Reject a peer-supplied length above `max` before anything is allocated for it.
pub fn check_length(len: usize, max: usize) -> Result<usize> {
    if len > max {
        return Err(AdbError::LengthTooLarge { len, max });
    }
    Ok(len)
}

/// Four-byte status token sent by the ADB server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Okay,
    Fail,
    Data,
    Done,
}

impl ReplyStatus {
    pub fn as_bytes(&self) -> &'static [u8; 4] {
        match self {
            ReplyStatus::Okay => b"OKAY",
            ReplyStatus::Fail => b"FAIL",
            ReplyStatus::Data => b"DATA",
            ReplyStatus::Done => b"DONE",
        }
    }

    /// Matches a raw token against the known set. Anything else is a protocol violation.
    pub fn from_bytes(raw: &[u8; 4]) -> Result<Self> {
        match raw {
            b"OKAY" => Ok(ReplyStatus::Okay),
            b"FAIL" => Ok(ReplyStatus::Fail),
            b"DATA" => Ok(ReplyStatus::Data),
            b"DONE" => Ok(ReplyStatus::Done),
            _ => Err(AdbError::UnknownStatus(
                String::from_utf8_lossy(raw).into_owned(),
            )),
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens are always ASCII.
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Encode a host command: 4 lowercase hex digits of the byte length, then the bytes.
pub fn encode_host_command(command: &str) -> Result<Bytes> {
    if command.len() > MAX_COMMAND_LEN {
        return Err(AdbError::CommandTooLong(command.len()));
    }
    let mut buf = BytesMut::with_capacity(4 + command.len());
    buf.put_slice(format!("{:04x}", command.len()).as_bytes());
    buf.put_slice(command.as_bytes());
    Ok(buf.freeze())
}

/// Decode a 4-byte hex length prefix.
pub fn decode_hex_length(raw: &[u8; 4]) -> Result<usize> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| AdbError::InvalidLength(String::from_utf8_lossy(raw).into_owned()))?;
    if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AdbError::InvalidLength(text.to_string()));
    }
    usize::from_str_radix(text, 16).map_err(|_| AdbError::InvalidLength(text.to_string()))
}

/// Host-side command builders. These are the strings the facade sends.
pub mod host {
    pub const VERSION: &str = "host:version";
    pub const DEVICES: &str = "host:devices";
    pub const DEVICES_LONG: &str = "host:devices-l";
    pub const KILL: &str = "host:kill";
    pub const LIST_FORWARD: &str = "host:list-forward";
    pub const KILL_FORWARD_ALL: &str = "host:killforward-all";
    pub const DISCONNECT_ALL: &str = "host:disconnect:";
    pub const SYNC: &str = "sync:";

    pub fn transport(serial: &str) -> String {
        format!("host:transport:{}", serial)
    }

    pub fn serial(serial: &str, command: &str) -> String {
        format!("host-serial:{}:{}", serial, command)
    }

    pub fn shell_v2(command: &str) -> String {
        format!("shell,v2,raw:{}", command)
    }

    pub fn shell(command: &str) -> String {
        format!("shell:{}", command)
    }

    pub fn connect(ip: &str, port: u16) -> String {
        format!("host:connect:{}:{}", ip, port)
    }

    pub fn disconnect(ip: &str, port: u16) -> String {
        format!("host:disconnect:{}:{}", ip, port)
    }

    pub fn tcpip(port: u16) -> String {
        format!("tcpip:{}", port)
    }
}

/// Shell v2 message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShellMessageType {
    Stdin = 0,
    Stdout = 1,
    Stderr = 2,
    Exit = 3,
    CloseStdin = 4,
}

impl TryFrom<u8> for ShellMessageType {
    type Error = AdbError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ShellMessageType::Stdin),
            1 => Ok(ShellMessageType::Stdout),
            2 => Ok(ShellMessageType::Stderr),
            3 => Ok(ShellMessageType::Exit),
            4 => Ok(ShellMessageType::CloseStdin),
            other => Err(AdbError::UnknownShellMessage(other)),
        }
    }
}

/// One decoded shell v2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellMessage {
    pub kind: ShellMessageType,
    pub payload: Bytes,
}

impl ShellMessage {
    pub fn new(kind: ShellMessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// 1-byte type, 4-byte little-endian length, payload.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5 + self.payload.len());
        buf.put_u8(self.kind as u8);
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Sync protocol tags.
pub mod sync {
    pub const STAT: &[u8; 4] = b"STAT";
    pub const LIST: &[u8; 4] = b"LIST";
    pub const SEND: &[u8; 4] = b"SEND";
    pub const RECV: &[u8; 4] = b"RECV";
    pub const DATA: &[u8; 4] = b"DATA";
    pub const DENT: &[u8; 4] = b"DENT";
    pub const DONE: &[u8; 4] = b"DONE";
    pub const OKAY: &[u8; 4] = b"OKAY";
    pub const FAIL: &[u8; 4] = b"FAIL";
    pub const QUIT: &[u8; 4] = b"QUIT";

    /// Largest DATA payload a peer accepts. Names and FAIL messages share the limit.
    pub const MAX_CHUNK_SIZE: usize = 64 * 1024;
}

/// Encode a sync frame: 4-byte tag, 4-byte little-endian length, payload.
pub fn encode_sync_frame(tag: &[u8], data: &[u8]) -> Result<Bytes> {
    if tag.len() != 4 {
        return Err(AdbError::InvalidSyncCommand(
            String::from_utf8_lossy(tag).into_owned(),
        ));
    }
    let mut buf = BytesMut::with_capacity(8 + data.len());
    buf.put_slice(tag);
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    Ok(buf.freeze())
}
