use crate::adb::protocol::{ShellMessage, ShellMessageType};
use crate::config::ClientConfig;
use std::time::Duration;

/// Default client settings for tests: a short deadline keeps stalled peers cheap.
pub fn test_config() -> ClientConfig {
    ClientConfig::default().with_read_timeout(Duration::from_millis(300))
}

/// A bare `OKAY` status.
pub fn okay() -> Vec<u8> {
    b"OKAY".to_vec()
}

/// `OKAY` followed by a hex-length-prefixed payload.
pub fn okay_with(payload: &str) -> Vec<u8> {
    let mut reply = okay();
    reply.extend_from_slice(&hex_string(payload));
    reply
}

/// `FAIL` followed by a hex-length-prefixed message.
pub fn fail(message: &str) -> Vec<u8> {
    let mut reply = b"FAIL".to_vec();
    reply.extend_from_slice(&hex_string(message));
    reply
}

pub fn hex_string(payload: &str) -> Vec<u8> {
    let mut out = format!("{:04x}", payload.len()).into_bytes();
    out.extend_from_slice(payload.as_bytes());
    out
}

pub fn shell_frame(kind: ShellMessageType, data: &[u8]) -> Vec<u8> {
    ShellMessage::new(kind, data.to_vec()).encode().to_vec()
}

pub fn exit_frame(code: u8) -> Vec<u8> {
    shell_frame(ShellMessageType::Exit, &[code])
}

/// A sync frame: tag, little-endian length, data.
pub fn sync_frame(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// A `DENT` listing record.
pub fn dent(mode: u32, size: u32, mtime: u32, name: &str) -> Vec<u8> {
    let mut out = b"DENT".to_vec();
    for field in [mode, size, mtime, name.len() as u32] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(name.as_bytes());
    out
}

/// A `STAT` reply record.
pub fn stat(mode: u32, size: u32, mtime: u32) -> Vec<u8> {
    let mut out = b"STAT".to_vec();
    for field in [mode, size, mtime] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out
}

/// `host:devices-l` output for two devices and one line that is not a device.
pub fn devices_long_output() -> &'static str {
    "List of devices attached\n\
     emulator-5554          device product:sdk_gphone64 model:sdk_gphone64 device:emu64a transport_id:1\n\
     0123456789ABCDEF       device usb:1-1 product:oriole model:Pixel_6 device:oriole transport_id:2\n"
}

pub fn test_file_content() -> Vec<u8> {
    b"This is test file content.\nLine 2\nLine 3\n".to_vec()
}
