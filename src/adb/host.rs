use crate::adb::connection::Connection;
use crate::adb::protocol::{self, host, ReplyStatus};
use crate::adb::sync::SyncTransport;
use crate::config::ClientConfig;
use crate::error::{AdbError, Result};
use crate::types::DeviceId;
use log::*;

/// Request/response framing for `host:*` commands.
///
/// One command is in flight at a time; the caller owns the transport.
pub struct HostTransport {
    conn: Connection,
}

impl HostTransport {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Dial the server and wrap the fresh connection.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(Connection::open(config).await?))
    }

    /// Send `command` framed with its 4-hex-digit length.
    pub async fn send(&mut self, command: &str) -> Result<()> {
        let frame = protocol::encode_host_command(command)?;
        self.conn.trace(|| format!("--> {}", command));
        self.conn.send_all(&frame).await
    }

    /// Read a 4-byte status. `FAIL` is turned into [`AdbError::CommandFailed`].
    pub async fn read_status(&mut self) -> Result<ReplyStatus> {
        let raw = self.conn.read_array::<4>().await?;
        let status = ReplyStatus::from_bytes(&raw)?;

        if status == ReplyStatus::Fail {
            let message = self.unpack_string().await?;
            self.conn.trace(|| format!("<-- {} {}", status, message));
            return Err(AdbError::CommandFailed(message));
        }

        self.conn.trace(|| format!("<-- {}", status));
        Ok(status)
    }

    /// Expect `OKAY` and nothing else.
    pub async fn verify_response(&mut self) -> Result<()> {
        match self.read_status().await? {
            ReplyStatus::Okay => Ok(()),
            other => Err(AdbError::UnsupportedStatus(other)),
        }
    }

    /// Read a status and then a length-prefixed payload.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        match self.read_status().await? {
            ReplyStatus::Okay => self.unpack_bytes().await,
            // Sync-style statuses never belong on a host connection.
            other => Err(AdbError::UnsupportedStatus(other)),
        }
    }

    pub async fn receive_string(&mut self) -> Result<String> {
        let raw = self.receive().await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Read a 4-hex-digit length followed by that many bytes.
    pub async fn unpack_bytes(&mut self) -> Result<Vec<u8>> {
        let raw_len = self.conn.read_array::<4>().await?;
        let len = protocol::decode_hex_length(&raw_len)?;
        let payload = self.conn.read_bytes(len, protocol::MAX_COMMAND_LEN).await?;
        self.conn
            .trace(|| format!("<-- {}", String::from_utf8_lossy(&payload)));
        Ok(payload)
    }

    pub async fn unpack_string(&mut self) -> Result<String> {
        let raw = self.unpack_bytes().await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Read until the server hangs up. Used where replies are not length-prefixed.
    pub async fn read_all(&mut self) -> Result<Vec<u8>> {
        let raw = self.conn.read_to_end().await?;
        self.conn.trace(|| format!("<-- {}", String::from_utf8_lossy(&raw)));
        Ok(raw)
    }

    pub async fn close(&mut self) -> Result<()> {
        self.conn.close().await
    }

    /// Switch this connection to `serial`. Only an `OKAY` reply yields the
    /// device-scoped capability.
    pub async fn into_device(mut self, serial: &DeviceId) -> Result<DeviceConnection> {
        self.send(&host::transport(serial.as_str())).await?;
        self.verify_response().await?;
        debug!("Connection switched to device {}", serial);
        Ok(DeviceConnection {
            serial: serial.clone(),
            transport: self,
        })
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

/// A connection that already received `OKAY` for `host:transport:<serial>`.
///
/// Only [`HostTransport::into_device`] builds one, so holders know every
/// further command is scoped to the device.
pub struct DeviceConnection {
    serial: DeviceId,
    transport: HostTransport,
}

impl DeviceConnection {
    pub fn serial(&self) -> &DeviceId {
        &self.serial
    }

    /// Run a single device command. With `status_only` just the status is read,
    /// otherwise everything up to the server closing the socket is returned.
    pub async fn execute(mut self, command: &str, status_only: bool) -> Result<Vec<u8>> {
        let result = self.execute_inner(command, status_only).await;
        let close = self.transport.close().await;
        AdbError::with_teardown(result, close)
    }

    async fn execute_inner(&mut self, command: &str, status_only: bool) -> Result<Vec<u8>> {
        self.transport.send(command).await?;
        self.transport.verify_response().await?;
        if status_only {
            return Ok(Vec::new());
        }
        self.transport.read_all().await
    }

    /// Send `sync:` and hand the connection to the sync protocol.
    pub async fn into_sync(mut self) -> Result<SyncTransport> {
        self.transport.send(host::SYNC).await?;
        self.transport.verify_response().await?;
        debug!("Device {} entered sync mode", self.serial);
        Ok(SyncTransport::new(self.transport.into_connection()))
    }

    pub(crate) fn into_transport(self) -> HostTransport {
        self.transport
    }
}
