use crate::adb::host::{DeviceConnection, HostTransport};
use crate::adb::protocol::host;
use crate::adb::session::Session;
use crate::adb::sync::{DirectoryEntry, FileStat, SyncTransport};
use crate::client::Client;
use crate::config::{ClientConfig, ADB_DAEMON_PORT};
use crate::error::{AdbError, Result};
use crate::types::{DeviceId, DeviceInfo, DeviceState, ForwardEntry};
use log::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardOptions {
    /// Fail instead of replacing an existing forward on the same local socket.
    pub no_rebind: bool,
}

/// One device attached to the ADB server.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    #[serde(skip)]
    client: Client,
    serial: DeviceId,
    attrs: BTreeMap<String, String>,
}

impl Device {
    pub(crate) fn new(config: ClientConfig, serial: DeviceId) -> Self {
        Self {
            client: Client::new(config),
            serial,
            attrs: BTreeMap::new(),
        }
    }

    pub(crate) fn from_info(config: ClientConfig, info: DeviceInfo) -> Self {
        Self {
            client: Client::new(config),
            serial: info.serial,
            attrs: info.attrs,
        }
    }

    pub fn serial(&self) -> &DeviceId {
        &self.serial
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn product(&self) -> Option<&str> {
        self.attr("product")
    }

    pub fn model(&self) -> Option<&str> {
        self.attr("model")
    }

    pub fn usb(&self) -> Option<&str> {
        self.attr("usb")
    }

    pub fn transport_id(&self) -> Option<&str> {
        self.attr("transport_id")
    }

    pub fn is_usb(&self) -> bool {
        self.usb().is_some_and(|usb| !usb.is_empty())
    }

    async fn host_serial(&self, command: &str) -> Result<String> {
        let raw = self
            .client
            .execute_command(&host::serial(self.serial.as_str(), command), false)
            .await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    pub async fn state(&self) -> Result<DeviceState> {
        let reply = self.host_serial("get-state").await?;
        Ok(DeviceState::from_reply(&reply))
    }

    pub async fn device_path(&self) -> Result<String> {
        self.host_serial("get-devpath").await
    }

    /// Forward `local` on the host to `remote` on the device, e.g. `tcp:8080`.
    pub async fn forward(&self, local: &str, remote: &str, options: ForwardOptions) -> Result<()> {
        let command = if options.no_rebind {
            format!("forward:norebind:{};{}", local, remote)
        } else {
            format!("forward:{};{}", local, remote)
        };
        self.client
            .execute_command(&host::serial(self.serial.as_str(), &command), true)
            .await?;
        debug!("Forwarded {} -> {} on {}", local, remote, self.serial);
        Ok(())
    }

    pub async fn forward_kill(&self, local: &str) -> Result<()> {
        let command = format!("killforward:{}", local);
        self.client
            .execute_command(&host::serial(self.serial.as_str(), &command), true)
            .await?;
        Ok(())
    }

    /// Forwards that belong to this device.
    pub async fn forward_list(&self) -> Result<Vec<ForwardEntry>> {
        let reply = self.host_serial("list-forward").await?;
        Ok(reply
            .lines()
            .filter_map(ForwardEntry::parse)
            .filter(|entry| entry.serial == self.serial)
            .collect())
    }

    /// A fresh server connection already switched to this device.
    pub async fn open_device_connection(&self) -> Result<DeviceConnection> {
        let transport = HostTransport::connect(self.client.config()).await?;
        transport.into_device(&self.serial).await
    }

    /// Run a device service and return everything it writes before hanging up.
    pub async fn execute_command(&self, command: &str, status_only: bool) -> Result<Vec<u8>> {
        self.open_device_connection()
            .await?
            .execute(command, status_only)
            .await
    }

    /// Run `cmd` through the legacy `shell:` service. Output streams are merged
    /// and no exit status is reported; use [`Device::new_session`] for that.
    pub async fn run_shell_command(&self, cmd: &str, args: &[&str]) -> Result<String> {
        let command = if args.is_empty() {
            cmd.to_string()
        } else {
            format!("{} {}", cmd, args.join(" "))
        };
        if command.trim().is_empty() {
            return Err(AdbError::EmptyCommand);
        }

        let raw = self.execute_command(&host::shell(&command), false).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Restart adbd listening on TCP `port` (5555 if not given).
    pub async fn enable_adb_over_tcp(&self, port: Option<u16>) -> Result<()> {
        let port = port.unwrap_or(ADB_DAEMON_PORT);
        self.execute_command(&host::tcpip(port), true).await?;
        info!("Requested adbd on {} to listen on port {}", self.serial, port);
        Ok(())
    }

    /// A shell v2 session on its own connection.
    pub async fn new_session(&self) -> Result<Session> {
        Ok(Session::new(self.open_device_connection().await?))
    }

    /// A sync connection. The caller closes it.
    pub async fn open_sync(&self) -> Result<SyncTransport> {
        self.open_device_connection().await?.into_sync().await
    }

    pub async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let mut sync = self.open_sync().await?;
        let result = sync.list(path).await;
        AdbError::with_teardown(result, sync.close().await)
    }

    pub async fn stat(&self, path: &str) -> Result<FileStat> {
        let mut sync = self.open_sync().await?;
        let result = sync.stat(path).await;
        AdbError::with_teardown(result, sync.close().await)
    }

    pub async fn push<R: AsyncRead + Unpin>(
        &self,
        reader: &mut R,
        remote_path: &str,
        mode: u32,
        mtime: u32,
    ) -> Result<u64> {
        let mut sync = self.open_sync().await?;
        let result = sync.push(reader, remote_path, mode, mtime).await;
        AdbError::with_teardown(result, sync.close().await)
    }

    pub async fn pull<W: AsyncWrite + Unpin>(&self, remote_path: &str, writer: &mut W) -> Result<u64> {
        let mut sync = self.open_sync().await?;
        let result = sync.pull(remote_path, writer).await;
        AdbError::with_teardown(result, sync.close().await)
    }

    /// Push a local file, keeping its permission bits and modification time.
    pub async fn push_file(&self, local: &Path, remote_path: &str) -> Result<u64> {
        let metadata = tokio::fs::metadata(local).await?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or(0);

        let mut file = tokio::fs::File::open(local).await?;
        self.push(&mut file, remote_path, file_mode(&metadata), mtime)
            .await
    }

    /// Pull a remote file into `local`, creating or truncating it.
    pub async fn pull_file(&self, remote_path: &str, local: &Path) -> Result<u64> {
        let mut file = tokio::fs::File::create(local).await?;
        self.pull(remote_path, &mut file).await
    }
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

// No Unix permission bits to carry over.
#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}
