use crate::adb::host::HostTransport;
use crate::adb::protocol::host;
use crate::config::ClientConfig;
use crate::device::Device;
use crate::error::{AdbError, Result};
use crate::types::{DeviceId, DeviceInfo, ForwardEntry};
use log::*;

/// Entry point for talking to an ADB server.
///
/// Every command opens its own connection; nothing is pooled.
#[derive(Debug, Clone, Default)]
pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open a fresh connection to the server.
    pub async fn connect_transport(&self) -> Result<HostTransport> {
        HostTransport::connect(&self.config).await
    }

    /// Send one host command on its own connection. With `status_only` only
    /// the status is read; otherwise the length-prefixed payload is returned.
    pub async fn execute_command(&self, command: &str, status_only: bool) -> Result<Vec<u8>> {
        let mut transport = self.connect_transport().await?;
        let result = Self::exchange(&mut transport, command, status_only).await;
        let close = transport.close().await;
        AdbError::with_teardown(result, close)
    }

    async fn exchange(
        transport: &mut HostTransport,
        command: &str,
        status_only: bool,
    ) -> Result<Vec<u8>> {
        transport.send(command).await?;
        if status_only {
            transport.verify_response().await?;
            return Ok(Vec::new());
        }
        transport.receive().await
    }

    async fn execute_string(&self, command: &str) -> Result<String> {
        let raw = self.execute_command(command, false).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// The server's protocol version (`host:version`, hex encoded on the wire).
    pub async fn server_version(&self) -> Result<u32> {
        let reply = self.execute_string(host::VERSION).await?;
        let version = u32::from_str_radix(reply.trim(), 16)?;
        debug!("ADB server version: {}", version);
        Ok(version)
    }

    /// Serials of every attached device, whatever its state.
    pub async fn device_serial_list(&self) -> Result<Vec<DeviceId>> {
        let reply = self.execute_string(host::DEVICES).await?;
        Ok(reply
            .lines()
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 2 {
                    return None;
                }
                Some(DeviceId::new(fields[0]))
            })
            .collect())
    }

    /// Attached devices with their `devices -l` attributes.
    pub async fn device_list(&self) -> Result<Vec<Device>> {
        let reply = self.execute_string(host::DEVICES_LONG).await?;
        let mut devices = Vec::new();

        for line in reply.lines().filter(|line| !line.is_empty()) {
            match DeviceInfo::parse(line) {
                Some(info) => devices.push(Device::from_info(self.config.clone(), info)),
                None => debug!("can't parse: {}", line),
            }
        }

        debug!("Found {} devices", devices.len());
        Ok(devices)
    }

    /// Handle for `serial` without asking the server whether it exists.
    pub fn device(&self, serial: impl Into<DeviceId>) -> Device {
        Device::new(self.config.clone(), serial.into())
    }

    /// Ask the server to exit. No reply is awaited.
    pub async fn kill_server(&self) -> Result<()> {
        let mut transport = self.connect_transport().await?;
        let result = transport.send(host::KILL).await;
        let close = transport.close().await;
        info!("Sent kill request to ADB server");
        AdbError::with_teardown(result, close)
    }

    /// Attach a device over TCP. The server's reply text is returned.
    pub async fn connect(&self, ip: &str, port: u16) -> Result<String> {
        let reply = self.execute_string(&host::connect(ip, port)).await?;
        // "already connected to" also contains "connected to".
        if !reply.contains("connected to") {
            return Err(AdbError::CommandFailed(reply));
        }
        info!("{}", reply.trim());
        Ok(reply)
    }

    pub async fn disconnect(&self, ip: &str, port: u16) -> Result<String> {
        self.disconnect_command(&host::disconnect(ip, port)).await
    }

    /// Detach every TCP device.
    pub async fn disconnect_all(&self) -> Result<String> {
        self.disconnect_command(host::DISCONNECT_ALL).await
    }

    async fn disconnect_command(&self, command: &str) -> Result<String> {
        let reply = self.execute_string(command).await?;
        if !reply.contains("disconnected") {
            return Err(AdbError::CommandFailed(reply));
        }
        info!("{}", reply.trim());
        Ok(reply)
    }

    /// Remove every port forward on every device.
    pub async fn forward_kill_all(&self) -> Result<()> {
        self.execute_command(host::KILL_FORWARD_ALL, true).await?;
        Ok(())
    }

    /// Every port forward the server knows about.
    pub async fn forward_list(&self) -> Result<Vec<ForwardEntry>> {
        let reply = self.execute_string(host::LIST_FORWARD).await?;
        Ok(reply.lines().filter_map(ForwardEntry::parse).collect())
    }
}
