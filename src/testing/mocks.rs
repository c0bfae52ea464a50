use crate::adb::connection::{AdbStream, BoxedStream, Connection};
use crate::adb::host::{DeviceConnection, HostTransport};
use crate::adb::protocol::ShellMessageType;
use crate::config::ClientConfig;
use crate::types::DeviceId;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::fixtures;

const PIPE_CAPACITY: usize = 64 * 1024;

/// The server side of a scripted conversation.
///
/// Replies can be queued before the client asks for them; the stream buffers.
pub struct MockPeer {
    stream: BoxedStream,
}

impl MockPeer {
    pub fn new(stream: impl AdbStream + 'static) -> Self {
        Self {
            stream: Box::new(stream),
        }
    }

    pub async fn reply(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Read one hex-length-prefixed host command.
    pub async fn expect_command(&mut self) -> String {
        let len = self.read_exact(4).await;
        let len = usize::from_str_radix(std::str::from_utf8(&len).unwrap(), 16).unwrap();
        String::from_utf8(self.read_exact(len).await).unwrap()
    }

    pub async fn read_exact(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).await.unwrap();
        buf
    }

    pub async fn read_to_end(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.stream.read_to_end(&mut buf).await.unwrap();
        buf
    }

    pub async fn read_shell_frame(&mut self) -> (ShellMessageType, Vec<u8>) {
        let kind = ShellMessageType::try_from(self.read_exact(1).await[0]).unwrap();
        let len = u32::from_le_bytes(self.read_exact(4).await.try_into().unwrap());
        (kind, self.read_exact(len as usize).await)
    }

    /// Read a sync tag and its little-endian word (a length, or an mtime after `DONE`).
    pub async fn read_sync_header(&mut self) -> ([u8; 4], u32) {
        let tag: [u8; 4] = self.read_exact(4).await.try_into().unwrap();
        let word = u32::from_le_bytes(self.read_exact(4).await.try_into().unwrap());
        (tag, word)
    }

    pub async fn read_sync_frame(&mut self) -> ([u8; 4], Vec<u8>) {
        let (tag, len) = self.read_sync_header().await;
        (tag, self.read_exact(len as usize).await)
    }

    /// Stop sending. The client sees EOF once it drains what was queued.
    pub async fn finish(&mut self) {
        self.stream.shutdown().await.unwrap();
    }
}

/// An in-memory connection and the peer on its other end.
pub fn pair(config: &ClientConfig) -> (Connection, MockPeer) {
    let (client, server) = duplex(PIPE_CAPACITY);
    (Connection::from_stream(client, config), MockPeer::new(server))
}

/// A device connection for `serial` whose transport switch the peer already accepted.
pub async fn device_connection(serial: &str) -> (DeviceConnection, MockPeer) {
    let (conn, mut peer) = pair(&fixtures::test_config());
    peer.reply(&fixtures::okay()).await;

    let device = HostTransport::new(conn)
        .into_device(&DeviceId::new(serial))
        .await
        .unwrap();
    assert_eq!(
        peer.expect_command().await,
        format!("host:transport:{}", serial)
    );
    (device, peer)
}

/// A real TCP listener on an ephemeral port, standing in for the ADB server.
pub struct MockServer {
    listener: TcpListener,
}

impl MockServer {
    pub async fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    /// Client settings pointing at this listener.
    pub fn config(&self) -> ClientConfig {
        let port = self.listener.local_addr().unwrap().port();
        fixtures::test_config()
            .with_host("127.0.0.1")
            .with_port(port)
    }

    pub async fn accept(&self) -> MockPeer {
        let (stream, _) = self.listener.accept().await.unwrap();
        MockPeer::new(stream)
    }
}
