use crate::adb::connection::{read_exact_with_deadline, write_fully, BoxedStream, Connection};
use crate::adb::protocol::{check_length, ShellMessage, ShellMessageType, MAX_SHELL_PAYLOAD};
use crate::error::Result;
use bytes::Bytes;
use log::*;
use std::time::Duration;
use tokio::io::{AsyncReadExt, ReadHalf, WriteHalf};

/// Split a connection already carrying shell v2 frames into its two directions.
pub fn split(conn: Connection) -> Result<(ShellReader, ShellWriter)> {
    let read_timeout = conn.read_timeout();
    let trace_wire = conn.trace_wire();
    let (read_half, write_half) = conn.into_split()?;
    Ok((
        ShellReader {
            half: read_half,
            read_timeout,
            trace_wire,
        },
        ShellWriter {
            half: write_half,
            trace_wire,
        },
    ))
}

/// Receiving side of a shell v2 connection.
pub struct ShellReader {
    half: ReadHalf<BoxedStream>,
    read_timeout: Duration,
    trace_wire: bool,
}

impl ShellReader {
    /// Read the next frame. `Ok(None)` means the peer closed the connection
    /// cleanly between frames.
    ///
    /// Waiting for a frame to start has no deadline, since a remote command may
    /// be silent for as long as it likes. Once the type byte has arrived the
    /// rest of the frame must follow within the read timeout.
    pub async fn read(&mut self) -> Result<Option<ShellMessage>> {
        let mut kind = [0u8; 1];
        if self.half.read(&mut kind).await? == 0 {
            return Ok(None);
        }
        let kind = ShellMessageType::try_from(kind[0])?;

        let mut len = [0u8; 4];
        read_exact_with_deadline(&mut self.half, &mut len, Some(self.read_timeout)).await?;
        let len = check_length(u32::from_le_bytes(len) as usize, MAX_SHELL_PAYLOAD)?;

        let mut payload = vec![0u8; len];
        read_exact_with_deadline(&mut self.half, &mut payload, Some(self.read_timeout)).await?;

        if self.trace_wire {
            trace!("<-- {:?} {} bytes", kind, len);
        }
        Ok(Some(ShellMessage::new(kind, payload)))
    }
}

/// Sending side of a shell v2 connection.
pub struct ShellWriter {
    half: WriteHalf<BoxedStream>,
    trace_wire: bool,
}

impl ShellWriter {
    pub async fn send(&mut self, kind: ShellMessageType, data: &[u8]) -> Result<()> {
        let frame = ShellMessage::new(kind, Bytes::copy_from_slice(data)).encode();
        if self.trace_wire {
            trace!("--> {:?} {} bytes", kind, data.len());
        }
        write_fully(&mut self.half, &frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::AdbError;
    use tokio::io::{duplex, AsyncWriteExt};

    fn connection(stream: tokio::io::DuplexStream) -> Connection {
        let config = ClientConfig::default().with_read_timeout(Duration::from_millis(200));
        Connection::from_stream(stream, &config)
    }

    #[tokio::test]
    async fn test_reads_frames_then_clean_close() {
        let (client, mut server) = duplex(1024);
        let (mut reader, _writer) = split(connection(client)).unwrap();

        server.write_all(&[1, 3, 0, 0, 0, b'h', b'i', b'\n']).await.unwrap();
        server.write_all(&[3, 1, 0, 0, 0, 0]).await.unwrap();
        drop(server);

        let first = reader.read().await.unwrap().unwrap();
        assert_eq!(first.kind, ShellMessageType::Stdout);
        assert_eq!(&first.payload[..], b"hi\n");

        let second = reader.read().await.unwrap().unwrap();
        assert_eq!(second.kind, ShellMessageType::Exit);
        assert_eq!(&second.payload[..], &[0]);

        assert!(reader.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected() {
        let (client, mut server) = duplex(1024);
        let (mut reader, _writer) = split(connection(client)).unwrap();

        server.write_all(&[9, 0, 0, 0, 0]).await.unwrap();

        assert!(matches!(
            reader.read().await,
            Err(AdbError::UnknownShellMessage(9))
        ));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_broken_connection() {
        let (client, mut server) = duplex(1024);
        let (mut reader, _writer) = split(connection(client)).unwrap();

        server.write_all(&[1, 10, 0, 0, 0, b'x']).await.unwrap();
        drop(server);

        assert!(matches!(
            reader.read().await,
            Err(AdbError::ConnectionBroken)
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (client, mut server) = duplex(1024);
        let (mut reader, _writer) = split(connection(client)).unwrap();

        server.write_all(&[1, 0xff, 0xff, 0xff, 0x7f]).await.unwrap();

        assert!(matches!(
            reader.read().await,
            Err(AdbError::LengthTooLarge { len: 0x7fff_ffff, max: MAX_SHELL_PAYLOAD })
        ));
    }

    #[tokio::test]
    async fn test_writer_frames_messages() {
        let (client, mut server) = duplex(1024);
        let (_reader, mut writer) = split(connection(client)).unwrap();

        writer.send(ShellMessageType::Stdin, b"ab").await.unwrap();
        writer.send(ShellMessageType::CloseStdin, &[]).await.unwrap();

        let mut buf = [0u8; 12];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0, 2, 0, 0, 0, b'a', b'b', 4, 0, 0, 0, 0]);
    }
}
