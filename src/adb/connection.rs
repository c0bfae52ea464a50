use crate::adb::protocol::check_length;
use crate::config::ClientConfig;
use crate::error::{AdbError, Result};
use log::*;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

const BUFFER_SIZE: usize = 1024;

/// Any duplex byte stream a connection can run over.
pub trait AdbStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AdbStream for T {}

pub type BoxedStream = Box<dyn AdbStream>;

/// A socket to the ADB server plus the read deadline applied to it.
///
/// A connection is owned by exactly one protocol layer at a time. Closing is
/// idempotent.
pub struct Connection {
    stream: Option<BoxedStream>,
    read_timeout: Duration,
    trace_wire: bool,
}

impl Connection {
    /// Dial the ADB server named by `config`.
    pub async fn open(config: &ClientConfig) -> Result<Self> {
        let address = config.address();
        debug!("Connecting to address: {}", address);

        let stream = TcpStream::connect(&address)
            .await
            .map_err(|source| AdbError::Connect {
                address: address.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        debug!("Connection established to {}", address);

        Ok(Self::from_stream(stream, config))
    }

    /// Wrap an already-open stream.
    pub fn from_stream<S: AdbStream + 'static>(stream: S, config: &ClientConfig) -> Self {
        Self {
            stream: Some(Box::new(stream)),
            read_timeout: config.read_timeout(),
            trace_wire: config.trace_wire,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn trace_wire(&self) -> bool {
        self.trace_wire
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream(&mut self) -> Result<&mut BoxedStream> {
        self.stream.as_mut().ok_or(AdbError::ConnectionBroken)
    }

    /// Write the whole buffer. A write that makes no progress is a broken connection.
    pub async fn send_all(&mut self, buf: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        write_fully(stream, buf).await
    }

    /// Fill `buf` completely, failing with [`AdbError::Timeout`] if the peer stalls.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let deadline = self.read_timeout;
        let stream = self.stream()?;
        read_exact_with_deadline(stream, buf, Some(deadline)).await
    }

    pub async fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf).await?;
        Ok(buf)
    }

    pub async fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>().await?))
    }

    /// Read a `len`-byte payload whose length came from the peer.
    pub async fn read_bytes(&mut self, len: usize, max: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; check_length(len, max)?];
        self.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Read until the peer closes its side. Each read carries its own deadline.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let deadline = self.read_timeout;
        let stream = self.stream()?;
        let mut buffer = [0u8; BUFFER_SIZE];
        let mut response = Vec::new();

        loop {
            let n = tokio::time::timeout(deadline, stream.read(&mut buffer))
                .await
                .map_err(|_| AdbError::Timeout(deadline))??;
            if n == 0 {
                debug!("Server closed the connection");
                break;
            }
            response.extend_from_slice(&buffer[..n]);
        }

        Ok(response)
    }

    /// Log a line of wire traffic when tracing is enabled for this connection.
    pub fn trace(&self, line: impl FnOnce() -> String) {
        if self.trace_wire {
            trace!("{}", line());
        }
    }

    /// Shut the socket down. Calling this more than once is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            match stream.shutdown().await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotConnected => {}
                Err(e) => return Err(e.into()),
            }
            debug!("Connection closed");
        }
        Ok(())
    }

    /// Hand the socket over to two independent owners (reader and writer).
    pub fn into_split(mut self) -> Result<(ReadHalf<BoxedStream>, WriteHalf<BoxedStream>)> {
        let stream = self.stream.take().ok_or(AdbError::ConnectionBroken)?;
        Ok(tokio::io::split(stream))
    }
}

/// Write every byte of `buf`, treating a zero-length write as a dead peer.
pub(crate) async fn write_fully<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    buf: &[u8],
) -> Result<()> {
    let mut sent = 0;
    while sent < buf.len() {
        let n = writer.write(&buf[sent..]).await?;
        if n == 0 {
            return Err(AdbError::ConnectionBroken);
        }
        sent += n;
    }
    writer.flush().await?;
    Ok(())
}

/// `read_exact` with an optional deadline. A peer that hangs up mid-read is a broken connection.
pub(crate) async fn read_exact_with_deadline<R: AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    deadline: Option<Duration>,
) -> Result<()> {
    let result = match deadline {
        Some(limit) => tokio::time::timeout(limit, reader.read_exact(buf))
            .await
            .map_err(|_| AdbError::Timeout(limit))?,
        None => reader.read_exact(buf).await,
    };
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(AdbError::ConnectionBroken),
        Err(e) => Err(e.into()),
    }
}
