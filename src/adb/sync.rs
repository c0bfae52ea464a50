use crate::adb::connection::Connection;
use crate::adb::protocol::{self, sync};
use crate::error::{AdbError, Result};
use crate::types::FileMode;
use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One record of a `LIST` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub mode: FileMode,
    pub size: u32,
    pub last_modified: DateTime<Utc>,
    pub name: String,
}

/// Result of a `STAT` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStat {
    pub mode: FileMode,
    pub size: u32,
    pub last_modified: DateTime<Utc>,
}

impl FileStat {
    /// adbd answers `STAT` on a missing path with all fields zeroed.
    pub fn exists(&self) -> bool {
        self.mode.bits() != 0 || self.size != 0 || self.last_modified.timestamp() != 0
    }
}

fn unix_time(secs: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(secs), 0).unwrap_or_default()
}

/// Binary file-transfer protocol over a connection already switched with `sync:`.
pub struct SyncTransport {
    conn: Connection,
}

impl SyncTransport {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Send a 4-byte command tag with a little-endian length and the data.
    pub async fn send(&mut self, command: &str, data: &[u8]) -> Result<()> {
        let frame = protocol::encode_sync_frame(command.as_bytes(), data)?;
        self.conn
            .trace(|| format!("--> {} {}", command, String::from_utf8_lossy(data)));
        self.conn.send_all(&frame).await
    }

    /// Copy `reader` to the peer as `DATA` frames of at most 64 KiB.
    ///
    /// The closing `DONE` frame is the caller's job.
    pub async fn send_stream<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<u64> {
        let mut buffer = vec![0u8; sync::MAX_CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            self.send_chunk(&buffer[..n]).await?;
            total += n as u64;
        }

        debug!("Streamed {} bytes", total);
        Ok(total)
    }

    async fn send_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let frame = protocol::encode_sync_frame(sync::DATA, chunk)?;
        self.conn.trace(|| format!("--> DATA {} bytes", chunk.len()));
        self.conn.send_all(&frame).await
    }

    /// Send a status tag followed by a little-endian u32 (e.g. `DONE` + mtime).
    pub async fn send_status(&mut self, code: &str, n: u32) -> Result<()> {
        if code.len() != 4 {
            return Err(AdbError::InvalidSyncCommand(code.to_string()));
        }
        let mut frame = [0u8; 8];
        frame[..4].copy_from_slice(code.as_bytes());
        frame[4..].copy_from_slice(&n.to_le_bytes());
        self.conn.trace(|| format!("--> {} {}", code, n));
        self.conn.send_all(&frame).await
    }

    /// Read `OKAY` or `FAIL <message>`.
    pub async fn verify_status(&mut self) -> Result<()> {
        let tag = self.conn.read_array::<4>().await?;

        match &tag {
            sync::OKAY => {
                // OKAY carries a zero length; skip anything a peer sends anyway.
                let len = self.conn.read_u32_le().await? as usize;
                if len > 0 {
                    self.conn.read_bytes(len, sync::MAX_CHUNK_SIZE).await?;
                }
                self.conn.trace(|| "<-- OKAY".to_string());
                Ok(())
            }
            sync::FAIL => {
                let message = self.read_message().await?;
                self.conn.trace(|| format!("<-- FAIL {}", message));
                Err(AdbError::SyncFailed(message))
            }
            other => Err(AdbError::UnknownSyncStatus(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Length-prefixed text such as a FAIL reason.
    async fn read_message(&mut self) -> Result<String> {
        let len = self.conn.read_u32_le().await? as usize;
        let raw = self.conn.read_bytes(len, sync::MAX_CHUNK_SIZE).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Read one listing record; `None` marks the end of the listing.
    pub async fn read_directory_entry(&mut self) -> Result<Option<DirectoryEntry>> {
        let tag = self.conn.read_array::<4>().await?;
        if &tag == sync::DONE {
            self.conn.trace(|| "<-- DONE".to_string());
            return Ok(None);
        }

        let mode = FileMode::from_bits(self.conn.read_u32_le().await?);
        let size = self.conn.read_u32_le().await?;
        let last_modified = unix_time(self.conn.read_u32_le().await?);
        let name = self.read_message().await?;

        let entry = DirectoryEntry {
            mode,
            size,
            last_modified,
            name,
        };
        self.conn.trace(|| {
            format!(
                "<-- {}\t{}\t{:10}\t{}\t{}",
                String::from_utf8_lossy(&tag),
                entry.mode,
                entry.size,
                entry.last_modified,
                entry.name
            )
        });
        Ok(Some(entry))
    }

    /// `LIST` a remote directory and collect every entry.
    pub async fn list(&mut self, path: &str) -> Result<Vec<DirectoryEntry>> {
        self.send("LIST", path.as_bytes()).await?;
        let mut entries = Vec::new();
        while let Some(entry) = self.read_directory_entry().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// `STAT` a remote path.
    pub async fn stat(&mut self, path: &str) -> Result<FileStat> {
        self.send("STAT", path.as_bytes()).await?;
        let tag = self.conn.read_array::<4>().await?;
        if &tag != sync::STAT {
            return Err(AdbError::UnknownSyncStatus(
                String::from_utf8_lossy(&tag).into_owned(),
            ));
        }
        let mode = FileMode::from_bits(self.conn.read_u32_le().await?);
        let size = self.conn.read_u32_le().await?;
        let last_modified = unix_time(self.conn.read_u32_le().await?);
        Ok(FileStat {
            mode,
            size,
            last_modified,
        })
    }

    /// Upload `reader` to `remote_path` with the given permission bits and mtime.
    pub async fn push<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        remote_path: &str,
        mode: u32,
        mtime: u32,
    ) -> Result<u64> {
        info!("Pushing to {}", remote_path);
        let header = format!("{},{}", remote_path, mode);
        self.send("SEND", header.as_bytes()).await?;
        let total = self.send_stream(reader).await?;
        self.send_status("DONE", mtime).await?;
        self.verify_status().await?;
        info!("Successfully pushed {} bytes to {}", total, remote_path);
        Ok(total)
    }

    /// Download `remote_path` into `writer`.
    pub async fn pull<W: AsyncWrite + Unpin>(
        &mut self,
        remote_path: &str,
        writer: &mut W,
    ) -> Result<u64> {
        info!("Pulling {}", remote_path);
        self.send("RECV", remote_path.as_bytes()).await?;
        let mut total = 0u64;

        loop {
            let tag = self.conn.read_array::<4>().await?;

            match &tag {
                sync::DATA => {
                    let len = self.conn.read_u32_le().await? as usize;
                    let chunk = self.conn.read_bytes(len, sync::MAX_CHUNK_SIZE).await?;
                    writer.write_all(&chunk).await?;
                    total += chunk.len() as u64;
                }
                sync::DONE => {
                    self.conn.read_u32_le().await?;
                    break;
                }
                sync::FAIL => return Err(AdbError::SyncFailed(self.read_message().await?)),
                other => {
                    return Err(AdbError::UnknownSyncStatus(
                        String::from_utf8_lossy(other).into_owned(),
                    ))
                }
            }
        }

        writer.flush().await?;
        info!("Successfully pulled {} bytes from {}", total, remote_path);
        Ok(total)
    }

    pub async fn close(&mut self) -> Result<()> {
        self.conn.close().await
    }
}
