//! Process-like execution of a remote command over the shell v2 protocol.
//!
//! A [`Session`] runs exactly one command. [`Session::start`] switches the
//! device connection into shell v2 mode and spawns two tasks: one copies the
//! configured stdin source to the device, the other demultiplexes stdout,
//! stderr and the exit status. Both report through a take-once completion
//! slot, so [`Session::wait`] observes exactly one terminal result.

use crate::adb::host::{DeviceConnection, HostTransport};
use crate::adb::protocol::{host, ShellMessageType};
use crate::adb::shell::{self, ShellReader, ShellWriter};
use crate::error::{AdbError, ExitStatus, Result, StdStream};
use log::*;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};

/// Stdin is forwarded in chunks of at most this many bytes.
const STDIN_CHUNK_SIZE: usize = 1024;
const PIPE_CAPACITY: usize = 64 * 1024;

type BoxedSource = Box<dyn AsyncRead + Send + Unpin>;
type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Holds the one sender of a session's terminal result. The first caller of
/// [`CompletionSlot::complete`] wins; later results are discarded.
#[derive(Clone)]
struct CompletionSlot(Arc<Mutex<Option<oneshot::Sender<Result<()>>>>>);

impl CompletionSlot {
    fn new() -> (Self, oneshot::Receiver<Result<()>>) {
        let (tx, rx) = oneshot::channel();
        (Self(Arc::new(Mutex::new(Some(tx)))), rx)
    }

    fn complete(&self, result: Result<()>) -> bool {
        let sender = self
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => {
                // The receiver may already be gone if the session was dropped.
                let _ = tx.send(result);
                true
            }
            None => {
                if let Err(e) = result {
                    debug!("Dropping late session result: {}", e);
                }
                false
            }
        }
    }
}

struct Sink {
    writer: BoxedSink,
    /// Pipe ends are shut down when the command finishes so readers see EOF.
    is_pipe: bool,
}

impl Sink {
    fn new(writer: BoxedSink, is_pipe: bool) -> Self {
        Self { writer, is_pipe }
    }
}

struct OutputSinks {
    stdout: Option<Sink>,
    stderr: Option<Sink>,
}

impl OutputSinks {
    async fn write(&mut self, stream: StdStream, data: &[u8]) -> Result<()> {
        let sink = match stream {
            StdStream::Stdout => self.stdout.as_mut(),
            StdStream::Stderr => self.stderr.as_mut(),
            StdStream::Stdin => None,
        };
        // No sink configured: the bytes are discarded.
        if let Some(sink) = sink {
            sink.writer.write_all(data).await?;
            sink.writer.flush().await?;
        }
        Ok(())
    }

    /// Release the pipe ends. Each sink is taken, so this happens at most once.
    async fn close_pipes(&mut self) -> Result<()> {
        let mut result = Ok(());
        for sink in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            if sink.is_pipe {
                let mut writer = sink.writer;
                result = AdbError::join(result, writer.shutdown().await.map_err(AdbError::from));
            }
        }
        result
    }
}

/// Cancels a running session from another task.
#[derive(Clone)]
pub struct SessionCloser {
    abort: Arc<AtomicBool>,
    tasks: Arc<Mutex<Vec<AbortHandle>>>,
}

impl SessionCloser {
    fn new() -> Self {
        Self {
            abort: Arc::new(AtomicBool::new(false)),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the abort flag and cancel both background tasks. Cancelling drops
    /// their halves of the connection, which closes the socket.
    pub fn close(&self) {
        self.abort.store(true, Ordering::SeqCst);
        let tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for task in tasks.iter() {
            task.abort();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    fn register(&self, handle: AbortHandle) {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Running,
    Closed,
}

/// A remote execution of one command.
pub struct Session {
    transport: Option<HostTransport>,
    stdin: Option<BoxedSource>,
    stdout: Option<Sink>,
    stderr: Option<Sink>,
    closer: SessionCloser,
    completion: Option<oneshot::Receiver<Result<()>>>,
    tasks: Vec<JoinHandle<()>>,
    state: State,
}

impl Session {
    /// Wrap a connection that has already been switched to a device.
    pub fn new(device: DeviceConnection) -> Self {
        debug!("New session for device {}", device.serial());
        Self {
            transport: Some(device.into_transport()),
            stdin: None,
            stdout: None,
            stderr: None,
            closer: SessionCloser::new(),
            completion: None,
            tasks: Vec::new(),
            state: State::Created,
        }
    }

    /// A handle that can cancel this session while another task is in [`Session::wait`].
    pub fn closer(&self) -> SessionCloser {
        self.closer.clone()
    }

    fn ensure_configurable(&self, stream: StdStream, occupied: bool) -> Result<()> {
        if self.state != State::Created {
            return Err(AdbError::PipeAfterStart(stream));
        }
        if occupied {
            return Err(AdbError::StreamAlreadySet(stream));
        }
        Ok(())
    }

    /// Use `source` as the remote command's standard input.
    pub fn set_stdin(&mut self, source: impl AsyncRead + Send + Unpin + 'static) -> Result<()> {
        self.ensure_configurable(StdStream::Stdin, self.stdin.is_some())?;
        self.stdin = Some(Box::new(source));
        Ok(())
    }

    /// Copy the remote command's standard output into `sink`.
    pub fn set_stdout(&mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Result<()> {
        self.ensure_configurable(StdStream::Stdout, self.stdout.is_some())?;
        self.stdout = Some(Sink::new(Box::new(sink), false));
        Ok(())
    }

    /// Copy the remote command's standard error into `sink`.
    pub fn set_stderr(&mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Result<()> {
        self.ensure_configurable(StdStream::Stderr, self.stderr.is_some())?;
        self.stderr = Some(Sink::new(Box::new(sink), false));
        Ok(())
    }

    /// A pipe connected to the remote command's standard input. Shutting down
    /// or dropping the returned writer closes the remote stdin.
    pub fn stdin_pipe(&mut self) -> Result<PipeWriter> {
        self.ensure_configurable(StdStream::Stdin, self.stdin.is_some())?;
        let (ours, theirs) = tokio::io::duplex(PIPE_CAPACITY);
        self.stdin = Some(Box::new(ours));
        Ok(PipeWriter(theirs))
    }

    /// A pipe carrying the remote command's standard output. It reaches EOF
    /// once the command exits.
    pub fn stdout_pipe(&mut self) -> Result<PipeReader> {
        self.ensure_configurable(StdStream::Stdout, self.stdout.is_some())?;
        let (ours, theirs) = tokio::io::duplex(PIPE_CAPACITY);
        self.stdout = Some(Sink::new(Box::new(ours), true));
        Ok(PipeReader(theirs))
    }

    /// A pipe carrying the remote command's standard error.
    pub fn stderr_pipe(&mut self) -> Result<PipeReader> {
        self.ensure_configurable(StdStream::Stderr, self.stderr.is_some())?;
        let (ours, theirs) = tokio::io::duplex(PIPE_CAPACITY);
        self.stderr = Some(Sink::new(Box::new(ours), true));
        Ok(PipeReader(theirs))
    }

    /// Start `cmd` on the device without waiting for it to finish.
    pub async fn start(&mut self, cmd: &str) -> Result<()> {
        if self.state != State::Created {
            return Err(AdbError::AlreadyStarted);
        }
        let mut transport = self.transport.take().ok_or(AdbError::AlreadyStarted)?;
        self.state = State::Running;

        if let Err(e) = Self::open_shell(&mut transport, cmd).await {
            self.state = State::Closed;
            let close = transport.close().await;
            return AdbError::join(Err(e), close);
        }

        let (reader, writer) = shell::split(transport.into_connection())?;
        let (slot, completion) = CompletionSlot::new();
        self.completion = Some(completion);

        let abort = Arc::clone(&self.closer.abort);
        let source = self.stdin.take();
        let writer_slot = slot.clone();
        let writer_task = tokio::spawn(async move {
            forward_stdin(writer, source, abort, writer_slot).await;
        });

        let abort = Arc::clone(&self.closer.abort);
        let sinks = OutputSinks {
            stdout: self.stdout.take(),
            stderr: self.stderr.take(),
        };
        let reader_task = tokio::spawn(async move {
            let outcome = read_until_exit(reader, sinks, &abort).await;
            if let Some(result) = outcome {
                slot.complete(result);
            }
        });

        self.closer.register(writer_task.abort_handle());
        self.closer.register(reader_task.abort_handle());
        self.tasks.push(writer_task);
        self.tasks.push(reader_task);

        // A close() that raced with start() must still cancel the new tasks.
        if self.closer.is_aborted() {
            self.closer.close();
        }

        debug!("Shell session started: {}", cmd);
        Ok(())
    }

    async fn open_shell(transport: &mut HostTransport, cmd: &str) -> Result<()> {
        transport.send(&host::shell_v2(cmd)).await?;
        transport.verify_response().await
    }

    /// Wait for the command to finish, then release the connection and pipes.
    pub async fn wait(&mut self) -> Result<()> {
        match self.state {
            State::Created => return Err(AdbError::NotStarted),
            State::Closed => return Err(AdbError::AlreadyWaited),
            State::Running => {}
        }
        if self.closer.is_aborted() {
            return Err(AdbError::AlreadyWaited);
        }
        let completion = self.completion.take().ok_or(AdbError::AlreadyWaited)?;

        // Both senders vanish without a result only when the tasks were cancelled.
        let outcome = completion.await.unwrap_or(Err(AdbError::SessionAborted));
        let teardown = self.close().await;
        AdbError::join(outcome, teardown)
    }

    /// Abort any running command and free the session's resources. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.closer.close();
        self.state = State::Closed;

        let mut result = Ok(());
        if let Some(mut transport) = self.transport.take() {
            result = AdbError::join(result, transport.close().await);
        }
        // Unstarted sources and sinks, including pipe ends, are released here.
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    result = AdbError::join(
                        result,
                        Err(AdbError::Io(io::Error::other(format!(
                            "session task panicked: {}",
                            e
                        )))),
                    );
                }
            }
        }
        result
    }

    /// Start `cmd` and wait for it.
    pub async fn run(&mut self, cmd: &str) -> Result<()> {
        self.start(cmd).await?;
        self.wait().await
    }

    /// Run `cmd`, capturing its standard output.
    ///
    /// The outer error covers misuse and failures to start; the command's own
    /// outcome is in [`ShellOutput::status`].
    pub async fn output(&mut self, cmd: &str) -> Result<ShellOutput> {
        if self.stdout.is_some() {
            return Err(AdbError::StreamAlreadySet(StdStream::Stdout));
        }
        let buffer = SharedBuffer::default();
        self.set_stdout(buffer.clone())?;
        self.capture(cmd, buffer).await
    }

    /// Run `cmd`, capturing standard output and standard error interleaved.
    pub async fn combined_output(&mut self, cmd: &str) -> Result<ShellOutput> {
        if self.stdout.is_some() {
            return Err(AdbError::StreamAlreadySet(StdStream::Stdout));
        }
        if self.stderr.is_some() {
            return Err(AdbError::StreamAlreadySet(StdStream::Stderr));
        }
        let buffer = SharedBuffer::default();
        self.set_stdout(buffer.clone())?;
        self.set_stderr(buffer.clone())?;
        self.capture(cmd, buffer).await
    }

    async fn capture(&mut self, cmd: &str, buffer: SharedBuffer) -> Result<ShellOutput> {
        self.start(cmd).await?;
        let status = self.wait().await;
        Ok(ShellOutput {
            output: buffer.take(),
            status,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.closer.close();
    }
}

/// Bytes captured by [`Session::output`] and the command's terminal result.
#[derive(Debug)]
pub struct ShellOutput {
    pub output: Vec<u8>,
    pub status: Result<()>,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status.is_ok()
    }

    /// `Some(0)` on success, the remote code on a nonzero exit, `None` otherwise.
    pub fn exit_code(&self) -> Option<i32> {
        match &self.status {
            Ok(()) => Some(0),
            Err(e) => e.exit_status().map(|s| s.code()),
        }
    }

    pub fn into_result(self) -> Result<Vec<u8>> {
        self.status.map(|()| self.output)
    }
}

/// Writer task: copy stdin to the device, then close the remote stdin.
async fn forward_stdin(
    mut writer: ShellWriter,
    source: Option<BoxedSource>,
    abort: Arc<AtomicBool>,
    slot: CompletionSlot,
) {
    if let Some(mut source) = source {
        let mut buffer = [0u8; STDIN_CHUNK_SIZE];
        loop {
            if abort.load(Ordering::SeqCst) {
                return;
            }
            let n = match source.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    slot.complete(Err(AdbError::Io(io::Error::new(
                        e.kind(),
                        format!("failed to copy stdin: {}", e),
                    ))));
                    return;
                }
            };
            if let Err(e) = writer.send(ShellMessageType::Stdin, &buffer[..n]).await {
                // The reader owns the terminal result for connection failures.
                debug!("Stopping stdin forwarding: {}", e);
                return;
            }
        }
    }

    if let Err(e) = writer.send(ShellMessageType::CloseStdin, &[]).await {
        debug!("Failed to close remote stdin: {}", e);
    }
}

/// Reader task: route frames until `EXIT`, an error, or EOF.
///
/// Returns `None` when the session was aborted and no result should be delivered.
async fn read_until_exit(
    mut reader: ShellReader,
    mut sinks: OutputSinks,
    abort: &AtomicBool,
) -> Option<Result<()>> {
    let outcome = loop {
        if abort.load(Ordering::SeqCst) {
            return None;
        }
        let message = match reader.read().await {
            Ok(Some(message)) => message,
            Ok(None) => break Err(AdbError::ExitMissing),
            Err(e) => break Err(e),
        };

        match message.kind {
            ShellMessageType::Stdout | ShellMessageType::Stderr => {
                let stream = if message.kind == ShellMessageType::Stdout {
                    StdStream::Stdout
                } else {
                    StdStream::Stderr
                };
                if let Err(e) = sinks.write(stream, &message.payload).await {
                    break Err(e);
                }
            }
            ShellMessageType::Exit => {
                // Nothing after EXIT is read.
                break match message.payload.first() {
                    Some(0) => Ok(()),
                    Some(&code) => Err(AdbError::Exit(ExitStatus::new(code))),
                    None => Err(AdbError::MalformedExit),
                };
            }
            other => break Err(AdbError::UnknownShellMessage(other as u8)),
        }
    };

    let close = sinks.close_pipes().await;
    if let Err(e) = &outcome {
        debug!("Shell session finished: {}", e);
    }
    Some(AdbError::join(outcome, close))
}

/// In-memory sink shared between the session and its caller.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Caller's end of a [`Session::stdout_pipe`] or [`Session::stderr_pipe`].
#[derive(Debug)]
pub struct PipeReader(DuplexStream);

impl AsyncRead for PipeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

/// Caller's end of a [`Session::stdin_pipe`].
#[derive(Debug)]
pub struct PipeWriter(DuplexStream);

impl AsyncWrite for PipeWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_shutdown(cx)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
