//! One relay session: a connection plus two pumps.

use super::input::{InputError, LineSource};
use super::target::ConnectionTarget;
use crate::base::neterror::NetError;
use crate::ws::render::{format_line, highlight, render_payload};
use crate::ws::{CloseCode, CloseFrame, Message, WebSocket};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Terminal error of a session. Each variant names the failed operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("websocket dial failed: {0}")]
    Connect(NetError),
    #[error("console read failed: {0}")]
    Input(#[from] InputError),
    #[error("websocket write failed: {0}")]
    Write(NetError),
    #[error("websocket read failed: {0}")]
    Read(NetError),
    /// The peer sent a close frame.
    #[error("websocket read failed: {0}")]
    Closed(CloseFrame),
}

impl SessionError {
    /// Short static label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SessionError::Connect(_) => "dial",
            SessionError::Input(_) => "console read",
            SessionError::Write(_) => "websocket write",
            SessionError::Read(_) | SessionError::Closed(_) => "websocket read",
        }
    }
}

/// Lifecycle of a session, as reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Running,
    Terminated,
}

/// An established session. Owns the connection, the input source and the
/// console writer until [`run`](Self::run) returns.
pub struct RelaySession<I, W> {
    ws: WebSocket,
    input: I,
    output: W,
    read_only: bool,
    color: bool,
}

impl<I, W> RelaySession<I, W>
where
    I: LineSource + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(ws: WebSocket, input: I, output: W) -> Self {
        Self {
            ws,
            input,
            output,
            read_only: false,
            color: false,
        }
    }

    /// Never send console lines.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Highlight rendered lines.
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Run both pumps until the first one fails, and return that failure.
    ///
    /// The surviving pump is aborted and the connection closed before this
    /// returns.
    pub async fn run(self) -> SessionError {
        let RelaySession {
            ws,
            input,
            output,
            read_only,
            color,
        } = self;

        let (done_tx, mut done_rx) = mpsc::channel::<SessionError>(1);
        let mut pumps = JoinSet::new();

        pumps.spawn(report(
            done_tx.clone(),
            receive_pump(ws.clone(), output, color),
        ));
        if !read_only {
            pumps.spawn(report(done_tx.clone(), send_pump(ws.clone(), input)));
        } else {
            drop(input);
        }
        drop(done_tx);

        let err = match done_rx.recv().await {
            Some(err) => err,
            // Both pumps exited without reporting; only possible if they panicked.
            None => SessionError::Read(NetError::ConnectionAborted),
        };

        pumps.shutdown().await;
        tracing::debug!(state = ?SessionState::Terminated, "session ended: {}", err);

        if let Err(e) = ws.close().await {
            tracing::debug!("close after session end failed: {}", e);
        }
        err
    }
}

/// Connect to `target`, then acquire the console, and run the session.
///
/// The console is only acquired once the connection is up, so a failed dial
/// never touches it.
pub async fn open_session<I, W, F>(target: &ConnectionTarget, color: bool, console: F) -> SessionError
where
    I: LineSource + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    F: FnOnce() -> (I, W),
{
    tracing::debug!(state = ?SessionState::Connecting, "dialing {}", target.url);
    let ws = match target.connect().await {
        Ok(ws) => ws,
        Err(e) => return SessionError::Connect(e),
    };
    tracing::debug!(state = ?SessionState::Running, local_addr = %ws.local_addr(), "connected");

    let (input, output) = console();
    RelaySession::new(ws, input, output)
        .read_only(target.read_only)
        .color(color)
        .run()
        .await
}

async fn report<F>(done: mpsc::Sender<SessionError>, pump: F)
where
    F: std::future::Future<Output = SessionError>,
{
    let err = pump.await;
    // Capacity one: only the first failure is kept.
    let _ = done.try_send(err);
}

async fn receive_pump<W>(ws: WebSocket, mut output: W, color: bool) -> SessionError
where
    W: AsyncWrite + Unpin,
{
    let local_addr = ws.local_addr();
    loop {
        let msg = match ws.recv().await {
            Ok(Some(msg)) => msg,
            Ok(None) => return SessionError::Read(NetError::ConnectionClosed),
            Err(e) => return SessionError::Read(e),
        };

        let kind = msg.kind();
        let Some(payload) = render_payload(kind, msg.payload()) else {
            match msg {
                Message::Close(frame) => {
                    let frame = frame.unwrap_or_else(|| CloseFrame::new(CloseCode::NO_STATUS, ""));
                    return SessionError::Closed(frame);
                }
                // Keepalives; tungstenite answers pings itself.
                Message::Ping(_) | Message::Pong(_) => tracing::debug!("{:?} frame skipped", kind),
                _ => tracing::warn!("unknown websocket frame type: {:?}", kind),
            }
            continue;
        };

        let line = highlight(&format_line(OffsetDateTime::now_utc(), local_addr, &payload), color);
        if let Err(e) = write_line(&mut output, &line).await {
            tracing::debug!("console write failed: {}", e);
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.flush().await
}

async fn send_pump<I: LineSource>(ws: WebSocket, mut input: I) -> SessionError {
    loop {
        let line = match input.read_line().await {
            Ok(line) => line,
            Err(e) => return SessionError::Input(e),
        };
        if let Err(e) = ws.send_text(line).await {
            return SessionError::Write(e);
        }
    }
}
