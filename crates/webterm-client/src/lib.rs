//! Client library for webterm terminal sessions.

pub mod line_editor;
pub mod panel;

use futures::{SinkExt as _, StreamExt as _};
use tokio_tungstenite::tungstenite::Message;
use webterm_protocol::{KILL_SESSION, connect_path};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Inline text rendered when the connection closes. The session itself keeps
/// running server-side.
pub const CONNECTION_CLOSED_NOTICE: &str = "\r\nTerminal connection closed\r\n";

/// Inline text for a socket-level error.
#[must_use]
pub fn error_notice(err: &Error) -> String {
    format!("\r\nWebSocket error: {err}\r\n")
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// One tab's connection to the backend. Reconnecting with the same session
/// id replays everything the shell has printed so far.
pub struct Client {
    stream: WsStream,
}

impl Client {
    /// Connect to `server` (host:port) for `session_id`, optionally asking
    /// for a working directory if this attach ends up creating the session.
    pub async fn connect(server: &str, session_id: &str, cwd: Option<&str>) -> Result<Self> {
        let url = format!("ws://{server}{}", connect_path(session_id, cwd));
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(Self { stream })
    }

    /// Send raw keystroke bytes to the shell.
    pub async fn send(&mut self, data: &str) -> Result<()> {
        self.stream.send(Message::text(data)).await?;
        Ok(())
    }

    /// Next output chunk, or `None` once the connection is closed.
    pub async fn next_chunk(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.as_str().to_string())),
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    /// Terminate the session server-side and drop the connection.
    pub async fn kill_session(mut self) -> Result<()> {
        self.stream.send(Message::text(KILL_SESSION)).await?;
        let _ = self.stream.close(None).await;
        Ok(())
    }
}
