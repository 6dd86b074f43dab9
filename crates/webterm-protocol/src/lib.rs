//! Shared wire-level constants and types for webterm terminal sessions.

/// Reserved client→server message that terminates a session instead of being
/// treated as shell input.
pub const KILL_SESSION: &str = "__KILL_SESSION__";

/// WebSocket endpoint path served by the backend.
pub const WS_PATH: &str = "/api/terminal/ws";

/// Escape sequence produced by the Up arrow key.
pub const ARROW_UP: &str = "\x1b[A";
/// Escape sequence produced by the Down arrow key.
pub const ARROW_DOWN: &str = "\x1b[B";
/// Carriage return, sent on Enter.
pub const CR: &str = "\r";
/// ETX, sent on Ctrl-C.
pub const CTRL_C: &str = "\x03";
/// Backspace byte.
pub const BACKSPACE: &str = "\x08";
/// Delete byte, normalized to [`BACKSPACE`] before forwarding.
pub const DELETE: &str = "\x7f";

/// Query parameters carried on the WebSocket connect URL.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ConnectParams {
    /// Working directory for a newly spawned shell. Optional; the server
    /// falls back to its own current directory.
    pub cwd: Option<String>,
    /// Opaque session identifier. Reusing an id re-attaches to the live
    /// session instead of spawning a new shell.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Session id used when the client does not supply one: milliseconds since
/// the epoch, matching ids minted client-side.
#[must_use]
pub fn fallback_session_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// Build the connect path-and-query for a session.
#[must_use]
pub fn connect_path(session_id: &str, cwd: Option<&str>) -> String {
    let mut path = format!("{WS_PATH}?sessionId={}", urlencoding::encode(session_id));
    if let Some(cwd) = cwd {
        path.push_str("&cwd=");
        path.push_str(&urlencoding::encode(cwd));
    }
    path
}

/// Backspace-space-backspace triplet repeated `len` times: wipes `len`
/// characters off the current prompt line.
#[must_use]
pub fn erase_sequence(len: usize) -> String {
    "\x08 \x08".repeat(len)
}

/// Whether an output chunk asks for the screen to be cleared.
///
/// Clients scan each chunk for clear-screen, scrollback-erase, cursor-home
/// and full-reset sequences so they can drop their local display buffer
/// before writing the chunk. This is the only ANSI knowledge in the system;
/// everything else is forwarded opaquely.
#[must_use]
pub fn requests_clear(chunk: &str) -> bool {
    chunk.contains("\x1b[2J")
        || chunk.contains("\x1b[3J")
        || chunk.contains("\x1b[H")
        || chunk.contains("\x1bc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erase_sequence() {
        assert_eq!(erase_sequence(0), "");
        assert_eq!(erase_sequence(2), "\x08 \x08\x08 \x08");
    }

    #[test]
    fn test_requests_clear() {
        assert!(requests_clear("\x1b[2J\x1b[H"));
        assert!(requests_clear("prefix \x1bc suffix"));
        assert!(!requests_clear("plain text\r\n"));
        assert!(!requests_clear("\x1b[31mcolored\x1b[0m"));
    }

    #[test]
    fn test_connect_path_encodes_query() {
        let path = connect_path("1700000000000", Some("/tmp/my project"));
        assert_eq!(
            path,
            "/api/terminal/ws?sessionId=1700000000000&cwd=%2Ftmp%2Fmy%20project"
        );
    }

    #[test]
    fn test_connect_path_without_cwd() {
        assert_eq!(
            connect_path("abc", None),
            "/api/terminal/ws?sessionId=abc"
        );
    }

    #[test]
    fn test_fallback_session_id_is_numeric() {
        let id = fallback_session_id();
        assert!(id.parse::<i64>().is_ok());
    }
}
