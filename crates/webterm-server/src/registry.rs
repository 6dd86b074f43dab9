//! Session registry: one live shell per session id, fanned out to N sockets.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::sync::mpsc;
use webterm_config::ShellProfile;
use webterm_protocol::KILL_SESSION;

use crate::history::ReplayBuffer;
use crate::shell::{SpawnedShell, resolve_workdir, spawn_shell};

const IO_BUFFER_SIZE: usize = 4096;

/// Identifies one attached socket within the registry.
pub type SocketId = u64;

type OutputSender = mpsc::UnboundedSender<String>;
type OutputReceiver = mpsc::UnboundedReceiver<String>;

/// Handle returned by [`SessionRegistry::attach`]: the socket's id and the
/// queue its replayed and live output chunks arrive on, in order.
pub struct AttachHandle {
    pub socket_id: SocketId,
    pub output: OutputReceiver,
}

/// What [`SessionRegistry::forward`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Written to the shell's stdin (best-effort).
    Written,
    /// The kill sentinel: session destroyed, the requester should close.
    Killed,
    /// No such session; the message was dropped.
    UnknownSession,
}

/// History and attached sockets, guarded together: the history append and
/// the fan-out for a chunk form one critical section, so replay order seen
/// by any attaching socket matches broadcast order exactly.
struct SessionState {
    history: ReplayBuffer,
    sockets: HashMap<SocketId, OutputSender>,
}

struct Session {
    stdin: tokio::sync::Mutex<tokio::process::ChildStdin>,
    child: tokio::sync::Mutex<tokio::process::Child>,
    state: parking_lot::Mutex<SessionState>,
}

/// Maps session ids to live shell processes for the lifetime of the backend.
///
/// A session outlives all of its sockets: detaching never touches the
/// process, and only the kill sentinel (or process exit) tears a shell down.
/// The registry map lock is held only for lookups and create/remove; all
/// per-chunk and per-message work takes per-session locks, so unrelated
/// sessions never block each other.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<parking_lot::Mutex<HashMap<String, Arc<Session>>>>,
    shell: Arc<ShellProfile>,
    history_limit: usize,
    next_socket: Arc<AtomicU64>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(shell: ShellProfile, history_limit: usize) -> Self {
        Self {
            sessions: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            shell: Arc::new(shell),
            history_limit,
            next_socket: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach a socket to `session_id`, spawning the shell on first use.
    ///
    /// For an existing session the full retained history is queued to the new
    /// socket before it is registered for live output, inside the session's
    /// state lock, so no broadcast can interleave between replay and live
    /// chunks. The map lock is held across check-and-spawn so two racing
    /// first attaches cannot create two shells for one id.
    pub fn attach(
        &self,
        session_id: &str,
        cwd: Option<&str>,
    ) -> std::io::Result<AttachHandle> {
        let socket_id = self.next_socket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(session_id) {
            let mut state = session.state.lock();
            for chunk in state.history.iter() {
                let _ = tx.send(chunk.to_string());
            }
            state.sockets.insert(socket_id, tx);
            return Ok(AttachHandle {
                socket_id,
                output: rx,
            });
        }

        let workdir = resolve_workdir(cwd);
        let SpawnedShell {
            child,
            stdin,
            stdout,
            stderr,
        } = spawn_shell(&self.shell, &workdir)?;
        tracing::info!(session = session_id, dir = %workdir.display(), "spawned shell");

        let mut state = SessionState {
            history: ReplayBuffer::new(self.history_limit),
            sockets: HashMap::new(),
        };
        state.sockets.insert(socket_id, tx);

        let session = Arc::new(Session {
            stdin: tokio::sync::Mutex::new(stdin),
            child: tokio::sync::Mutex::new(child),
            state: parking_lot::Mutex::new(state),
        });
        sessions.insert(session_id.to_string(), session.clone());
        drop(sessions);

        // stdout and stderr are independent producers; only per-stream order
        // is guaranteed.
        tokio::spawn(pump_stream(stdout, session.clone()));
        tokio::spawn(pump_stream(stderr, session));

        Ok(AttachHandle {
            socket_id,
            output: rx,
        })
    }

    /// Forward a socket message to the session's shell, or tear the session
    /// down if the message is the kill sentinel.
    pub async fn forward(&self, session_id: &str, message: &str) -> Forwarded {
        let session = self.sessions.lock().get(session_id).cloned();
        let Some(session) = session else {
            return Forwarded::UnknownSession;
        };

        if message == KILL_SESSION {
            self.sessions.lock().remove(session_id);
            let mut child = session.child.lock().await;
            if let Err(e) = child.kill().await {
                tracing::debug!(session = session_id, "kill error: {e}");
            }
            tracing::info!(session = session_id, "session killed");
            return Forwarded::Killed;
        }

        // One logical writer at a time; failures mean the process is dying
        // and are not surfaced per-socket.
        let mut stdin = session.stdin.lock().await;
        if let Err(e) = stdin.write_all(message.as_bytes()).await {
            tracing::debug!(session = session_id, "stdin write error: {e}");
        } else if let Err(e) = stdin.flush().await {
            tracing::debug!(session = session_id, "stdin flush error: {e}");
        }
        Forwarded::Written
    }

    /// Remove a socket from a session. Never touches the process; a session
    /// with zero sockets keeps running and accumulating history.
    pub fn detach(&self, session_id: &str, socket_id: SocketId) {
        if let Some(session) = self.sessions.lock().get(session_id) {
            session.state.lock().sockets.remove(&socket_id);
        }
    }

    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains_key(session_id)
    }

    /// Number of sockets currently attached to a session.
    #[must_use]
    pub fn socket_count(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .get(session_id)
            .map_or(0, |s| s.state.lock().sockets.len())
    }
}

async fn pump_stream<R>(mut reader: R, session: Arc<Session>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(IO_BUFFER_SIZE);
    loop {
        buf.clear();
        match reader.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf).into_owned();
                broadcast(&session, chunk);
            }
            Err(e) => {
                tracing::debug!("stream read error: {e}");
                break;
            }
        }
    }
}

fn broadcast(session: &Session, chunk: String) {
    let mut state = session.state.lock();
    state.history.push(chunk.clone());
    state.sockets.retain(|_, tx| tx.send(chunk.clone()).is_ok());
}
