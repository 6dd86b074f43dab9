//! Terminal session backend for a browser-based code editor.
//!
//! One real shell process per session id, a replayable output history, and
//! any number of reconnecting WebSockets per session. Sockets come and go;
//! sessions only die on the explicit kill sentinel or backend exit.

pub mod history;
pub mod registry;
mod shell;
pub mod ws;

use eyre::WrapErr as _;
use webterm_config::{Config, ShellProfile, effective_shell};

/// Configuration for running the backend.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// Shell profile used for every new session.
    pub shell: ShellProfile,
    /// Replay history cap per session, in chunks.
    pub history_limit: usize,
}

impl ServerConfig {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            bind: config.bind.clone(),
            shell: effective_shell(config),
            history_limit: config.history_limit,
        }
    }
}

/// Run the backend until the process exits.
pub async fn run(config: ServerConfig) -> eyre::Result<()> {
    let registry = registry::SessionRegistry::new(config.shell, config.history_limit);
    let app = ws::router(registry);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .wrap_err_with(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.wrap_err("server error")?;
    Ok(())
}
