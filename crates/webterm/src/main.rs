//! Unified CLI for the webterm terminal backend.

use eyre::WrapErr as _;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use webterm_client::line_editor::{Action, LineEditor};

#[derive(clap::Parser)]
#[command(name = "webterm", about = "Terminal session backend for browser-based editors")]
struct Args {
    /// Enable debug logging to ~/.webterm/logs/
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the backend server (default when no command given).
    Serve {
        /// Listen address (overrides the config file).
        #[arg(long)]
        bind: Option<String>,
    },
    /// Attach an interactive terminal to a session, creating it on demand.
    Attach {
        /// Session ID to attach to.
        session: String,
        /// Server address.
        #[arg(long, default_value = "127.0.0.1:3000")]
        url: String,
        /// Working directory for a newly created session.
        #[arg(long)]
        cwd: Option<String>,
    },
    /// Kill a running session.
    Kill {
        /// Session ID to kill.
        session: String,
        /// Server address.
        #[arg(long, default_value = "127.0.0.1:3000")]
        url: String,
    },
}

async fn run_serve(bind: Option<String>) -> eyre::Result<()> {
    let mut config = webterm_config::load().wrap_err("failed to load configuration")?;
    if let Some(bind) = bind {
        config.bind = bind;
    }
    webterm_server::run(webterm_server::ServerConfig::from_config(&config)).await
}

/// Apply one batch of keystrokes through the line editor: echoes paint the
/// local terminal, sends go to the socket.
async fn apply_keys(
    editor: &mut LineEditor,
    data: &str,
    client: &mut webterm_client::Client,
    stdout: &mut tokio::io::Stdout,
) -> eyre::Result<()> {
    for action in editor.key(data) {
        match action {
            Action::Echo(text) => stdout.write_all(text.as_bytes()).await?,
            Action::Send(text) => client.send(&text).await?,
        }
    }
    stdout.flush().await?;
    Ok(())
}

async fn run_attach(session: String, url: String, cwd: Option<String>) -> eyre::Result<()> {
    let mut client = webterm_client::Client::connect(&url, &session, cwd.as_deref())
        .await
        .wrap_err_with(|| format!("failed to connect to {url}"))?;

    crossterm::terminal::enable_raw_mode().wrap_err("failed to enter raw mode")?;
    eprint!("\x1b[2m[webterm: {session}]\x1b[0m\r\n");

    let mut editor = LineEditor::new();
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut stdin_buf = vec![0u8; 4096];

    let result = loop {
        tokio::select! {
            read = stdin.read(&mut stdin_buf) => {
                match read {
                    Ok(0) => break Ok(()),
                    Ok(n) => {
                        let data = String::from_utf8_lossy(&stdin_buf[..n]).into_owned();
                        if let Err(e) = apply_keys(&mut editor, &data, &mut client, &mut stdout).await {
                            break Err(e);
                        }
                    }
                    Err(e) => break Err(e.into()),
                }
            }
            chunk = client.next_chunk() => {
                match chunk {
                    Ok(Some(data)) => {
                        let _ = stdout.write_all(data.as_bytes()).await;
                        let _ = stdout.flush().await;
                    }
                    Ok(None) => {
                        let _ = stdout
                            .write_all(webterm_client::CONNECTION_CLOSED_NOTICE.as_bytes())
                            .await;
                        let _ = stdout.flush().await;
                        break Ok(());
                    }
                    Err(e) => {
                        let _ = stdout
                            .write_all(webterm_client::error_notice(&e).as_bytes())
                            .await;
                        let _ = stdout.flush().await;
                        break Ok(());
                    }
                }
            }
        }
    };

    let _ = crossterm::terminal::disable_raw_mode();
    result
}

async fn run_kill(session: String, url: String) -> eyre::Result<()> {
    let client = webterm_client::Client::connect(&url, &session, None)
        .await
        .wrap_err_with(|| format!("failed to connect to {url}"))?;
    client.kill_session().await?;
    println!("killed session {session}");
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let args = <Args as clap::Parser>::parse();

    // Setup logging
    if args.debug {
        let log_dir = dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".webterm")
            .join("logs");
        std::fs::create_dir_all(&log_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let log_path = log_dir.join(format!("{timestamp}.log"));
        let log_file = std::fs::File::create(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .init();

        eprintln!("debug log: {}", log_path.display());
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    let command = args.command.unwrap_or(Command::Serve { bind: None });

    match command {
        Command::Serve { bind } => run_serve(bind).await?,
        Command::Attach { session, url, cwd } => run_attach(session, url, cwd).await?,
        Command::Kill { session, url } => run_kill(session, url).await?,
    }

    Ok(())
}
