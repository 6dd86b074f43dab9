//! Shell process spawning for terminal sessions.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use webterm_config::ShellProfile;

pub(crate) struct SpawnedShell {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Resolve the working directory for a new session: the client-supplied path
/// made absolute, falling back to the server's own current directory.
pub(crate) fn resolve_workdir(cwd: Option<&str>) -> PathBuf {
    match cwd {
        Some(dir) if !dir.is_empty() => {
            std::path::absolute(dir).unwrap_or_else(|_| PathBuf::from(dir))
        }
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Spawn a shell with piped stdio and the inherited environment plus the
/// profile's terminal-capability and color-forcing variables.
pub(crate) fn spawn_shell(
    profile: &ShellProfile,
    workdir: &Path,
) -> std::io::Result<SpawnedShell> {
    let mut child = Command::new(&profile.program)
        .args(&profile.args)
        .current_dir(workdir)
        .envs(profile.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("child stdin not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("child stderr not piped"))?;

    Ok(SpawnedShell {
        child,
        stdin,
        stdout,
        stderr,
    })
}
