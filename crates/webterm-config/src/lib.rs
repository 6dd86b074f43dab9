//! Configuration for the webterm backend.

/// PowerShell startup commands that neutralize the built-in `clear`/`cls`
/// aliases and redefine them to emit real clear-screen escapes, so the
/// client's escape scan sees them.
const POWERSHELL_PRELUDE: &str = "Remove-Item Alias:clear -Force -ErrorAction SilentlyContinue; \
     Remove-Item Alias:cls -Force -ErrorAction SilentlyContinue; \
     function global:clear { Write-Output \"$([char]27)[2J$([char]27)[3J$([char]27)[H\" }; \
     function global:cls { clear }";

/// Environment added on top of the inherited environment for every spawned
/// shell. TERM advertises terminal capability; the rest force color output
/// from tools that would otherwise detect the pipe and disable it.
const COLOR_ENV: [(&str, &str); 4] = [
    ("TERM", "xterm-256color"),
    ("FORCE_COLOR", "1"),
    ("NPM_CONFIG_COLOR", "always"),
    ("MOCHA_COLORS", "1"),
];

/// Host platform, for picking a shell profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// The platform this process is running on.
    #[must_use]
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

/// How to launch a shell: program, arguments, and extra environment.
///
/// The registry takes a profile at construction time, so tests can inject a
/// fake shell instead of branching on the host OS inline.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ShellProfile {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl ShellProfile {
    /// The built-in profile for a platform.
    #[must_use]
    pub fn builtin(platform: Platform) -> Self {
        let env = COLOR_ENV
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        match platform {
            Platform::Unix => Self {
                program: "bash".to_string(),
                args: vec!["-i".to_string()],
                env,
            },
            Platform::Windows => Self {
                program: "powershell.exe".to_string(),
                args: vec![
                    "-NoLogo".to_string(),
                    "-NoExit".to_string(),
                    "-Command".to_string(),
                    POWERSHELL_PRELUDE.to_string(),
                ],
                env,
            },
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    /// Address the backend listens on.
    pub bind: String,
    /// Replay history cap, in output chunks per session.
    pub history_limit: usize,
    /// Shell override; the platform default is used when absent.
    pub shell: Option<ShellProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            history_limit: 5000,
            shell: None,
        }
    }
}

/// Returns the config file path: ~/.config/webterm/config.toml
#[must_use]
pub fn config_path() -> std::path::PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("~/.config"))
        .join("webterm")
        .join("config.toml")
}

/// Load configuration from the default path, falling back to defaults if not
/// found.
pub fn load() -> eyre::Result<Config> {
    let path = config_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

/// The shell profile a config resolves to.
#[must_use]
pub fn effective_shell(config: &Config) -> ShellProfile {
    config
        .shell
        .clone()
        .unwrap_or_else(|| ShellProfile::builtin(Platform::host()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.history_limit, 5000);
        assert!(config.shell.is_none());
    }

    #[test]
    fn test_builtin_unix_profile() {
        let profile = ShellProfile::builtin(Platform::Unix);
        assert_eq!(profile.program, "bash");
        assert_eq!(profile.args, vec!["-i".to_string()]);
        assert!(
            profile
                .env
                .contains(&("TERM".to_string(), "xterm-256color".to_string()))
        );
    }

    #[test]
    fn test_builtin_windows_profile_neutralizes_aliases() {
        let profile = ShellProfile::builtin(Platform::Windows);
        assert_eq!(profile.program, "powershell.exe");
        let prelude = profile.args.last().unwrap();
        assert!(prelude.contains("Remove-Item Alias:clear"));
        assert!(prelude.contains("Remove-Item Alias:cls"));
    }

    #[test]
    fn test_parse_config_with_shell_override() {
        let config: Config = toml::from_str(
            r#"
            bind = "0.0.0.0:8080"

            [shell]
            program = "sh"
            args = ["-c", "cat"]
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.history_limit, 5000);
        let shell = effective_shell(&config);
        assert_eq!(shell.program, "sh");
        assert!(shell.env.is_empty());
    }

    #[test]
    fn test_effective_shell_falls_back_to_builtin() {
        let shell = effective_shell(&Config::default());
        assert_eq!(shell, ShellProfile::builtin(Platform::host()));
    }
}
