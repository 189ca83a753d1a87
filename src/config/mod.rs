//! Daemon configuration.
//!
//! Priority (highest to lowest):
//!   1. CLI / env — passed as `Some(value)` from clap
//!   2. TOML file at `{data_dir}/config.toml`
//!   3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::identity::Identity;

const DEFAULT_PORT: u16 = 4400;
const DEFAULT_GITHUB_API: &str = "https://api.github.com";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── Gateway configs ─────────────────────────────────────────────────────────

/// Issue tracker connection (`[github]` in config.toml).
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// Personal access token or installation token.
    pub token: String,
    /// `owner/repo` slug holding the coordination issues.
    pub repo: String,
    /// API base URL override (GitHub Enterprise). Default: api.github.com.
    #[serde(default = "default_github_api")]
    pub api_base: String,
}

fn default_github_api() -> String {
    DEFAULT_GITHUB_API.to_string()
}

/// Chat notification gateway (`[slack]` in config.toml). Absent = the daemon
/// runs without notifications; task-state transitions are unaffected.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub token: String,
    /// Destination ids for the five well-known channels. Channel names
    /// (`#ai-coordination`) work too; ids are more robust to renames.
    #[serde(default = "default_coordination_channel")]
    pub coordination_channel: String,
    #[serde(default = "default_cursor_channel")]
    pub cursor_channel: String,
    #[serde(default = "default_codex_channel")]
    pub codex_channel: String,
    #[serde(default = "default_replit_channel")]
    pub replit_channel: String,
    #[serde(default = "default_commits_channel")]
    pub commits_channel: String,
}

fn default_coordination_channel() -> String {
    "#ai-coordination".into()
}
fn default_cursor_channel() -> String {
    "#ai-cursor".into()
}
fn default_codex_channel() -> String {
    "#ai-codex".into()
}
fn default_replit_channel() -> String {
    "#ai-replit".into()
}
fn default_commits_channel() -> String {
    "#ai-commits".into()
}

// ─── TOML config file ────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port for the MCP and REST surfaces (default: 4400).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,coordd=trace".
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
    /// Process-wide default identity — last-resort resolution source.
    default_ai: Option<String>,
    /// Bearer token for the REST facade. None = REST auth disabled.
    api_token: Option<String>,
    /// Issue tracker connection (`[github]`).
    github: Option<GithubConfig>,
    /// Chat notifications (`[slack]`).
    slack: Option<SlackConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // Config loads before the tracing subscriber exists; write
            // straight to stderr so the parse failure is never swallowed.
            eprintln!(
                "warn: failed to parse {} — using defaults: {e}",
                path.display()
            );
            None
        }
    }
}

// ─── CoordConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CoordConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// "pretty" | "json".
    pub log_format: String,
    /// Process-wide default identity (COORDD_DEFAULT_AI). Used only as the
    /// last resolution source — the stdio transport's usual path.
    pub default_identity: Option<Identity>,
    /// Bearer token required by mutating REST routes. None = auth disabled
    /// (local-only, trusted loopback use).
    pub api_token: Option<String>,
    /// Issue tracker connection. None = offline (in-memory tracker).
    pub github: Option<GithubConfig>,
    /// Chat notifications. None = notifications disabled.
    pub slack: Option<SlackConfig>,
}

impl CoordConfig {
    /// Build config from CLI/env args + optional TOML file.
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = env_nonempty("COORDD_LOG_FORMAT")
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        // An invalid default identity is discarded, not an error — the
        // resolver treats it the same as unset.
        let default_identity = env_nonempty("COORDD_DEFAULT_AI")
            .or(toml.default_ai)
            .and_then(|s| match s.parse::<Identity>() {
                Ok(id) => Some(id),
                Err(()) => {
                    eprintln!("warn: unknown default identity '{s}' — ignoring");
                    None
                }
            });

        let api_token = env_nonempty("COORDD_API_TOKEN").or(toml.api_token);

        let github = match (
            env_nonempty("COORDD_GITHUB_TOKEN"),
            env_nonempty("COORDD_GITHUB_REPO"),
        ) {
            (Some(token), Some(repo)) => Some(GithubConfig {
                token,
                repo,
                api_base: env_nonempty("COORDD_GITHUB_API")
                    .unwrap_or_else(default_github_api),
            }),
            _ => toml.github,
        };

        let slack = match env_nonempty("COORDD_SLACK_TOKEN") {
            Some(token) => Some(SlackConfig {
                token,
                coordination_channel: env_nonempty("COORDD_SLACK_COORDINATION_CHANNEL")
                    .unwrap_or_else(default_coordination_channel),
                cursor_channel: env_nonempty("COORDD_SLACK_CURSOR_CHANNEL")
                    .unwrap_or_else(default_cursor_channel),
                codex_channel: env_nonempty("COORDD_SLACK_CODEX_CHANNEL")
                    .unwrap_or_else(default_codex_channel),
                replit_channel: env_nonempty("COORDD_SLACK_REPLIT_CHANNEL")
                    .unwrap_or_else(default_replit_channel),
                commits_channel: env_nonempty("COORDD_SLACK_COMMITS_CHANNEL")
                    .unwrap_or_else(default_commits_channel),
            }),
            None => toml.slack,
        };

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
            default_identity,
            api_token,
            github,
            slack,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("coordd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("coordd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("coordd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("coordd");
        }
    }
    PathBuf::from(".coordd")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
