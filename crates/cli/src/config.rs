use std::path::{Path, PathBuf};
use std::time::Duration;

use chat::ChatSettings;
use chat::controller::{DEFAULT_GREETING, DEFAULT_SEND_FAILURE_PREFIX};
use chat::store::DEFAULT_NEW_SESSION_TITLE;
use proto::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat screen behaviour.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Agents backend connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the REST backend, without the trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Chat screen text and behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Agent opened by `xiagents chat` when `--agent` is omitted.
    pub default_agent: Option<String>,
    pub greeting: String,
    pub new_session_title: String,
    pub send_failure_prefix: String,
    /// Agents whose backend keeps a session history.
    pub session_agents: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_agent: None,
            greeting: DEFAULT_GREETING.to_string(),
            new_session_title: DEFAULT_NEW_SESSION_TITLE.to_string(),
            send_failure_prefix: DEFAULT_SEND_FAILURE_PREFIX.to_string(),
            session_agents: vec!["pixel".to_string()],
        }
    }
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            // Look in current dir, then home dir
            let cwd = std::env::current_dir().ok()?.join("config.toml");
            if cwd.exists() {
                return Some(cwd);
            }
            let home_config = config_home()?.join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var("XIAGENTS_BASE_URL")
            && !url.trim().is_empty()
        {
            config.server.base_url = url;
        }
        if let Ok(secs) = std::env::var("XIAGENTS_TIMEOUT_SECS") {
            let parsed = secs
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "XIAGENTS_TIMEOUT_SECS".to_string(),
                    reason: e.to_string(),
                })?;
            config.server.timeout_secs = parsed;
        }
        if let Ok(agent) = std::env::var("XIAGENTS_AGENT")
            && !agent.trim().is_empty()
        {
            config.chat.default_agent = Some(agent);
        }

        config.validate()?;
        debug!(
            base_url = %config.server.base_url,
            timeout_secs = %config.server.timeout_secs,
            default_agent = ?config.chat.default_agent,
            "Config loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "server.base_url".to_string(),
                reason: format!("expected an http(s) URL, got {url:?}"),
            });
        }
        if self.server.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    /// Settings handed to every chat screen.
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            greeting: self.chat.greeting.clone(),
            new_session_title: self.chat.new_session_title.clone(),
            send_failure_prefix: self.chat.send_failure_prefix.clone(),
            session_agents: self.chat.session_agents.clone(),
        }
    }
}

/// `~/.xiagents`, when `HOME` is set.
pub fn config_home() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".xiagents"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScopedEnv, with_locked_env};

    const ENV_KEYS: [&str; 3] = ["XIAGENTS_BASE_URL", "XIAGENTS_TIMEOUT_SECS", "XIAGENTS_AGENT"];

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write config");
    }

    /// Environment with every override variable unset.
    fn clean_env() -> ScopedEnv {
        let mut env = ScopedEnv::new();
        for key in ENV_KEYS {
            env.remove(key);
        }
        env
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.base_url, "http://localhost:8000");
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.chat.session_agents, vec!["pixel".to_string()]);
        assert_eq!(cfg.chat.default_agent, None);
        assert_eq!(cfg.chat_settings(), ChatSettings::default());
    }

    #[test]
    fn load_reads_explicit_file_path() {
        with_locked_env(|| {
            let _env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(
                &config_path,
                r#"
[server]
base_url = "https://agents.example.com"
timeout_secs = 5

[chat]
default_agent = "axel"
greeting = "Olá Sr. Ximendes"
new_session_title = "Nova conversa"
send_failure_prefix = "Erro ao enviar mensagem"
session_agents = ["pixel", "nova"]
"#,
            );
            let cfg = Config::load(Some(&config_path)).expect("config should parse");
            assert_eq!(cfg.server.base_url, "https://agents.example.com");
            assert_eq!(cfg.timeout(), Duration::from_secs(5));
            assert_eq!(cfg.chat.default_agent.as_deref(), Some("axel"));

            let settings = cfg.chat_settings();
            assert_eq!(settings.greeting, "Olá Sr. Ximendes");
            assert_eq!(settings.new_session_title, "Nova conversa");
            assert_eq!(settings.send_failure_prefix, "Erro ao enviar mensagem");
            assert_eq!(settings.session_agents.len(), 2);
        });
    }

    #[test]
    fn partial_sections_keep_defaults() {
        with_locked_env(|| {
            let _env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "[server]\ntimeout_secs = 10\n");

            let cfg = Config::load(Some(&config_path)).expect("config should parse");
            assert_eq!(cfg.server.base_url, DEFAULT_BASE_URL);
            assert_eq!(cfg.server.timeout_secs, 10);
            assert_eq!(cfg.chat, ChatConfig::default());
        });
    }

    #[test]
    fn env_overrides_file_values() {
        with_locked_env(|| {
            let mut env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "[server]\nbase_url = \"http://file:1\"\n");

            env.set("XIAGENTS_BASE_URL", "http://env:2")
                .set("XIAGENTS_TIMEOUT_SECS", "12")
                .set("XIAGENTS_AGENT", "pixel");

            let cfg = Config::load(Some(&config_path)).expect("config should load");
            assert_eq!(cfg.server.base_url, "http://env:2");
            assert_eq!(cfg.server.timeout_secs, 12);
            assert_eq!(cfg.chat.default_agent.as_deref(), Some("pixel"));
        });
    }

    #[test]
    fn blank_env_values_are_ignored() {
        with_locked_env(|| {
            let mut env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "");

            env.set("XIAGENTS_BASE_URL", "  ").set("XIAGENTS_AGENT", "");

            let cfg = Config::load(Some(&config_path)).expect("config should load");
            assert_eq!(cfg.server.base_url, DEFAULT_BASE_URL);
            assert_eq!(cfg.chat.default_agent, None);
        });
    }

    #[test]
    fn invalid_timeout_env_is_rejected() {
        with_locked_env(|| {
            let mut env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "");
            env.set("XIAGENTS_TIMEOUT_SECS", "soon");

            match Config::load(Some(&config_path)) {
                Err(ConfigError::InvalidValue { field, .. }) => {
                    assert_eq!(field, "XIAGENTS_TIMEOUT_SECS")
                }
                other => panic!("unexpected result: {other:?}"),
            }
        });
    }

    #[test]
    fn zero_timeout_and_bad_url_fail_validation() {
        let mut cfg = Config::default();
        cfg.server.timeout_secs = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "server.timeout_secs"
        ));

        let mut cfg = Config::default();
        cfg.server.base_url = "localhost:8000".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "server.base_url"
        ));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        with_locked_env(|| {
            let _env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("config.toml");
            write_file(&config_path, "[server\nbase_url = 1");
            let err = Config::load(Some(&config_path)).expect_err("parse must fail");
            assert!(matches!(err, ConfigError::Toml(_)));
        });
    }

    #[test]
    fn missing_explicit_file_is_io_error() {
        with_locked_env(|| {
            let _env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let err = Config::load(Some(&tmp.path().join("absent.toml")))
                .expect_err("missing file must fail");
            assert!(matches!(err, ConfigError::Io(_)));
        });
    }

    #[test]
    fn load_falls_back_to_home_config() {
        with_locked_env(|| {
            let mut env = clean_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            write_file(
                &tmp.path().join(".xiagents").join("config.toml"),
                "[chat]\ndefault_agent = \"nova\"\n",
            );
            env.set("HOME", tmp.path().to_str().expect("utf-8 path"));

            let cfg = Config::load(None).expect("home config should load");
            assert_eq!(cfg.chat.default_agent.as_deref(), Some("nova"));
            assert_eq!(config_home(), Some(tmp.path().join(".xiagents")));
        });
    }
}
