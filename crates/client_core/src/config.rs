use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "forum.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub server_url: String,
    /// Pre-minted invisible-challenge token, for environments without a
    /// challenge script.
    pub challenge_token: Option<String>,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            challenge_token: None,
            log_filter: "info".into(),
        }
    }
}

impl ClientSettings {
    /// Scheme, host and port of the server, used to turn navigation paths
    /// into absolute URLs.
    pub fn origin(&self) -> anyhow::Result<String> {
        let url = Url::parse(&self.server_url)
            .with_context(|| format!("invalid server url '{}'", self.server_url))?;
        Ok(url.origin().ascii_serialization())
    }
}

/// Defaults, then `forum.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> ClientSettings {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(path: &Path, var: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, var);

    settings
}

fn apply_file(settings: &mut ClientSettings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(error = %err, "ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("challenge_token") {
        settings.challenge_token = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("FORUM_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("FORUM_CHALLENGE_TOKEN") {
        settings.challenge_token = Some(v);
    }
    if let Some(v) = var("APP__CHALLENGE_TOKEN") {
        settings.challenge_token = Some(v);
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut settings = ClientSettings::default();
        apply_file(
            &mut settings,
            "server_url = \"https://forum.test\"\nchallenge_token = \"tok\"\n",
        );

        assert_eq!(settings.server_url, "https://forum.test");
        assert_eq!(settings.challenge_token.as_deref(), Some("tok"));
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn malformed_file_keeps_defaults() {
        let mut settings = ClientSettings::default();
        apply_file(&mut settings, "server_url = [not toml");
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn app_prefixed_env_wins_over_plain_env() {
        let mut settings = ClientSettings::default();
        apply_env(&mut settings, |key| match key {
            "FORUM_SERVER_URL" => Some("http://plain.test".into()),
            "APP__SERVER_URL" => Some("http://app.test".into()),
            "APP__LOG_FILTER" => Some("debug".into()),
            _ => None,
        });

        assert_eq!(settings.server_url, "http://app.test");
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.challenge_token, None);
    }

    #[test]
    fn loads_settings_file_from_disk() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let temp_root = env::temp_dir().join(format!("forum_client_config_test_{suffix}"));
        fs::create_dir_all(&temp_root).expect("temp root");
        let path = temp_root.join("forum.toml");
        fs::write(&path, "log_filter = \"warn\"\n").expect("write settings");

        let settings = load_settings_with(&path, |_| None);
        assert_eq!(settings.log_filter, "warn");

        let settings = load_settings_with(&path, |key| {
            (key == "APP__LOG_FILTER").then(|| "trace".to_string())
        });
        assert_eq!(settings.log_filter, "trace");

        fs::remove_dir_all(temp_root).expect("cleanup");
    }

    #[test]
    fn origin_drops_path_and_query() {
        let settings = ClientSettings {
            server_url: "https://forum.test:8443/some/path?x=1".into(),
            ..ClientSettings::default()
        };
        assert_eq!(settings.origin().expect("origin"), "https://forum.test:8443");
    }
}
