use std::{collections::HashMap, fs};

use anyhow::{bail, Context, Result};
use url::Url;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub credentials_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            credentials_url: "sqlite://./data/credentials.sqlite3".into(),
        }
    }
}

/// Defaults, overridden by client.toml, overridden by environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("client.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("credentials_url") {
                settings.credentials_url = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("FOYER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("FOYER_CREDENTIALS_URL") {
        settings.credentials_url = v;
    }

    settings
}

/// Parses the configured server URL and strips any trailing slash so
/// endpoint paths can be appended directly.
pub fn validate_server_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).with_context(|| format!("invalid server url '{raw}'"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported server url scheme '{other}', expected http or https"),
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_point_at_local_backend() {
        let settings = Settings::default();
        assert_eq!(settings.server_url, "http://127.0.0.1:8443");
        assert_eq!(settings.credentials_url, "sqlite://./data/credentials.sqlite3");
    }

    #[test]
    fn validated_url_loses_its_trailing_slash() {
        assert_eq!(
            validate_server_url("https://auth.example.com/").expect("valid"),
            "https://auth.example.com"
        );
        assert_eq!(
            validate_server_url("  http://127.0.0.1:9000  ").expect("valid"),
            "http://127.0.0.1:9000"
        );
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(validate_server_url("ftp://auth.example.com").is_err());
        assert!(validate_server_url("not a url").is_err());
    }
}
