use anyhow::{Context, Result};
use clinic_calendar_core::{GoogleSettings, SyncSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 4096;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    /// OAuth client and API endpoints for Google Calendar
    pub google: GoogleSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Get the config file path (~/.config/clinic-calendar/config.toml)
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("clinic-calendar");
    Ok(config_dir.join("config.toml"))
}

/// Load config from `path`, or from the default location when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };

    if !path.exists() {
        anyhow::bail!(
            "Config file not found at {}\n\n\
            Create it with your Google OAuth credentials:\n\n\
            [google]\n\
            client_id = \"your-client-id.apps.googleusercontent.com\"\n\
            client_secret = \"your-client-secret\"\n\
            redirect_uri = \"http://localhost:{}/auth/callback\"",
            path.display(),
            DEFAULT_PORT
        );
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    parse_config(&contents).with_context(|| format!("Failed to parse config file at {}", path.display()))
}

fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;

    // Fail at startup rather than on the first sync
    config.sync.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(
            r#"
            [google]
            client_id = "abc.apps.googleusercontent.com"
            client_secret = "shh"
            redirect_uri = "http://localhost:4096/auth/callback"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.google.calendar_id, "primary");
        assert_eq!(config.sync.window_days, 30);
        assert_eq!(config.sync.status_display_secs, 3);
        assert_eq!(config.sync.utc_offset, "-03:00");
    }

    #[test]
    fn test_overrides_are_read() {
        let config = parse_config(
            r#"
            [server]
            port = 8080

            [google]
            client_id = "abc"
            client_secret = "shh"
            redirect_uri = "http://localhost:8080/auth/callback"
            calendar_id = "clinic@group.calendar.google.com"

            [sync]
            window_days = 14
            utc_offset = "+01:00"
            time_zone = "Europe/Lisbon"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.google.calendar_id, "clinic@group.calendar.google.com");
        assert_eq!(config.sync.window_days, 14);
        assert_eq!(config.sync.time_zone, "Europe/Lisbon");
    }

    #[test]
    fn test_bad_offset_is_rejected() {
        let result = parse_config(
            r#"
            [google]
            client_id = "abc"
            client_secret = "shh"
            redirect_uri = "http://localhost:4096/auth/callback"

            [sync]
            utc_offset = "Brasilia"
            "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        let result = parse_config(
            r#"
            [google]
            client_id = "abc"
            client_secret = "shh"
            redirect_uri = "http://localhost:4096/auth/callback"

            [sync]
            window_days = 9223372036854775
            "#,
        );

        assert!(result.unwrap_err().to_string().contains("window_days"));
    }

    #[test]
    fn test_missing_file_explains_how_to_create_it() {
        let err = load_config(Some(Path::new("/nonexistent/clinic-calendar.toml"))).unwrap_err();

        assert!(err.to_string().contains("[google]"));
    }
}
