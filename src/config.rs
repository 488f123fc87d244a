//! TOML configuration for mail delivery and logging.
//!
//! The file is optional: a missing file yields the defaults, so a report
//! program works out of the box against a local MTA.

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::Deserialize;

use crate::constants;

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Report email settings.
    pub mail: MailSettings,
    /// Diagnostic logging settings.
    pub logging: LoggingSettings,
}

/// Sender address and SMTP endpoint used for report emails.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailSettings {
    /// `From:` address of every report email.
    pub from: String,
    /// SMTP relay to submit through.
    pub smtp: SmtpSettings,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from: constants::DEFAULT_FROM_ADDR.to_string(),
            smtp: SmtpSettings::default(),
        }
    }
}

/// SMTP endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Upgrade the connection with STARTTLS (required when credentials are sent
    /// over the network).
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_SMTP_HOST.to_string(),
            port: constants::DEFAULT_SMTP_PORT,
            starttls: false,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` env-filter directive, overridden by `RUST_LOG`.
    pub filter: String,
    /// Capture a backtrace for execution errors written into the report.
    pub backtrace: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
            backtrace: true,
        }
    }
}

impl Config {
    /// Load the config from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load the config from [`default_path`].
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_default() -> Result<Self> {
        match default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse TOML config text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or mistyped fields.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// `$CLIPROGRAM_CONFIG` if set, otherwise `<config dir>/cliprogram/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(constants::CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| {
        dir.join(constants::APP_NAME)
            .join(constants::CONFIG_FILE_NAME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.mail.smtp.host, "localhost");
        assert_eq!(config.mail.smtp.port, 25);
        assert_eq!(config.mail.from, "reports@localhost");
        assert_eq!(config.logging.filter, "warn");
        assert!(config.logging.backtrace);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [mail]
            from = "cron@example.org"

            [mail.smtp]
            host = "smtp.example.org"
            port = 587
            starttls = true
            username = "cron"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.mail.from, "cron@example.org");
        assert_eq!(config.mail.smtp.host, "smtp.example.org");
        assert_eq!(config.mail.smtp.port, 587);
        assert!(config.mail.smtp.starttls);
        assert_eq!(config.mail.smtp.username.as_deref(), Some("cron"));
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(Config::parse("[mail.smtp]\nport = \"twenty-five\"").is_err());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nfilter = \"debug\"\nbacktrace = false").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.filter, "debug");
        assert!(!config.logging.backtrace);
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not = [valid").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse config file"));
    }
}
