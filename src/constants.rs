//! Crate-wide constants: defaults, file names, CLI ids and messages.

// === Application Metadata ===

/// Crate name (from Cargo.toml).
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Current crate version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Path Configuration ===

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "CLIPROGRAM_CONFIG";
/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

// === Mail Defaults ===

/// Default SMTP relay host.
pub const DEFAULT_SMTP_HOST: &str = "localhost";
/// Default SMTP port (plain SMTP).
pub const DEFAULT_SMTP_PORT: u16 = 25;
/// Default sender address for report emails.
pub const DEFAULT_FROM_ADDR: &str = "reports@localhost";

// === Logging Defaults ===

/// Default `tracing` filter when neither `RUST_LOG` nor the config set one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

// === CLI Argument Ids ===

/// Id of the base positional argument list.
pub const ARG_POSITIONAL: &str = "ARGS";

// === Report Subjects ===

/// Subject suffix for a failed report.
pub const SUBJECT_FAILED: &str = "FAILED";
/// Subject suffix for a successful report.
pub const SUBJECT_SUCCESS: &str = "success";

// === Messages ===

pub const MSG_EMAIL_ON_FAILURE_WITHOUT_EMAIL: &str =
    "-f/--emailonfailure option does not make sense if an email is not specified";
pub const MSG_INVALID_RECIPIENT: &str = "invalid email address: ";
pub const MSG_EXECUTION_PANICKED: &str = "execution panicked: ";
pub const MSG_FINALIZE_FAILED: &str = "Error: failed to deliver report: ";
pub const MSG_INCOMPLETE_CREDENTIALS: &str =
    "SMTP username and password must be set together";
pub const MSG_NO_COMMAND: &str = "a command to run is required";
