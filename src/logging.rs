//! Diagnostic logging and error-report hooks.
//!
//! Logs go to stderr: stdout is reserved for the report itself.

use color_eyre::config::{HookBuilder, Theme};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the `tracing` subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Install the `color_eyre` panic and error hooks.
///
/// The theme is blank so that errors rendered into an email body carry no
/// ANSI escapes. Panics caught while a program executes bypass the panic
/// hook and are reported into the output instead.
///
/// # Errors
///
/// Returns an error if the error hook was already installed.
pub fn install_error_hooks(settings: &LoggingSettings) -> Result<()> {
    let (panic_hook, eyre_hook) = hook_builder(settings).into_hooks();
    eyre_hook.install()?;
    panic_hook.install();
    Ok(())
}

/// Install only the `color_eyre` error hook, leaving the panic hook alone.
///
/// # Errors
///
/// Returns an error if the error hook was already installed.
pub fn install_eyre_hook(settings: &LoggingSettings) -> Result<()> {
    let (_, eyre_hook) = hook_builder(settings).into_hooks();
    eyre_hook.install()?;
    Ok(())
}

fn hook_builder(settings: &LoggingSettings) -> HookBuilder {
    if settings.backtrace && std::env::var_os("RUST_LIB_BACKTRACE").is_none() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }

    HookBuilder::default()
        .theme(Theme::new())
        .display_env_section(false)
}
