use std::process::ExitCode;

use cliprogram::cli::exec::CommandReport;
use cliprogram::config::Config;
use cliprogram::{lifecycle, logging, ReportProgram};

fn main() -> ExitCode {
    let config = match Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:?}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.logging);
    if let Err(e) = logging::install_error_hooks(&config.logging) {
        tracing::warn!(error = %e, "failed to install error hooks");
    }

    let mut program = match ReportProgram::new(CommandReport, &config.mail) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {e:?}");
            return ExitCode::FAILURE;
        }
    };

    lifecycle::exit_code(lifecycle::run(&mut program))
}
