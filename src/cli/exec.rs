//! `report-run`: run a command and report its output.
//!
//! The typical cron wrapper: `report-run -e ops@example.org -f -- backup.sh`
//! stays quiet while the backup succeeds and mails its output when it fails.

use std::io::Write;
use std::process::Command;

use clap::error::ErrorKind;
use clap::Arg;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use crate::constants;
use crate::lifecycle::{Invocation, UsageError};
use crate::report::Report;
use crate::sink::Sink;

const ARG_NAME: &str = "name";

/// Runs the positional arguments as a command.
#[derive(Debug, Default)]
pub struct CommandReport;

impl Report for CommandReport {
    fn name(&self) -> &str {
        "report-run"
    }

    fn report_name(&self, invocation: &Invocation) -> String {
        invocation
            .value(ARG_NAME)
            .map_or_else(|| invocation.args().join(" "), str::to_string)
    }

    fn usage(&self) -> Option<&str> {
        Some("report-run [-e ADDR]... [-f] [-n NAME] -- COMMAND [ARGS]...")
    }

    fn configure(&self, cmd: clap::Command) -> clap::Command {
        cmd.about("Run a command and print or email its output")
            .version(constants::APP_VERSION)
            .arg(
                Arg::new(ARG_NAME)
                    .short('n')
                    .long("name")
                    .value_name("NAME")
                    .help("Report name used in the email subject (defaults to the command line)"),
            )
    }

    fn validate(&self, invocation: &Invocation) -> Result<(), UsageError> {
        if invocation.args().is_empty() {
            return Err(UsageError::with_kind(
                ErrorKind::MissingRequiredArgument,
                constants::MSG_NO_COMMAND,
            ));
        }
        Ok(())
    }

    fn execute(&mut self, invocation: &Invocation, out: &mut Sink) -> Result<bool> {
        let (program, args) = invocation
            .args()
            .split_first()
            .ok_or_else(|| eyre!(constants::MSG_NO_COMMAND))?;

        writeln!(out, "$ {}", invocation.args().join(" "))?;
        let output = Command::new(program)
            .args(args)
            .output()
            .wrap_err_with(|| format!("Failed to run {program}"))?;

        out.write_all(&output.stdout)?;
        if !output.stderr.is_empty() {
            writeln!(out, "--- stderr ---")?;
            out.write_all(&output.stderr)?;
        }
        writeln!(out, "--- {} ---", output.status)?;

        tracing::debug!(command = %program, status = %output.status, "command finished");
        Ok(output.status.success())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::lifecycle::try_run;
    use crate::report::ReportProgram;
    use crate::sink::testing::{RecordingMailer, SharedBuffer};
    use std::rc::Rc;

    fn run(argv: &[&str]) -> (Result<bool, clap::Error>, String, Rc<RecordingMailer>) {
        let mailer = Rc::new(RecordingMailer::default());
        let mut program = ReportProgram::with_mailer(CommandReport, "cron@example.org", mailer.clone());
        let console = SharedBuffer::default();
        let result = try_run(&mut program, argv.iter().copied(), console.console());
        (result, console.contents(), mailer)
    }

    #[test]
    fn test_successful_command_output() {
        let (result, output, _) = run(&["report-run", "--", "sh", "-c", "echo hello"]);

        assert!(result.unwrap());
        assert!(output.starts_with("$ sh -c echo hello\n"));
        assert!(output.contains("hello\n"));
        assert!(!output.contains("--- stderr ---"));
    }

    #[test]
    fn test_failing_command_is_a_failed_report() {
        let (result, output, _) = run(&["report-run", "--", "sh", "-c", "echo oops >&2; exit 3"]);

        assert!(!result.unwrap());
        assert!(output.contains("--- stderr ---\noops\n"));
        assert!(output.contains('3'));
    }

    #[test]
    fn test_missing_binary_is_reported_as_error() {
        let (result, output, _) = run(&["report-run", "--", "/nonexistent/report-run-binary"]);

        assert!(!result.unwrap());
        assert!(output.contains("Failed to run /nonexistent/report-run-binary"));
    }

    #[test]
    fn test_no_command_is_usage_error() {
        let (result, _, _) = run(&["report-run", "-e", "ops@example.org"]);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_failure_email_uses_command_line_as_subject() {
        let (result, _, mailer) = run(&["report-run", "-e", "ops@example.org", "-f", "--", "false"]);

        assert!(!result.unwrap());
        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "false - FAILED");
        assert!(sent[0].body.starts_with("$ false\n"));
    }

    #[test]
    fn test_name_flag_sets_subject() {
        let (result, _, mailer) = run(&["report-run", "-n", "nightly backup", "-e", "ops@example.org", "--", "true"]);

        assert!(result.unwrap());
        assert_eq!(mailer.sent.borrow()[0].subject, "nightly backup - success");
    }

    #[test]
    fn test_success_with_email_on_failure_sends_nothing() {
        let (result, output, mailer) = run(&["report-run", "-e", "ops@example.org", "-f", "--", "true"]);

        assert!(result.unwrap());
        assert!(output.is_empty());
        assert!(mailer.sent.borrow().is_empty());
    }

    #[test]
    fn test_email_flag_after_command_is_honoured() {
        let (result, output, mailer) = run(&["report-run", "true", "-e", "ops@example.org"]);

        assert!(result.unwrap());
        assert!(output.is_empty());
        assert_eq!(mailer.sent.borrow()[0].subject, "true - success");
    }
}
