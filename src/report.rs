//! Report programs: output goes to stdout, or is emailed when `-e` is given.
//!
//! A concrete report implements [`Report`] and is wrapped in a
//! [`ReportProgram`], which adds the `-e/--email` and `-f/--emailonfailure`
//! flags and takes care of sending the email after the run.

use std::rc::Rc;

use clap::error::ErrorKind;
use clap::{Args, Command};
use color_eyre::Result;

use crate::cli::args::ReportArgs;
use crate::config::MailSettings;
use crate::constants;
use crate::lifecycle::{Invocation, Program, UsageError};
use crate::mail::{self, Mailer, SmtpMailer};
use crate::sink::{ConsoleSink, EmailSink, Sink};

/// The program-specific part of a report.
pub trait Report {
    /// Command name.
    fn name(&self) -> &str;

    /// Name used in the email subject. Defaults to [`Report::name`].
    fn report_name(&self, _invocation: &Invocation) -> String {
        self.name().to_string()
    }

    fn usage(&self) -> Option<&str> {
        None
    }

    /// Register report-specific flags.
    fn configure(&self, cmd: Command) -> Command {
        cmd
    }

    /// Report-specific validation, run after the email flags were checked.
    ///
    /// # Errors
    ///
    /// A [`UsageError`] aborts the run.
    fn validate(&self, _invocation: &Invocation) -> Result<(), UsageError> {
        Ok(())
    }

    /// Produce the report into `out`. Returns whether the report succeeded.
    ///
    /// # Errors
    ///
    /// An error is included in the report and marks it as failed.
    fn execute(&mut self, invocation: &Invocation, out: &mut Sink) -> Result<bool>;
}

/// Email subject for a finished report.
pub fn subject(report_name: &str, failed: bool) -> String {
    let status = if failed {
        constants::SUBJECT_FAILED
    } else {
        constants::SUBJECT_SUCCESS
    };
    format!("{report_name} - {status}")
}

/// [`Program`] that prints a [`Report`] or emails it.
pub struct ReportProgram<R> {
    report: R,
    from_addr: String,
    mailer: Rc<dyn Mailer>,
}

impl<R: Report> ReportProgram<R> {
    /// Wrap `report`, sending mail through the configured SMTP relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn new(report: R, mail: &MailSettings) -> Result<Self> {
        let mailer = SmtpMailer::new(&mail.smtp)?;
        Ok(Self::with_mailer(report, mail.from.clone(), Rc::new(mailer)))
    }

    pub fn with_mailer(report: R, from_addr: impl Into<String>, mailer: Rc<dyn Mailer>) -> Self {
        Self {
            report,
            from_addr: from_addr.into(),
            mailer,
        }
    }

    pub fn report(&self) -> &R {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut R {
        &mut self.report
    }
}

impl<R: Report> Program for ReportProgram<R> {
    fn name(&self) -> &str {
        self.report.name()
    }

    fn usage(&self) -> Option<&str> {
        self.report.usage()
    }

    fn configure(&self, cmd: Command) -> Command {
        self.report.configure(ReportArgs::augment_args(cmd))
    }

    fn validate(&self, invocation: &Invocation) -> Result<(), UsageError> {
        let options = ReportArgs::from_matches(invocation.matches())
            .map_err(|e| UsageError::new(e.to_string()))?;

        if options.email_on_failure_only && !options.has_recipients() {
            return Err(UsageError::with_kind(
                ErrorKind::MissingRequiredArgument,
                constants::MSG_EMAIL_ON_FAILURE_WITHOUT_EMAIL,
            ));
        }

        if let Some(bad) = options
            .emails
            .iter()
            .find(|addr| mail::parse_mailbox(addr).is_err())
        {
            return Err(UsageError::new(format!(
                "{}{bad}",
                constants::MSG_INVALID_RECIPIENT
            )));
        }

        self.report.validate(invocation)
    }

    fn resolve_sink(&self, invocation: &Invocation, console: ConsoleSink) -> Sink {
        let options = ReportArgs::from_invocation(invocation);
        if options.has_recipients() {
            Sink::Email(EmailSink::new(
                options.emails,
                self.from_addr.clone(),
                Rc::clone(&self.mailer),
            ))
        } else {
            Sink::Console(console)
        }
    }

    fn execute(&mut self, invocation: &Invocation, out: &mut Sink) -> Result<bool> {
        self.report.execute(invocation, out)
    }

    fn finalize(&mut self, invocation: &Invocation, mut out: Sink, failed: bool) -> Result<()> {
        let options = ReportArgs::from_invocation(invocation);

        if let Some(email) = out.as_email_mut() {
            if !options.should_email(failed) {
                tracing::info!("report succeeded, email is only sent on failure");
                return Ok(());
            }
            email.set_subject(subject(&self.report.report_name(invocation), failed));
            tracing::info!(
                recipients = email.recipients().len(),
                subject = email.subject(),
                "sending report email"
            );
        }

        out.finish()
    }
}
