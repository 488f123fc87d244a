//! Command-line argument definitions.

use clap::{ArgMatches, Args, FromArgMatches};

use crate::lifecycle::Invocation;

/// Flags every report program accepts.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportArgs {
    /// Email address to send the results to (can be used multiple times)
    #[arg(short = 'e', long = "email", value_name = "ADDR")]
    pub emails: Vec<String>,

    /// Send the email only when the report fails
    #[arg(short = 'f', long = "emailonfailure")]
    pub email_on_failure_only: bool,
}

impl ReportArgs {
    /// Extract the report flags from parsed matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the matches were not built from a command
    /// augmented with [`ReportArgs`].
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        Self::from_arg_matches(matches)
    }

    /// Report flags of an already validated invocation.
    pub fn from_invocation(invocation: &Invocation) -> Self {
        Self::from_matches(invocation.matches()).unwrap_or_default()
    }

    #[must_use]
    pub fn has_recipients(&self) -> bool {
        !self.emails.is_empty()
    }

    /// Whether a run with the given outcome should be mailed.
    #[must_use]
    pub fn should_email(&self, failed: bool) -> bool {
        self.has_recipients() && (!self.email_on_failure_only || failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;

    fn parse(argv: &[&str]) -> ReportArgs {
        let cmd = ReportArgs::augment_args(Command::new("nightly"));
        let matches = cmd.try_get_matches_from(argv).unwrap();
        ReportArgs::from_matches(&matches).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["nightly"]);
        assert_eq!(args, ReportArgs::default());
        assert!(!args.has_recipients());
    }

    #[test]
    fn test_email_is_repeatable() {
        let args = parse(&["nightly", "-e", "a@example.org", "--email", "b@example.org"]);
        assert_eq!(args.emails, vec!["a@example.org", "b@example.org"]);
        assert!(!args.email_on_failure_only);
    }

    #[test]
    fn test_email_on_failure_flag() {
        let args = parse(&["nightly", "-e", "a@example.org", "--emailonfailure"]);
        assert!(args.email_on_failure_only);
        let short = parse(&["nightly", "-f", "-e", "a@example.org"]);
        assert_eq!(args, short);
    }

    #[test]
    fn test_should_email_matrix() {
        let none = ReportArgs::default();
        assert!(!none.should_email(false));
        assert!(!none.should_email(true));

        let always = ReportArgs {
            emails: vec!["a@example.org".to_string()],
            email_on_failure_only: false,
        };
        assert!(always.should_email(false));
        assert!(always.should_email(true));

        let on_failure = ReportArgs {
            email_on_failure_only: true,
            ..always
        };
        assert!(!on_failure.should_email(false));
        assert!(on_failure.should_email(true));
    }
}
