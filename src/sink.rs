//! Output sinks: where a program writes its report.

use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::mail::{Mail, Mailer};

/// Destination of a program's output for one invocation.
///
/// Consumed by [`Sink::finish`]; dropping a sink without finishing it
/// discards whatever it buffered.
pub enum Sink {
    /// Immediate passthrough to the console.
    Console(ConsoleSink),
    /// Buffered, sent as an email on finish.
    Email(EmailSink),
}

impl Sink {
    #[must_use]
    pub fn is_email(&self) -> bool {
        matches!(self, Self::Email(_))
    }

    pub fn as_email_mut(&mut self) -> Option<&mut EmailSink> {
        match self {
            Self::Email(email) => Some(email),
            Self::Console(_) => None,
        }
    }

    /// Flush the console or send the email.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or mail delivery fails.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Console(console) => console.finish(),
            Self::Email(email) => email.finish(),
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console(_) => write!(f, "Console"),
            Self::Email(email) => write!(f, "Email({})", email.recipients.join(", ")),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Console(console) => console.write(buf),
            Self::Email(email) => email.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Console(console) => console.flush(),
            Self::Email(email) => email.flush(),
        }
    }
}

/// Writes straight through to a console stream (stdout unless injected).
pub struct ConsoleSink {
    writer: Box<dyn Write>,
}

impl ConsoleSink {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn finish(mut self) -> Result<()> {
        self.writer.flush().wrap_err("Failed to flush console output")
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Write for ConsoleSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Buffers output and sends it as the body of one email.
pub struct EmailSink {
    recipients: Vec<String>,
    from: String,
    subject: String,
    body: Vec<u8>,
    mailer: Rc<dyn Mailer>,
}

impl EmailSink {
    pub fn new(recipients: Vec<String>, from: impl Into<String>, mailer: Rc<dyn Mailer>) -> Self {
        Self {
            recipients,
            from: from.into(),
            subject: String::new(),
            body: Vec::new(),
            mailer,
        }
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn from_addr(&self) -> &str {
        &self.from
    }

    /// The buffered output so far, lossily decoded as UTF-8.
    pub fn body(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn finish(self) -> Result<()> {
        let mail = Mail {
            body: String::from_utf8_lossy(&self.body).into_owned(),
            from: self.from,
            to: self.recipients,
            subject: self.subject,
        };
        self.mailer.send(&mail)
    }
}

impl Write for EmailSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingMailer, SharedBuffer};
    use super::*;

    #[test]
    fn test_console_sink_passes_writes_through() {
        let buffer = SharedBuffer::default();
        let mut sink = Sink::Console(buffer.console());

        write!(sink, "line one\nline two\n").unwrap();
        assert!(!sink.is_email());
        assert!(sink.as_email_mut().is_none());
        sink.finish().unwrap();

        assert_eq!(buffer.contents(), "line one\nline two\n");
    }

    #[test]
    fn test_email_sink_buffers_until_finish() {
        let mailer = Rc::new(RecordingMailer::default());
        let mut sink = Sink::Email(EmailSink::new(
            vec!["ops@example.org".to_string()],
            "reports@example.org",
            mailer.clone(),
        ));

        writeln!(sink, "disk usage 91%").unwrap();
        let email = sink.as_email_mut().unwrap();
        email.set_subject("disks - FAILED");
        assert_eq!(email.body(), "disk usage 91%\n");
        assert!(mailer.sent.borrow().is_empty());

        sink.finish().unwrap();

        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ops@example.org".to_string()]);
        assert_eq!(sent[0].from, "reports@example.org");
        assert_eq!(sent[0].subject, "disks - FAILED");
        assert_eq!(sent[0].body, "disk usage 91%\n");
    }

    #[test]
    fn test_dropped_email_sink_sends_nothing() {
        let mailer = Rc::new(RecordingMailer::default());
        {
            let mut sink = EmailSink::new(vec!["a@example.org".to_string()], "r@example.org", mailer.clone());
            writeln!(sink, "discarded").unwrap();
        }
        assert!(mailer.sent.borrow().is_empty());
    }

    #[test]
    fn test_debug_names_variant() {
        let mailer: Rc<dyn Mailer> = Rc::new(RecordingMailer::default());
        let sink = Sink::Email(EmailSink::new(
            vec!["a@example.org".to_string(), "b@example.org".to_string()],
            "r@example.org",
            mailer,
        ));
        assert_eq!(format!("{sink:?}"), "Email(a@example.org, b@example.org)");
        assert_eq!(format!("{:?}", Sink::Console(SharedBuffer::default().console())), "Console");
    }
}
