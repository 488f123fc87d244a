//! Email transport.
//!
//! [`Mailer`] is the seam between report sinks and the actual SMTP delivery,
//! so the lifecycle can be exercised without a mail server.

use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpSettings;
use crate::constants;

/// A fully composed report email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivers composed mails.
pub trait Mailer {
    /// Send `mail`, blocking until the transport accepted or rejected it.
    ///
    /// # Errors
    ///
    /// Returns an error if the mail cannot be built or delivered.
    fn send(&self, mail: &Mail) -> Result<()>;
}

/// Parse an address the way the SMTP transport will.
///
/// # Errors
///
/// Returns an error if `addr` is not a valid RFC 5322 mailbox.
pub fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.trim()
        .parse::<Mailbox>()
        .wrap_err_with(|| format!("Invalid email address: {addr}"))
}

/// Build the MIME message for `mail`.
///
/// # Errors
///
/// Returns an error on an invalid address or an empty recipient list.
pub fn build_message(mail: &Mail) -> Result<Message> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .subject(mail.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for to in &mail.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    builder
        .body(mail.body.clone())
        .wrap_err("Failed to build report email")
}

/// [`Mailer`] backed by a blocking SMTP connection.
///
/// A connection is opened per [`Mailer::send`] and closed when it returns.
pub struct SmtpMailer {
    transport: SmtpTransport,
    endpoint: String,
}

impl SmtpMailer {
    /// Build a mailer for the configured relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the STARTTLS parameters cannot be built for `host`.
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let mut builder = if settings.starttls {
            SmtpTransport::starttls_relay(&settings.host)
                .wrap_err_with(|| format!("Failed to configure STARTTLS for {}", settings.host))?
        } else {
            SmtpTransport::builder_dangerous(&settings.host)
        }
        .port(settings.port);

        match (&settings.username, &settings.password) {
            (Some(user), Some(pass)) => {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }
            (None, None) => {}
            _ => bail!(constants::MSG_INCOMPLETE_CREDENTIALS),
        }

        Ok(Self {
            transport: builder.build(),
            endpoint: format!("{}:{}", settings.host, settings.port),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        let message = build_message(mail)?;
        tracing::debug!(endpoint = %self.endpoint, recipients = mail.to.len(), "submitting report email");
        self.transport
            .send(&message)
            .wrap_err_with(|| format!("Failed to send email via {}", self.endpoint))?;
        Ok(())
    }
}
