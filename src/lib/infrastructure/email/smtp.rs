//! SMTP mailer implementation

use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::domain::relay::{Mailer, MailerError, OutgoingEmail, SmtpSettings};

/// SMTP client configuration
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
pub struct SmtpMailerConfig {
    /// Seconds to wait for each SMTP command before giving up
    #[arg(long = "smtp-timeout", env = "SMTP_TIMEOUT", default_value = "60")]
    pub timeout_secs: u64,
}

impl Default for SmtpMailerConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

/// SMTP mailer
///
/// Opens a fresh connection for every delivery, using the settings supplied
/// with the request.
#[derive(Debug, Default, Clone)]
pub struct SmtpMailer {
    config: SmtpMailerConfig,
}

impl SmtpMailer {
    /// Create a new SMTP mailer
    pub fn new(config: SmtpMailerConfig) -> Self {
        Self { config }
    }

    /// Build a transport for the given connection settings.
    ///
    /// `use_ssl` selects implicit TLS. Otherwise the connection starts in
    /// plaintext and must upgrade with STARTTLS before credentials are sent,
    /// unless the host is the local machine, where the upgrade is optional.
    pub fn transport(
        &self,
        smtp: &SmtpSettings,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
        let port = u16::try_from(smtp.port).map_err(|_| MailerError::InvalidPort(smtp.port))?;

        let relay = if smtp.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
        } else {
            let parameters = TlsParameters::new(smtp.host.clone())?;

            let tls = if is_localhost(&smtp.host) {
                Tls::Opportunistic(parameters)
            } else {
                Tls::Required(parameters)
            };

            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host).tls(tls)
        };

        Ok(relay
            .port(port)
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)))
            .build())
    }

    /// Build the message for a single recipient
    pub fn message(email: &OutgoingEmail, to: &str) -> Result<Message, MailerError> {
        let message = Message::builder()
            .from(mailbox(None, &email.from)?)
            .to(mailbox(email.to_name.clone(), to)?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())?;

        Ok(message)
    }
}

fn is_localhost(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

fn mailbox(name: Option<String>, address: &str) -> Result<Mailbox, MailerError> {
    let parsed = address
        .parse::<Address>()
        .map_err(|source| MailerError::InvalidAddress {
            address: address.to_string(),
            source,
        })?;

    Ok(Mailbox::new(name, parsed))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(
        &self,
        smtp: &SmtpSettings,
        email: &OutgoingEmail,
        to: &str,
    ) -> Result<(), MailerError> {
        let message = Self::message(email, to)?;

        let response = self.transport(smtp)?.send(message).await?;

        debug!(code = %response.code(), "SMTP server accepted message");

        Ok(())
    }
}
