//! Mailer module

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use super::{MailerError, OutgoingEmail, SmtpSettings};

/// Delivers a message over a caller-supplied SMTP connection
#[async_trait]
pub trait Mailer: Clone + Send + Sync + 'static {
    /// Send an email to a single recipient.
    ///
    /// # Arguments
    /// * `smtp` - The [`SmtpSettings`] to connect and authenticate with.
    /// * `email` - The [`OutgoingEmail`] to send.
    /// * `to` - The recipient address.
    ///
    /// # Returns
    /// A [`Result`] which is [`Ok`] once the server accepted the message, or an
    /// [`Err`] containing the [`MailerError`] describing why it did not.
    async fn send_email(
        &self,
        smtp: &SmtpSettings,
        email: &OutgoingEmail,
        to: &str,
    ) -> Result<(), MailerError>;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    impl Clone for Mailer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl Mailer for Mailer {
        async fn send_email(&self, smtp: &SmtpSettings, email: &OutgoingEmail, to: &str) -> Result<(), MailerError>;
    }
}
