//! Mail relay module.

mod errors;
mod mailer;
mod models;
mod recipients;
mod service;

pub use errors::{MailerError, RelayError};
pub use mailer::Mailer;
pub use models::{DeliveryReport, OutgoingEmail, RelayRequest, SmtpSettings};
pub use recipients::derive_recipients;
pub use service::{RelayService, RelayServiceImpl};

#[cfg(test)]
pub mod tests {
    pub use super::mailer::MockMailer;
    pub use super::service::MockRelayService;
}
