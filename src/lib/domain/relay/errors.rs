//! Error types for the relay module

use lettre::address::AddressError;
use thiserror::Error;

/// Errors that reject a relay request before any delivery is attempted
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// The request carries no SMTP username
    #[error("SmtpUserName is required")]
    MissingSmtpUserName,
}

/// A failed delivery to a single recipient.
///
/// The `Display` output is reported back to the caller as-is.
#[derive(Debug, Error)]
pub enum MailerError {
    /// The sender or recipient is not a valid mailbox
    #[error("invalid address \"{address}\": {source}")]
    InvalidAddress {
        /// The rejected address
        address: String,

        /// Why it was rejected
        source: AddressError,
    },

    /// The port does not fit in a TCP port number
    #[error("invalid SMTP port {0}")]
    InvalidPort(i64),

    /// The message could not be assembled
    #[error(transparent)]
    Message(#[from] lettre::error::Error),

    /// Connecting, authenticating or sending failed
    #[error(transparent)]
    Transport(#[from] lettre::transport::smtp::Error),
}
