//! Relay value objects

use std::fmt;

/// Connection parameters supplied by the caller for one request
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SmtpSettings {
    /// The SMTP host
    pub host: String,

    /// The SMTP port, as sent by the caller
    pub port: i64,

    /// The SMTP username, also used as the sender address
    pub username: String,

    /// The SMTP password, passed through untouched
    pub password: String,

    /// Connect with implicit TLS instead of plaintext/STARTTLS
    pub use_ssl: bool,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

/// A request to relay one email to a set of recipients
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayRequest {
    /// Comma-separated extra recipients
    pub to: String,

    /// Display name for the `To` header
    pub to_name: String,

    /// The subject of the email
    pub subject: String,

    /// The HTML body of the email
    pub body: String,

    /// Outbound connection parameters
    pub smtp: SmtpSettings,
}

/// The message sent to every recipient of a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// The sender address
    pub from: String,

    /// Display name for the recipient, if any
    pub to_name: Option<String>,

    /// The subject of the email
    pub subject: String,

    /// The HTML body of the email
    pub html_body: String,
}

impl OutgoingEmail {
    /// Build the message for a relay request
    pub fn from_request(request: &RelayRequest) -> Self {
        Self {
            from: request.smtp.username.trim().to_string(),
            to_name: Some(request.to_name.clone()).filter(|name| !name.trim().is_empty()),
            subject: request.subject.clone(),
            html_body: request.body.clone(),
        }
    }
}

/// The outcome of a delivery attempt to one recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReport {
    /// The recipient address
    pub email: String,

    /// Whether the email was accepted by the SMTP server
    pub success: bool,

    /// Why the delivery failed
    pub error: Option<String>,
}

impl DeliveryReport {
    /// A successful delivery
    pub fn delivered(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            success: true,
            error: None,
        }
    }

    /// A failed delivery
    pub fn failed(email: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            email: email.into(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_debug_hides_password() {
        let settings = SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "a@example.com".to_string(),
            password: "hunter2".to_string(),
            use_ssl: false,
        };

        let debug = format!("{:?}", settings);

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("smtp.example.com"));
    }

    #[test]
    fn test_outgoing_email_from_request() {
        let request = RelayRequest {
            to_name: "Bob".to_string(),
            subject: "Hi".to_string(),
            body: "<p>Body</p>".to_string(),
            smtp: SmtpSettings {
                username: "a@example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let email = OutgoingEmail::from_request(&request);

        assert_eq!(email.from, "a@example.com");
        assert_eq!(email.to_name.as_deref(), Some("Bob"));
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.html_body, "<p>Body</p>");
    }

    #[test]
    fn test_blank_display_name_is_dropped() {
        let request = RelayRequest {
            to_name: "  ".to_string(),
            ..Default::default()
        };

        assert_eq!(OutgoingEmail::from_request(&request).to_name, None);
    }

    #[test]
    fn test_failed_report_keeps_error_text() {
        let report = DeliveryReport::failed("a@example.com", "connection refused");

        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("connection refused"));
    }
}
