//! Relay service

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::mock;

use super::{
    derive_recipients, DeliveryReport, Mailer, OutgoingEmail, RelayError, RelayRequest,
    SmtpSettings,
};

/// Relay service
#[async_trait]
pub trait RelayService: Clone + Send + Sync + 'static {
    /// Relays an email to the SMTP username and every listed recipient.
    ///
    /// # Arguments
    /// * `request` - The [`RelayRequest`] describing the email and SMTP connection.
    ///
    /// # Returns
    /// - [`Ok`] with one [`DeliveryReport`] per recipient, in recipient order,
    ///   whether or not the individual deliveries succeeded.
    /// - [`Err`] containing a [`RelayError`] if the request was rejected before
    ///   any delivery was attempted.
    async fn relay(&self, request: RelayRequest) -> Result<Vec<DeliveryReport>, RelayError>;
}

#[cfg(test)]
mock! {
    pub RelayService {}

    impl Clone for RelayService {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl RelayService for RelayService {
        async fn relay(&self, request: RelayRequest) -> Result<Vec<DeliveryReport>, RelayError>;
    }
}

/// Relay service implementation
#[derive(Debug, Clone)]
pub struct RelayServiceImpl<M>
where
    M: Mailer,
{
    mailer: Arc<M>,
    max_concurrent_deliveries: usize,
}

impl<M> RelayServiceImpl<M>
where
    M: Mailer,
{
    /// Creates a relay service that delivers to one recipient at a time.
    pub fn new(mailer: Arc<M>) -> Self {
        Self {
            mailer,
            max_concurrent_deliveries: 1,
        }
    }

    /// Allows up to `limit` deliveries of the same request to run at once.
    ///
    /// A limit below one is treated as one.
    pub fn with_max_concurrent_deliveries(mut self, limit: usize) -> Self {
        self.max_concurrent_deliveries = limit.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    async fn deliver_sequentially(
        &self,
        smtp: &SmtpSettings,
        email: &OutgoingEmail,
        recipients: Vec<String>,
    ) -> Vec<DeliveryReport> {
        let mut reports = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            reports.push(deliver(self.mailer.as_ref(), smtp, email, recipient).await);
        }

        reports
    }

    async fn deliver_concurrently(
        &self,
        smtp: Arc<SmtpSettings>,
        email: Arc<OutgoingEmail>,
        recipients: Vec<String>,
    ) -> Vec<DeliveryReport> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_deliveries));

        let handles: Vec<_> = recipients
            .iter()
            .cloned()
            .map(|recipient| {
                let mailer = Arc::clone(&self.mailer);
                let smtp = Arc::clone(&smtp);
                let email = Arc::clone(&email);
                let permits = Arc::clone(&permits);

                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    deliver(mailer.as_ref(), &smtp, &email, recipient).await
                })
            })
            .collect();

        // Awaiting in spawn order keeps the reports in recipient order.
        let mut reports = Vec::with_capacity(handles.len());

        for (recipient, handle) in recipients.into_iter().zip(handles) {
            let report = match handle.await {
                Ok(report) => report,
                Err(err) => {
                    warn!(recipient = %recipient, error = %err, "delivery task failed");
                    DeliveryReport::failed(recipient, err)
                }
            };

            reports.push(report);
        }

        reports
    }
}

#[async_trait]
impl<M> RelayService for RelayServiceImpl<M>
where
    M: Mailer,
{
    async fn relay(&self, request: RelayRequest) -> Result<Vec<DeliveryReport>, RelayError> {
        if request.smtp.username.is_empty() {
            return Err(RelayError::MissingSmtpUserName);
        }

        let recipients = derive_recipients(&request.smtp.username, &request.to);
        let email = OutgoingEmail::from_request(&request);

        debug!(
            host = %request.smtp.host,
            port = request.smtp.port,
            use_ssl = request.smtp.use_ssl,
            recipients = recipients.len(),
            "relaying email"
        );

        let reports = if self.max_concurrent_deliveries > 1 && recipients.len() > 1 {
            self.deliver_concurrently(Arc::new(request.smtp), Arc::new(email), recipients)
                .await
        } else {
            self.deliver_sequentially(&request.smtp, &email, recipients)
                .await
        };

        Ok(reports)
    }
}

async fn deliver<M: Mailer>(
    mailer: &M,
    smtp: &SmtpSettings,
    email: &OutgoingEmail,
    recipient: String,
) -> DeliveryReport {
    match mailer.send_email(smtp, email, &recipient).await {
        Ok(()) => {
            info!(recipient = %recipient, "email delivered");
            DeliveryReport::delivered(recipient)
        }
        Err(err) => {
            warn!(recipient = %recipient, error = %err, "email delivery failed");
            DeliveryReport::failed(recipient, err)
        }
    }
}
