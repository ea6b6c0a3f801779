//! Send email handler

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    domain::relay::{DeliveryReport, RelayRequest, RelayService, SmtpSettings},
    infrastructure::http::{errors::ApiError, state::AppState},
};

/// Send email request body
///
/// Missing or `null` fields take their zero value.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SendEmailBody {
    /// Comma-separated extra recipients
    #[serde(rename = "emailToId", deserialize_with = "null_as_default")]
    #[schema(example = "b@example.com, c@example.com")]
    pub email_to_id: String,

    /// Display name for the recipients
    #[serde(rename = "emailToName", deserialize_with = "null_as_default")]
    #[schema(example = "Team")]
    pub email_to_name: String,

    /// The subject of the email
    #[serde(rename = "emailSubject", deserialize_with = "null_as_default")]
    #[schema(example = "Hi")]
    pub email_subject: String,

    /// The HTML body of the email
    #[serde(rename = "emailBody", deserialize_with = "null_as_default")]
    #[schema(example = "<p>Hello</p>")]
    pub email_body: String,

    /// The SMTP host
    #[serde(rename = "SmtpHost", deserialize_with = "null_as_default")]
    #[schema(example = "smtp.example.com")]
    pub smtp_host: String,

    /// The SMTP port
    #[serde(rename = "SmtpPort", deserialize_with = "null_as_default")]
    #[schema(example = 587)]
    pub smtp_port: i64,

    /// The SMTP username, also the sender and first recipient
    #[serde(rename = "SmtpUserName", deserialize_with = "null_as_default")]
    #[schema(example = "a@example.com")]
    pub smtp_user_name: String,

    /// The SMTP password
    #[serde(rename = "SmtpPassword", deserialize_with = "null_as_default")]
    pub smtp_password: String,

    /// Connect with implicit TLS instead of plaintext/STARTTLS
    #[serde(rename = "UseSSL", deserialize_with = "null_as_default")]
    pub use_ssl: bool,
}

/// Wire names of every [`SendEmailBody`] field
const FIELD_NAMES: [&str; 9] = [
    "emailToId",
    "emailToName",
    "emailSubject",
    "emailBody",
    "SmtpHost",
    "SmtpPort",
    "SmtpUserName",
    "SmtpPassword",
    "UseSSL",
];

impl SendEmailBody {
    /// Decodes a request body, matching field names regardless of case.
    ///
    /// A `null` body is an empty request.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value = match serde_json::from_slice::<Value>(body)? {
            Value::Null => return Ok(Self::default()),
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(name, value)| (canonical_name(name), value))
                    .collect(),
            ),
            other => other,
        };

        serde_json::from_value(value)
    }
}

fn canonical_name(name: String) -> String {
    FIELD_NAMES
        .iter()
        .find(|field| field.eq_ignore_ascii_case(&name))
        .map_or(name, |field| field.to_string())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<SendEmailBody> for RelayRequest {
    fn from(body: SendEmailBody) -> Self {
        Self {
            to: body.email_to_id,
            to_name: body.email_to_name,
            subject: body.email_subject,
            body: body.email_body,
            smtp: SmtpSettings {
                host: body.smtp_host,
                port: body.smtp_port,
                username: body.smtp_user_name,
                password: body.smtp_password,
                use_ssl: body.use_ssl,
            },
        }
    }
}

/// The delivery outcome for one recipient
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmailResponse {
    /// The recipient address
    #[schema(example = "b@example.com")]
    pub email: String,

    /// Whether the SMTP server accepted the email
    pub success: bool,

    /// Why the delivery failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Connection error: Connection refused (os error 111)")]
    pub error: Option<String>,
}

impl From<DeliveryReport> for EmailResponse {
    fn from(report: DeliveryReport) -> Self {
        Self {
            email: report.email,
            success: report.success,
            error: report.error,
        }
    }
}

/// Relay an email through the caller's SMTP server
///
/// The SMTP username always receives the email first, followed by every
/// address in `emailToId`. Delivery failures are reported per recipient and
/// never change the status code.
#[utoipa::path(
    post,
    operation_id = "send_email",
    tag = "Relay",
    path = "/send-email",
    request_body = SendEmailBody,
    responses(
        (status = StatusCode::OK, description = "One entry per recipient, in delivery order", body = [EmailResponse]),
        (status = StatusCode::BAD_REQUEST, description = "Invalid JSON payload or missing SmtpUserName", body = String, content_type = "text/plain"),
        (status = StatusCode::METHOD_NOT_ALLOWED, description = "Invalid request method", body = String, content_type = "text/plain"),
    )
)]
pub async fn handler<R: RelayService>(
    State(state): State<AppState<R>>,
    body: Bytes,
) -> Result<Json<Vec<EmailResponse>>, ApiError> {
    // The body is decoded whatever its Content-Type.
    let request = SendEmailBody::from_json(&body)
        .inspect_err(|err| debug!("rejecting payload: {err}"))?;

    let reports = state.relay.relay(request.into()).await?;

    Ok(Json(reports.into_iter().map(EmailResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{header, Method, StatusCode};
    use axum_test::TestServer;
    use serde_json::json;
    use testresult::TestResult;

    use crate::{
        domain::relay::{
            tests::{MockMailer, MockRelayService},
            DeliveryReport, MailerError, RelayServiceImpl,
        },
        infrastructure::http::{
            router,
            state::{test_state, AppState},
        },
    };

    fn relay_server(mailer: MockMailer) -> TestResult<TestServer> {
        let state = AppState::new(RelayServiceImpl::new(Arc::new(mailer)));

        Ok(TestServer::new(router(state))?)
    }

    fn scenario() -> serde_json::Value {
        json!({
            "SmtpUserName": "a@x.com",
            "SmtpPassword": "p",
            "SmtpHost": "smtp.x.com",
            "SmtpPort": 587,
            "emailSubject": "Hi",
            "emailBody": "Body"
        })
    }

    #[tokio::test]
    async fn test_send_email_success() -> TestResult {
        let mut relay = MockRelayService::new();

        relay
            .expect_relay()
            .times(1)
            .withf(|request| {
                request.smtp.username == "a@x.com"
                    && request.smtp.password == "p"
                    && request.smtp.host == "smtp.x.com"
                    && request.smtp.port == 587
                    && !request.smtp.use_ssl
                    && request.subject == "Hi"
                    && request.body == "Body"
                    && request.to.is_empty()
            })
            .returning(|_| Ok(vec![DeliveryReport::delivered("a@x.com")]));

        let response = TestServer::new(router(test_state(Some(relay))))?
            .post("/send-email")
            .json(&scenario())
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!([{ "email": "a@x.com", "success": true }])
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported_with_status_ok() -> TestResult {
        let mut mailer = MockMailer::new();

        mailer
            .expect_send_email()
            .times(1)
            .returning(|_, _, _| Err(MailerError::InvalidPort(0)));

        let response = relay_server(mailer)?
            .post("/send-email")
            .json(&scenario())
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!([{ "email": "a@x.com", "success": false, "error": "invalid SMTP port 0" }])
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_every_recipient_is_reported_in_order() -> TestResult {
        let mut mailer = MockMailer::new();

        mailer
            .expect_send_email()
            .times(3)
            .returning(|_, _, to| match to {
                "c@x.com" => Err(MailerError::InvalidPort(0)),
                _ => Ok(()),
            });

        let mut body = scenario();
        body["emailToId"] = json!("b@x.com, c@x.com");

        let response = relay_server(mailer)?
            .post("/send-email")
            .json(&body)
            .await;

        let json = response.json::<Vec<super::EmailResponse>>();

        response.assert_status_ok();
        assert_eq!(
            json.iter().map(|r| r.email.as_str()).collect::<Vec<_>>(),
            vec!["a@x.com", "b@x.com", "c@x.com"]
        );
        assert_eq!(
            json.iter().map(|r| r.success).collect::<Vec<_>>(),
            vec![true, true, false]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_username_is_rejected() -> TestResult {
        let mut mailer = MockMailer::new();

        mailer.expect_send_email().times(0);

        let body = json!({
            "SmtpPassword": "p",
            "SmtpHost": "smtp.x.com",
            "SmtpPort": 587,
            "emailSubject": "Hi",
            "emailBody": "Body"
        });

        let response = relay_server(mailer)?
            .post("/send-email")
            .json(&body)
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "SmtpUserName is required");

        Ok(())
    }

    #[tokio::test]
    async fn test_null_body_is_an_empty_request() -> TestResult {
        let mut mailer = MockMailer::new();

        mailer.expect_send_email().times(0);

        let response = relay_server(mailer)?
            .post("/send-email")
            .text("null")
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "SmtpUserName is required");

        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() -> TestResult {
        let mut relay = MockRelayService::new();

        relay.expect_relay().times(0);

        let response = TestServer::new(router(test_state(Some(relay))))?
            .post("/send-email")
            .text("{\"SmtpUserName\": ")
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Invalid JSON payload");

        Ok(())
    }

    #[tokio::test]
    async fn test_wrongly_typed_field_is_rejected() -> TestResult {
        let mut relay = MockRelayService::new();

        relay.expect_relay().times(0);

        let mut body = scenario();
        body["SmtpPort"] = json!("587");

        let response = TestServer::new(router(test_state(Some(relay))))?
            .post("/send-email")
            .json(&body)
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Invalid JSON payload");

        Ok(())
    }

    #[tokio::test]
    async fn test_json_without_content_type_is_accepted() -> TestResult {
        let mut relay = MockRelayService::new();

        relay
            .expect_relay()
            .times(1)
            .withf(|request| request.to == "b@x.com" && request.smtp.use_ssl)
            .returning(|_| Ok(vec![]));

        let response = TestServer::new(router(test_state(Some(relay))))?
            .post("/send-email")
            .text(r#"{"SmtpUserName":"a@x.com","emailToId":"b@x.com","UseSSL":true,"emailToName":null}"#)
            .await;

        response.assert_status_ok();

        Ok(())
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() -> TestResult {
        let mut relay = MockRelayService::new();

        relay.expect_relay().times(0);

        let response = TestServer::new(router(test_state(Some(relay))))?
            .get("/send-email")
            .await;

        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.text(), "Invalid request method");
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&header::HeaderValue::from_static("*"))
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_preflight_returns_empty_ok() -> TestResult {
        let mut relay = MockRelayService::new();

        relay.expect_relay().times(0);

        let response = TestServer::new(router(test_state(Some(relay))))?
            .method(Method::OPTIONS, "/send-email")
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), "");

        Ok(())
    }

    #[tokio::test]
    async fn test_cors_headers_are_set() -> TestResult {
        let mut relay = MockRelayService::new();

        relay.expect_relay().returning(|_| Ok(vec![]));

        let response = TestServer::new(router(test_state(Some(relay))))?
            .post("/send-email")
            .json(&scenario())
            .await;

        let headers = response.headers();

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&header::HeaderValue::from_static("*"))
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS),
            Some(&header::HeaderValue::from_static("POST, OPTIONS"))
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS),
            Some(&header::HeaderValue::from_static("Content-Type"))
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_field_names_match_regardless_of_case() -> TestResult {
        let mut relay = MockRelayService::new();

        relay
            .expect_relay()
            .times(1)
            .withf(|request| {
                request.smtp.username == "a@x.com"
                    && request.smtp.port == 25
                    && request.smtp.use_ssl
                    && request.to == "b@x.com"
            })
            .returning(|_| Ok(vec![]));

        let response = TestServer::new(router(test_state(Some(relay))))?
            .post("/send-email")
            .json(&json!({
                "smtpUserName": "a@x.com",
                "SMTPPORT": 25,
                "usessl": true,
                "EmailToId": "b@x.com"
            }))
            .await;

        response.assert_status_ok();

        Ok(())
    }

    #[tokio::test]
    async fn test_non_object_payload_is_rejected() -> TestResult {
        let mut relay = MockRelayService::new();

        relay.expect_relay().times(0);

        let response = TestServer::new(router(test_state(Some(relay))))?
            .post("/send-email")
            .json(&json!(["a@x.com"]))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Invalid JSON payload");

        Ok(())
    }

    #[tokio::test]
    async fn test_large_body_is_accepted() -> TestResult {
        let mut mailer = MockMailer::new();

        mailer
            .expect_send_email()
            .times(1)
            .withf(|_, email, _| email.html_body.len() == 3 * 1024 * 1024)
            .returning(|_, _, _| Ok(()));

        let mut body = scenario();
        body["emailBody"] = json!("x".repeat(3 * 1024 * 1024));

        let response = relay_server(mailer)?
            .post("/send-email")
            .json(&body)
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!([{ "email": "a@x.com", "success": true }])
        );

        Ok(())
    }
}
