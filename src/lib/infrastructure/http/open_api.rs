//! OpenAPI module

use utoipa::OpenApi;

use crate::infrastructure::http::handlers::send_email;

#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "SMTP Relay"),
    paths(send_email::handler),
    components(schemas(send_email::SendEmailBody, send_email::EmailResponse))
)]
pub struct ApiDocs;
