use derive_more::{Display, Error};
use log::error;
use ntex::{http, web};
use serde_json::json;

/// Errors the read and verification endpoints answer with.
///
/// The ingestion endpoint never produces one of these.
#[derive(Debug, Display, Error)]
pub enum WebhookError {
    VerificationFailed,
    MessagesUnavailable(#[error(not(source))] String),
    StatsUnavailable(#[error(not(source))] String),
}

impl WebhookError {
    fn get_error_message(&self) -> String {
        match self {
            WebhookError::VerificationFailed => "[VerificationFailed]".to_string(),
            WebhookError::MessagesUnavailable(msg) => format!("[MessagesUnavailable] {:#?}", msg),
            WebhookError::StatsUnavailable(msg) => format!("[StatsUnavailable] {:#?}", msg),
        }
    }
}

impl web::error::WebResponseError for WebhookError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        error!("{}", self.get_error_message());

        let public_msg = match self {
            WebhookError::VerificationFailed => {
                return web::HttpResponse::build(self.status_code()).finish();
            }
            WebhookError::MessagesUnavailable(_) => "Failed to retrieve messages",
            WebhookError::StatsUnavailable(_) => "Failed to retrieve stats",
        };

        web::HttpResponse::build(self.status_code()).json(&json!({ "error": public_msg }))
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            WebhookError::VerificationFailed => http::StatusCode::FORBIDDEN,
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
