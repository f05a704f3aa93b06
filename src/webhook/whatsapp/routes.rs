//! WhatsApp webhook endpoint handlers
//!
//! This module handles incoming webhook requests from WhatsApp Business API.
//! It implements both the verification endpoint (GET) and the webhook receiver (POST).

use super::handler;
use crate::{
    consts,
    front::{AppState, errors},
};
use chrono::Utc;
use futures::FutureExt;
use ntex::{
    util::{Bytes, BytesMut, stream_recv},
    web,
};
use serde_json::json;
use std::panic::AssertUnwindSafe;
use subtle::ConstantTimeEq;
use tracing::Instrument;

/// Bytes of an oversized body kept in its marker event
const OVERSIZED_PREFIX_BYTES: usize = 256;

/// Query parameters for webhook verification.
///
/// All optional: a missing parameter is a failed verification, not a bad request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyQuery {
    /// The mode parameter, should be "subscribe"
    pub mode: Option<String>,
    /// The verification token from WhatsApp
    pub verify_token: Option<String>,
    /// The challenge string to echo back
    pub challenge: Option<String>,
}

impl VerifyQuery {
    /// Reads the `hub.*` parameters, first occurrence wins.
    ///
    /// An undecodable query string yields no parameters at all.
    pub fn from_query_string(query_string: &str) -> Self {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query_string).unwrap_or_default();
        let first = |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        };

        Self {
            mode: first("hub.mode"),
            verify_token: first("hub.verify_token"),
            challenge: first("hub.challenge"),
        }
    }
}

/// Checks the handshake and returns the challenge to echo back
pub fn check_subscription(query: &VerifyQuery, expected_token: &str) -> Option<String> {
    if query.mode.as_deref() != Some(consts::SUBSCRIBE_MODE) {
        return None;
    }

    let token = query.verify_token.as_deref()?;
    if !bool::from(token.as_bytes().ct_eq(expected_token.as_bytes())) {
        return None;
    }

    Some(query.challenge.clone().unwrap_or_default())
}

/// Webhook verification endpoint (GET)
///
/// WhatsApp sends a GET request to verify the webhook URL.
/// This endpoint validates the verify token and returns the challenge.
///
/// # Query Parameters
/// - `hub.mode` - Should be "subscribe"
/// - `hub.verify_token` - Token configured in WhatsApp dashboard
/// - `hub.challenge` - Challenge string to echo back
///
/// # Returns
/// - 200 with challenge string if verification succeeds
/// - 403 with an empty body otherwise, whatever the shape of the query
#[web::get("/")]
pub async fn verify(
    req: web::HttpRequest,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let query = VerifyQuery::from_query_string(req.query_string());

    let Some(challenge) = check_subscription(&query, &app_state.verify_token) else {
        log::warn!(
            "webhook verification failed: mode={:?}",
            query.mode.as_deref().unwrap_or_default()
        );
        return Err(errors::WebhookError::VerificationFailed.into());
    };

    log::info!("webhook verified");

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(challenge))
}

fn json_bytes(value: serde_json::Value) -> Bytes {
    Bytes::from(serde_json::to_vec(&value).unwrap_or_default())
}

/// Reads the request body up to `limit` bytes.
///
/// A longer body, or a stream that breaks midway, is replaced by a small
/// JSON marker so the delivery is still recorded as a raw event.
pub async fn read_body(payload: &mut web::types::Payload, limit: usize) -> Bytes {
    let mut body = BytesMut::new();

    while let Some(chunk) = stream_recv(payload).await {
        match chunk {
            Ok(chunk) if body.len() + chunk.len() <= limit => body.extend_from_slice(&chunk),
            Ok(chunk) => {
                log::warn!("webhook body exceeds {} bytes, storing a marker", limit);
                let read = body.len() + chunk.len();
                body.extend_from_slice(&chunk);
                let prefix = &body[..body.len().min(OVERSIZED_PREFIX_BYTES)];

                return json_bytes(json!({
                    "oversized_body": {
                        "limit_bytes": limit,
                        "read_bytes": read,
                        "prefix": String::from_utf8_lossy(prefix),
                    }
                }));
            }
            Err(e) => {
                log::error!("failed to read webhook body: {}", e);

                return json_bytes(json!({
                    "unreadable_body": {
                        "error": e.to_string(),
                        "read_bytes": body.len(),
                    }
                }));
            }
        }
    }

    body.freeze()
}

/// Webhook receiver endpoint (POST)
///
/// Receives webhook events from WhatsApp Business API and processes them
/// synchronously. The provider retries any non-200 answer, so this endpoint
/// answers 200 with an empty body whatever happened while processing,
/// panics and oversized bodies included.
#[web::post("/")]
pub async fn receive(
    mut payload: web::types::Payload,
    app_state: web::types::State<AppState>,
) -> web::HttpResponse {
    let received_at = Utc::now();
    let body = read_body(&mut payload, consts::MAX_WEBHOOK_BODY_BYTES).await;
    log::info!("webhook received at {}", received_at.to_rfc3339());
    log::debug!("full webhook body: {}", String::from_utf8_lossy(&body));

    let processing = handler::process_webhook(
        &body,
        &app_state.repo,
        app_state.messaging.as_ref(),
        &app_state.ingest_options,
        received_at,
    );

    match AssertUnwindSafe(processing)
        .catch_unwind()
        .instrument(logfire::span!("whatsapp_webhook"))
        .await
    {
        Ok(report) => log::info!(
            "webhook acknowledged: extraction={} doc_id={} persisted={:?} reply={:?}",
            report.extraction,
            report.doc_id,
            report.persisted,
            report.reply
        ),
        Err(_) => log::error!("webhook processing panicked, acknowledging anyway"),
    }

    web::HttpResponse::Ok().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        models::event::{Collection, RecordPayload},
        repo::{self, EventRepo, MockEventRepo, memory::InMemoryRepo},
        services::{self, MockMessagingService, SendReceipt},
        webhook,
    };
    use envconfig::Envconfig;
    use ntex::{http, web::test};
    use std::collections::HashMap;

    const EXAMPLE: &str = r#"{"entry":[{"changes":[{"field":"messages","value":{"messages":[{"id":"wamid.1","from":"1555000111","type":"text","text":{"body":"Hi there"}}],"contacts":[{"profile":{"name":"Ana"}}]}}]}]}"#;

    fn test_config() -> AppConfig {
        let env = HashMap::from([("VERIFY_TOKEN".to_string(), "s3cret".to_string())]);
        AppConfig::init_from_hashmap(&env).unwrap()
    }

    fn app_state(
        repo: repo::ImplEventRepo,
        messaging: Option<services::ImplMessagingService>,
    ) -> AppState {
        AppState::new(&test_config(), repo, messaging)
    }

    async fn body_json(resp: web::WebResponse) -> serde_json::Value {
        serde_json::from_slice(&test::read_body(resp).await).unwrap()
    }

    fn message_with_id(id: &str) -> String {
        EXAMPLE.replace("wamid.1", id)
    }

    #[test]
    fn test_verify_query_from_query_string() {
        let query = VerifyQuery::from_query_string(
            "hub.mode=subscribe&hub.verify_token=test123&hub.challenge=challenge%20123",
        );
        assert_eq!(query.mode.as_deref(), Some("subscribe"));
        assert_eq!(query.verify_token.as_deref(), Some("test123"));
        assert_eq!(query.challenge.as_deref(), Some("challenge 123"));

        let repeated = VerifyQuery::from_query_string("hub.mode=x&hub.mode=subscribe");
        assert_eq!(repeated.mode.as_deref(), Some("x"));

        assert_eq!(VerifyQuery::from_query_string(""), VerifyQuery::default());
    }

    #[test]
    fn test_check_subscription() {
        let query = |mode: &str, token: &str| VerifyQuery {
            mode: Some(mode.into()),
            verify_token: Some(token.into()),
            challenge: Some("1158201444".into()),
        };

        assert_eq!(
            check_subscription(&query("subscribe", "s3cret"), "s3cret").as_deref(),
            Some("1158201444")
        );
        assert!(check_subscription(&query("subscribe", "wrong"), "s3cret").is_none());
        assert!(check_subscription(&query("subscribe", "s3cre"), "s3cret").is_none());
        assert!(check_subscription(&query("unsubscribe", "s3cret"), "s3cret").is_none());
        assert!(check_subscription(&VerifyQuery::default(), "s3cret").is_none());
    }

    #[ntex::test]
    async fn test_verify_endpoint() {
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(InMemoryRepo::new()), None))
                .configure(webhook::routes::whatsapp),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/?hub.mode=subscribe&hub.challenge=abc%20123&hub.verify_token=s3cret")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(test::read_body(resp).await, Bytes::from_static(b"abc 123"));

        let req = test::TestRequest::get()
            .uri("/?hub.mode=subscribe&hub.challenge=abc&hub.verify_token=nope")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);
        assert!(test::read_body(resp).await.is_empty());

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);
    }

    #[ntex::test]
    async fn test_verify_with_repeated_keys_is_not_a_bad_request() {
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(InMemoryRepo::new()), None))
                .configure(webhook::routes::whatsapp),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/?hub.mode=x&hub.mode=subscribe&hub.verify_token=s3cret&hub.challenge=c1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);
        assert!(test::read_body(resp).await.is_empty());

        let req = test::TestRequest::get()
            .uri("/?hub.mode=subscribe&hub.verify_token=s3cret&hub.verify_token=nope&hub.challenge=c1&hub.challenge=c2")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(test::read_body(resp).await, Bytes::from_static(b"c1"));
    }

    #[ntex::test]
    async fn test_receive_always_acknowledges() {
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(InMemoryRepo::new()), None))
                .configure(webhook::routes::whatsapp),
        )
        .await;

        let bodies: [&[u8]; 6] = [
            b"{}",
            b"{\"object\":\"whatsapp_business_account\"}",
            b"[1,2,3]",
            b"not json",
            b"",
            EXAMPLE.as_bytes(),
        ];
        for body in bodies {
            let req = test::TestRequest::post()
                .uri("/")
                .header("content-type", "application/json")
                .set_payload(body.to_vec())
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), http::StatusCode::OK);
            assert!(test::read_body(resp).await.is_empty());
        }
    }

    #[ntex::test]
    async fn test_oversized_body_is_acknowledged_and_logged() {
        let repo = InMemoryRepo::new();
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(repo.clone()), None))
                .configure(webhook::routes::whatsapp),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .header("content-type", "application/json")
            .set_payload(vec![b'{'; consts::MAX_WEBHOOK_BODY_BYTES + 1])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        assert!(test::read_body(resp).await.is_empty());

        let logs = repo
            .get_recent_records(Collection::WebhookLogs, 10)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        let RecordPayload::Raw(raw) = &logs[0].payload else {
            panic!("expected a raw payload");
        };
        assert_eq!(
            raw["oversized_body"]["limit_bytes"],
            consts::MAX_WEBHOOK_BODY_BYTES
        );
        assert!(repo.get_recent_records(Collection::Messages, 10).await.unwrap().is_empty());
    }

    #[ntex::test]
    async fn test_receive_acknowledges_when_store_fails() {
        let mut mock_repo = MockEventRepo::new();
        mock_repo
            .expect_upsert_record()
            .returning(|_, _| Err(anyhow::anyhow!("database is locked")));
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(mock_repo), None))
                .configure(webhook::routes::whatsapp),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .set_payload(EXAMPLE)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[ntex::test]
    async fn test_receive_acknowledges_when_processing_panics() {
        let mut mock_repo = MockEventRepo::new();
        mock_repo
            .expect_upsert_record()
            .returning(|_, _| panic!("store driver bug"));
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(mock_repo), None))
                .configure(webhook::routes::whatsapp),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .set_payload(EXAMPLE)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[ntex::test]
    async fn test_example_scenario_end_to_end() {
        let repo = InMemoryRepo::new();
        let mut messaging = MockMessagingService::new();
        messaging
            .expect_send_text_message()
            .withf(|to, body| to == "1555000111" && body.starts_with("Hello!"))
            .times(1)
            .returning(|_, _| Ok(SendReceipt { message_id: None }));
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(repo.clone()), Some(Box::new(messaging))))
                .configure(webhook::routes::whatsapp),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .set_payload(EXAMPLE)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);

        let stored = repo.get_recent_records(Collection::Messages, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].doc_id, "wamid.1");
        assert_eq!(stored[0].sender(), Some("1555000111"));
    }

    #[ntex::test]
    async fn test_messages_after_ingestions() {
        let repo = InMemoryRepo::new();
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(repo.clone()), None))
                .configure(webhook::routes::whatsapp)
                .configure(crate::front::routes::events)
                .configure(crate::front::routes::health),
        )
        .await;

        for id in ["wamid.a", "wamid.b", "wamid.c", "wamid.b"] {
            let req = test::TestRequest::post()
                .uri("/")
                .set_payload(message_with_id(id))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), http::StatusCode::OK);
        }

        let req = test::TestRequest::get().uri("/messages").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        let page: serde_json::Value = body_json(resp).await;
        assert_eq!(page["count"], 3);
        assert_eq!(page["messages"][0]["doc_id"], "wamid.b");

        let req = test::TestRequest::get().uri("/messages?limit=2").to_request();
        let page: serde_json::Value = body_json(test::call_service(&app, req).await).await;
        assert_eq!(page["count"], 2);

        let req = test::TestRequest::get()
            .uri("/users/1555000111/messages")
            .to_request();
        let page: serde_json::Value = body_json(test::call_service(&app, req).await).await;
        assert_eq!(page["count"], 3);

        let req = test::TestRequest::get().uri("/stats").to_request();
        let stats: serde_json::Value = body_json(test::call_service(&app, req).await).await;
        assert_eq!(stats["total_messages"], 3);
        assert_eq!(stats["total_users"], 1);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        let health: serde_json::Value = body_json(resp).await;
        assert_eq!(health["status"], "OK");
        assert_eq!(health["database"], "connected");
    }

    #[ntex::test]
    async fn test_messages_store_error() {
        let mut mock_repo = MockEventRepo::new();
        mock_repo
            .expect_get_recent_records()
            .returning(|_, _| Err(anyhow::anyhow!("no such table: whatsapp_messages")));
        mock_repo
            .expect_ping()
            .returning(|| Err(anyhow::anyhow!("no such table: health_checks")));
        let app = test::init_service(
            web::App::new()
                .state(app_state(Box::new(mock_repo), None))
                .configure(crate::front::routes::events)
                .configure(crate::front::routes::health),
        )
        .await;

        let req = test::TestRequest::get().uri("/messages").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = body_json(resp).await;
        assert_eq!(body["error"], "Failed to retrieve messages");

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        let health: serde_json::Value = body_json(resp).await;
        assert_eq!(health["status"], "ERROR");
        assert_eq!(health["database"], "disconnected");
    }
}
