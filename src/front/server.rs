//! Read and health endpoints

use ntex::web;
use serde::Deserialize;

use crate::{
    api,
    front::{AppState, errors},
};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
}

/// Most recent stored messages, newest first
#[web::get("/messages")]
pub async fn list_messages(
    query: web::types::Query<PageQuery>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let limit = api::events::page_limit(query.limit, app_state.page_limit);

    let page = api::events::get_recent_messages(&app_state.repo, limit)
        .await
        .map_err(|e| errors::WebhookError::MessagesUnavailable(format!("{e:#}")))?;

    Ok(web::HttpResponse::Ok().json(&page))
}

/// Messages mirrored under one sender, newest first
#[web::get("/users/{user_id}/messages")]
pub async fn list_sender_messages(
    path: web::types::Path<String>,
    query: web::types::Query<PageQuery>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let limit = api::events::page_limit(query.limit, app_state.page_limit);

    let page = api::events::get_sender_messages(&app_state.repo, &path, limit)
        .await
        .map_err(|e| errors::WebhookError::MessagesUnavailable(format!("{e:#}")))?;

    Ok(web::HttpResponse::Ok().json(&page))
}

#[web::get("/stats")]
pub async fn stats(
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let stats = api::events::get_stats(&app_state.repo)
        .await
        .map_err(|e| errors::WebhookError::StatsUnavailable(format!("{e:#}")))?;

    Ok(web::HttpResponse::Ok().json(&stats))
}

/// Liveness check, optionally validating store connectivity
#[web::get("/health")]
pub async fn health(app_state: web::types::State<AppState>) -> web::HttpResponse {
    let report = api::events::check_health(&app_state.repo, app_state.health_check_mode).await;

    if report.is_healthy() {
        return web::HttpResponse::Ok().json(&report);
    }

    web::HttpResponse::InternalServerError().json(&report)
}
