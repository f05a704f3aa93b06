pub mod errors;
pub mod routes;
pub mod server;

use crate::{
    config::{AppConfig, HealthCheckMode},
    repo, services,
    webhook::whatsapp::handler::IngestOptions,
};

pub struct AppState {
    pub repo: repo::ImplEventRepo,
    pub messaging: Option<services::ImplMessagingService>,
    pub verify_token: String,
    pub page_limit: u32,
    pub health_check_mode: HealthCheckMode,
    pub ingest_options: IngestOptions,
}

impl AppState {
    pub fn new(
        app_config: &AppConfig,
        repo: repo::ImplEventRepo,
        messaging: Option<services::ImplMessagingService>,
    ) -> Self {
        Self {
            repo,
            messaging,
            verify_token: app_config.verify_token.clone(),
            page_limit: app_config.page_limit(),
            health_check_mode: app_config.health_check_mode,
            ingest_options: IngestOptions {
                mirror_sender_messages: app_config.mirror_sender_messages,
                track_user_profiles: app_config.track_user_profiles,
                reply_timeout: app_config.reply_timeout(),
            },
        }
    }
}
