//! # WhatsApp Webhook Store
//!
//! Main entry point of the webhook service. Loads the configuration, sets up
//! logging, the event store and the optional WhatsApp client, then serves
//! the webhook, read and health routes.

pub mod api;
pub mod config;
pub mod consts;
pub mod front;
pub mod logger;
pub mod metric;
pub mod models;
pub mod repo;
pub mod services;
pub mod utils;
pub mod webhook;

use config::{AppConfig, StoreBackend};
use envconfig::Envconfig;
use logfire::config::MetricsOptions;
use ntex::web;
use std::sync::Arc;

/// Builds one store handle per server worker, all sharing the same backend
type RepoFactory = Arc<dyn Fn() -> repo::ImplEventRepo + Send + Sync>;

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Initialize configuration
    let app_config = AppConfig::init_from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))?;

    // Initialize logging and metrics: stdout on local runs, Logfire elsewhere
    let shutdown_handler = if app_config.is_local() {
        logger::setup_simple_logger()?;
        None
    } else {
        let logfire_config = logfire::configure()
            .install_panic_handler()
            .with_metrics(Some(MetricsOptions::default()))
            .send_to_logfire(logfire::config::SendToLogfire::Yes);
        let logfire_config = match &app_config.logfire_token {
            Some(token) => logfire_config.with_token(token),
            None => logfire_config,
        };
        Some(logfire_config.finish()?)
    };

    if !app_config.is_local() && app_config.uses_default_verify_token() {
        log::warn!("VERIFY_TOKEN is not set, the default handshake token is in use");
    }

    let repo_factory = setup_repo(&app_config).await?;

    let messaging = webhook::whatsapp::client::WhatsAppClient::from_config(&app_config)?;
    if messaging.is_none() {
        log::warn!(
            "auto-reply disabled: enabled={} token_set={} phone_number_id_set={}",
            app_config.auto_reply_enabled,
            app_config.authorization_token.is_some(),
            app_config.whatsapp_phone_number_id.is_some()
        );
    }

    run_server(app_config, repo_factory, messaging).await?;

    if let Some(shutdown_handler) = shutdown_handler {
        shutdown_handler.shutdown()?;
    }

    Ok(())
}

async fn setup_repo(app_config: &AppConfig) -> anyhow::Result<RepoFactory> {
    log::info!("using {} event store", app_config.store_backend);

    Ok(match app_config.store_backend {
        StoreBackend::Sqlite => {
            let sqlite_repo = repo::sqlite::SqlxSqliteRepo {
                db_pool: utils::setup_sqlite_db_pool(app_config).await?,
            };
            sqlite_repo.run_migrations().await?;

            Arc::new(move || Box::new(sqlite_repo.clone()) as repo::ImplEventRepo)
        }
        StoreBackend::Memory => {
            let memory_repo = repo::memory::InMemoryRepo::new();

            Arc::new(move || Box::new(memory_repo.clone()) as repo::ImplEventRepo)
        }
    })
}

/// Configures and starts the web server
async fn run_server(
    app_config: AppConfig,
    repo_factory: RepoFactory,
    messaging: Option<webhook::whatsapp::client::WhatsAppClient>,
) -> anyhow::Result<()> {
    let server_addr = ("0.0.0.0", app_config.port);
    log::info!("listening on {}:{}", server_addr.0, server_addr.1);

    web::server(move || {
        let messaging = messaging
            .clone()
            .map(|client| Box::new(client) as services::ImplMessagingService);

        web::App::new()
            .wrap(web::middleware::Logger::default())
            .wrap(web::middleware::Compress::default())
            .state(front::AppState::new(&app_config, repo_factory(), messaging))
            .configure(webhook::routes::whatsapp)
            .configure(front::routes::events)
            .configure(front::routes::health)
    })
    .bind(server_addr)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
