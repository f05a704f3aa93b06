//! Read and health route configuration.

use super::server;
use ntex::web;

/// Configures the read side of the event store.
///
/// # Routes
/// - `GET /messages` - Recent stored messages
/// - `GET /users/{user_id}/messages` - Messages mirrored for one sender
/// - `GET /stats` - Message and user counters
pub fn events(cfg: &mut web::ServiceConfig) {
    cfg.service((
        server::list_messages,
        server::list_sender_messages,
        server::stats,
    ));
}

/// Configures `GET /health`
pub fn health(cfg: &mut web::ServiceConfig) {
    cfg.service(server::health);
}
