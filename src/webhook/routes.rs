use ntex::web;

/// Configures the WhatsApp webhook routes.
///
/// These are public endpoints mounted at the root path, the callback URL
/// registered in the Meta dashboard.
///
/// # Routes
/// - `GET /` - WhatsApp webhook verification
/// - `POST /` - WhatsApp webhook receiver, reading at most
///   [`MAX_WEBHOOK_BODY_BYTES`](crate::consts::MAX_WEBHOOK_BODY_BYTES) of body
pub fn whatsapp(cfg: &mut web::ServiceConfig) {
    cfg.service((super::whatsapp::verify, super::whatsapp::receive));
}
