//! WhatsApp webhook integration module
//!
//! This module provides webhook handling for WhatsApp Business Cloud API.
//! It includes both the HTTP route handlers and the ingestion pipeline for
//! incoming deliveries.
//!
//! ## Submodules
//!
//! - [`routes`] - Verification handshake and delivery receiver
//! - [`handler`] - Ingestion flow: extraction, persistence, auto-reply
//! - [`extractor`] - First user message out of a delivery body
//! - [`auto_reply`] - Keyword rules for canned replies
//! - [`schemas`] / [`outgoing_schemas`] - Incoming and outgoing payloads
//! - [`client`] - WhatsApp API client for sending messages

pub mod auto_reply;
pub mod client;
pub mod extractor;
pub mod handler;
pub mod outgoing_schemas;
pub mod routes;
pub mod schemas;

pub use routes::{receive, verify};
