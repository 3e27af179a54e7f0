// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IM transport seam.
//!
//! The concrete WhatsApp wire binding (pairing, media upload, raw event
//! delivery) lives outside this workspace. This crate defines the
//! [`Transport`] trait the engine talks to, the normalized inbound event
//! shape, and the ambient reply-quote scope. [`LogTransport`] stands in
//! when no binding is compiled in, so the service can run gateway-only.

pub mod reply;

use async_trait::async_trait;
use tracing::info;

use warung_core::{MediaKind, WarungError};
use warung_metrics::record_outgoing_message;

pub use reply::{current_reply, with_reply, ReplyMeta};

/// A normalized inbound IM event.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Bare messenger id of the sender (phone-scoped).
    pub sender_wa_id: String,
    /// Full routing address of the sender.
    pub sender_jid: String,
    /// Chat the message arrived in (equals `sender_jid` for DMs).
    pub chat_jid: String,
    /// Transport message id, used for reply quoting.
    pub message_id: String,
    /// Sender display name, when the transport provides one.
    pub push_name: Option<String>,
    pub kind: MediaKind,
    /// Text body or media caption.
    pub text: Option<String>,
    /// Opaque media handle the binding can resolve to bytes.
    pub media_ref: Option<String>,
    /// Raw transport payload for the audit log.
    pub raw: serde_json::Value,
    pub timestamp: String,
}

/// Outbound side of the IM transport.
///
/// Implementations must quote the referenced inbound message when a reply
/// scope (see [`with_reply`]) is active, and increment the outgoing
/// message metric per send.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), WarungError>;

    async fn send_image(
        &self,
        to: &str,
        data: &[u8],
        mime: &str,
        caption: &str,
    ) -> Result<(), WarungError>;

    /// Resolve a message's media to bytes and a MIME type.
    async fn download_media(&self, msg: &InboundMessage) -> Result<(Vec<u8>, String), WarungError>;
}

/// Fallback transport that logs outbound traffic instead of delivering
/// it. Wired in when no IM binding is linked; keeps the webhook and admin
/// surfaces fully functional.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), WarungError> {
        match current_reply() {
            Some(reply) => info!(to, quoting = %reply.message_id, %text, "outbound text (log only)"),
            None => info!(to, %text, "outbound text (log only)"),
        }
        record_outgoing_message(MediaKind::Text.as_str());
        Ok(())
    }

    async fn send_image(
        &self,
        to: &str,
        data: &[u8],
        mime: &str,
        caption: &str,
    ) -> Result<(), WarungError> {
        info!(to, bytes = data.len(), mime, caption, "outbound image (log only)");
        record_outgoing_message(MediaKind::Image.as_str());
        Ok(())
    }

    async fn download_media(
        &self,
        _msg: &InboundMessage,
    ) -> Result<(Vec<u8>, String), WarungError> {
        Err(WarungError::Transport {
            message: "no IM binding available for media download".to_string(),
            source: None,
        })
    }
}
