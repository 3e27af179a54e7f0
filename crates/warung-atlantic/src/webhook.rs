// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settlement webhook gate.
//!
//! Two auth schemes, either sufficient: HTTP Basic whose username and
//! password hash (lowercase MD5) to the configured digests, or a signature
//! header equal to one of those digests. The gate performs no
//! deduplication; the processor must be idempotent by reference.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use md5::{Digest, Md5};

use warung_core::WarungError;

/// Event kinds carried by Atlantic settlement notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Transaksi,
    TransaksiPascabayar,
    Deposit,
    Transfer,
    Unknown,
}

impl EventKind {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "transaksi" => EventKind::Transaksi,
            "transaksi.pascabayar" => EventKind::TransaksiPascabayar,
            "deposit" => EventKind::Deposit,
            "transfer" => EventKind::Transfer,
            _ => EventKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Transaksi => "transaksi",
            EventKind::TransaksiPascabayar => "transaksi.pascabayar",
            EventKind::Deposit => "deposit",
            EventKind::Transfer => "transfer",
            EventKind::Unknown => "unknown",
        }
    }
}

/// One authenticated settlement notification.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub kind: EventKind,
    /// The kind token as received, before mapping.
    pub raw_kind: String,
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

impl WebhookEvent {
    /// Parse the payload as JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value, WarungError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| WarungError::Validation(format!("webhook payload is not JSON: {e}")))
    }
}

/// Handler for authenticated settlement events. Must be idempotent by
/// reference: events may be delivered more than once and may arrive
/// before the originating create call has returned.
#[async_trait]
pub trait WebhookProcessor: Send + Sync {
    async fn handle_event(&self, event: WebhookEvent) -> Result<(), WarungError>;
}

/// Signature header names accepted for scheme 2, checked in order.
pub const SIGNATURE_HEADERS: [&str; 3] = ["x-atl-signature", "x-atlantic-signature", "x-signature"];

/// Event-kind header names, checked in order.
pub const EVENT_HEADERS: [&str; 3] = ["x-atlantic-event", "x-event-type", "x-event"];

/// Validates webhook credentials against configured MD5 digests.
#[derive(Clone)]
pub struct WebhookGate {
    username_md5: String,
    password_md5: String,
}

impl std::fmt::Debug for WebhookGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookGate")
            .field("username_md5", &"[redacted]")
            .field("password_md5", &"[redacted]")
            .finish()
    }
}

impl WebhookGate {
    pub fn new(username_md5: &str, password_md5: &str) -> Self {
        Self {
            username_md5: username_md5.trim().to_lowercase(),
            password_md5: password_md5.trim().to_lowercase(),
        }
    }

    /// Check the request's credentials.
    ///
    /// `authorization` is the raw `Authorization` header; `signature` is
    /// the first non-empty of the [`SIGNATURE_HEADERS`]. Returns
    /// `Unauthorized` when neither scheme matches.
    pub fn authorize(
        &self,
        authorization: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), WarungError> {
        if let Some((username, password)) = authorization.and_then(parse_basic_auth) {
            if md5_hex(&username) == self.username_md5 && md5_hex(&password) == self.password_md5 {
                return Ok(());
            }
            return Err(WarungError::Unauthorized);
        }

        if let Some(signature) = signature {
            let signature = signature.trim().to_lowercase();
            if !signature.is_empty()
                && (signature == self.username_md5 || signature == self.password_md5)
            {
                return Ok(());
            }
        }

        Err(WarungError::Unauthorized)
    }
}

/// Decode `Basic <base64(user:pass)>`.
fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let encoded = header.trim().strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Lowercase hex MD5 digest.
pub fn md5_hex(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}

/// Resolve the event kind: first non-empty of the event headers, then the
/// JSON body fields `event_type | type | event`, else `unknown`.
pub fn detect_event_kind(headers: &HashMap<String, String>, body: &[u8]) -> String {
    for key in EVENT_HEADERS {
        if let Some(value) = headers.get(key) {
            if !value.trim().is_empty() {
                return value.trim().to_string();
            }
        }
    }

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["event_type", "type", "event"] {
            if let Some(kind) = value.get(key).and_then(|v| v.as_str()) {
                if !kind.trim().is_empty() {
                    return kind.trim().to_string();
                }
            }
        }
    }
    "unknown".to_string()
}
