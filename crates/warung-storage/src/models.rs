// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! Timestamps are stored as RFC 3339 UTC strings, which keep their
//! chronological order under lexicographic comparison.

use serde_json::Value;

/// A messenger user. Created on first inbound message; mutated only by
/// upsert-by-messenger-id.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    /// Bare messenger identifier (phone-scoped), unique.
    pub wa_id: String,
    /// Full routing address; may change across sessions.
    pub wa_jid: Option<String>,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub language_preference: String,
    pub timezone: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields carried into a user upsert. `None` preserves the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub wa_id: String,
    pub wa_jid: Option<String>,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub language_preference: Option<String>,
    pub timezone: Option<String>,
}

/// Append-only audit record of one IM message.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub user_id: String,
    /// "inbound" or "outbound".
    pub direction: String,
    /// Media kind: "text", "image", "audio", "other".
    pub message_type: String,
    pub content: Option<String>,
    pub media_url: Option<String>,
    /// Opaque raw payload, JSON-encoded.
    pub raw_payload: Option<Value>,
    pub created_at: String,
}

/// A purchase order row.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub order_ref: String,
    pub product_code: String,
    /// Amount in integer minor units.
    pub amount: i64,
    pub fee: i64,
    pub status: String,
    pub metadata: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// A deposit row. Like [`Order`] but keyed by `deposit_ref` and carrying a
/// payment method.
#[derive(Debug, Clone)]
pub struct Deposit {
    pub id: String,
    pub user_id: String,
    pub deposit_ref: String,
    pub method: String,
    pub amount: i64,
    pub status: String,
    pub metadata: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// One credential in the rotation pool.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: String,
    pub provider: String,
    pub value: String,
    /// Lower is preferred.
    pub priority: i64,
    /// RFC 3339; the key is eligible when null or in the past.
    pub cooldown_until: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Computed balance snapshot for a user.
#[derive(Debug, Clone, Default)]
pub struct UserBalance {
    pub user_id: String,
    pub wa_id: String,
    pub deposited_confirmed: i64,
    pub deposited_pending: i64,
    pub total_deposited: i64,
    pub spent_confirmed: i64,
    pub spent_pending: i64,
    pub total_spent: i64,
    /// `deposited_confirmed - spent_confirmed`.
    pub saldo_confirmed: i64,
}

/// Current RFC 3339 UTC timestamp with millisecond precision.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
