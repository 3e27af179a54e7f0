// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod api_keys;
pub mod balances;
pub mod deposits;
pub mod messages;
pub mod orders;
pub mod users;

use serde_json::Value;

/// Decode a metadata TEXT column. Undecodable content is preserved under
/// `_raw` rather than dropped.
pub(crate) fn metadata_from_text(text: Option<String>) -> Option<Value> {
    let text = text?;
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(_) => Some(serde_json::json!({ "_raw": text })),
    }
}

/// Encode a metadata value for storage. `None` maps to SQL NULL.
pub(crate) fn metadata_to_text(metadata: Option<&Value>) -> Option<String> {
    metadata.map(|v| v.to_string())
}
