// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical status vocabulary.
//!
//! The upstream provider reports transaction and availability statuses in a
//! mix of Indonesian and English verbs. Everything above the provider client
//! only sees the normalized forms produced here.

/// Normalize a provider transaction status verb to the canonical set
/// `success | pending | failed | unknown`.
///
/// Verbs outside the known sets pass through lowercased so that new
/// provider vocabulary degrades visibly instead of silently.
pub fn normalize_tx_status(raw: &str) -> String {
    let status = raw.trim().to_lowercase();
    match status.as_str() {
        "" | "null" => "unknown".to_string(),
        "success" | "sukses" | "ok" | "completed" | "complete" | "done" | "paid" | "berhasil" => {
            "success".to_string()
        }
        "pending" | "process" | "processing" | "diproses" | "waiting" | "awaiting" | "progress"
        | "menunggu" => "pending".to_string(),
        "failed" | "gagal" | "cancel" | "cancelled" | "expired" | "timeout" | "void"
        | "rejected" => "failed".to_string(),
        _ => status,
    }
}

/// Normalize a price-item availability status to
/// `available | processing | unavailable` (empty when unrecognizable).
pub fn normalize_availability(raw: &str) -> String {
    let status = raw.trim().to_lowercase();
    match status.as_str() {
        "" | "null" => String::new(),
        "available" | "aktif" | "active" | "success" | "sukses" | "ok" | "ready" => {
            "available".to_string()
        }
        "pending" | "process" | "diproses" | "processing" => "processing".to_string(),
        "failed" | "gagal" | "unavailable" | "off" | "soldout" | "empty" => {
            "unavailable".to_string()
        }
        _ => status,
    }
}

/// Whether an order or deposit status is terminal. Terminal rows must
/// never transition again.
pub fn is_terminal_status(status: &str) -> bool {
    matches!(status, "success" | "failed")
}
