// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency reference generation.
//!
//! References are globally unique and recoverable: the owning user id is
//! the first `:`-separated segment, which lets the settlement processor
//! upsert rows for events that arrive before the local insert landed.

use rand::Rng;

/// `<user_id>:<epoch_ms>:<rand>` for orders.
pub fn new_order_ref(user_id: &str) -> String {
    new_ref(user_id)
}

/// Same shape for deposits; orders and deposits live in separate tables
/// so the namespaces cannot collide.
pub fn new_deposit_ref(user_id: &str) -> String {
    new_ref(user_id)
}

fn new_ref(user_id: &str) -> String {
    let epoch_ms = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0x1000..0xFFFF);
    format!("{user_id}:{epoch_ms}:{suffix:x}")
}

/// Recover the owning user id from a reference, if it has the canonical
/// shape.
pub fn user_id_from_ref(reference: &str) -> Option<&str> {
    let mut parts = reference.splitn(3, ':');
    let user_id = parts.next()?;
    let epoch = parts.next()?;
    parts.next()?;
    (!user_id.is_empty() && epoch.chars().all(|c| c.is_ascii_digit())).then_some(user_id)
}
