// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-through status lookups for orders and transfers.
//!
//! The local row is the base truth; when it is not terminal the remote
//! status is consulted and, if it advanced, written back. Terminal rows
//! are never touched again.

use warung_atlantic::TransactionStatusRequest;
use warung_core::{is_terminal_status, WarungError};
use warung_gemini::Slots;
use warung_storage::{Order, User};

use crate::replies::status_label;
use crate::session::SessionState;
use crate::Engine;

/// `order_status`.
pub(crate) async fn order_status(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let Some(order) = resolve_order(engine, user, session, slots).await? else {
        return Ok("Sebutkan nomor referensi pesanannya ya.".to_string());
    };
    let Some(mut order) = order else {
        return Ok("Pesanan itu tidak ditemukan.".to_string());
    };

    if !is_terminal_status(&order.status) {
        match engine
            .atlantic
            .transaction_status(TransactionStatusRequest {
                ref_id: order.order_ref.clone(),
                ..Default::default()
            })
            .await
        {
            Ok(remote) if remote.status != order.status && remote.status != "unknown" => {
                engine
                    .store
                    .update_order_status(&order.order_ref, &remote.status, None)
                    .await?;
                order.status = remote.status;
                if !remote.sn.is_empty() {
                    return Ok(format!(
                        "Status pesanan {}: {}.\nSN: {}",
                        order.order_ref,
                        status_label(&order.status),
                        remote.sn
                    ));
                }
            }
            Ok(_) => {}
            // A flaky upstream must not break a read; answer from the
            // local row.
            Err(e) if e.is_transient() => {}
            Err(e) => return Err(e),
        }
    }

    let sn_line = order
        .metadata
        .as_ref()
        .and_then(|m| m.get("sn"))
        .and_then(|v| v.as_str())
        .filter(|sn| !sn.is_empty())
        .map(|sn| format!("\nSN: {sn}"))
        .unwrap_or_default();

    Ok(format!(
        "Status pesanan {}: {}.{}",
        order.order_ref,
        status_label(&order.status),
        sn_line
    ))
}

/// `transfer_status`: like order status, but consulting the transfer
/// endpoint with the provider id recorded at create time.
pub(crate) async fn transfer_status(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let Some(order) = resolve_order(engine, user, session, slots).await? else {
        return Ok("Sebutkan nomor referensi transfernya ya.".to_string());
    };
    let Some(mut order) = order else {
        return Ok("Transfer itu tidak ditemukan.".to_string());
    };

    let provider_id = order
        .metadata
        .as_ref()
        .and_then(|m| m.get("id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    if !is_terminal_status(&order.status) {
        if let Some(provider_id) = provider_id {
            match engine.atlantic.transfer_status(&provider_id).await {
                Ok(remote) if remote.status != order.status && remote.status != "unknown" => {
                    engine
                        .store
                        .update_order_status(&order.order_ref, &remote.status, None)
                        .await?;
                    order.status = remote.status;
                }
                Ok(_) => {}
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
        }
    }

    Ok(format!(
        "Status transfer {}: {}.",
        order.order_ref,
        status_label(&order.status)
    ))
}

/// Resolve the order named by the `ref` slot or the session's last order.
///
/// `Ok(None)` means no reference was available at all; `Ok(Some(None))`
/// means a reference was given but no owned order matches it.
async fn resolve_order(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<Option<Option<Order>>, WarungError> {
    let reference = slots
        .get_str("ref")
        .or_else(|| session.last_order_ref.clone());
    let Some(reference) = reference else {
        return Ok(None);
    };

    match engine.store.get_order_by_ref(&reference).await {
        Ok(order) if order.user_id == user.id => Ok(Some(Some(order))),
        Ok(_) => Ok(Some(None)),
        Err(WarungError::NotFound(_)) => Ok(Some(None)),
        Err(e) => Err(e),
    }
}
