// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wallet deposits: confirmation-gated creation, status, and cancel.

use serde_json::json;
use tracing::info;

use warung_atlantic::DepositRequest;
use warung_catalog::parse_amount;
use warung_core::WarungError;
use warung_gemini::Slots;
use warung_storage::{Deposit, User};

use crate::refs::new_deposit_ref;
use crate::replies::{self, checkout_instructions, rupiah, status_label};
use crate::session::{PendingAction, PendingConfirmation, SessionState};
use crate::Engine;

/// `deposit_create`: validate the amount, then gate behind confirmation.
pub(crate) async fn start(
    engine: &Engine,
    session: &mut SessionState,
    slots: &Slots,
    utterance: &str,
) -> Result<String, WarungError> {
    let amount = slots
        .get_i64("amount")
        .or_else(|| parse_amount(utterance).ok())
        .filter(|a| *a > 0);
    let Some(amount) = amount else {
        return Ok("Mau top up saldo berapa? Contoh: \"deposit 50rb\".".to_string());
    };

    let method = slots
        .get_str("method")
        .unwrap_or_else(|| engine.config.deposit_method.clone());
    session.last_amount = Some(amount);

    let fee = engine.config.deposit_fee_fixed as f64
        + amount as f64 * engine.config.deposit_fee_percent;
    let fee_line = if fee > 0.0 {
        format!("\nPerkiraan biaya admin: {}", rupiah(fee))
    } else {
        String::new()
    };

    let preview = format!(
        "Konfirmasi top up saldo:\nNominal: {}\nMetode: {}{}\n\n{}",
        rupiah(amount as f64),
        method,
        fee_line,
        replies::CONFIRM_HINT
    );
    session.pending = Some(PendingConfirmation::new(PendingAction::DepositCreate {
        method,
        amount,
    }));
    Ok(preview)
}

/// Confirmed deposit: persist, create upstream, reply with the checkout
/// instrument.
pub(crate) async fn execute(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    method: String,
    amount: i64,
) -> Result<String, WarungError> {
    let deposit_ref = new_deposit_ref(&user.id);

    match engine
        .store
        .insert_deposit(Deposit {
            id: String::new(),
            user_id: user.id.clone(),
            deposit_ref: deposit_ref.clone(),
            method: method.clone(),
            amount,
            status: "pending".to_string(),
            metadata: Some(json!({"method": method})),
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
    {
        Ok(_) => {}
        Err(WarungError::Conflict(_)) => {
            let existing = engine.store.get_deposit_by_ref(&deposit_ref).await?;
            return Ok(format!(
                "Deposit {} sudah tercatat, statusnya {}.",
                deposit_ref,
                status_label(&existing.status)
            ));
        }
        Err(e) => return Err(e),
    }
    session.last_deposit_ref = Some(deposit_ref.clone());

    info!(deposit_ref = %deposit_ref, method = %method, amount, "creating deposit");
    let result = engine
        .atlantic
        .create_deposit(DepositRequest {
            method: method.clone(),
            amount: amount as f64,
            ref_id: deposit_ref.clone(),
            deposit_type: engine.config.deposit_type.clone(),
        })
        .await;

    match result {
        Ok(created) => {
            // Fee falls back to engine config when the provider omits it.
            let fee = if created.fee > 0.0 {
                created.fee
            } else {
                engine.config.deposit_fee_fixed as f64
                    + amount as f64 * engine.config.deposit_fee_percent
            };
            let provider_id = created
                .raw
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let status = if created.status == "unknown" {
                "pending".to_string()
            } else {
                created.status.clone()
            };

            let mut metadata = json!({
                "method": method,
                "fee": fee,
                "checkout": created.checkout,
            });
            if !provider_id.is_empty() {
                metadata["id"] = json!(provider_id);
            }
            engine
                .store
                .update_deposit_status(&deposit_ref, &status, Some(metadata))
                .await?;

            Ok(format!(
                "Top up {} dibuat (ref {}).\n{}\nBiaya admin: {}",
                rupiah(amount as f64),
                deposit_ref,
                checkout_instructions(&created.checkout),
                rupiah(fee)
            ))
        }
        Err(e) if e.is_transient() => Ok(format!(
            "Permintaan top up tercatat (ref {deposit_ref}), tapi sistem sedang sibuk. Coba cek statusnya sebentar lagi."
        )),
        Err(e @ WarungError::InvalidCredential(_)) => Err(e),
        Err(WarungError::InvalidDepositMethod(_)) => {
            engine
                .store
                .update_deposit_status(&deposit_ref, "failed", None)
                .await?;
            Ok(format!("Metode deposit {method} sedang tidak tersedia."))
        }
        Err(e @ WarungError::InsufficientBalance(_)) => Err(e),
        Err(_) => {
            engine
                .store
                .update_deposit_status(&deposit_ref, "failed", None)
                .await?;
            Ok(format!("Top up gagal diproses. Ref: {deposit_ref}"))
        }
    }
}

/// `deposit_status`: read-through to the provider, advancing the local
/// row when the remote moved.
pub(crate) async fn status(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let reference = slots
        .get_str("ref")
        .or_else(|| session.last_deposit_ref.clone());
    let Some(reference) = reference else {
        return Ok("Sebutkan referensi depositnya ya.".to_string());
    };

    let deposit = match engine.store.get_deposit_by_ref(&reference).await {
        Ok(deposit) => deposit,
        Err(WarungError::NotFound(_)) => {
            return Ok(format!("Deposit {reference} tidak ditemukan."))
        }
        Err(e) => return Err(e),
    };
    if deposit.user_id != user.id {
        return Ok(format!("Deposit {reference} tidak ditemukan."));
    }

    let mut current = deposit.status.clone();
    if !warung_core::is_terminal_status(&current) {
        if let Some(provider_id) = metadata_str(&deposit.metadata, "id") {
            match engine.atlantic.deposit_status(&provider_id).await {
                Ok(remote) if remote.status != current && remote.status != "unknown" => {
                    engine
                        .store
                        .update_deposit_status(&reference, &remote.status, None)
                        .await?;
                    current = remote.status;
                }
                Ok(_) => {}
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
        }
    }

    Ok(format!(
        "Deposit {} ({}): {}.",
        reference,
        rupiah(deposit.amount as f64),
        status_label(&current)
    ))
}

/// `deposit_cancel`: cancel upstream, then mark the local row failed.
pub(crate) async fn cancel(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let reference = slots
        .get_str("ref")
        .or_else(|| session.last_deposit_ref.clone());
    let Some(reference) = reference else {
        return Ok("Sebutkan referensi deposit yang mau dibatalkan.".to_string());
    };

    let deposit = match engine.store.get_deposit_by_ref(&reference).await {
        Ok(deposit) => deposit,
        Err(WarungError::NotFound(_)) => {
            return Ok(format!("Deposit {reference} tidak ditemukan."))
        }
        Err(e) => return Err(e),
    };
    if deposit.user_id != user.id {
        return Ok(format!("Deposit {reference} tidak ditemukan."));
    }
    if warung_core::is_terminal_status(&deposit.status) {
        return Ok(format!(
            "Deposit {} sudah {}.",
            reference,
            status_label(&deposit.status)
        ));
    }

    let Some(provider_id) = metadata_str(&deposit.metadata, "id") else {
        return Ok(format!(
            "Deposit {reference} belum bisa dibatalkan, coba lagi sebentar."
        ));
    };

    engine.atlantic.cancel_deposit(&provider_id).await?;
    engine
        .store
        .update_deposit_status(&reference, "failed", None)
        .await?;
    Ok(format!("Deposit {reference} dibatalkan."))
}

fn metadata_str(metadata: &Option<serde_json::Value>, key: &str) -> Option<String> {
    metadata
        .as_ref()?
        .get(key)?
        .as_str()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}
