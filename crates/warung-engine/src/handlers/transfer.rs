// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bank transfers: account verification first, then confirmation-gated
//! creation.

use serde_json::json;

use warung_atlantic::TransferRequest;
use warung_core::WarungError;
use warung_gemini::Slots;
use warung_storage::{Order, User};

use crate::refs::new_order_ref;
use crate::replies::{self, rupiah, status_label};
use crate::session::{PendingAction, PendingConfirmation, SessionState, VerifiedAccount};
use crate::Engine;

/// `transfer_check`: verify the destination account and remember it.
pub(crate) async fn check(
    engine: &Engine,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let Some(bank_code) = slots.get_str("bank_code") else {
        return Ok("Bank tujuannya apa? Contoh: \"cek rekening BCA 1234567890\".".to_string());
    };
    let Some(account) = slots.get_str("account") else {
        return Ok("Nomor rekeningnya berapa?".to_string());
    };

    let verified = engine
        .atlantic
        .transfer_check_account(&bank_code, &account)
        .await?;
    if verified.owner_name.is_empty() {
        return Ok(format!(
            "Rekening {account} di bank {bank_code} tidak ditemukan."
        ));
    }

    session.verified_account = Some(VerifiedAccount {
        bank_code: verified.bank_code.clone(),
        account_no: verified.account_no.clone(),
        owner_name: verified.owner_name.clone(),
    });

    Ok(format!(
        "Rekening {} ({}) atas nama {}. Sebutkan nominal transfernya untuk lanjut.",
        verified.account_no, bank_code, verified.owner_name
    ))
}

/// `transfer_create`: requires a prior account check; gated behind
/// confirmation.
pub(crate) async fn start(
    engine: &Engine,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let Some(account) = session.verified_account.clone() else {
        return Ok(
            "Cek dulu rekening tujuannya ya, misalnya \"cek rekening BCA 1234567890\"."
                .to_string(),
        );
    };

    // A differing bank/account in the new utterance needs a re-check.
    if let Some(requested) = slots.get_str("account") {
        if requested != account.account_no {
            session.verified_account = None;
            return check(engine, session, slots).await;
        }
    }

    let Some(amount) = slots.get_i64("amount").filter(|a| *a > 0) else {
        return Ok("Nominal transfernya berapa?".to_string());
    };

    let preview = format!(
        "Konfirmasi transfer:\n{} ({})\nAtas nama: {}\nNominal: {}\n\n{}",
        account.account_no,
        account.bank_code,
        account.owner_name,
        rupiah(amount as f64),
        replies::CONFIRM_HINT
    );
    session.pending = Some(PendingConfirmation::new(PendingAction::TransferCreate {
        bank_code: account.bank_code,
        account_no: account.account_no,
        owner_name: account.owner_name,
        amount,
    }));
    Ok(preview)
}

/// Confirmed transfer: persist as an order, create upstream, report.
pub(crate) async fn execute(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    bank_code: String,
    account_no: String,
    owner_name: String,
    amount: i64,
) -> Result<String, WarungError> {
    let order_ref = new_order_ref(&user.id);
    let metadata = json!({
        "type": "transfer",
        "bank_code": bank_code,
        "account_no": account_no,
        "owner_name": owner_name,
    });

    match engine
        .store
        .insert_order(Order {
            id: String::new(),
            user_id: user.id.clone(),
            order_ref: order_ref.clone(),
            product_code: "TRANSFER".to_string(),
            amount,
            fee: 0,
            status: "pending".to_string(),
            metadata: Some(metadata.clone()),
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
    {
        Ok(_) => {}
        Err(WarungError::Conflict(_)) => {
            let existing = engine.store.get_order_by_ref(&order_ref).await?;
            return Ok(format!(
                "Transfer {} sudah tercatat, statusnya {}.",
                order_ref,
                status_label(&existing.status)
            ));
        }
        Err(e) => return Err(e),
    }
    session.last_order_ref = Some(order_ref.clone());

    let result = engine
        .atlantic
        .create_transfer(TransferRequest {
            bank_code,
            account_name: owner_name.clone(),
            account_no: account_no.clone(),
            amount: amount as f64,
            ref_id: order_ref.clone(),
            ..Default::default()
        })
        .await;

    match result {
        Ok(transfer) => {
            let status = if transfer.status == "unknown" {
                "pending".to_string()
            } else {
                transfer.status.clone()
            };
            let mut updated = metadata;
            updated["message"] = json!(transfer.message);
            if let Some(id) = transfer.raw.get("id").and_then(|v| v.as_str()) {
                updated["id"] = json!(id);
            }
            engine
                .store
                .update_order_status(&order_ref, &status, Some(updated))
                .await?;
            session.verified_account = None;

            Ok(match status.as_str() {
                "success" => format!(
                    "Transfer {} ke {} ({}) berhasil. Ref: {}",
                    rupiah(amount as f64),
                    account_no,
                    owner_name,
                    order_ref
                ),
                "failed" => format!(
                    "Transfer gagal: {}\nRef: {}",
                    transfer.message, order_ref
                ),
                _ => format!(
                    "Transfer {} ke {} sedang diproses. Ref: {}",
                    rupiah(amount as f64),
                    account_no,
                    order_ref
                ),
            })
        }
        Err(e) if e.is_transient() => Ok(format!(
            "Transfer tercatat (ref {order_ref}), status menyusul. Cek lagi sebentar ya."
        )),
        Err(e @ WarungError::InsufficientBalance(_))
        | Err(e @ WarungError::InvalidCredential(_)) => Err(e),
        Err(_) => {
            engine
                .store
                .update_order_status(&order_ref, "failed", None)
                .await?;
            Ok(format!("Transfer gagal diproses. Ref: {order_ref}"))
        }
    }
}
