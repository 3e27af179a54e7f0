// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postpaid bills: inquiry, then confirmation-gated payment.

use serde_json::json;

use warung_atlantic::{BillInquiryRequest, BillPaymentRequest};
use warung_core::WarungError;
use warung_gemini::Slots;
use warung_storage::{Order, User};

use crate::refs::new_order_ref;
use crate::replies::{self, rupiah, status_label};
use crate::session::{PendingAction, PendingBill, PendingConfirmation, SessionState};
use crate::Engine;

/// `bill_check`: inquire the bill and park it in the session for a
/// follow-up `bill_pay`.
pub(crate) async fn check(
    engine: &Engine,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let Some(code) = slots.get_str("code") else {
        return Ok("Produk tagihannya apa? Contoh: \"cek tagihan PLN 123456\".".to_string());
    };
    let Some(target) = slots.get_str("target") else {
        return Ok("Nomor pelanggannya berapa?".to_string());
    };

    let inquiry = engine
        .atlantic
        .bill_inquiry(BillInquiryRequest {
            product_code: code.clone(),
            customer_id: target.clone(),
            ref_id: String::new(),
        })
        .await?;

    let total = inquiry.amount + inquiry.fee;
    let info = if inquiry.message.is_empty() {
        serde_json::to_string(&inquiry.bill_info).unwrap_or_default()
    } else {
        inquiry.message.clone()
    };

    session.pending_bill = Some(PendingBill {
        ref_id: inquiry.ref_id.clone(),
        code: code.clone(),
        target: target.clone(),
        amount: inquiry.amount,
        fee: inquiry.fee,
        info: info.clone(),
    });

    Ok(format!(
        "Tagihan {code} untuk {target}:\nTotal: {} (termasuk admin {})\n{}\n\nKetik \"bayar\" untuk melunasi.",
        rupiah(total),
        rupiah(inquiry.fee),
        info
    ))
}

/// `bill_pay`: requires a recent inquiry; the payment itself is gated
/// behind a confirmation.
pub(crate) fn start_payment(session: &mut SessionState) -> Result<String, WarungError> {
    let Some(bill) = session.pending_bill.clone() else {
        return Ok("Cek dulu tagihannya ya, misalnya \"cek tagihan PLN 123456\".".to_string());
    };

    let preview = format!(
        "Konfirmasi pembayaran tagihan:\n{} untuk {}\nTotal: {}\n\n{}",
        bill.code,
        bill.target,
        rupiah(bill.amount + bill.fee),
        replies::CONFIRM_HINT
    );
    session.pending = Some(PendingConfirmation::new(PendingAction::BillPay {
        ref_id: bill.ref_id,
        code: bill.code,
        target: bill.target,
        amount: bill.amount,
        fee: bill.fee,
    }));
    Ok(preview)
}

/// Confirmed bill payment.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn execute(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    ref_id: String,
    code: String,
    target: String,
    amount: f64,
    fee: f64,
) -> Result<String, WarungError> {
    // The inquiry reference keys the payment upstream; fall back to a
    // fresh one when the provider did not issue any.
    let order_ref = if ref_id.is_empty() {
        new_order_ref(&user.id)
    } else {
        ref_id
    };

    match engine
        .store
        .insert_order(Order {
            id: String::new(),
            user_id: user.id.clone(),
            order_ref: order_ref.clone(),
            product_code: code.clone(),
            amount: (amount + fee) as i64,
            fee: fee as i64,
            status: "pending".to_string(),
            metadata: Some(json!({"type": "bill", "target": target, "amount": amount, "fee": fee})),
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
    {
        Ok(_) => {}
        Err(WarungError::Conflict(_)) => {
            let existing = engine.store.get_order_by_ref(&order_ref).await?;
            return Ok(format!(
                "Tagihan {} sudah pernah diproses, statusnya {}.",
                order_ref,
                status_label(&existing.status)
            ));
        }
        Err(e) => return Err(e),
    }
    session.last_order_ref = Some(order_ref.clone());
    session.pending_bill = None;

    let payment = engine
        .atlantic
        .bill_payment(BillPaymentRequest {
            ref_id: order_ref.clone(),
            product_code: code.clone(),
            customer_id: target.clone(),
        })
        .await;

    match payment {
        Ok(result) => {
            let status = if result.status == "unknown" {
                "pending".to_string()
            } else {
                result.status.clone()
            };
            engine
                .store
                .update_order_status(
                    &order_ref,
                    &status,
                    Some(json!({
                        "type": "bill",
                        "target": target,
                        "amount": amount,
                        "fee": fee,
                        "message": result.message,
                    })),
                )
                .await?;
            Ok(match status.as_str() {
                "success" => format!("Tagihan {code} untuk {target} lunas. Ref: {order_ref}"),
                "failed" => format!(
                    "Pembayaran tagihan gagal: {}\nRef: {order_ref}",
                    result.message
                ),
                _ => format!("Pembayaran tagihan sedang diproses. Ref: {order_ref}"),
            })
        }
        Err(e) if e.is_transient() => Ok(format!(
            "Pembayaran tercatat (ref {order_ref}), status menyusul. Cek lagi sebentar ya."
        )),
        Err(e @ WarungError::InsufficientBalance(_))
        | Err(e @ WarungError::InvalidCredential(_)) => Err(e),
        Err(_) => {
            engine
                .store
                .update_order_status(&order_ref, "failed", None)
                .await?;
            Ok(format!("Pembayaran tagihan gagal diproses. Ref: {order_ref}"))
        }
    }
}
