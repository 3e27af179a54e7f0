// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prepaid top-up: product resolution, confirmation, and order placement.

use serde_json::json;
use tracing::info;

use warung_atlantic::{CreatePrepaidRequest, PriceItem};
use warung_catalog::{filter_by_query, format_price_list};
use warung_core::{CatalogType, WarungError};
use warung_gemini::Slots;
use warung_storage::{Order, User};

use crate::refs::new_order_ref;
use crate::replies::{self, rupiah, status_label};
use crate::session::{PendingAction, PendingConfirmation, SessionState};
use crate::Engine;

/// `topup_create`: resolve the product, then gate creation behind a
/// confirmation.
pub(crate) async fn start(
    engine: &Engine,
    session: &mut SessionState,
    slots: &Slots,
    utterance: &str,
) -> Result<String, WarungError> {
    let items = engine.atlantic.price_list(CatalogType::Prabayar, false).await?;

    let candidates: Vec<PriceItem> = match slots.get_str("code") {
        Some(code) => items
            .iter()
            .filter(|item| item.code.eq_ignore_ascii_case(&code))
            .cloned()
            .collect(),
        None => {
            let query = slots
                .get_str("query")
                .unwrap_or_else(|| utterance.to_string());
            let provider = slots.get_str("provider").unwrap_or_default();
            filter_by_query(&items, &query, &provider, false)
        }
    };

    if candidates.is_empty() {
        let browse = filter_by_query(&items, "", "", false);
        if browse.is_empty() {
            return Ok(replies::NO_MATCH.to_string());
        }
        return Ok(format!(
            "{}\nMungkin salah satu dari ini?\n{}",
            replies::NO_MATCH,
            format_price_list(&browse, false)
        ));
    }

    if candidates.len() > 1 {
        session.shortlist = candidates.clone();
        return Ok(format!(
            "Ada beberapa produk yang cocok. Sebutkan kodenya ya:\n{}",
            format_price_list(&candidates, false)
        ));
    }

    let item = candidates[0].clone();
    if item.status != "available" {
        return Ok(format!("{} ({}) sedang tidak tersedia.", item.name, item.code));
    }

    let Some(target) = slots.get_str("target") else {
        session.shortlist = vec![item.clone()];
        return Ok(format!(
            "{} ({}) harganya {}. Nomor tujuannya berapa?",
            item.name,
            item.code,
            rupiah(item.price)
        ));
    };

    let amount = slots.get_i64("amount").unwrap_or(0);
    let preview = format!(
        "Konfirmasi pembelian:\n{} ({})\nHarga: {}\nTujuan: {}\n\n{}",
        item.name,
        item.code,
        rupiah(item.price),
        target,
        replies::CONFIRM_HINT
    );
    session.pending = Some(PendingConfirmation::new(PendingAction::Topup {
        code: item.code,
        name: item.name,
        price: item.price,
        target,
        amount,
    }));
    Ok(preview)
}

/// Confirmed top-up: persist the order, fire the upstream create once,
/// and report the outcome.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn execute(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    code: String,
    name: String,
    price: f64,
    target: String,
    amount: i64,
) -> Result<String, WarungError> {
    let order_ref = new_order_ref(&user.id);
    place_order(engine, user, session, order_ref, code, name, price, target, amount).await
}

/// Insert-then-create with the Conflict fallback: a duplicate reference
/// switches to a status report instead of re-creating.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn place_order(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    order_ref: String,
    code: String,
    name: String,
    price: f64,
    target: String,
    amount: i64,
) -> Result<String, WarungError> {
    let base_metadata = json!({
        "code": code,
        "target": target,
        "price": price,
    });

    match engine
        .store
        .insert_order(Order {
            id: String::new(),
            user_id: user.id.clone(),
            order_ref: order_ref.clone(),
            product_code: code.clone(),
            amount: price as i64,
            fee: 0,
            status: "pending".to_string(),
            metadata: Some(base_metadata.clone()),
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
    {
        Ok(_) => {}
        Err(WarungError::Conflict(_)) => {
            let existing = engine.store.get_order_by_ref(&order_ref).await?;
            return Ok(format!(
                "Pesanan {} sudah tercatat, statusnya {}.",
                order_ref,
                status_label(&existing.status)
            ));
        }
        Err(e) => return Err(e),
    }
    session.last_order_ref = Some(order_ref.clone());

    info!(order_ref = %order_ref, code = %code, "placing prepaid order");
    let result = engine
        .atlantic
        .create_prepaid(CreatePrepaidRequest {
            product_code: code.clone(),
            customer_id: target.clone(),
            ref_id: order_ref.clone(),
            amount,
            ..Default::default()
        })
        .await;

    match result {
        Ok(tx) => {
            let status = if tx.status == "unknown" {
                "pending".to_string()
            } else {
                tx.status.clone()
            };
            let mut metadata = base_metadata;
            metadata["message"] = json!(tx.message);
            if !tx.sn.is_empty() {
                metadata["sn"] = json!(tx.sn);
            }
            engine
                .store
                .update_order_status(&order_ref, &status, Some(metadata))
                .await?;

            Ok(match status.as_str() {
                "success" => {
                    let sn_line = if tx.sn.is_empty() {
                        String::new()
                    } else {
                        format!("\nSN: {}", tx.sn)
                    };
                    format!(
                        "Pembelian {} untuk {} berhasil!{}\nRef: {}",
                        name, target, sn_line, order_ref
                    )
                }
                "failed" => format!(
                    "Pembelian {} gagal: {}\nRef: {}",
                    name,
                    if tx.message.is_empty() { "ditolak provider" } else { &tx.message },
                    order_ref
                ),
                _ => format!(
                    "Pembelian {} sedang diproses.\nRef: {}\nKetik \"status pesanan\" untuk cek.",
                    name, order_ref
                ),
            })
        }
        Err(e) if e.is_transient() => {
            // Order stays pending; settlement or a status check resolves it.
            Ok(format!(
                "Pesanan tercatat (ref {}), tapi sistem sedang sibuk. Cek statusnya sebentar lagi ya.",
                order_ref
            ))
        }
        Err(e @ WarungError::InsufficientBalance(_)) | Err(e @ WarungError::InvalidCredential(_)) => {
            Err(e)
        }
        Err(e) => {
            let message = e.to_string();
            engine
                .store
                .update_order_status(&order_ref, "failed", None)
                .await?;
            info!(order_ref = %order_ref, error = %message, "prepaid create rejected");
            Ok(format!("Pembelian {name} gagal diproses. Ref: {order_ref}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use warung_atlantic::{Client as AtlanticClient, ClientConfig};
    use warung_gemini::{NluClient, NluConfig};
    use warung_keypool::{KeyPool, DEFAULT_COOLDOWN};
    use warung_storage::{Store, UserProfile};
    use warung_transport::LogTransport;

    use crate::session::SessionState;
    use crate::{Engine, EngineConfig};

    async fn engine_without_upstream() -> (Engine, Arc<Store>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("topup.db");
        let store = Arc::new(Store::open(db.to_str().unwrap()).await.unwrap());
        store.sync_keys("gemini", &["k1".to_string()]).await.unwrap();

        let atlantic = Arc::new(
            AtlanticClient::new(
                ClientConfig {
                    // Nothing listens here; any upstream call errors out,
                    // which the duplicate-reference path must never reach.
                    base_url: "http://127.0.0.1:1".to_string(),
                    api_key: "key".into(),
                    timeout: Duration::from_millis(200),
                    price_ttl: Duration::from_secs(60),
                },
                None,
            )
            .unwrap(),
        );
        let pool = Arc::new(KeyPool::new(Arc::clone(&store), "gemini", DEFAULT_COOLDOWN));
        let nlu = Arc::new(NluClient::new(pool, NluConfig::default()).unwrap());

        let engine = Engine::new(
            Arc::clone(&store),
            atlantic,
            nlu,
            Arc::new(LogTransport),
            EngineConfig::default(),
        );
        (engine, store, dir)
    }

    #[tokio::test]
    async fn duplicate_reference_reports_existing_status() {
        let (engine, store, _dir) = engine_without_upstream().await;
        let user = store
            .upsert_user_by_wa(UserProfile {
                wa_id: "628777".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .insert_order(warung_storage::Order {
                id: String::new(),
                user_id: user.id.clone(),
                order_ref: "dup-ref".into(),
                product_code: "TSEL20".into(),
                amount: 20150,
                fee: 0,
                status: "processing".into(),
                metadata: Some(json!({"target": "0812"})),
                created_at: String::new(),
                updated_at: String::new(),
            })
            .await
            .unwrap();

        let mut session = SessionState::default();
        let reply = place_order(
            &engine,
            &user,
            &mut session,
            "dup-ref".to_string(),
            "TSEL20".to_string(),
            "Telkomsel 20.000".to_string(),
            20150.0,
            "0812".to_string(),
            0,
        )
        .await
        .unwrap();

        assert!(reply.contains("sudah tercatat"), "got: {reply}");
        assert!(reply.contains("diproses"));

        let existing = store.get_order_by_ref("dup-ref").await.unwrap();
        assert_eq!(existing.status, "processing");
    }
}
