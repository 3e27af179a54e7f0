// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settlement reconciliation.
//!
//! Consumes authenticated webhook events and couples them to local
//! durable state. Idempotent by reference: duplicate events find the row
//! already terminal (or the dependent orders already advanced) and do
//! nothing. Events may arrive before the local insert landed; deposit
//! references embed the user id, so the row can be created on the spot.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use warung_atlantic::{
    Client as AtlanticClient, CreatePrepaidRequest, EventKind, WebhookEvent, WebhookProcessor,
};
use warung_core::{is_terminal_status, normalize_tx_status, WarungError};
use warung_storage::{Deposit, Store};
use warung_transport::Transport;

use crate::refs::user_id_from_ref;
use crate::replies::{rupiah, status_label};

/// Applies settlement events to orders and deposits and notifies users on
/// terminal transitions.
pub struct SettlementProcessor {
    store: Arc<Store>,
    atlantic: Arc<AtlanticClient>,
    transport: Arc<dyn Transport>,
}

impl SettlementProcessor {
    pub fn new(
        store: Arc<Store>,
        atlantic: Arc<AtlanticClient>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            store,
            atlantic,
            transport,
        }
    }

    async fn handle_deposit_event(
        &self,
        reference: &str,
        status: &str,
        payload: &Map<String, Value>,
    ) -> Result<(), WarungError> {
        match self
            .store
            .update_deposit_status(reference, status, None)
            .await
        {
            Ok(()) => {}
            Err(WarungError::NotFound(_)) => {
                // The event raced ahead of (or outlived) the local insert.
                let Some(user_id) = user_id_from_ref(reference) else {
                    warn!(reference, "deposit event for unknown reference, skipping");
                    return Ok(());
                };
                let amount = field_f64(payload, &["nominal", "amount"]) as i64;
                let method = field_str(payload, &["metode", "method"]);
                match self
                    .store
                    .insert_deposit(Deposit {
                        id: String::new(),
                        user_id: user_id.to_string(),
                        deposit_ref: reference.to_string(),
                        method,
                        amount,
                        status: status.to_string(),
                        metadata: Some(Value::Object(payload.clone())),
                        created_at: String::new(),
                        updated_at: String::new(),
                    })
                    .await
                {
                    Ok(_) => info!(reference, status, "deposit upserted from event"),
                    // Concurrent insert won the race; the update path will
                    // run on redelivery.
                    Err(WarungError::Conflict(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            Err(WarungError::Validation(_)) => {
                debug!(reference, "deposit already terminal, duplicate event");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        match status {
            "success" => {
                self.advance_awaiting_orders(reference).await?;
                self.notify_deposit(reference, status).await;
            }
            "failed" => {
                self.fail_awaiting_orders(reference).await?;
                self.notify_deposit(reference, status).await;
            }
            _ => {}
        }
        Ok(())
    }

    /// Move every order waiting on this deposit to `pending` and fire its
    /// upstream create exactly once. Moving the status first is what
    /// makes a duplicate event a no-op: it finds no awaiting orders.
    async fn advance_awaiting_orders(&self, deposit_ref: &str) -> Result<(), WarungError> {
        let awaiting = self.store.list_orders_awaiting_deposit(deposit_ref).await?;
        for order in awaiting {
            self.store
                .update_order_status(&order.order_ref, "pending", None)
                .await?;

            let (code, target) = order_code_target(&order.metadata, &order.product_code);
            info!(
                order_ref = %order.order_ref,
                deposit_ref,
                code = %code,
                "deposit settled, creating backed order"
            );

            let result = self
                .atlantic
                .create_prepaid(CreatePrepaidRequest {
                    product_code: code,
                    customer_id: target,
                    ref_id: order.order_ref.clone(),
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
                    let mut metadata = order.metadata.clone().unwrap_or_else(|| {
                        Value::Object(Map::new())
                    });
                    metadata["message"] = Value::String(tx.message.clone());
                    if !tx.sn.is_empty() {
                        metadata["sn"] = Value::String(tx.sn.clone());
                    }
                    self.store
                        .update_order_status(&order.order_ref, &status, Some(metadata))
                        .await?;
                    if is_terminal_status(&status) {
                        self.notify_order(&order.user_id, &order.order_ref, &status, &tx.sn)
                            .await;
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(order_ref = %order.order_ref, error = %e, "create deferred, order stays pending");
                }
                Err(e) => {
                    warn!(order_ref = %order.order_ref, error = %e, "create rejected");
                    self.store
                        .update_order_status(&order.order_ref, "failed", None)
                        .await?;
                    self.notify_order(&order.user_id, &order.order_ref, "failed", "")
                        .await;
                }
            }
        }
        Ok(())
    }

    /// A dead deposit takes its dependent orders with it.
    async fn fail_awaiting_orders(&self, deposit_ref: &str) -> Result<(), WarungError> {
        let awaiting = self.store.list_orders_awaiting_deposit(deposit_ref).await?;
        for order in awaiting {
            self.store
                .update_order_status(&order.order_ref, "failed", None)
                .await?;
            self.notify_order(&order.user_id, &order.order_ref, "failed", "")
                .await;
        }
        Ok(())
    }

    async fn handle_order_event(
        &self,
        reference: &str,
        status: &str,
        payload: &Map<String, Value>,
    ) -> Result<(), WarungError> {
        match self.store.update_order_status(reference, status, None).await {
            Ok(()) => {
                if is_terminal_status(status) {
                    if let Ok(order) = self.store.get_order_by_ref(reference).await {
                        let sn = field_str(payload, &["sn", "serial_number"]);
                        self.notify_order(&order.user_id, reference, status, &sn).await;
                    }
                }
                Ok(())
            }
            Err(WarungError::Validation(_)) => {
                debug!(reference, "order already terminal, duplicate event");
                Ok(())
            }
            Err(WarungError::NotFound(_)) => {
                // Orders are always created locally before the provider
                // learns the reference; an unknown one is foreign noise.
                warn!(reference, "order event for unknown reference");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn notify_deposit(&self, reference: &str, status: &str) {
        let Ok(deposit) = self.store.get_deposit_by_ref(reference).await else {
            return;
        };
        let text = match status {
            "success" => format!(
                "Top up {} sudah masuk. Terima kasih!",
                rupiah(deposit.amount as f64)
            ),
            _ => format!(
                "Top up {} {} (ref {}).",
                rupiah(deposit.amount as f64),
                status_label(status),
                reference
            ),
        };
        self.send_to_user(&deposit.user_id, &text).await;
    }

    async fn notify_order(&self, user_id: &str, reference: &str, status: &str, sn: &str) {
        let sn_line = if sn.is_empty() {
            String::new()
        } else {
            format!("\nSN: {sn}")
        };
        let text = format!(
            "Pesanan {} {}.{}",
            reference,
            status_label(status),
            sn_line
        );
        self.send_to_user(user_id, &text).await;
    }

    /// Notification failures are logged, never fatal: a retried webhook
    /// delivery would double-apply side effects otherwise.
    async fn send_to_user(&self, user_id: &str, text: &str) {
        let user = match self.store.get_user_by_id(user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id, error = %e, "cannot notify, user lookup failed");
                return;
            }
        };
        let to = user.wa_jid.unwrap_or(user.wa_id);
        if let Err(e) = self.transport.send_text(&to, text).await {
            warn!(user_id, error = %e, "settlement notification failed");
        }
    }
}

#[async_trait]
impl WebhookProcessor for SettlementProcessor {
    async fn handle_event(&self, event: WebhookEvent) -> Result<(), WarungError> {
        let payload = event.payload_json()?;
        let Some(map) = payload.as_object() else {
            return Err(WarungError::Validation(
                "webhook payload is not an object".into(),
            ));
        };

        let reference = field_str(map, &["reff_id", "ref_id", "reference"]);
        if reference.is_empty() {
            return Err(WarungError::Validation(
                "webhook payload missing reference".into(),
            ));
        }
        let status = normalize_tx_status(&field_str(map, &["status", "state"]));

        info!(kind = event.kind.as_str(), reference = %reference, status = %status, "settlement event");

        match event.kind {
            EventKind::Deposit => self.handle_deposit_event(&reference, &status, map).await,
            EventKind::Transaksi | EventKind::TransaksiPascabayar | EventKind::Transfer => {
                self.handle_order_event(&reference, &status, map).await
            }
            EventKind::Unknown => {
                warn!(raw_kind = %event.raw_kind, "unknown settlement event kind, ignoring");
                Ok(())
            }
        }
    }
}

fn field_str(map: &Map<String, Value>, keys: &[&str]) -> String {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

fn field_f64(map: &Map<String, Value>, keys: &[&str]) -> f64 {
    for key in keys {
        match map.get(*key) {
            Some(Value::Number(n)) => return n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => {
                if let Ok(parsed) = s.trim().replace(',', "").parse() {
                    return parsed;
                }
            }
            _ => {}
        }
    }
    0.0
}

fn order_code_target(metadata: &Option<Value>, fallback_code: &str) -> (String, String) {
    let code = metadata
        .as_ref()
        .and_then(|m| m.get("code"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback_code)
        .to_string();
    let target = metadata
        .as_ref()
        .and_then(|m| m.get("target"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    (code, target)
}
