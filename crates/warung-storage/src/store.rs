// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialect-agnostic persistence facade.
//!
//! Wraps a [`Database`] handle and delegates to the typed query modules.
//! Higher layers depend on this facade only.

use serde_json::Value;

use warung_core::WarungError;

use crate::database::Database;
use crate::models::{ApiKey, Deposit, MessageRecord, Order, User, UserBalance, UserProfile};
use crate::queries;

/// SQLite-backed persistence facade.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open the database at `path`, running migrations.
    pub async fn open(path: &str) -> Result<Self, WarungError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Checkpoint and close the database.
    pub async fn close(&self) -> Result<(), WarungError> {
        self.db.close().await
    }

    // --- Users ---

    pub async fn upsert_user_by_wa(&self, profile: UserProfile) -> Result<User, WarungError> {
        queries::users::upsert_user_by_wa(&self.db, profile).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<User, WarungError> {
        queries::users::get_user_by_id(&self.db, id).await
    }

    // --- Messages ---

    pub async fn insert_message(&self, msg: MessageRecord) -> Result<(), WarungError> {
        queries::messages::insert_message(&self.db, msg).await
    }

    pub async fn list_recent_messages(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, WarungError> {
        queries::messages::list_recent_messages(&self.db, user_id, limit).await
    }

    // --- Orders ---

    pub async fn insert_order(&self, order: Order) -> Result<Order, WarungError> {
        queries::orders::insert_order(&self.db, order).await
    }

    pub async fn get_order_by_ref(&self, order_ref: &str) -> Result<Order, WarungError> {
        queries::orders::get_order_by_ref(&self.db, order_ref).await
    }

    pub async fn update_order_status(
        &self,
        order_ref: &str,
        status: &str,
        metadata: Option<Value>,
    ) -> Result<(), WarungError> {
        queries::orders::update_order_status(&self.db, order_ref, status, metadata).await
    }

    pub async fn list_orders_awaiting_deposit(
        &self,
        deposit_ref: &str,
    ) -> Result<Vec<Order>, WarungError> {
        queries::orders::list_orders_awaiting_deposit(&self.db, deposit_ref).await
    }

    // --- Deposits ---

    pub async fn insert_deposit(&self, deposit: Deposit) -> Result<Deposit, WarungError> {
        queries::deposits::insert_deposit(&self.db, deposit).await
    }

    pub async fn get_deposit_by_ref(&self, deposit_ref: &str) -> Result<Deposit, WarungError> {
        queries::deposits::get_deposit_by_ref(&self.db, deposit_ref).await
    }

    pub async fn update_deposit_status(
        &self,
        deposit_ref: &str,
        status: &str,
        metadata: Option<Value>,
    ) -> Result<(), WarungError> {
        queries::deposits::update_deposit_status(&self.db, deposit_ref, status, metadata).await
    }

    // --- Balances ---

    pub async fn get_user_balance(&self, user_id: &str) -> Result<UserBalance, WarungError> {
        queries::balances::get_user_balance(&self.db, user_id).await
    }

    // --- API keys ---

    pub async fn sync_keys(&self, provider: &str, keys: &[String]) -> Result<(), WarungError> {
        queries::api_keys::sync_keys(&self.db, provider, keys).await
    }

    pub async fn list_eligible_keys(
        &self,
        provider: &str,
        now: &str,
    ) -> Result<Vec<ApiKey>, WarungError> {
        queries::api_keys::list_eligible_keys(&self.db, provider, now).await
    }

    pub async fn list_keys(&self, provider: &str) -> Result<Vec<ApiKey>, WarungError> {
        queries::api_keys::list_keys(&self.db, provider).await
    }

    pub async fn set_cooldown(&self, id: &str, until: &str) -> Result<(), WarungError> {
        queries::api_keys::set_cooldown(&self.db, id, until).await
    }

    pub async fn clear_cooldown(&self, id: &str) -> Result<(), WarungError> {
        queries::api_keys::clear_cooldown(&self.db, id).await
    }

    pub async fn clear_expired_cooldowns(
        &self,
        provider: &str,
        now: &str,
    ) -> Result<usize, WarungError> {
        queries::api_keys::clear_expired_cooldowns(&self.db, provider, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn facade_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let store = Store::open(path.to_str().unwrap()).await.unwrap();

        let user = store
            .upsert_user_by_wa(UserProfile {
                wa_id: "628999".into(),
                display_name: Some("Sari".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .insert_message(MessageRecord {
                user_id: user.id.clone(),
                direction: "inbound".into(),
                message_type: "text".into(),
                content: Some("cek saldo".into()),
                media_url: None,
                raw_payload: None,
                created_at: String::new(),
            })
            .await
            .unwrap();

        let recent = store.list_recent_messages(&user.id, 5).await.unwrap();
        assert_eq!(recent.len(), 1);

        let balance = store.get_user_balance(&user.id).await.unwrap();
        assert_eq!(balance.saldo_confirmed, 0);

        store.close().await.unwrap();
    }
}
