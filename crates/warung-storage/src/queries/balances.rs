// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Computed balance snapshots.
//!
//! The service keeps no ledger of truth; the balance is derived from the
//! deposit and order tables on demand.

use rusqlite::params;

use warung_core::WarungError;

use crate::database::{map_tr_err, Database};
use crate::models::UserBalance;

/// Aggregate a user's balance from deposits minus orders.
pub async fn get_user_balance(db: &Database, user_id: &str) -> Result<UserBalance, WarungError> {
    let user_id_owned = user_id.to_string();
    let user_id_err = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let wa_id: String = conn.query_row(
                "SELECT wa_id FROM users WHERE id = ?1 LIMIT 1",
                params![user_id_owned],
                |row| row.get(0),
            )?;

            let (dep_confirmed, dep_pending, dep_total): (i64, i64, i64) = conn.query_row(
                "SELECT
                     COALESCE(SUM(CASE WHEN status = 'success' THEN amount ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN status IN ('pending', 'processing') THEN amount ELSE 0 END), 0),
                     COALESCE(SUM(amount), 0)
                 FROM deposits WHERE user_id = ?1",
                params![user_id_owned],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let (spent_confirmed, spent_pending, spent_total): (i64, i64, i64) = conn.query_row(
                "SELECT
                     COALESCE(SUM(CASE WHEN status = 'success' THEN amount ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN status IN ('pending', 'processing', 'awaiting_payment') THEN amount ELSE 0 END), 0),
                     COALESCE(SUM(amount), 0)
                 FROM orders WHERE user_id = ?1",
                params![user_id_owned],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            Ok(UserBalance {
                user_id: user_id_owned.clone(),
                wa_id,
                deposited_confirmed: dep_confirmed,
                deposited_pending: dep_pending,
                total_deposited: dep_total,
                spent_confirmed,
                spent_pending,
                total_spent: spent_total,
                saldo_confirmed: dep_confirmed - spent_confirmed,
            })
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => {
                WarungError::NotFound(format!("user {user_id_err}"))
            }
            other => map_tr_err(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Deposit, Order, UserProfile};
    use crate::queries::deposits::insert_deposit;
    use crate::queries::orders::insert_order;
    use crate::queries::users::upsert_user_by_wa;
    use tempfile::tempdir;

    #[tokio::test]
    async fn balance_subtracts_successful_orders() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("balances.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let user = upsert_user_by_wa(
            &db,
            UserProfile {
                wa_id: "628003".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        for (deposit_ref, amount, status) in
            [("D-1", 100_000, "success"), ("D-2", 50_000, "pending")]
        {
            insert_deposit(
                &db,
                Deposit {
                    id: String::new(),
                    user_id: user.id.clone(),
                    deposit_ref: deposit_ref.into(),
                    method: "QRIS".into(),
                    amount,
                    status: status.into(),
                    metadata: None,
                    created_at: String::new(),
                    updated_at: String::new(),
                },
            )
            .await
            .unwrap();
        }

        for (order_ref, amount, status) in
            [("O-1", 20_000, "success"), ("O-2", 15_000, "awaiting_payment")]
        {
            insert_order(
                &db,
                Order {
                    id: String::new(),
                    user_id: user.id.clone(),
                    order_ref: order_ref.into(),
                    product_code: "TSEL20".into(),
                    amount,
                    fee: 0,
                    status: status.into(),
                    metadata: None,
                    created_at: String::new(),
                    updated_at: String::new(),
                },
            )
            .await
            .unwrap();
        }

        let balance = get_user_balance(&db, &user.id).await.unwrap();
        assert_eq!(balance.deposited_confirmed, 100_000);
        assert_eq!(balance.deposited_pending, 50_000);
        assert_eq!(balance.spent_confirmed, 20_000);
        assert_eq!(balance.spent_pending, 15_000);
        assert_eq!(balance.saldo_confirmed, 80_000);
    }
}
