// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order persistence.
//!
//! `order_ref` is unique; duplicate inserts surface as `Conflict`.
//! Status transitions are monotonic: rows in a terminal state reject
//! further updates.

use rusqlite::params;
use uuid::Uuid;

use warung_core::{is_terminal_status, WarungError};

use crate::database::{map_tr_err, Database};
use crate::models::Order;
use crate::queries::{metadata_from_text, metadata_to_text};

fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        order_ref: row.get(2)?,
        product_code: row.get(3)?,
        amount: row.get(4)?,
        fee: row.get(5)?,
        status: row.get(6)?,
        metadata: metadata_from_text(row.get(7)?),
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const ORDER_COLUMNS: &str = "id, user_id, order_ref, product_code, amount, fee, status, \
                             metadata, created_at, updated_at";

/// Insert a new order. A duplicate `order_ref` returns `Conflict`.
pub async fn insert_order(db: &Database, order: Order) -> Result<Order, WarungError> {
    let id = Uuid::new_v4().to_string();
    let metadata = metadata_to_text(order.metadata.as_ref());
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                &format!(
                    "INSERT INTO orders (id, user_id, order_ref, product_code, amount, fee,
                                         status, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     RETURNING {ORDER_COLUMNS}"
                ),
                params![
                    id,
                    order.user_id,
                    order.order_ref,
                    order.product_code,
                    order.amount,
                    order.fee,
                    order.status,
                    metadata,
                ],
                row_to_order,
            )?)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch an order by reference.
pub async fn get_order_by_ref(db: &Database, order_ref: &str) -> Result<Order, WarungError> {
    let lookup = order_ref.to_string();
    let order_ref = order_ref.to_string();
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_ref = ?1 LIMIT 1"),
                params![lookup],
                row_to_order,
            )?)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => {
                WarungError::NotFound(format!("order {order_ref}"))
            }
            other => map_tr_err(other),
        })
}

/// Update status and metadata of an order.
///
/// Metadata policy: replace when supplied, preserve when `None`.
/// Updates to a row already in a terminal state are rejected.
pub async fn update_order_status(
    db: &Database,
    order_ref: &str,
    status: &str,
    metadata: Option<serde_json::Value>,
) -> Result<(), WarungError> {
    let order_ref_owned = order_ref.to_string();
    let status = status.to_string();
    let metadata = metadata_to_text(metadata.as_ref());
    let outcome: Option<String> = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE orders
                 SET status = ?2,
                     metadata = COALESCE(?3, metadata),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE order_ref = ?1
                   AND status NOT IN ('success', 'failed')",
                params![order_ref_owned, status, metadata],
            )?;
            if changed > 0 {
                return Ok(None);
            }
            // Distinguish a missing row from a terminal one.
            let existing: Option<String> = conn
                .query_row(
                    "SELECT status FROM orders WHERE order_ref = ?1 LIMIT 1",
                    params![order_ref_owned],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(existing.or(Some(String::new())))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        None => Ok(()),
        Some(current) if is_terminal_status(&current) => Err(WarungError::Validation(format!(
            "order {order_ref} already terminal ({current})"
        ))),
        Some(_) => Err(WarungError::NotFound(format!("order {order_ref}"))),
    }
}

/// Orders created before their backing deposit settled, matched through
/// the `deposit_ref` stored in metadata.
pub async fn list_orders_awaiting_deposit(
    db: &Database,
    deposit_ref: &str,
) -> Result<Vec<Order>, WarungError> {
    let deposit_ref = deposit_ref.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders
                 WHERE json_extract(metadata, '$.deposit_ref') = ?1
                   AND status = 'awaiting_payment'
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![deposit_ref], row_to_order)?;
            let mut orders = Vec::new();
            for row in rows {
                orders.push(row?);
            }
            Ok(orders)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;
    use crate::queries::users::upsert_user_by_wa;
    use serde_json::json;
    use tempfile::tempdir;

    async fn open_db_with_user() -> (Database, String, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let user = upsert_user_by_wa(
            &db,
            UserProfile {
                wa_id: "628001".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (db, user.id, dir)
    }

    fn order(user_id: &str, order_ref: &str, status: &str) -> Order {
        Order {
            id: String::new(),
            user_id: user_id.to_string(),
            order_ref: order_ref.to_string(),
            product_code: "TSEL20".into(),
            amount: 20000,
            fee: 0,
            status: status.to_string(),
            metadata: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let (db, user_id, _dir) = open_db_with_user().await;
        let mut new_order = order(&user_id, "u:1:aaaa", "pending");
        new_order.metadata = Some(json!({"target": "0812"}));
        let inserted = insert_order(&db, new_order).await.unwrap();
        assert!(!inserted.id.is_empty());

        let fetched = get_order_by_ref(&db, "u:1:aaaa").await.unwrap();
        assert_eq!(fetched.product_code, "TSEL20");
        assert_eq!(fetched.metadata.unwrap()["target"], "0812");
    }

    #[tokio::test]
    async fn duplicate_ref_is_conflict() {
        let (db, user_id, _dir) = open_db_with_user().await;
        insert_order(&db, order(&user_id, "u:2:dup", "pending"))
            .await
            .unwrap();
        let err = insert_order(&db, order(&user_id, "u:2:dup", "pending"))
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn terminal_status_rejects_updates() {
        let (db, user_id, _dir) = open_db_with_user().await;
        insert_order(&db, order(&user_id, "u:3:term", "pending"))
            .await
            .unwrap();

        update_order_status(&db, "u:3:term", "success", Some(json!({"sn": "SN123"})))
            .await
            .unwrap();

        let err = update_order_status(&db, "u:3:term", "failed", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::Validation(_)), "got {err:?}");

        let current = get_order_by_ref(&db, "u:3:term").await.unwrap();
        assert_eq!(current.status, "success");
        assert_eq!(current.metadata.unwrap()["sn"], "SN123");
    }

    #[tokio::test]
    async fn update_preserves_metadata_when_none() {
        let (db, user_id, _dir) = open_db_with_user().await;
        let mut new_order = order(&user_id, "u:4:meta", "pending");
        new_order.metadata = Some(json!({"deposit_ref": "D-9"}));
        insert_order(&db, new_order).await.unwrap();

        update_order_status(&db, "u:4:meta", "processing", None)
            .await
            .unwrap();
        let fetched = get_order_by_ref(&db, "u:4:meta").await.unwrap();
        assert_eq!(fetched.status, "processing");
        assert_eq!(fetched.metadata.unwrap()["deposit_ref"], "D-9");
    }

    #[tokio::test]
    async fn update_missing_order_is_not_found() {
        let (db, _user_id, _dir) = open_db_with_user().await;
        let err = update_order_status(&db, "missing", "pending", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::NotFound(_)));
    }

    #[tokio::test]
    async fn awaiting_deposit_query_matches_metadata() {
        let (db, user_id, _dir) = open_db_with_user().await;

        let mut waiting = order(&user_id, "u:5:w1", "awaiting_payment");
        waiting.metadata = Some(json!({"deposit_ref": "D-1"}));
        insert_order(&db, waiting).await.unwrap();

        let mut other_ref = order(&user_id, "u:5:w2", "awaiting_payment");
        other_ref.metadata = Some(json!({"deposit_ref": "D-2"}));
        insert_order(&db, other_ref).await.unwrap();

        let mut settled = order(&user_id, "u:5:w3", "pending");
        settled.metadata = Some(json!({"deposit_ref": "D-1"}));
        insert_order(&db, settled).await.unwrap();

        let awaiting = list_orders_awaiting_deposit(&db, "D-1").await.unwrap();
        assert_eq!(awaiting.len(), 1);
        assert_eq!(awaiting[0].order_ref, "u:5:w1");
    }
}
