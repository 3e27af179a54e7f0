// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deposit persistence. Same lifecycle shape as orders, keyed by
//! `deposit_ref` and carrying the payment method.

use rusqlite::params;
use uuid::Uuid;

use warung_core::{is_terminal_status, WarungError};

use crate::database::{map_tr_err, Database};
use crate::models::Deposit;
use crate::queries::{metadata_from_text, metadata_to_text};

fn row_to_deposit(row: &rusqlite::Row<'_>) -> rusqlite::Result<Deposit> {
    Ok(Deposit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        deposit_ref: row.get(2)?,
        method: row.get(3)?,
        amount: row.get(4)?,
        status: row.get(5)?,
        metadata: metadata_from_text(row.get(6)?),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const DEPOSIT_COLUMNS: &str =
    "id, user_id, deposit_ref, method, amount, status, metadata, created_at, updated_at";

/// Insert a new deposit. A duplicate `deposit_ref` returns `Conflict`.
pub async fn insert_deposit(db: &Database, deposit: Deposit) -> Result<Deposit, WarungError> {
    let id = Uuid::new_v4().to_string();
    let metadata = metadata_to_text(deposit.metadata.as_ref());
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                &format!(
                    "INSERT INTO deposits (id, user_id, deposit_ref, method, amount, status,
                                           metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     RETURNING {DEPOSIT_COLUMNS}"
                ),
                params![
                    id,
                    deposit.user_id,
                    deposit.deposit_ref,
                    deposit.method,
                    deposit.amount,
                    deposit.status,
                    metadata,
                ],
                row_to_deposit,
            )?)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a deposit by reference.
pub async fn get_deposit_by_ref(db: &Database, deposit_ref: &str) -> Result<Deposit, WarungError> {
    let lookup = deposit_ref.to_string();
    let deposit_ref = deposit_ref.to_string();
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                &format!("SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE deposit_ref = ?1 LIMIT 1"),
                params![lookup],
                row_to_deposit,
            )?)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => {
                WarungError::NotFound(format!("deposit {deposit_ref}"))
            }
            other => map_tr_err(other),
        })
}

/// Update status and metadata of a deposit. Same metadata and terminal
/// policies as orders.
pub async fn update_deposit_status(
    db: &Database,
    deposit_ref: &str,
    status: &str,
    metadata: Option<serde_json::Value>,
) -> Result<(), WarungError> {
    let deposit_ref_owned = deposit_ref.to_string();
    let status = status.to_string();
    let metadata = metadata_to_text(metadata.as_ref());
    let outcome: Option<String> = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deposits
                 SET status = ?2,
                     metadata = COALESCE(?3, metadata),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE deposit_ref = ?1
                   AND status NOT IN ('success', 'failed')",
                params![deposit_ref_owned, status, metadata],
            )?;
            if changed > 0 {
                return Ok(None);
            }
            let existing: Option<String> = conn
                .query_row(
                    "SELECT status FROM deposits WHERE deposit_ref = ?1 LIMIT 1",
                    params![deposit_ref_owned],
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
            "deposit {deposit_ref} already terminal ({current})"
        ))),
        Some(_) => Err(WarungError::NotFound(format!("deposit {deposit_ref}"))),
    }
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
        let path = dir.path().join("deposits.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let user = upsert_user_by_wa(
            &db,
            UserProfile {
                wa_id: "628002".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (db, user.id, dir)
    }

    fn deposit(user_id: &str, deposit_ref: &str, status: &str) -> Deposit {
        Deposit {
            id: String::new(),
            user_id: user_id.to_string(),
            deposit_ref: deposit_ref.to_string(),
            method: "QRIS".into(),
            amount: 50000,
            status: status.to_string(),
            metadata: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn insert_get_update_round_trip() {
        let (db, user_id, _dir) = open_db_with_user().await;
        let mut new_deposit = deposit(&user_id, "D-100", "pending");
        new_deposit.metadata = Some(json!({"qr_string": "000201..."}));
        insert_deposit(&db, new_deposit).await.unwrap();

        update_deposit_status(&db, "D-100", "success", None)
            .await
            .unwrap();
        let fetched = get_deposit_by_ref(&db, "D-100").await.unwrap();
        assert_eq!(fetched.status, "success");
        assert_eq!(fetched.metadata.unwrap()["qr_string"], "000201...");
    }

    #[tokio::test]
    async fn duplicate_ref_is_conflict() {
        let (db, user_id, _dir) = open_db_with_user().await;
        insert_deposit(&db, deposit(&user_id, "D-101", "pending"))
            .await
            .unwrap();
        let err = insert_deposit(&db, deposit(&user_id, "D-101", "pending"))
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::Conflict(_)));
    }

    #[tokio::test]
    async fn terminal_deposit_rejects_regression() {
        let (db, user_id, _dir) = open_db_with_user().await;
        insert_deposit(&db, deposit(&user_id, "D-102", "success"))
            .await
            .unwrap();
        let err = update_deposit_status(&db, "D-102", "pending", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::Validation(_)));
    }
}
