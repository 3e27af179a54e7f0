// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User upsert and lookup.

use rusqlite::params;
use uuid::Uuid;

use warung_core::WarungError;

use crate::database::{map_tr_err, Database};
use crate::models::{User, UserProfile};

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        wa_id: row.get(1)?,
        wa_jid: row.get(2)?,
        display_name: row.get(3)?,
        phone_number: row.get(4)?,
        language_preference: row.get(5)?,
        timezone: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert or update a user keyed by messenger id. `None` profile fields
/// preserve the stored values.
pub async fn upsert_user_by_wa(db: &Database, profile: UserProfile) -> Result<User, WarungError> {
    let id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                "INSERT INTO users (id, wa_id, wa_jid, display_name, phone_number,
                                    language_preference, timezone, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5,
                         COALESCE(?6, 'id-ID'), COALESCE(?7, 'Asia/Jakarta'),
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT (wa_id) DO UPDATE SET
                     wa_jid = excluded.wa_jid,
                     display_name = COALESCE(excluded.display_name, users.display_name),
                     phone_number = COALESCE(excluded.phone_number, users.phone_number),
                     language_preference = COALESCE(excluded.language_preference, users.language_preference),
                     timezone = COALESCE(excluded.timezone, users.timezone),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 RETURNING id, wa_id, wa_jid, display_name, phone_number,
                           language_preference, timezone, created_at, updated_at",
                params![
                    id,
                    profile.wa_id,
                    profile.wa_jid,
                    profile.display_name,
                    profile.phone_number,
                    profile.language_preference,
                    profile.timezone,
                ],
                row_to_user,
            )?)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a user by internal id.
pub async fn get_user_by_id(db: &Database, id: &str) -> Result<User, WarungError> {
    let id = id.to_string();
    let lookup = id.clone();
    db.connection()
        .call(move |conn| {
            Ok(conn.query_row(
                "SELECT id, wa_id, wa_jid, display_name, phone_number,
                        language_preference, timezone, created_at, updated_at
                 FROM users WHERE id = ?1 LIMIT 1",
                params![lookup],
                row_to_user,
            )?)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => {
                WarungError::NotFound(format!("user {id}"))
            }
            other => map_tr_err(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let (db, _dir) = open_db().await;

        let created = upsert_user_by_wa(
            &db,
            UserProfile {
                wa_id: "628123".into(),
                wa_jid: Some("628123@s.whatsapp.net".into()),
                display_name: Some("Budi".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(created.language_preference, "id-ID");
        assert_eq!(created.timezone, "Asia/Jakarta");

        // Second upsert with a new JID keeps the display name.
        let updated = upsert_user_by_wa(
            &db,
            UserProfile {
                wa_id: "628123".into(),
                wa_jid: Some("628123.1@s.whatsapp.net".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.display_name.as_deref(), Some("Budi"));
        assert_eq!(updated.wa_jid.as_deref(), Some("628123.1@s.whatsapp.net"));
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let (db, _dir) = open_db().await;
        let err = get_user_by_id(&db, "missing").await.unwrap_err();
        assert!(matches!(err, WarungError::NotFound(_)));
    }
}
