// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message audit log.

use rusqlite::params;
use uuid::Uuid;

use warung_core::WarungError;

use crate::database::{map_tr_err, Database};
use crate::models::{now_rfc3339, MessageRecord};

/// Insert one message record.
pub async fn insert_message(db: &Database, msg: MessageRecord) -> Result<(), WarungError> {
    let id = Uuid::new_v4().to_string();
    let raw = msg.raw_payload.as_ref().map(|v| v.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, user_id, direction, message_type, content,
                                       media_url, raw_payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    msg.user_id,
                    msg.direction,
                    msg.message_type,
                    msg.content,
                    msg.media_url,
                    raw,
                    if msg.created_at.is_empty() {
                        now_rfc3339()
                    } else {
                        msg.created_at
                    },
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Latest messages for a user, newest first. A non-positive limit falls
/// back to 10.
pub async fn list_recent_messages(
    db: &Database,
    user_id: &str,
    limit: i64,
) -> Result<Vec<MessageRecord>, WarungError> {
    let user_id = user_id.to_string();
    let limit = if limit <= 0 { 10 } else { limit };
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT direction, message_type, content, created_at
                 FROM messages WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                Ok(MessageRecord {
                    user_id: user_id.clone(),
                    direction: row.get(0)?,
                    message_type: row.get(1)?,
                    content: row.get(2)?,
                    media_url: None,
                    raw_payload: None,
                    created_at: row.get(3)?,
                })
            })?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}
