// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential pool persistence.
//!
//! Keys are synced from an ordered config list; list position becomes
//! priority. A resync clears any cooldown so rotated-in keys are usable
//! immediately.

use rusqlite::params;
use uuid::Uuid;

use warung_core::WarungError;

use crate::database::{map_tr_err, Database};
use crate::models::ApiKey;

fn row_to_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: row.get(0)?,
        provider: row.get(1)?,
        value: row.get(2)?,
        priority: row.get(3)?,
        cooldown_until: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const KEY_COLUMNS: &str = "id, provider, value, priority, cooldown_until, created_at, updated_at";

/// Upsert the provided secrets with `priority = index`, clearing cooldowns.
pub async fn sync_keys(db: &Database, provider: &str, keys: &[String]) -> Result<(), WarungError> {
    if keys.is_empty() {
        return Err(WarungError::Config(format!(
            "no {provider} keys provided"
        )));
    }
    let provider = provider.to_string();
    let keys = keys.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for (priority, value) in keys.iter().enumerate() {
                tx.execute(
                    "INSERT INTO api_keys (id, provider, value, priority, cooldown_until)
                     VALUES (?1, ?2, ?3, ?4, NULL)
                     ON CONFLICT (provider, value) DO UPDATE SET
                         priority = excluded.priority,
                         cooldown_until = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    params![
                        Uuid::new_v4().to_string(),
                        provider,
                        value,
                        priority as i64
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Keys whose cooldown is null or already elapsed, priority ascending.
pub async fn list_eligible_keys(
    db: &Database,
    provider: &str,
    now: &str,
) -> Result<Vec<ApiKey>, WarungError> {
    let provider = provider.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {KEY_COLUMNS} FROM api_keys
                 WHERE provider = ?1
                   AND (cooldown_until IS NULL OR cooldown_until <= ?2)
                 ORDER BY priority ASC"
            ))?;
            let rows = stmt.query_map(params![provider, now], row_to_key)?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        })
        .await
        .map_err(map_tr_err)
}

/// All keys for a provider, priority ascending, regardless of cooldown.
pub async fn list_keys(db: &Database, provider: &str) -> Result<Vec<ApiKey>, WarungError> {
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {KEY_COLUMNS} FROM api_keys WHERE provider = ?1 ORDER BY priority ASC"
            ))?;
            let rows = stmt.query_map(params![provider], row_to_key)?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        })
        .await
        .map_err(map_tr_err)
}

/// Put a key on cooldown until the given RFC 3339 instant.
pub async fn set_cooldown(db: &Database, id: &str, until: &str) -> Result<(), WarungError> {
    let id_owned = id.to_string();
    let until = until.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE api_keys
                 SET cooldown_until = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id_owned, until],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(WarungError::NotFound(format!("api key {id}")));
    }
    Ok(())
}

/// Clear the cooldown of one key.
pub async fn clear_cooldown(db: &Database, id: &str) -> Result<(), WarungError> {
    let id_owned = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE api_keys
                 SET cooldown_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id_owned],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(WarungError::NotFound(format!("api key {id}")));
    }
    Ok(())
}

/// Clear cooldowns that have already elapsed. Returns the number of keys
/// re-enabled. Used by the optional pool sweeper.
pub async fn clear_expired_cooldowns(
    db: &Database,
    provider: &str,
    now: &str,
) -> Result<usize, WarungError> {
    let provider = provider.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE api_keys
                 SET cooldown_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE provider = ?1
                   AND cooldown_until IS NOT NULL
                   AND cooldown_until <= ?2",
                params![provider, now],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}
