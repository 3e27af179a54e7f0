// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `warung catalog` command implementation.
//!
//! Fetches the prabayar and pascabayar price lists (forcing a refresh)
//! and writes a merged JSON catalog to disk. A pascabayar failure
//! degrades to a warning so a partial catalog still lands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use warung_atlantic::{Client as AtlanticClient, ClientConfig, PriceItem};
use warung_config::WarungConfig;
use warung_core::{CatalogType, WarungError};

pub async fn run(config: WarungConfig, out: &Path) -> Result<(), WarungError> {
    let atlantic = Arc::new(AtlanticClient::new(
        ClientConfig {
            base_url: config.atlantic.base_url.clone(),
            api_key: config.atlantic.api_key.clone(),
            timeout: Duration::from_secs(config.atlantic.timeout_secs),
            price_ttl: Duration::from_secs(config.cache.price_ttl_secs),
        },
        None,
    )?);

    let prabayar = atlantic.price_list(CatalogType::Prabayar, true).await?;
    let pascabayar = match atlantic.price_list(CatalogType::Pascabayar, true).await {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "pascabayar price list fetch failed, continuing with prabayar only");
            Vec::new()
        }
    };

    let entries: Vec<serde_json::Value> = prabayar
        .iter()
        .map(|item| entry(item, CatalogType::Prabayar))
        .chain(
            pascabayar
                .iter()
                .map(|item| entry(item, CatalogType::Pascabayar)),
        )
        .collect();

    let data = serde_json::to_vec_pretty(&entries)
        .map_err(|e| WarungError::Internal(format!("marshal catalog: {e}")))?;
    std::fs::write(out, data).map_err(|e| {
        WarungError::Internal(format!("write catalog file {}: {e}", out.display()))
    })?;

    info!(path = %out.display(), total_products = entries.len(), "product catalog saved");
    println!("wrote {} products to {}", entries.len(), out.display());
    Ok(())
}

fn entry(item: &PriceItem, catalog_type: CatalogType) -> serde_json::Value {
    json!({
        "code": item.code,
        "name": item.name,
        "category": item.category,
        "provider": item.provider,
        "nominal": item.nominal,
        "price": item.price,
        "status": item.status,
        "type": catalog_type.as_str(),
    })
}
