// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog browsing: price lookup and budget filtering.

use warung_catalog::{
    filter_by_budget, filter_by_query, format_catalog_summary, format_price_list, parse_amount,
};
use warung_core::{CatalogType, WarungError};
use warung_gemini::Slots;

use crate::replies;
use crate::session::SessionState;
use crate::Engine;

/// `price_lookup`: search the catalog with the query and provider slots.
pub(crate) async fn price_lookup(
    engine: &Engine,
    session: &mut SessionState,
    slots: &Slots,
) -> Result<String, WarungError> {
    let catalog_type = slots
        .get_str("type")
        .and_then(|t| CatalogType::parse(&t).ok())
        .unwrap_or(CatalogType::Prabayar);
    let query = slots.get_str("query").unwrap_or_default();
    let provider = slots.get_str("provider").unwrap_or_default();

    let items = engine.atlantic.price_list(catalog_type, false).await?;

    // No query at all: show the category digest instead of a flat list.
    if query.is_empty() && provider.is_empty() {
        return Ok(format_catalog_summary(&items));
    }

    let matches = filter_by_query(&items, &query, &provider, false);
    if matches.is_empty() {
        return Ok(replies::NO_MATCH.to_string());
    }
    session.shortlist = matches.clone();
    Ok(format_price_list(&matches, false))
}

/// `budget_filter`: list available items at or under the stated budget.
pub(crate) async fn budget_filter(
    engine: &Engine,
    session: &mut SessionState,
    slots: &Slots,
    utterance: &str,
) -> Result<String, WarungError> {
    let budget = slots
        .get_i64("budget")
        .or_else(|| parse_amount(utterance).ok())
        .filter(|b| *b > 0);
    let Some(budget) = budget else {
        return Ok("Budget-nya berapa? Contoh: \"saya cuma punya 10rb\".".to_string());
    };
    session.last_amount = Some(budget);

    let items = engine.atlantic.price_list(CatalogType::Prabayar, false).await?;
    let affordable = filter_by_budget(&items, budget);
    if affordable.is_empty() {
        return Ok(format!(
            "Belum ada produk tersedia di bawah {}.",
            replies::rupiah(budget as f64)
        ));
    }
    session.shortlist = affordable.clone();
    Ok(format!(
        "Produk sesuai budget {}:\n{}",
        replies::rupiah(budget as f64),
        format_price_list(&affordable, false)
    ))
}
