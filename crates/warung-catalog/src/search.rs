// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ranked free-text search over price items.
//!
//! Tokens score per field (code 5, name 4, category 3, provider 3) and an
//! item matches only when at least half of the significant tokens hit.
//! When the query parses as an amount, matches are re-ranked by proximity
//! to it.

use std::collections::HashSet;
use std::sync::LazyLock;

use warung_atlantic::PriceItem;

use crate::amount::{parse_amount, parse_nominal_amount};

const TOP_N: usize = 10;

/// Conversational fillers (Indonesian + English) that carry no search
/// signal, including the amount suffixes handled separately.
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "yang", "dan", "di", "ke", "dari", "ada", "ini", "itu", "untuk", "dengan", "saya", "mau",
        "bisa", "jual", "cari", "halo", "hai", "hi", "hey", "bang", "mas", "kak", "min", "gan",
        "bro", "tolong", "dong", "ya", "nih", "deh", "list", "harga", "kirim", "kirimkan",
        "dibawah", "diatas", "sekitar", "the", "is", "a", "an", "of", "ribu", "rb", "juta", "jt",
    ]
    .into_iter()
    .collect()
});

/// Rank catalog items against a free-text query with an optional provider
/// hint. `full` disables the top-10 cap.
///
/// An empty query and hint browses the whole catalog sorted by category
/// then price. A hint with zero token matches falls back to substring
/// matching the provider alone.
pub fn filter_by_query(
    items: &[PriceItem],
    query: &str,
    provider: &str,
    full: bool,
) -> Vec<PriceItem> {
    let provider = provider.trim().to_lowercase();
    let query = query.trim().to_lowercase();

    if query.is_empty() && provider.is_empty() {
        let mut browse = items.to_vec();
        browse.sort_by(|a, b| {
            let left = a.category.to_lowercase();
            let right = b.category.to_lowercase();
            left.cmp(&right)
                .then(a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
        });
        return cap(browse, full);
    }

    let tokens = tokenize_query(&query);

    let mut scored: Vec<(i32, PriceItem)> = items
        .iter()
        .filter_map(|item| {
            let score = match_score(item, &tokens, &provider);
            (score > 0).then(|| (score, item.clone()))
        })
        .collect();

    if scored.is_empty() && !provider.is_empty() {
        scored = items
            .iter()
            .filter(|item| item.provider.to_lowercase().contains(&provider))
            .map(|item| (1, item.clone()))
            .collect();
    }

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then(a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut matches: Vec<PriceItem> = scored.into_iter().map(|(_, item)| item).collect();
    if let Ok(amount) = parse_amount(&query) {
        if amount > 0 {
            matches = refine_by_amount(matches, amount);
        }
    }
    cap(matches, full)
}

/// Items available within `budget`, price ascending, at most 10.
pub fn filter_by_budget(items: &[PriceItem], budget: i64) -> Vec<PriceItem> {
    let mut affordable: Vec<PriceItem> = items
        .iter()
        .filter(|item| item.price <= budget as f64 && item.status.eq_ignore_ascii_case("available"))
        .cloned()
        .collect();
    affordable.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));
    affordable.truncate(TOP_N);
    affordable
}

fn cap(items: Vec<PriceItem>, full: bool) -> Vec<PriceItem> {
    if full {
        return items;
    }
    let mut items = items;
    items.truncate(TOP_N);
    items
}

fn match_score(item: &PriceItem, tokens: &[String], provider: &str) -> i32 {
    let name = item.name.to_lowercase();
    let code = item.code.to_lowercase();
    let category = item.category.to_lowercase();
    let item_provider = item.provider.to_lowercase();

    if !provider.is_empty() && !item_provider.contains(provider) {
        return 0;
    }

    let significant = filter_stop_words(tokens);
    let significant: &[String] = if significant.is_empty() {
        tokens
    } else {
        &significant
    };

    let mut score = 0;
    let mut matched = 0;
    for token in significant {
        if token.is_empty() {
            continue;
        }
        let mut token_score = 0;
        if name.contains(token.as_str()) {
            token_score += 4;
        }
        if code.contains(token.as_str()) {
            token_score += 5;
        }
        if category.contains(token.as_str()) {
            token_score += 3;
        }
        if item_provider.contains(token.as_str()) {
            token_score += 3;
        }
        if token_score > 0 {
            matched += 1;
        }
        score += token_score;
    }

    // At least half of the significant tokens must match, minimum one.
    let min_required = std::cmp::max(1, (significant.len() + 1) / 2);
    if matched < min_required {
        return 0;
    }
    score
}

fn filter_stop_words(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
        .cloned()
        .collect()
}

/// Split the query on whitespace (with `.`/`,` treated as spaces) and
/// expand mixed alphanumeric tokens with their digits-only subtoken, so
/// "20k" also matches "20".
fn tokenize_query(query: &str) -> Vec<String> {
    if query.is_empty() {
        return Vec::new();
    }
    let normalized = query.replace(['.', ','], " ");
    let mut expanded = Vec::new();
    for raw in normalized.split_whitespace() {
        let token = raw.trim().to_lowercase();
        if token.is_empty() {
            continue;
        }
        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        let has_alpha = token.chars().any(|c| c.is_ascii_lowercase());
        expanded.push(token.clone());
        if has_digit && has_alpha {
            let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                expanded.push(digits);
            }
        }
    }
    expanded
}

/// Stable re-rank by distance between the parsed amount and the item's
/// price or nominal, whichever is closer.
fn refine_by_amount(items: Vec<PriceItem>, amount: i64) -> Vec<PriceItem> {
    if items.len() <= 1 || amount <= 0 {
        return items;
    }
    let mut refined = items;
    refined.sort_by(|a, b| {
        let left = amount_diff(a, amount);
        let right = amount_diff(b, amount);
        left.cmp(&right)
            .then(a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
    });
    refined
}

fn amount_diff(item: &PriceItem, amount: i64) -> i64 {
    let mut best = (item.price as i64 - amount).abs();
    let nominal = parse_nominal_amount(&item.nominal);
    if nominal > 0 {
        best = best.min((nominal - amount).abs());
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: &str, name: &str, category: &str, provider: &str, price: f64) -> PriceItem {
        serde_json::from_value(serde_json::json!({
            "code": code,
            "name": name,
            "category": category,
            "provider": provider,
            "price": price,
            "status": "available",
        }))
        .unwrap()
    }

    fn sample_catalog() -> Vec<PriceItem> {
        vec![
            item("TSEL10", "Telkomsel 10.000", "Pulsa", "Telkomsel", 10500.0),
            item("TSEL20", "Telkomsel 20.000", "Pulsa", "Telkomsel", 20150.0),
            item("XL10", "XL 10.000", "Pulsa", "XL", 10800.0),
            item("VIU1", "VIU Premium 1 Bulan", "Streaming", "VIU", 25000.0),
            item("VIU3", "VIU Premium 3 Bulan", "Streaming", "VIU", 65000.0),
        ]
    }

    #[test]
    fn query_matches_provider_and_ranks_by_score() {
        let results = filter_by_query(&sample_catalog(), "viu", "", false);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].code, "VIU1"); // same score, lower price first
        assert_eq!(results[1].code, "VIU3");
    }

    #[test]
    fn amount_in_query_refines_ranking() {
        let results = filter_by_query(&sample_catalog(), "pulsa telkomsel 20rb", "", false);
        assert!(!results.is_empty());
        assert_eq!(results[0].code, "TSEL20");
    }

    #[test]
    fn provider_hint_gates_matches() {
        let results = filter_by_query(&sample_catalog(), "pulsa 10rb", "xl", false);
        assert!(!results.is_empty());
        assert!(results.iter().all(|i| i.provider == "XL"));
    }

    #[test]
    fn provider_hint_alone_falls_back_to_substring() {
        let results = filter_by_query(&sample_catalog(), "zzz", "telkomsel", false);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|i| i.provider == "Telkomsel"));
    }

    #[test]
    fn stop_words_do_not_disqualify() {
        // Every token except "viu" is a stop word; it alone must carry
        // the match.
        let results = filter_by_query(&sample_catalog(), "mau yang viu dong", "", false);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].code, "VIU1");
    }

    #[test]
    fn empty_query_browses_by_category_then_price() {
        let results = filter_by_query(&sample_catalog(), "", "", true);
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].category, "Pulsa");
        assert!(results[0].price <= results[1].price);
        assert_eq!(results[4].category, "Streaming");
    }

    #[test]
    fn empty_catalog_returns_empty() {
        assert!(filter_by_query(&[], "viu", "", false).is_empty());
        assert!(filter_by_budget(&[], 5000).is_empty());
    }

    #[test]
    fn unmatched_query_returns_empty() {
        assert!(filter_by_query(&sample_catalog(), "zzz", "", false).is_empty());
    }

    #[test]
    fn budget_filter_respects_status_price_and_cap() {
        let mut catalog = sample_catalog();
        // An affordable but unavailable item must be excluded.
        let mut off = item("OFF5", "Mati 5.000", "Pulsa", "Telkomsel", 5000.0);
        off.status = "unavailable".to_string();
        catalog.push(off);
        for i in 0..12 {
            catalog.push(item(
                &format!("CHEAP{i}"),
                &format!("Murah {i}"),
                "Pulsa",
                "Lokal",
                1000.0 + i as f64,
            ));
        }

        let results = filter_by_budget(&catalog, 11_000);
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|i| i.price <= 11_000.0));
        assert!(results.iter().all(|i| i.status == "available"));
        assert!(results.windows(2).all(|w| w[0].price <= w[1].price));
    }

    #[test]
    fn mixed_token_expands_digits() {
        let tokens = tokenize_query("tsel20 20k");
        assert!(tokens.contains(&"tsel20".to_string()));
        assert!(tokens.contains(&"20".to_string()));
        assert!(tokens.contains(&"20k".to_string()));
    }
}
