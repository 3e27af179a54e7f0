// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grouped presentation of price items.
//!
//! Items group by category in first-seen order; within a category prices
//! ascend. The abbreviated form shows the first five entries per category
//! with an ellipsis marker when truncated.

use warung_atlantic::PriceItem;

const PER_CATEGORY: usize = 5;

/// Group items by category, preserving first-seen category order and
/// sorting each group by price ascending. Blank categories fall under
/// "Lainnya".
pub fn group_by_category(items: &[PriceItem]) -> Vec<(String, Vec<PriceItem>)> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: Vec<Vec<PriceItem>> = Vec::new();

    for item in items {
        let category = {
            let trimmed = item.category.trim();
            if trimmed.is_empty() {
                "Lainnya".to_string()
            } else {
                trimmed.to_string()
            }
        };
        match order.iter().position(|c| *c == category) {
            Some(index) => grouped[index].push(item.clone()),
            None => {
                order.push(category);
                grouped.push(vec![item.clone()]);
            }
        }
    }

    for group in &mut grouped {
        group.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));
    }

    order.into_iter().zip(grouped).collect()
}

/// Render a grouped product listing. The abbreviated form (`full =
/// false`) caps each category at five entries plus an ellipsis line.
pub fn format_price_list(items: &[PriceItem], full: bool) -> String {
    let grouped = group_by_category(items);
    if grouped.is_empty() {
        return "Belum ada produk yang cocok.".to_string();
    }

    let mut out = String::new();
    if full {
        out.push_str("Daftar produk lengkap:\n");
    } else {
        out.push_str("Daftar produk:\n");
    }

    for (category, entries) in &grouped {
        out.push_str("- ");
        out.push_str(category);
        out.push_str(":\n");

        let limit = if full {
            entries.len()
        } else {
            entries.len().min(PER_CATEGORY)
        };
        for item in &entries[..limit] {
            out.push_str(&format!(
                "  - {} ({}) - Rp{:.0} [{}]\n",
                item.name,
                item.code,
                item.price,
                item.status.to_uppercase()
            ));
        }
        if entries.len() > limit {
            out.push_str("  - ...\n");
        }
    }

    out.trim_end().to_string()
}

/// Upper-cased category digest with a closing hint line.
pub fn format_catalog_summary(items: &[PriceItem]) -> String {
    let grouped = group_by_category(items);
    if grouped.is_empty() {
        return "Belum ada produk yang tersedia.".to_string();
    }

    let mut out = String::from("Daftar produk lengkap:\n");
    for (category, entries) in &grouped {
        out.push_str(&category.to_uppercase());
        out.push_str(":\n");

        let limit = entries.len().min(PER_CATEGORY);
        for item in &entries[..limit] {
            out.push_str(&format!(
                "  - {} ({}) - Rp{:.0} [{}]\n",
                item.name,
                item.code,
                item.price,
                item.status.to_uppercase()
            ));
        }
        if entries.len() > limit {
            out.push_str("  - ...\n");
        }
    }
    out.push_str("\nKetik nama kategori atau provider untuk daftar lebih rinci.");
    out.trim_end().to_string()
}
