// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog index: ranked search over the upstream price list, budget
//! filtering, amount parsing, and grouped presentation.
//!
//! Everything here is pure; the engine feeds it items from the PPOB
//! client and formats the results into replies.

pub mod amount;
pub mod format;
pub mod search;

pub use amount::{parse_amount, parse_nominal_amount};
pub use format::{format_catalog_summary, format_price_list, group_by_category};
pub use search::{filter_by_budget, filter_by_query};
