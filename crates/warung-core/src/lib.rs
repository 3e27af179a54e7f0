// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the warung conversational commerce bot.
//!
//! This crate provides the error type, the canonical status vocabulary
//! shared by the upstream client, the persistence facade and the dialog
//! engine, and the cache trait behind which the key/value binding lives.

pub mod cache;
pub mod error;
pub mod status;
pub mod types;

pub use cache::{Cache, MemoryCache};
pub use error::WarungError;
pub use status::{is_terminal_status, normalize_availability, normalize_tx_status};
pub use types::{CatalogType, Direction, MediaKind, OrderStatus};
