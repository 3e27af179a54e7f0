// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the warung bot.
//!
//! Layered loading via Figment: compiled defaults, then system/user/local
//! TOML files, then `WARUNG_*` environment variable overrides.

pub mod loader;
pub mod model;

pub use figment::Error as ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::WarungConfig;
