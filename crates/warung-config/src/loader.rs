// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./warung.toml` > `~/.config/warung/warung.toml`
//! > `/etc/warung/warung.toml` with environment variable overrides via the
//! `WARUNG_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WarungConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/warung/warung.toml` (system-wide)
/// 3. `~/.config/warung/warung.toml` (user XDG config)
/// 4. `./warung.toml` (local directory)
/// 5. `WARUNG_*` environment variables
pub fn load_config() -> Result<WarungConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WarungConfig::default()))
        .merge(Toml::file("/etc/warung/warung.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("warung/warung.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("warung.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WarungConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WarungConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WarungConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WarungConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WARUNG_GEMINI_API_KEYS` must map to
/// `gemini.api_keys`, not `gemini.api.keys`.
fn env_provider() -> Env {
    Env::prefixed("WARUNG_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("http_", "http.", 1)
            .replacen("database_", "database.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("gemini_", "gemini.", 1)
            .replacen("atlantic_", "atlantic.", 1)
            .replacen("whatsapp_", "whatsapp.", 1);
        mapped.into()
    })
}
