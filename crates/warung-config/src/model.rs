// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All sections use `#[serde(deny_unknown_fields)]` so typos in config
//! files fail loudly at startup.

use serde::{Deserialize, Serialize};

/// Top-level warung configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WarungConfig {
    /// Process identity, logging, and metrics namespace.
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP listener and public URL settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// SQLite database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Key/value cache binding settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Gemini NLU settings, including the ordered API key pool.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Atlantic PPOB provider settings.
    #[serde(default)]
    pub atlantic: AtlanticConfig,

    /// WhatsApp transport binding settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// Process identity and observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deployment environment tag (development, staging, production).
    #[serde(default = "default_app_env")]
    pub app_env: String,

    /// Optional prefix for every exported metric name.
    #[serde(default)]
    pub metrics_namespace: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            app_env: default_app_env(),
            metrics_namespace: String::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Address to bind (host:port).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Externally reachable base URL, used only for logging the webhook
    /// endpoint at startup.
    #[serde(default)]
    pub public_base_url: String,

    /// Optional path prefix stripped before routing (e.g. `/bot`).
    #[serde(default)]
    pub public_base_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            public_base_url: String::new(),
            public_base_path: String::new(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// SQLite database settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "warung.db".to_string()
}

/// Key/value cache binding settings. When `addr` is empty the in-process
/// cache is used.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Redis address (host:port). Empty selects the in-process cache.
    #[serde(default)]
    pub addr: String,

    /// Redis password.
    #[serde(default)]
    pub password: String,

    /// Redis logical database index.
    #[serde(default)]
    pub db: i64,

    /// Whether to connect with TLS.
    #[serde(default)]
    pub tls: bool,

    /// TTL for cached price lists, in seconds.
    #[serde(default = "default_price_ttl_secs")]
    pub price_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            password: String::new(),
            db: 0,
            tls: false,
            price_ttl_secs: default_price_ttl_secs(),
        }
    }
}

fn default_price_ttl_secs() -> u64 {
    300
}

/// Gemini NLU settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Ordered API keys; list position becomes rotation priority.
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Model identifier.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Per-call deadline in seconds.
    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,

    /// Cooldown window applied to a key after quota exhaustion, in hours.
    #[serde(default = "default_gemini_cooldown_hours")]
    pub cooldown_hours: i64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: default_gemini_model(),
            timeout_secs: default_gemini_timeout_secs(),
            cooldown_hours: default_gemini_cooldown_hours(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_timeout_secs() -> u64 {
    20
}

fn default_gemini_cooldown_hours() -> i64 {
    24
}

/// Atlantic PPOB provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AtlanticConfig {
    /// Provider base URL.
    #[serde(default = "default_atlantic_base_url")]
    pub base_url: String,

    /// Static provider API key.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_atlantic_timeout_secs")]
    pub timeout_secs: u64,

    /// Default deposit method (e.g. QRIS).
    #[serde(default = "default_deposit_method")]
    pub deposit_method: String,

    /// Default deposit type sent to the provider.
    #[serde(default = "default_deposit_type")]
    pub deposit_type: String,

    /// Fixed deposit fee in minor units, used when the provider response
    /// omits the fee.
    #[serde(default)]
    pub deposit_fee_fixed: i64,

    /// Percentage deposit fee (0.0-1.0), used when the provider response
    /// omits the fee.
    #[serde(default)]
    pub deposit_fee_percent: f64,

    /// Lowercase MD5 of the expected webhook basic-auth username.
    #[serde(default)]
    pub webhook_username_md5: String,

    /// Lowercase MD5 of the expected webhook basic-auth password.
    #[serde(default)]
    pub webhook_password_md5: String,
}

impl Default for AtlanticConfig {
    fn default() -> Self {
        Self {
            base_url: default_atlantic_base_url(),
            api_key: String::new(),
            timeout_secs: default_atlantic_timeout_secs(),
            deposit_method: default_deposit_method(),
            deposit_type: default_deposit_type(),
            deposit_fee_fixed: 0,
            deposit_fee_percent: 0.0,
            webhook_username_md5: String::new(),
            webhook_password_md5: String::new(),
        }
    }
}

fn default_atlantic_base_url() -> String {
    "https://atlantich2h.com".to_string()
}

fn default_atlantic_timeout_secs() -> u64 {
    15
}

fn default_deposit_method() -> String {
    "QRIS".to_string()
}

fn default_deposit_type() -> String {
    "ewallet".to_string()
}

/// WhatsApp transport binding settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Path to the transport's session store.
    #[serde(default = "default_wa_store_path")]
    pub store_path: String,

    /// Log level passed to the transport binding.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            store_path: default_wa_store_path(),
            log_level: default_log_level(),
        }
    }
}

fn default_wa_store_path() -> String {
    "warung-wa.db".to_string()
}
