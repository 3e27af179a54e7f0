// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the warung bot.

use thiserror::Error;

/// The primary error type used across all warung crates.
#[derive(Debug, Error)]
pub enum WarungError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// IM transport errors (send failure, media download, disconnect).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Upstream provider rejected the configured API key.
    #[error("invalid upstream credential: {0}")]
    InvalidCredential(String),

    /// Upstream reported insufficient balance for the operation.
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Upstream rejected the deposit method.
    #[error("invalid deposit method: {0}")]
    InvalidDepositMethod(String),

    /// Generic upstream operation failure carrying the provider message.
    #[error("upstream {endpoint} error: {message} (code={code})")]
    Upstream {
        endpoint: String,
        message: String,
        code: i64,
    },

    /// Language model quota or rate limit exhausted.
    #[error("model quota exceeded: {0}")]
    QuotaExceeded(String),

    /// No eligible credentials remain in the pool.
    #[error("no credentials available")]
    NoCredentialsAvailable,

    /// Transient upstream failure (5xx, network); safe to retry.
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    /// Operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Reference lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate reference on insert.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Webhook authentication failed.
    #[error("unauthorized")]
    Unauthorized,

    /// Slot or input constraints violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WarungError {
    /// Whether the error is worth a "system busy, retry" reply rather
    /// than a hard failure message.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WarungError::TransientUpstream(_) | WarungError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(WarungError::TransientUpstream("503".into()).is_transient());
        assert!(WarungError::Timeout {
            duration: std::time::Duration::from_secs(15)
        }
        .is_transient());
        assert!(!WarungError::Unauthorized.is_transient());
        assert!(!WarungError::Conflict("dup".into()).is_transient());
    }

    #[test]
    fn display_includes_context() {
        let err = WarungError::Upstream {
            endpoint: "/transaksi/create".into(),
            message: "saldo tidak cukup".into(),
            code: 402,
        };
        let text = err.to_string();
        assert!(text.contains("/transaksi/create"));
        assert!(text.contains("saldo tidak cukup"));
    }
}
