// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared domain types.

use serde::{Deserialize, Serialize};

use crate::error::WarungError;

/// Catalog type of the upstream price list. The provider's canonical
/// tokens are the Indonesian forms; English aliases are accepted on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogType {
    Prabayar,
    Pascabayar,
}

impl CatalogType {
    /// Wire token expected by the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogType::Prabayar => "prabayar",
            CatalogType::Pascabayar => "pascabayar",
        }
    }

    /// Parse a catalog type, accepting `prepaid`/`postpaid` aliases.
    /// Empty input defaults to prabayar.
    pub fn parse(raw: &str) -> Result<Self, WarungError> {
        match raw.trim().to_lowercase().as_str() {
            "" | "prabayar" | "prepaid" => Ok(CatalogType::Prabayar),
            "pascabayar" | "postpaid" => Ok(CatalogType::Pascabayar),
            other => Err(WarungError::Validation(format!(
                "unknown catalog type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for CatalogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an order or deposit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    AwaitingPayment,
    Pending,
    Processing,
    Success,
    Failed,
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
            OrderStatus::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "awaiting_payment" => OrderStatus::AwaitingPayment,
            "pending" => OrderStatus::Pending,
            "processing" => OrderStatus::Processing,
            "success" => OrderStatus::Success,
            "failed" => OrderStatus::Failed,
            _ => OrderStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Success | OrderStatus::Failed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an audited message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Media kind of an IM message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    Text,
    Image,
    Audio,
    Other,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Text => "text",
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Other => "other",
        }
    }
}
