// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent taxonomy and the slot map.

use serde::Deserialize;
use serde_json::{Map, Value};

use warung_core::WarungError;

/// Recognized user intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greet,
    PriceLookup,
    BudgetFilter,
    TopupCreate,
    BillCheck,
    BillPay,
    DepositCreate,
    DepositStatus,
    DepositCancel,
    TransferCheck,
    TransferCreate,
    TransferStatus,
    OrderStatus,
    Smalltalk,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greet => "greet",
            Intent::PriceLookup => "price_lookup",
            Intent::BudgetFilter => "budget_filter",
            Intent::TopupCreate => "topup_create",
            Intent::BillCheck => "bill_check",
            Intent::BillPay => "bill_pay",
            Intent::DepositCreate => "deposit_create",
            Intent::DepositStatus => "deposit_status",
            Intent::DepositCancel => "deposit_cancel",
            Intent::TransferCheck => "transfer_check",
            Intent::TransferCreate => "transfer_create",
            Intent::TransferStatus => "transfer_status",
            Intent::OrderStatus => "order_status",
            Intent::Smalltalk => "smalltalk",
            Intent::Unknown => "unknown",
        }
    }

    /// Parse a model-provided intent token; anything unrecognized is
    /// `Unknown`.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_value(Value::String(raw.trim().to_lowercase()))
            .unwrap_or(Intent::Unknown)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat slot map extracted alongside the intent.
#[derive(Debug, Clone, Default)]
pub struct Slots(pub Map<String, Value>);

impl Slots {
    /// String view of a slot; numbers are rendered, empty strings are
    /// treated as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Integer view of a slot; string-numerics are parsed with grouping
    /// separators stripped.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().replace(['.', ','], "").parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of one classification call.
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    pub slots: Slots,
    /// Optional model-suggested reply (used for greet/smalltalk).
    pub reply: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    slots: Map<String, Value>,
    #[serde(default)]
    reply: Option<String>,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            slots: Slots::default(),
            reply: None,
        }
    }

    /// Parse the model's JSON output, tolerating Markdown code fences.
    pub fn from_model_text(text: &str) -> Result<Self, WarungError> {
        let stripped = strip_code_fence(text);
        let raw: RawClassification = serde_json::from_str(stripped)
            .map_err(|e| WarungError::Internal(format!("decode classification: {e}")))?;
        Ok(Self {
            intent: Intent::parse(&raw.intent),
            slots: Slots(raw.slots),
            reply: raw.reply.filter(|r| !r.trim().is_empty()),
        })
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
