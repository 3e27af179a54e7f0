// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user dialog session state.
//!
//! Sessions are process-local soft state: losing one only degrades the
//! next turn. The pending confirmation is the only piece with semantics —
//! it describes the exact action a "ya" would execute, and it expires.

use std::time::Duration;

use tokio::time::Instant;
use warung_atlantic::PriceItem;
use warung_core::MediaKind;

/// A pending confirmation expires after this much silence.
pub const PENDING_TTL: Duration = Duration::from_secs(10 * 60);

/// The exact action awaiting a user confirmation.
#[derive(Debug, Clone)]
pub enum PendingAction {
    Topup {
        code: String,
        name: String,
        price: f64,
        target: String,
        amount: i64,
    },
    BillPay {
        ref_id: String,
        code: String,
        target: String,
        amount: f64,
        fee: f64,
    },
    DepositCreate {
        method: String,
        amount: i64,
    },
    TransferCreate {
        bank_code: String,
        account_no: String,
        owner_name: String,
        amount: i64,
    },
}

/// A pending action plus its creation instant.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    pub action: PendingAction,
    pub created_at: Instant,
}

impl PendingConfirmation {
    pub fn new(action: PendingAction) -> Self {
        Self {
            action,
            created_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < PENDING_TTL
    }
}

/// Bill inquiry kept between `bill_check` and `bill_pay`.
#[derive(Debug, Clone)]
pub struct PendingBill {
    pub ref_id: String,
    pub code: String,
    pub target: String,
    pub amount: f64,
    pub fee: f64,
    pub info: String,
}

/// Destination account verified by `transfer_check`.
#[derive(Debug, Clone)]
pub struct VerifiedAccount {
    pub bank_code: String,
    pub account_no: String,
    pub owner_name: String,
}

/// Soft per-user dialog state.
#[derive(Debug, Default)]
pub struct SessionState {
    pub last_intent: Option<String>,
    pub pending: Option<PendingConfirmation>,
    pub shortlist: Vec<PriceItem>,
    pub pending_bill: Option<PendingBill>,
    pub verified_account: Option<VerifiedAccount>,
    pub last_order_ref: Option<String>,
    pub last_deposit_ref: Option<String>,
    pub last_amount: Option<i64>,
    pub last_media: MediaKind,
}

impl SessionState {
    /// Take the pending confirmation if it has not expired. An expired
    /// confirmation is dropped and never auto-executes.
    pub fn take_fresh_pending(&mut self) -> Option<PendingConfirmation> {
        match self.pending.take() {
            Some(pending) if pending.is_fresh() => Some(pending),
            _ => None,
        }
    }
}

/// Interpret an utterance as a confirm/deny token, if it is one.
pub fn parse_confirmation(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "ya" | "iya" | "oke" | "ok" | "lanjut" | "confirm" | "yes" => Some(true),
        "tidak" | "batal" | "cancel" | "no" => Some(false),
        _ => None,
    }
}
