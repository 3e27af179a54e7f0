// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent handlers.
//!
//! Every handler either returns a fully-formed reply, or records a
//! pending confirmation describing the exact action and returns a
//! preview. Side effects happen only in the `execute_*` paths reached
//! through a confirmation.

pub mod billing;
pub mod catalog;
pub mod deposit;
pub mod status;
pub mod topup;
pub mod transfer;

use warung_core::WarungError;
use warung_gemini::{Classification, Intent};
use warung_storage::User;

use crate::replies;
use crate::session::{PendingAction, SessionState};
use crate::Engine;

/// Route a classified utterance to its handler.
pub(crate) async fn dispatch(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    classification: &Classification,
    utterance: &str,
) -> Result<String, WarungError> {
    let slots = &classification.slots;
    match classification.intent {
        Intent::Greet | Intent::Smalltalk => Ok(classification
            .reply
            .clone()
            .unwrap_or_else(|| replies::GREETING.to_string())),
        Intent::PriceLookup => catalog::price_lookup(engine, session, slots).await,
        Intent::BudgetFilter => catalog::budget_filter(engine, session, slots, utterance).await,
        Intent::TopupCreate => topup::start(engine, session, slots, utterance).await,
        Intent::BillCheck => billing::check(engine, session, slots).await,
        Intent::BillPay => billing::start_payment(session),
        Intent::DepositCreate => deposit::start(engine, session, slots, utterance).await,
        Intent::DepositStatus => deposit::status(engine, user, session, slots).await,
        Intent::DepositCancel => deposit::cancel(engine, user, session, slots).await,
        Intent::TransferCheck => transfer::check(engine, session, slots).await,
        Intent::TransferCreate => transfer::start(engine, session, slots).await,
        Intent::TransferStatus => status::transfer_status(engine, user, session, slots).await,
        Intent::OrderStatus => status::order_status(engine, user, session, slots).await,
        Intent::Unknown => Ok(classification
            .reply
            .clone()
            .unwrap_or_else(|| replies::FALLBACK.to_string())),
    }
}

/// Execute a confirmed pending action.
pub(crate) async fn execute_pending(
    engine: &Engine,
    user: &User,
    session: &mut SessionState,
    action: PendingAction,
) -> Result<String, WarungError> {
    match action {
        PendingAction::Topup {
            code,
            name,
            price,
            target,
            amount,
        } => topup::execute(engine, user, session, code, name, price, target, amount).await,
        PendingAction::BillPay {
            ref_id,
            code,
            target,
            amount,
            fee,
        } => billing::execute(engine, user, session, ref_id, code, target, amount, fee).await,
        PendingAction::DepositCreate { method, amount } => {
            deposit::execute(engine, user, session, method, amount).await
        }
        PendingAction::TransferCreate {
            bank_code,
            account_no,
            owner_name,
            amount,
        } => transfer::execute(engine, user, session, bank_code, account_no, owner_name, amount)
            .await,
    }
}
