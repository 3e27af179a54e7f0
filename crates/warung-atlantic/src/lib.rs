// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atlantic H2H provider integration.
//!
//! [`Client`] gives typed access to the upstream PPOB API: catalog,
//! transactions, bills, deposits, and transfers. The provider returns
//! heterogeneous field names and loosely typed values; all of that is
//! absorbed here so higher layers only see the normalized vocabulary.
//!
//! [`webhook`] authenticates inbound settlement notifications and hands
//! them to a processor callback.

pub mod client;
pub mod types;
pub mod webhook;

pub use client::{Client, ClientConfig};
pub use types::{
    BillInquiryResponse, BillInquiryRequest, BillPaymentRequest, BillPaymentResponse,
    CreatePrepaidRequest, DepositCancelResponse, DepositInstantResponse, DepositMethod,
    DepositMethodFilter, DepositRequest, DepositResponse, DepositStatusResponse, PriceItem,
    Profile, TransactionResponse, TransactionStatusRequest, TransactionStatusResponse,
    TransferBank, TransferCheckResponse, TransferRequest, TransferResponse,
    TransferStatusResponse,
};
pub use webhook::{EventKind, WebhookEvent, WebhookGate, WebhookProcessor};
