// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Atlantic API.
//!
//! The provider encodes `status` as bool, string, or number, spells field
//! names in several ways (`ref_id | reff_id | reference`), and mixes
//! numeric and string-numeric values. Decoding here is alias-tolerant;
//! the typed structs carry the normalized view plus the raw map.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use warung_core::{normalize_availability, normalize_tx_status};

/// Standard Atlantic response envelope: `{status, message, code, data}`.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub status: bool,
    pub message: String,
    pub code: i64,
    pub data: Value,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let status = match map.get("status") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("success") || s == "1"
            }
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        };
        let message = map
            .get("message")
            .map(|v| to_string_value(v))
            .unwrap_or_default();
        let code = match map.get("code") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        let data = map.get("data").cloned().unwrap_or(Value::Null);
        Ok(Envelope {
            status,
            message,
            code,
            data,
        })
    }
}

/// Render a JSON value as a trimmed string. Zero numbers render empty so
/// alias fallthrough keeps looking.
pub(crate) fn to_string_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                String::new()
            } else {
                n.to_string()
            }
        }
        _ => String::new(),
    }
}

/// Parse a JSON value as f64, accepting string-numerics with comma
/// thousand-separators.
pub(crate) fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// First non-empty string among the aliased keys.
pub(crate) fn first_string(map: &Map<String, Value>, keys: &[&str]) -> String {
    for key in keys {
        if let Some(value) = map.get(*key) {
            let s = to_string_value(value);
            if !s.is_empty() {
                return s;
            }
        }
    }
    String::new()
}

/// First non-zero float among the aliased keys.
pub(crate) fn first_f64(map: &Map<String, Value>, keys: &[&str]) -> f64 {
    for key in keys {
        if let Some(value) = map.get(*key) {
            let f = to_f64(value);
            if f != 0.0 {
                return f;
            }
        }
    }
    0.0
}

/// Interpret envelope data as an object; null becomes an empty map.
pub(crate) fn as_object(data: &Value) -> Map<String, Value> {
    match data {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

/// Interpret envelope data as a list of objects; null becomes empty.
pub(crate) fn as_rows(data: &Value) -> Vec<Map<String, Value>> {
    match data {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

/// First nested object among the aliased keys.
pub(crate) fn extract_nested(map: &Map<String, Value>, keys: &[&str]) -> Option<Map<String, Value>> {
    for key in keys {
        if let Some(Value::Object(nested)) = map.get(*key) {
            return Some(nested.clone());
        }
    }
    None
}

/// A product price entry.
#[derive(Debug, Clone, Serialize)]
pub struct PriceItem {
    pub code: String,
    pub name: String,
    pub category: String,
    pub provider: String,
    /// Free-form denomination string, e.g. "10000" or "1GB/7d".
    pub nominal: String,
    pub price: f64,
    /// Normalized availability: available | processing | unavailable.
    pub status: String,
    pub description: String,
}

impl<'de> Deserialize<'de> for PriceItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;

        let mut nominal = first_string(&map, &["nominal", "nilai"]);
        if nominal.is_empty() {
            nominal = first_string(&map, &["denom"]);
        }

        let mut status = first_string(&map, &["status", "status_text"]);
        if status.is_empty() {
            status = match first_f64(&map, &["status_id", "status_code"]) as i64 {
                1 => "available".to_string(),
                2 => "unavailable".to_string(),
                _ => String::new(),
            };
        }

        Ok(PriceItem {
            code: first_string(&map, &["code", "kode", "product_code"]),
            name: first_string(&map, &["name", "layanan", "product_name", "description"]),
            category: first_string(&map, &["category", "kategori"]),
            provider: first_string(&map, &["provider", "operator"]),
            nominal,
            price: first_f64(&map, &["price", "harga", "sell_price", "amount"]),
            status: normalize_availability(&status),
            description: first_string(&map, &["description", "keterangan", "note"]),
        })
    }
}

/// Normalize price-list payloads that may arrive flat or grouped by
/// category.
pub(crate) fn parse_price_list(data: &Value) -> Result<Vec<PriceItem>, serde_json::Error> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(data.clone()),
        Value::Object(groups) => {
            let mut items = Vec::new();
            for raw in groups.values() {
                let subset: Vec<PriceItem> = serde_json::from_value(raw.clone())?;
                items.extend(subset);
            }
            Ok(items)
        }
        _ => Ok(Vec::new()),
    }
}

/// Provider account profile and balance.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub balance: f64,
    pub status: String,
    pub raw: Map<String, Value>,
}

impl Profile {
    pub(crate) fn from_data(data: Map<String, Value>) -> Self {
        Self {
            name: first_string(&data, &["name"]),
            username: first_string(&data, &["username"]),
            email: first_string(&data, &["email"]),
            phone: first_string(&data, &["phone"]),
            balance: first_f64(&data, &["balance"]),
            status: first_string(&data, &["status"]),
            raw: data,
        }
    }
}

/// Parameters to create a prepaid top-up transaction.
#[derive(Debug, Clone, Default)]
pub struct CreatePrepaidRequest {
    pub product_code: String,
    pub customer_id: String,
    /// Caller-generated idempotency reference.
    pub ref_id: String,
    pub amount: i64,
    pub limit_price: i64,
    pub phone_number: String,
    pub note: String,
}

/// Transaction creation response.
#[derive(Debug, Clone)]
pub struct TransactionResponse {
    pub ref_id: String,
    /// Normalized status.
    pub status: String,
    pub message: String,
    pub sn: String,
    pub raw: Map<String, Value>,
}

impl TransactionResponse {
    pub(crate) fn from_data(data: Map<String, Value>, fallback_message: &str) -> Self {
        let mut resp = Self {
            ref_id: first_string(&data, &["reff_id", "ref_id", "reference"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            message: first_string(&data, &["message", "info", "description"]),
            sn: first_string(&data, &["sn", "serial_number"]),
            raw: data,
        };
        if resp.message.is_empty() {
            resp.message = fallback_message.trim().to_string();
        }
        resp
    }
}

/// Parameters to check a transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionStatusRequest {
    pub ref_id: String,
    pub id: String,
    pub tx_type: String,
}

/// Transaction status response.
#[derive(Debug, Clone)]
pub struct TransactionStatusResponse {
    pub ref_id: String,
    pub status: String,
    pub message: String,
    pub response_code: String,
    pub sn: String,
    pub raw: Map<String, Value>,
}

impl TransactionStatusResponse {
    pub(crate) fn from_data(data: Map<String, Value>, fallback_message: &str) -> Self {
        let mut resp = Self {
            ref_id: first_string(&data, &["reff_id", "ref_id", "reference"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            message: first_string(&data, &["message", "info", "description"]),
            response_code: first_string(&data, &["response_code", "code"]),
            sn: first_string(&data, &["sn", "serial_number"]),
            raw: data,
        };
        if resp.message.is_empty() {
            resp.message = fallback_message.trim().to_string();
        }
        resp
    }
}

/// Parameters to inquire a bill.
#[derive(Debug, Clone, Default)]
pub struct BillInquiryRequest {
    pub product_code: String,
    pub customer_id: String,
    pub ref_id: String,
}

/// Outstanding bill details.
#[derive(Debug, Clone)]
pub struct BillInquiryResponse {
    pub ref_id: String,
    pub status: String,
    pub message: String,
    pub amount: f64,
    pub fee: f64,
    pub bill_info: Map<String, Value>,
    pub raw: Map<String, Value>,
}

impl BillInquiryResponse {
    pub(crate) fn from_data(data: Map<String, Value>, fallback_message: &str) -> Self {
        let mut resp = Self {
            ref_id: first_string(&data, &["reff_id", "ref_id", "reference"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            message: first_string(&data, &["message", "info", "description"]),
            amount: first_f64(&data, &["amount", "total", "tagihan"]),
            fee: first_f64(&data, &["fee", "admin"]),
            bill_info: extract_nested(&data, &["bill_info", "detail", "data"]).unwrap_or_default(),
            raw: data,
        };
        if resp.message.is_empty() {
            resp.message = fallback_message.trim().to_string();
        }
        resp
    }
}

/// Parameters to pay a previously inquired bill.
#[derive(Debug, Clone, Default)]
pub struct BillPaymentRequest {
    pub ref_id: String,
    pub product_code: String,
    pub customer_id: String,
}

/// Bill payment outcome.
#[derive(Debug, Clone)]
pub struct BillPaymentResponse {
    pub ref_id: String,
    pub status: String,
    pub message: String,
    pub raw: Map<String, Value>,
}

impl BillPaymentResponse {
    pub(crate) fn from_data(data: Map<String, Value>, fallback_message: &str) -> Self {
        let mut resp = Self {
            ref_id: first_string(&data, &["reff_id", "ref_id", "reference"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            message: first_string(&data, &["message", "info", "description"]),
            raw: data,
        };
        if resp.message.is_empty() {
            resp.message = fallback_message.trim().to_string();
        }
        resp
    }
}

/// Parameters to create a deposit.
#[derive(Debug, Clone, Default)]
pub struct DepositRequest {
    pub method: String,
    pub amount: f64,
    pub ref_id: String,
    pub deposit_type: String,
}

/// Deposit creation response carrying the checkout instrument.
#[derive(Debug, Clone)]
pub struct DepositResponse {
    pub ref_id: String,
    pub status: String,
    pub message: String,
    /// Checkout instrument: QR string/image, VA number, bank coordinates,
    /// expiry. Top-level fields the provider leaks outside `checkout` are
    /// folded in here.
    pub checkout: Map<String, Value>,
    pub qr_string: String,
    pub qr_image: String,
    pub expired_at: String,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub raw: Map<String, Value>,
}

impl DepositResponse {
    pub(crate) fn from_data(data: Map<String, Value>, fallback_message: &str) -> Self {
        let fee = first_f64(&data, &["fee", "admin_fee", "admin"]);
        let mut net = first_f64(&data, &["get_balance", "net_amount", "saldo_masuk", "balance_masuk"]);
        let mut resp = Self {
            ref_id: first_string(&data, &["reff_id", "ref_id", "reference"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            message: first_string(&data, &["message", "info", "description"]),
            qr_string: first_string(&data, &["qr_string", "qr"]),
            qr_image: first_string(&data, &["qr_image", "image"]),
            expired_at: first_string(&data, &["expired_at", "expire_at"]),
            amount: first_f64(&data, &["nominal", "amount"]),
            checkout: extract_nested(&data, &["checkout"]).unwrap_or_default(),
            fee,
            net_amount: 0.0,
            raw: data,
        };
        if net == 0.0 && resp.amount > 0.0 && fee > 0.0 {
            net = resp.amount - fee;
        }
        resp.net_amount = net;
        if resp.message.is_empty() {
            resp.message = fallback_message.trim().to_string();
        }

        if !resp.qr_string.is_empty() {
            resp.checkout
                .insert("qr_string".into(), Value::String(resp.qr_string.clone()));
        }
        if !resp.qr_image.is_empty() {
            resp.checkout
                .insert("qr_image".into(), Value::String(resp.qr_image.clone()));
        }
        if !resp.expired_at.is_empty() {
            resp.checkout
                .insert("expired_at".into(), Value::String(resp.expired_at.clone()));
        }
        if resp.amount > 0.0 {
            resp.checkout.insert("nominal".into(), resp.amount.into());
        }
        if resp.fee > 0.0 {
            resp.checkout.insert("fee".into(), resp.fee.into());
        }
        if resp.net_amount > 0.0 {
            resp.checkout
                .insert("net_amount".into(), resp.net_amount.into());
        }

        // VA and bank transfer coordinates sometimes arrive at top level.
        if first_string(&resp.checkout, &["bank"]).is_empty() {
            let v = first_string(&resp.raw, &["bank", "bank_name", "bank_code", "bank_type"]);
            if !v.is_empty() {
                resp.checkout.insert("bank".into(), Value::String(v));
            }
        }
        if first_string(&resp.checkout, &["tujuan", "no_rekening", "account_no"]).is_empty() {
            let v = first_string(
                &resp.raw,
                &["tujuan", "no_rekening", "account_no", "rekening", "no_rek"],
            );
            if !v.is_empty() {
                resp.checkout.insert("tujuan".into(), Value::String(v));
            }
        }
        if first_string(&resp.checkout, &["account_name", "atas_nama"]).is_empty() {
            let v = first_string(&resp.raw, &["account_name", "atas_nama", "nama", "name"]);
            if !v.is_empty() {
                resp.checkout.insert("account_name".into(), Value::String(v));
            }
        }
        if first_string(&resp.checkout, &["va_number", "virtual_account", "no_va", "va"]).is_empty()
        {
            let v = first_string(
                &resp.raw,
                &[
                    "va_number",
                    "virtual_account",
                    "no_va",
                    "va",
                    "payment_no",
                    "pay_code",
                    "payment_code",
                ],
            );
            if !v.is_empty() {
                resp.checkout.insert("va_number".into(), Value::String(v));
            }
        }
        if first_string(&resp.checkout, &["expired_at"]).is_empty() {
            let v = first_string(&resp.raw, &["expired_at", "expire_at", "expired", "expire_time"]);
            if !v.is_empty() {
                resp.checkout.insert("expired_at".into(), Value::String(v));
            }
        }
        resp
    }
}

/// Optional filters for listing deposit methods.
#[derive(Debug, Clone, Default)]
pub struct DepositMethodFilter {
    pub deposit_type: String,
    pub method: String,
}

/// One available deposit method.
#[derive(Debug, Clone)]
pub struct DepositMethod {
    pub method: String,
    pub method_type: String,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub fee: f64,
    pub fee_percent: f64,
    pub status: String,
    pub img_url: String,
    pub raw: Map<String, Value>,
}

impl DepositMethod {
    pub(crate) fn from_row(row: Map<String, Value>) -> Self {
        Self {
            method: first_string(&row, &["metode", "method", "code"]),
            method_type: first_string(&row, &["type"]),
            name: first_string(&row, &["name", "nama"]),
            min: first_f64(&row, &["min"]),
            max: first_f64(&row, &["max"]),
            fee: first_f64(&row, &["fee"]),
            fee_percent: first_f64(&row, &["fee_persen", "fee_percent"]),
            status: normalize_availability(&first_string(&row, &["status"])),
            img_url: first_string(&row, &["img_url", "image"]),
            raw: row,
        }
    }
}

/// Deposit status lookup response.
#[derive(Debug, Clone)]
pub struct DepositStatusResponse {
    pub id: String,
    pub ref_id: String,
    pub status: String,
    pub method: String,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub created_at: String,
    pub raw: Map<String, Value>,
}

impl DepositStatusResponse {
    pub(crate) fn from_data(data: Map<String, Value>) -> Self {
        Self {
            id: first_string(&data, &["id"]),
            ref_id: first_string(&data, &["reff_id", "ref_id"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            method: first_string(&data, &["metode", "method"]),
            amount: first_f64(&data, &["nominal", "amount"]),
            fee: first_f64(&data, &["fee", "admin_fee"]),
            net_amount: first_f64(&data, &["get_balance", "net_amount", "saldo_masuk"]),
            created_at: first_string(&data, &["created_at"]),
            raw: data,
        }
    }
}

/// Deposit cancellation acknowledgement.
#[derive(Debug, Clone)]
pub struct DepositCancelResponse {
    pub id: String,
    pub status: String,
    pub created_at: String,
    pub raw: Map<String, Value>,
}

impl DepositCancelResponse {
    pub(crate) fn from_data(data: Map<String, Value>) -> Self {
        Self {
            id: first_string(&data, &["id"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            created_at: first_string(&data, &["created_at"]),
            raw: data,
        }
    }
}

/// Instant payout / fee check response.
#[derive(Debug, Clone)]
pub struct DepositInstantResponse {
    pub id: String,
    pub ref_id: String,
    pub status: String,
    pub amount: f64,
    pub handling_fee: f64,
    pub total_fee: f64,
    pub total_received: f64,
    pub created_at: String,
    pub raw: Map<String, Value>,
}

impl DepositInstantResponse {
    pub(crate) fn from_data(data: Map<String, Value>) -> Self {
        Self {
            id: first_string(&data, &["id"]),
            ref_id: first_string(&data, &["reff_id", "ref_id"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            amount: first_f64(&data, &["nominal", "amount"]),
            handling_fee: first_f64(&data, &["penanganan", "handling_fee"]),
            total_fee: first_f64(&data, &["total_fee", "fee"]),
            total_received: first_f64(&data, &["total_diterima", "total_received"]),
            created_at: first_string(&data, &["created_at"]),
            raw: data,
        }
    }
}

/// Parameters to create a bank/e-wallet transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferRequest {
    pub bank_code: String,
    pub account_name: String,
    pub account_no: String,
    pub amount: f64,
    pub ref_id: String,
    pub description: String,
    pub email: String,
    pub phone: String,
}

/// Transfer creation response.
#[derive(Debug, Clone)]
pub struct TransferResponse {
    pub ref_id: String,
    pub status: String,
    pub message: String,
    pub raw: Map<String, Value>,
}

impl TransferResponse {
    pub(crate) fn from_data(data: Map<String, Value>, fallback_message: &str) -> Self {
        let mut resp = Self {
            ref_id: first_string(&data, &["reff_id", "ref_id", "reference"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            message: first_string(&data, &["message", "info", "description"]),
            raw: data,
        };
        if resp.message.is_empty() {
            resp.message = fallback_message.trim().to_string();
        }
        resp
    }
}

/// One bank or e-wallet entry from the transfer bank list.
#[derive(Debug, Clone)]
pub struct TransferBank {
    pub id: String,
    pub code: String,
    pub name: String,
    pub bank_type: String,
    pub raw: Map<String, Value>,
}

impl TransferBank {
    pub(crate) fn from_row(row: Map<String, Value>) -> Self {
        Self {
            id: first_string(&row, &["id"]),
            code: first_string(&row, &["bank_code", "code"]),
            name: first_string(&row, &["bank_name", "name"]),
            bank_type: first_string(&row, &["type"]),
            raw: row,
        }
    }
}

/// Account ownership verification result.
#[derive(Debug, Clone)]
pub struct TransferCheckResponse {
    pub bank_code: String,
    pub account_no: String,
    pub owner_name: String,
    pub status: String,
    pub raw: Map<String, Value>,
}

impl TransferCheckResponse {
    pub(crate) fn from_data(data: Map<String, Value>) -> Self {
        Self {
            bank_code: first_string(&data, &["kode_bank", "bank_code"]),
            account_no: first_string(&data, &["nomor_akun", "account_number"]),
            owner_name: first_string(&data, &["nama_pemilik", "account_name"]),
            status: normalize_tx_status(&first_string(&data, &["status"])),
            raw: data,
        }
    }
}

/// Transfer status lookup response.
#[derive(Debug, Clone)]
pub struct TransferStatusResponse {
    pub id: String,
    pub ref_id: String,
    pub status: String,
    pub message: String,
    pub raw: Map<String, Value>,
}

impl TransferStatusResponse {
    pub(crate) fn from_data(data: Map<String, Value>, fallback_message: &str) -> Self {
        let mut resp = Self {
            id: first_string(&data, &["id"]),
            ref_id: first_string(&data, &["reff_id", "ref_id"]),
            status: normalize_tx_status(&first_string(&data, &["status", "state"])),
            message: first_string(&data, &["message", "info", "description"]),
            raw: data,
        };
        if resp.message.is_empty() {
            resp.message = fallback_message.trim().to_string();
        }
        resp
    }
}
