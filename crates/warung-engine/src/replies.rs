// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing reply templates (Indonesian) and formatting helpers.

use serde_json::Value;

pub const GREETING: &str =
    "Halo! Mau isi pulsa, paket data, bayar tagihan, atau top up saldo? Ketik saja kebutuhanmu.";

pub const NO_MATCH: &str = "Belum ada produk yang cocok.";

pub const BUSY: &str = "Sistem sedang sibuk, coba lagi sebentar ya.";

pub const OUTAGE: &str = "Layanan sedang gangguan. Tim kami sudah menanganinya, coba lagi nanti.";

pub const FALLBACK: &str =
    "Maaf, aku belum paham maksudnya. Coba ketik misalnya \"pulsa telkomsel 20k ke 0812xxxx\".";

pub const CANCELLED: &str = "Oke, dibatalkan.";

pub const CONFIRM_HINT: &str = "Balas *ya* untuk lanjut atau *batal* untuk membatalkan.";

/// Format a rupiah amount with dot grouping: `20150` -> `Rp20.150`.
pub fn rupiah(amount: f64) -> String {
    let negative = amount < 0.0;
    let mut value = format!("{:.0}", amount.abs());
    let mut grouped = String::new();
    while value.len() > 3 {
        let split = value.len() - 3;
        grouped = format!(".{}{}", &value[split..], grouped);
        value.truncate(split);
    }
    let sign = if negative { "-" } else { "" };
    format!("{sign}Rp{value}{grouped}")
}

/// Human form of a canonical order/deposit status.
pub fn status_label(status: &str) -> &str {
    match status {
        "success" => "berhasil",
        "pending" => "diproses",
        "processing" => "diproses",
        "awaiting_payment" => "menunggu pembayaran",
        "failed" => "gagal",
        _ => "belum diketahui",
    }
}

/// Render the checkout instrument of a deposit into payment instructions.
pub fn checkout_instructions(checkout: &serde_json::Map<String, Value>) -> String {
    let mut lines = Vec::new();

    if let Some(qr) = non_empty(checkout, "qr_string") {
        lines.push(format!("QRIS: {qr}"));
    }
    if let Some(qr_image) = non_empty(checkout, "qr_image") {
        lines.push(format!("Gambar QR: {qr_image}"));
    }
    if let Some(va) = non_empty(checkout, "va_number") {
        lines.push(format!("Nomor VA: {va}"));
    }
    if let Some(bank) = non_empty(checkout, "bank") {
        lines.push(format!("Bank: {bank}"));
    }
    if let Some(account) = non_empty(checkout, "tujuan") {
        lines.push(format!("Rekening tujuan: {account}"));
    }
    if let Some(name) = non_empty(checkout, "account_name") {
        lines.push(format!("Atas nama: {name}"));
    }
    if let Some(expiry) = non_empty(checkout, "expired_at") {
        lines.push(format!("Berlaku sampai: {expiry}"));
    }

    if lines.is_empty() {
        "Instruksi pembayaran akan menyusul.".to_string()
    } else {
        lines.join("\n")
    }
}

fn non_empty(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rupiah_grouping() {
        assert_eq!(rupiah(0.0), "Rp0");
        assert_eq!(rupiah(500.0), "Rp500");
        assert_eq!(rupiah(20150.0), "Rp20.150");
        assert_eq!(rupiah(1_500_000.0), "Rp1.500.000");
        assert_eq!(rupiah(-2500.0), "-Rp2.500");
    }

    #[test]
    fn checkout_lines() {
        let checkout = json!({
            "qr_string": "000201abc",
            "va_number": "8808123",
            "expired_at": "2026-01-01 10:00"
        });
        let text = checkout_instructions(checkout.as_object().unwrap());
        assert!(text.contains("QRIS: 000201abc"));
        assert!(text.contains("Nomor VA: 8808123"));
        assert!(text.contains("Berlaku sampai"));
    }

    #[test]
    fn empty_checkout_has_fallback() {
        let checkout = serde_json::Map::new();
        assert!(checkout_instructions(&checkout).contains("menyusul"));
    }
}
