// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Atlantic H2H API.
//!
//! All calls are form-urlencoded POSTs with the static API key injected as
//! `api_key`. Idempotent reads are retried on transient failures; create
//! operations never are — idempotency there is the caller's job via
//! `ref_id`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use warung_core::{Cache, CatalogType, WarungError};
use warung_metrics::record_atlantic_request;

use crate::types::{
    as_object, as_rows, parse_price_list, BillInquiryRequest, BillInquiryResponse,
    BillPaymentRequest, BillPaymentResponse, CreatePrepaidRequest, DepositCancelResponse,
    DepositInstantResponse, DepositMethod, DepositMethodFilter, DepositRequest, DepositResponse,
    DepositStatusResponse, Envelope, PriceItem, Profile, TransactionResponse,
    TransactionStatusRequest, TransactionStatusResponse, TransferBank, TransferCheckResponse,
    TransferRequest, TransferResponse, TransferStatusResponse,
};

const DEFAULT_BASE_URL: &str = "https://atlantich2h.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const READ_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Atlantic client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// TTL for cached price lists.
    pub price_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
            price_ttl: Duration::from_secs(300),
        }
    }
}

/// Typed access to the Atlantic H2H API.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: Option<Arc<dyn Cache>>,
    price_ttl: Duration,
}

impl Client {
    /// Create a new client. `cache` backs the price-list cache; `None`
    /// disables caching.
    pub fn new(config: ClientConfig, cache: Option<Arc<dyn Cache>>) -> Result<Self, WarungError> {
        let base_url = {
            let trimmed = config.base_url.trim_end_matches('/');
            if trimmed.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                trimmed.to_string()
            }
        };
        let timeout = if config.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            config.timeout
        };

        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));
        headers.insert(
            "user-agent",
            HeaderValue::from_static("bot-jual/atlantic-client"),
        );
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            "origin",
            HeaderValue::from_str(&base_url)
                .map_err(|e| WarungError::Config(format!("invalid atlantic base url: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| WarungError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            cache,
            price_ttl: config.price_ttl,
        })
    }

    // --- Catalog ---

    /// Retrieve the price list, consulting the cache unless `force_refresh`.
    /// A forced refresh still writes the cache. Cache failures are
    /// warnings, never errors.
    pub async fn price_list(
        &self,
        catalog_type: CatalogType,
        force_refresh: bool,
    ) -> Result<Vec<PriceItem>, WarungError> {
        let cache_key = format!("catalog:{catalog_type}");

        if let Some(cache) = &self.cache {
            if !force_refresh {
                match cache.get_json(&cache_key).await {
                    Ok(Some(cached)) => match serde_json::from_value::<Vec<PriceItem>>(cached) {
                        Ok(items) => return Ok(items),
                        Err(e) => warn!(error = %e, "decode cached price list failed"),
                    },
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "read price list cache failed"),
                }
            }
        }

        let env = self
            .post_form_retrying(
                "/layanan/price_list",
                vec![("type".into(), catalog_type.as_str().into())],
            )
            .await?;
        let items = parse_price_list(&env.data)
            .map_err(|e| WarungError::Internal(format!("parse price list: {e}")))?;

        if let Some(cache) = &self.cache {
            match serde_json::to_value(&items) {
                Ok(value) => {
                    if let Err(e) = cache.set_json(&cache_key, value, self.price_ttl).await {
                        warn!(error = %e, "set price list cache failed");
                    }
                }
                Err(e) => warn!(error = %e, "encode price list cache failed"),
            }
        }
        Ok(items)
    }

    // --- Account ---

    /// Fetch the provider account profile and balance.
    pub async fn get_profile(&self) -> Result<Profile, WarungError> {
        let env = self.post_form_retrying("/get_profile", Vec::new()).await?;
        Ok(Profile::from_data(as_object(&env.data)))
    }

    // --- Transactions ---

    /// Create a prepaid top-up transaction. Never retried.
    pub async fn create_prepaid(
        &self,
        req: CreatePrepaidRequest,
    ) -> Result<TransactionResponse, WarungError> {
        let mut form: Vec<(String, String)> = vec![
            ("code".into(), req.product_code),
            ("target".into(), req.customer_id),
        ];
        if !req.ref_id.is_empty() {
            form.push(("reff_id".into(), req.ref_id));
        }
        if req.amount > 0 {
            form.push(("amount".into(), req.amount.to_string()));
        }
        if req.limit_price > 0 {
            form.push(("limit_price".into(), req.limit_price.to_string()));
        }
        if !req.phone_number.is_empty() {
            form.push(("phone".into(), req.phone_number));
        }
        if !req.note.is_empty() {
            form.push(("note".into(), req.note));
        }

        let env = self.post_form("/transaksi/create", form).await?;
        Ok(TransactionResponse::from_data(
            as_object(&env.data),
            &env.message,
        ))
    }

    /// Look up a transaction by reference or provider id.
    pub async fn transaction_status(
        &self,
        req: TransactionStatusRequest,
    ) -> Result<TransactionStatusResponse, WarungError> {
        let mut form: Vec<(String, String)> = Vec::new();
        if !req.id.trim().is_empty() {
            form.push(("id".into(), req.id));
        }
        if !req.ref_id.trim().is_empty() {
            form.push(("reff_id".into(), req.ref_id));
        }
        if !req.tx_type.trim().is_empty() {
            form.push(("type".into(), req.tx_type));
        }

        let env = self.post_form_retrying("/transaksi/status", form).await?;
        Ok(TransactionStatusResponse::from_data(
            as_object(&env.data),
            &env.message,
        ))
    }

    // --- Bills ---

    /// Check an outstanding bill.
    pub async fn bill_inquiry(
        &self,
        req: BillInquiryRequest,
    ) -> Result<BillInquiryResponse, WarungError> {
        let mut form: Vec<(String, String)> = vec![
            ("code".into(), req.product_code),
            ("customer_no".into(), req.customer_id),
        ];
        if !req.ref_id.is_empty() {
            form.push(("reff_id".into(), req.ref_id));
        }
        let env = self.post_form("/transaksi/tagihan", form).await?;
        Ok(BillInquiryResponse::from_data(
            as_object(&env.data),
            &env.message,
        ))
    }

    /// Pay a previously inquired bill. Never retried.
    pub async fn bill_payment(
        &self,
        req: BillPaymentRequest,
    ) -> Result<BillPaymentResponse, WarungError> {
        let mut form: Vec<(String, String)> = Vec::new();
        if !req.ref_id.is_empty() {
            form.push(("reff_id".into(), req.ref_id));
        }
        if !req.product_code.is_empty() {
            form.push(("code".into(), req.product_code));
        }
        if !req.customer_id.is_empty() {
            form.push(("customer_no".into(), req.customer_id));
        }
        let env = self.post_form("/transaksi/tagihan/bayar", form).await?;
        Ok(BillPaymentResponse::from_data(
            as_object(&env.data),
            &env.message,
        ))
    }

    // --- Deposits ---

    /// List available deposit methods.
    pub async fn deposit_methods(
        &self,
        filter: DepositMethodFilter,
    ) -> Result<Vec<DepositMethod>, WarungError> {
        let mut form: Vec<(String, String)> = Vec::new();
        if !filter.deposit_type.is_empty() {
            form.push(("type".into(), filter.deposit_type));
        }
        if !filter.method.is_empty() {
            form.push(("metode".into(), filter.method.clone()));
            form.push(("method".into(), filter.method));
        }
        let env = self.post_form("/deposit/metode", form).await?;
        Ok(as_rows(&env.data)
            .into_iter()
            .map(DepositMethod::from_row)
            .collect())
    }

    /// Start a deposit. Never retried.
    pub async fn create_deposit(&self, req: DepositRequest) -> Result<DepositResponse, WarungError> {
        let mut form: Vec<(String, String)> = vec![
            ("reff_id".into(), req.ref_id),
            ("nominal".into(), format!("{:.0}", req.amount)),
            ("metode".into(), req.method),
        ];
        if !req.deposit_type.is_empty() {
            form.push(("type".into(), req.deposit_type));
        }
        let env = self.post_form("/deposit/create", form).await?;
        Ok(DepositResponse::from_data(
            as_object(&env.data),
            &env.message,
        ))
    }

    /// Check deposit status by provider id.
    pub async fn deposit_status(
        &self,
        deposit_id: &str,
    ) -> Result<DepositStatusResponse, WarungError> {
        let env = self
            .post_form_retrying("/deposit/status", vec![("id".into(), deposit_id.into())])
            .await?;
        Ok(DepositStatusResponse::from_data(as_object(&env.data)))
    }

    /// Cancel a pending deposit.
    pub async fn cancel_deposit(
        &self,
        deposit_id: &str,
    ) -> Result<DepositCancelResponse, WarungError> {
        let env = self
            .post_form("/deposit/cancel", vec![("id".into(), deposit_id.into())])
            .await?;
        Ok(DepositCancelResponse::from_data(as_object(&env.data)))
    }

    /// Instant payout or fee check. `action = false` only quotes the fee.
    pub async fn instant_deposit(
        &self,
        deposit_id: &str,
        action: bool,
    ) -> Result<DepositInstantResponse, WarungError> {
        let env = self
            .post_form(
                "/deposit/instant",
                vec![
                    ("id".into(), deposit_id.into()),
                    ("action".into(), action.to_string()),
                ],
            )
            .await?;
        Ok(DepositInstantResponse::from_data(as_object(&env.data)))
    }

    // --- Transfers ---

    /// List banks and e-wallets available for transfer.
    pub async fn transfer_bank_list(&self) -> Result<Vec<TransferBank>, WarungError> {
        let env = self
            .post_form_retrying("/transfer/bank_list", Vec::new())
            .await?;
        Ok(as_rows(&env.data)
            .into_iter()
            .map(TransferBank::from_row)
            .collect())
    }

    /// Verify a destination account and resolve the owner name.
    pub async fn transfer_check_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<TransferCheckResponse, WarungError> {
        let env = self
            .post_form(
                "/transfer/cek_rekening",
                vec![
                    ("bank_code".into(), bank_code.into()),
                    ("account_number".into(), account_number.into()),
                ],
            )
            .await?;
        Ok(TransferCheckResponse::from_data(as_object(&env.data)))
    }

    /// Create a transfer. Never retried.
    pub async fn create_transfer(&self, req: TransferRequest) -> Result<TransferResponse, WarungError> {
        let mut form: Vec<(String, String)> = vec![
            ("reff_id".into(), req.ref_id),
            ("kode_bank".into(), req.bank_code),
            ("nomor_akun".into(), req.account_no),
            ("nama_penerima".into(), req.account_name),
            ("nominal".into(), format_amount(req.amount)),
        ];
        if !req.description.is_empty() {
            form.push(("catatan".into(), req.description));
        }
        if !req.email.is_empty() {
            form.push(("email".into(), req.email));
        }
        if !req.phone.is_empty() {
            form.push(("phone".into(), req.phone));
        }
        let env = self.post_form("/transfer/create", form).await?;
        Ok(TransferResponse::from_data(
            as_object(&env.data),
            &env.message,
        ))
    }

    /// Check transfer status by provider id.
    pub async fn transfer_status(
        &self,
        transfer_id: &str,
    ) -> Result<TransferStatusResponse, WarungError> {
        let env = self
            .post_form_retrying("/transfer/status", vec![("id".into(), transfer_id.into())])
            .await?;
        Ok(TransferStatusResponse::from_data(
            as_object(&env.data),
            &env.message,
        ))
    }

    // --- Plumbing ---

    /// Retrying wrapper for idempotent reads.
    async fn post_form_retrying(
        &self,
        endpoint: &str,
        form: Vec<(String, String)>,
    ) -> Result<Envelope, WarungError> {
        let mut last_error = None;
        for attempt in 0..=READ_RETRIES {
            if attempt > 0 {
                warn!(endpoint, attempt, "retrying atlantic read after transient error");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            match self.post_form(endpoint, form.clone()).await {
                Ok(env) => return Ok(env),
                Err(e) if e.is_transient() && attempt < READ_RETRIES => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| WarungError::TransientUpstream("atlantic read failed".into())))
    }

    async fn post_form(
        &self,
        endpoint: &str,
        mut form: Vec<(String, String)>,
    ) -> Result<Envelope, WarungError> {
        if !self.api_key.is_empty() && !form.iter().any(|(k, _)| k == "api_key") {
            form.push(("api_key".into(), self.api_key.clone()));
        }

        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.post(&url).form(&form);
        if endpoint.starts_with("/deposit/") {
            request = request.header("x-client-action", "create_deposit_qris");
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                record_atlantic_request(endpoint, "error", started.elapsed().as_secs_f64());
                if e.is_timeout() {
                    return Err(WarungError::Timeout {
                        duration: started.elapsed(),
                    });
                }
                return Err(WarungError::TransientUpstream(format!(
                    "atlantic request: {e}"
                )));
            }
        };

        let status = response.status();
        record_atlantic_request(
            endpoint,
            status.as_str(),
            started.elapsed().as_secs_f64(),
        );

        let body = response
            .text()
            .await
            .map_err(|e| WarungError::TransientUpstream(format!("read response: {e}")))?;

        if status.as_u16() >= 400 {
            return Err(classify_http_error(status.as_u16(), &body));
        }

        let env: Envelope = serde_json::from_str(&body)
            .map_err(|e| WarungError::Internal(format!("decode atlantic response: {e}")))?;

        if !env.status {
            let message = if env.message.is_empty() {
                "atlantic operation failed".to_string()
            } else {
                env.message.clone()
            };
            return Err(classify_failure(endpoint, &message, env.code));
        }

        debug!(endpoint, "atlantic call ok");
        Ok(env)
    }
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        amount.to_string()
    }
}

/// Classify an HTTP-level failure from the upstream.
fn classify_http_error(status: u16, body: &str) -> WarungError {
    let snippet = body.trim().to_string();
    let lower = snippet.to_lowercase();
    if status == 401 || is_credential_message(&lower) {
        return WarungError::InvalidCredential(snippet);
    }
    if is_deposit_method_message(&lower) {
        return WarungError::InvalidDepositMethod(snippet);
    }
    if is_balance_message(&lower) {
        return WarungError::InsufficientBalance(snippet);
    }
    if status >= 500 {
        return WarungError::TransientUpstream(format!("atlantic status={status} body={snippet}"));
    }
    WarungError::Upstream {
        endpoint: String::new(),
        message: snippet,
        code: i64::from(status),
    }
}

/// Classify a `status = false` envelope by its message text.
fn classify_failure(endpoint: &str, message: &str, code: i64) -> WarungError {
    let lower = message.to_lowercase();
    if is_credential_message(&lower) {
        return WarungError::InvalidCredential(message.to_string());
    }
    if is_deposit_method_message(&lower) {
        return WarungError::InvalidDepositMethod(message.to_string());
    }
    if is_balance_message(&lower) {
        return WarungError::InsufficientBalance(message.to_string());
    }
    WarungError::Upstream {
        endpoint: endpoint.to_string(),
        message: message.to_string(),
        code,
    }
}

fn is_credential_message(lower: &str) -> bool {
    lower.contains("invalid credential")
        || lower.contains("credential invalid")
        || lower.contains("invalid api key")
        || lower.contains("api key invalid")
        || lower.contains("kredensial tidak")
}

fn is_balance_message(lower: &str) -> bool {
    lower.contains("saldo tidak cukup")
        || lower.contains("insufficient balance")
        || lower.contains("insufficient funds")
}

fn is_deposit_method_message(lower: &str) -> bool {
    lower.contains("metode deposit tidak valid")
        || lower.contains("metode deposit non aktif")
        || lower.contains("deposit tidak valid")
        || lower.contains("deposit method tidak valid")
        || lower.contains("invalid deposit method")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warung_core::MemoryCache;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str, cache: Option<Arc<dyn Cache>>) -> Client {
        Client::new(
            ClientConfig {
                base_url: base_url.to_string(),
                api_key: "atl-key".to_string(),
                timeout: Duration::from_secs(5),
                price_ttl: Duration::from_secs(60),
            },
            cache,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn price_list_parses_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/layanan/price_list"))
            .and(body_string_contains("api_key=atl-key"))
            .and(body_string_contains("type=prabayar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "true",
                "message": "ok",
                "data": [
                    {"code": "TSEL20", "name": "Telkomsel 20rb", "category": "Pulsa",
                     "provider": "Telkomsel", "harga": "20150", "status": "aktif"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let client = test_client(&server.uri(), Some(cache));

        let items = client.price_list(CatalogType::Prabayar, false).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, "TSEL20");
        assert_eq!(items[0].status, "available");

        // Second call is served from the cache; the mock expects one hit.
        let cached = client.price_list(CatalogType::Prabayar, false).await.unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache_read() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/layanan/price_list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": []
            })))
            .expect(2)
            .mount(&server)
            .await;

        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let client = test_client(&server.uri(), Some(cache));
        client.price_list(CatalogType::Prabayar, true).await.unwrap();
        client.price_list(CatalogType::Prabayar, true).await.unwrap();
    }

    #[tokio::test]
    async fn envelope_failure_maps_to_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaksi/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": false,
                "message": "produk tidak tersedia",
                "code": 404
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let err = client
            .create_prepaid(CreatePrepaidRequest {
                product_code: "TSEL20".into(),
                customer_id: "0812".into(),
                ref_id: "R-1".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            WarungError::Upstream { message, code, .. } => {
                assert_eq!(message, "produk tidak tersedia");
                assert_eq!(code, 404);
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_401_is_invalid_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_profile"))
            .respond_with(ResponseTemplate::new(401).set_body_string("api key invalid"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let err = client.get_profile().await.unwrap_err();
        assert!(matches!(err, WarungError::InvalidCredential(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn insufficient_balance_message_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/deposit/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": false,
                "message": "Saldo tidak cukup untuk transaksi ini"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let err = client
            .create_deposit(DepositRequest {
                method: "QRIS".into(),
                amount: 50000.0,
                ref_id: "D-1".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WarungError::InsufficientBalance(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn create_prepaid_sends_expected_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaksi/create"))
            .and(body_string_contains("code=TSEL20"))
            .and(body_string_contains("target=0812"))
            .and(body_string_contains("reff_id=U%3A1%3Aabcd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "ok",
                "data": {"reff_id": "U:1:abcd", "status": "sukses", "sn": "SN123"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let tx = client
            .create_prepaid(CreatePrepaidRequest {
                product_code: "TSEL20".into(),
                customer_id: "0812".into(),
                ref_id: "U:1:abcd".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tx.status, "success");
        assert_eq!(tx.sn, "SN123");
    }

    #[tokio::test]
    async fn status_reads_retry_on_transient_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaksi/status"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transaksi/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {"reff_id": "R-2", "status": "pending"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let status = client
            .transaction_status(TransactionStatusRequest {
                ref_id: "R-2".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(status.status, "pending");
    }
}
