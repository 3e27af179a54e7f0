// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end dialog and reconciliation flows against mocked upstreams.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use warung_atlantic::{
    Client as AtlanticClient, ClientConfig, EventKind, WebhookEvent, WebhookProcessor,
};
use warung_core::{MediaKind, WarungError};
use warung_engine::{Engine, EngineConfig, SettlementProcessor};
use warung_gemini::{NluClient, NluConfig};
use warung_keypool::{KeyPool, DEFAULT_COOLDOWN};
use warung_storage::{Deposit, Order, Store, UserProfile};
use warung_transport::{InboundMessage, Transport};

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Transport double that records outbound text messages.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), WarungError> {
        self.sent.lock().await.push((to.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_image(
        &self,
        _to: &str,
        _data: &[u8],
        _mime: &str,
        _caption: &str,
    ) -> Result<(), WarungError> {
        Ok(())
    }

    async fn download_media(
        &self,
        _msg: &InboundMessage,
    ) -> Result<(Vec<u8>, String), WarungError> {
        Err(WarungError::Transport {
            message: "no media in tests".into(),
            source: None,
        })
    }
}

struct Harness {
    engine: Engine,
    store: Arc<Store>,
    transport: Arc<RecordingTransport>,
    atlantic: MockServer,
    gemini: MockServer,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("engine.db");
    let store = Arc::new(Store::open(db_path.to_str().unwrap()).await.unwrap());
    store.sync_keys("gemini", &["k1".to_string()]).await.unwrap();

    let atlantic_server = MockServer::start().await;
    let gemini_server = MockServer::start().await;

    let atlantic = Arc::new(
        AtlanticClient::new(
            ClientConfig {
                base_url: atlantic_server.uri(),
                api_key: "atl-key".into(),
                timeout: Duration::from_secs(5),
                price_ttl: Duration::from_secs(60),
            },
            None,
        )
        .unwrap(),
    );

    let pool = Arc::new(KeyPool::new(Arc::clone(&store), "gemini", DEFAULT_COOLDOWN));
    let nlu = Arc::new(
        NluClient::new(pool, NluConfig::default())
            .unwrap()
            .with_base_url(gemini_server.uri()),
    );

    let transport = Arc::new(RecordingTransport::default());
    let engine = Engine::new(
        Arc::clone(&store),
        Arc::clone(&atlantic),
        nlu,
        transport.clone(),
        EngineConfig::default(),
    );

    Harness {
        engine,
        store,
        transport,
        atlantic: atlantic_server,
        gemini: gemini_server,
        _dir: dir,
    }
}

fn inbound(text: &str) -> InboundMessage {
    InboundMessage {
        sender_wa_id: "628123".into(),
        sender_jid: "628123@s.whatsapp.net".into(),
        chat_jid: "628123@s.whatsapp.net".into(),
        message_id: "MSG-1".into(),
        push_name: Some("Budi".into()),
        kind: MediaKind::Text,
        text: Some(text.to_string()),
        media_ref: None,
        raw: json!({"text": text}),
        timestamp: "2026-01-01T00:00:00.000Z".into(),
    }
}

fn gemini_reply(payload: &str) -> serde_json::Value {
    json!({"candidates": [{"content": {"parts": [{"text": payload}]}}]})
}

fn price_list_body() -> serde_json::Value {
    json!({
        "status": true,
        "message": "ok",
        "data": [
            {"code": "TSEL10", "name": "Telkomsel 10.000", "category": "Pulsa",
             "provider": "Telkomsel", "price": 10500, "status": "available", "nominal": "10000"},
            {"code": "TSEL20", "name": "Telkomsel 20.000", "category": "Pulsa",
             "provider": "Telkomsel", "price": 20150, "status": "available", "nominal": "20000"},
            {"code": "VIU1", "name": "VIU Premium 1 Bulan", "category": "Streaming",
             "provider": "VIU", "price": 25000, "status": "available", "nominal": ""}
        ]
    })
}

#[tokio::test]
async fn topup_confirmation_flow_places_one_order() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/layanan/price_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(price_list_body()))
        .mount(&h.atlantic)
        .await;

    // Classifier resolves the utterance; called exactly once — the
    // confirmation turn must bypass it.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            r#"{"intent":"topup_create","slots":{"code":"TSEL20","target":"081234567890","amount":20000}}"#,
        )))
        .expect(1)
        .mount(&h.gemini)
        .await;

    Mock::given(method("POST"))
        .and(path("/transaksi/create"))
        .and(body_string_contains("code=TSEL20"))
        .and(body_string_contains("target=081234567890"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "ok",
            "data": {"reff_id": "any", "status": "sukses", "sn": "SN123"}
        })))
        .expect(1)
        .mount(&h.atlantic)
        .await;

    h.engine
        .handle_inbound(inbound("pulsa telkomsel 20k ke 081234567890"))
        .await;

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("Konfirmasi pembelian"), "got: {}", sent[0].1);
    assert!(sent[0].1.contains("TSEL20"));

    h.engine.handle_inbound(inbound("ya")).await;

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].1.contains("berhasil"), "got: {}", sent[1].1);
    assert!(sent[1].1.contains("SN123"));

    // The order landed terminal with the serial number recorded.
    let user = h
        .store
        .upsert_user_by_wa(UserProfile {
            wa_id: "628123".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let balance = h.store.get_user_balance(&user.id).await.unwrap();
    assert_eq!(balance.spent_confirmed, 20150);
}

#[tokio::test]
async fn deny_discards_pending_confirmation() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/layanan/price_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(price_list_body()))
        .mount(&h.atlantic)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            r#"{"intent":"topup_create","slots":{"code":"TSEL20","target":"0812"}}"#,
        )))
        .expect(1)
        .mount(&h.gemini)
        .await;
    // No /transaksi/create mock: a create call would fail the test.

    h.engine.handle_inbound(inbound("beli TSEL20 ke 0812")).await;
    h.engine.handle_inbound(inbound("batal")).await;

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].1.contains("dibatalkan"));
}

#[tokio::test]
async fn budget_filter_lists_affordable_items() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/layanan/price_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(price_list_body()))
        .mount(&h.atlantic)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            r#"{"intent":"budget_filter","slots":{"budget":11000}}"#,
        )))
        .mount(&h.gemini)
        .await;

    h.engine.handle_inbound(inbound("saya cuma punya 11rb")).await;

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("TSEL10"), "got: {}", sent[0].1);
    assert!(!sent[0].1.contains("TSEL20"));
}

async fn seed_user_and_awaiting_order(
    store: &Store,
) -> (String, String) {
    let user = store
        .upsert_user_by_wa(UserProfile {
            wa_id: "628123".into(),
            wa_jid: Some("628123@s.whatsapp.net".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    store
        .insert_deposit(Deposit {
            id: String::new(),
            user_id: user.id.clone(),
            deposit_ref: "D-1".into(),
            method: "QRIS".into(),
            amount: 50000,
            status: "pending".into(),
            metadata: None,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
        .unwrap();

    let order_ref = format!("{}:1750000000000:ab12", user.id);
    store
        .insert_order(Order {
            id: String::new(),
            user_id: user.id.clone(),
            order_ref: order_ref.clone(),
            product_code: "TSEL20".into(),
            amount: 20150,
            fee: 0,
            status: "awaiting_payment".into(),
            metadata: Some(json!({"deposit_ref": "D-1", "code": "TSEL20", "target": "0812"})),
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
        .unwrap();

    (user.id, order_ref)
}

fn deposit_event(status: &str) -> WebhookEvent {
    WebhookEvent {
        kind: EventKind::Deposit,
        raw_kind: "deposit".into(),
        headers: Default::default(),
        payload: serde_json::to_vec(&json!({
            "event": "deposit",
            "reff_id": "D-1",
            "status": status,
            "nominal": 50000
        }))
        .unwrap(),
        received_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn deposit_settlement_advances_awaiting_orders_once() {
    let h = harness().await;
    let (_user_id, order_ref) = seed_user_and_awaiting_order(&h.store).await;

    Mock::given(method("POST"))
        .and(path("/transaksi/create"))
        .and(body_string_contains("code=TSEL20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "ok",
            "data": {"reff_id": "x", "status": "sukses", "sn": "SN777"}
        })))
        .expect(1)
        .mount(&h.atlantic)
        .await;

    let processor = SettlementProcessor::new(
        Arc::clone(&h.store),
        Arc::new(
            AtlanticClient::new(
                ClientConfig {
                    base_url: h.atlantic.uri(),
                    api_key: "atl-key".into(),
                    timeout: Duration::from_secs(5),
                    price_ttl: Duration::from_secs(60),
                },
                None,
            )
            .unwrap(),
        ),
        h.transport.clone(),
    );

    processor.handle_event(deposit_event("sukses")).await.unwrap();

    let deposit = h.store.get_deposit_by_ref("D-1").await.unwrap();
    assert_eq!(deposit.status, "success");
    let order = h.store.get_order_by_ref(&order_ref).await.unwrap();
    assert_eq!(order.status, "success");
    assert_eq!(order.metadata.unwrap()["sn"], "SN777");

    // Users hear about the settled deposit and the finished order.
    let sent = h.transport.sent().await;
    assert!(sent.iter().any(|(_, text)| text.contains("SN777")));
    assert!(sent.iter().any(|(_, text)| text.contains("Top up")));

    // A duplicate delivery is a no-op: deposit already terminal, no
    // awaiting orders remain, and the create mock allows one hit only.
    processor.handle_event(deposit_event("sukses")).await.unwrap();
    let order = h.store.get_order_by_ref(&order_ref).await.unwrap();
    assert_eq!(order.status, "success");
}

#[tokio::test]
async fn failed_deposit_fails_dependent_orders() {
    let h = harness().await;
    let (_user_id, order_ref) = seed_user_and_awaiting_order(&h.store).await;

    let processor = h.engine.settlement_processor();
    processor.handle_event(deposit_event("expired")).await.unwrap();

    let deposit = h.store.get_deposit_by_ref("D-1").await.unwrap();
    assert_eq!(deposit.status, "failed");
    let order = h.store.get_order_by_ref(&order_ref).await.unwrap();
    assert_eq!(order.status, "failed");
}

#[tokio::test]
async fn deposit_event_upserts_when_row_is_missing() {
    let h = harness().await;
    let user = h
        .store
        .upsert_user_by_wa(UserProfile {
            wa_id: "628123".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    // Reference in the canonical shape: the processor can recover the
    // owning user even though the local insert never happened.
    let reference = format!("{}:1750000000001:ff01", user.id);
    let event = WebhookEvent {
        kind: EventKind::Deposit,
        raw_kind: "deposit".into(),
        headers: Default::default(),
        payload: serde_json::to_vec(&json!({
            "reff_id": reference,
            "status": "pending",
            "nominal": "75,000",
            "metode": "QRIS"
        }))
        .unwrap(),
        received_at: chrono::Utc::now(),
    };

    let processor = h.engine.settlement_processor();
    processor.handle_event(event).await.unwrap();

    let deposit = h.store.get_deposit_by_ref(&reference).await.unwrap();
    assert_eq!(deposit.status, "pending");
    assert_eq!(deposit.amount, 75000);
    assert_eq!(deposit.method, "QRIS");
}
