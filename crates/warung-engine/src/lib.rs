// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog engine: turns one inbound IM message into at most one external
//! effect and one outbound reply.
//!
//! Turns for the same user are serialized through a per-user session
//! lock; different users proceed in parallel. Risky actions never execute
//! directly — they become a pending confirmation that a follow-up
//! "ya"/"batal" resolves.

pub mod handlers;
pub mod reconcile;
pub mod refs;
pub mod replies;
pub mod session;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, warn};

use warung_atlantic::Client as AtlanticClient;
use warung_core::{MediaKind, WarungError};
use warung_gemini::{HistoryEntry, Intent, MediaInput, NluClient};
use warung_metrics::{record_error, record_incoming_message};
use warung_storage::{MessageRecord, Store, User, UserProfile};
use warung_transport::{with_reply, InboundMessage, ReplyMeta, Transport};

use crate::session::{parse_confirmation, SessionState};

pub use reconcile::SettlementProcessor;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deposit method offered when the user does not name one.
    pub deposit_method: String,
    /// Deposit type sent to the provider.
    pub deposit_type: String,
    /// Fallback fixed deposit fee, used when the provider omits the fee.
    pub deposit_fee_fixed: i64,
    /// Fallback percentage deposit fee (0.0-1.0).
    pub deposit_fee_percent: f64,
    /// How many recent messages feed the classifier as context.
    pub history_limit: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deposit_method: "QRIS".to_string(),
            deposit_type: "ewallet".to_string(),
            deposit_fee_fixed: 0,
            deposit_fee_percent: 0.0,
            history_limit: 10,
        }
    }
}

/// The conversation and transaction orchestrator.
pub struct Engine {
    pub(crate) store: Arc<Store>,
    pub(crate) atlantic: Arc<AtlanticClient>,
    pub(crate) nlu: Arc<NluClient>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: EngineConfig,
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
}

impl Engine {
    pub fn new(
        store: Arc<Store>,
        atlantic: Arc<AtlanticClient>,
        nlu: Arc<NluClient>,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            atlantic,
            nlu,
            transport,
            config,
            sessions: DashMap::new(),
        }
    }

    /// Build the settlement processor sharing this engine's collaborators.
    pub fn settlement_processor(&self) -> SettlementProcessor {
        SettlementProcessor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.atlantic),
            Arc::clone(&self.transport),
        )
    }

    fn session_for(&self, user_id: &str) -> Arc<Mutex<SessionState>> {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::default())))
            .clone()
    }

    /// Process one inbound message end to end. Never propagates errors to
    /// the transport loop; failures degrade to a logged error and, where
    /// possible, an apology reply.
    pub async fn handle_inbound(&self, msg: InboundMessage) {
        if let Err(e) = self.run_turn(&msg).await {
            error!(error = %e, sender = %msg.sender_wa_id, "turn failed");
            record_error("engine");
        }
    }

    async fn run_turn(&self, msg: &InboundMessage) -> Result<(), WarungError> {
        record_incoming_message(msg.kind.as_str());

        let user = self
            .store
            .upsert_user_by_wa(UserProfile {
                wa_id: msg.sender_wa_id.clone(),
                wa_jid: Some(msg.sender_jid.clone()),
                display_name: msg.push_name.clone(),
                ..Default::default()
            })
            .await?;

        self.store
            .insert_message(MessageRecord {
                user_id: user.id.clone(),
                direction: "inbound".to_string(),
                message_type: msg.kind.as_str().to_string(),
                content: msg.text.clone(),
                media_url: msg.media_ref.clone(),
                raw_payload: Some(msg.raw.clone()),
                created_at: String::new(),
            })
            .await?;

        // Serialize turns per user: the session lock is held for the whole
        // turn, so interleaved confirmations cannot happen.
        let session = self.session_for(&user.id);
        let mut session = session.lock().await;

        let reply = self.compute_reply(&user, &mut session, msg).await;

        let reply_meta = ReplyMeta {
            message_id: msg.message_id.clone(),
            sender_jid: msg.sender_jid.clone(),
            chat_jid: msg.chat_jid.clone(),
        };
        with_reply(reply_meta, self.transport.send_text(&msg.chat_jid, &reply)).await?;

        self.store
            .insert_message(MessageRecord {
                user_id: user.id.clone(),
                direction: "outbound".to_string(),
                message_type: MediaKind::Text.as_str().to_string(),
                content: Some(reply),
                media_url: None,
                raw_payload: None,
                created_at: String::new(),
            })
            .await?;

        Ok(())
    }

    /// The turn algorithm: confirmation short-circuit, then classify,
    /// then dispatch.
    async fn compute_reply(
        &self,
        user: &User,
        session: &mut SessionState,
        msg: &InboundMessage,
    ) -> String {
        let text = msg.text.clone().unwrap_or_default();

        if let Some(decision) = parse_confirmation(&text) {
            if let Some(pending) = session.take_fresh_pending() {
                if !decision {
                    return replies::CANCELLED.to_string();
                }
                return match handlers::execute_pending(self, user, session, pending.action).await
                {
                    Ok(reply) => reply,
                    Err(e) => self.error_reply(e),
                };
            }
            // No live confirmation: the token is an ordinary utterance.
        }

        let media = match msg.kind {
            MediaKind::Image | MediaKind::Audio => {
                match self.transport.download_media(msg).await {
                    Ok((bytes, mime)) => Some(MediaInput { bytes, mime }),
                    Err(e) => {
                        warn!(error = %e, "media download failed, classifying text only");
                        None
                    }
                }
            }
            _ => None,
        };

        let history: Vec<HistoryEntry> = match self
            .store
            .list_recent_messages(&user.id, self.config.history_limit)
            .await
        {
            Ok(records) => records
                .into_iter()
                .filter_map(|record| {
                    record.content.map(|text| HistoryEntry {
                        direction: record.direction,
                        text,
                    })
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "history lookup failed");
                Vec::new()
            }
        };

        let classification = match self.nlu.classify(&text, media.as_ref(), &history).await {
            Ok(classification) => classification,
            Err(e) if e.is_transient() => return replies::BUSY.to_string(),
            Err(WarungError::NoCredentialsAvailable) | Err(WarungError::QuotaExceeded(_)) => {
                record_error("nlu");
                return replies::BUSY.to_string();
            }
            Err(e) => {
                error!(error = %e, "classification failed");
                record_error("nlu");
                return replies::FALLBACK.to_string();
            }
        };

        // A recognized new intent supersedes a stale confirmation.
        if session.pending.is_some() && classification.intent != Intent::Unknown {
            session.pending = None;
        }
        session.last_intent = Some(classification.intent.as_str().to_string());
        session.last_media = msg.kind;

        match handlers::dispatch(self, user, session, &classification, &text).await {
            Ok(reply) => reply,
            Err(e) => self.error_reply(e),
        }
    }

    /// Map an orchestration error to the user-visible reply per the
    /// propagation rules.
    fn error_reply(&self, error: WarungError) -> String {
        match &error {
            WarungError::TransientUpstream(_) | WarungError::Timeout { .. } => {
                replies::BUSY.to_string()
            }
            WarungError::InvalidCredential(_) => {
                error!(error = %error, "upstream rejected our credential");
                record_error("atlantic_credential");
                replies::OUTAGE.to_string()
            }
            WarungError::InsufficientBalance(_) => {
                error!(error = %error, "provider balance exhausted");
                record_error("atlantic_balance");
                replies::OUTAGE.to_string()
            }
            _ => {
                error!(error = %error, "handler failed");
                record_error("engine");
                "Maaf, terjadi kesalahan. Coba lagi ya.".to_string()
            }
        }
    }
}
