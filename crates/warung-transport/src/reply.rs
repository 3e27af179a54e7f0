// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ambient reply-quote scope.
//!
//! When a turn runs inside [`with_reply`], outbound text sent anywhere
//! below it quotes the referenced inbound message by id, sender, and
//! chat. Outside a scope, sends are plain messages.

use tokio::task_local;

/// Metadata needed to quote an inbound message.
#[derive(Debug, Clone)]
pub struct ReplyMeta {
    pub message_id: String,
    pub sender_jid: String,
    pub chat_jid: String,
}

task_local! {
    static REPLY_SCOPE: ReplyMeta;
}

/// Run `fut` with an active reply scope.
pub async fn with_reply<F>(meta: ReplyMeta, fut: F) -> F::Output
where
    F: std::future::Future,
{
    REPLY_SCOPE.scope(meta, fut).await
}

/// The reply metadata of the current scope, if any.
pub fn current_reply() -> Option<ReplyMeta> {
    REPLY_SCOPE.try_with(|meta| meta.clone()).ok()
}
