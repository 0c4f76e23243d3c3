use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::hub::Hub;
use super::session::{InboundHandler, SessionContext};
use crate::constants::{DEFAULT_MESSAGE_PAGE_SIZE, MAX_MESSAGE_CHARS, MAX_MESSAGE_PAGE_SIZE};
use crate::db::Store;
use crate::error::MatchError;
use crate::models::{
    ChatPayload, Conversation, Envelope, Event, Identity, MatchStatus, Message, MessageEvent, MessageKind,
    MessagePage, TypingEvent, TypingPayload,
};

/// Chat relay between the two parties of a matched pair.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn Store>,
    hub: Hub,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>, hub: Hub) -> Self {
        Self { store, hub }
    }

    pub async fn send_message(
        &self,
        sender: Identity,
        match_id: Uuid,
        content: &str,
    ) -> Result<Message, MatchError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MatchError::Validation("message content is empty".to_string()));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(MatchError::Validation(format!(
                "message content exceeds {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let summary = self
            .store
            .match_for_party(match_id, sender.user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("match {}", match_id)))?;
        if summary.record.status != MatchStatus::Matched {
            return Err(MatchError::Conflict(format!(
                "match {} is {}, chat needs a matched pair",
                match_id,
                summary.record.status.as_str()
            )));
        }

        // the store re-checks the status, so a concurrent unmatch still wins
        let message = self
            .store
            .insert_message(match_id, sender.user_id, MessageKind::Text, content)
            .await?
            .ok_or_else(|| MatchError::Conflict(format!("match {} is no longer matched", match_id)))?;

        if let Some(recipient) = summary.record.counterpart_of(sender.user_id) {
            self.hub.send_to(
                recipient,
                &Event::Message(MessageEvent {
                    match_id,
                    message_id: message.id,
                    sender_id: message.sender_id,
                    content: message.content.clone(),
                    created_at: message.created_at,
                }),
            );
        }
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        reader: Identity,
        match_id: Uuid,
        page: &MessagePage,
    ) -> Result<Vec<Message>, MatchError> {
        let limit = page
            .limit
            .unwrap_or(DEFAULT_MESSAGE_PAGE_SIZE)
            .clamp(1, MAX_MESSAGE_PAGE_SIZE);
        let offset = page.offset.unwrap_or(0).max(0);

        self.store
            .list_messages(match_id, reader.user_id, limit, offset)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("match {}", match_id)))
    }

    /// Inbox of matched pairs for polling clients, most recent activity first.
    pub async fn conversations(&self, reader: Identity) -> Result<Vec<Conversation>, MatchError> {
        self.store.list_conversations(reader).await
    }

    pub async fn mark_read(&self, reader: Identity, match_id: Uuid) -> Result<u64, MatchError> {
        self.store
            .mark_read(match_id, reader.user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("match {}", match_id)))
    }

    async fn relay_typing(&self, sender: Identity, payload: TypingPayload) -> Result<(), MatchError> {
        let Some(summary) = self
            .store
            .match_for_party(payload.match_id, sender.user_id)
            .await?
        else {
            return Err(MatchError::NotFound(format!("match {}", payload.match_id)));
        };
        if summary.record.status != MatchStatus::Matched {
            return Ok(());
        }

        if let Some(recipient) = summary.record.counterpart_of(sender.user_id) {
            self.hub.send_to(
                recipient,
                &Event::Typing(TypingEvent {
                    match_id: payload.match_id,
                    user_id: sender.user_id,
                    is_typing: payload.is_typing.unwrap_or(true),
                }),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl InboundHandler for ChatService {
    async fn handle(&self, session: &SessionContext, envelope: Envelope) {
        let sender = session.identity;
        let result = match envelope.kind.as_str() {
            "typing" => match serde_json::from_value::<TypingPayload>(envelope.payload) {
                Ok(payload) => self.relay_typing(sender, payload).await,
                Err(error) => Err(MatchError::Validation(error.to_string())),
            },
            "message" => match serde_json::from_value::<ChatPayload>(envelope.payload) {
                Ok(payload) => self
                    .send_message(sender, payload.match_id, &payload.content)
                    .await
                    .map(|_| ()),
                Err(error) => Err(MatchError::Validation(error.to_string())),
            },
            other => {
                debug!(session_id = session.session_id, kind = other, "ignoring inbound envelope");
                Ok(())
            }
        };

        if let Err(error) = result {
            warn!(
                user_id = %sender.user_id,
                session_id = session.session_id,
                %error,
                "inbound envelope rejected"
            );
        }
    }
}
