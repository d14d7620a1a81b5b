//! Chat message fan-out: validate, persist, then deliver to the room.

use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::ValidateLength;

use super::membership::MembershipValidator;
use super::presence::PresenceRegistry;
use crate::error::EventError;
use crate::models::{ChatMessage, Identity, MessageType, NewMessage, RoomId, ServerEvent};
use crate::repositories::MessageStore;

#[derive(Clone)]
pub struct MessageBroadcaster {
    store: Arc<dyn MessageStore>,
    membership: MembershipValidator,
    presence: PresenceRegistry,
    max_len: u64,
}

impl MessageBroadcaster {
    pub fn new(
        store: Arc<dyn MessageStore>,
        membership: MembershipValidator,
        presence: PresenceRegistry,
        max_len: u64,
    ) -> Self {
        Self {
            store,
            membership,
            presence,
            max_len,
        }
    }

    fn validate_content(&self, content: &str) -> Result<String, EventError> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(EventError::ValidationFailed(
                "Message content is required".to_string(),
            ));
        }
        if !content.validate_length(None, Some(self.max_len), None) {
            return Err(EventError::ValidationFailed(format!(
                "Message content must be at most {} characters",
                self.max_len
            )));
        }
        Ok(content)
    }

    /// Persist the message, then deliver it to every connection present in the room,
    /// sender included. Nothing is delivered unless the store accepted the message.
    #[instrument(skip(self, sender, content), fields(user_id = %sender.user_id()))]
    pub async fn send(
        &self,
        sender: &Identity,
        room_id: &RoomId,
        chat_id: Uuid,
        content: &str,
        message_type: MessageType,
    ) -> Result<ChatMessage, EventError> {
        let content = self.validate_content(content)?;
        self.membership.require_member(sender.user_id(), room_id).await?;

        let draft = NewMessage {
            room_id: room_id.clone(),
            chat_id,
            sender_id: sender.user_id(),
            content,
            message_type,
        };
        let message = match self.store.create_message(&draft).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                return Err(EventError::ValidationFailed(
                    "Chat does not belong to this room".to_string(),
                ))
            }
            Err(e) => {
                error!(error = %e, "failed to persist message");
                return Err(EventError::PersistenceFailed);
            }
        };

        let delivered = self
            .presence
            .broadcast(room_id, ServerEvent::new_message(&message, room_id, sender), None)
            .await;
        info!(message_id = %message.id, delivered, "message sent");
        Ok(message)
    }
}
