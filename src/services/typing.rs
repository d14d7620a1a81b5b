//! Typing indicators: ephemeral, never persisted, best-effort.

use tracing::debug;
use uuid::Uuid;

use super::presence::PresenceRegistry;
use crate::models::{ConnectionId, Identity, RoomId, ServerEvent};

#[derive(Clone)]
pub struct TypingRelay {
    presence: PresenceRegistry,
}

impl TypingRelay {
    pub fn new(presence: PresenceRegistry) -> Self {
        Self { presence }
    }

    /// Forward a typing signal to everyone else in the room. Only the identity's live
    /// connection, present in the room, may relay; anything else is dropped silently.
    pub async fn relay(
        &self,
        identity: &Identity,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        chat_id: Uuid,
        is_typing: bool,
    ) -> usize {
        if !self
            .presence
            .is_present(identity.user_id(), connection_id, room_id)
            .await
        {
            debug!(user_id = %identity.user_id(), room = %room_id, "typing dropped: not present");
            return 0;
        }
        self.presence
            .broadcast(
                room_id,
                ServerEvent::user_typing(identity, chat_id, is_typing),
                Some(identity.user_id()),
            )
            .await
    }
}
