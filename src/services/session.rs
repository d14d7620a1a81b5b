//! Per-connection protocol: dispatches typed client events to the real-time services.
//!
//! Connection lifecycle: `open` (authenticated, idle) -> `join-room` (in room, may hop
//! between rooms) -> `close` (terminated). Room membership only changes through the
//! presence registry.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::broadcast::MessageBroadcaster;
use super::membership::MembershipValidator;
use super::presence::{PresenceError, PresenceRegistry};
use super::reconcile::DisconnectReconciler;
use super::typing::TypingRelay;
use crate::error::EventError;
use crate::models::{
    ClientEvent, ConnectionHandle, ConnectionId, Identity, RoomId, RoomJoinedPayload,
    SendMessagePayload, ServerEvent, TypingPayload,
};
use crate::repositories::{MembershipStore, MessageStore};

/// The real-time core, shared by every connection.
#[derive(Clone)]
pub struct Realtime {
    pub presence: PresenceRegistry,
    pub membership: MembershipValidator,
    pub broadcaster: MessageBroadcaster,
    pub typing: TypingRelay,
    pub reconciler: DisconnectReconciler,
}

impl Realtime {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        messages: Arc<dyn MessageStore>,
        max_message_len: u64,
    ) -> Self {
        let presence = PresenceRegistry::new();
        let membership = MembershipValidator::new(memberships);
        let broadcaster =
            MessageBroadcaster::new(messages, membership.clone(), presence.clone(), max_message_len);
        Self {
            typing: TypingRelay::new(presence.clone()),
            reconciler: DisconnectReconciler::new(presence.clone()),
            presence,
            membership,
            broadcaster,
        }
    }
}

/// One authenticated connection. Events are handled in arrival order.
pub struct Session {
    realtime: Realtime,
    identity: Identity,
    connection: ConnectionHandle,
}

impl Session {
    /// Register the connection, superseding any older one for the same identity.
    pub async fn open(realtime: Realtime, identity: Identity, connection: ConnectionHandle) -> Self {
        if let Some(superseded) = realtime
            .presence
            .record_connect(identity.clone(), connection.clone())
            .await
        {
            realtime
                .reconciler
                .retract_superseded(&identity, superseded)
                .await;
        }
        Self {
            realtime,
            identity,
            connection,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connection_id(&self) -> &ConnectionId {
        self.connection.id()
    }

    pub async fn handle(&self, event: ClientEvent) {
        let result = match event {
            ClientEvent::JoinRoom { data } => self.join_room(&data.room_id).await,
            ClientEvent::SendMessage { data } => self.send_message(data).await,
            ClientEvent::TypingStart { data } => {
                self.relay_typing(&data, true).await;
                Ok(())
            }
            ClientEvent::TypingStop { data } => {
                self.relay_typing(&data, false).await;
                Ok(())
            }
            ClientEvent::Ping => {
                self.connection.deliver(ServerEvent::Pong);
                Ok(())
            }
        };
        if let Err(err) = result {
            self.reply_error(&err);
        }
    }

    /// Answer a frame that could not be parsed as a client event.
    pub fn reject_frame(&self, reason: &serde_json::Error) {
        debug!(connection_id = %self.connection.id(), error = %reason, "unparseable frame");
        self.reply_error(&EventError::ValidationFailed(format!(
            "Invalid event: {}",
            reason
        )));
    }

    fn reply_error(&self, err: &EventError) {
        self.connection.deliver(ServerEvent::from(err));
    }

    async fn join_room(&self, room: &RoomId) -> Result<(), EventError> {
        let user_id = self.identity.user_id();
        self.realtime.membership.require_member(user_id, room).await?;

        let presence = &self.realtime.presence;
        let previous = presence
            .move_to_room(user_id, self.connection.id(), room)
            .await
            .map_err(|_: PresenceError| {
                warn!(connection_id = %self.connection.id(), "join from inactive connection");
                EventError::InternalFailure
            })?;

        if previous.as_ref() != Some(room) {
            if let Some(prev) = &previous {
                presence
                    .broadcast(prev, ServerEvent::user_left(&self.identity), None)
                    .await;
            }
            presence
                .broadcast(room, ServerEvent::user_joined(&self.identity), Some(user_id))
                .await;
        }

        let online_users = presence.list_online(room).await;
        self.connection.deliver(ServerEvent::RoomJoined {
            data: RoomJoinedPayload {
                room_id: room.clone(),
                online_users,
            },
        });
        info!(user_id = %user_id, room = %room, previous = ?previous, "joined room");
        Ok(())
    }

    async fn relay_typing(&self, data: &TypingPayload, is_typing: bool) {
        self.realtime
            .typing
            .relay(
                &self.identity,
                self.connection.id(),
                &data.room_id,
                data.chat_id,
                is_typing,
            )
            .await;
    }

    async fn send_message(&self, data: SendMessagePayload) -> Result<(), EventError> {
        self.realtime
            .broadcaster
            .send(
                &self.identity,
                &data.room_id,
                data.chat_id,
                &data.content,
                data.message_type,
            )
            .await
            .map(|_| ())
    }

    /// Transport teardown. Returns true if a room was told about the departure.
    pub async fn close(&self) -> bool {
        self.realtime
            .reconciler
            .disconnect(&self.identity, self.connection.id())
            .await
    }
}
