//! Room membership check, re-run before every room-affecting action.

use std::sync::Arc;
use tracing::{error, instrument, warn};

use crate::error::EventError;
use crate::models::{RoomId, UserId};
use crate::repositories::MembershipStore;

/// Never cached: membership can be revoked between join and any later action.
#[derive(Clone)]
pub struct MembershipValidator {
    store: Arc<dyn MembershipStore>,
}

impl MembershipValidator {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    pub async fn is_member(&self, user_id: UserId, room_id: &RoomId) -> Result<bool, EventError> {
        self.store
            .is_active_member(user_id, room_id)
            .await
            .map_err(|e| {
                error!(error = %e, "membership lookup failed");
                EventError::InternalFailure
            })
    }

    /// `Ok(())` if the user may act in the room, `NotAMember` otherwise.
    #[instrument(skip(self))]
    pub async fn require_member(&self, user_id: UserId, room_id: &RoomId) -> Result<(), EventError> {
        if self.is_member(user_id, room_id).await? {
            Ok(())
        } else {
            warn!("action rejected: not a member");
            Err(EventError::NotAMember)
        }
    }
}
