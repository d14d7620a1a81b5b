//! Real-time core: presence, membership checks, message and typing fan-out, departures.

pub mod broadcast;
pub mod membership;
pub mod presence;
pub mod reconcile;
pub mod session;
pub mod typing;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::MessageBroadcaster;
pub use membership::MembershipValidator;
pub use presence::{PresenceError, PresenceRegistry, Superseded};
pub use reconcile::DisconnectReconciler;
pub use session::{Realtime, Session};
pub use typing::TypingRelay;
