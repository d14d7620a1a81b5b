//! Data models for identities, connections, messages, and events.

pub mod event;
pub mod identity;
pub mod message;
pub mod presence;

pub use event::*;
pub use identity::*;
pub use message::*;
pub use presence::*;
