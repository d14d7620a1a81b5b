//! Request extractors shared by authenticated HTTP routes.

pub mod auth;

pub use auth::AuthSession;
