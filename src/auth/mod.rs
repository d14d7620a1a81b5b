//! Authentication: JWT verify/mint, revocation, and the connection authenticator.

mod authenticator;
mod handlers;
mod jwt;

pub use authenticator::{ConnectionAuthenticator, TokenRejection, VerifiedToken};
pub use handlers::logout;
pub use jwt::{Claims, JwtSecret};
