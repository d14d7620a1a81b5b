//! In-process revocation list, used when no Redis is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{token_fingerprint, RevocationList};
use crate::error::AppResult;

#[derive(Clone, Default)]
pub struct InMemoryRevocationList {
    /// fingerprint -> token expiry
    revoked: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }
}

#[async_trait]
impl RevocationList for InMemoryRevocationList {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp > now);
        if expires_at > now {
            revoked.insert(token_fingerprint(token), expires_at);
        }
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> AppResult<bool> {
        let revoked = self.revoked.read().await;
        Ok(revoked.contains_key(&token_fingerprint(token)))
    }
}
