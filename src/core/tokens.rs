//! API token issuance and verification
//!
//! Raw tokens are 32 random bytes, hex encoded. Only the SHA-256 of the raw
//! token reaches the metadata store, so a leaked database cannot be replayed
//! against the API.

use crate::core::checksum;
use crate::core::models::{ApiToken, IssuedToken};
use crate::core::service::ServiceError;
use crate::core::store::MetadataStore;
use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use uuid::Uuid;

/// Raw token length in bytes before hex encoding
pub const TOKEN_BYTES: usize = 32;

/// 64 hex characters from the OS CSPRNG
pub fn generate_secret() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of the raw token, lower-case hex
pub fn hash_token(raw: &str) -> String {
    checksum::checksum(raw.as_bytes())
}

/// Constant-time equality for secrets
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

pub fn is_token_format(raw: &str) -> bool {
    raw.len() == TOKEN_BYTES * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

pub struct TokenService {
    store: Arc<dyn MetadataStore>,
}

impl TokenService {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Create a token for `user_id`. The raw value is only ever returned here.
    pub async fn issue_token(
        &self,
        user_id: Uuid,
        label: Option<&str>,
    ) -> Result<IssuedToken, ServiceError> {
        let raw_token = generate_secret();
        let token = self
            .store
            .insert_token(user_id, &hash_token(&raw_token), label)
            .await?;
        debug!("Issued token {} for user {}", token.id, user_id);
        Ok(IssuedToken { raw_token, token })
    }

    /// Resolve a raw bearer token to its user.
    ///
    /// Malformed, unknown and revoked tokens all fail with the same
    /// `Unauthorized`.
    pub async fn verify_token(&self, raw: &str) -> Result<Uuid, ServiceError> {
        let raw = raw.trim().to_ascii_lowercase();
        if !is_token_format(&raw) {
            return Err(ServiceError::Unauthorized);
        }

        let computed = hash_token(&raw);
        let stored = self
            .store
            .find_token_by_hash(&computed)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        if !secure_compare(stored.token_hash.as_bytes(), computed.as_bytes()) {
            return Err(ServiceError::Unauthorized);
        }

        let token_id = stored.token.id;
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_token(token_id, Utc::now()).await {
                warn!("Failed to record token use for {}: {}", token_id, e);
            }
        });

        Ok(stored.token.user_id)
    }

    /// Delete a token owned by `requesting_user`
    pub async fn revoke_token(
        &self,
        token_id: Uuid,
        requesting_user: Uuid,
    ) -> Result<(), ServiceError> {
        let token = self
            .store
            .get_token(token_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Token {} not found", token_id)))?;

        if token.user_id != requesting_user {
            return Err(ServiceError::Forbidden(
                "Tokens can only be revoked by their owner".to_string(),
            ));
        }

        // A concurrent revoke may have won; the token is gone either way
        self.store.delete_token(token_id).await?;
        debug!("Revoked token {}", token_id);
        Ok(())
    }

    pub async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<ApiToken>, ServiceError> {
        self.store.list_tokens(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::store::SqliteStore;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<dyn MetadataStore>, TokenService) {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn MetadataStore> =
            Arc::new(SqliteStore::open(dir.path().join("registry.db")).await.unwrap());
        let tokens = TokenService::new(store.clone());
        (dir, store, tokens)
    }

    #[test]
    fn test_generated_secret_shape() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_secure_compare() {
        assert!(secure_compare(b"abc", b"abc"));
        assert!(!secure_compare(b"abc", b"abd"));
        assert!(!secure_compare(b"abc", b"abcd"));
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let (_dir, store, tokens) = setup().await;
        let user = store.create_user("a@example.com", "alice").await.unwrap();

        let issued = tokens.issue_token(user.id, Some("laptop")).await.unwrap();
        assert_eq!(issued.raw_token.len(), 64);
        assert_eq!(tokens.verify_token(&issued.raw_token).await.unwrap(), user.id);

        // The raw token is never persisted
        let stored = store
            .find_token_by_hash(&hash_token(&issued.raw_token))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.token_hash, issued.raw_token);
    }

    #[tokio::test]
    async fn test_malformed_unknown_and_revoked_look_the_same() {
        let (_dir, store, tokens) = setup().await;
        let user = store.create_user("a@example.com", "alice").await.unwrap();
        let issued = tokens.issue_token(user.id, None).await.unwrap();
        tokens.revoke_token(issued.token.id, user.id).await.unwrap();

        let revoked = tokens.verify_token(&issued.raw_token).await.unwrap_err();
        let unknown = tokens.verify_token(&generate_secret()).await.unwrap_err();
        let malformed = tokens.verify_token("short").await.unwrap_err();

        for err in [revoked, unknown, malformed] {
            assert!(matches!(err, ServiceError::Unauthorized));
        }
    }

    #[tokio::test]
    async fn test_revoke_requires_ownership() {
        let (_dir, store, tokens) = setup().await;
        let alice = store.create_user("a@example.com", "alice").await.unwrap();
        let bob = store.create_user("b@example.com", "bob").await.unwrap();
        let issued = tokens.issue_token(alice.id, None).await.unwrap();

        let result = tokens.revoke_token(issued.token.id, bob.id).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));

        let missing = tokens.revoke_token(Uuid::new_v4(), alice.id).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        assert_eq!(tokens.verify_token(&issued.raw_token).await.unwrap(), alice.id);
    }

    #[tokio::test]
    async fn test_list_tokens_is_per_user() {
        let (_dir, store, tokens) = setup().await;
        let alice = store.create_user("a@example.com", "alice").await.unwrap();
        let bob = store.create_user("b@example.com", "bob").await.unwrap();
        tokens.issue_token(alice.id, Some("one")).await.unwrap();
        tokens.issue_token(alice.id, Some("two")).await.unwrap();
        tokens.issue_token(bob.id, None).await.unwrap();

        assert_eq!(tokens.list_tokens(alice.id).await.unwrap().len(), 2);
        assert_eq!(tokens.list_tokens(bob.id).await.unwrap().len(), 1);
    }
}
