//! Users, organizations and memberships

use crate::core::models::{IssuedToken, OrgRole, Organization, User};
use crate::core::naming;
use crate::core::service::{FieldErrors, ServiceError};
use crate::core::store::MetadataStore;
use crate::core::tokens::TokenService;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::ValidateEmail;

pub struct AccountService {
    store: Arc<dyn MetadataStore>,
    tokens: Arc<TokenService>,
}

/// Registration result: the account plus its first token
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user: User,
    pub token: IssuedToken,
}

impl AccountService {
    pub fn new(store: Arc<dyn MetadataStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    /// Create a user and issue a first token
    pub async fn register_user(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Registration, ServiceError> {
        let email = email.trim();
        let mut errors = FieldErrors::new();
        if !email.validate_email() {
            errors.add("email", format!("Invalid email address '{}'", email));
        }
        if !naming::is_valid_username(username) {
            errors.add(
                "username",
                "Username must be 2-39 characters of letters, digits, '-' or '_' \
                 and start with a letter or digit",
            );
        }
        errors.into_result()?;

        let user = self.store.create_user(email, username).await?;
        let token = self.tokens.issue_token(user.id, Some("initial")).await?;
        info!("Registered user {} ({})", user.username, user.id);
        Ok(Registration { user, token })
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn memberships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Organization, OrgRole)>, ServiceError> {
        self.store.list_memberships(user_id).await
    }

    /// Create an organization owned by `owner`
    pub async fn create_organization(
        &self,
        owner: Uuid,
        name: &str,
    ) -> Result<Organization, ServiceError> {
        naming::validate_org_name(name)?;
        let org = self.store.create_organization(name, owner).await?;
        info!("Created organization {} owned by {}", org.name, owner);
        Ok(org)
    }

    pub async fn get_organization(&self, name: &str) -> Result<Organization, ServiceError> {
        naming::validate_org_name(name)?;
        self.store
            .find_organization(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization '{}' not found", name)))
    }

    /// Add `username` to `org`. Only owners may do this.
    pub async fn add_member(
        &self,
        actor: Uuid,
        org: &str,
        username: &str,
        role: OrgRole,
    ) -> Result<(), ServiceError> {
        let organization = self.get_organization(org).await?;

        let actor_role = self.store.member_role(organization.id, actor).await?;
        if !actor_role.is_some_and(|r| r.can_manage_members()) {
            return Err(ServiceError::Forbidden(format!(
                "Only owners of '{}' can add members",
                org
            )));
        }

        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User '{}' not found", username)))?;

        self.store.add_member(organization.id, user.id, role).await?;
        info!("Added {} to {} as {}", user.username, organization.name, role);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::core::store::SqliteStore;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, AccountService) {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn MetadataStore> =
            Arc::new(SqliteStore::open(dir.path().join("registry.db")).await.unwrap());
        let tokens = Arc::new(TokenService::new(store.clone()));
        (dir, AccountService::new(store, tokens))
    }

    #[tokio::test]
    async fn test_email_rule_matches_request_validation() {
        let (_dir, accounts) = setup().await;
        for bad in ["", "a", "@example.com", "a@.com", "a b@example.com"] {
            match accounts.register_user(bad, "alice").await {
                Err(ServiceError::Validation(errors)) => assert!(errors.contains("email")),
                other => panic!("{bad:?} should be rejected, got {:?}", other.map(|r| r.user)),
            }
        }
        accounts.register_user("a@example.com", "alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_register_returns_working_token() {
        let (_dir, accounts) = setup().await;
        let registration = accounts.register_user("a@example.com", "alice").await.unwrap();
        assert_eq!(registration.token.raw_token.len(), 64);
        assert_eq!(registration.token.token.user_id, registration.user.id);

        let again = accounts.register_user("a@example.com", "alice").await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_reports_every_invalid_field() {
        let (_dir, accounts) = setup().await;
        match accounts.register_user("nope", "-").await {
            Err(ServiceError::Validation(errors)) => {
                assert!(errors.contains("email"));
                assert!(errors.contains("username"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|r| r.user)),
        }
    }

    #[tokio::test]
    async fn test_only_owner_adds_members() {
        let (_dir, accounts) = setup().await;
        let owner = accounts.register_user("o@example.com", "owner").await.unwrap().user;
        let member = accounts.register_user("m@example.com", "member").await.unwrap().user;
        let outsider = accounts.register_user("x@example.com", "outsider").await.unwrap().user;

        accounts.create_organization(owner.id, "acme").await.unwrap();
        accounts
            .add_member(owner.id, "acme", "member", OrgRole::Member)
            .await
            .unwrap();

        let by_member = accounts
            .add_member(member.id, "acme", "outsider", OrgRole::Member)
            .await;
        assert!(matches!(by_member, Err(ServiceError::Forbidden(_))));

        let by_outsider = accounts
            .add_member(outsider.id, "acme", "outsider", OrgRole::Owner)
            .await;
        assert!(matches!(by_outsider, Err(ServiceError::Forbidden(_))));

        let unknown_user = accounts
            .add_member(owner.id, "acme", "ghost", OrgRole::Member)
            .await;
        assert!(matches!(unknown_user, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_org_name_is_validated() {
        let (_dir, accounts) = setup().await;
        let owner = accounts.register_user("o@example.com", "owner").await.unwrap().user;
        let result = accounts.create_organization(owner.id, "Acme_Corp").await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
