use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::errors::RepositoryError;
use crate::user::models::Role;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::models::Username;

/// Persistence operations for the user aggregate.
///
/// All operations carry the pool's acquire timeout; a timeout surfaces as
/// `RepositoryError::Timeout`, never as an authentication decision.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Errors
    /// * `UniqueViolation` - Username or email is already taken
    /// * `Database` / `Timeout` - Store operation failed
    async fn create(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(&self, username: &Username)
        -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn exists_by_username(&self, username: &Username) -> Result<bool, RepositoryError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;

    /// Update mutable user fields (everything except the id).
    async fn update(&self, user: User) -> Result<User, RepositoryError>;

    /// Clear the active flag. Returns whether a row changed.
    async fn deactivate(&self, id: &UserId) -> Result<bool, RepositoryError>;
}

/// Role membership and permission resolution.
#[async_trait]
pub trait RoleRepository: Send + Sync + 'static {
    async fn get_user_roles(&self, user_id: &UserId) -> Result<Vec<Role>, RepositoryError>;

    /// Aggregated permission set across all of the user's roles.
    async fn get_user_permissions(
        &self,
        user_id: &UserId,
    ) -> Result<BTreeSet<String>, RepositoryError>;

    async fn user_has_permission(
        &self,
        user_id: &UserId,
        permission: &str,
    ) -> Result<bool, RepositoryError>;

    async fn assign_role(&self, user_id: &UserId, role_id: &str) -> Result<(), RepositoryError>;

    async fn remove_role(&self, user_id: &UserId, role_id: &str) -> Result<(), RepositoryError>;
}
