use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::AuthToken;
use crate::domain::auth::models::AuthenticateUserCommand;
use crate::domain::auth::models::AuthenticationOutcome;
use crate::domain::auth::models::LogoutCommand;
use crate::domain::auth::models::RefreshTokenCommand;
use crate::domain::auth::models::RegisterUserCommand;
use crate::domain::auth::models::RegisteredUser;
use crate::domain::auth::models::SecurityContext;
use crate::domain::auth::models::TokenId;
use crate::domain::auth::models::TokenType;
use crate::domain::errors::RepositoryError;
use crate::user::models::UserId;

/// Port for authentication orchestration.
#[async_trait]
pub trait AuthenticationServicePort: Send + Sync + 'static {
    /// Register a new user.
    ///
    /// # Errors
    /// * `Validation` - One or more fields failed validation; all failures
    ///   are reported together
    /// * `UserAlreadyExists` - Username or email is already taken
    /// * `Database` / `Timeout` - Store operation failed
    async fn register(&self, command: RegisterUserCommand) -> Result<RegisteredUser, AuthError>;

    /// Authenticate with username or email plus password and issue a token
    /// pair.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown identifier or wrong password; the
    ///   two cases are indistinguishable to the caller
    /// * `UserInactive` - Credentials are correct but the account is
    ///   deactivated
    /// * `Database` / `Timeout` - Store operation failed
    async fn authenticate(
        &self,
        command: AuthenticateUserCommand,
    ) -> Result<AuthenticationOutcome, AuthError>;

    /// Exchange a refresh token for a new token pair, consuming it.
    ///
    /// # Errors
    /// * `TokenExpired` - Refresh token expiry is in the past
    /// * `TokenRevoked` - Refresh token was revoked
    /// * `TokenInvalid` - Bad signature, wrong type, unknown to the ledger,
    ///   or already consumed
    /// * `UserNotFound` - Subject no longer exists
    /// * `UserInactive` - Subject account is deactivated
    async fn refresh_tokens(
        &self,
        command: RefreshTokenCommand,
    ) -> Result<AuthenticationOutcome, AuthError>;

    /// Revoke the presented refresh token. Best effort: an unknown or
    /// already-dead token is not an error.
    async fn logout(&self, command: LogoutCommand) -> Result<(), AuthError>;

    /// Revoke every active token for a user. Returns the number revoked.
    async fn revoke_all_sessions(&self, user_id: &UserId) -> Result<u64, AuthError>;

    /// Full token history for a user.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    async fn tokens_for_user(&self, user_id: &UserId) -> Result<Vec<AuthToken>, AuthError>;
}

/// Port for per-request authorization decisions.
#[async_trait]
pub trait AuthorizationServicePort: Send + Sync + 'static {
    /// Build the security context for a request.
    ///
    /// A missing or invalid credential yields the anonymous context, never
    /// an error; only infrastructure failures are errors. Rejection happens
    /// later at the guards, so context construction cannot leak why a
    /// credential was bad.
    async fn security_context(
        &self,
        bearer_token: Option<&str>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<SecurityContext, AuthError>;

    /// # Errors
    /// * `UnauthorizedAccess` - Context is anonymous
    fn require_authentication(&self, context: &SecurityContext) -> Result<(), AuthError>;

    /// # Errors
    /// * `UnauthorizedAccess` - Context is anonymous
    /// * `InsufficientPermissions` - Authenticated but lacking the permission
    fn require_permission(
        &self,
        context: &SecurityContext,
        permission: &str,
    ) -> Result<(), AuthError>;

    fn require_any_permission(
        &self,
        context: &SecurityContext,
        permissions: &[&str],
    ) -> Result<(), AuthError>;

    fn require_all_permissions(
        &self,
        context: &SecurityContext,
        permissions: &[&str],
    ) -> Result<(), AuthError>;
}

/// Durable record of every issued token.
///
/// `mark_token_as_used` and `revoke_token` are the only mutations and both
/// are single atomic conditional transitions: a token already used or
/// revoked cannot be re-marked, and the return value reports whether the
/// transition actually occurred. This is the primitive that prevents
/// refresh-token replay, so implementations must not use read-then-write.
#[async_trait]
pub trait TokenLedger: Send + Sync + 'static {
    async fn save(&self, token: AuthToken) -> Result<AuthToken, RepositoryError>;

    async fn find_by_token(&self, value: &str) -> Result<Option<AuthToken>, RepositoryError>;

    /// Tokens for a user and type that are neither used, revoked, nor
    /// past expiry.
    async fn find_valid_by_user_and_type(
        &self,
        user_id: &UserId,
        token_type: TokenType,
    ) -> Result<Vec<AuthToken>, RepositoryError>;

    /// Atomically transition a token to used. Returns whether this call won
    /// the transition; `false` means the token was already used or revoked.
    async fn mark_token_as_used(&self, id: &TokenId) -> Result<bool, RepositoryError>;

    /// Atomically transition a token to revoked. Returns whether this call
    /// won the transition.
    async fn revoke_token(&self, id: &TokenId) -> Result<bool, RepositoryError>;

    /// Revoke every still-active token for a user. Returns the number of
    /// tokens revoked.
    async fn revoke_all_user_tokens(&self, user_id: &UserId) -> Result<u64, RepositoryError>;

    /// Revoke every still-active token of one type for a user.
    async fn revoke_user_tokens_by_type(
        &self,
        user_id: &UserId,
        token_type: TokenType,
    ) -> Result<u64, RepositoryError>;

    /// Delete rows whose expiry is in the past. Returns the number deleted.
    async fn cleanup_expired_tokens(&self) -> Result<u64, RepositoryError>;

    /// Every ledger row for a user, regardless of state.
    async fn find_all_for_user(&self, user_id: &UserId) -> Result<Vec<AuthToken>, RepositoryError>;

    /// Delete used rows whose `used_at` predates the cutoff. Returns the
    /// number deleted.
    async fn delete_used_tokens_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}
