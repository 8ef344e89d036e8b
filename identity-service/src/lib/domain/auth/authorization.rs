use std::sync::Arc;

use async_trait::async_trait;
use auth::TokenKind;
use auth::TokenSigner;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::SecurityContext;
use crate::domain::auth::ports::AuthorizationServicePort;
use crate::domain::auth::ports::TokenLedger;
use crate::user::models::UserId;
use crate::user::ports::RoleRepository;
use crate::user::ports::UserRepository;

/// Builds security contexts and enforces permission guards.
///
/// Context construction is deliberately forgiving: every way a credential
/// can be bad collapses into the anonymous context, and denial only happens
/// at the guards. Infrastructure failures are the one exception, so an
/// outage can never silently grant anonymous access to a failing check and
/// callers fail closed.
pub struct AuthorizationService<UR, RR, TL>
where
    UR: UserRepository,
    RR: RoleRepository,
    TL: TokenLedger,
{
    users: Arc<UR>,
    roles: Arc<RR>,
    tokens: Arc<TL>,
    signer: Arc<TokenSigner>,
}

impl<UR, RR, TL> AuthorizationService<UR, RR, TL>
where
    UR: UserRepository,
    RR: RoleRepository,
    TL: TokenLedger,
{
    pub fn new(users: Arc<UR>, roles: Arc<RR>, tokens: Arc<TL>, signer: Arc<TokenSigner>) -> Self {
        Self {
            users,
            roles,
            tokens,
            signer,
        }
    }
}

#[async_trait]
impl<UR, RR, TL> AuthorizationServicePort for AuthorizationService<UR, RR, TL>
where
    UR: UserRepository,
    RR: RoleRepository,
    TL: TokenLedger,
{
    async fn security_context(
        &self,
        bearer_token: Option<&str>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<SecurityContext, AuthError> {
        let Some(token) = bearer_token else {
            return Ok(SecurityContext::anonymous(ip_address, user_agent));
        };

        let claims = match self.signer.validate_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected bearer token: {}", e);
                return Ok(SecurityContext::anonymous(ip_address, user_agent));
            }
        };
        if !claims.is_kind(TokenKind::Access) {
            return Ok(SecurityContext::anonymous(ip_address, user_agent));
        }

        // The signature check alone cannot see revocation; consult the
        // ledger for tokens it knows about.
        if let Some(record) = self.tokens.find_by_token(token).await? {
            if !record.is_valid(Utc::now()) {
                return Ok(SecurityContext::anonymous(ip_address, user_agent));
            }
        }

        let Ok(user_id) = UserId::from_string(&claims.sub) else {
            return Ok(SecurityContext::anonymous(ip_address, user_agent));
        };
        let Some(user) = self.users.find_by_id(&user_id).await? else {
            return Ok(SecurityContext::anonymous(ip_address, user_agent));
        };
        if !user.active {
            return Ok(SecurityContext::anonymous(ip_address, user_agent));
        }

        let permissions = self.roles.get_user_permissions(&user_id).await?;

        Ok(SecurityContext::authenticated(
            &user,
            permissions,
            ip_address,
            user_agent,
        ))
    }

    fn require_authentication(&self, context: &SecurityContext) -> Result<(), AuthError> {
        if context.authenticated {
            Ok(())
        } else {
            Err(AuthError::UnauthorizedAccess)
        }
    }

    fn require_permission(
        &self,
        context: &SecurityContext,
        permission: &str,
    ) -> Result<(), AuthError> {
        self.require_authentication(context)?;
        if context.has_permission(permission) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }

    fn require_any_permission(
        &self,
        context: &SecurityContext,
        permissions: &[&str],
    ) -> Result<(), AuthError> {
        self.require_authentication(context)?;
        if context.has_any_permission(permissions) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }

    fn require_all_permissions(
        &self,
        context: &SecurityContext,
        permissions: &[&str],
    ) -> Result<(), AuthError> {
        self.require_authentication(context)?;
        if context.has_all_permissions(permissions) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::DateTime;
    use chrono::Duration;
    use mockall::mock;

    use super::*;
    use crate::domain::auth::models::AuthToken;
    use crate::domain::auth::models::TokenId;
    use crate::domain::auth::models::TokenType;
    use crate::domain::errors::RepositoryError;
    use crate::user::models::permissions;
    use crate::user::models::EmailAddress;
    use crate::user::models::Role;
    use crate::user::models::User;
    use crate::user::models::Username;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, RepositoryError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
            async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError>;
            async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
            async fn exists_by_username(&self, username: &Username) -> Result<bool, RepositoryError>;
            async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;
            async fn update(&self, user: User) -> Result<User, RepositoryError>;
            async fn deactivate(&self, id: &UserId) -> Result<bool, RepositoryError>;
        }
    }

    mock! {
        pub TestRoleRepository {}

        #[async_trait]
        impl RoleRepository for TestRoleRepository {
            async fn get_user_roles(&self, user_id: &UserId) -> Result<Vec<Role>, RepositoryError>;
            async fn get_user_permissions(&self, user_id: &UserId) -> Result<BTreeSet<String>, RepositoryError>;
            async fn user_has_permission(&self, user_id: &UserId, permission: &str) -> Result<bool, RepositoryError>;
            async fn assign_role(&self, user_id: &UserId, role_id: &str) -> Result<(), RepositoryError>;
            async fn remove_role(&self, user_id: &UserId, role_id: &str) -> Result<(), RepositoryError>;
        }
    }

    mock! {
        pub TestTokenLedger {}

        #[async_trait]
        impl TokenLedger for TestTokenLedger {
            async fn save(&self, token: AuthToken) -> Result<AuthToken, RepositoryError>;
            async fn find_by_token(&self, value: &str) -> Result<Option<AuthToken>, RepositoryError>;
            async fn find_valid_by_user_and_type(&self, user_id: &UserId, token_type: TokenType) -> Result<Vec<AuthToken>, RepositoryError>;
            async fn mark_token_as_used(&self, id: &TokenId) -> Result<bool, RepositoryError>;
            async fn revoke_token(&self, id: &TokenId) -> Result<bool, RepositoryError>;
            async fn revoke_all_user_tokens(&self, user_id: &UserId) -> Result<u64, RepositoryError>;
            async fn revoke_user_tokens_by_type(&self, user_id: &UserId, token_type: TokenType) -> Result<u64, RepositoryError>;
            async fn cleanup_expired_tokens(&self) -> Result<u64, RepositoryError>;
            async fn find_all_for_user(&self, user_id: &UserId) -> Result<Vec<AuthToken>, RepositoryError>;
            async fn delete_used_tokens_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
        }
    }

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes_long!";

    fn signer() -> Arc<TokenSigner> {
        Arc::new(TokenSigner::new(SECRET, "linkdeck"))
    }

    fn service(
        users: MockTestUserRepository,
        roles: MockTestRoleRepository,
        tokens: MockTestTokenLedger,
    ) -> AuthorizationService<MockTestUserRepository, MockTestRoleRepository, MockTestTokenLedger>
    {
        AuthorizationService::new(Arc::new(users), Arc::new(roles), Arc::new(tokens), signer())
    }

    fn user() -> User {
        User {
            id: UserId::new(),
            username: Username::new("alice").unwrap(),
            email: EmailAddress::new("alice@example.com").unwrap(),
            password_hash: "$argon2id$hash".to_string(),
            password_salt: "salt".to_string(),
            created_at: Utc::now(),
            last_login_at: None,
            active: true,
            first_name: None,
            last_name: None,
            role_ids: vec!["role-user".to_string()],
        }
    }

    fn access_token_for(user: &User) -> String {
        signer()
            .generate_access_token(&user.token_subject(), Utc::now() + Duration::minutes(15))
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_yields_anonymous() {
        let users = MockTestUserRepository::new();
        let roles = MockTestRoleRepository::new();
        let tokens = MockTestTokenLedger::new();

        let service = service(users, roles, tokens);
        let ctx = service
            .security_context(None, Some("10.0.0.1".to_string()), None)
            .await
            .unwrap();

        assert!(!ctx.authenticated);
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_garbage_token_yields_anonymous() {
        let users = MockTestUserRepository::new();
        let roles = MockTestRoleRepository::new();
        let tokens = MockTestTokenLedger::new();

        let service = service(users, roles, tokens);
        let ctx = service
            .security_context(Some("not.a.token"), None, None)
            .await
            .unwrap();

        assert!(!ctx.authenticated);
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_authenticate_requests() {
        let user = user();
        let refresh = signer()
            .generate_refresh_token(&user.token_subject(), Utc::now() + Duration::days(7))
            .unwrap();

        let users = MockTestUserRepository::new();
        let roles = MockTestRoleRepository::new();
        let tokens = MockTestTokenLedger::new();

        let service = service(users, roles, tokens);
        let ctx = service
            .security_context(Some(&refresh), None, None)
            .await
            .unwrap();

        assert!(!ctx.authenticated);
    }

    #[tokio::test]
    async fn test_valid_token_yields_authenticated_context() {
        let user = user();
        let user_id = user.id;
        let token = access_token_for(&user);

        let mut users = MockTestUserRepository::new();
        let mut roles = MockTestRoleRepository::new();
        let mut tokens = MockTestTokenLedger::new();

        tokens
            .expect_find_by_token()
            .times(1)
            .returning(|_| Ok(None));
        let found = user.clone();
        users
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));
        roles.expect_get_user_permissions().times(1).returning(|_| {
            Ok([permissions::CREATE_LINK, permissions::READ_OWN_LINKS]
                .iter()
                .map(|s| s.to_string())
                .collect())
        });

        let service = service(users, roles, tokens);
        let ctx = service
            .security_context(Some(&token), None, None)
            .await
            .unwrap();

        assert!(ctx.authenticated);
        assert_eq!(ctx.user_id, Some(user_id));
        assert!(ctx.has_permission(permissions::CREATE_LINK));
        assert!(!ctx.has_permission(permissions::ADMIN_ACCESS));
    }

    #[tokio::test]
    async fn test_revoked_ledger_row_yields_anonymous() {
        let user = user();
        let token = access_token_for(&user);

        let users = MockTestUserRepository::new();
        let roles = MockTestRoleRepository::new();
        let mut tokens = MockTestTokenLedger::new();

        let now = Utc::now();
        let row = AuthToken {
            id: TokenId::new(),
            user_id: user.id,
            token: token.clone(),
            token_type: TokenType::Access,
            issued_at: now,
            expires_at: now + Duration::minutes(15),
            used_at: None,
            revoked_at: Some(now),
            ip_address: None,
            user_agent: None,
        };
        tokens
            .expect_find_by_token()
            .times(1)
            .returning(move |_| Ok(Some(row.clone())));

        let service = service(users, roles, tokens);
        let ctx = service
            .security_context(Some(&token), None, None)
            .await
            .unwrap();

        assert!(!ctx.authenticated);
    }

    #[tokio::test]
    async fn test_inactive_user_yields_anonymous() {
        let mut user = user();
        user.active = false;
        let token = access_token_for(&user);

        let mut users = MockTestUserRepository::new();
        let roles = MockTestRoleRepository::new();
        let mut tokens = MockTestTokenLedger::new();

        tokens
            .expect_find_by_token()
            .times(1)
            .returning(|_| Ok(None));
        users
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = service(users, roles, tokens);
        let ctx = service
            .security_context(Some(&token), None, None)
            .await
            .unwrap();

        assert!(!ctx.authenticated);
    }

    #[tokio::test]
    async fn test_infrastructure_failure_is_an_error_not_anonymous() {
        let user = user();
        let token = access_token_for(&user);

        let users = MockTestUserRepository::new();
        let roles = MockTestRoleRepository::new();
        let mut tokens = MockTestTokenLedger::new();

        tokens
            .expect_find_by_token()
            .times(1)
            .returning(|_| Err(RepositoryError::Database("connection refused".to_string())));

        let service = service(users, roles, tokens);
        let result = service.security_context(Some(&token), None, None).await;

        assert!(matches!(result, Err(AuthError::Database(_))));
    }

    #[tokio::test]
    async fn test_guards() {
        let users = MockTestUserRepository::new();
        let roles = MockTestRoleRepository::new();
        let tokens = MockTestTokenLedger::new();
        let service = service(users, roles, tokens);

        let anonymous = SecurityContext::anonymous(None, None);
        assert!(matches!(
            service.require_authentication(&anonymous),
            Err(AuthError::UnauthorizedAccess)
        ));
        assert!(matches!(
            service.require_permission(&anonymous, permissions::CREATE_LINK),
            Err(AuthError::UnauthorizedAccess)
        ));

        let granted: BTreeSet<String> = [permissions::CREATE_LINK, permissions::READ_OWN_LINKS]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ctx = SecurityContext::authenticated(&user(), granted, None, None);

        assert!(service.require_authentication(&ctx).is_ok());
        assert!(service.require_permission(&ctx, permissions::CREATE_LINK).is_ok());
        assert!(matches!(
            service.require_permission(&ctx, permissions::ADMIN_ACCESS),
            Err(AuthError::InsufficientPermissions)
        ));
        assert!(service
            .require_any_permission(&ctx, &[permissions::ADMIN_ACCESS, permissions::CREATE_LINK])
            .is_ok());
        assert!(matches!(
            service.require_all_permissions(
                &ctx,
                &[permissions::CREATE_LINK, permissions::ADMIN_ACCESS]
            ),
            Err(AuthError::InsufficientPermissions)
        ));
    }
}
