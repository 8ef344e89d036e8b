use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use auth::HashedPassword;
use auth::TokenKind;
use auth::TokenSigner;
use chrono::Duration;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::AuthToken;
use crate::domain::auth::models::AuthenticateUserCommand;
use crate::domain::auth::models::AuthenticationOutcome;
use crate::domain::auth::models::LogoutCommand;
use crate::domain::auth::models::RefreshTokenCommand;
use crate::domain::auth::models::RegisterUserCommand;
use crate::domain::auth::models::RegisteredUser;
use crate::domain::auth::models::TokenId;
use crate::domain::auth::models::TokenType;
use crate::domain::auth::ports::AuthenticationServicePort;
use crate::domain::auth::ports::TokenLedger;
use crate::domain::events::AuthEvent;
use crate::domain::events::EventPublisher;
use crate::domain::events::TokenRefreshedEvent;
use crate::domain::events::UserAuthenticatedEvent;
use crate::domain::events::UserLoggedOutEvent;
use crate::domain::events::UserRegisteredEvent;
use crate::user::models::EmailAddress;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::models::Username;
use crate::user::ports::RoleRepository;
use crate::user::ports::UserRepository;

/// Role granted to every newly registered user.
const DEFAULT_ROLE_ID: &str = "role-user";

const MAX_NAME_LENGTH: usize = 50;

/// Token lifetimes.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Refresh lifetime when the user asked to stay signed in.
    pub remember_me_refresh_ttl: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            remember_me_refresh_ttl: Duration::days(30),
        }
    }
}

/// Authentication orchestrator.
///
/// Coordinates the user store, the token ledger, the signer, and the event
/// publisher. Password work runs on the blocking pool so hashing never
/// stalls the async runtime.
pub struct AuthenticationService<UR, RR, TL, EP>
where
    UR: UserRepository,
    RR: RoleRepository,
    TL: TokenLedger,
    EP: EventPublisher,
{
    users: Arc<UR>,
    roles: Arc<RR>,
    tokens: Arc<TL>,
    events: Arc<EP>,
    signer: Arc<TokenSigner>,
    hasher: Arc<auth::PasswordHasher>,
    policy: TokenPolicy,
}

impl<UR, RR, TL, EP> AuthenticationService<UR, RR, TL, EP>
where
    UR: UserRepository,
    RR: RoleRepository,
    TL: TokenLedger,
    EP: EventPublisher,
{
    pub fn new(
        users: Arc<UR>,
        roles: Arc<RR>,
        tokens: Arc<TL>,
        events: Arc<EP>,
        signer: Arc<TokenSigner>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            users,
            roles,
            tokens,
            events,
            signer,
            hasher: Arc::new(auth::PasswordHasher::new()),
            policy,
        }
    }

    /// Validate registration input, accumulating every field failure.
    fn validate_registration(
        command: &RegisterUserCommand,
    ) -> Result<(Username, EmailAddress), AuthError> {
        let username = Username::new(&command.username);
        let email = EmailAddress::new(&command.email);

        let mut field_errors = BTreeMap::new();
        if let Err(e) = &username {
            field_errors.insert("username".to_string(), e.to_string());
        }
        if let Err(e) = &email {
            field_errors.insert("email".to_string(), e.to_string());
        }
        if !auth::password::is_password_strong(&command.password) {
            field_errors.insert(
                "password".to_string(),
                "Password must be 8-128 characters and contain at least three of: \
                 uppercase letters, lowercase letters, digits, symbols"
                    .to_string(),
            );
        }
        for (field, name) in [
            ("firstName", &command.first_name),
            ("lastName", &command.last_name),
        ] {
            if let Some(name) = name {
                if name.chars().count() > MAX_NAME_LENGTH {
                    field_errors.insert(
                        field.to_string(),
                        format!("Must be at most {} characters", MAX_NAME_LENGTH),
                    );
                }
            }
        }

        match (username, email) {
            (Ok(username), Ok(email)) if field_errors.is_empty() => Ok((username, email)),
            _ => Err(AuthError::Validation { field_errors }),
        }
    }

    async fn hash_password(&self, password: String) -> Result<HashedPassword, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Database(format!("Hashing task failed: {}", e)))?
            .map_err(|e| AuthError::Database(format!("Password hashing failed: {}", e)))
    }

    async fn verify_password(
        &self,
        password: String,
        stored_hash: String,
        salt: String,
    ) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash, &salt))
            .await
            .map_err(|e| AuthError::Database(format!("Hashing task failed: {}", e)))
    }

    /// Sign a fresh access/refresh pair and record both in the ledger.
    async fn issue_token_pair(
        &self,
        user: &User,
        ip_address: Option<String>,
        user_agent: Option<String>,
        refresh_ttl: Duration,
    ) -> Result<AuthenticationOutcome, AuthError> {
        let now = Utc::now();
        let access_expires_at = now + self.policy.access_ttl;
        let refresh_expires_at = now + refresh_ttl;

        let subject = user.token_subject();
        let access_token = self
            .signer
            .generate_access_token(&subject, access_expires_at)?;
        let refresh_token = self
            .signer
            .generate_refresh_token(&subject, refresh_expires_at)?;

        let access_row_id = TokenId::new();
        self.tokens
            .save(AuthToken {
                id: access_row_id,
                user_id: user.id,
                token: access_token.clone(),
                token_type: TokenType::Access,
                issued_at: now,
                expires_at: access_expires_at,
                used_at: None,
                revoked_at: None,
                ip_address: ip_address.clone(),
                user_agent: user_agent.clone(),
            })
            .await?;
        let refresh_saved = self
            .tokens
            .save(AuthToken {
                id: TokenId::new(),
                user_id: user.id,
                token: refresh_token.clone(),
                token_type: TokenType::Refresh,
                issued_at: now,
                expires_at: refresh_expires_at,
                used_at: None,
                revoked_at: None,
                ip_address,
                user_agent,
            })
            .await;
        if let Err(e) = refresh_saved {
            // Never leave a half-persisted pair behind
            if let Err(revoke_err) = self.tokens.revoke_token(&access_row_id).await {
                tracing::warn!(
                    user_id = %user.id,
                    "Failed to revoke orphaned access token: {}",
                    revoke_err
                );
            }
            return Err(e.into());
        }

        Ok(AuthenticationOutcome {
            user_id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            access_token,
            refresh_token,
            access_token_expires_in: self.policy.access_ttl.num_seconds(),
            refresh_token_expires_in: refresh_ttl.num_seconds(),
        })
    }
}

#[async_trait]
impl<UR, RR, TL, EP> AuthenticationServicePort for AuthenticationService<UR, RR, TL, EP>
where
    UR: UserRepository,
    RR: RoleRepository,
    TL: TokenLedger,
    EP: EventPublisher,
{
    async fn register(&self, command: RegisterUserCommand) -> Result<RegisteredUser, AuthError> {
        let (username, email) = Self::validate_registration(&command)?;

        if self.users.exists_by_username(&username).await? {
            return Err(AuthError::UserAlreadyExists(username.to_string()));
        }
        if self.users.exists_by_email(email.as_str()).await? {
            return Err(AuthError::UserAlreadyExists(email.to_string()));
        }

        let hashed = self.hash_password(command.password).await?;

        let user = User {
            id: UserId::new(),
            username,
            email,
            password_hash: hashed.hash,
            password_salt: hashed.salt,
            created_at: Utc::now(),
            last_login_at: None,
            active: true,
            first_name: command.first_name,
            last_name: command.last_name,
            role_ids: vec![DEFAULT_ROLE_ID.to_string()],
        };

        let created = self.users.create(user).await?;
        self.roles.assign_role(&created.id, DEFAULT_ROLE_ID).await?;

        tracing::info!(user_id = %created.id, username = %created.username, "Registered new user");
        self.events
            .publish(AuthEvent::UserRegistered(UserRegisteredEvent::new(
                created.id.to_string(),
                created.username.as_str().to_string(),
                created.email.as_str().to_string(),
            )));

        Ok(RegisteredUser::from(&created))
    }

    async fn authenticate(
        &self,
        command: AuthenticateUserCommand,
    ) -> Result<AuthenticationOutcome, AuthError> {
        let user = if command.is_email_login() {
            let email = command.login_identifier.trim().to_lowercase();
            self.users.find_by_email(&email).await?
        } else {
            match Username::new(&command.login_identifier) {
                Ok(username) => self.users.find_by_username(&username).await?,
                Err(_) => None,
            }
        };

        let Some(user) = user else {
            // Burn a hash so an unknown identifier costs the same as a wrong
            // password
            let _ = self.hash_password(command.password).await;
            return Err(AuthError::InvalidCredentials);
        };

        let verified = self
            .verify_password(
                command.password,
                user.password_hash.clone(),
                user.password_salt.clone(),
            )
            .await?;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.active {
            return Err(AuthError::UserInactive);
        }

        let mut stamped = user.clone();
        stamped.last_login_at = Some(Utc::now());
        if let Err(e) = self.users.update(stamped).await {
            tracing::warn!(user_id = %user.id, "Failed to record last login: {}", e);
        }

        let refresh_ttl = if command.remember_me {
            self.policy.remember_me_refresh_ttl
        } else {
            self.policy.refresh_ttl
        };
        let outcome = self
            .issue_token_pair(
                &user,
                command.ip_address.clone(),
                command.user_agent.clone(),
                refresh_ttl,
            )
            .await?;

        tracing::info!(user_id = %user.id, "User authenticated");
        self.events
            .publish(AuthEvent::UserAuthenticated(UserAuthenticatedEvent::new(
                user.id.to_string(),
                user.username.as_str().to_string(),
                command.ip_address,
                command.user_agent,
            )));

        Ok(outcome)
    }

    async fn refresh_tokens(
        &self,
        command: RefreshTokenCommand,
    ) -> Result<AuthenticationOutcome, AuthError> {
        let claims = self.signer.validate_token(&command.refresh_token)?;
        if !claims.is_kind(TokenKind::Refresh) {
            return Err(AuthError::TokenInvalid);
        }

        let record = self
            .tokens
            .find_by_token(&command.refresh_token)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        let now = Utc::now();
        if record.revoked_at.is_some() {
            return Err(AuthError::TokenRevoked);
        }
        if record.is_expired(now) {
            return Err(AuthError::TokenExpired);
        }
        if record.used_at.is_some() {
            return Err(AuthError::TokenInvalid);
        }

        // Single-use consumption. Losing this transition means another
        // request already rotated with the same token.
        if !self.tokens.mark_token_as_used(&record.id).await? {
            tracing::warn!(user_id = %record.user_id, "Refresh token replay detected");
            return Err(AuthError::TokenInvalid);
        }

        let user_id = UserId::from_string(&claims.sub).map_err(|_| AuthError::TokenInvalid)?;
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(claims.sub.clone()))?;
        if !user.active {
            return Err(AuthError::UserInactive);
        }

        let outcome = self
            .issue_token_pair(
                &user,
                command.ip_address.clone(),
                command.user_agent,
                self.policy.refresh_ttl,
            )
            .await?;

        self.events
            .publish(AuthEvent::TokenRefreshed(TokenRefreshedEvent::new(
                user.id.to_string(),
                user.username.as_str().to_string(),
                command.ip_address,
            )));

        Ok(outcome)
    }

    async fn logout(&self, command: LogoutCommand) -> Result<(), AuthError> {
        let Some(refresh_token) = command.refresh_token else {
            return Ok(());
        };

        if let Some(record) = self.tokens.find_by_token(&refresh_token).await? {
            if record.used_at.is_none() && record.revoked_at.is_none() {
                self.tokens.revoke_token(&record.id).await?;
            }
            tracing::info!(user_id = %record.user_id, "User logged out");
            self.events
                .publish(AuthEvent::UserLoggedOut(UserLoggedOutEvent::new(
                    record.user_id.to_string(),
                )));
        }

        Ok(())
    }

    async fn revoke_all_sessions(&self, user_id: &UserId) -> Result<u64, AuthError> {
        let revoked = self.tokens.revoke_all_user_tokens(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "Revoked all sessions");
        Ok(revoked)
    }

    async fn tokens_for_user(&self, user_id: &UserId) -> Result<Vec<AuthToken>, AuthError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound(user_id.to_string()));
        }
        Ok(self.tokens.find_all_for_user(user_id).await?)
    }
}
