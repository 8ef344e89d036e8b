use std::collections::BTreeSet;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::models::User;
use crate::user::models::UserId;

/// Token types recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "ACCESS",
            TokenType::Refresh => "REFRESH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACCESS" => Some(TokenType::Access),
            "REFRESH" => Some(TokenType::Refresh),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger row identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(pub Uuid);

impl TokenId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Durable record of an issued token.
///
/// At most one of `used_at` / `revoked_at` is ever set; once either is set
/// the token is permanently inactive.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub id: TokenId,
    pub user_id: UserId,
    pub token: String,
    pub token_type: TokenType,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuthToken {
    /// Whether the token can still be presented: never used, never revoked,
    /// and not past its expiry.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.revoked_at.is_none() && now < self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Per-request identity and permission set derived from an incoming
/// credential. Built fresh on every request, never persisted.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub authenticated: bool,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub permissions: BTreeSet<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl SecurityContext {
    /// Context for a request carrying no valid credential.
    pub fn anonymous(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            authenticated: false,
            user_id: None,
            username: None,
            permissions: BTreeSet::new(),
            ip_address,
            user_agent,
        }
    }

    /// Context for an authenticated user with resolved permissions.
    pub fn authenticated(
        user: &User,
        permissions: BTreeSet<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user.id),
            username: Some(user.username.as_str().to_string()),
            permissions,
            ip_address,
            user_agent,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.authenticated && self.permissions.contains(permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        self.authenticated && permissions.iter().any(|p| self.permissions.contains(*p))
    }

    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        self.authenticated && permissions.iter().all(|p| self.permissions.contains(*p))
    }
}

/// Command to register a new user. Raw strings; validation happens in the
/// service so field errors can be accumulated.
#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Command to authenticate with username or email plus password.
#[derive(Debug, Clone)]
pub struct AuthenticateUserCommand {
    pub login_identifier: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub remember_me: bool,
}

impl AuthenticateUserCommand {
    /// Identifiers containing `@` are treated as email addresses.
    pub fn is_email_login(&self) -> bool {
        self.login_identifier.contains('@')
    }
}

/// Command to exchange a refresh token for a new token pair.
#[derive(Debug, Clone)]
pub struct RefreshTokenCommand {
    pub refresh_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Command to log out, optionally revoking the presented refresh token.
#[derive(Debug, Clone)]
pub struct LogoutCommand {
    pub refresh_token: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Sanitized user view returned from registration. Never carries the hash
/// or salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&User> for RegisteredUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Result of a successful login or refresh: the new token pair plus expiry
/// durations in seconds.
#[derive(Debug, Clone)]
pub struct AuthenticationOutcome {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_in: i64,
    pub refresh_token_expires_in: i64,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::user::models::EmailAddress;
    use crate::user::models::Username;

    fn token(now: DateTime<Utc>) -> AuthToken {
        AuthToken {
            id: TokenId::new(),
            user_id: UserId::new(),
            token: "opaque".to_string(),
            token_type: TokenType::Refresh,
            issued_at: now,
            expires_at: now + Duration::days(7),
            used_at: None,
            revoked_at: None,
            ip_address: None,
            user_agent: None,
        }
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
            role_ids: vec![],
        }
    }

    #[test]
    fn test_fresh_token_is_valid() {
        let now = Utc::now();
        assert!(token(now).is_valid(now));
    }

    #[test]
    fn test_used_token_is_permanently_inactive() {
        let now = Utc::now();
        let mut t = token(now);
        t.used_at = Some(now);
        assert!(!t.is_valid(now));
    }

    #[test]
    fn test_revoked_token_is_permanently_inactive() {
        let now = Utc::now();
        let mut t = token(now);
        t.revoked_at = Some(now);
        assert!(!t.is_valid(now));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let now = Utc::now();
        let t = token(now - Duration::days(8));
        assert!(t.is_expired(now));
        assert!(!t.is_valid(now));
    }

    #[test]
    fn test_anonymous_context_has_no_permissions() {
        let ctx = SecurityContext::anonymous(Some("10.0.0.1".to_string()), None);
        assert!(!ctx.authenticated);
        assert!(!ctx.has_permission("ADMIN_ACCESS"));
        assert!(!ctx.has_any_permission(&["ADMIN_ACCESS", "CREATE_LINK"]));
    }

    #[test]
    fn test_authenticated_context_permission_checks() {
        let permissions: BTreeSet<String> = ["CREATE_LINK", "READ_OWN_LINKS"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ctx = SecurityContext::authenticated(&user(), permissions, None, None);

        assert!(ctx.has_permission("CREATE_LINK"));
        assert!(!ctx.has_permission("ADMIN_ACCESS"));
        assert!(ctx.has_any_permission(&["ADMIN_ACCESS", "CREATE_LINK"]));
        assert!(ctx.has_all_permissions(&["CREATE_LINK", "READ_OWN_LINKS"]));
        assert!(!ctx.has_all_permissions(&["CREATE_LINK", "ADMIN_ACCESS"]));
    }

    #[test]
    fn test_email_login_detection() {
        let command = AuthenticateUserCommand {
            login_identifier: "alice@example.com".to_string(),
            password: "pw".to_string(),
            ip_address: None,
            user_agent: None,
            remember_me: false,
        };
        assert!(command.is_email_login());

        let command = AuthenticateUserCommand {
            login_identifier: "alice".to_string(),
            ..command
        };
        assert!(!command.is_email_login());
    }

    #[test]
    fn test_registered_user_view_is_sanitized() {
        let user = user();
        let view = RegisteredUser::from(&user);
        assert_eq!(view.username, "alice");
        // The view type simply has no hash or salt fields
        assert_eq!(view.id, user.id.to_string());
    }
}
