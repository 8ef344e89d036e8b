use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

/// Envelope for authentication domain events.
///
/// Events are informational; publishing failures are logged and never fail
/// the operation that produced them.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    UserRegistered(UserRegisteredEvent),
    UserAuthenticated(UserAuthenticatedEvent),
    TokenRefreshed(TokenRefreshedEvent),
    UserLoggedOut(UserLoggedOutEvent),
}

impl AuthEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuthEvent::UserRegistered(_) => "user_registered",
            AuthEvent::UserAuthenticated(_) => "user_authenticated",
            AuthEvent::TokenRefreshed(_) => "token_refreshed",
            AuthEvent::UserLoggedOut(_) => "user_logged_out",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            AuthEvent::UserRegistered(e) => &e.user_id,
            AuthEvent::UserAuthenticated(e) => &e.user_id,
            AuthEvent::TokenRefreshed(e) => &e.user_id,
            AuthEvent::UserLoggedOut(e) => &e.user_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRegisteredEvent {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

impl UserRegisteredEvent {
    pub fn new(user_id: String, username: String, email: String) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id,
            username,
            email,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserAuthenticatedEvent {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl UserAuthenticatedEvent {
    pub fn new(
        user_id: String,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id,
            username,
            ip_address,
            user_agent,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenRefreshedEvent {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub ip_address: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TokenRefreshedEvent {
    pub fn new(user_id: String, username: String, ip_address: Option<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id,
            username,
            ip_address,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserLoggedOutEvent {
    pub event_id: String,
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
}

impl UserLoggedOutEvent {
    pub fn new(user_id: String) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id,
            occurred_at: Utc::now(),
        }
    }
}

/// One-way publish sink for domain events.
pub trait EventPublisher: Send + Sync + 'static {
    fn publish(&self, event: AuthEvent);
}
