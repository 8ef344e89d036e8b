use std::sync::Arc;
use std::sync::RwLock;

use crate::domain::events::AuthEvent;
use crate::domain::events::EventPublisher;

/// Receives events published in this process.
pub trait EventSubscriber: Send + Sync + 'static {
    fn on_event(&self, event: &AuthEvent);
}

/// In-process fan-out publisher.
///
/// Subscribers register behind a read-write lock; publishing clones the
/// subscriber list under the read lock and delivers outside it, so a slow
/// subscriber never blocks registration and delivery order within one
/// publish call is the registration order.
#[derive(Default)]
pub struct InProcessEventPublisher {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl InProcessEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut subscribers = match self.subscribers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.push(subscriber);
    }
}

impl EventPublisher for InProcessEventPublisher {
    fn publish(&self, event: AuthEvent) {
        let subscribers: Vec<Arc<dyn EventSubscriber>> = {
            let guard = match self.subscribers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone()
        };

        tracing::debug!(
            event_type = event.event_type(),
            user_id = event.user_id(),
            subscribers = subscribers.len(),
            "Publishing domain event"
        );
        for subscriber in subscribers {
            subscriber.on_event(&event);
        }
    }
}

/// Subscriber that writes an audit line for every event.
pub struct AuditLogSubscriber;

impl EventSubscriber for AuditLogSubscriber {
    fn on_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::UserRegistered(e) => {
                tracing::info!(user_id = %e.user_id, username = %e.username, "audit: user registered");
            }
            AuthEvent::UserAuthenticated(e) => {
                tracing::info!(
                    user_id = %e.user_id,
                    ip = e.ip_address.as_deref().unwrap_or("-"),
                    "audit: user authenticated"
                );
            }
            AuthEvent::TokenRefreshed(e) => {
                tracing::info!(user_id = %e.user_id, "audit: token refreshed");
            }
            AuthEvent::UserLoggedOut(e) => {
                tracing::info!(user_id = %e.user_id, "audit: user logged out");
            }
        }
    }
}
