use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::auth::ports::TokenLedger;

/// Periodic sweep over the token ledger.
///
/// Each pass deletes rows past their expiry, then deletes used rows older
/// than the retention cutoff. Failures are logged and the next tick retries;
/// the sweep itself never terminates the task.
pub struct TokenCleanupTask<TL>
where
    TL: TokenLedger,
{
    tokens: Arc<TL>,
    interval: Duration,
    used_retention: chrono::Duration,
}

impl<TL> TokenCleanupTask<TL>
where
    TL: TokenLedger,
{
    pub fn new(tokens: Arc<TL>, interval: Duration, used_retention: chrono::Duration) -> Self {
        Self {
            tokens,
            interval,
            used_retention,
        }
    }

    /// Start the sweep loop. The returned handle stops it cleanly.
    pub fn spawn(self) -> CleanupHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sweep().await,
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Token cleanup task stopped");
        });

        CleanupHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn sweep(&self) {
        match self.tokens.cleanup_expired_tokens().await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "Purged expired tokens"),
            Err(e) => tracing::warn!("Expired token sweep failed: {}", e),
        }

        let cutoff = Utc::now() - self.used_retention;
        match self.tokens.delete_used_tokens_older_than(cutoff).await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "Purged used tokens past retention"),
            Err(e) => tracing::warn!("Used token sweep failed: {}", e),
        }
    }
}

/// Stops the cleanup task and waits for it to exit.
pub struct CleanupHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
