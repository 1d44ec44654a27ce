//! Periodic removal of expired callback tokens.
//!
//! Expired tokens are already rejected when pressed; the sweeper only keeps
//! the table from growing with buttons nobody pressed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::domain::CallbackTokenRepository;
use crate::services::CallbackTokenService;

/// Messages that can be sent to the sweeper.
#[derive(Debug, Clone)]
pub enum SweeperMessage {
    /// Sweep right away.
    SweepNow,
    /// Stop the sweeper.
    Shutdown,
}

pub struct TokenSweeper<S> {
    store: Arc<S>,
    period: Duration,
}

impl<S: CallbackTokenRepository + 'static> TokenSweeper<S> {
    #[must_use]
    pub const fn new(store: Arc<S>, period: Duration) -> Self {
        Self { store, period }
    }

    /// Runs until [`SweeperMessage::Shutdown`] arrives or the sender is dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<SweeperMessage>) {
        info!("Token sweeper started (every {:?})", self.period);

        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.sweep().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(SweeperMessage::SweepNow) => {
                            debug!("Received sweep request");
                            self.sweep().await;
                        }
                        Some(SweeperMessage::Shutdown) | None => {
                            info!("Token sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Deletes expired tokens once, returning how many were removed.
    pub async fn sweep(&self) -> u64 {
        match CallbackTokenService::new(&*self.store).purge_expired().await {
            Ok(0) => 0,
            Ok(removed) => {
                info!("Removed {} expired callback tokens", removed);
                removed
            }
            Err(e) => {
                error!("Failed to remove expired callback tokens: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};

    use super::*;
    use crate::domain::CallbackTokenType;
    use crate::storage::memory::MemoryStore;

    async fn seed(store: &MemoryStore) {
        let now = Utc::now();
        for (token, expires_at) in [
            ("cb_expired", Some(now - ChronoDuration::minutes(1))),
            ("cb_fresh", Some(now + ChronoDuration::hours(1))),
            ("cb_forever", None),
        ] {
            store
                .create(token, CallbackTokenType::Reply, 1, None, expires_at)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;

        let sweeper = TokenSweeper::new(Arc::clone(&store), Duration::from_secs(600));
        assert_eq!(sweeper.sweep().await, 1);
        assert_eq!(sweeper.sweep().await, 0);

        let left: Vec<_> = store.all_tokens().await.into_iter().map(|t| t.token).collect();
        assert_eq!(left, vec!["cb_fresh".to_owned(), "cb_forever".to_owned()]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;

        let sweeper = TokenSweeper::new(Arc::clone(&store), Duration::from_secs(3600));
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(async move { sweeper.run(rx).await });

        tx.send(SweeperMessage::SweepNow).await.unwrap();
        tx.send(SweeperMessage::Shutdown).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.token_count().await, 2);
    }
}
