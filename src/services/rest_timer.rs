use crate::clock::SharedClock;
use crate::error::{AppError, Result};
use crate::models::{RestState, RestStatus, RuntimeEntry};
use crate::store::Store;

/// One rest countdown per user, persisted so it survives a restart.
#[derive(Clone)]
pub struct RestTimer<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> RestTimer<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Starts a countdown, replacing any rest already running.
    pub async fn start(&self, owner: &str, duration_sec: u32) -> Result<RestState> {
        if duration_sec == 0 {
            return Err(AppError::Validation(
                "Rest duration must be positive".to_string(),
            ));
        }

        let state = RestState {
            started_at: self.clock.now(),
            duration_sec,
        };
        let entry = RuntimeEntry {
            key: RuntimeEntry::rest_key(owner),
            value: serde_json::to_value(state)?,
        };
        self.store.put(&entry).await?;

        tracing::debug!("Rest started for {}: {}s", owner, duration_sec);
        Ok(state)
    }

    pub async fn stop(&self, owner: &str) -> Result<()> {
        self.store
            .delete::<RuntimeEntry>(&RuntimeEntry::rest_key(owner))
            .await
    }

    pub async fn state(&self, owner: &str) -> Result<Option<RestState>> {
        let entry = self
            .store
            .get::<RuntimeEntry>(&RuntimeEntry::rest_key(owner))
            .await?;

        match entry {
            Some(entry) => Ok(Some(serde_json::from_value(entry.value)?)),
            None => Ok(None),
        }
    }

    /// Seconds left, or `None` when no rest is active.
    pub async fn remaining(&self, owner: &str) -> Result<Option<u32>> {
        let now = self.clock.now();
        Ok(self.state(owner).await?.map(|s| s.remaining(now)))
    }

    pub async fn status(&self, owner: &str) -> Result<RestStatus> {
        let now = self.clock.now();
        let status = match self.state(owner).await? {
            None => RestStatus::Idle,
            Some(state) => match state.remaining(now) {
                0 => RestStatus::Expired {
                    overdue: state.overdue(now),
                },
                remaining => RestStatus::Running { remaining },
            },
        };
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::create_memory_pool;
    use crate::error::ErrorKind;
    use crate::migrations::run_migrations_for_tests;
    use crate::store::SqliteStore;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn setup_timer() -> (RestTimer<SqliteStore>, ManualClock) {
        let pool = create_memory_pool().expect("Failed to create test database");
        run_migrations_for_tests(&pool).expect("Failed to run migrations");
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap());
        let timer = RestTimer::new(SqliteStore::new(pool), Arc::new(clock.clone()));
        (timer, clock)
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let (timer, clock) = setup_timer();
        timer.start("ana", 90).await.unwrap();

        assert_eq!(timer.remaining("ana").await.unwrap(), Some(90));

        clock.advance(Duration::seconds(30));
        assert_eq!(timer.remaining("ana").await.unwrap(), Some(60));

        clock.advance(Duration::seconds(100));
        assert_eq!(timer.remaining("ana").await.unwrap(), Some(0));
        assert_eq!(
            timer.status("ana").await.unwrap(),
            RestStatus::Expired { overdue: 40 }
        );
    }

    #[tokio::test]
    async fn test_start_replaces_running_rest() {
        let (timer, clock) = setup_timer();
        timer.start("ana", 90).await.unwrap();
        clock.advance(Duration::seconds(45));

        timer.start("ana", 60).await.unwrap();

        assert_eq!(
            timer.status("ana").await.unwrap(),
            RestStatus::Running { remaining: 60 }
        );
    }

    #[tokio::test]
    async fn test_stop_clears_state() {
        let (timer, _clock) = setup_timer();
        timer.start("ana", 90).await.unwrap();

        timer.stop("ana").await.unwrap();

        assert_eq!(timer.remaining("ana").await.unwrap(), None);
        assert_eq!(timer.status("ana").await.unwrap(), RestStatus::Idle);
    }

    #[tokio::test]
    async fn test_timers_are_per_user() {
        let (timer, _clock) = setup_timer();
        timer.start("ana", 90).await.unwrap();

        assert_eq!(timer.remaining("bruno").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let (timer, _clock) = setup_timer();

        let err = timer.start("ana", 0).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(timer.state("ana").await.unwrap(), None);
    }
}
