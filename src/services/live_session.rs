//! The running-session state machine.
//!
//! A session in progress is recorded twice: the `Session` row with status
//! `running`, and a per-user pointer in the runtime collection. This service
//! is the only writer of either, and every transition updates both.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rest_timer::RestTimer;
use crate::clock::SharedClock;
use crate::error::{AppError, Result};
use crate::models::{RuntimeEntry, Session, SessionStatus, Template};
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LivePointer {
    session_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionRepair {
    pub pointers_cleared: usize,
    pub pointers_restored: usize,
}

#[derive(Clone)]
pub struct LiveSessionService<S: Store> {
    store: S,
    clock: SharedClock,
    rest: RestTimer<S>,
}

impl<S: Store> LiveSessionService<S> {
    pub fn new(store: S, clock: SharedClock, rest: RestTimer<S>) -> Self {
        Self { store, clock, rest }
    }

    async fn pointer(&self, owner: &str) -> Result<Option<LivePointer>> {
        let entry = self
            .store
            .get::<RuntimeEntry>(&RuntimeEntry::live_session_key(owner))
            .await?;
        match entry {
            Some(entry) => Ok(Some(serde_json::from_value(entry.value)?)),
            None => Ok(None),
        }
    }

    async fn set_pointer(&self, owner: &str, session_id: &str) -> Result<()> {
        let entry = RuntimeEntry {
            key: RuntimeEntry::live_session_key(owner),
            value: serde_json::to_value(LivePointer {
                session_id: session_id.to_string(),
            })?,
        };
        self.store.put(&entry).await
    }

    async fn clear_pointer(&self, owner: &str) -> Result<()> {
        self.store
            .delete::<RuntimeEntry>(&RuntimeEntry::live_session_key(owner))
            .await
    }

    async fn running_rows(&self, owner: &str) -> Result<Vec<Session>> {
        Ok(self
            .store
            .by_index::<Session>("owner_id", owner)
            .await?
            .into_iter()
            .filter(Session::is_running)
            .collect())
    }

    pub async fn start_session(&self, owner: &str, template_id: &str) -> Result<Session> {
        let template = self
            .store
            .get::<Template>(template_id)
            .await?
            .filter(|t| t.owner_id == owner)
            .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

        if self.current_session(owner).await?.is_some()
            || !self.running_rows(owner).await?.is_empty()
        {
            return Err(AppError::Conflict(
                "A session is already running. Finish it before starting another.".to_string(),
            ));
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            status: SessionStatus::Running,
            started_at: self.clock.now(),
            finished_at: None,
            notes: String::new(),
        };
        self.store.put(&session).await?;

        if let Err(e) = self.set_pointer(owner, &session.id).await {
            tracing::warn!("Rolling back session {} after pointer write failed", session.id);
            if let Err(rollback) = self.store.delete::<Session>(&session.id).await {
                tracing::warn!("Rollback of session {} failed: {}", session.id, rollback);
            }
            return Err(e);
        }

        tracing::info!("{} started session {} ({})", owner, session.id, template.name);
        Ok(session)
    }

    /// Finishes the running session. Returns `None` when nothing was running.
    pub async fn finish_session(&self, owner: &str) -> Result<Option<Session>> {
        let Some(pointer) = self.pointer(owner).await? else {
            tracing::debug!("No live session for {}, nothing to finish", owner);
            return Ok(None);
        };

        let Some(mut session) = self.store.get::<Session>(&pointer.session_id).await? else {
            tracing::warn!(
                "Live session pointer for {} referenced missing session {}",
                owner,
                pointer.session_id
            );
            self.clear_pointer(owner).await?;
            return Ok(None);
        };

        if session.is_running() {
            session.status = SessionStatus::Finished;
            session.finished_at = Some(self.clock.now());
            self.store.put(&session).await?;
        }
        self.clear_pointer(owner).await?;
        self.rest.stop(owner).await?;

        tracing::info!("{} finished session {}", owner, session.id);
        Ok(Some(session))
    }

    /// The session the pointer names, if it is still running.
    pub async fn current_session(&self, owner: &str) -> Result<Option<Session>> {
        let Some(pointer) = self.pointer(owner).await? else {
            return Ok(None);
        };
        Ok(self
            .store
            .get::<Session>(&pointer.session_id)
            .await?
            .filter(Session::is_running))
    }

    pub async fn elapsed(&self, owner: &str) -> Result<Option<Duration>> {
        let now = self.clock.now();
        Ok(self
            .current_session(owner)
            .await?
            .map(|s| s.elapsed(now)))
    }

    /// Brings pointer and table back in line after an interrupted transition.
    ///
    /// A pointer to a missing or finished session is cleared. A running row
    /// with no pointer gets one; if several are running, the newest keeps
    /// running and the rest are finished.
    pub async fn reconcile(&self, owner: &str) -> Result<SessionRepair> {
        let mut repair = SessionRepair::default();

        if let Some(pointer) = self.pointer(owner).await? {
            let live = self
                .store
                .get::<Session>(&pointer.session_id)
                .await?
                .filter(Session::is_running);
            if live.is_none() {
                tracing::warn!("Clearing stale live session pointer for {}", owner);
                self.clear_pointer(owner).await?;
                repair.pointers_cleared += 1;
            }
        }

        let mut running = self.running_rows(owner).await?;
        running.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        let current = self.pointer(owner).await?;
        let keep = match &current {
            Some(pointer) => Some(pointer.session_id.clone()),
            None => running.first().map(|s| s.id.clone()),
        };

        for mut session in running {
            if Some(&session.id) == keep.as_ref() {
                continue;
            }
            tracing::warn!("Finishing stray running session {}", session.id);
            session.status = SessionStatus::Finished;
            session.finished_at = Some(self.clock.now());
            self.store.put(&session).await?;
        }

        if current.is_none() {
            if let Some(id) = keep {
                tracing::warn!("Restoring live session pointer for {} to {}", owner, id);
                self.set_pointer(owner, &id).await?;
                repair.pointers_restored += 1;
            }
        }

        Ok(repair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::db::create_memory_pool;
    use crate::error::ErrorKind;
    use crate::migrations::run_migrations_for_tests;
    use crate::store::SqliteStore;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    struct Fixture {
        store: SqliteStore,
        clock: ManualClock,
        sessions: LiveSessionService<SqliteStore>,
    }

    async fn setup() -> Fixture {
        let pool = create_memory_pool().expect("Failed to create test database");
        run_migrations_for_tests(&pool).expect("Failed to run migrations");
        let store = SqliteStore::new(pool);
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap());
        let shared: SharedClock = Arc::new(clock.clone());
        let rest = RestTimer::new(store.clone(), shared.clone());
        let sessions = LiveSessionService::new(store.clone(), shared, rest);

        store
            .put(&Template {
                id: "push".to_string(),
                owner_id: "ana".to_string(),
                name: "Push Day".to_string(),
                notes: String::new(),
                created_at: clock.now(),
            })
            .await
            .unwrap();

        Fixture {
            store,
            clock,
            sessions,
        }
    }

    #[tokio::test]
    async fn test_start_then_finish_keeps_both_records_in_sync() {
        let f = setup().await;

        let started = f.sessions.start_session("ana", "push").await.unwrap();
        assert_eq!(started.template_name, "Push Day");
        assert_eq!(
            f.sessions.current_session("ana").await.unwrap().map(|s| s.id),
            Some(started.id.clone())
        );

        f.clock.advance(Duration::minutes(45));
        let finished = f.sessions.finish_session("ana").await.unwrap().unwrap();

        assert_eq!(finished.status, SessionStatus::Finished);
        assert_eq!(finished.elapsed(f.clock.now()), Duration::minutes(45));
        assert!(f.sessions.current_session("ana").await.unwrap().is_none());
        let row = f.store.get::<Session>(&started.id).await.unwrap().unwrap();
        assert_eq!(row.status, SessionStatus::Finished);
    }

    #[tokio::test]
    async fn test_second_start_conflicts() {
        let f = setup().await;
        f.sessions.start_session("ana", "push").await.unwrap();

        let err = f.sessions.start_session("ana", "push").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        let rows = f.store.by_index::<Session>("owner_id", "ana").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_running_row_without_pointer_still_conflicts() {
        let f = setup().await;
        f.sessions.start_session("ana", "push").await.unwrap();
        f.sessions.clear_pointer("ana").await.unwrap();

        let err = f.sessions.start_session("ana", "push").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_template_not_found() {
        let f = setup().await;

        let missing = f.sessions.start_session("ana", "nope").await.unwrap_err();
        let foreign = f.sessions.start_session("bruno", "push").await.unwrap_err();

        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(foreign.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_finish_without_session_is_noop() {
        let f = setup().await;

        assert!(f.sessions.finish_session("ana").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finish_stops_rest_timer() {
        let f = setup().await;
        f.sessions.start_session("ana", "push").await.unwrap();
        f.sessions.rest.start("ana", 90).await.unwrap();

        f.sessions.finish_session("ana").await.unwrap();

        assert_eq!(f.sessions.rest.remaining("ana").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dangling_pointer_is_cleared_on_finish() {
        let f = setup().await;
        f.sessions.set_pointer("ana", "ghost").await.unwrap();

        assert!(f.sessions.finish_session("ana").await.unwrap().is_none());
        assert!(f.sessions.pointer("ana").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_elapsed_tracks_clock() {
        let f = setup().await;
        f.sessions.start_session("ana", "push").await.unwrap();

        f.clock.advance(Duration::seconds(83));

        assert_eq!(
            f.sessions.elapsed("ana").await.unwrap(),
            Some(Duration::seconds(83))
        );
    }

    #[tokio::test]
    async fn test_reconcile_restores_missing_pointer() {
        let f = setup().await;
        let session = f.sessions.start_session("ana", "push").await.unwrap();
        f.sessions.clear_pointer("ana").await.unwrap();

        let repair = f.sessions.reconcile("ana").await.unwrap();

        assert_eq!(repair.pointers_restored, 1);
        assert_eq!(
            f.sessions.current_session("ana").await.unwrap().map(|s| s.id),
            Some(session.id)
        );
    }

    #[tokio::test]
    async fn test_reconcile_clears_stale_pointer() {
        let f = setup().await;
        f.sessions.set_pointer("ana", "ghost").await.unwrap();

        let repair = f.sessions.reconcile("ana").await.unwrap();

        assert_eq!(repair.pointers_cleared, 1);
        assert!(f.sessions.pointer("ana").await.unwrap().is_none());
        f.sessions.start_session("ana", "push").await.unwrap();
    }
}
