use std::collections::HashSet;

use uuid::Uuid;

use crate::clock::{format_clock, SharedClock};
use crate::error::{AppError, Result};
use crate::models::{Exercise, Session, SessionSet, SessionSummary, SetInput, Unit};
use crate::store::Store;
use crate::units::{input_to_kg, parse_weight};

/// Sum of `weight_kg * reps` over the sets, missing reps counting as zero.
/// No rounding happens here.
pub fn aggregate_volume(sets: &[SessionSet]) -> f64 {
    sets.iter().map(SessionSet::volume_kg).sum()
}

fn parse_reps(input: Option<&str>) -> Result<Option<u32>> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => text
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid reps: {:?}", text))),
    }
}

#[derive(Clone)]
pub struct SetLogService<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> SetLogService<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Appends a set. The weight is converted from `unit` to kilograms and
    /// `set_index` continues the sequence for this session and exercise.
    pub async fn log_set(
        &self,
        session_id: &str,
        exercise_id: &str,
        unit: Unit,
        input: &SetInput,
    ) -> Result<SessionSet> {
        let weight = parse_weight(&input.weight)?;
        let reps = parse_reps(input.reps.as_deref())?;

        let session = self
            .store
            .get::<Session>(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if !session.is_running() {
            return Err(AppError::Conflict(
                "Sets can only be logged to a running session".to_string(),
            ));
        }
        if self.store.get::<Exercise>(exercise_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Exercise {} not found",
                exercise_id
            )));
        }

        let set_index = self
            .sets_for_exercise(session_id, exercise_id)
            .await?
            .iter()
            .map(|s| s.set_index)
            .max()
            .unwrap_or(0)
            + 1;

        let set = SessionSet {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            exercise_id: exercise_id.to_string(),
            set_index,
            reps,
            weight_kg: input_to_kg(weight, unit),
            rir: input.rir,
            rpe: input.rpe,
            note: input.note.as_deref().unwrap_or("").trim().to_string(),
            created_at: self.clock.now(),
        };
        self.store.put(&set).await?;

        tracing::debug!(
            "Logged set {} of {} in session {}",
            set.set_index,
            exercise_id,
            session_id
        );
        Ok(set)
    }

    /// Ordered by exercise, then set index.
    pub async fn sets_for_session(&self, session_id: &str) -> Result<Vec<SessionSet>> {
        let mut sets = self
            .store
            .by_index::<SessionSet>("session_id", session_id)
            .await?;
        sets.sort_by(|a, b| {
            a.exercise_id
                .cmp(&b.exercise_id)
                .then(a.set_index.cmp(&b.set_index))
        });
        Ok(sets)
    }

    pub async fn sets_for_exercise(
        &self,
        session_id: &str,
        exercise_id: &str,
    ) -> Result<Vec<SessionSet>> {
        let mut sets: Vec<SessionSet> = self
            .store
            .by_index::<SessionSet>("session_id", session_id)
            .await?
            .into_iter()
            .filter(|s| s.exercise_id == exercise_id)
            .collect();
        sets.sort_by_key(|s| s.set_index);
        Ok(sets)
    }

    pub async fn last_set(&self, session_id: &str, exercise_id: &str) -> Result<Option<SessionSet>> {
        Ok(self
            .sets_for_exercise(session_id, exercise_id)
            .await?
            .pop())
    }

    pub async fn aggregate_session_volume(&self, session_id: &str) -> Result<f64> {
        let sets = self
            .store
            .by_index::<SessionSet>("session_id", session_id)
            .await?;
        Ok(aggregate_volume(&sets))
    }

    /// Finished sessions, most recently finished first.
    pub async fn history(&self, owner: &str) -> Result<Vec<SessionSummary>> {
        let mut sessions: Vec<Session> = self
            .store
            .by_index::<Session>("owner_id", owner)
            .await?
            .into_iter()
            .filter(|s| !s.is_running())
            .collect();
        sessions.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));

        let now = self.clock.now();
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let sets = self
                .store
                .by_index::<SessionSet>("session_id", &session.id)
                .await?;
            let exercises: HashSet<&str> = sets.iter().map(|s| s.exercise_id.as_str()).collect();

            summaries.push(SessionSummary {
                duration: format_clock(session.elapsed(now)),
                set_count: sets.len(),
                exercise_count: exercises.len(),
                volume_kg: aggregate_volume(&sets),
                session,
            });
        }
        Ok(summaries)
    }

    /// Deletes a finished session and its sets, sets first.
    pub async fn delete_session(&self, owner: &str, session_id: &str) -> Result<usize> {
        let session = self
            .store
            .get::<Session>(session_id)
            .await?
            .filter(|s| s.owner_id == owner)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.is_running() {
            return Err(AppError::Conflict(
                "Finish the session before deleting it".to_string(),
            ));
        }

        let sets = self
            .store
            .by_index::<SessionSet>("session_id", session_id)
            .await?;
        for set in &sets {
            self.store.delete::<SessionSet>(&set.id).await?;
        }
        self.store.delete::<Session>(session_id).await?;

        tracing::info!("Deleted session {} with {} sets", session_id, sets.len());
        Ok(sets.len())
    }

    /// Removes sets whose session no longer exists.
    pub async fn reconcile_orphan_sets(&self) -> Result<usize> {
        let mut removed = 0;
        for set in self.store.all::<SessionSet>().await? {
            if self.store.get::<Session>(&set.session_id).await?.is_none() {
                tracing::warn!("Removing orphaned set {}", set.id);
                self.store.delete::<SessionSet>(&set.id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
