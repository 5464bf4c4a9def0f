use uuid::Uuid;

use crate::clock::SharedClock;
use crate::error::{AppError, Result};
use crate::models::exercise::SEED_EXERCISES;
use crate::models::{Exercise, ExerciseDraft, ExerciseType, User};
use crate::store::Store;

#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
    clock: SharedClock,
}

pub(crate) fn ensure_admin(actor: &User) -> Result<()> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only admins can manage the exercise catalog".to_string(),
        ))
    }
}

fn normalize_text(s: &str) -> String {
    s.trim().to_lowercase()
}

fn validate_draft(draft: &ExerciseDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(AppError::Validation("Exercise name is required".to_string()));
    }
    if draft.primary_muscle.trim().is_empty() {
        return Err(AppError::Validation("Primary muscle is required".to_string()));
    }
    Ok(())
}

fn sort_by_name(exercises: &mut [Exercise]) {
    exercises.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Inserts the built-in catalog when no exercise exists yet. Returns the
    /// number of exercises inserted.
    pub async fn seed_if_empty(&self) -> Result<usize> {
        if !self.store.all::<Exercise>().await?.is_empty() {
            tracing::debug!("Exercise catalog already populated, skipping seed");
            return Ok(0);
        }

        let now = self.clock.now();
        for seed in SEED_EXERCISES {
            let exercise = Exercise {
                id: Uuid::new_v4().to_string(),
                name: seed.name.to_string(),
                primary_muscle: seed.primary.to_string(),
                secondary_muscles: seed.secondary.iter().map(|s| s.to_string()).collect(),
                equipment: seed.equipment.to_string(),
                exercise_type: seed.exercise_type,
                instructions: String::new(),
                notes: String::new(),
                video_url: None,
                is_active: true,
                created_by: "seed".to_string(),
                created_at: now,
                updated_at: None,
            };
            self.store.put(&exercise).await?;
        }

        tracing::info!("Seeded {} exercises", SEED_EXERCISES.len());
        Ok(SEED_EXERCISES.len())
    }

    pub async fn get(&self, id: &str) -> Result<Exercise> {
        self.store
            .get::<Exercise>(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exercise not found".to_string()))
    }

    /// Active exercises whose name contains `query`, case-insensitively.
    pub async fn search(&self, query: &str) -> Result<Vec<Exercise>> {
        let query = normalize_text(query);
        let mut exercises: Vec<Exercise> = self
            .store
            .by_index::<Exercise>("is_active", "true")
            .await?
            .into_iter()
            .filter(|e| query.is_empty() || e.name.to_lowercase().contains(&query))
            .collect();
        sort_by_name(&mut exercises);
        Ok(exercises)
    }

    /// Like [`search`](Self::search) but includes inactive exercises.
    pub async fn admin_list(&self, actor: &User, query: &str) -> Result<Vec<Exercise>> {
        ensure_admin(actor)?;

        let query = normalize_text(query);
        let mut exercises: Vec<Exercise> = self
            .store
            .all::<Exercise>()
            .await?
            .into_iter()
            .filter(|e| query.is_empty() || e.name.to_lowercase().contains(&query))
            .collect();
        sort_by_name(&mut exercises);
        Ok(exercises)
    }

    pub async fn create(&self, actor: &User, draft: ExerciseDraft) -> Result<Exercise> {
        ensure_admin(actor)?;
        self.insert(draft, &actor.email).await
    }

    /// Creates a catalog entry without the admin check. Callers are
    /// responsible for authorization.
    pub(crate) async fn insert(&self, draft: ExerciseDraft, created_by: &str) -> Result<Exercise> {
        validate_draft(&draft)?;

        let mut exercise = Exercise {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            primary_muscle: String::new(),
            secondary_muscles: Vec::new(),
            equipment: String::new(),
            exercise_type: ExerciseType::Other,
            instructions: String::new(),
            notes: String::new(),
            video_url: None,
            is_active: true,
            created_by: created_by.to_string(),
            created_at: self.clock.now(),
            updated_at: None,
        };
        apply_draft(&mut exercise, draft);
        self.store.put(&exercise).await?;

        tracing::info!("Added exercise {} ({})", exercise.name, exercise.id);
        Ok(exercise)
    }

    pub async fn update(&self, actor: &User, id: &str, draft: ExerciseDraft) -> Result<Exercise> {
        ensure_admin(actor)?;
        validate_draft(&draft)?;

        let mut exercise = self.get(id).await?;
        apply_draft(&mut exercise, draft);
        exercise.updated_at = Some(self.clock.now());
        self.store.put(&exercise).await?;
        Ok(exercise)
    }

    pub async fn set_active(&self, actor: &User, id: &str, active: bool) -> Result<Exercise> {
        ensure_admin(actor)?;

        let mut exercise = self.get(id).await?;
        exercise.is_active = active;
        exercise.updated_at = Some(self.clock.now());
        self.store.put(&exercise).await?;
        Ok(exercise)
    }

    pub async fn delete(&self, actor: &User, id: &str) -> Result<()> {
        ensure_admin(actor)?;

        self.get(id).await?;
        self.store.delete::<Exercise>(id).await?;

        tracing::info!("Deleted exercise {}", id);
        Ok(())
    }
}

fn apply_draft(exercise: &mut Exercise, draft: ExerciseDraft) {
    let equipment = normalize_text(&draft.equipment);

    exercise.name = draft.name.trim().to_string();
    exercise.primary_muscle = normalize_text(&draft.primary_muscle);
    exercise.secondary_muscles = draft
        .secondary_muscles
        .iter()
        .map(|m| normalize_text(m))
        .filter(|m| !m.is_empty())
        .collect();
    exercise.equipment = if equipment.is_empty() {
        "other".to_string()
    } else {
        equipment
    };
    exercise.exercise_type = ExerciseType::parse(&draft.exercise_type);
    exercise.instructions = draft.instructions.trim().to_string();
    exercise.notes = draft.notes.trim().to_string();
    exercise.video_url = draft
        .video_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
}
