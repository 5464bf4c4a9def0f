use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Compound,
    Isolation,
    #[default]
    Other,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Compound => "compound",
            ExerciseType::Isolation => "isolation",
            ExerciseType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "compound" => ExerciseType::Compound,
            "isolation" => ExerciseType::Isolation,
            _ => ExerciseType::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub primary_muscle: String,
    pub secondary_muscles: Vec<String>,
    pub equipment: String,
    pub exercise_type: ExerciseType,
    pub instructions: String,
    pub notes: String,
    pub video_url: Option<String>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Exercise {
    const COLLECTION: &'static str = "exercises";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        vec![("is_active", self.is_active.to_string())]
    }
}

/// Every editable catalog field at once. Admin creates, edits and request
/// approvals all go through this one shape.
#[derive(Debug, Clone, Default)]
pub struct ExerciseDraft {
    pub name: String,
    pub primary_muscle: String,
    pub secondary_muscles: Vec<String>,
    pub equipment: String,
    pub exercise_type: String,
    pub instructions: String,
    pub notes: String,
    pub video_url: Option<String>,
}

pub struct SeedExercise {
    pub name: &'static str,
    pub primary: &'static str,
    pub secondary: &'static [&'static str],
    pub equipment: &'static str,
    pub exercise_type: ExerciseType,
}

const fn seed(
    name: &'static str,
    primary: &'static str,
    secondary: &'static [&'static str],
    equipment: &'static str,
    exercise_type: ExerciseType,
) -> SeedExercise {
    SeedExercise {
        name,
        primary,
        secondary,
        equipment,
        exercise_type,
    }
}

use ExerciseType::{Compound, Isolation};

pub const SEED_EXERCISES: &[SeedExercise] = &[
    // Chest
    seed("Barbell bench press", "chest", &["triceps", "front delts"], "barbell", Compound),
    seed("Incline dumbbell press", "chest", &["triceps", "front delts"], "dumbbell", Compound),
    seed("Cable crossover", "chest", &[], "cable", Isolation),
    seed("Decline bench press", "chest", &["triceps"], "barbell", Compound),
    // Back
    seed("Lat pulldown", "back", &["biceps"], "cable", Compound),
    seed("Barbell bent-over row", "back", &["biceps", "traps"], "barbell", Compound),
    seed("Seated cable row", "back", &["biceps"], "cable", Compound),
    seed("Cable pullover", "back", &["chest"], "cable", Isolation),
    seed("Pull-up", "back", &["biceps"], "bodyweight", Compound),
    // Legs
    seed("Back squat", "legs", &["glutes", "core"], "barbell", Compound),
    seed("45-degree leg press", "legs", &["glutes"], "machine", Compound),
    seed("Leg extension", "quads", &[], "machine", Isolation),
    seed("Leg curl", "hamstrings", &[], "machine", Isolation),
    seed("Stiff-leg deadlift", "hamstrings", &["glutes", "lower back"], "barbell", Compound),
    seed("Hip thrust", "glutes", &["hamstrings"], "barbell", Compound),
    // Shoulders
    seed("Overhead press", "shoulders", &["triceps"], "barbell", Compound),
    seed("Dumbbell lateral raise", "side delts", &[], "dumbbell", Isolation),
    seed("Front raise", "front delts", &[], "dumbbell", Isolation),
    seed("Upright row", "shoulders", &["traps"], "barbell", Compound),
    // Biceps
    seed("Barbell curl", "biceps", &[], "barbell", Isolation),
    seed("Alternating dumbbell curl", "biceps", &[], "dumbbell", Isolation),
    seed("Hammer curl", "biceps", &["forearms"], "dumbbell", Isolation),
    seed("Preacher curl", "biceps", &[], "barbell", Isolation),
    // Triceps
    seed("Cable triceps pushdown", "triceps", &[], "cable", Isolation),
    seed("Skull crusher", "triceps", &[], "barbell", Isolation),
    seed("Overhead triceps extension", "triceps", &[], "dumbbell", Isolation),
    seed("Parallel bar dip", "triceps", &["chest"], "bodyweight", Compound),
    // Core
    seed("Crunch", "abs", &[], "bodyweight", Isolation),
    seed("Plank", "core", &[], "bodyweight", Isolation),
    seed("Reverse crunch", "lower abs", &[], "bodyweight", Isolation),
];
