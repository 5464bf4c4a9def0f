use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Template {
    const COLLECTION: &'static str = "templates";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        vec![("owner_id", self.owner_id.clone())]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDay {
    pub id: String,
    pub template_id: String,
    pub weekday: Weekday,
    pub muscle_groups: Vec<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl Record for TemplateDay {
    const COLLECTION: &'static str = "template_days";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        vec![("template_id", self.template_id.clone())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComboType {
    Superset,
    Biset,
    Triset,
    Giantset,
}

impl ComboType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComboType::Superset => "superset",
            ComboType::Biset => "biset",
            ComboType::Triset => "triset",
            ComboType::Giantset => "giantset",
        }
    }

    /// `None` means "no combo": blank input and the literal `none` both
    /// select single-exercise mode.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superset" => Some(ComboType::Superset),
            "biset" => Some(ComboType::Biset),
            "triset" => Some(ComboType::Triset),
            "giantset" | "giant set" => Some(ComboType::Giantset),
            _ => None,
        }
    }
}

pub const DEFAULT_TARGET_SETS: u32 = 3;
pub const DEFAULT_TARGET_REPS: &str = "8-12";
pub const DEFAULT_REST_SECONDS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub target_sets: u32,
    pub target_reps: String,
    /// Explicit reps for each set, overriding `target_reps` when present.
    pub custom_reps: Option<Vec<u32>>,
    pub rest_seconds: u32,
}

impl Default for Prescription {
    fn default() -> Self {
        Self {
            target_sets: DEFAULT_TARGET_SETS,
            target_reps: DEFAULT_TARGET_REPS.to_string(),
            custom_reps: None,
            rest_seconds: DEFAULT_REST_SECONDS,
        }
    }
}

impl Prescription {
    pub fn reps_display(&self) -> String {
        match &self.custom_reps {
            Some(reps) if !reps.is_empty() => reps
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            _ => self.target_reps.clone(),
        }
    }

    /// Blank or zero fields fall back to the defaults.
    pub fn normalized(mut self) -> Self {
        if self.target_sets == 0 {
            self.target_sets = DEFAULT_TARGET_SETS;
        }
        if self.target_reps.trim().is_empty() {
            self.target_reps = DEFAULT_TARGET_REPS.to_string();
        } else {
            self.target_reps = self.target_reps.trim().to_string();
        }
        if self.rest_seconds == 0 {
            self.rest_seconds = DEFAULT_REST_SECONDS;
        }
        if matches!(&self.custom_reps, Some(reps) if reps.is_empty()) {
            self.custom_reps = None;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateItem {
    pub id: String,
    pub template_id: String,
    pub template_day_id: String,
    pub exercise_id: String,
    pub order: i64,
    pub prescription: Prescription,
    pub combo_type: Option<ComboType>,
    pub combo_group: Option<String>,
    pub combo_order: Option<u32>,
}

impl Record for TemplateItem {
    const COLLECTION: &'static str = "template_items";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        let mut indexes = vec![
            ("template_id", self.template_id.clone()),
            ("template_day_id", self.template_day_id.clone()),
        ];
        if let Some(group) = &self.combo_group {
            indexes.push(("combo_group", group.clone()));
        }
        indexes
    }
}

/// A run of identical sets, e.g. three sets of twelve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepBlock {
    pub sets: u32,
    pub reps: u32,
}

pub fn expand_rep_blocks(blocks: &[RepBlock]) -> Vec<u32> {
    blocks
        .iter()
        .flat_map(|b| std::iter::repeat(b.reps).take(b.sets as usize))
        .collect()
}

pub fn rep_blocks_preview(blocks: &[RepBlock]) -> String {
    blocks
        .iter()
        .map(|b| format!("{}x{}", b.sets, b.reps))
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Parses `"12, 12, 10"` into a rep list. Blank input means no custom reps.
pub fn parse_custom_reps(input: &str) -> Result<Option<Vec<u32>>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    input
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u32>()
                .ok()
                .filter(|r| *r > 0)
                .ok_or_else(|| format!("Invalid rep count: {:?}", part))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
