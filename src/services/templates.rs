//! Template → day → item hierarchy.
//!
//! Multi-record writes are sequences of single-record writes. Deletes run
//! leaves first (items, then days, then the template) so a reader never sees
//! a child whose parent is already gone, only a parent with fewer children.
//! `reconcile_orphans` cleans up after a cascade that was interrupted.
//!
//! Every lookup is scoped to an owner. A day or item resolves only when its
//! template belongs to that owner; anything else is NotFound.

use chrono::Weekday;
use serde::Serialize;
use uuid::Uuid;

use super::grouping::{group_items, DayPlan, ItemGroup};
use crate::clock::SharedClock;
use crate::error::{AppError, Result};
use crate::models::{ComboType, Exercise, Prescription, Template, TemplateDay, TemplateItem};
use crate::store::Store;

/// Group-wide settings applied uniformly to every member.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEdit {
    pub prescription: Prescription,
    pub combo_type: Option<ComboType>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub days_removed: usize,
    pub items_removed: usize,
}

#[derive(Clone)]
pub struct TemplateService<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> TemplateService<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    // Templates
    pub async fn create_template(&self, owner: &str, name: &str, notes: &str) -> Result<Template> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Template name is required".to_string()));
        }

        let template = Template {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            name: name.to_string(),
            notes: notes.trim().to_string(),
            created_at: self.clock.now(),
        };
        self.store.put(&template).await?;
        Ok(template)
    }

    pub async fn get_template(&self, owner: &str, id: &str) -> Result<Template> {
        match self.store.get::<Template>(id).await? {
            Some(t) if t.owner_id == owner => Ok(t),
            _ => Err(AppError::NotFound("Template not found".to_string())),
        }
    }

    /// Newest first.
    pub async fn list_templates(&self, owner: &str) -> Result<Vec<Template>> {
        let mut templates = self.store.by_index::<Template>("owner_id", owner).await?;
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    pub async fn delete_template(&self, owner: &str, id: &str) -> Result<()> {
        self.get_template(owner, id).await?;

        let days = self.store.by_index::<TemplateDay>("template_id", id).await?;
        for day in &days {
            self.delete_day_cascade(&day.id).await?;
        }
        // Items whose day vanished earlier still point at the template.
        let stragglers = self
            .store
            .by_index::<TemplateItem>("template_id", id)
            .await?;
        for item in &stragglers {
            self.store.delete::<TemplateItem>(&item.id).await?;
        }
        self.store.delete::<Template>(id).await?;

        tracing::info!(
            "Deleted template {} with {} days and {} loose items",
            id,
            days.len(),
            stragglers.len()
        );
        Ok(())
    }

    // Days
    pub async fn add_day(
        &self,
        owner: &str,
        template_id: &str,
        weekday: Weekday,
        muscle_groups: &[String],
    ) -> Result<TemplateDay> {
        let muscle_groups: Vec<String> = muscle_groups
            .iter()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        if muscle_groups.is_empty() {
            return Err(AppError::Validation(
                "Select at least one muscle group".to_string(),
            ));
        }
        self.get_template(owner, template_id).await?;

        let days = self
            .store
            .by_index::<TemplateDay>("template_id", template_id)
            .await?;
        let order = days.iter().map(|d| d.order).max().unwrap_or(0) + 1;

        let day = TemplateDay {
            id: Uuid::new_v4().to_string(),
            template_id: template_id.to_string(),
            weekday,
            muscle_groups,
            order,
            created_at: self.clock.now(),
        };
        self.store.put(&day).await?;
        Ok(day)
    }

    pub async fn get_day(&self, owner: &str, id: &str) -> Result<TemplateDay> {
        let day = self
            .store
            .get::<TemplateDay>(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Template day not found".to_string()))?;
        if !self.owns_template(owner, &day.template_id).await? {
            return Err(AppError::NotFound("Template day not found".to_string()));
        }
        Ok(day)
    }

    async fn owns_template(&self, owner: &str, template_id: &str) -> Result<bool> {
        Ok(self
            .store
            .get::<Template>(template_id)
            .await?
            .is_some_and(|t| t.owner_id == owner))
    }

    pub async fn list_days(&self, owner: &str, template_id: &str) -> Result<Vec<TemplateDay>> {
        self.get_template(owner, template_id).await?;

        let mut days = self
            .store
            .by_index::<TemplateDay>("template_id", template_id)
            .await?;
        days.sort_by_key(|d| d.order);
        Ok(days)
    }

    pub async fn set_day_order(
        &self,
        owner: &str,
        day_id: &str,
        order: i64,
    ) -> Result<TemplateDay> {
        let mut day = self.get_day(owner, day_id).await?;
        day.order = order;
        self.store.put(&day).await?;
        Ok(day)
    }

    pub async fn delete_day(&self, owner: &str, id: &str) -> Result<()> {
        self.get_day(owner, id).await?;
        let removed = self.delete_day_cascade(id).await?;

        tracing::info!("Deleted day {} with {} items", id, removed);
        Ok(())
    }

    async fn delete_day_cascade(&self, day_id: &str) -> Result<usize> {
        let items = self
            .store
            .by_index::<TemplateItem>("template_day_id", day_id)
            .await?;
        for item in &items {
            self.store.delete::<TemplateItem>(&item.id).await?;
        }
        self.store.delete::<TemplateDay>(day_id).await?;
        Ok(items.len())
    }

    // Items
    pub async fn items_for_day(&self, owner: &str, day_id: &str) -> Result<Vec<TemplateItem>> {
        self.get_day(owner, day_id).await?;

        let mut items = self
            .store
            .by_index::<TemplateItem>("template_day_id", day_id)
            .await?;
        items.sort_by_key(|i| i.order);
        Ok(items)
    }

    pub async fn get_item(&self, owner: &str, id: &str) -> Result<TemplateItem> {
        let item = self
            .store
            .get::<TemplateItem>(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Template item not found".to_string()))?;
        if !self.owns_template(owner, &item.template_id).await? {
            return Err(AppError::NotFound("Template item not found".to_string()));
        }
        Ok(item)
    }

    async fn next_item_order(&self, day_id: &str) -> Result<i64> {
        let items = self
            .store
            .by_index::<TemplateItem>("template_day_id", day_id)
            .await?;
        Ok(items.iter().map(|i| i.order).max().unwrap_or(0) + 1)
    }

    async fn ensure_exercise(&self, exercise_id: &str) -> Result<()> {
        match self.store.get::<Exercise>(exercise_id).await? {
            Some(e) if e.is_active => Ok(()),
            Some(e) => Err(AppError::Validation(format!(
                "Exercise {} is inactive",
                e.name
            ))),
            None => Err(AppError::NotFound(format!(
                "Exercise {} not found",
                exercise_id
            ))),
        }
    }

    pub async fn add_item(
        &self,
        owner: &str,
        day_id: &str,
        exercise_id: &str,
        prescription: Prescription,
    ) -> Result<TemplateItem> {
        let day = self.get_day(owner, day_id).await?;
        self.ensure_exercise(exercise_id).await?;

        let item = TemplateItem {
            id: Uuid::new_v4().to_string(),
            template_id: day.template_id.clone(),
            template_day_id: day.id.clone(),
            exercise_id: exercise_id.to_string(),
            order: self.next_item_order(&day.id).await?,
            prescription: prescription.normalized(),
            combo_type: None,
            combo_group: None,
            combo_order: None,
        };
        self.store.put(&item).await?;
        Ok(item)
    }

    /// Inserts every exercise as one new combo. Nothing is written unless the
    /// day and all exercises resolve.
    pub async fn add_combo_items(
        &self,
        owner: &str,
        day_id: &str,
        exercise_ids: &[String],
        prescription: Prescription,
        combo_type: ComboType,
    ) -> Result<Vec<TemplateItem>> {
        if exercise_ids.is_empty() {
            return Err(AppError::Validation(
                "Select at least one exercise".to_string(),
            ));
        }
        for (i, id) in exercise_ids.iter().enumerate() {
            if exercise_ids[..i].contains(id) {
                return Err(AppError::Validation(
                    "An exercise can only appear once in a combo".to_string(),
                ));
            }
        }
        let day = self.get_day(owner, day_id).await?;
        for id in exercise_ids {
            self.ensure_exercise(id).await?;
        }

        let prescription = prescription.normalized();
        let group = Uuid::new_v4().to_string();
        let first_order = self.next_item_order(&day.id).await?;

        let items: Vec<TemplateItem> = exercise_ids
            .iter()
            .enumerate()
            .map(|(i, exercise_id)| TemplateItem {
                id: Uuid::new_v4().to_string(),
                template_id: day.template_id.clone(),
                template_day_id: day.id.clone(),
                exercise_id: exercise_id.clone(),
                order: first_order + i as i64,
                prescription: prescription.clone(),
                combo_type: Some(combo_type),
                combo_group: Some(group.clone()),
                combo_order: Some(i as u32 + 1),
            })
            .collect();

        for item in &items {
            self.store.put(item).await?;
        }

        tracing::info!(
            "Added {} with {} exercises to day {}",
            combo_type.as_str(),
            items.len(),
            day.id
        );
        Ok(items)
    }

    /// The stored group containing `first_item_id`, ordered by `combo_order`.
    pub async fn group_of(&self, owner: &str, first_item_id: &str) -> Result<Vec<TemplateItem>> {
        let item = self.get_item(owner, first_item_id).await?;

        let Some(group) = item.combo_group.clone() else {
            return Ok(vec![item]);
        };

        let mut members: Vec<TemplateItem> = self
            .store
            .by_index::<TemplateItem>("combo_group", &group)
            .await?
            .into_iter()
            .filter(|i| i.template_day_id == item.template_day_id)
            .collect();
        members.sort_by_key(|i| i.combo_order.unwrap_or(0));
        Ok(members)
    }

    /// Appends an exercise to an existing group. A singleton is promoted to a
    /// combo: it receives a fresh group id and `combo_order = 1`.
    pub async fn add_to_existing_combo(
        &self,
        owner: &str,
        first_item_id: &str,
        new_exercise_id: &str,
    ) -> Result<Vec<TemplateItem>> {
        let mut group = self.group_of(owner, first_item_id).await?;

        if group.iter().any(|i| i.exercise_id == new_exercise_id) {
            return Err(AppError::Conflict(
                "This exercise is already in the combo".to_string(),
            ));
        }
        self.ensure_exercise(new_exercise_id).await?;

        let first = group[0].clone();
        let combo_group = first
            .combo_group
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let combo_type = first.combo_type.unwrap_or(ComboType::Superset);
        let next_combo_order = group
            .iter()
            .filter_map(|i| i.combo_order)
            .max()
            .unwrap_or(0)
            .max(group.len() as u32)
            + 1;

        if first.combo_group.is_none() {
            for (i, item) in group.iter_mut().enumerate() {
                item.combo_group = Some(combo_group.clone());
                item.combo_type = Some(combo_type);
                item.combo_order = Some(i as u32 + 1);
                self.store.put(item).await?;
            }
        }

        let new_item = TemplateItem {
            id: Uuid::new_v4().to_string(),
            template_id: first.template_id.clone(),
            template_day_id: first.template_day_id.clone(),
            exercise_id: new_exercise_id.to_string(),
            order: self.next_item_order(&first.template_day_id).await?,
            prescription: first.prescription.clone(),
            combo_type: Some(combo_type),
            combo_group: Some(combo_group),
            combo_order: Some(next_combo_order),
        };
        self.store.put(&new_item).await?;
        group.push(new_item);

        Ok(group)
    }

    pub async fn edit_group(
        &self,
        owner: &str,
        first_item_id: &str,
        edit: &GroupEdit,
    ) -> Result<Vec<TemplateItem>> {
        let group = self.group_of(owner, first_item_id).await?;
        self.apply_group_edit(group, edit).await
    }

    /// Replaces the prescription of a group and keeps its combo type.
    pub async fn edit_group_prescription(
        &self,
        owner: &str,
        first_item_id: &str,
        prescription: Prescription,
    ) -> Result<Vec<TemplateItem>> {
        let group = self.group_of(owner, first_item_id).await?;
        let edit = GroupEdit {
            prescription,
            combo_type: group[0].combo_type,
        };
        self.apply_group_edit(group, &edit).await
    }

    async fn apply_group_edit(
        &self,
        mut group: Vec<TemplateItem>,
        edit: &GroupEdit,
    ) -> Result<Vec<TemplateItem>> {
        let prescription = edit.prescription.clone().normalized();

        for item in group.iter_mut() {
            item.prescription = prescription.clone();
            item.combo_type = edit.combo_type;
            self.store.put(item).await?;
        }
        Ok(group)
    }

    pub async fn remove_group(&self, owner: &str, first_item_id: &str) -> Result<usize> {
        let group = self.group_of(owner, first_item_id).await?;
        for item in &group {
            self.store.delete::<TemplateItem>(&item.id).await?;
        }
        Ok(group.len())
    }

    pub async fn grouped_items_for_day(&self, owner: &str, day_id: &str) -> Result<Vec<ItemGroup>> {
        let items = self.items_for_day(owner, day_id).await?;
        Ok(group_items(items))
    }

    /// Every day of a template with its grouped items, in day order.
    pub async fn template_plan(&self, owner: &str, template_id: &str) -> Result<Vec<DayPlan>> {
        let mut plan = Vec::new();
        for day in self.list_days(owner, template_id).await? {
            let groups = self.grouped_items_for_day(owner, &day.id).await?;
            plan.push(DayPlan { day, groups });
        }
        Ok(plan)
    }

    /// Rest seconds prescribed for `exercise_id` in one of `owner`'s
    /// templates, taken from its earliest item. `None` when the template is
    /// gone or does not contain the exercise.
    pub async fn prescribed_rest(
        &self,
        owner: &str,
        template_id: &str,
        exercise_id: &str,
    ) -> Result<Option<u32>> {
        if !self.owns_template(owner, template_id).await? {
            return Ok(None);
        }

        let rest = self
            .store
            .by_index::<TemplateItem>("template_id", template_id)
            .await?
            .into_iter()
            .filter(|i| i.exercise_id == exercise_id)
            .min_by_key(|i| i.order)
            .map(|i| i.prescription.rest_seconds);
        Ok(rest)
    }

    /// Removes days whose template is gone and items whose day or template
    /// is gone.
    pub async fn reconcile_orphans(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for day in self.store.all::<TemplateDay>().await? {
            if self.store.get::<Template>(&day.template_id).await?.is_none() {
                tracing::warn!("Removing orphaned day {}", day.id);
                report.items_removed += self.delete_day_cascade(&day.id).await?;
                report.days_removed += 1;
            }
        }

        for item in self.store.all::<TemplateItem>().await? {
            let day_missing = self
                .store
                .get::<TemplateDay>(&item.template_day_id)
                .await?
                .is_none();
            let template_missing = self
                .store
                .get::<Template>(&item.template_id)
                .await?
                .is_none();
            if day_missing || template_missing {
                tracing::warn!("Removing orphaned item {}", item.id);
                self.store.delete::<TemplateItem>(&item.id).await?;
                report.items_removed += 1;
            }
        }

        Ok(report)
    }

    pub async fn open_day_editor(&self, owner: &str, day_id: &str) -> Result<DayEditor<'_, S>> {
        let day = self.get_day(owner, day_id).await?;
        Ok(DayEditor {
            templates: self,
            owner: owner.to_string(),
            day,
            combo_type: None,
            selected: Vec::new(),
        })
    }
}

/// Selection state for adding exercises to one day.
///
/// In single mode at most one exercise is selected; in combo mode any number
/// can be. Changing the mode clears the selection. Dropping the editor
/// discards whatever was selected.
pub struct DayEditor<'a, S: Store> {
    templates: &'a TemplateService<S>,
    owner: String,
    day: TemplateDay,
    combo_type: Option<ComboType>,
    selected: Vec<String>,
}

impl<'a, S: Store> DayEditor<'a, S> {
    pub fn day(&self) -> &TemplateDay {
        &self.day
    }

    pub fn combo_type(&self) -> Option<ComboType> {
        self.combo_type
    }

    pub fn is_combo_mode(&self) -> bool {
        self.combo_type.is_some()
    }

    /// Accepts the raw combo selector value; blank or `none` means single mode.
    pub fn set_combo_type(&mut self, input: &str) {
        self.combo_type = ComboType::parse(input);
        self.selected.clear();
    }

    pub fn select(&mut self, exercise_id: &str) {
        if self.is_combo_mode() {
            if !self.selected.iter().any(|id| id == exercise_id) {
                self.selected.push(exercise_id.to_string());
            }
        } else {
            self.selected = vec![exercise_id.to_string()];
        }
    }

    /// Selects several exercises at once. Outside combo mode only one is
    /// allowed and the selection is left untouched on error.
    pub fn select_all(&mut self, exercise_ids: &[String]) -> Result<()> {
        if !self.is_combo_mode() && exercise_ids.len() > 1 {
            return Err(AppError::Validation(
                "Only one exercise can be added outside combo mode".to_string(),
            ));
        }
        for id in exercise_ids {
            self.select(id);
        }
        Ok(())
    }

    pub fn deselect(&mut self, exercise_id: &str) {
        self.selected.retain(|id| id != exercise_id);
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub async fn commit(&mut self, prescription: Prescription) -> Result<Vec<TemplateItem>> {
        let items = match (self.combo_type, self.selected.as_slice()) {
            (_, []) => {
                return Err(AppError::Validation(
                    "Select at least one exercise".to_string(),
                ))
            }
            (Some(combo_type), selected) => {
                self.templates
                    .add_combo_items(&self.owner, &self.day.id, selected, prescription, combo_type)
                    .await?
            }
            (None, [exercise_id, ..]) => vec![
                self.templates
                    .add_item(&self.owner, &self.day.id, exercise_id, prescription)
                    .await?,
            ],
        };

        self.selected.clear();
        Ok(items)
    }

    pub async fn groups(&self) -> Result<Vec<ItemGroup>> {
        self.templates
            .grouped_items_for_day(&self.owner, &self.day.id)
            .await
    }
}
