use std::collections::HashSet;

use serde::Serialize;

use crate::models::{ComboType, Prescription, TemplateDay, TemplateItem};

/// Items executed as one unit: a combo, or a single exercise.
#[derive(Debug, Clone, Serialize)]
pub struct ItemGroup {
    pub items: Vec<TemplateItem>,
}

impl ItemGroup {
    pub fn first(&self) -> &TemplateItem {
        &self.items[0]
    }

    pub fn is_combo(&self) -> bool {
        self.items.len() > 1 || self.first().combo_group.is_some()
    }

    /// Group-level fields live on every member; the first one is authoritative.
    pub fn prescription(&self) -> &Prescription {
        &self.first().prescription
    }

    pub fn combo_type(&self) -> Option<ComboType> {
        self.first().combo_type
    }

    pub fn exercise_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.exercise_id.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayPlan {
    pub day: TemplateDay,
    pub groups: Vec<ItemGroup>,
}

/// Partitions a day's items into execution groups.
///
/// Items sharing a `combo_group` form one group ordered by `combo_order`;
/// every other item is its own group. Groups appear in ascending `order` of
/// the first member encountered. Input order breaks ties.
pub fn group_items(mut items: Vec<TemplateItem>) -> Vec<ItemGroup> {
    items.sort_by_key(|i| i.order);

    let mut groups = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for item in &items {
        if seen.contains(item.id.as_str()) {
            continue;
        }

        match item.combo_group.as_deref() {
            Some(group) => {
                let mut members: Vec<&TemplateItem> = items
                    .iter()
                    .filter(|i| i.combo_group.as_deref() == Some(group))
                    .collect();
                members.sort_by_key(|i| i.combo_order.unwrap_or(0));
                seen.extend(members.iter().map(|&i| i.id.as_str()));
                groups.push(ItemGroup {
                    items: members.into_iter().cloned().collect(),
                });
            }
            None => {
                seen.insert(item.id.as_str());
                groups.push(ItemGroup {
                    items: vec![item.clone()],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, order: i64, group: Option<&str>, combo_order: Option<u32>) -> TemplateItem {
        TemplateItem {
            id: id.to_string(),
            template_id: "t".to_string(),
            template_day_id: "d".to_string(),
            exercise_id: format!("ex-{}", id),
            order,
            prescription: Prescription::default(),
            combo_type: group.map(|_| ComboType::Superset),
            combo_group: group.map(str::to_string),
            combo_order,
        }
    }

    fn ids(groups: &[ItemGroup]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.items.iter().map(|i| i.id.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_combo_members_follow_combo_order() {
        let items = vec![
            item("1", 0, Some("G"), Some(2)),
            item("2", 0, Some("G"), Some(1)),
            item("3", 0, None, None),
        ];

        let groups = group_items(items);

        assert_eq!(ids(&groups), vec![vec!["2", "1"], vec!["3"]]);
        assert!(groups[0].is_combo());
        assert!(!groups[1].is_combo());
    }

    #[test]
    fn test_groups_follow_order_of_first_member() {
        let items = vec![
            item("late", 9, None, None),
            item("b", 5, Some("G"), Some(2)),
            item("a", 2, Some("G"), Some(1)),
            item("early", 1, None, None),
        ];

        let groups = group_items(items);

        assert_eq!(
            ids(&groups),
            vec![vec!["early"], vec!["a", "b"], vec!["late"]]
        );
    }

    #[test]
    fn test_separate_combo_groups_stay_apart() {
        let items = vec![
            item("a1", 1, Some("A"), Some(1)),
            item("b1", 2, Some("B"), Some(1)),
            item("a2", 3, Some("A"), Some(2)),
            item("b2", 4, Some("B"), Some(2)),
        ];

        let groups = group_items(items);

        assert_eq!(ids(&groups), vec![vec!["a1", "a2"], vec!["b1", "b2"]]);
    }

    #[test]
    fn test_empty_day_has_no_groups() {
        assert!(group_items(Vec::new()).is_empty());
    }
}
