//! Bulk assignment payloads.
//!
//! A payload is a JSON array whose items are either grouped
//! (`{eid, month, year, tasks: [...]}`) or flat
//! (`{eid, projectType, assigned, completed, month, year}`). Items are
//! normalized into one [`GroupedDoc`] per `eid::month::year` and then merged
//! into the assignment store. The merge overwrites counts per project type,
//! so replaying a payload leaves the store unchanged.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use crate::assigned::{self, AssignedEntry, AssignedGroup, AssignmentStore, GroupKey};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BulkItem {
    Grouped(GroupedRow),
    Flat(FlatRow),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupedRow {
    #[serde(default, alias = "employee", deserialize_with = "optional_id")]
    pub eid: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub month: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub year: i32,
    pub tasks: Vec<BulkEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BulkEntry {
    #[serde(rename = "projectType", alias = "projecttype")]
    pub project_type: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub assigned: u32,
    #[serde(default, deserialize_with = "number_or_string")]
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlatRow {
    #[serde(default, alias = "employee", deserialize_with = "optional_id")]
    pub eid: Option<String>,
    #[serde(rename = "projectType", alias = "projecttype")]
    pub project_type: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub assigned: u32,
    #[serde(default, deserialize_with = "number_or_string")]
    pub completed: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub month: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub year: i32,
}

impl BulkItem {
    fn eid(&self) -> Option<&str> {
        match self {
            BulkItem::Grouped(row) => row.eid.as_deref(),
            BulkItem::Flat(row) => row.eid.as_deref(),
        }
    }
}

/// Canonical grouped record produced by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedDoc {
    pub eid: String,
    pub month: u32,
    pub year: i32,
    pub tasks: Vec<AssignedEntry>,
}

impl GroupedDoc {
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.eid.clone(), self.month, self.year)
    }

    /// Insert or overwrite the entry for a project type; the later one wins.
    fn put(&mut self, entry: AssignedEntry) {
        match self
            .tasks
            .iter_mut()
            .find(|e| e.project_type == entry.project_type)
        {
            Some(existing) => *existing = entry,
            None => self.tasks.push(entry),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub id: String,
    pub eid: String,
    pub month: u32,
    pub year: i32,
    pub action: MergeAction,
}

/// Parse a bulk payload.
///
/// Items without an employee id are skipped before their shape is checked;
/// any other malformed item is a validation error naming its index.
pub fn parse_items(payload: &str) -> Result<Vec<BulkItem>> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| Error::invalid("payload", format!("not valid JSON: {e}")))?;
    let raw = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(_) => vec![value],
        _ => return Err(Error::invalid("payload", "expected an array of rows")),
    };

    let mut items = Vec::with_capacity(raw.len());
    for (idx, item) in raw.into_iter().enumerate() {
        if !has_eid(&item) {
            tracing::debug!(index = idx, "skipping bulk row without eid");
            continue;
        }
        let item: BulkItem = serde_json::from_value(item).map_err(|e| {
            Error::invalid(format!("payload[{idx}]"), format!("not a flat or grouped row: {e}"))
        })?;
        items.push(item);
    }
    Ok(items)
}

fn has_eid(item: &serde_json::Value) -> bool {
    ["eid", "employee"].iter().any(|field| match item.get(field) {
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(serde_json::Value::Number(_)) => true,
        _ => false,
    })
}

/// Collapse items into one document per `eid::month::year`, in first-seen order.
pub fn normalize(items: Vec<BulkItem>) -> Vec<GroupedDoc> {
    let mut docs: Vec<GroupedDoc> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for item in items {
        let Some(eid) = item.eid().map(str::trim).filter(|e| !e.is_empty()) else {
            continue;
        };
        let eid = eid.to_string();
        let (month, year, entries) = match item {
            BulkItem::Grouped(row) => (row.month, row.year, row.tasks),
            BulkItem::Flat(row) => (
                row.month,
                row.year,
                vec![BulkEntry {
                    project_type: row.project_type,
                    assigned: row.assigned,
                    completed: row.completed,
                }],
            ),
        };

        let key = GroupKey::new(eid.clone(), month, year);
        let idx = *index.entry(key).or_insert_with(|| {
            docs.push(GroupedDoc {
                eid,
                month,
                year,
                tasks: Vec::new(),
            });
            docs.len() - 1
        });

        for entry in entries {
            let project_type = entry.project_type.trim();
            if project_type.is_empty() {
                continue;
            }
            docs[idx].put(AssignedEntry {
                project_type: project_type.to_string(),
                assigned: entry.assigned,
                completed: entry.completed,
            });
        }
    }
    docs
}

/// Merge normalized documents into the store under one lock.
///
/// The batch is all-or-nothing: an invalid document aborts the merge before
/// anything is written.
pub fn merge(store: &AssignmentStore, docs: Vec<GroupedDoc>) -> Result<Vec<MergeResult>> {
    let results = store.with_groups(|groups| {
        let mut results = Vec::with_capacity(docs.len());
        for doc in docs {
            let key = doc.key();
            let result = match groups.iter_mut().find(|g| g.key() == key) {
                Some(existing) => {
                    for entry in doc.tasks {
                        let slot = existing.entry_mut(&entry.project_type);
                        slot.assigned = entry.assigned;
                        slot.completed = entry.completed;
                    }
                    existing.updated_at = Utc::now();
                    MergeResult {
                        id: existing.id.clone(),
                        eid: doc.eid,
                        month: doc.month,
                        year: doc.year,
                        action: MergeAction::Updated,
                    }
                }
                None => {
                    let group = AssignedGroup::new(key, doc.tasks);
                    assigned::validate_group(&group)?;
                    let id = group.id.clone();
                    assigned::insert_into(groups, group)?;
                    MergeResult {
                        id,
                        eid: doc.eid,
                        month: doc.month,
                        year: doc.year,
                        action: MergeAction::Created,
                    }
                }
            };
            results.push(result);
        }
        Ok(results)
    })?;

    let created = results
        .iter()
        .filter(|r| r.action == MergeAction::Created)
        .count();
    tracing::info!(groups = results.len(), created, "bulk assignment merged");
    Ok(results)
}

/// Employee ids arrive as strings or bare numbers; numbers are kept as text.
fn optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

fn number_or_string<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    let n = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("'{s}' is not a number")))?,
    };
    T::try_from(n).map_err(|_| serde::de::Error::custom(format!("{n} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assigned::AssignmentFilter;
    use crate::storage::Storage;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> AssignmentStore {
        AssignmentStore::new(Storage::new(dir.path()))
    }

    fn snapshot(store: &AssignmentStore) -> Vec<(String, String, u32, i32, Vec<AssignedEntry>)> {
        store
            .list(&AssignmentFilter::default())
            .unwrap()
            .into_iter()
            .map(|g| (g.id, g.eid, g.month, g.year, g.tasks))
            .collect()
    }

    #[test]
    fn parses_both_shapes_and_numeric_strings() {
        let items = parse_items(
            r#"[
                {"eid": "E1", "projectType": "Film", "assigned": 5, "month": "6", "year": 2024},
                {"employee": "E2", "month": 6, "year": "2024",
                 "tasks": [{"projectType": "Reel", "assigned": 2, "completed": 1}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], BulkItem::Flat(row) if row.month == 6 && row.completed == 0));
        assert!(matches!(&items[1], BulkItem::Grouped(row) if row.year == 2024));
    }

    #[test]
    fn rows_without_eid_are_dropped() {
        let items = parse_items(
            r#"[
                {"projectType": "Film", "assigned": 5, "month": 6, "year": 2024},
                {"eid": "  ", "projectType": "Film"},
                {"eid": "E1", "projectType": "Film", "assigned": 1, "month": 6, "year": 2024}
            ]"#,
        )
        .unwrap();
        assert_eq!(normalize(items).len(), 1);
    }

    #[test]
    fn numeric_eid_is_kept() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let items = parse_items(
            r#"[{"eid": 101, "projectType": "Film", "assigned": 5, "month": 6, "year": 2024}]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 1);

        let results = merge(&store, normalize(items)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action, MergeAction::Created);
        assert_eq!(results[0].eid, "101");
        assert!(store.find_group("101", 6, 2024).unwrap().is_some());
    }

    #[test]
    fn malformed_row_names_its_index() {
        let err = parse_items(r#"[{"eid": "E1", "projectType": "Film", "month": "June", "year": 2024}]"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "payload[0]"));
    }

    #[test]
    fn normalize_dedups_and_last_entry_wins() {
        let items = parse_items(
            r#"[
                {"eid": "E1", "projectType": "Film", "assigned": 5, "month": 6, "year": 2024},
                {"eid": "E2", "projectType": "Film", "assigned": 1, "month": 6, "year": 2024},
                {"eid": "E1", "month": 6, "year": 2024,
                 "tasks": [{"projectType": "Reel", "assigned": 2}, {"projectType": "Film", "assigned": 9}]}
            ]"#,
        )
        .unwrap();
        let docs = normalize(items);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].eid, "E1");
        assert_eq!(docs[1].eid, "E2");
        assert_eq!(docs[0].tasks.len(), 2);
        assert_eq!(docs[0].tasks[0].project_type, "Film");
        assert_eq!(docs[0].tasks[0].assigned, 9);
    }

    #[test]
    fn posting_same_row_twice_keeps_one_document() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let payload = r#"[{"eid":"E1","projectType":"Film","assigned":5,"completed":0,"month":6,"year":2024}]"#;

        let first = merge(&store, normalize(parse_items(payload).unwrap())).unwrap();
        let second = merge(&store, normalize(parse_items(payload).unwrap())).unwrap();
        assert_eq!(first[0].action, MergeAction::Created);
        assert_eq!(second[0].action, MergeAction::Updated);
        assert_eq!(first[0].id, second[0].id);

        let groups = store.list(&AssignmentFilter::default()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].tasks,
            vec![AssignedEntry {
                project_type: "Film".to_string(),
                assigned: 5,
                completed: 0,
            }]
        );
    }

    #[test]
    fn merge_overwrites_counts_and_keeps_other_entries() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        merge(
            &store,
            normalize(
                parse_items(r#"[{"eid":"E1","month":6,"year":2024,"tasks":[
                    {"projectType":"Film","assigned":5,"completed":2},
                    {"projectType":"Reel","assigned":3,"completed":3}]}]"#)
                .unwrap(),
            ),
        )
        .unwrap();
        merge(
            &store,
            normalize(
                parse_items(r#"[{"eid":"E1","projectType":"Film","assigned":7,"month":6,"year":2024}]"#)
                    .unwrap(),
            ),
        )
        .unwrap();

        let group = store.find_group("E1", 6, 2024).unwrap().unwrap();
        let film = group.entry("Film").unwrap();
        assert_eq!((film.assigned, film.completed), (7, 0));
        assert_eq!(group.entry("Reel").unwrap().assigned, 3);
    }

    #[test]
    fn invalid_month_aborts_whole_batch() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let items = parse_items(
            r#"[
                {"eid":"E1","projectType":"Film","assigned":1,"month":6,"year":2024},
                {"eid":"E2","projectType":"Film","assigned":1,"month":13,"year":2024}
            ]"#,
        )
        .unwrap();
        assert!(merge(&store, normalize(items)).is_err());
        assert!(store.list(&AssignmentFilter::default()).unwrap().is_empty());
    }

    fn arb_item() -> impl Strategy<Value = BulkItem> {
        let eid = prop_oneof![Just(None), Just(Some(String::new())), "E[1-3]".prop_map(Some)];
        let entry = ("(Film|Reel|Album)", 0u32..20, 0u32..20).prop_map(|(project_type, assigned, completed)| {
            BulkEntry {
                project_type,
                assigned,
                completed,
            }
        });
        let flat = (eid.clone(), entry.clone(), 1u32..=12, 2023i32..=2024).prop_map(|(eid, e, month, year)| {
            BulkItem::Flat(FlatRow {
                eid,
                project_type: e.project_type,
                assigned: e.assigned,
                completed: e.completed,
                month,
                year,
            })
        });
        let grouped = (eid, prop::collection::vec(entry, 0..4), 1u32..=12, 2023i32..=2024).prop_map(
            |(eid, tasks, month, year)| {
                BulkItem::Grouped(GroupedRow {
                    eid,
                    month,
                    year,
                    tasks,
                })
            },
        );
        prop_oneof![flat, grouped]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn merge_is_idempotent(items in prop::collection::vec(arb_item(), 0..12)) {
            let dir = TempDir::new().unwrap();
            let store = store(&dir);

            merge(&store, normalize(items.clone())).unwrap();
            let once = snapshot(&store);
            merge(&store, normalize(items)).unwrap();
            prop_assert_eq!(once, snapshot(&store));
        }

        #[test]
        fn groups_never_repeat_a_project_type(
            first in prop::collection::vec(arb_item(), 0..8),
            second in prop::collection::vec(arb_item(), 0..8),
        ) {
            let dir = TempDir::new().unwrap();
            let store = store(&dir);
            merge(&store, normalize(first)).unwrap();
            merge(&store, normalize(second)).unwrap();

            let groups = store.list(&AssignmentFilter::default()).unwrap();
            let mut keys: Vec<_> = groups.iter().map(|g| g.key()).collect();
            let total = keys.len();
            keys.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
            keys.dedup();
            prop_assert_eq!(keys.len(), total);

            for group in groups {
                let mut types: Vec<_> = group.tasks.iter().map(|e| e.project_type.clone()).collect();
                let n = types.len();
                types.sort();
                types.dedup();
                prop_assert_eq!(types.len(), n);
            }
        }
    }
}
