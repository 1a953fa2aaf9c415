//! Reference-table indexing.
//!
//! Reference tables arrive as flat sequences. Each build indexes them once into
//! `id -> concept` maps borrowed from the input, so per-order lookups are O(1) and nothing is
//! copied until a view field actually needs an owned value.

use lab_model::ConceptRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Key the listing entry is serialised under.
pub(crate) const PARENT_FIELD: &str = "parent";

/// A concept found through a reference table, with the entry that listed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedConcept<'a> {
    pub concept: &'a ConceptRecord,
    pub parent: Option<&'a ConceptRecord>,
}

impl IndexedConcept<'_> {
    /// Owned, serialisable copy for the view.
    ///
    /// A backend `parent` field on the concept is dropped; the listing entry takes its place.
    pub fn to_keyed(&self) -> KeyedConcept {
        let mut concept = self.concept.clone();
        concept.extra.remove(PARENT_FIELD);

        KeyedConcept {
            concept,
            parent: self.parent_ref(),
        }
    }

    /// Reference to the entry that listed this concept, if any.
    pub fn parent_ref(&self) -> Option<ParentRef> {
        self.parent.map(|parent| ParentRef {
            uuid: parent.uuid.clone(),
            display: parent.display.clone(),
        })
    }
}

/// Owned form of [`IndexedConcept`] as it appears in a sample view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyedConcept {
    #[serde(flatten)]
    pub concept: ConceptRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

/// The reference entry (department or specimen source) that listed a test order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    pub uuid: Option<String>,
    pub display: Option<String>,
}

/// `id -> concept` index over one reference table.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex<'a> {
    by_id: HashMap<&'a str, IndexedConcept<'a>>,
}

impl<'a> ReferenceIndex<'a> {
    /// Index a department or specimen-source table by the test orders it lists.
    ///
    /// Every `setMembers` entry is keyed by its own uuid and remembers the listing entry as its
    /// parent; a later listing of the same test order replaces an earlier one. Entries are also
    /// keyed by their own uuid unless a test order already claims that id, so a sample-level
    /// specimen concept resolves to its table entry.
    pub fn by_test_order(table: &'a [ConceptRecord]) -> Self {
        let mut by_id = HashMap::new();
        let mut claimed_by_member = std::collections::HashSet::new();

        for entry in table {
            for member in &entry.set_members {
                if let Some(id) = member.uuid.as_deref() {
                    claimed_by_member.insert(id);
                    by_id.insert(
                        id,
                        IndexedConcept {
                            concept: member,
                            parent: Some(entry),
                        },
                    );
                }
            }
        }

        for entry in table {
            if let Some(id) = entry.uuid.as_deref() {
                if !claimed_by_member.contains(id) {
                    by_id.entry(id).or_insert(IndexedConcept {
                        concept: entry,
                        parent: None,
                    });
                }
            }
        }

        Self { by_id }
    }

    /// Index a flat table by each entry's own uuid; the first entry with a given uuid wins.
    pub fn by_uuid(table: &'a [ConceptRecord]) -> Self {
        let mut by_id = HashMap::new();
        for entry in table {
            if let Some(id) = entry.uuid.as_deref() {
                by_id.entry(id).or_insert(IndexedConcept {
                    concept: entry,
                    parent: None,
                });
            }
        }
        Self { by_id }
    }

    pub fn get(&self, id: Option<&str>) -> Option<IndexedConcept<'a>> {
        id.and_then(|id| self.by_id.get(id).copied())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(value: serde_json::Value) -> ConceptRecord {
        serde_json::from_value(value).expect("concept should parse")
    }

    fn departments() -> Vec<ConceptRecord> {
        vec![
            concept(serde_json::json!({
                "uuid": "dep-chem",
                "display": "Chemistry",
                "setMembers": [
                    {"uuid": "order-glucose", "display": "Chemistry: Glucose"},
                    {"uuid": "order-lft", "display": "Chemistry: LFT"}
                ]
            })),
            concept(serde_json::json!({
                "uuid": "dep-haem",
                "display": "Haematology",
                "setMembers": [{"uuid": "order-fbc", "display": "FBC"}]
            })),
        ]
    }

    #[test]
    fn keys_test_orders_to_their_department() {
        let table = departments();
        let index = ReferenceIndex::by_test_order(&table);

        let found = index.get(Some("order-lft")).expect("lft indexed");
        assert_eq!(found.concept.display.as_deref(), Some("Chemistry: LFT"));
        assert_eq!(
            found.parent.and_then(|p| p.uuid.as_deref()),
            Some("dep-chem")
        );
    }

    #[test]
    fn entries_are_reachable_by_their_own_uuid() {
        let table = departments();
        let index = ReferenceIndex::by_test_order(&table);

        let found = index.get(Some("dep-haem")).expect("department indexed");
        assert!(found.parent.is_none());
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn later_listing_of_a_test_order_wins() {
        let table = vec![
            concept(serde_json::json!({"uuid": "a", "setMembers": [{"uuid": "t", "display": "first"}]})),
            concept(serde_json::json!({"uuid": "b", "setMembers": [{"uuid": "t", "display": "second"}]})),
        ];
        let index = ReferenceIndex::by_test_order(&table);
        let found = index.get(Some("t")).expect("indexed");
        assert_eq!(found.concept.display.as_deref(), Some("second"));
    }

    #[test]
    fn test_order_ids_take_precedence_over_entry_ids() {
        let table = vec![
            concept(serde_json::json!({"uuid": "x", "display": "entry"})),
            concept(serde_json::json!({"uuid": "y", "setMembers": [{"uuid": "x", "display": "member"}]})),
        ];
        let index = ReferenceIndex::by_test_order(&table);
        let found = index.get(Some("x")).expect("indexed");
        assert_eq!(found.concept.display.as_deref(), Some("member"));
    }

    #[test]
    fn by_uuid_keeps_first_entry() {
        let table = vec![
            concept(serde_json::json!({"uuid": "r1", "display": "Haemolysed"})),
            concept(serde_json::json!({"uuid": "r1", "display": "Duplicate"})),
        ];
        let index = ReferenceIndex::by_uuid(&table);
        assert_eq!(
            index
                .get(Some("r1"))
                .and_then(|found| found.concept.display.as_deref()),
            Some("Haemolysed")
        );
    }

    #[test]
    fn missing_ids_resolve_to_none() {
        let index = ReferenceIndex::by_test_order(&[]);
        assert!(index.is_empty());
        assert!(index.get(None).is_none());
        assert!(index.get(Some("anything")).is_none());
    }

    #[test]
    fn keyed_concept_serialises_flat_with_parent() {
        let table = departments();
        let index = ReferenceIndex::by_test_order(&table);
        let keyed = index.get(Some("order-fbc")).expect("indexed").to_keyed();
        let json = serde_json::to_value(&keyed).expect("serialise");
        assert_eq!(json["uuid"], "order-fbc");
        assert_eq!(json["parent"]["display"], "Haematology");
    }

    #[test]
    fn backend_parent_field_gives_way_to_listing_entry() {
        let table = vec![concept(serde_json::json!({
            "uuid": "dep-micro",
            "display": "Microbiology",
            "setMembers": [{"uuid": "order-mcs", "parent": "stale", "specimen": "swab"}]
        }))];
        let index = ReferenceIndex::by_test_order(&table);
        let keyed = index.get(Some("order-mcs")).expect("indexed").to_keyed();
        assert!(!keyed.concept.extra.contains_key("parent"));

        let json = serde_json::to_string(&keyed).expect("serialise");
        assert_eq!(json.matches("\"parent\"").count(), 1);
        let json: serde_json::Value = serde_json::from_str(&json).expect("reparse");
        assert_eq!(json["parent"]["uuid"], "dep-micro");
        assert_eq!(json["specimen"], "swab");
    }

    #[test]
    fn top_level_entry_drops_backend_parent() {
        let table = vec![concept(serde_json::json!({"uuid": "dep-x", "parent": "stale"}))];
        let index = ReferenceIndex::by_test_order(&table);
        let json = serde_json::to_value(index.get(Some("dep-x")).expect("indexed").to_keyed())
            .expect("serialise");
        assert!(json.get("parent").is_none());
    }
}
