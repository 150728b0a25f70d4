//! Inspection of the host framework's internal per-element records.
//!
//! React attaches its fiber/props records to DOM nodes under generated
//! property keys. The snapshot script dumps the record found on an element —
//! together with a bounded chain of its owners — and this module walks that
//! chain to dig out the data payload (the component props). The walk is
//! side-effect free and a missing record is a normal outcome: the page may be
//! mid-transition.

use serde::Deserialize;
use serde_json::Value;

/// Property-key prefixes that mark a framework-internal record on a DOM node.
/// Kept in one place; the snapshot script receives them from here rather than
/// hardcoding its own copy.
pub fn internal_key_prefixes() -> &'static [&'static str] {
    &[
        "__reactFiber$",
        "__reactInternalInstance$",
        "__reactProps$",
    ]
}

/// Whether a property key names a framework-internal record.
pub fn is_internal_key(key: &str) -> bool {
    internal_key_prefixes().iter().any(|p| key.starts_with(p))
}

/// A node in an internal-record chain: the recognized key, the data payload
/// harvested from it, and the owner link one level up.
pub trait InspectableNode {
    /// The property key this record was found under.
    fn internal_key(&self) -> &str;

    /// Owner/return link, if the chain continues upward.
    fn owner(&self) -> Option<&dyn InspectableNode>;

    /// Data payload (props/state) attached to this record.
    fn payload(&self) -> Option<&serde_json::Map<String, Value>>;
}

/// One record of the dumped chain, owner-linked toward the component root.
#[derive(Debug, Clone, Deserialize)]
pub struct InternalRecord {
    pub key: String,
    #[serde(default)]
    pub props: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub owner: Option<Box<InternalRecord>>,
}

impl InspectableNode for InternalRecord {
    fn internal_key(&self) -> &str {
        &self.key
    }

    fn owner(&self) -> Option<&dyn InspectableNode> {
        self.owner.as_deref().map(|r| r as &dyn InspectableNode)
    }

    fn payload(&self) -> Option<&serde_json::Map<String, Value>> {
        self.props.as_ref()
    }
}

/// Locate the internal record reachable from `node`, walking the owner chain
/// up to `ancestor_hops` times. If the chain ends before the hop count is
/// satisfied, the last reachable record is returned. `None` means the node
/// carries no recognized internal key at all.
pub fn locate_internal_record(
    node: &dyn InspectableNode,
    ancestor_hops: usize,
) -> Option<&dyn InspectableNode> {
    if !is_internal_key(node.internal_key()) {
        return None;
    }
    let mut current = node;
    for _ in 0..ancestor_hops {
        match current.owner() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Some(current)
}

/// Truthy "this is the correct one" field in a record's payload, checked one
/// owner up from the element record (where the host keeps choice props).
pub fn record_marks_correct(record: &InternalRecord) -> bool {
    let Some(found) = locate_internal_record(record, 1) else {
        return false;
    };
    let Some(props) = found.payload() else {
        return false;
    };
    ["correct", "isCorrect"]
        .iter()
        .any(|k| props.get(*k).and_then(Value::as_bool) == Some(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(key: &str, props: Option<Value>, owner: Option<InternalRecord>) -> InternalRecord {
        InternalRecord {
            key: key.into(),
            props: props.and_then(|v| match v {
                Value::Object(m) => Some(m),
                _ => None,
            }),
            owner: owner.map(Box::new),
        }
    }

    #[test]
    fn test_key_recognition() {
        assert!(is_internal_key("__reactFiber$abc123"));
        assert!(is_internal_key("__reactInternalInstance$x"));
        assert!(is_internal_key("__reactProps$9f"));
        assert!(!is_internal_key("className"));
        assert!(!is_internal_key("reactFiber$missingprefix"));
    }

    #[test]
    fn test_unrecognized_key_yields_none() {
        let node = record("dataset", Some(json!({"correct": true})), None);
        assert!(locate_internal_record(&node, 0).is_none());
    }

    #[test]
    fn test_zero_hops_returns_node_itself() {
        let node = record("__reactFiber$a", Some(json!({"index": 2})), None);
        let found = locate_internal_record(&node, 0).unwrap();
        assert_eq!(found.payload().unwrap()["index"], 2);
    }

    #[test]
    fn test_hop_walk_follows_owner_chain() {
        let chain = record(
            "__reactFiber$a",
            None,
            Some(record(
                "__reactFiber$a",
                Some(json!({"depth": 1})),
                Some(record("__reactFiber$a", Some(json!({"depth": 2})), None)),
            )),
        );
        let found = locate_internal_record(&chain, 2).unwrap();
        assert_eq!(found.payload().unwrap()["depth"], 2);
    }

    #[test]
    fn test_hop_walk_stops_at_chain_end() {
        let chain = record(
            "__reactProps$b",
            None,
            Some(record("__reactProps$b", Some(json!({"top": true})), None)),
        );
        // asks for 5 hops but the chain only has one owner
        let found = locate_internal_record(&chain, 5).unwrap();
        assert_eq!(found.payload().unwrap()["top"], true);
    }

    #[test]
    fn test_record_marks_correct_reads_one_owner_up() {
        let chain = record(
            "__reactFiber$a",
            None,
            Some(record("__reactFiber$a", Some(json!({"correct": true})), None)),
        );
        assert!(record_marks_correct(&chain));

        let wrong = record(
            "__reactFiber$a",
            None,
            Some(record("__reactFiber$a", Some(json!({"correct": false})), None)),
        );
        assert!(!record_marks_correct(&wrong));
    }

    #[test]
    fn test_record_marks_correct_accepts_is_correct_spelling() {
        let chain = record(
            "__reactFiber$a",
            Some(json!({"isCorrect": true})),
            None,
        );
        // chain ends immediately, so the walk lands back on the node itself
        assert!(record_marks_correct(&chain));
    }

    #[test]
    fn test_record_without_payload_is_not_correct() {
        let chain = record("__reactFiber$a", None, None);
        assert!(!record_marks_correct(&chain));
    }
}
