//! Session (tab) state and the traversal engine.
//!
//! A [`Session`] is one independent exploration of a tree:
//! - the revealed hierarchy, as [`NodeWithLevel`] entries grouped by level
//! - the option selected per node
//! - hint visibility and tried/failed marks per node
//! - a decision timestamp per node (presence means "decided")
//!
//! Submodules provide the hierarchy builder ([`reveal`]), the
//! [`SessionManager`] that owns a bounded set of tabs, and the path
//! reconstructor ([`selected_path`]).

mod hierarchy;
mod manager;
mod path;

pub use hierarchy::{reveal, reveal_at, RefusalReason, RevealOutcome};
pub use manager::{ManagerSnapshot, SessionManager};
pub use path::{resolve_path, selected_path, PathStep};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::tree::Tree;

/// One node's placement in a session's revealed hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeWithLevel {
    /// The revealed node.
    pub node_id: String,
    /// Depth, 0 for the root.
    pub level: usize,
    /// Node whose decision revealed this one; `None` at level 0.
    pub parent_id: Option<String>,
}

impl NodeWithLevel {
    /// Level-0 entry for a tree root
    pub fn root(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            level: 0,
            parent_id: None,
        }
    }

    /// Entry revealed by `parent_id`
    pub fn child(node_id: impl Into<String>, level: usize, parent_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            level,
            parent_id: Some(parent_id.into()),
        }
    }
}

/// A single exploration tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Display name ("Set N" unless renamed).
    pub name: String,
    /// Revealed nodes.
    #[serde(default)]
    pub node_hierarchy: Vec<NodeWithLevel>,
    /// Selected option id per node.
    #[serde(default)]
    pub selected_options: HashMap<String, String>,
    /// Hint visibility per node.
    #[serde(default)]
    pub show_hints: HashMap<String, bool>,
    /// Tried/failed marks per node.
    #[serde(default)]
    pub tried_nodes: HashMap<String, bool>,
    /// Decision time (epoch millis) per decided node.
    #[serde(default)]
    pub decided_nodes: HashMap<String, i64>,
}

impl Session {
    /// Create a session anchored at `root_node_id`
    pub fn new(name: impl Into<String>, root_node_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            node_hierarchy: vec![NodeWithLevel::root(root_node_id)],
            selected_options: HashMap::new(),
            show_hints: HashMap::new(),
            tried_nodes: HashMap::new(),
            decided_nodes: HashMap::new(),
        }
    }

    /// Set a specific session id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Re-anchor an empty hierarchy at the root. Returns true if anything changed.
    pub fn ensure_root(&mut self, root_node_id: &str) -> bool {
        if self.node_hierarchy.is_empty() {
            self.node_hierarchy.push(NodeWithLevel::root(root_node_id));
            true
        } else {
            false
        }
    }

    /// Overwrite the node's selection. Nothing is revealed until [`reveal`] runs.
    pub fn set_selected_option(
        &mut self,
        node_id: impl Into<String>,
        option_id: impl Into<String>,
    ) {
        self.selected_options.insert(node_id.into(), option_id.into());
    }

    /// Selected option for a node
    pub fn selected_option(&self, node_id: &str) -> Option<&str> {
        self.selected_options.get(node_id).map(String::as_str)
    }

    /// Flip hint visibility; returns the new value.
    pub fn toggle_hint(&mut self, node_id: &str) -> bool {
        let entry = self.show_hints.entry(node_id.to_string()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    /// Whether hints are shown for a node
    pub fn hint_visible(&self, node_id: &str) -> bool {
        self.show_hints.get(node_id).copied().unwrap_or(false)
    }

    /// Flip the tried/failed mark; returns the new value.
    pub fn toggle_tried(&mut self, node_id: &str) -> bool {
        let entry = self.tried_nodes.entry(node_id.to_string()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    /// Whether the node is marked tried/failed
    pub fn is_tried(&self, node_id: &str) -> bool {
        self.tried_nodes.get(node_id).copied().unwrap_or(false)
    }

    /// Decision timestamp for a node
    pub fn decided_at(&self, node_id: &str) -> Option<i64> {
        self.decided_nodes.get(node_id).copied()
    }

    /// Whether the node has been decided
    pub fn is_decided(&self, node_id: &str) -> bool {
        self.decided_nodes.contains_key(node_id)
    }

    /// Most recent decision timestamp in the session
    pub fn latest_decision(&self) -> Option<i64> {
        self.decided_nodes.values().copied().max()
    }

    /// Stamp for a new decision made at `now`. Stamps strictly increase within
    /// a session, so decisions landing in the same millisecond stay ordered.
    pub fn next_decision_stamp(&self, now: i64) -> i64 {
        match self.latest_decision() {
            Some(latest) if latest >= now => latest + 1,
            _ => now,
        }
    }

    /// Whether the node holds the session's most recent decision, unshared.
    pub fn is_latest_decision(&self, node_id: &str) -> bool {
        let Some(stamp) = self.decided_at(node_id) else {
            return false;
        };
        self.decided_nodes
            .iter()
            .all(|(id, other)| id == node_id || *other < stamp)
    }

    /// Decided and not marked failed.
    pub fn is_live(&self, node_id: &str) -> bool {
        self.is_decided(node_id) && !self.is_tried(node_id)
    }

    /// Whether `node_id` sits at `level`
    pub fn contains(&self, node_id: &str, level: usize) -> bool {
        self.node_hierarchy
            .iter()
            .any(|e| e.node_id == node_id && e.level == level)
    }

    /// Shallowest level at which the node is revealed
    pub fn level_of(&self, node_id: &str) -> Option<usize> {
        self.node_hierarchy
            .iter()
            .filter(|e| e.node_id == node_id)
            .map(|e| e.level)
            .min()
    }

    /// Deepest populated level
    pub fn max_level(&self) -> Option<usize> {
        self.node_hierarchy.iter().map(|e| e.level).max()
    }

    /// Hierarchy grouped by level, ascending; insertion order within a level.
    pub fn levels(&self) -> BTreeMap<usize, Vec<&NodeWithLevel>> {
        let mut levels: BTreeMap<usize, Vec<&NodeWithLevel>> = BTreeMap::new();
        for entry in &self.node_hierarchy {
            levels.entry(entry.level).or_default().push(entry);
        }
        levels
    }

    /// Reveal using the node's stored selection at its recorded level.
    pub fn decide(&mut self, tree: &Tree, node_id: &str) -> RevealOutcome {
        let Some(option_id) = self.selected_option(node_id).map(str::to_string) else {
            return RevealOutcome::Refused {
                reason: RefusalReason::EmptySelection,
            };
        };
        let Some(level) = self.level_of(node_id) else {
            return RevealOutcome::Refused {
                reason: RefusalReason::NodeNotRevealed,
            };
        };
        reveal(tree, self, node_id, &option_id, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new_anchors_root() {
        let session = Session::new("Set 1", "root");
        assert!(!session.id.is_empty());
        assert_eq!(session.name, "Set 1");
        assert_eq!(session.node_hierarchy, vec![NodeWithLevel::root("root")]);
        assert!(session.decided_nodes.is_empty());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = Session::new("Set 1", "root");
        let b = Session::new("Set 2", "root");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_toggle_hint_flips() {
        let mut session = Session::new("Set 1", "root");
        assert!(!session.hint_visible("root"));
        assert!(session.toggle_hint("root"));
        assert!(session.hint_visible("root"));
        assert!(!session.toggle_hint("root"));
        assert_eq!(session.node_hierarchy.len(), 1);
    }

    #[test]
    fn test_toggle_tried_keeps_decision() {
        let mut session = Session::new("Set 1", "root");
        session.decided_nodes.insert("root".to_string(), 10);

        assert!(session.toggle_tried("root"));
        assert!(session.is_decided("root"));
        assert!(!session.is_live("root"));

        assert!(!session.toggle_tried("root"));
        assert!(session.is_live("root"));
    }

    #[test]
    fn test_decision_stamps_strictly_increase() {
        let mut session = Session::new("Set 1", "root");
        assert_eq!(session.next_decision_stamp(50), 50);

        session.decided_nodes.insert("root".to_string(), 50);
        assert_eq!(session.next_decision_stamp(50), 51);
        assert_eq!(session.next_decision_stamp(40), 51);
        assert_eq!(session.next_decision_stamp(90), 90);
    }

    #[test]
    fn test_latest_decision_must_be_unshared() {
        let mut session = Session::new("Set 1", "root");
        assert!(!session.is_latest_decision("root"));

        session.decided_nodes.insert("root".to_string(), 5);
        session.decided_nodes.insert("a".to_string(), 7);
        assert!(session.is_latest_decision("a"));
        assert!(!session.is_latest_decision("root"));

        session.decided_nodes.insert("root".to_string(), 7);
        assert!(!session.is_latest_decision("a"));
        assert_eq!(session.latest_decision(), Some(7));
    }

    #[test]
    fn test_set_selected_option_overwrites() {
        let mut session = Session::new("Set 1", "root");
        session.set_selected_option("root", "a");
        session.set_selected_option("root", "b");
        assert_eq!(session.selected_option("root"), Some("b"));
        assert_eq!(session.node_hierarchy.len(), 1);
    }

    #[test]
    fn test_levels_grouping() {
        let mut session = Session::new("Set 1", "root");
        session.node_hierarchy.push(NodeWithLevel::child("b", 1, "root"));
        session.node_hierarchy.push(NodeWithLevel::child("c", 2, "b"));
        session.node_hierarchy.push(NodeWithLevel::child("a", 1, "root"));

        let levels = session.levels();
        assert_eq!(levels.len(), 3);
        let level_one: Vec<&str> = levels[&1].iter().map(|e| e.node_id.as_str()).collect();
        assert_eq!(level_one, vec!["b", "a"]);
        assert_eq!(session.max_level(), Some(2));
        assert_eq!(session.level_of("c"), Some(2));
        assert_eq!(session.level_of("zz"), None);
    }

    #[test]
    fn test_ensure_root_only_when_empty() {
        let mut session = Session::new("Set 1", "root");
        assert!(!session.ensure_root("root"));

        session.node_hierarchy.clear();
        assert!(session.ensure_root("root"));
        assert_eq!(session.node_hierarchy, vec![NodeWithLevel::root("root")]);
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let mut session = Session::new("Set 1", "root").with_id("s1");
        session.decided_nodes.insert("root".to_string(), 42);
        let value = serde_json::to_value(&session).unwrap();

        assert_eq!(value["id"], "s1");
        assert_eq!(value["nodeHierarchy"][0]["nodeId"], "root");
        assert_eq!(value["nodeHierarchy"][0]["parentId"], serde_json::Value::Null);
        assert_eq!(value["decidedNodes"]["root"], 42);
        assert!(value.get("selectedOptions").is_some());
        assert!(value.get("showHints").is_some());
        assert!(value.get("triedNodes").is_some());
    }

    #[test]
    fn test_session_deserializes_with_missing_maps() {
        let session: Session = serde_json::from_str(r#"{"id": "s1", "name": "Set 1"}"#).unwrap();
        assert!(session.node_hierarchy.is_empty());
        assert!(session.selected_options.is_empty());
    }
}
