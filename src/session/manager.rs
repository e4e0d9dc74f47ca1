//! Session manager: a bounded, ordered set of tabs with one active tab.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Session;

/// Persisted form of a [`SessionManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSnapshot {
    /// Tabs in display order.
    pub tabs: Vec<Session>,
    /// Id of the active tab.
    pub active_tab_id: String,
}

/// Owns the tabs of one variant.
///
/// At least one session always exists and the active id always names one of
/// them. Every mutation that would break either rule is refused.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionManager {
    sessions: Vec<Session>,
    active_id: String,
    max_sessions: usize,
}

fn positional_name(index: usize) -> String {
    format!("Set {}", index + 1)
}

impl SessionManager {
    /// Create a manager holding one fresh session anchored at `root_node_id`
    pub fn new(root_node_id: &str, max_sessions: usize) -> Self {
        let session = Session::new(positional_name(0), root_node_id);
        Self {
            active_id: session.id.clone(),
            sessions: vec![session],
            max_sessions: max_sessions.max(1),
        }
    }

    /// Rebuild from a snapshot, repairing what can be repaired.
    ///
    /// Empty tab lists get a default session, tabs over the limit are dropped,
    /// empty hierarchies are re-anchored at the root, and an unknown active id
    /// falls back to the first tab.
    pub fn from_snapshot(
        snapshot: ManagerSnapshot,
        root_node_id: &str,
        max_sessions: usize,
    ) -> Self {
        let max_sessions = max_sessions.max(1);
        let mut sessions = snapshot.tabs;

        if sessions.is_empty() {
            warn!("Stored state has no tabs; using a default session");
            return Self::new(root_node_id, max_sessions);
        }

        if sessions.len() > max_sessions {
            warn!(
                stored = sessions.len(),
                max = max_sessions,
                "Stored state exceeds the session limit; truncating"
            );
            sessions.truncate(max_sessions);
        }

        let active_id = if sessions.iter().any(|s| s.id == snapshot.active_tab_id) {
            snapshot.active_tab_id
        } else {
            warn!(
                active = %snapshot.active_tab_id,
                "Stored active tab is missing; using the first tab"
            );
            sessions[0].id.clone()
        };

        let mut manager = Self {
            sessions,
            active_id,
            max_sessions,
        };
        manager.rehydrate(root_node_id);
        manager
    }

    /// Re-anchor every session whose hierarchy is empty. Returns how many changed.
    pub fn rehydrate(&mut self, root_node_id: &str) -> usize {
        let mut rehydrated = 0;
        for session in self.sessions.iter_mut() {
            if session.ensure_root(root_node_id) {
                rehydrated += 1;
            }
        }
        if rehydrated > 0 {
            debug!(count = rehydrated, "Re-anchored empty sessions at root");
        }
        rehydrated
    }

    /// Persisted form of this manager
    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            tabs: self.sessions.clone(),
            active_tab_id: self.active_id.clone(),
        }
    }

    /// All sessions in display order
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Always false; a manager holds at least one session.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session limit
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Whether another session can be created
    pub fn can_create(&self) -> bool {
        self.sessions.len() < self.max_sessions
    }

    /// Id of the active session
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    fn active_index(&self) -> usize {
        self.sessions
            .iter()
            .position(|s| s.id == self.active_id)
            .unwrap_or(0)
    }

    /// The active session
    pub fn active(&self) -> &Session {
        &self.sessions[self.active_index()]
    }

    /// The active session, mutably
    pub fn active_mut(&mut self) -> &mut Session {
        let index = self.active_index();
        &mut self.sessions[index]
    }

    /// Look up a session by id
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Append a fresh session and make it active. Returns `None` at the limit.
    pub fn create_session(&mut self, root_node_id: &str) -> Option<&Session> {
        if !self.can_create() {
            debug!(max = self.max_sessions, "Session limit reached; not creating");
            return None;
        }

        let session = Session::new(positional_name(self.sessions.len()), root_node_id);
        info!(session = %session.id, name = %session.name, "Session created");
        self.active_id = session.id.clone();
        self.sessions.push(session);
        self.sessions.last()
    }

    /// Remove a session, renumbering the rest. Refused for the last session
    /// or an unknown id.
    pub fn delete_session(&mut self, id: &str) -> bool {
        if self.sessions.len() <= 1 {
            debug!("Refusing to delete the only session");
            return false;
        }
        let Some(index) = self.sessions.iter().position(|s| s.id == id) else {
            return false;
        };

        self.sessions.remove(index);
        for (i, session) in self.sessions.iter_mut().enumerate() {
            session.name = positional_name(i);
        }
        if self.active_id == id {
            self.active_id = self.sessions[0].id.clone();
        }

        info!(session = %id, remaining = self.sessions.len(), "Session deleted");
        true
    }

    /// Make `id` the active session. Refused for unknown ids.
    pub fn switch_active(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            debug!(session = %id, "Cannot switch to unknown session");
            return false;
        }
        self.active_id = id.to_string();
        true
    }

    /// Give a session a custom display name. Blank names are refused.
    pub fn rename_session(&mut self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Discard every session and start over with one fresh session.
    pub fn reset(&mut self, root_node_id: &str) {
        let discarded = self.sessions.len();
        *self = Self::new(root_node_id, self.max_sessions);
        info!(discarded, "Sessions reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NodeWithLevel;

    fn names(manager: &SessionManager) -> Vec<&str> {
        manager.sessions().iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_new_has_single_active_session() {
        let manager = SessionManager::new("root", 10);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.active().name, "Set 1");
        assert_eq!(manager.active_id(), manager.sessions()[0].id);
        assert_eq!(manager.active().node_hierarchy, vec![NodeWithLevel::root("root")]);
    }

    #[test]
    fn test_create_session_activates_it() {
        let mut manager = SessionManager::new("root", 10);
        let id = manager.create_session("root").unwrap().id.clone();

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.active_id(), id);
        assert_eq!(names(&manager), vec!["Set 1", "Set 2"]);
    }

    #[test]
    fn test_create_session_respects_limit() {
        let mut manager = SessionManager::new("root", 10);
        for _ in 0..9 {
            assert!(manager.create_session("root").is_some());
        }
        assert_eq!(manager.len(), 10);
        let active = manager.active_id().to_string();

        assert!(manager.create_session("root").is_none());
        assert_eq!(manager.len(), 10);
        assert_eq!(manager.active_id(), active);
    }

    #[test]
    fn test_delete_last_session_is_refused() {
        let mut manager = SessionManager::new("root", 10);
        let id = manager.active_id().to_string();

        assert!(!manager.delete_session(&id));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.active_id(), id);
    }

    #[test]
    fn test_delete_renumbers_and_reactivates_first() {
        let mut manager = SessionManager::new("root", 10);
        let first = manager.active_id().to_string();
        manager.create_session("root");
        let third = manager.create_session("root").unwrap().id.clone();

        assert!(manager.delete_session(&third));
        assert_eq!(manager.active_id(), first);

        let second = manager.create_session("root").unwrap().id.clone();
        manager.switch_active(&first);
        assert!(manager.delete_session(&first));
        assert_eq!(names(&manager), vec!["Set 1", "Set 2"]);
        assert_eq!(manager.active_id(), manager.sessions()[0].id);
        assert_eq!(manager.sessions()[1].id, second);
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let mut manager = SessionManager::new("root", 10);
        let first = manager.active_id().to_string();
        let second = manager.create_session("root").unwrap().id.clone();

        assert!(manager.delete_session(&first));
        assert_eq!(manager.active_id(), second);
        assert_eq!(names(&manager), vec!["Set 1"]);
    }

    #[test]
    fn test_delete_unknown_is_refused() {
        let mut manager = SessionManager::new("root", 10);
        manager.create_session("root");
        assert!(!manager.delete_session("nope"));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_switch_active() {
        let mut manager = SessionManager::new("root", 10);
        let first = manager.active_id().to_string();
        manager.create_session("root");

        assert!(manager.switch_active(&first));
        assert_eq!(manager.active_id(), first);

        assert!(!manager.switch_active("missing"));
        assert_eq!(manager.active_id(), first);
    }

    #[test]
    fn test_rename_session() {
        let mut manager = SessionManager::new("root", 10);
        let id = manager.active_id().to_string();

        assert!(manager.rename_session(&id, "  Web route "));
        assert_eq!(manager.active().name, "Web route");
        assert!(!manager.rename_session(&id, "   "));
        assert!(!manager.rename_session("missing", "x"));
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut manager = SessionManager::new("root", 4);
        manager.create_session("root");
        manager.create_session("root");
        manager.active_mut().toggle_tried("root");

        manager.reset("root");

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.max_sessions(), 4);
        assert!(!manager.active().is_tried("root"));
        assert_eq!(manager.active().name, "Set 1");
    }

    #[test]
    fn test_active_mut_targets_active_session() {
        let mut manager = SessionManager::new("root", 10);
        let first = manager.active_id().to_string();
        manager.create_session("root");
        manager.active_mut().toggle_hint("root");

        assert!(manager.active().hint_visible("root"));
        assert!(!manager.get(&first).unwrap().hint_visible("root"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut manager = SessionManager::new("root", 10);
        manager.create_session("root");
        manager.active_mut().set_selected_option("root", "a");

        let restored = SessionManager::from_snapshot(manager.snapshot(), "root", 10);
        assert_eq!(restored, manager);
    }

    #[test]
    fn test_from_snapshot_repairs() {
        let empty = ManagerSnapshot {
            tabs: vec![],
            active_tab_id: "x".to_string(),
        };
        let manager = SessionManager::from_snapshot(empty, "root", 10);
        assert_eq!(manager.len(), 1);

        let mut hollow = Session::new("Set 1", "root").with_id("a");
        hollow.node_hierarchy.clear();
        let snapshot = ManagerSnapshot {
            tabs: vec![hollow, Session::new("Set 2", "root").with_id("b")],
            active_tab_id: "gone".to_string(),
        };
        let manager = SessionManager::from_snapshot(snapshot, "root", 10);
        assert_eq!(manager.active_id(), "a");
        assert_eq!(manager.active().node_hierarchy, vec![NodeWithLevel::root("root")]);
    }

    #[test]
    fn test_from_snapshot_truncates_over_limit() {
        let tabs: Vec<Session> = (0..5)
            .map(|i| Session::new(format!("Set {}", i + 1), "root"))
            .collect();
        let active = tabs[4].id.clone();
        let snapshot = ManagerSnapshot {
            tabs,
            active_tab_id: active,
        };

        let manager = SessionManager::from_snapshot(snapshot, "root", 3);
        assert_eq!(manager.len(), 3);
        assert_eq!(manager.active_id(), manager.sessions()[0].id);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let manager = SessionManager::new("root", 10);
        let value = serde_json::to_value(manager.snapshot()).unwrap();
        assert!(value["tabs"].is_array());
        assert_eq!(value["activeTabId"], manager.active_id());
    }
}
