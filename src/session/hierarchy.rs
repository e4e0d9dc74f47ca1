//! Hierarchy builder: turns a decision into newly revealed nodes.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use super::{NodeWithLevel, Session};
use crate::tree::Tree;

/// Why a reveal was refused. Refusals never change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    /// The node id is not in the tree.
    UnknownNode,
    /// The node is not part of the session's hierarchy.
    NodeNotRevealed,
    /// The node is revealed, but not at the given level.
    LevelMismatch,
    /// No option was selected.
    EmptySelection,
    /// The option id does not belong to the node.
    UnknownOption,
    /// The node is marked tried/failed.
    NodeTried,
}

impl std::fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefusalReason::UnknownNode => write!(f, "node is not in the tree"),
            RefusalReason::NodeNotRevealed => write!(f, "node has not been revealed"),
            RefusalReason::LevelMismatch => write!(f, "node is not at the given level"),
            RefusalReason::EmptySelection => write!(f, "no option selected"),
            RefusalReason::UnknownOption => write!(f, "option does not belong to the node"),
            RefusalReason::NodeTried => write!(f, "node is marked as tried"),
        }
    }
}

/// Result of a [`reveal`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RevealOutcome {
    /// Deeper levels were replaced by the option's successors.
    Expanded {
        /// Node ids appended at the next level.
        added: Vec<String>,
    },
    /// The completion option was chosen; the node is decided and the run is over.
    Completed,
    /// The option has no successors; nothing changed.
    Unchanged,
    /// The call was a guarded no-op.
    Refused {
        /// Why it was refused.
        reason: RefusalReason,
    },
}

impl RevealOutcome {
    /// Whether the session was modified
    pub fn changed_state(&self) -> bool {
        matches!(self, RevealOutcome::Expanded { .. } | RevealOutcome::Completed)
    }
}

/// Reveal the successors of `option_id` on `node_id`, stamping the decision now.
///
/// The stamp is bumped past the session's latest decision when the clock has
/// not moved, so back-to-back decisions keep their order.
pub fn reveal(
    tree: &Tree,
    session: &mut Session,
    node_id: &str,
    option_id: &str,
    current_level: usize,
) -> RevealOutcome {
    let timestamp = session.next_decision_stamp(Utc::now().timestamp_millis());
    reveal_at(tree, session, node_id, option_id, current_level, timestamp)
}

/// [`reveal`] with an explicit decision timestamp.
///
/// Everything deeper than `current_level` is discarded before the successors
/// are appended at `current_level + 1`, so changing an earlier decision
/// retracts whatever was explored on top of it. Successors missing from the
/// tree are skipped. Re-running an identical reveal keeps the original
/// timestamp, for completion options too.
pub fn reveal_at(
    tree: &Tree,
    session: &mut Session,
    node_id: &str,
    option_id: &str,
    current_level: usize,
    timestamp: i64,
) -> RevealOutcome {
    let Some(node) = tree.node(node_id) else {
        debug!(node = %node_id, "Reveal refused: unknown node");
        return RevealOutcome::Refused {
            reason: RefusalReason::UnknownNode,
        };
    };

    if option_id.trim().is_empty() {
        return RevealOutcome::Refused {
            reason: RefusalReason::EmptySelection,
        };
    }

    let Some(option) = node.option(option_id) else {
        debug!(node = %node_id, option = %option_id, "Reveal refused: unknown option");
        return RevealOutcome::Refused {
            reason: RefusalReason::UnknownOption,
        };
    };

    if !session.contains(node_id, current_level) {
        let reason = if session.level_of(node_id).is_some() {
            RefusalReason::LevelMismatch
        } else {
            RefusalReason::NodeNotRevealed
        };
        debug!(node = %node_id, level = current_level, reason = %reason, "Reveal refused");
        return RevealOutcome::Refused { reason };
    }

    if session.is_tried(node_id) {
        return RevealOutcome::Refused {
            reason: RefusalReason::NodeTried,
        };
    }

    if option.is_completion() {
        if !session.is_latest_decision(node_id) {
            session.decided_nodes.insert(node_id.to_string(), timestamp);
        }
        debug!(node = %node_id, "Completion option chosen");
        return RevealOutcome::Completed;
    }

    let successors = option.successors();
    if successors.is_empty() {
        return RevealOutcome::Unchanged;
    }

    let next_level = current_level + 1;
    let mut hierarchy: Vec<NodeWithLevel> = session
        .node_hierarchy
        .iter()
        .filter(|e| e.level <= current_level)
        .cloned()
        .collect();

    let mut added = Vec::with_capacity(successors.len());
    for successor in successors {
        if tree.node(successor).is_none() {
            warn!(
                node = %node_id,
                option = %option_id,
                missing = %successor,
                "Skipping successor that is not in the tree"
            );
            continue;
        }
        if hierarchy
            .iter()
            .any(|e| e.level == next_level && e.node_id == successor)
        {
            continue;
        }
        hierarchy.push(NodeWithLevel::child(successor, next_level, node_id));
        added.push(successor.to_string());
    }

    let unchanged = hierarchy == session.node_hierarchy && session.is_decided(node_id);
    session.node_hierarchy = hierarchy;
    if !unchanged {
        session.decided_nodes.insert(node_id.to_string(), timestamp);
    }

    debug!(
        node = %node_id,
        option = %option_id,
        level = next_level,
        added = added.len(),
        "Revealed successors"
    );

    RevealOutcome::Expanded { added }
}
