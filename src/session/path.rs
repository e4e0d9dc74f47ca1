//! Path reconstructor: the single winning line through a session.

use serde::Serialize;

use super::{NodeWithLevel, Session};
use crate::tree::{Node, NodeOption, Tree};

/// Derive the root-to-deepest path of decided, non-failed nodes.
///
/// Walks levels upward from 0. At each level only the successors of the
/// previously chosen node are candidates; among candidates that are decided
/// and not marked tried, the most recent decision wins (earliest in hierarchy
/// order on equal timestamps). The walk stops at the first level without a
/// candidate.
pub fn selected_path(session: &Session) -> Vec<NodeWithLevel> {
    let levels = session.levels();
    let mut path: Vec<NodeWithLevel> = Vec::new();
    let mut parent: Option<&str> = None;

    for (level, entries) in &levels {
        if *level != path.len() {
            break;
        }

        let mut best: Option<(&NodeWithLevel, i64)> = None;
        for entry in entries
            .iter()
            .filter(|e| e.parent_id.as_deref() == parent && !session.is_tried(&e.node_id))
        {
            let Some(decided_at) = session.decided_at(&entry.node_id) else {
                continue;
            };
            match best {
                Some((_, ts)) if ts >= decided_at => {}
                _ => best = Some((*entry, decided_at)),
            }
        }

        let Some((chosen, _)) = best else {
            break;
        };
        path.push(chosen.clone());
        parent = Some(chosen.node_id.as_str());
    }

    path
}

/// One step of a resolved path, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct PathStep<'a> {
    /// Depth of the step.
    pub level: usize,
    /// The decided node.
    pub node: &'a Node,
    /// The option selected on it, if it still resolves.
    pub option: Option<&'a NodeOption>,
}

/// [`selected_path`] with nodes and selected options looked up in `tree`.
/// Entries whose node is missing from the tree are dropped.
pub fn resolve_path<'a>(tree: &'a Tree, session: &Session) -> Vec<PathStep<'a>> {
    selected_path(session)
        .into_iter()
        .filter_map(|entry| {
            let node = tree.node(&entry.node_id)?;
            let option = session
                .selected_option(&entry.node_id)
                .and_then(|id| node.option(id));
            Some(PathStep {
                level: entry.level,
                node,
                option,
            })
        })
        .collect()
}
