//! Variant switch and command surface.
//!
//! The [`Explorer`] owns both trees, the active variant's [`SessionManager`]
//! (plus a cache of the other variant's, once loaded) and the session store.
//! Every command mutates the active session or manager and then mirrors the
//! result to storage under the active variant's key.

mod variant;

pub use variant::{PerVariant, Variant};

use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, TreeSourceConfig};
use crate::error::{AppResult, FetchResult};
use crate::session::{
    reveal, resolve_path, selected_path, NodeWithLevel, PathStep, RefusalReason, RevealOutcome,
    Session, SessionManager,
};
use crate::storage::{KeyValueStore, SessionStore};
use crate::tree::{Tree, TreeSource};

/// Fetch the trees for both variants concurrently. Either failure fails the whole load.
pub async fn fetch_variants<T>(
    source: &T,
    config: &TreeSourceConfig,
) -> FetchResult<PerVariant<Tree>>
where
    T: TreeSource + ?Sized,
{
    let start = Instant::now();
    let (windows, linux) = tokio::try_join!(
        source.fetch(config.slug(Variant::Windows)),
        source.fetch(config.slug(Variant::Linux)),
    )?;
    info!(
        windows = %windows.id,
        linux = %linux.id,
        elapsed_ms = start.elapsed().as_millis(),
        "Trees loaded for both variants"
    );
    Ok(PerVariant::new(windows, linux))
}

/// Exploration state for both variants.
pub struct Explorer<S> {
    trees: PerVariant<Tree>,
    variant: Variant,
    manager: SessionManager,
    parked: PerVariant<Option<SessionManager>>,
    store: SessionStore<S>,
    max_sessions: usize,
}

impl<S: KeyValueStore> Explorer<S> {
    /// Fetch both trees and restore the last-used variant's sessions.
    pub async fn start<T>(config: &Config, source: &T, store: S) -> AppResult<Self>
    where
        T: TreeSource + ?Sized,
    {
        let trees = fetch_variants(source, &config.trees).await?;
        Ok(Self::with_trees(trees, store, config.sessions.max_sessions).await)
    }

    /// Build from already-fetched trees.
    pub async fn with_trees(trees: PerVariant<Tree>, store: S, max_sessions: usize) -> Self {
        let store = SessionStore::new(store);
        let variant = store.load_variant().await.unwrap_or_default();
        let root = trees.get(variant).root_node_id.clone();
        let manager = store.load(variant, &root, max_sessions).await;

        info!(variant = %variant, tabs = manager.len(), "Explorer ready");

        Self {
            trees,
            variant,
            manager,
            parked: PerVariant::default(),
            store,
            max_sessions,
        }
    }

    /// Currently selected variant
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Tree of the current variant
    pub fn tree(&self) -> &Tree {
        self.trees.get(self.variant)
    }

    /// Trees of both variants
    pub fn trees(&self) -> &PerVariant<Tree> {
        &self.trees
    }

    /// Session manager of the current variant
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Active session of the current variant
    pub fn active_session(&self) -> &Session {
        self.manager.active()
    }

    /// The session store
    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    /// Tabs of the current variant
    pub fn sessions(&self) -> &[Session] {
        self.manager.sessions()
    }

    /// Active session's hierarchy grouped by level
    pub fn levels(&self) -> BTreeMap<usize, Vec<&NodeWithLevel>> {
        self.manager.active().levels()
    }

    /// Winning path through the active session
    pub fn selected_path(&self) -> Vec<NodeWithLevel> {
        selected_path(self.manager.active())
    }

    /// Winning path resolved against the current tree
    pub fn resolved_path(&self) -> Vec<PathStep<'_>> {
        resolve_path(self.tree(), self.manager.active())
    }

    fn root_node_id(&self) -> String {
        self.tree().root_node_id.clone()
    }

    /// Mirror the current variant's manager to storage.
    async fn persist(&self) {
        if let Err(e) = self.store.save(self.variant, &self.manager).await {
            warn!(variant = %self.variant, error = %e, "Failed to persist sessions");
        }
    }

    /// Switch to another variant, restoring its sessions.
    ///
    /// Nothing is written while the switch is in flight: the exclusive borrow
    /// keeps every other command out until it returns, and the outgoing
    /// sessions are parked in memory rather than saved. Afterwards the variant
    /// id and the newly active sessions are written, in that order.
    pub async fn set_variant(&mut self, variant: Variant) {
        if variant == self.variant {
            return;
        }

        let previous = self.variant;
        let root = self.trees.get(variant).root_node_id.clone();

        let incoming = match self.parked.get_mut(variant).take() {
            Some(mut manager) => {
                manager.rehydrate(&root);
                manager
            }
            None => self.store.load(variant, &root, self.max_sessions).await,
        };
        let outgoing = std::mem::replace(&mut self.manager, incoming);
        *self.parked.get_mut(previous) = Some(outgoing);
        self.variant = variant;
        info!(from = %previous, to = %variant, tabs = self.manager.len(), "Variant switched");

        if let Err(e) = self.store.save_variant(variant).await {
            warn!(variant = %variant, error = %e, "Failed to persist selected variant");
        }
        self.persist().await;
    }

    /// Record a selection on the active session. Refused for nodes not in the tree.
    pub async fn select_option(&mut self, node_id: &str, option_id: &str) -> bool {
        if self.tree().node(node_id).is_none() {
            return false;
        }
        self.manager.active_mut().set_selected_option(node_id, option_id);
        self.persist().await;
        true
    }

    /// Flip hint visibility on the active session
    pub async fn toggle_hint(&mut self, node_id: &str) -> bool {
        let visible = self.manager.active_mut().toggle_hint(node_id);
        self.persist().await;
        visible
    }

    /// Flip the tried/failed mark on the active session
    pub async fn toggle_tried(&mut self, node_id: &str) -> bool {
        let tried = self.manager.active_mut().toggle_tried(node_id);
        self.persist().await;
        tried
    }

    /// Reveal on the active session at an explicit level.
    pub async fn reveal(&mut self, node_id: &str, option_id: &str, level: usize) -> RevealOutcome {
        let tree = self.trees.get(self.variant);
        let outcome = reveal(tree, self.manager.active_mut(), node_id, option_id, level);
        if outcome.changed_state() {
            self.persist().await;
        }
        outcome
    }

    /// Decide a node on the active session, optionally selecting `option_id` first.
    pub async fn decide(&mut self, node_id: &str, option_id: Option<&str>) -> RevealOutcome {
        let tree = self.trees.get(self.variant);
        if tree.node(node_id).is_none() {
            return RevealOutcome::Refused {
                reason: RefusalReason::UnknownNode,
            };
        }
        let session = self.manager.active_mut();

        let mut selection_changed = false;
        if let Some(option_id) = option_id {
            if session.is_tried(node_id) {
                return RevealOutcome::Refused {
                    reason: RefusalReason::NodeTried,
                };
            }
            if session.selected_option(node_id) != Some(option_id) {
                session.set_selected_option(node_id, option_id);
                selection_changed = true;
            }
        }

        let outcome = session.decide(tree, node_id);
        if selection_changed || outcome.changed_state() {
            self.persist().await;
        }
        outcome
    }

    /// Open a new tab. Returns its id, or `None` at the session limit.
    pub async fn create_session(&mut self) -> Option<String> {
        let root = self.root_node_id();
        let id = self.manager.create_session(&root).map(|s| s.id.clone())?;
        self.persist().await;
        Some(id)
    }

    /// Close a tab. Refused for the last tab.
    pub async fn delete_session(&mut self, id: &str) -> bool {
        let deleted = self.manager.delete_session(id);
        if deleted {
            self.persist().await;
        }
        deleted
    }

    /// Activate a tab
    pub async fn switch_session(&mut self, id: &str) -> bool {
        let switched = self.manager.switch_active(id);
        if switched {
            self.persist().await;
        }
        switched
    }

    /// Rename a tab
    pub async fn rename_session(&mut self, id: &str, name: &str) -> bool {
        let renamed = self.manager.rename_session(id, name);
        if renamed {
            self.persist().await;
        }
        renamed
    }

    /// Discard every tab of the current variant after `confirm` accepts the
    /// prompt naming it. Returns whether the reset happened.
    pub async fn reset_active_variant<F>(&mut self, confirm: F) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        let prompt = format!(
            "Reset all sessions for the {} track? This cannot be undone.",
            self.variant
        );
        if !confirm(&prompt) {
            debug!(variant = %self.variant, "Reset not confirmed");
            return false;
        }

        let root = self.root_node_id();
        self.manager.reset(&root);
        self.persist().await;
        info!(variant = %self.variant, "Variant sessions reset");
        true
    }
}
