use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FetchError;

/// Option label that marks a run as finished instead of branching further.
pub const COMPLETION_LABEL: &str = "flag obtained";

/// How a hint should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintKind {
    /// A shell command the user can copy.
    Command,
    /// Free-form prose.
    #[default]
    Text,
}

impl std::fmt::Display for HintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HintKind::Command => write!(f, "command"),
            HintKind::Text => write!(f, "text"),
        }
    }
}

/// A hint attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    /// Hint body.
    pub text: String,
    /// Rendering kind.
    #[serde(rename = "type", default)]
    pub kind: HintKind,
}

impl Hint {
    /// Create a text hint
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: HintKind::Text,
        }
    }

    /// Create a command hint
    pub fn command(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: HintKind::Command,
        }
    }
}

/// Single-hint field from older trees: either a bare string or a full hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyHint {
    /// Bare string, treated as a text hint.
    Plain(String),
    /// Hint with an explicit kind.
    Structured(Hint),
}

impl From<&LegacyHint> for Hint {
    fn from(legacy: &LegacyHint) -> Self {
        match legacy {
            LegacyHint::Plain(text) => Hint::text(text.clone()),
            LegacyHint::Structured(hint) => hint.clone(),
        }
    }
}

/// Node input behavior. Only `Select` is driven by the session engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Pick exactly one option.
    #[default]
    Select,
    /// Pick several options.
    Multiselect,
    /// Free-text answer.
    Text,
}

/// A labeled choice on a node, pointing at zero or more successor nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOption {
    /// Identifier, unique within the owning node.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Legacy single successor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    /// Successor node identifiers.
    #[serde(default)]
    pub next_node_ids: Vec<String>,
}

impl NodeOption {
    /// Create an option with no successors
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            next_node_id: None,
            next_node_ids: Vec::new(),
        }
    }

    /// Add a successor node
    pub fn with_next(mut self, node_id: impl Into<String>) -> Self {
        self.next_node_ids.push(node_id.into());
        self
    }

    /// Successor ids: the legacy field first, then the list, deduplicated in order.
    pub fn successors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.next_node_ids.len() + 1);
        for id in self
            .next_node_id
            .iter()
            .chain(self.next_node_ids.iter())
            .map(String::as_str)
        {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    /// True when choosing this option leads nowhere.
    pub fn is_leaf(&self) -> bool {
        self.next_node_id.is_none() && self.next_node_ids.is_empty()
    }

    /// True when this option ends the run.
    pub fn is_completion(&self) -> bool {
        self.label.trim().eq_ignore_ascii_case(COMPLETION_LABEL)
    }
}

/// A question in the decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the tree.
    pub id: String,
    /// Question prompt.
    pub question: String,
    /// Input behavior.
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// Ordered options.
    #[serde(default)]
    pub options: Vec<NodeOption>,
    /// Command associated with the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Longer explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Hints, in display order.
    #[serde(default)]
    pub hints: Vec<Hint>,
    /// Legacy single hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<LegacyHint>,
}

impl Node {
    /// Create a select node with no options
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            node_type: NodeType::Select,
            options: Vec::new(),
            command: None,
            description: None,
            hints: Vec::new(),
            hint: None,
        }
    }

    /// Append an option
    pub fn with_option(mut self, option: NodeOption) -> Self {
        self.options.push(option);
        self
    }

    /// Append a hint
    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hints.push(hint);
        self
    }

    /// Look up an option by id
    pub fn option(&self, option_id: &str) -> Option<&NodeOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// All hints: the legacy hint (if any) followed by the hint list.
    pub fn all_hints(&self) -> Vec<Hint> {
        self.hint
            .iter()
            .map(Hint::from)
            .chain(self.hints.iter().cloned())
            .collect()
    }
}

/// An option that points at a node id missing from the tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DanglingRef {
    /// Node owning the option.
    pub node_id: String,
    /// The option with the bad successor.
    pub option_id: String,
    /// The missing successor id.
    pub missing_id: String,
}

/// A complete, read-only decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Tree identifier (the slug it was fetched under).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Entry point of every session.
    pub root_node_id: String,
    /// All nodes keyed by id.
    pub nodes: HashMap<String, Node>,
}

impl Tree {
    /// Create an empty tree rooted at `root_node_id`
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        root_node_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            root_node_id: root_node_id.into(),
            nodes: HashMap::new(),
        }
    }

    /// Insert a node, keyed by its id
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.insert(node.id.clone(), node);
        self
    }

    /// Look up a node by id
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// The root node, if present
    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&self.root_node_id)
    }

    /// Every successor reference that does not resolve, sorted.
    pub fn dangling_refs(&self) -> Vec<DanglingRef> {
        let mut refs: Vec<DanglingRef> = self
            .nodes
            .values()
            .flat_map(|node| {
                node.options.iter().flat_map(move |option| {
                    option
                        .successors()
                        .into_iter()
                        .filter(|id| !self.nodes.contains_key(*id))
                        .map(move |id| DanglingRef {
                            node_id: node.id.clone(),
                            option_id: option.id.clone(),
                            missing_id: id.to_string(),
                        })
                })
            })
            .collect();
        refs.sort();
        refs
    }

    /// Check structural consistency.
    ///
    /// A missing root is fatal. Dangling successors are returned so the caller
    /// can report them; the session engine skips them when revealing.
    pub fn validate(&self) -> Result<Vec<DanglingRef>, FetchError> {
        if !self.nodes.contains_key(&self.root_node_id) {
            return Err(FetchError::InvalidTree {
                tree_id: self.id.clone(),
                message: format!("root node '{}' is missing", self.root_node_id),
            });
        }

        Ok(self.dangling_refs())
    }
}
