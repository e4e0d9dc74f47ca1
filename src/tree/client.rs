use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::Tree;
use crate::config::{RequestConfig, TreeSourceConfig};
use crate::error::{FetchError, FetchResult};

/// Anything that can deliver a tree by slug.
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Fetch and validate the tree published under `slug`.
    async fn fetch(&self, slug: &str) -> FetchResult<Tree>;
}

/// Validate a decoded tree, logging dangling successor references.
fn checked(tree: Tree) -> FetchResult<Tree> {
    let dangling = tree.validate()?;
    for r in &dangling {
        warn!(
            tree = %tree.id,
            node = %r.node_id,
            option = %r.option_id,
            missing = %r.missing_id,
            "Option references a node that does not exist; it will be skipped"
        );
    }
    Ok(tree)
}

/// Client for the tree service HTTP API
#[derive(Clone)]
pub struct TreeClient {
    client: Client,
    base_url: String,
    request_config: RequestConfig,
}

impl TreeClient {
    /// Create a new tree client
    pub fn new(config: &TreeSourceConfig, request_config: RequestConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(FetchError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute a single GET for a tree (no retry)
    async fn execute_request(&self, url: &str) -> FetchResult<Tree> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The tree service reports errors as {"detail": "..."}
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Tree>()
            .await
            .map_err(|e| FetchError::InvalidResponse {
                message: format!("Failed to parse tree: {}", e),
            })
    }
}

#[async_trait]
impl TreeSource for TreeClient {
    async fn fetch(&self, slug: &str) -> FetchResult<Tree> {
        let url = format!("{}/api/trees/{}", self.base_url, slug);
        debug!(slug = %slug, url = %url, "Fetching tree");

        let start = Instant::now();
        match self.execute_request(&url).await {
            Ok(tree) => {
                info!(
                    slug = %slug,
                    nodes = tree.nodes.len(),
                    latency_ms = start.elapsed().as_millis(),
                    "Tree fetched"
                );
                checked(tree)
            }
            Err(e) => {
                error!(
                    slug = %slug,
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Tree fetch failed"
                );
                Err(e)
            }
        }
    }
}

/// Reads trees from `{dir}/{slug}.json`, the layout the tree service serves from.
#[derive(Debug, Clone)]
pub struct DirectoryTreeSource {
    dir: PathBuf,
}

impl DirectoryTreeSource {
    /// Create a source rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TreeSource for DirectoryTreeSource {
    async fn fetch(&self, slug: &str) -> FetchResult<Tree> {
        let path = self.dir.join(format!("{}.json", slug));
        debug!(slug = %slug, path = %path.display(), "Reading tree file");

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound {
                    slug: slug.to_string(),
                });
            }
            Err(e) => {
                return Err(FetchError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let tree: Tree = serde_json::from_str(&raw).map_err(|e| FetchError::InvalidResponse {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;

        info!(slug = %slug, nodes = tree.nodes.len(), "Tree loaded from disk");
        checked(tree)
    }
}

/// Serves trees already held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticTreeSource {
    trees: HashMap<String, Tree>,
}

impl StaticTreeSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tree` under `slug`
    pub fn with_tree(mut self, slug: impl Into<String>, tree: Tree) -> Self {
        self.trees.insert(slug.into(), tree);
        self
    }
}

#[async_trait]
impl TreeSource for StaticTreeSource {
    async fn fetch(&self, slug: &str) -> FetchResult<Tree> {
        let tree = self.trees.get(slug).cloned().ok_or_else(|| FetchError::NotFound {
            slug: slug.to_string(),
        })?;
        checked(tree)
    }
}
