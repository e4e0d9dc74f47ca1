//! # TraceTree
//!
//! Decision-tree walkthrough engine. A tree of questions and options is
//! fetched once per operating-system variant; each exploration tab reveals
//! the tree level by level as options are decided, and the state of every
//! tab is mirrored to a key-value store so it survives restarts.
//!
//! ## Features
//!
//! - **Tree sources**: HTTP tree service or a local directory of JSON trees
//! - **Hierarchy builder**: reveal successors, retract stale branches on re-decision
//! - **Tabs**: bounded set of independent sessions with one active tab
//! - **Winning path**: the latest non-failed decision at each level
//! - **Persistence**: SQLite-backed, one key per variant
//!
//! ## Architecture
//!
//! ```text
//! Client (stdio JSON-RPC) → Explorer → Session Manager → Session
//!                              ↓               ↓
//!                      Tree source (HTTP)   SQLite (state)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tracetree::{Config, AppState, Explorer, RpcServer};
//! use tracetree::storage::SqliteStore;
//! use tracetree::tree::TreeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = SqliteStore::new(&config.database).await?;
//!     let client = TreeClient::new(&config.trees, config.request.clone())?;
//!     let explorer = Explorer::start(&config, &client, store).await?;
//!     let server = RpcServer::new(Arc::new(AppState::new(explorer)));
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Variant switch and the command surface over both trees.
pub mod explorer;
/// JSON-RPC server and request handling.
pub mod server;
/// Per-tab exploration state, the hierarchy builder and path reconstruction.
pub mod session;
/// Key-value persistence of session state.
pub mod storage;
/// Tree model and tree sources.
pub mod tree;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use explorer::{Explorer, Variant};
pub use server::{AppState, RpcServer, SharedState};
