//! Server module for the line-delimited JSON-RPC surface.
//!
//! This module provides:
//! - The JSON-RPC 2.0 loop over stdio (or any async line stream)
//! - Method routing onto [`Explorer`] commands and queries
//! - Shared application state

mod handlers;
mod rpc;

pub use handlers::handle_method;
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcServer};

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::explorer::Explorer;
use crate::storage::KeyValueStore;

/// Application state shared across handlers.
pub struct AppState<S> {
    /// The explorer. Commands are applied one at a time.
    pub explorer: Mutex<Explorer<S>>,
}

impl<S: KeyValueStore> AppState<S> {
    /// Wrap an explorer
    pub fn new(explorer: Explorer<S>) -> Self {
        Self {
            explorer: Mutex::new(explorer),
        }
    }
}

/// Shared application state handle
pub type SharedState<S> = Arc<AppState<S>>;
