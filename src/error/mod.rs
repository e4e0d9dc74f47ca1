use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Tree fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Tree fetch errors. Any of these is fatal for the affected variant.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Tree not found: {slug}")]
    NotFound { slug: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid tree {tree_id}: {message}")]
    InvalidTree { tree_id: String, message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// JSON-RPC surface errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown method: {method}")]
    UnknownMethod { method: String },

    #[error("Invalid parameters for {method}: {message}")]
    InvalidParameters { method: String, message: String },

    #[error("Command refused: {message}")]
    Refused { message: String },
}

impl ProtocolError {
    /// JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        match self {
            ProtocolError::InvalidRequest { .. } => -32600,
            ProtocolError::UnknownMethod { .. } => -32601,
            ProtocolError::InvalidParameters { .. } => -32602,
            ProtocolError::Refused { .. } => -32000,
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for tree fetches
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
