//! Error types shared by the core and the host bindings.

/// Failure reported by a host extension API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("Storage unavailable: {0}")]
    Storage(String),
    #[error("Rule update failed: {0}")]
    Rules(String),
    #[error("Script injection failed: {0}")]
    Scripting(String),
    #[error("Context menu operation failed: {0}")]
    Menus(String),
    #[error("Tab operation failed: {0}")]
    Tabs(String),
    #[error("Action update failed: {0}")]
    Action(String),
    #[error("Request hook failed: {0}")]
    RequestHook(String),
    #[error("Document access failed: {0}")]
    Document(String),
    #[error("API not found: {0}")]
    ApiNotFound(String),
}

/// Error type for blocker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("No blocking mechanism available on this platform")]
    NoBlockingMechanism,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
