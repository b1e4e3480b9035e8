//! Image Blocker Core Library
//!
//! This crate keeps an image-blocking browser extension consistent: the
//! persisted on/off flag, the toolbar icon, the context menu title, the
//! network-level blocking rule and the per-tab hiding stylesheet.
//!
//! # Architecture
//!
//! Browser APIs are reached only through the traits in `host`, so the same
//! logic runs against the real extension APIs (see the `ib-wasm` crate) and
//! against in-memory fakes in tests. The persisted flag is the single source
//! of truth; every component re-reads it rather than caching it, because the
//! host may discard the extension context between any two async steps.
//!
//! # Modules
//!
//! - `types`: block state, resource types, tab and request payloads
//! - `rule`: declarative rule shapes and the configurable rule policy
//! - `config`: blocker configuration
//! - `host`: host API traits
//! - `store`: persisted block state
//! - `mechanism`: declarative rule / request predicate blocking
//! - `presentation`: toolbar icon and context menu
//! - `injector`: per-tab hiding stylesheet
//! - `guard`: document-start style insertion for content scripts
//! - `blocker`: toggle orchestration and trigger handling
//! - `url`: privileged URL detection

pub mod blocker;
pub mod config;
pub mod error;
pub mod guard;
pub mod host;
pub mod injector;
pub mod mechanism;
pub mod presentation;
pub mod rule;
pub mod store;
pub mod types;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use blocker::{Blocker, Hosts};
pub use config::BlockerConfig;
pub use error::{Error, HostError};
pub use guard::ContentGuard;
pub use mechanism::{BlockingMechanism, Capabilities, MechanismKind};
pub use store::StateStore;
pub use types::{BlockState, BlockingResponse, RequestDetails, StorageChange, Tab, TabUpdate};
