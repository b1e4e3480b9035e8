//! Host extension API seams
//!
//! Each trait covers one browser API family. The wasm bindings implement
//! them over `chrome.*` / `browser.*`; tests use in-memory fakes. Futures are
//! `?Send` because extension contexts are single-threaded.

use async_trait::async_trait;

use crate::error::HostError;
use crate::rule::UpdateRuleOptions;
use crate::types::Tab;

/// Local (non-synced) key-value storage.
#[async_trait(?Send)]
pub trait KeyValueStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, HostError>;
    /// Persist a value. The host raises a change notification afterwards.
    async fn set(&self, key: &str, value: &str) -> Result<(), HostError>;
}

/// Declarative request-rule engine (dynamic rules).
#[async_trait(?Send)]
pub trait RuleEngine {
    async fn dynamic_rule_ids(&self) -> Result<Vec<u32>, HostError>;
    async fn update_dynamic_rules(&self, options: UpdateRuleOptions) -> Result<(), HostError>;
}

/// Registration of the legacy per-request blocking hook.
///
/// The hook itself calls back into
/// [`RequestPredicate::evaluate`](crate::mechanism::RequestPredicate::evaluate).
pub trait RequestHook {
    fn install(&self) -> Result<(), HostError>;
    fn uninstall(&self) -> Result<(), HostError>;
    fn is_installed(&self) -> bool;
}

/// Stylesheet injection into tabs.
#[async_trait(?Send)]
pub trait Scripting {
    async fn insert_css(&self, tab_id: i32, css: &str) -> Result<(), HostError>;
    async fn remove_css(&self, tab_id: i32, css: &str) -> Result<(), HostError>;
}

/// Context menu registry.
#[async_trait(?Send)]
pub trait ContextMenus {
    async fn create(&self, id: &str, title: &str, contexts: &[String]) -> Result<(), HostError>;
    /// Fails when no item with `id` exists.
    async fn update(&self, id: &str, title: &str) -> Result<(), HostError>;
}

/// Toolbar button.
#[async_trait(?Send)]
pub trait ToolbarAction {
    async fn set_icon(&self, path: &str) -> Result<(), HostError>;
}

/// Tab queries and control.
#[async_trait(?Send)]
pub trait Tabs {
    /// Active tab of the current window.
    async fn active_tab(&self) -> Result<Option<Tab>, HostError>;
    async fn all_tabs(&self) -> Result<Vec<Tab>, HostError>;
    async fn reload(&self, tab_id: i32) -> Result<(), HostError>;
}

/// Localized message lookup.
pub trait I18n {
    /// `None` when the key has no translation.
    fn message(&self, key: &str) -> Option<String>;
}

/// Document of the page a content script runs in.
pub trait PageDocument {
    fn has_element(&self, id: &str) -> bool;
    fn insert_style(&self, id: &str, css: &str) -> Result<(), HostError>;
}
