//! Blocker configuration
//!
//! Every field has a default, so an empty object (or no configuration at all)
//! yields the stock extension behaviour.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rule::{PolicyAction, RulePolicy};

pub const DEFAULT_STORAGE_KEY: &str = "on";
pub const DEFAULT_HIDE_CSS: &str = "img { visibility: hidden; }";
pub const DEFAULT_GUARD_CSS: &str = "img { display: none !important; }";
pub const DEFAULT_GUARD_STYLE_ID: &str = "block-image-style";
pub const DEFAULT_MENU_ID: &str = "toggle-image-blocking";

/// Which network blocking mechanism to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismChoice {
    /// Pick from platform capabilities
    #[default]
    Auto,
    Declarative,
    RequestPredicate,
}

/// Toolbar icon resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub enabled: String,
    pub disabled: String,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            enabled: "images/icon19.png".to_string(),
            disabled: "images/icon19-disabled.png".to_string(),
        }
    }
}

/// Context menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub id: String,
    pub contexts: Vec<String>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_MENU_ID.to_string(),
            contexts: vec!["action".to_string(), "page".to_string()],
        }
    }
}

/// Page-load style insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub style_id: String,
    pub css: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            style_id: DEFAULT_GUARD_STYLE_ID.to_string(),
            css: DEFAULT_GUARD_CSS.to_string(),
        }
    }
}

/// Full blocker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockerConfig {
    /// Local storage key holding the flag
    pub storage_key: String,
    pub mechanism: MechanismChoice,
    pub policy: RulePolicy,
    /// Stylesheet injected into tabs while blocking
    pub hide_css: String,
    pub icons: IconConfig,
    /// `None` disables the context menu entirely
    pub context_menu: Option<MenuConfig>,
    /// `None` disables the page-load guard
    pub content_guard: Option<GuardConfig>,
    /// URL prefixes never touched by CSS injection
    pub privileged_prefixes: Vec<String>,
    /// Reload the active tab after a toggle
    pub reload_active_tab: bool,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            mechanism: MechanismChoice::Auto,
            policy: RulePolicy::default(),
            hide_css: DEFAULT_HIDE_CSS.to_string(),
            icons: IconConfig::default(),
            context_menu: Some(MenuConfig::default()),
            content_guard: Some(GuardConfig::default()),
            privileged_prefixes: default_privileged_prefixes(),
            reload_active_tab: true,
        }
    }
}

/// Schemes reserved for the browser itself or for extensions.
pub fn default_privileged_prefixes() -> Vec<String> {
    [
        "chrome://",
        "chrome-extension://",
        "chrome-search://",
        "chrome-untrusted://",
        "devtools://",
        "edge://",
        "extension://",
        "about:",
        "moz-extension://",
        "view-source:",
        "brave://",
        "opera://",
        "vivaldi://",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl BlockerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.is_empty() {
            return Err(Error::InvalidConfig("storage_key must not be empty".into()));
        }
        if self.hide_css.trim().is_empty() {
            return Err(Error::InvalidConfig("hide_css must not be empty".into()));
        }
        if self.policy.resource_types.is_empty() {
            return Err(Error::InvalidConfig("policy.resource_types must not be empty".into()));
        }
        if self.policy.url_filter.is_empty() {
            return Err(Error::InvalidConfig("policy.url_filter must not be empty".into()));
        }
        if let PolicyAction::Redirect { url } = &self.policy.action {
            if url.is_empty() {
                return Err(Error::InvalidConfig("redirect url must not be empty".into()));
            }
        }
        if let Some(menu) = &self.context_menu {
            if menu.id.is_empty() || menu.contexts.is_empty() {
                return Err(Error::InvalidConfig("context_menu needs an id and contexts".into()));
            }
        }
        if let Some(guard) = &self.content_guard {
            if guard.style_id.is_empty() || guard.css.trim().is_empty() {
                return Err(Error::InvalidConfig("content_guard needs a style id and css".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceTypes;

    #[test]
    fn test_empty_json_is_default() {
        let config = BlockerConfig::from_json("{}").unwrap();
        assert_eq!(config, BlockerConfig::default());
        assert_eq!(config.storage_key, "on");
        assert_eq!(config.policy.resource_types, ResourceTypes::VISUAL);
    }

    #[test]
    fn test_optional_features_off() {
        let config = BlockerConfig::from_json(
            r#"{ "context_menu": null, "content_guard": null, "mechanism": "request_predicate" }"#,
        )
        .unwrap();
        assert!(config.context_menu.is_none());
        assert!(config.content_guard.is_none());
        assert_eq!(config.mechanism, MechanismChoice::RequestPredicate);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(BlockerConfig::from_json(r#"{ "storage_key": "" }"#).is_err());
        assert!(BlockerConfig::from_json(r#"{ "policy": { "resource_types": [] } }"#).is_err());
        assert!(BlockerConfig::from_json(r#"{ "policy": { "action": { "type": "redirect", "url": "" } } }"#).is_err());
        assert!(BlockerConfig::from_json(r#"{ "mechanism": "magic" }"#).is_err());
        assert!(BlockerConfig::from_json("not json").is_err());
    }
}
