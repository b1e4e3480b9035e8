//! Declarative network rule model
//!
//! Shapes serialize to the camelCase objects accepted by the browser's
//! declarative request-rule API.

use serde::{Deserialize, Serialize};

use crate::types::ResourceTypes;

/// Fixed id of the image blocking rule.
pub const IMAGE_RULE_ID: u32 = 1;

/// Priority of the image blocking rule.
pub const IMAGE_RULE_PRIORITY: u32 = 1;

/// 1x1 transparent PNG served in place of redirected images.
pub const PLACEHOLDER_IMAGE_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAACklEQVR4nGMAAQAABQABDQottAAAAABJRU5ErkJggg==";

// =============================================================================
// Rule Shape
// =============================================================================

/// A declarative rule as registered with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

/// What happens to a matched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    /// Cancel the request
    Block,
    /// Serve another URL instead
    Redirect { redirect: Redirect },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
}

/// Match predicate of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: ResourceTypes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_initiator_domains: Vec<String>,
}

/// Argument of a dynamic rule update. Removals are applied before additions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleOptions {
    pub add_rules: Vec<NetworkRule>,
    pub remove_rule_ids: Vec<u32>,
}

impl UpdateRuleOptions {
    /// Remove-then-add in one update, so a racing registration of the same id
    /// replaces rather than duplicates.
    pub fn replace(rule: NetworkRule) -> Self {
        Self {
            remove_rule_ids: vec![rule.id],
            add_rules: vec![rule],
        }
    }

    pub fn remove(id: u32) -> Self {
        Self {
            add_rules: Vec::new(),
            remove_rule_ids: vec![id],
        }
    }
}

// =============================================================================
// Rule Policy
// =============================================================================

/// Configured action, before it is expanded into a [`RuleAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyAction {
    Block,
    Redirect {
        #[serde(default = "default_redirect_url")]
        url: String,
    },
}

fn default_redirect_url() -> String {
    PLACEHOLDER_IMAGE_URL.to_string()
}

impl PolicyAction {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

/// Which requests the image rule covers and what it does with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulePolicy {
    pub action: PolicyAction,
    pub resource_types: ResourceTypes,
    pub url_filter: String,
    pub excluded_initiator_domains: Vec<String>,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            action: PolicyAction::Redirect {
                url: default_redirect_url(),
            },
            resource_types: ResourceTypes::VISUAL,
            url_filter: "*".to_string(),
            excluded_initiator_domains: Vec::new(),
        }
    }
}

impl RulePolicy {
    /// Build the rule registered while blocking is enabled.
    pub fn to_rule(&self) -> NetworkRule {
        let action = match &self.action {
            PolicyAction::Block => RuleAction::Block,
            PolicyAction::Redirect { url } => RuleAction::Redirect {
                redirect: Redirect { url: url.clone() },
            },
        };

        NetworkRule {
            id: IMAGE_RULE_ID,
            priority: IMAGE_RULE_PRIORITY,
            action,
            condition: RuleCondition {
                url_filter: self.url_filter.clone(),
                resource_types: self.resource_types,
                excluded_initiator_domains: self.excluded_initiator_domains.clone(),
            },
        }
    }

    /// Same coverage, but cancelling instead of redirecting.
    pub fn downgraded_to_block(&self) -> Self {
        Self {
            action: PolicyAction::Block,
            ..self.clone()
        }
    }
}
