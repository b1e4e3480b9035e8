//! Core type definitions for the image blocker
//!
//! These types mirror the values exchanged with the host extension APIs:
//! the persisted flag, tab snapshots and per-request details.

use serde::{Deserialize, Serialize};

// =============================================================================
// Block State
// =============================================================================

/// Persisted on/off flag controlling whether images are blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockState {
    /// Images are blocked (wire value `"1"`)
    #[default]
    #[serde(rename = "1")]
    Enabled,
    /// Images load normally (wire value `"0"`)
    #[serde(rename = "0")]
    Disabled,
}

impl BlockState {
    /// Wire representation stored under the state key.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Enabled => "1",
            Self::Disabled => "0",
        }
    }

    /// Parse a stored wire value.
    ///
    /// Only `"1"` blocks. Any other present value, including garbage left by
    /// an older build, reads as off; an absent key is handled by the store.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "1" => Self::Enabled,
            "0" => Self::Disabled,
            other => {
                log::warn!("Unexpected stored state {:?}, treating as disabled", other);
                Self::Disabled
            }
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Enabled => Self::Disabled,
            Self::Disabled => Self::Enabled,
        }
    }

    #[inline]
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

// =============================================================================
// Resource Types (bit mask for rule conditions)
// =============================================================================

bitflags::bitflags! {
    /// Browser resource type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceTypes: u16 {
        const MAIN_FRAME = 1 << 0;
        const SUB_FRAME = 1 << 1;
        const STYLESHEET = 1 << 2;
        const SCRIPT = 1 << 3;
        const IMAGE = 1 << 4;
        const FONT = 1 << 5;
        const OBJECT = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const PING = 1 << 8;
        const CSP_REPORT = 1 << 9;
        const MEDIA = 1 << 10;
        const WEBSOCKET = 1 << 11;
        const OTHER = 1 << 12;

        /// Everything that renders as a picture or a video frame
        const VISUAL = Self::IMAGE.bits() | Self::MEDIA.bits();
    }
}

const RESOURCE_TYPE_NAMES: &[(ResourceTypes, &str)] = &[
    (ResourceTypes::MAIN_FRAME, "main_frame"),
    (ResourceTypes::SUB_FRAME, "sub_frame"),
    (ResourceTypes::STYLESHEET, "stylesheet"),
    (ResourceTypes::SCRIPT, "script"),
    (ResourceTypes::IMAGE, "image"),
    (ResourceTypes::FONT, "font"),
    (ResourceTypes::OBJECT, "object"),
    (ResourceTypes::XMLHTTPREQUEST, "xmlhttprequest"),
    (ResourceTypes::PING, "ping"),
    (ResourceTypes::CSP_REPORT, "csp_report"),
    (ResourceTypes::MEDIA, "media"),
    (ResourceTypes::WEBSOCKET, "websocket"),
    (ResourceTypes::OTHER, "other"),
];

impl ResourceTypes {
    /// Parse a single browser resource type name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            // Legacy webRequest spelling
            "imageset" => Some(Self::IMAGE),
            _ => RESOURCE_TYPE_NAMES
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(flag, _)| *flag),
        }
    }

    /// Browser names for every set bit, in a stable order.
    pub fn names(self) -> Vec<&'static str> {
        RESOURCE_TYPE_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl Serialize for ResourceTypes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for ResourceTypes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut mask = ResourceTypes::empty();
        for name in &names {
            let flag = ResourceTypes::parse(name).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown resource type: {}", name))
            })?;
            mask |= flag;
        }
        Ok(mask)
    }
}

// =============================================================================
// Tabs
// =============================================================================

/// Snapshot of an open tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: i32,
    /// Missing when the extension has no host permission for the tab
    pub url: Option<String>,
}

/// Payload of a tab update event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabUpdate {
    pub tab_id: i32,
    /// Current URL of the tab
    pub url: Option<String>,
    /// `status` field of the change, if the update carried one
    pub status: Option<String>,
    /// Set when the update itself changed the URL
    pub url_changed: bool,
}

impl TabUpdate {
    /// Title, favicon and audible updates don't affect rendered images.
    pub fn is_navigation(&self) -> bool {
        self.url_changed || self.status.as_deref() == Some("loading")
    }
}

// =============================================================================
// Request Interception
// =============================================================================

/// Request seen by the per-request hook.
#[derive(Debug, Clone)]
pub struct RequestDetails<'a> {
    pub url: &'a str,
    /// Browser resource type name (`image`, `media`, ...)
    pub resource_type: &'a str,
}

/// Answer handed back to a blocking request hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BlockingResponse {
    pub cancel: bool,
}

// =============================================================================
// Storage Change
// =============================================================================

/// One key of a storage change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_state_wire() {
        assert_eq!(BlockState::Enabled.as_wire(), "1");
        assert_eq!(BlockState::Disabled.as_wire(), "0");
        assert_eq!(BlockState::from_wire("0"), BlockState::Disabled);
        assert_eq!(BlockState::from_wire("1"), BlockState::Enabled);
        assert_eq!(BlockState::default(), BlockState::Enabled);
    }

    #[test]
    fn test_unknown_wire_value_reads_disabled() {
        for value in ["true", "yes", "", "01", "{\"on\":1}"] {
            assert_eq!(BlockState::from_wire(value), BlockState::Disabled, "{:?}", value);
        }
        assert_eq!(BlockState::from_wire("true").toggled().as_wire(), "1");
    }

    #[test]
    fn test_block_state_serde() {
        assert_eq!(serde_json::to_string(&BlockState::Disabled).unwrap(), "\"0\"");
        let state: BlockState = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(state, BlockState::Enabled);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(BlockState::Enabled.toggled(), BlockState::Disabled);
        assert_eq!(BlockState::Disabled.toggled().toggled(), BlockState::Disabled);
    }

    #[test]
    fn test_resource_type_names() {
        assert_eq!(ResourceTypes::VISUAL.names(), vec!["image", "media"]);
        assert_eq!(ResourceTypes::parse("imageset"), Some(ResourceTypes::IMAGE));
        assert_eq!(ResourceTypes::parse("sub_frame"), Some(ResourceTypes::SUB_FRAME));
        assert_eq!(ResourceTypes::parse("bogus"), None);
    }

    #[test]
    fn test_resource_types_serde() {
        let json = serde_json::to_string(&ResourceTypes::IMAGE).unwrap();
        assert_eq!(json, "[\"image\"]");

        let types: ResourceTypes = serde_json::from_str("[\"media\", \"image\"]").unwrap();
        assert_eq!(types, ResourceTypes::VISUAL);

        assert!(serde_json::from_str::<ResourceTypes>("[\"pixels\"]").is_err());
    }

    #[test]
    fn test_navigation_updates() {
        let mut update = TabUpdate {
            tab_id: 3,
            url: Some("https://example.com/".into()),
            status: Some("loading".into()),
            url_changed: false,
        };
        assert!(update.is_navigation());

        update.status = Some("complete".into());
        assert!(!update.is_navigation());

        update.url_changed = true;
        assert!(update.is_navigation());
    }
}
