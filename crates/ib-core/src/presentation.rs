//! Toolbar icon and context menu title.

use std::rc::Rc;

use crate::config::{IconConfig, MenuConfig};
use crate::error::HostError;
use crate::host::{ContextMenus, I18n, ToolbarAction};
use crate::types::BlockState;

/// Message shown while images load (clicking blocks them).
pub const MSG_BLOCK: &str = "context_menu_block";
/// Message shown while images are blocked.
pub const MSG_UNBLOCK: &str = "context_menu_unblock";

/// A context menu entry together with the registry that hosts it.
pub struct MenuEntry {
    pub menus: Rc<dyn ContextMenus>,
    pub config: MenuConfig,
}

pub struct Presenter {
    action: Rc<dyn ToolbarAction>,
    i18n: Rc<dyn I18n>,
    icons: IconConfig,
    menu: Option<MenuEntry>,
}

impl Presenter {
    pub fn new(
        action: Rc<dyn ToolbarAction>,
        i18n: Rc<dyn I18n>,
        icons: IconConfig,
        menu: Option<MenuEntry>,
    ) -> Self {
        Self {
            action,
            i18n,
            icons,
            menu,
        }
    }

    pub fn icon_path(&self, state: BlockState) -> &str {
        match state {
            BlockState::Enabled => &self.icons.enabled,
            BlockState::Disabled => &self.icons.disabled,
        }
    }

    pub async fn set_icon(&self, state: BlockState) -> Result<(), HostError> {
        self.action.set_icon(self.icon_path(state)).await
    }

    pub fn menu_id(&self) -> Option<&str> {
        self.menu.as_ref().map(|menu| menu.config.id.as_str())
    }

    /// Localized title offering the opposite of `state`.
    pub fn menu_title(&self, state: BlockState) -> String {
        let (key, fallback) = match state {
            BlockState::Enabled => (MSG_UNBLOCK, "Show images"),
            BlockState::Disabled => (MSG_BLOCK, "Block images"),
        };
        self.i18n
            .message(key)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Retitle the menu item, creating it when the host has none.
    ///
    /// A no-op when the context menu is disabled.
    pub async fn set_menu_title(&self, state: BlockState) -> Result<(), HostError> {
        let MenuEntry { menus, config } = match &self.menu {
            Some(entry) => entry,
            None => return Ok(()),
        };
        let title = self.menu_title(state);

        match menus.update(&config.id, &title).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::debug!("Menu update failed ({}), creating {:?}", e, config.id);
                menus.create(&config.id, &title, &config.contexts).await
            }
        }
    }
}
