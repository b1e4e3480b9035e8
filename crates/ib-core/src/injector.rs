//! Per-tab stylesheet that hides already rendered images.
//!
//! Injection is best effort: a tab closing mid-call or an origin without host
//! permission is logged and skipped, never propagated.

use std::rc::Rc;

use crate::error::HostError;
use crate::host::{Scripting, Tabs};
use crate::store::StateStore;
use crate::types::{BlockState, Tab};
use crate::url::is_injectable;

/// Outcome for one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssAction {
    Inject,
    Remove,
}

pub struct TabCssInjector {
    store: Rc<StateStore>,
    scripting: Rc<dyn Scripting>,
    tabs: Rc<dyn Tabs>,
    css: String,
    privileged_prefixes: Vec<String>,
}

impl TabCssInjector {
    pub fn new(
        store: Rc<StateStore>,
        scripting: Rc<dyn Scripting>,
        tabs: Rc<dyn Tabs>,
        css: impl Into<String>,
        privileged_prefixes: Vec<String>,
    ) -> Self {
        Self {
            store,
            scripting,
            tabs,
            css: css.into(),
            privileged_prefixes,
        }
    }

    /// Privileged and URL-less tabs always get `Remove`, whatever the state.
    pub fn decide(&self, state: BlockState, url: Option<&str>) -> CssAction {
        if state.is_enabled() && is_injectable(url, &self.privileged_prefixes) {
            CssAction::Inject
        } else {
            CssAction::Remove
        }
    }

    /// Re-read the state and bring one tab in line with it.
    ///
    /// Only a storage failure is returned.
    pub async fn refresh_tab(&self, tab_id: i32, url: Option<&str>) -> Result<CssAction, HostError> {
        let state = self.store.read().await?;
        Ok(self.apply(tab_id, url, state).await)
    }

    /// Inject or remove for a known state. Never fails.
    pub async fn apply(&self, tab_id: i32, url: Option<&str>, state: BlockState) -> CssAction {
        let action = self.decide(state, url);
        let result = match action {
            CssAction::Inject => self.scripting.insert_css(tab_id, &self.css).await,
            CssAction::Remove => self.scripting.remove_css(tab_id, &self.css).await,
        };
        if let Err(e) = result {
            log::warn!("Failed to {:?} CSS for tab {}: {}", action, tab_id, e);
        }
        action
    }

    /// Apply the current state to every open tab.
    pub async fn sync_all_tabs(&self, state: BlockState) {
        let tabs: Vec<Tab> = match self.tabs.all_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::warn!("Failed to list tabs: {}", e);
                return;
            }
        };

        for tab in &tabs {
            self.apply(tab.id, tab.url.as_deref(), state).await;
        }
    }
}
