//! Document-start style insertion
//!
//! Runs in the content script before any background-driven injection can
//! arrive, hiding images from the first paint.

use std::rc::Rc;

use crate::config::GuardConfig;
use crate::error::HostError;
use crate::host::PageDocument;
use crate::store::StateStore;

pub struct ContentGuard {
    store: Rc<StateStore>,
    config: GuardConfig,
}

impl ContentGuard {
    pub fn new(store: Rc<StateStore>, config: GuardConfig) -> Self {
        Self { store, config }
    }

    /// Insert the hiding style when blocking is on. Returns whether a style
    /// element was added; a page that already carries one is left alone.
    pub async fn run(&self, document: &dyn PageDocument) -> Result<bool, HostError> {
        let state = self.store.read().await?;
        if !state.is_enabled() {
            return Ok(false);
        }
        if document.has_element(&self.config.style_id) {
            log::debug!("Guard style {:?} already present", self.config.style_id);
            return Ok(false);
        }

        document.insert_style(&self.config.style_id, &self.config.css)?;
        Ok(true)
    }
}
