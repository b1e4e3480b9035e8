//! Persisted block state
//!
//! The store never caches: every read goes to host storage, so a context
//! restarted mid-sequence observes whatever was last committed.

use std::rc::Rc;

use crate::error::HostError;
use crate::host::KeyValueStorage;
use crate::types::{BlockState, StorageChange};

pub struct StateStore {
    storage: Rc<dyn KeyValueStorage>,
    key: String,
}

impl StateStore {
    pub fn new(storage: Rc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Read the current state, persisting the default when the key is unset.
    pub async fn read(&self) -> Result<BlockState, HostError> {
        match self.storage.get(&self.key).await? {
            Some(value) => Ok(BlockState::from_wire(&value)),
            None => {
                let state = BlockState::default();
                log::debug!("No stored state under {:?}, writing default", self.key);
                self.storage.set(&self.key, state.as_wire()).await?;
                Ok(state)
            }
        }
    }

    pub async fn write(&self, state: BlockState) -> Result<(), HostError> {
        self.storage.set(&self.key, state.as_wire()).await
    }

    /// Does a change notification touch the state key?
    pub fn is_relevant(&self, changes: &[StorageChange]) -> bool {
        changes.iter().any(|change| change.key == self.key)
    }
}
