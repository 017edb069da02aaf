//! State store
//!
//! One [`Store`] per application instance, handed to whoever needs it. Reads
//! go through [`Store::get_state`] or a [`StateHandle`]; writes go through
//! [`Store::dispatch`]. Each dispatch publishes a new snapshot, so a reader
//! never sees a half-applied transition.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use super::{reduce, Action, ApplicationState, UnknownActionPolicy};
use crate::error::{Error, Result};
use crate::models::AppConfig;

/// Owner of the application state
#[derive(Debug)]
pub struct Store {
    tx: watch::Sender<Arc<ApplicationState>>,
    policy: UnknownActionPolicy,
}

impl Store {
    pub fn new(initial: ApplicationState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            tx,
            policy: UnknownActionPolicy::default(),
        }
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::new(ApplicationState::new(config))
    }

    pub fn with_policy(mut self, policy: UnknownActionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnknownActionPolicy {
        self.policy
    }

    /// Current snapshot
    pub fn get_state(&self) -> Arc<ApplicationState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Apply `action` and publish the resulting snapshot.
    ///
    /// Read, reduce and publish happen under the channel's write lock, so
    /// concurrent dispatches never overwrite each other.
    pub fn dispatch(&self, action: Action) -> Arc<ApplicationState> {
        log::debug!("dispatch {}", action.tag());
        let mut next = Arc::clone(&self.tx.borrow());
        self.tx.send_modify(|state| {
            next = Arc::new(reduce(&**state, action));
            *state = Arc::clone(&next);
        });
        next
    }

    /// Dispatch an untyped action, applying the unknown-tag policy
    pub fn dispatch_value(&self, value: Value) -> Result<()> {
        match Action::from_value(value) {
            Ok(action) => {
                self.dispatch(action);
                Ok(())
            }
            Err(Error::UnknownAction(tag)) if self.policy == UnknownActionPolicy::Ignore => {
                log::warn!("ignoring unknown action: {}", tag);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Read-only handle for consumers
    pub fn handle(&self) -> StateHandle {
        StateHandle {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(ApplicationState::default())
    }
}

/// Read-only view of a [`Store`]
#[derive(Debug, Clone)]
pub struct StateHandle {
    rx: watch::Receiver<Arc<ApplicationState>>,
}

impl StateHandle {
    pub fn get(&self) -> Arc<ApplicationState> {
        Arc::clone(&self.rx.borrow())
    }

    /// Whether a snapshot was published since this handle last looked
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next snapshot
    pub async fn changed(&mut self) -> Result<Arc<ApplicationState>> {
        self.rx
            .changed()
            .await
            .map_err(|_| Error::internal("state store was dropped"))?;
        Ok(Arc::clone(&self.rx.borrow_and_update()))
    }
}
