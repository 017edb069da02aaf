//! Per-stage state machine

use std::fmt;

use serde::Serialize;
use tokio::task::AbortHandle;

use crate::backend::BackendError;

/// Bootstrap stages, in the order they unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Config,
    Connection,
    Session,
}

impl StageId {
    pub const ALL: [StageId; 3] = [StageId::Config, StageId::Connection, StageId::Session];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Config => "config",
            StageId::Connection => "connection",
            StageId::Session => "session",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one stage stands
#[derive(Debug, Clone, PartialEq)]
pub enum StageState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(BackendError),
}

impl<T> StageState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, StageState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, StageState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StageState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageState::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            StageState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&BackendError> {
        match self {
            StageState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// A stage plus the bookkeeping for its single outstanding fetch.
///
/// Every `begin` or `reset` bumps the generation; a completion is only
/// accepted while its generation is current and the slot is still loading.
#[derive(Debug)]
pub(crate) struct StageSlot<T> {
    state: StageState<T>,
    generation: u64,
    label: &'static str,
    task: Option<AbortHandle>,
}

impl<T> StageSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: StageState::Idle,
            generation: 0,
            label: "",
            task: None,
        }
    }

    pub(crate) fn state(&self) -> &StageState<T> {
        &self.state
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }

    /// Abandon any outstanding fetch and start a new attempt
    pub(crate) fn begin(&mut self, label: &'static str) -> u64 {
        self.cancel();
        self.generation += 1;
        self.label = label;
        self.state = StageState::Loading;
        self.generation
    }

    pub(crate) fn attach(&mut self, task: AbortHandle) {
        self.task = Some(task);
    }

    pub(crate) fn accepts(&self, generation: u64) -> bool {
        generation == self.generation && self.state.is_loading()
    }

    pub(crate) fn finish(&mut self, state: StageState<T>) {
        self.task = None;
        self.state = state;
    }

    pub(crate) fn reset(&mut self) {
        self.cancel();
        self.generation += 1;
        self.state = StageState::Idle;
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
