//! # syredb-core
//!
//! Client-side core for SyreDB - shared between the desktop shell and the CLI.
//!
//! This crate provides:
//! - Application state, actions and the store (`state` module)
//! - The backend interface and a scripted in-process backend (`backend` module)
//! - The three-stage bootstrap pipeline and its views (`pipeline` module)
//! - Form parsing and validation (`forms` module)
//! - Data models (`models` module)
//! - Unified error handling (`error` module)

pub mod backend;
pub mod error;
pub mod forms;
pub mod models;
pub mod pipeline;
pub mod state;

// Re-exports for convenience
pub use backend::{AppBackend, BackendError, BackendOp, ErrorKind, Scenario, ScriptedBackend};
pub use error::{Error, Result};
pub use forms::{FormData, ValidationErrors};
pub use models::{AppConfig, User, UserCredentials, UserRole, NIL_USER_ID};
pub use pipeline::{BootstrapPipeline, PipelineOptions, StageId, StageState, View};
pub use state::{reduce, Action, ApplicationState, StateHandle, Store, UnknownActionPolicy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_version_format() {
        let v = version();
        let parts: Vec<&str> = v.split('.').collect();
        assert_eq!(parts.len(), 3, "Version should be in x.y.z format");
    }
}
