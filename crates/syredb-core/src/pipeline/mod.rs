//! Bootstrap pipeline
//!
//! Gates the application behind three sequential stages.
//!
//! ## Structure
//! - `stage.rs` - Stage identifiers and per-stage state
//! - `view.rs` - Render model handed to front-ends
//! - `controller.rs` - The pipeline itself: fetches, transitions, user actions

pub mod controller;
pub mod stage;
pub mod view;


pub use controller::{BootstrapPipeline, PipelineOptions};
pub use stage::{StageId, StageState};
pub use view::{ConfigFormView, ConnectionFraming, LoginFormView, View};
