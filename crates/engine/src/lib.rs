//! Annotation engine: owns one rendering surface per mounted component and
//! keeps its markers, camera and overlay layers in step with the page's view
//! state.

pub mod camera;
pub mod config;
pub mod container;
pub mod counters;
pub mod engine;
pub mod error;
pub mod events;
pub mod reconciler;
pub mod session;

pub use camera::*;
pub use config::*;
pub use container::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use reconciler::*;
pub use session::*;
