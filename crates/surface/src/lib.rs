//! The narrow imperative vocabulary the annotation engine drives a rendering
//! surface (map library or canvas) through.
//!
//! Nothing above this crate may depend on capabilities outside [`Surface`],
//! which keeps the underlying library swappable.

pub mod config;
pub mod error;
pub mod recording;
pub mod vocabulary;

pub use config::*;
pub use error::*;
pub use recording::*;
pub use vocabulary::*;
