pub mod error;
pub mod geometry;
pub mod layer;
pub mod overlay;
pub mod symbology;

pub use error::*;
pub use layer::*;
pub use overlay::*;
pub use symbology::*;
