pub mod entity_set;
pub mod view_state;
pub mod visibility;

pub use entity_set::*;
pub use view_state::*;
pub use visibility::*;
