//! Render snapshot export
//!
//! Converts engine collections into flat shape lists. Drawing itself belongs
//! to the presentation layer.

pub mod instance;
pub mod shapes;

pub use instance::{CircleShape, RectShape, category};
pub use shapes::Snapshot;
