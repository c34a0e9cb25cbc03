pub mod debug;
mod geometry;
mod layout;
mod node;
mod render;
mod screen;
mod tree;
mod widget;

pub use debug::DebugConfig;
pub use geometry::*;
pub use layout::{Alignment, BoxLayout, Quantization};
pub use node::*;
pub use render::*;
pub use screen::*;
pub use tree::{NodeId, SceneTree};
pub use widget::*;
