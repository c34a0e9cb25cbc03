//! Retained scene graph for HUD overlays.
//!
//! Nodes live in a [`view::SceneTree`] arena. Mutations raise
//! [`view::DirtyFlags`] that propagate to ancestors; each
//! [`view::SceneTree::update`] revisits only what changed, re-runs box layout
//! where needed, eases positions and scales toward their targets, and folds
//! active [`effect::Effect`]s into one [`effect::TransformDelta`] per node.
//! [`view::Screen`] drives a tree from host input and frame ticks.

pub mod effect;
pub mod error;
pub mod style;
pub mod transition;
pub mod ui;
pub mod view;

pub use error::UiError;
