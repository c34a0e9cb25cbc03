mod keyframe;
mod time_function;

pub use keyframe::*;
pub use time_function::*;
