mod button;
mod item_icon;
mod label;
mod progress_bar;
mod theme;

pub use button::*;
pub use item_icon::*;
pub use label::*;
pub use progress_bar::*;
pub use theme::*;
