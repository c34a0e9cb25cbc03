use std::sync::RwLock;

use once_cell::sync::Lazy;

/// Overlay toggles for the render walk.
///
/// Pass a value to [`SceneTree::render`](super::SceneTree::render) directly,
/// or go through the process-wide handle ([`global`], [`set_global`]) when a
/// host key binding needs to flip overlays without plumbing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugConfig {
    pub show_bounds: bool,
    pub show_grid: bool,
    pub show_padding: bool,
    pub show_culled: bool,
}

impl DebugConfig {
    pub const fn new() -> Self {
        Self {
            show_bounds: false,
            show_grid: false,
            show_padding: false,
            show_culled: false,
        }
    }

    pub const fn show_bounds(mut self, enabled: bool) -> Self {
        self.show_bounds = enabled;
        self
    }

    pub const fn show_grid(mut self, enabled: bool) -> Self {
        self.show_grid = enabled;
        self
    }

    pub const fn show_padding(mut self, enabled: bool) -> Self {
        self.show_padding = enabled;
        self
    }

    pub const fn show_culled(mut self, enabled: bool) -> Self {
        self.show_culled = enabled;
        self
    }

    pub const fn any(self) -> bool {
        self.show_bounds || self.show_grid || self.show_padding || self.show_culled
    }
}

static GLOBAL_DEBUG: Lazy<RwLock<DebugConfig>> = Lazy::new(|| RwLock::new(DebugConfig::new()));

pub fn global() -> DebugConfig {
    match GLOBAL_DEBUG.read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

pub fn set_global(config: DebugConfig) {
    match GLOBAL_DEBUG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// Applies `f` to the process-wide config and returns the new value.
pub fn update_global(f: impl FnOnce(&mut DebugConfig)) -> DebugConfig {
    let mut config = global();
    f(&mut config);
    set_global(config);
    config
}

pub fn reset_global() {
    set_global(DebugConfig::new());
}
