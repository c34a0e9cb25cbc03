use rfhud::style::Color;

/// Colors shared by the stock widgets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub text: Color,
    pub text_disabled: Color,
    pub surface: Color,
    pub surface_hover: Color,
    pub surface_pressed: Color,
    pub surface_disabled: Color,
    pub track: Color,
    pub accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Color::WHITE,
            text_disabled: Color::rgb(128, 128, 128),
            surface: Color::rgba(32, 32, 40, 220),
            surface_hover: Color::rgba(56, 56, 72, 230),
            surface_pressed: Color::rgba(24, 24, 30, 240),
            surface_disabled: Color::rgba(32, 32, 32, 160),
            track: Color::rgba(0, 0, 0, 140),
            accent: Color::rgb(86, 196, 96),
        }
    }
}
