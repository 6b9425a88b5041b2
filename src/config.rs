//! Terminal configuration
//!
//! Creation-time options: scrollback bound and color overrides.
//! All colors use 0xRRGGBB packing where 0 means "use the built-in default",
//! matching the convention of most terminal embedding APIs.

/// Configuration applied at terminal creation
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum scrollback lines (0 = unbounded)
    pub scrollback_limit: u32,
    /// Default foreground color (0xRRGGBB, 0 = built-in default)
    pub fg_color: u32,
    /// Default background color (0xRRGGBB, 0 = built-in default)
    pub bg_color: u32,
    /// Cursor color (0xRRGGBB, 0 = built-in default)
    pub cursor_color: u32,
    /// ANSI palette override for slots 0-15 (0 per slot = built-in default)
    pub palette: [u32; 16],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrollback_limit: 10_000,
            fg_color: 0,
            bg_color: 0,
            cursor_color: 0,
            palette: [0; 16],
        }
    }
}
