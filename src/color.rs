//! Colors and attribute resolution
//!
//! SGR color requests ("default", palette index, truecolor) are resolved to
//! concrete RGB at cell-write time against the active palette and configured
//! defaults. Cells never store a symbolic color, so later configuration
//! changes do not repaint already-written content.

use crate::config::Config;

/// Concrete RGB triple, the only color representation cells hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack 0xRRGGBB
    pub const fn from_u32(v: u32) -> Self {
        Self {
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }

    /// Pack as 0xRRGGBB
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// Built-in default foreground (light gray, xterm-style)
pub const DEFAULT_FG: Rgb = Rgb::new(0xe5, 0xe5, 0xe5);
/// Built-in default background (black)
pub const DEFAULT_BG: Rgb = Rgb::new(0x00, 0x00, 0x00);
/// Built-in cursor color
pub const DEFAULT_CURSOR: Rgb = Rgb::new(0xff, 0xff, 0xff);

/// Color request carried by the pen until write-time resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// Use the configured default (foreground or background)
    #[default]
    Default,
    /// 256-color palette index
    Indexed(u8),
    /// True Color (24bit RGB)
    Rgb(Rgb),
}

impl Color {
    /// Resolve to concrete RGB against `default` and `palette`
    pub fn resolve(self, default: Rgb, palette: &Palette) -> Rgb {
        match self {
            Color::Default => default,
            Color::Indexed(idx) => palette.get(idx),
            Color::Rgb(rgb) => rgb,
        }
    }
}

/// Pre-computed 256-color palette (compile-time generated base table)
const fn generate_base_palette() -> [Rgb; 256] {
    let mut palette = [Rgb::new(0, 0, 0); 256];

    // Helper for 6x6x6 color cube value
    const fn cube_val(v: u8) -> u8 {
        if v == 0 {
            0
        } else {
            55 + 40 * v
        }
    }

    // Standard 16 colors (ANSI)
    palette[0] = Rgb::new(0, 0, 0); // black
    palette[1] = Rgb::new(205, 0, 0); // red
    palette[2] = Rgb::new(0, 205, 0); // green
    palette[3] = Rgb::new(205, 205, 0); // yellow
    palette[4] = Rgb::new(0, 0, 238); // blue
    palette[5] = Rgb::new(205, 0, 205); // magenta
    palette[6] = Rgb::new(0, 205, 205); // cyan
    palette[7] = Rgb::new(229, 229, 229); // white
    palette[8] = Rgb::new(127, 127, 127); // bright black
    palette[9] = Rgb::new(255, 0, 0); // bright red
    palette[10] = Rgb::new(0, 255, 0); // bright green
    palette[11] = Rgb::new(255, 255, 0); // bright yellow
    palette[12] = Rgb::new(92, 92, 255); // bright blue
    palette[13] = Rgb::new(255, 0, 255); // bright magenta
    palette[14] = Rgb::new(0, 255, 255); // bright cyan
    palette[15] = Rgb::new(255, 255, 255); // bright white

    // 216-color cube (16-231): 6x6x6 RGB values
    let mut i = 16usize;
    while i < 232 {
        let n = (i - 16) as u8;
        let b_val = n % 6;
        let g_val = (n / 6) % 6;
        let r_val = n / 36;
        palette[i] = Rgb::new(cube_val(r_val), cube_val(g_val), cube_val(b_val));
        i += 1;
    }

    // Grayscale (232-255): 24 shades from dark to light
    let mut i = 232usize;
    while i < 256 {
        let v = (8 + 10 * (i - 232)) as u8;
        palette[i] = Rgb::new(v, v, v);
        i += 1;
    }

    palette
}

static BASE_PALETTE: [Rgb; 256] = generate_base_palette();

/// Active 256-color palette: the base table with the configured
/// 16-slot ANSI override applied
#[derive(Debug, Clone)]
pub struct Palette {
    colors: [Rgb; 256],
}

impl Palette {
    pub fn from_config(config: &Config) -> Self {
        let mut colors = BASE_PALETTE;
        for (slot, &packed) in config.palette.iter().enumerate() {
            if packed != 0 {
                colors[slot] = Rgb::from_u32(packed);
            }
        }
        Self { colors }
    }

    /// O(1) palette lookup
    #[inline]
    pub fn get(&self, idx: u8) -> Rgb {
        self.colors[idx as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: BASE_PALETTE,
        }
    }
}
