//! Cell model and grapheme side table
//!
//! Cells are fixed-size so the grid stays a flat array that can be
//! bulk-copied out in one viewport read. Multi-codepoint glyphs (combining
//! marks, ZWJ emoji) keep only their base codepoint in the cell; the extra
//! codepoints live in a side arena referenced by a small integer key.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::color::Rgb;

bitflags! {
    /// Cell character attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        const BOLD          = 1 << 0;
        const ITALIC        = 1 << 1;
        const UNDERLINE     = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const INVERSE       = 1 << 4;
        const INVISIBLE     = 1 << 5;
        const BLINK         = 1 << 6;
        const FAINT         = 1 << 7;
    }
}

/// One grid cell. Colors are already resolved to concrete RGB.
///
/// `width` is 1 for ordinary characters, 2 for a wide head, 0 for the
/// spacer that always follows a wide head. `grapheme` is a key into the
/// [`GraphemeTable`] (0 = no extra codepoints); `grapheme_len` counts the
/// extra codepoints beyond `codepoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub codepoint: u32,
    pub fg: Rgb,
    pub bg: Rgb,
    pub flags: CellFlags,
    pub width: u8,
    /// Hyperlink id (OSC 8), 0 = none
    pub hyperlink: u16,
    /// Grapheme table key, 0 = none
    pub grapheme: u32,
    /// Number of extra codepoints beyond `codepoint`
    pub grapheme_len: u8,
}

impl Cell {
    /// Blank cell with the given resolved colors
    pub fn blank(fg: Rgb, bg: Rgb) -> Self {
        Self {
            codepoint: 0,
            fg,
            bg,
            flags: CellFlags::empty(),
            width: 1,
            hyperlink: 0,
            grapheme: 0,
            grapheme_len: 0,
        }
    }

    /// True for cells that never held a printable character
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.codepoint == 0
    }

    /// Fixed-size projection for bulk viewport reads
    pub fn render(&self) -> RenderCell {
        RenderCell {
            codepoint: self.codepoint,
            fg_r: self.fg.r,
            fg_g: self.fg.g,
            fg_b: self.fg.b,
            bg_r: self.bg.r,
            bg_g: self.bg.g,
            bg_b: self.bg.b,
            flags: self.flags.bits(),
            width: self.width,
            hyperlink: self.hyperlink,
            grapheme_len: self.grapheme_len,
            _pad: 0,
        }
    }
}

/// 16-byte wire format of a cell, the unit of `viewport` and
/// `scrollback_line` bulk reads
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderCell {
    pub codepoint: u32,
    pub fg_r: u8,
    pub fg_g: u8,
    pub fg_b: u8,
    pub bg_r: u8,
    pub bg_g: u8,
    pub bg_b: u8,
    pub flags: u8,
    pub width: u8,
    pub hyperlink: u16,
    pub grapheme_len: u8,
    pub _pad: u8,
}

/// Side arena for the extra codepoints of multi-codepoint graphemes
///
/// Every entry is owned by exactly one cell. The owner frees the entry when
/// it is overwritten, erased, or its row is evicted from scrollback; nothing
/// else holds a key, so freeing is always safe.
#[derive(Debug, Default)]
pub struct GraphemeTable {
    entries: HashMap<u32, Vec<u32>>,
    next_key: u32,
}

impl GraphemeTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_key: 1,
        }
    }

    /// Append a codepoint to the entry at `key`, allocating a fresh entry
    /// when `key` is 0. Returns the (possibly new) key.
    pub fn push(&mut self, key: u32, cp: u32) -> u32 {
        if key != 0 {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.push(cp);
                return key;
            }
        }
        let key = self.allocate_key();
        self.entries.insert(key, vec![cp]);
        key
    }

    /// Extra codepoints stored under `key`
    pub fn get(&self, key: u32) -> Option<&[u32]> {
        self.entries.get(&key).map(|v| v.as_slice())
    }

    /// Release the entry at `key` (no-op for 0 or unknown keys)
    pub fn free(&mut self, key: u32) {
        if key != 0 {
            self.entries.remove(&key);
        }
    }

    /// Release the entry owned by `cell`, if any
    #[inline]
    pub fn free_cell(&mut self, cell: &Cell) {
        self.free(cell.grapheme);
    }

    /// Drop every entry (full reset)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_key = 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn allocate_key(&mut self) -> u32 {
        // Skip keys still in use after a wrap-around
        loop {
            let key = self.next_key;
            self.next_key = self.next_key.wrapping_add(1).max(1);
            if !self.entries.contains_key(&key) {
                return key;
            }
        }
    }
}
