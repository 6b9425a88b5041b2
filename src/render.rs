//! Render snapshot and dirty tracking
//!
//! The embedder polls `update` once per frame, reads whatever it needs
//! through the bulk accessors, then acknowledges with `mark_clean`. Dirt is
//! tracked as per-row mutation versions compared against the acknowledged
//! copy, so reads never clear state and a crashed frame can simply re-read.

use crate::cell::RenderCell;
use crate::error::Error;
use crate::screen::Screen;

/// How much of the viewport changed since the last acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dirty {
    None,
    Partial,
    Full,
}

#[derive(Debug, Default)]
pub struct RenderState {
    /// Row versions at the last `mark_clean`
    acked: Vec<u64>,
}

impl RenderState {
    pub fn new(rows: usize) -> Self {
        Self {
            acked: vec![0; rows],
        }
    }

    /// Compare screen row versions against the acknowledged snapshot.
    /// `images_dirty` folds in graphics changes that have no home row.
    pub fn update(&self, screen: &Screen, images_dirty: bool) -> Dirty {
        if self.acked.len() != screen.rows() {
            return Dirty::Full; // resized since the last frame
        }
        let dirty_rows = (0..screen.rows())
            .filter(|&y| screen.row_version(y) > self.acked[y])
            .count();
        if dirty_rows == screen.rows() {
            Dirty::Full
        } else if dirty_rows > 0 || images_dirty {
            Dirty::Partial
        } else {
            Dirty::None
        }
    }

    /// True when row `y` changed since the last acknowledgement.
    /// Rows outside the current geometry read false.
    pub fn row_dirty(&self, screen: &Screen, y: usize) -> bool {
        if y >= screen.rows() {
            return false;
        }
        match self.acked.get(y) {
            Some(&acked) => screen.row_version(y) > acked,
            None => true,
        }
    }

    /// Acknowledge everything currently on screen
    pub fn mark_clean(&mut self, screen: &Screen) {
        self.acked.clear();
        self.acked
            .extend((0..screen.rows()).map(|y| screen.row_version(y)));
    }
}

/// Copy the whole active viewport into `out`, row-major.
/// `out` must hold at least rows x cols cells.
pub fn viewport(screen: &Screen, out: &mut [RenderCell]) -> Result<usize, Error> {
    let needed = screen.rows() * screen.cols();
    if out.len() < needed {
        return Err(Error::BufferTooSmall);
    }
    let mut idx = 0;
    for row in 0..screen.rows() {
        for cell in screen.row_cells(row) {
            out[idx] = cell.render();
            idx += 1;
        }
    }
    Ok(needed)
}

/// Copy one viewport row into `out`
pub fn viewport_row(screen: &Screen, row: usize, out: &mut [RenderCell]) -> Result<usize, Error> {
    if row >= screen.rows() {
        return Err(Error::OutOfRange);
    }
    if out.len() < screen.cols() {
        return Err(Error::BufferTooSmall);
    }
    for (slot, cell) in out.iter_mut().zip(screen.row_cells(row)) {
        *slot = cell.render();
    }
    Ok(screen.cols())
}

/// Copy one scrollback line (offset 0 = oldest retained) into `out`.
/// Returns the number of cells written; historical lines keep the width
/// they had when archived.
pub fn scrollback_line(
    screen: &Screen,
    offset: usize,
    out: &mut [RenderCell],
) -> Result<usize, Error> {
    let line = screen.scrollback.line(offset).ok_or(Error::OutOfRange)?;
    if out.len() < line.cells.len() {
        return Err(Error::BufferTooSmall);
    }
    for (slot, cell) in out.iter_mut().zip(&line.cells) {
        *slot = cell.render();
    }
    Ok(line.cells.len())
}

/// Full codepoint sequence of the grapheme at (row, col): the base
/// codepoint followed by any combining codepoints. Returns the count.
pub fn grapheme(
    screen: &Screen,
    row: usize,
    col: usize,
    out: &mut [u32],
) -> Result<usize, Error> {
    if row >= screen.rows() || col >= screen.cols() {
        return Err(Error::OutOfRange);
    }
    let cell = screen.cell(row, col);
    let extras = screen
        .graphemes
        .get(cell.grapheme)
        .unwrap_or(&[]);
    let needed = 1 + extras.len();
    if out.len() < needed {
        return Err(Error::BufferTooSmall);
    }
    out[0] = cell.codepoint;
    out[1..needed].copy_from_slice(extras);
    Ok(needed)
}

/// Like [`grapheme`], for a scrollback line
pub fn scrollback_grapheme(
    screen: &Screen,
    offset: usize,
    col: usize,
    out: &mut [u32],
) -> Result<usize, Error> {
    let line = screen.scrollback.line(offset).ok_or(Error::OutOfRange)?;
    let cell = line.cells.get(col).ok_or(Error::OutOfRange)?;
    let extras = screen
        .graphemes
        .get(cell.grapheme)
        .unwrap_or(&[]);
    let needed = 1 + extras.len();
    if out.len() < needed {
        return Err(Error::BufferTooSmall);
    }
    out[0] = cell.codepoint;
    out[1..needed].copy_from_slice(extras);
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn screen(cols: usize, rows: usize) -> Screen {
        Screen::new(cols, rows, &Config::default())
    }

    #[test]
    fn fresh_screen_is_clean() {
        let s = screen(10, 4);
        let rs = RenderState::new(4);
        assert_eq!(rs.update(&s, false), Dirty::None);
    }

    #[test]
    fn single_row_write_is_partial() {
        let mut s = screen(10, 4);
        let mut rs = RenderState::new(4);
        rs.mark_clean(&s);
        s.put_char('x');
        assert_eq!(rs.update(&s, false), Dirty::Partial);
        assert!(rs.row_dirty(&s, 0));
        assert!(!rs.row_dirty(&s, 1));
    }

    #[test]
    fn mark_clean_acknowledges() {
        let mut s = screen(10, 4);
        let mut rs = RenderState::new(4);
        s.put_char('x');
        assert_ne!(rs.update(&s, false), Dirty::None);
        rs.mark_clean(&s);
        assert_eq!(rs.update(&s, false), Dirty::None);
        // Reads do not clear dirt, only mark_clean does
        s.put_char('y');
        assert_eq!(rs.update(&s, false), Dirty::Partial);
        assert_eq!(rs.update(&s, false), Dirty::Partial);
    }

    #[test]
    fn row_dirty_after_shrinking_resize() {
        let mut s = screen(10, 8);
        let mut rs = RenderState::new(8);
        rs.mark_clean(&s);
        s.resize(10, 4);
        // Rows beyond the new geometry are simply gone, not dirty
        assert!(!rs.row_dirty(&s, 6));
        assert!(rs.row_dirty(&s, 0));
        assert_eq!(rs.update(&s, false), Dirty::Full);
    }

    #[test]
    fn full_clear_is_full_dirty() {
        let mut s = screen(10, 4);
        let mut rs = RenderState::new(4);
        rs.mark_clean(&s);
        s.erase_in_display(2);
        assert_eq!(rs.update(&s, false), Dirty::Full);
    }

    #[test]
    fn image_changes_surface_as_partial() {
        let s = screen(10, 4);
        let mut rs = RenderState::new(4);
        rs.mark_clean(&s);
        assert_eq!(rs.update(&s, true), Dirty::Partial);
    }

    #[test]
    fn viewport_rejects_small_buffer() {
        let s = screen(10, 4);
        let mut out = vec![RenderCell::default(); 39];
        assert_eq!(viewport(&s, &mut out), Err(Error::BufferTooSmall));
    }

    #[test]
    fn viewport_copies_cells() {
        let mut s = screen(10, 2);
        s.put_char('A');
        let mut out = vec![RenderCell::default(); 20];
        assert_eq!(viewport(&s, &mut out), Ok(20));
        assert_eq!(out[0].codepoint, 'A' as u32);
        assert_eq!(out[1].codepoint, 0);
    }

    #[test]
    fn scrollback_line_out_of_range() {
        let s = screen(10, 2);
        let mut out = vec![RenderCell::default(); 10];
        assert_eq!(
            scrollback_line(&s, 0, &mut out),
            Err(Error::OutOfRange)
        );
    }

    #[test]
    fn scrollback_grapheme_reads_archived_cluster() {
        let mut s = screen(10, 2);
        s.put_char('e');
        s.put_char('\u{0301}');
        s.linefeed();
        s.linefeed(); // archives the cluster row
        let mut out = [0u32; 4];
        assert_eq!(scrollback_grapheme(&s, 0, 0, &mut out), Ok(2));
        assert_eq!(&out[..2], &['e' as u32, 0x0301]);
        assert_eq!(
            scrollback_grapheme(&s, 0, 99, &mut out),
            Err(Error::OutOfRange)
        );
    }

    #[test]
    fn grapheme_returns_full_sequence() {
        let mut s = screen(10, 2);
        s.put_char('e');
        s.put_char('\u{0301}');
        let mut out = [0u32; 4];
        assert_eq!(grapheme(&s, 0, 0, &mut out), Ok(2));
        assert_eq!(&out[..2], &['e' as u32, 0x0301]);
        // Plain cell yields just the base codepoint
        s.cursor_position(1, 5);
        s.put_char('z');
        assert_eq!(grapheme(&s, 0, 4, &mut out), Ok(1));
        assert_eq!(out[0], 'z' as u32);
    }
}
