//! Screen state
//!
//! Owns the character grids (primary + alternate), cursor, pen, scroll
//! region, mode registry, and scrollback. All escape-sequence semantics that
//! mutate visible state land here; the parser only decides *which* operation
//! to call.
//!
//! Wide characters occupy a head cell (width 2) plus a spacer (width 0) in
//! the next column. Every operation that could split the pair erases both
//! halves. Colors are resolved to concrete RGB when a cell is written.

use log::warn;
use unicode_width::UnicodeWidthChar;

use std::collections::HashMap;

use crate::cell::{Cell, CellFlags, GraphemeTable};
use crate::color::{Color, Palette, Rgb, DEFAULT_BG, DEFAULT_CURSOR, DEFAULT_FG};
use crate::config::Config;
use crate::modes::{self, ModeNamespace, ModeRegistry};
use crate::scrollback::{Scrollback, ScrollbackLine};

/// Which grid is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveScreen {
    Primary,
    Alternate,
}

/// Cursor state. `pending_wrap` implements deferred wrapping: after writing
/// into the last column the cursor logically sits one past it, and the wrap
/// happens only when the next printable character arrives.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub col: usize,
    pub row: usize,
    pub pending_wrap: bool,
}

/// Saved cursor slot (DECSC / SCOSC)
#[derive(Debug, Clone, Copy)]
struct SavedCursor {
    col: usize,
    row: usize,
    pen: Pen,
    pending_wrap: bool,
}

/// Current drawing attributes. Colors stay symbolic here and are resolved
/// at write time.
#[derive(Debug, Clone, Copy, Default)]
struct Pen {
    fg: Color,
    bg: Color,
    flags: CellFlags,
}

/// OSC 8 hyperlink interner: cells store a small id, URLs live here
#[derive(Debug, Default)]
struct Hyperlinks {
    ids: HashMap<String, u16>,
    urls: Vec<String>,
}

impl Hyperlinks {
    fn intern(&mut self, url: &str) -> u16 {
        if let Some(&id) = self.ids.get(url) {
            return id;
        }
        if self.urls.len() >= u16::MAX as usize {
            warn!("hyperlink table full, dropping link");
            return 0;
        }
        self.urls.push(url.to_string());
        let id = self.urls.len() as u16;
        self.ids.insert(url.to_string(), id);
        id
    }

    fn url(&self, id: u16) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.urls.get(id as usize - 1).map(|s| s.as_str())
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.urls.clear();
    }
}

/// One rows x cols cell matrix with per-row soft-wrap flags
#[derive(Debug)]
struct Grid {
    cells: Vec<Cell>,
    cols: usize,
    rows: usize,
    wrapped: Vec<bool>,
}

impl Grid {
    fn new(cols: usize, rows: usize, blank: Cell) -> Self {
        Self {
            cells: vec![blank; cols * rows],
            cols,
            rows,
            wrapped: vec![false; rows],
        }
    }

    #[inline]
    fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[row * self.cols + col]
    }

    #[inline]
    fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        &mut self.cells[row * self.cols + col]
    }

    fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    fn row_mut(&mut self, row: usize) -> &mut [Cell] {
        let start = row * self.cols;
        &mut self.cells[start..start + self.cols]
    }

    /// Fill a row with blanks (does not release grapheme entries)
    fn fill_row(&mut self, row: usize, blank: Cell) {
        self.row_mut(row).fill(blank);
        self.wrapped[row] = false;
    }

    /// Copy row `src` over row `dst`, carrying the wrap flag
    fn copy_row(&mut self, src: usize, dst: usize) {
        if src == dst {
            return;
        }
        let cols = self.cols;
        let (src_start, dst_start) = (src * cols, dst * cols);
        if src_start > dst_start {
            let (left, right) = self.cells.split_at_mut(src_start);
            left[dst_start..dst_start + cols].copy_from_slice(&right[..cols]);
        } else {
            let (left, right) = self.cells.split_at_mut(dst_start);
            right[..cols].copy_from_slice(&left[src_start..src_start + cols]);
        }
        self.wrapped[dst] = self.wrapped[src];
    }

    /// Top-left-anchored resize. Returns the grapheme keys of truncated
    /// cells so the caller can release them.
    fn resize(&mut self, new_cols: usize, new_rows: usize, blank: Cell) -> Vec<u32> {
        let mut dropped = Vec::new();
        for (idx, cell) in self.cells.iter().enumerate() {
            let (row, col) = (idx / self.cols, idx % self.cols);
            if (row >= new_rows || col >= new_cols) && cell.grapheme != 0 {
                dropped.push(cell.grapheme);
            }
        }

        let mut new_cells = vec![blank; new_cols * new_rows];
        let copy_rows = self.rows.min(new_rows);
        let copy_cols = self.cols.min(new_cols);
        for row in 0..copy_rows {
            let src = row * self.cols;
            let dst = row * new_cols;
            new_cells[dst..dst + copy_cols].copy_from_slice(&self.cells[src..src + copy_cols]);
        }

        self.cells = new_cells;
        self.cols = new_cols;
        self.rows = new_rows;
        self.wrapped.resize(new_rows, false);

        // A wide head stranded in the new last column lost its spacer
        for row in 0..new_rows {
            let cell = self.cell_mut(row, new_cols - 1);
            if cell.width == 2 {
                if cell.grapheme != 0 {
                    dropped.push(cell.grapheme);
                }
                *cell = blank;
            }
        }
        dropped
    }
}

/// Terminal screen: grids, cursor, attributes, modes, scrollback
#[derive(Debug)]
pub struct Screen {
    primary: Grid,
    alternate: Grid,
    active: ActiveScreen,
    cols: usize,
    rows: usize,

    pub cursor: Cursor,
    saved_cursor: Option<SavedCursor>,
    pen: Pen,
    /// Top of scroll region (0-indexed)
    scroll_top: usize,
    /// Bottom of scroll region (0-indexed, inclusive)
    scroll_bottom: usize,
    /// Last printed character (for REP)
    last_char: Option<char>,
    /// Window title (OSC 0/2)
    title: Option<String>,

    pub modes: ModeRegistry,
    pub scrollback: Scrollback,
    pub graphemes: GraphemeTable,

    palette: Palette,
    default_fg: Rgb,
    default_bg: Rgb,
    cursor_color: Rgb,
    hyperlinks: Hyperlinks,
    current_hyperlink: u16,

    /// Monotonic mutation counter; `row_versions[y]` is the value at the
    /// last mutation of row y. The render snapshot compares these against
    /// its acknowledged copy.
    version: u64,
    row_versions: Vec<u64>,
}

impl Screen {
    pub fn new(cols: usize, rows: usize, config: &Config) -> Self {
        let default_fg = resolve_config_color(config.fg_color, DEFAULT_FG);
        let default_bg = resolve_config_color(config.bg_color, DEFAULT_BG);
        let cursor_color = resolve_config_color(config.cursor_color, DEFAULT_CURSOR);
        let blank = Cell::blank(default_fg, default_bg);

        Self {
            primary: Grid::new(cols, rows, blank),
            alternate: Grid::new(cols, rows, blank),
            active: ActiveScreen::Primary,
            cols,
            rows,
            cursor: Cursor {
                col: 0,
                row: 0,
                pending_wrap: false,
            },
            saved_cursor: None,
            pen: Pen::default(),
            scroll_top: 0,
            scroll_bottom: rows - 1,
            last_char: None,
            title: None,
            modes: ModeRegistry::new(),
            scrollback: Scrollback::new(config.scrollback_limit as usize),
            graphemes: GraphemeTable::new(),
            palette: Palette::from_config(config),
            default_fg,
            default_bg,
            cursor_color,
            hyperlinks: Hyperlinks::default(),
            current_hyperlink: 0,
            version: 0,
            row_versions: vec![0; rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn default_fg(&self) -> Rgb {
        self.default_fg
    }

    pub fn default_bg(&self) -> Rgb {
        self.default_bg
    }

    pub fn cursor_color(&self) -> Rgb {
        self.cursor_color
    }

    pub fn cursor_visible(&self) -> bool {
        self.modes.get(ModeNamespace::DecPrivate, modes::DECTCEM)
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.active == ActiveScreen::Alternate
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.active_grid().cell(row, col)
    }

    pub fn row_cells(&self, row: usize) -> &[Cell] {
        self.active_grid().row(row)
    }

    /// True when row `y` soft-wrapped from the previous row
    pub fn is_row_wrapped(&self, y: usize) -> bool {
        y < self.rows && self.active_grid().wrapped[y]
    }

    pub fn hyperlink_url(&self, id: u16) -> Option<&str> {
        self.hyperlinks.url(id)
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[inline]
    pub fn row_version(&self, y: usize) -> u64 {
        self.row_versions[y]
    }

    fn active_grid(&self) -> &Grid {
        match self.active {
            ActiveScreen::Primary => &self.primary,
            ActiveScreen::Alternate => &self.alternate,
        }
    }

    fn active_grid_mut(&mut self) -> &mut Grid {
        match self.active {
            ActiveScreen::Primary => &mut self.primary,
            ActiveScreen::Alternate => &mut self.alternate,
        }
    }

    fn blank_cell(&self) -> Cell {
        Cell::blank(self.default_fg, self.default_bg)
    }

    #[inline]
    fn touch_row(&mut self, y: usize) {
        self.version += 1;
        self.row_versions[y] = self.version;
    }

    fn touch_all(&mut self) {
        self.version += 1;
        let v = self.version;
        self.row_versions.fill(v);
    }

    // ========== Cell destruction helpers ==========

    /// Blank one cell, releasing its grapheme entry
    fn destroy_cell(&mut self, row: usize, col: usize) {
        let blank = self.blank_cell();
        let grid = self.active_grid_mut();
        let cell = grid.cell_mut(row, col);
        let key = cell.grapheme;
        *cell = blank;
        self.graphemes.free(key);
    }

    /// Blank the wide pair that `col` belongs to (head or spacer), if any
    fn destroy_wide_pair(&mut self, row: usize, col: usize) {
        let width = self.active_grid().cell(row, col).width;
        match width {
            2 => {
                self.destroy_cell(row, col);
                if col + 1 < self.cols {
                    self.destroy_cell(row, col + 1);
                }
            }
            0 => {
                self.destroy_cell(row, col);
                if col > 0 {
                    self.destroy_cell(row, col - 1);
                }
            }
            _ => self.destroy_cell(row, col),
        }
    }

    /// Release the grapheme entries of every cell in a row
    fn free_row_graphemes(&mut self, row: usize) {
        let grid = match self.active {
            ActiveScreen::Primary => &self.primary,
            ActiveScreen::Alternate => &self.alternate,
        };
        for col in 0..grid.cols {
            let key = grid.cell(row, col).grapheme;
            self.graphemes.free(key);
        }
    }

    /// Release all grapheme entries in a row and blank it
    fn destroy_row(&mut self, row: usize) {
        let grid = match self.active {
            ActiveScreen::Primary => &mut self.primary,
            ActiveScreen::Alternate => &mut self.alternate,
        };
        for cell in grid.row(row) {
            self.graphemes.free(cell.grapheme);
        }
        let blank = Cell::blank(self.default_fg, self.default_bg);
        grid.fill_row(row, blank);
    }

    // ========== Character writing ==========

    /// Write one codepoint at the cursor and advance.
    ///
    /// Zero-width codepoints (combining marks, ZWJ, variation selectors)
    /// attach to the previous cell's grapheme cluster instead of occupying
    /// a cell of their own.
    pub fn put_char(&mut self, ch: char) {
        let width = match ch.width() {
            None => return, // control character, parser handles these
            Some(0) => {
                self.attach_zero_width(ch);
                return;
            }
            Some(w) => w.min(2),
        };

        let autowrap = self.modes.get(ModeNamespace::DecPrivate, modes::DECAWM);

        if self.cursor.pending_wrap {
            self.cursor.pending_wrap = false;
            if autowrap {
                self.wrap_to_next_row();
            }
        }

        // Wide character with only the last column left: blank it and wrap
        if width == 2 && self.cursor.col + 1 >= self.cols {
            self.destroy_wide_pair(self.cursor.row, self.cursor.col);
            let row = self.cursor.row;
            self.touch_row(row);
            if autowrap {
                self.wrap_to_next_row();
            } else {
                return; // cannot fit without wrapping
            }
        }

        // Insert mode shifts existing content right before writing
        if self.modes.get(ModeNamespace::Ansi, modes::IRM) {
            self.insert_blanks(width);
        }

        let (row, col) = (self.cursor.row, self.cursor.col);

        // Clear whatever the new cell (and spacer) overwrites
        self.destroy_wide_pair(row, col);
        if width == 2 {
            self.destroy_wide_pair(row, col + 1);
        }

        let fg = self.pen.fg.resolve(self.default_fg, &self.palette);
        let bg = self.pen.bg.resolve(self.default_bg, &self.palette);
        let flags = self.pen.flags;
        let hyperlink = self.current_hyperlink;

        *self.active_grid_mut().cell_mut(row, col) = Cell {
            codepoint: ch as u32,
            fg,
            bg,
            flags,
            width: width as u8,
            hyperlink,
            grapheme: 0,
            grapheme_len: 0,
        };
        if width == 2 {
            *self.active_grid_mut().cell_mut(row, col + 1) = Cell {
                codepoint: 0,
                fg,
                bg,
                flags,
                width: 0,
                hyperlink,
                grapheme: 0,
                grapheme_len: 0,
            };
        }
        self.touch_row(row);

        let next = col + width;
        if next >= self.cols {
            self.cursor.col = self.cols - 1;
            if autowrap {
                self.cursor.pending_wrap = true;
            }
        } else {
            self.cursor.col = next;
        }
        self.last_char = Some(ch);
    }

    /// Append a zero-width codepoint to the previous cell's grapheme entry
    fn attach_zero_width(&mut self, ch: char) {
        let (row, col) = if self.cursor.pending_wrap {
            // Deferred wrap: the cursor still sits on the last written cell
            (self.cursor.row, self.cursor.col)
        } else if self.cursor.col > 0 {
            (self.cursor.row, self.cursor.col - 1)
        } else if self.cursor.row > 0 {
            (self.cursor.row - 1, self.cols - 1)
        } else {
            return;
        };

        // Step back from a spacer to the wide head
        let col = if self.active_grid().cell(row, col).width == 0 && col > 0 {
            col - 1
        } else {
            col
        };

        let cell = *self.active_grid().cell(row, col);
        if cell.is_blank() || cell.grapheme_len == u8::MAX {
            return;
        }

        let key = self.graphemes.push(cell.grapheme, ch as u32);
        let slot = self.active_grid_mut().cell_mut(row, col);
        slot.grapheme = key;
        slot.grapheme_len += 1;
        self.touch_row(row);
    }

    /// Move to column 0 of the next row and mark it as a soft-wrap
    /// continuation, scrolling when at the region bottom
    fn wrap_to_next_row(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.index();
        let row = self.cursor.row;
        self.active_grid_mut().wrapped[row] = true;
        self.touch_row(row);
    }

    /// Repeat the last printed character (REP)
    pub fn repeat_char(&mut self, n: usize) {
        if let Some(ch) = self.last_char {
            for _ in 0..n {
                self.put_char(ch);
            }
        }
    }

    // ========== Cursor movement ==========

    /// Move cursor to absolute position (1-indexed, CUP semantics)
    pub fn cursor_position(&mut self, row: usize, col: usize) {
        self.cursor.row = row.saturating_sub(1).min(self.rows - 1);
        self.cursor.col = col.saturating_sub(1).min(self.cols - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_up(&mut self, n: usize) {
        self.cursor.row = self.cursor.row.saturating_sub(n);
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_down(&mut self, n: usize) {
        self.cursor.row = (self.cursor.row + n).min(self.rows - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_forward(&mut self, n: usize) {
        self.cursor.col = (self.cursor.col + n).min(self.cols - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_backward(&mut self, n: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(n);
        self.cursor.pending_wrap = false;
    }

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// LF/VT/FF: move down, scrolling at the region bottom. Honors LNM.
    pub fn linefeed(&mut self) {
        self.cursor.pending_wrap = false;
        self.index();
        if self.modes.get(ModeNamespace::Ansi, modes::LNM) {
            self.cursor.col = 0;
        }
    }

    /// IND: cursor down one row, scrolling at the region bottom
    pub fn index(&mut self) {
        if self.cursor.row == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
        }
    }

    /// RI: cursor up one row, scrolling down at the region top
    pub fn reverse_index(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    pub fn backspace(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
            // Land on the head of a wide pair, not its spacer
            if self.active_grid().cell(self.cursor.row, self.cursor.col).width == 0
                && self.cursor.col > 0
            {
                self.cursor.col -= 1;
            }
        }
    }

    /// HT: fixed 8-column tab stops
    pub fn tab(&mut self) {
        self.cursor.pending_wrap = false;
        let next = (self.cursor.col / 8 + 1) * 8;
        self.cursor.col = next.min(self.cols - 1);
    }

    /// Move the cursor below a freshly placed image, scrolling as needed
    pub fn advance_past_image(&mut self, rows: usize) {
        self.cursor.pending_wrap = false;
        for _ in 0..rows {
            self.index();
        }
        self.cursor.col = 0;
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            col: self.cursor.col,
            row: self.cursor.row,
            pen: self.pen,
            pending_wrap: self.cursor.pending_wrap,
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor {
            self.cursor.row = saved.row.min(self.rows - 1);
            self.cursor.col = saved.col.min(self.cols - 1);
            self.cursor.pending_wrap = saved.pending_wrap;
            self.pen = saved.pen;
        }
    }

    // ========== Erase ==========

    /// ED (CSI J): 0 = cursor to end, 1 = start to cursor, 2 = all,
    /// 3 = all + scrollback
    pub fn erase_in_display(&mut self, mode: u16) {
        match mode {
            0 => {
                self.erase_in_line(0);
                for row in (self.cursor.row + 1)..self.rows {
                    self.destroy_row(row);
                    self.touch_row(row);
                }
            }
            1 => {
                for row in 0..self.cursor.row {
                    self.destroy_row(row);
                    self.touch_row(row);
                }
                self.erase_in_line(1);
            }
            2 | 3 => {
                for row in 0..self.rows {
                    self.destroy_row(row);
                }
                if mode == 3 {
                    let (scrollback, graphemes) = (&mut self.scrollback, &mut self.graphemes);
                    scrollback.clear(graphemes);
                }
                self.touch_all();
            }
            _ => {}
        }
        self.cursor.pending_wrap = false;
    }

    /// EL (CSI K): 0 = cursor to end, 1 = start to cursor, 2 = whole line
    pub fn erase_in_line(&mut self, mode: u16) {
        let row = self.cursor.row;
        match mode {
            0 => {
                let start = self.cursor.col;
                // A spacer at the start means the pair's head also goes
                if self.active_grid().cell(row, start).width == 0 && start > 0 {
                    self.destroy_cell(row, start - 1);
                }
                for col in start..self.cols {
                    self.destroy_cell(row, col);
                }
            }
            1 => {
                let end = self.cursor.col.min(self.cols - 1);
                // A head at the end means the pair's spacer also goes
                if self.active_grid().cell(row, end).width == 2 && end + 1 < self.cols {
                    self.destroy_cell(row, end + 1);
                }
                for col in 0..=end {
                    self.destroy_cell(row, col);
                }
            }
            2 => {
                self.destroy_row(row);
            }
            _ => {}
        }
        self.touch_row(row);
        self.cursor.pending_wrap = false;
    }

    /// ECH (CSI X): blank n cells from the cursor, no shifting
    pub fn erase_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let n = n.min(self.cols - col);
        if n == 0 {
            return;
        }
        // Pair-safety at both edges of the erased span
        self.destroy_wide_pair(row, col);
        let last = col + n - 1;
        self.destroy_wide_pair(row, last);
        for c in col..col + n {
            self.destroy_cell(row, c);
        }
        self.touch_row(row);
        self.cursor.pending_wrap = false;
    }

    /// DCH (CSI P): delete n cells at the cursor, shifting the rest left
    pub fn delete_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let n = n.min(self.cols - col);
        if n == 0 {
            return;
        }

        // Deleting from inside a wide pair leaves a stranded half
        self.destroy_wide_pair(row, col);
        for c in col..col + n {
            self.destroy_cell(row, c);
        }

        let blank = self.blank_cell();
        let grid = self.active_grid_mut();
        let cells = grid.row_mut(row);
        cells.copy_within(col + n.., col);
        let cols = cells.len();
        cells[cols - n..].fill(blank);

        // A wide head shifted against the blanked tail loses its spacer
        if n < self.cols {
            let boundary = self.cols - n - 1;
            if self.active_grid().cell(row, boundary).width == 2 {
                self.destroy_cell(row, boundary);
            }
        }
        self.touch_row(row);
        self.cursor.pending_wrap = false;
    }

    /// ICH (CSI @): insert n blanks at the cursor, shifting the rest right
    pub fn insert_chars(&mut self, n: usize) {
        let n = n.min(self.cols - self.cursor.col);
        if n == 0 {
            return;
        }
        self.insert_blanks(n);
        self.cursor.pending_wrap = false;
    }

    fn insert_blanks(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let n = n.min(self.cols - col);
        if n == 0 {
            return;
        }

        // Inserting between a wide head and its spacer splits the pair;
        // anything else shifts right intact
        if self.active_grid().cell(row, col).width == 0 {
            self.destroy_wide_pair(row, col);
        }
        // Cells pushed off the right edge are gone
        for c in self.cols - n..self.cols {
            self.destroy_cell(row, c);
        }

        let blank = self.blank_cell();
        let grid = self.active_grid_mut();
        let cells = grid.row_mut(row);
        let cols = cells.len();
        cells.copy_within(col..cols - n, col + n);
        cells[col..col + n].fill(blank);

        // A wide head shifted into the last column has no room for a spacer
        if self.active_grid().cell(row, self.cols - 1).width == 2 {
            self.destroy_cell(row, self.cols - 1);
        }
        self.touch_row(row);
    }

    // ========== Scroll ==========

    /// Scroll the region up n rows. On the primary screen with a full
    /// region, rows leaving the top go to scrollback; alternate-screen
    /// scrolling never touches scrollback.
    pub fn scroll_up(&mut self, n: usize) {
        let top = self.scroll_top;
        let bottom = self.scroll_bottom;
        let height = bottom - top + 1;
        let n = n.min(height);
        if n == 0 {
            return;
        }

        let to_scrollback = self.active == ActiveScreen::Primary
            && top == 0
            && bottom == self.rows - 1;

        if to_scrollback {
            for r in top..top + n {
                let line = {
                    let grid = &self.primary;
                    ScrollbackLine {
                        cells: grid.row(r).to_vec(),
                        wrapped: grid.wrapped[r],
                    }
                };
                self.scrollback.push(line, &mut self.graphemes);
            }
        } else {
            // Rows leaving a sub-region (or the alternate screen) are
            // destroyed, not archived
            for r in top..top + n {
                self.free_row_graphemes(r);
            }
        }

        let blank = self.blank_cell();
        let grid = self.active_grid_mut();
        if n < height {
            for row in top..=bottom - n {
                grid.copy_row(row + n, row);
            }
        }
        for row in (bottom + 1 - n)..=bottom {
            grid.fill_row(row, blank);
        }
        for row in top..=bottom {
            self.touch_row(row);
        }
    }

    /// Scroll the region down n rows; blank rows enter from the top
    pub fn scroll_down(&mut self, n: usize) {
        let top = self.scroll_top;
        let bottom = self.scroll_bottom;
        let height = bottom - top + 1;
        let n = n.min(height);
        if n == 0 {
            return;
        }

        for r in (bottom + 1 - n)..=bottom {
            self.free_row_graphemes(r);
        }

        let blank = self.blank_cell();
        let grid = self.active_grid_mut();
        for row in ((top + n)..=bottom).rev() {
            grid.copy_row(row - n, row);
        }
        for row in top..top + n {
            grid.fill_row(row, blank);
        }
        for row in top..=bottom {
            self.touch_row(row);
        }
    }

    /// IL (CSI L): insert n blank lines at the cursor, inside the region
    pub fn insert_lines(&mut self, n: usize) {
        let bottom = self.scroll_bottom;
        if self.cursor.row < self.scroll_top || self.cursor.row > bottom {
            return;
        }
        let n = n.min(bottom - self.cursor.row + 1);
        if n == 0 {
            return;
        }

        for r in (bottom + 1 - n)..=bottom {
            self.free_row_graphemes(r);
        }

        let start = self.cursor.row;
        let blank = self.blank_cell();
        let grid = self.active_grid_mut();
        for row in ((start + n)..=bottom).rev() {
            grid.copy_row(row - n, row);
        }
        for row in start..start + n {
            grid.fill_row(row, blank);
        }
        for row in start..=bottom {
            self.touch_row(row);
        }
        self.cursor.pending_wrap = false;
    }

    /// DL (CSI M): delete n lines at the cursor, inside the region
    pub fn delete_lines(&mut self, n: usize) {
        let bottom = self.scroll_bottom;
        if self.cursor.row < self.scroll_top || self.cursor.row > bottom {
            return;
        }
        let n = n.min(bottom - self.cursor.row + 1);
        if n == 0 {
            return;
        }

        let start = self.cursor.row;
        for r in start..start + n {
            self.free_row_graphemes(r);
        }

        let blank = self.blank_cell();
        let grid = self.active_grid_mut();
        if start + n <= bottom {
            for row in start..=bottom - n {
                grid.copy_row(row + n, row);
            }
        }
        for row in (bottom + 1 - n)..=bottom {
            grid.fill_row(row, blank);
        }
        for row in start..=bottom {
            self.touch_row(row);
        }
        self.cursor.pending_wrap = false;
    }

    /// DECSTBM (CSI r): set scroll region, 1-indexed, 0 = default edge
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let top = if top == 0 { 1 } else { top };
        let bottom = if bottom == 0 { self.rows } else { bottom };
        let top = (top - 1).min(self.rows - 1);
        let bottom = (bottom - 1).min(self.rows - 1);
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        }
        self.cursor_position(1, 1);
    }

    // ========== SGR state ==========

    pub fn reset_attrs(&mut self) {
        self.pen = Pen::default();
    }

    pub fn set_fg(&mut self, color: Color) {
        self.pen.fg = color;
    }

    pub fn set_bg(&mut self, color: Color) {
        self.pen.bg = color;
    }

    pub fn set_flag(&mut self, flag: CellFlags) {
        self.pen.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: CellFlags) {
        self.pen.flags.remove(flag);
    }

    // ========== Hyperlinks (OSC 8) ==========

    /// Start or end the active hyperlink; `None`/empty URI ends it
    pub fn set_hyperlink(&mut self, uri: Option<&str>) {
        self.current_hyperlink = match uri {
            Some(url) if !url.is_empty() => self.hyperlinks.intern(url),
            _ => 0,
        };
    }

    // ========== Modes ==========

    /// DECSET/DECRST: record in the registry and apply side effects for the
    /// modes the screen acts on
    pub fn set_dec_mode(&mut self, number: u16, enabled: bool) {
        match number {
            modes::ALT_SCREEN | modes::ALT_SCREEN_1047 => {
                if enabled {
                    self.enter_alternate_screen(false, false);
                } else {
                    self.leave_alternate_screen(false);
                }
            }
            modes::SAVE_CURSOR_1048 => {
                if enabled {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            modes::ALT_SCREEN_SAVE => {
                if enabled {
                    self.enter_alternate_screen(true, true);
                } else {
                    self.leave_alternate_screen(true);
                }
            }
            _ => {}
        }
        self.modes.set(ModeNamespace::DecPrivate, number, enabled);
    }

    /// SM/RM without the private marker
    pub fn set_ansi_mode(&mut self, number: u16, enabled: bool) {
        self.modes.set(ModeNamespace::Ansi, number, enabled);
    }

    /// Switch to the alternate grid. A second enter while already active is
    /// a no-op; the primary grid is kept intact for the eventual return.
    fn enter_alternate_screen(&mut self, save_cursor: bool, clear: bool) {
        if self.active == ActiveScreen::Alternate {
            return;
        }
        if save_cursor {
            self.save_cursor();
        }
        self.active = ActiveScreen::Alternate;
        if clear {
            for row in 0..self.rows {
                self.destroy_row(row);
            }
            self.cursor_position(1, 1);
        }
        self.cursor.pending_wrap = false;
        self.touch_all();
    }

    /// Return to the primary grid, restoring its exact prior contents
    fn leave_alternate_screen(&mut self, restore_cursor: bool) {
        if self.active == ActiveScreen::Primary {
            return;
        }
        self.active = ActiveScreen::Primary;
        if restore_cursor {
            self.restore_cursor();
        }
        self.cursor.pending_wrap = false;
        self.touch_all();
    }

    // ========== Reset / resize ==========

    /// RIS: full reset. Both grids, scrollback, modes, pen, cursor.
    pub fn reset(&mut self) {
        let blank = Cell::blank(self.default_fg, self.default_bg);
        self.graphemes.clear();
        self.primary = Grid::new(self.cols, self.rows, blank);
        self.alternate = Grid::new(self.cols, self.rows, blank);
        self.active = ActiveScreen::Primary;
        self.scrollback.clear(&mut self.graphemes);
        self.cursor = Cursor {
            col: 0,
            row: 0,
            pending_wrap: false,
        };
        self.saved_cursor = None;
        self.pen = Pen::default();
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        self.last_char = None;
        self.title = None;
        self.modes.reset();
        self.hyperlinks.clear();
        self.current_hyperlink = 0;
        self.touch_all();
    }

    /// Resize both grids, top-left anchored. Content outside the new
    /// bounds is truncated, not reflowed and not archived to scrollback.
    pub fn resize(&mut self, new_cols: usize, new_rows: usize) {
        if new_cols == self.cols && new_rows == self.rows {
            return;
        }
        let blank = Cell::blank(self.default_fg, self.default_bg);

        for key in self.primary.resize(new_cols, new_rows, blank) {
            self.graphemes.free(key);
        }
        for key in self.alternate.resize(new_cols, new_rows, blank) {
            self.graphemes.free(key);
        }

        self.cols = new_cols;
        self.rows = new_rows;
        self.cursor.row = self.cursor.row.min(new_rows - 1);
        self.cursor.col = self.cursor.col.min(new_cols - 1);
        self.cursor.pending_wrap = false;
        self.scroll_top = 0;
        self.scroll_bottom = new_rows - 1;
        self.row_versions.resize(new_rows, 0);
        self.touch_all();
    }
}

fn resolve_config_color(packed: u32, default: Rgb) -> Rgb {
    if packed == 0 {
        default
    } else {
        Rgb::from_u32(packed)
    }
}
