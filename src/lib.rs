//! gridterm: an embeddable terminal emulation engine.
//!
//! Feed it the byte stream of a child process with [`Terminal::write`],
//! poll [`Terminal::update`] once per frame, and read the screen through
//! the bulk accessors. The engine interprets escape sequences and keeps
//! screen, scrollback, and Kitty graphics state; it does no I/O of its own.
//! Bytes the terminal wants to send back (status reports, graphics
//! acknowledgements) queue up in [`Terminal::read_responses`].
//!
//! ```
//! use gridterm::{Terminal, RenderCell};
//!
//! let mut term = Terminal::new(80, 24).unwrap();
//! term.write(b"Hello \x1b[1;32mworld\x1b[0m");
//! let mut cells = vec![RenderCell::default(); 80 * 24];
//! term.viewport(&mut cells).unwrap();
//! assert_eq!(cells[0].codepoint, 'H' as u32);
//! ```

pub mod cell;
pub mod color;
pub mod config;
pub mod error;
pub mod kitty;
pub mod modes;
mod parser;
pub mod render;
pub mod response;
pub mod screen;
pub mod scrollback;

pub use cell::{Cell, CellFlags, RenderCell};
pub use color::{Color, Rgb};
pub use config::Config;
pub use error::Error;
pub use kitty::{Image, Placement};
pub use modes::ModeNamespace;
pub use render::Dirty;
pub use screen::Cursor;

use kitty::Graphics;
use parser::Parser;
use render::RenderState;
use response::ResponseQueue;
use screen::Screen;

/// The complete state of one emulated terminal
#[derive(Debug)]
pub struct Terminal {
    screen: Screen,
    parser: Parser,
    graphics: Graphics,
    render: RenderState,
    responses: ResponseQueue,
    /// Cell size in pixels, for sizing graphics placements
    cell_width: u32,
    cell_height: u32,
}

impl Terminal {
    pub fn new(cols: usize, rows: usize) -> Result<Self, Error> {
        Self::with_config(cols, rows, &Config::default())
    }

    pub fn with_config(cols: usize, rows: usize, config: &Config) -> Result<Self, Error> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidDimensions);
        }
        Ok(Self {
            screen: Screen::new(cols, rows, config),
            parser: Parser::new(),
            graphics: Graphics::new(),
            render: RenderState::new(rows),
            responses: ResponseQueue::new(),
            cell_width: 0,
            cell_height: 0,
        })
    }

    // ========== Input ==========

    /// Interpret a chunk of child-process output. Sequences may be split
    /// at any byte boundary across calls.
    pub fn write(&mut self, bytes: &[u8]) {
        self.parser.feed(
            bytes,
            &mut self.screen,
            &mut self.graphics,
            &mut self.responses,
            self.cell_width,
            self.cell_height,
        );
    }

    /// Resize the grid; content is truncated or padded at the bottom/right
    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<(), Error> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidDimensions);
        }
        self.screen.resize(cols, rows);
        Ok(())
    }

    /// Pixel dimensions of the terminal, used to size graphics placements
    /// when the client gives no explicit cell span
    pub fn set_pixel_size(&mut self, width_px: u32, height_px: u32) {
        self.cell_width = width_px / self.screen.cols() as u32;
        self.cell_height = height_px / self.screen.rows() as u32;
    }

    /// Full reset, as if by RIS
    pub fn reset(&mut self) {
        self.screen.reset();
        self.graphics.reset();
    }

    // ========== Geometry and cursor ==========

    pub fn cols(&self) -> usize {
        self.screen.cols()
    }

    pub fn rows(&self) -> usize {
        self.screen.rows()
    }

    /// Cursor position as (col, row), 0-indexed
    pub fn cursor(&self) -> (usize, usize) {
        (self.screen.cursor.col, self.screen.cursor.row)
    }

    pub fn cursor_visible(&self) -> bool {
        self.screen.cursor_visible()
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.screen.is_alternate_screen()
    }

    /// Configured (foreground, background) defaults, resolved to RGB
    pub fn default_colors(&self) -> (Rgb, Rgb) {
        (self.screen.default_fg(), self.screen.default_bg())
    }

    pub fn cursor_color(&self) -> Rgb {
        self.screen.cursor_color()
    }

    pub fn title(&self) -> Option<&str> {
        self.screen.title()
    }

    // ========== Modes ==========

    /// DEC private mode state (DECSET/DECRST); unknown modes read false
    pub fn dec_mode(&self, number: u16) -> bool {
        self.screen.modes.get(ModeNamespace::DecPrivate, number)
    }

    /// ANSI mode state (SM/RM)
    pub fn ansi_mode(&self, number: u16) -> bool {
        self.screen.modes.get(ModeNamespace::Ansi, number)
    }

    pub fn mouse_tracking(&self) -> bool {
        self.screen.modes.mouse_tracking()
    }

    pub fn bracketed_paste(&self) -> bool {
        self.dec_mode(modes::BRACKETED_PASTE)
    }

    pub fn kitty_keyboard_flags(&self) -> u8 {
        self.screen.modes.kitty_keyboard_flags()
    }

    // ========== Render snapshot ==========

    /// How much changed since the last [`mark_clean`](Self::mark_clean)
    pub fn update(&self) -> Dirty {
        self.render.update(&self.screen, self.graphics.is_dirty())
    }

    /// Acknowledge the current state as rendered
    pub fn mark_clean(&mut self) {
        self.render.mark_clean(&self.screen);
        self.graphics.clear_dirty();
    }

    pub fn row_dirty(&self, row: usize) -> bool {
        self.render.row_dirty(&self.screen, row)
    }

    /// Copy the whole viewport into `out`, row-major.
    /// Needs at least rows x cols cells.
    pub fn viewport(&self, out: &mut [RenderCell]) -> Result<usize, Error> {
        render::viewport(&self.screen, out)
    }

    pub fn viewport_row(&self, row: usize, out: &mut [RenderCell]) -> Result<usize, Error> {
        render::viewport_row(&self.screen, row, out)
    }

    /// True when viewport row `row` continues the previous row without a
    /// hard newline
    pub fn row_wrapped(&self, row: usize) -> bool {
        self.screen.is_row_wrapped(row)
    }

    /// Full codepoint sequence of the grapheme at (row, col)
    pub fn grapheme(&self, row: usize, col: usize, out: &mut [u32]) -> Result<usize, Error> {
        render::grapheme(&self.screen, row, col, out)
    }

    /// Full codepoint sequence of the grapheme at scrollback line `offset`,
    /// column `col`
    pub fn scrollback_grapheme(
        &self,
        offset: usize,
        col: usize,
        out: &mut [u32],
    ) -> Result<usize, Error> {
        render::scrollback_grapheme(&self.screen, offset, col, out)
    }

    pub fn hyperlink_url(&self, id: u16) -> Option<&str> {
        self.screen.hyperlink_url(id)
    }

    // ========== Scrollback ==========

    pub fn scrollback_len(&self) -> usize {
        self.screen.scrollback.len()
    }

    /// Copy scrollback line `offset` (0 = oldest retained) into `out`
    pub fn scrollback_line(&self, offset: usize, out: &mut [RenderCell]) -> Result<usize, Error> {
        render::scrollback_line(&self.screen, offset, out)
    }

    /// Whether scrollback line `offset` soft-wrapped from its predecessor
    pub fn scrollback_wrapped(&self, offset: usize) -> Result<bool, Error> {
        self.screen
            .scrollback
            .line(offset)
            .map(|line| line.wrapped)
            .ok_or(Error::OutOfRange)
    }

    /// Drop up to `n` oldest scrollback lines
    pub fn trim_scrollback(&mut self, n: usize) {
        let screen = &mut self.screen;
        screen.scrollback.trim(n, &mut screen.graphemes);
    }

    // ========== Graphics ==========

    /// True when images or placements changed since the last
    /// [`mark_clean`](Self::mark_clean)
    pub fn images_dirty(&self) -> bool {
        self.graphics.is_dirty()
    }

    /// Acknowledge graphics changes alone, leaving row dirt untouched
    pub fn clear_images_dirty(&mut self) {
        self.graphics.clear_dirty();
    }

    pub fn image_count(&self) -> usize {
        self.graphics.image_count()
    }

    pub fn image_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.graphics.image_ids()
    }

    pub fn image(&self, id: u32) -> Option<&Image> {
        self.graphics.image(id)
    }

    pub fn placement_count(&self) -> usize {
        self.graphics.placement_count()
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.graphics.placements()
    }

    // ========== Responses ==========

    pub fn has_responses(&self) -> bool {
        self.responses.has_pending()
    }

    /// Drain queued terminal-to-process bytes into `out`, FIFO
    pub fn read_responses(&mut self, out: &mut [u8]) -> usize {
        self.responses.read(out)
    }
}
