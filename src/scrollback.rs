//! Scrollback history store
//!
//! Rows scrolled off the top of the primary screen, oldest at the front.
//! Appends evict from the front once the configured limit is reached; trim
//! removes from the front only. Offsets are stable only between mutations.

use std::collections::VecDeque;

use crate::cell::{Cell, GraphemeTable};

/// One historical row plus its soft-wrap continuation flag
#[derive(Debug, Clone)]
pub struct ScrollbackLine {
    pub cells: Vec<Cell>,
    /// True when this row continued the previous row (no hard newline)
    pub wrapped: bool,
}

#[derive(Debug)]
pub struct Scrollback {
    lines: VecDeque<ScrollbackLine>,
    /// Maximum retained lines (0 = unbounded)
    limit: usize,
}

impl Scrollback {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            limit,
        }
    }

    /// Append a row, evicting the oldest when at capacity.
    /// Grapheme entries owned by evicted cells are released.
    pub fn push(&mut self, line: ScrollbackLine, graphemes: &mut GraphemeTable) {
        self.lines.push_back(line);
        if self.limit != 0 {
            while self.lines.len() > self.limit {
                if let Some(old) = self.lines.pop_front() {
                    for cell in &old.cells {
                        graphemes.free_cell(cell);
                    }
                }
            }
        }
    }

    /// Remove up to `n` oldest rows; clamped to the current length
    pub fn trim(&mut self, n: usize, graphemes: &mut GraphemeTable) {
        let n = n.min(self.lines.len());
        for _ in 0..n {
            if let Some(old) = self.lines.pop_front() {
                for cell in &old.cells {
                    graphemes.free_cell(cell);
                }
            }
        }
    }

    /// Get a line by offset (0 = oldest retained)
    pub fn line(&self, offset: usize) -> Option<&ScrollbackLine> {
        self.lines.get(offset)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop all history
    pub fn clear(&mut self, graphemes: &mut GraphemeTable) {
        for line in &self.lines {
            for cell in &line.cells {
                graphemes.free_cell(cell);
            }
        }
        self.lines.clear();
    }
}
