//! Escape sequence parsing and dispatch
//!
//! Bytes flow through a small APC interception layer into a `vte` state
//! machine. The interception layer exists because `vte` swallows APC
//! payloads, and Kitty graphics commands arrive as APC. It is persistent
//! state, so sequences split across `feed` calls behave exactly like
//! single-call input.
//!
//! Malformed sequences never fail; unrecognized ones are logged at debug
//! level and dropped.

use log::debug;
use vte::{Params, Perform};

use crate::cell::CellFlags;
use crate::color::{Color, Rgb};
use crate::kitty::Graphics;
use crate::response::ResponseQueue;
use crate::screen::Screen;

/// Bound on one buffered APC payload. Well-behaved clients chunk graphics
/// data into 4 KB pieces; this only stops hostile unterminated streams.
const MAX_APC_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApcState {
    /// Bytes go to vte
    Ground,
    /// Saw ESC, deciding whether an APC starts
    Escape,
    /// Inside `ESC _`, buffering the payload
    Collect,
    /// Saw ESC inside the payload, looking for the closing backslash
    CollectEscape,
}

pub struct Parser {
    vte: vte::Parser,
    apc: ApcState,
    apc_buffer: Vec<u8>,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            vte: vte::Parser::new(),
            apc: ApcState::Ground,
            apc_buffer: Vec::new(),
        }
    }

    /// Process a chunk of output from the child process
    pub fn feed(
        &mut self,
        bytes: &[u8],
        screen: &mut Screen,
        graphics: &mut Graphics,
        responses: &mut ResponseQueue,
        cell_w: u32,
        cell_h: u32,
    ) {
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match self.apc {
                ApcState::Ground => {
                    if b == 0x1b {
                        self.apc = ApcState::Escape;
                        i += 1;
                    } else {
                        // Batch the run up to the next ESC through vte
                        let end = bytes[i..]
                            .iter()
                            .position(|&x| x == 0x1b)
                            .map(|p| i + p)
                            .unwrap_or(bytes.len());
                        let mut performer = Performer {
                            screen: &mut *screen,
                            responses: &mut *responses,
                        };
                        for &byte in &bytes[i..end] {
                            self.vte.advance(&mut performer, byte);
                        }
                        i = end;
                    }
                }
                ApcState::Escape => {
                    if b == b'_' {
                        self.apc_buffer.clear();
                        self.apc = ApcState::Collect;
                    } else {
                        // Not an APC: replay the held ESC into vte
                        let mut performer = Performer {
                            screen: &mut *screen,
                            responses: &mut *responses,
                        };
                        self.vte.advance(&mut performer, 0x1b);
                        if b != 0x1b {
                            self.vte.advance(&mut performer, b);
                            self.apc = ApcState::Ground;
                        }
                    }
                    i += 1;
                }
                ApcState::Collect => {
                    if b == 0x1b {
                        self.apc = ApcState::CollectEscape;
                    } else if self.apc_buffer.len() < MAX_APC_SIZE {
                        self.apc_buffer.push(b);
                    }
                    i += 1;
                }
                ApcState::CollectEscape => {
                    if b == b'\\' {
                        self.apc = ApcState::Ground;
                        self.dispatch_apc(screen, graphics, responses, cell_w, cell_h);
                    } else if b == 0x1b {
                        if self.apc_buffer.len() < MAX_APC_SIZE {
                            self.apc_buffer.push(0x1b);
                        }
                        // The new ESC becomes the pending terminator candidate
                    } else {
                        if self.apc_buffer.len() + 2 <= MAX_APC_SIZE {
                            self.apc_buffer.push(0x1b);
                            self.apc_buffer.push(b);
                        }
                        self.apc = ApcState::Collect;
                    }
                    i += 1;
                }
            }
        }
    }

    fn dispatch_apc(
        &mut self,
        screen: &mut Screen,
        graphics: &mut Graphics,
        responses: &mut ResponseQueue,
        cell_w: u32,
        cell_h: u32,
    ) {
        match self.apc_buffer.first() {
            Some(b'G') => {
                graphics.accept_command(&self.apc_buffer[1..], screen, responses, cell_w, cell_h);
            }
            Some(kind) => debug!("unhandled APC kind {:?}", *kind as char),
            None => {}
        }
        self.apc_buffer.clear();
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// The vte state machine has no Debug of its own
impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("apc", &self.apc)
            .field("apc_buffered", &self.apc_buffer.len())
            .finish_non_exhaustive()
    }
}

struct Performer<'a> {
    screen: &'a mut Screen,
    responses: &'a mut ResponseQueue,
}

/// First subparam of param `idx`, with 0 treated as `default`
fn param_or(params: &Params, idx: usize, default: u16) -> u16 {
    params
        .iter()
        .nth(idx)
        .and_then(|p| p.first())
        .copied()
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

/// First subparam of param `idx`, 0 allowed
fn param_raw(params: &Params, idx: usize) -> u16 {
    params
        .iter()
        .nth(idx)
        .and_then(|p| p.first())
        .copied()
        .unwrap_or(0)
}

impl Performer<'_> {
    fn handle_sgr(&mut self, params: &Params) {
        if params.is_empty() {
            self.screen.reset_attrs();
            return;
        }

        let groups: Vec<&[u16]> = params.iter().collect();
        let mut i = 0;
        while i < groups.len() {
            let group = groups[i];
            let code = group.first().copied().unwrap_or(0);
            match code {
                0 => self.screen.reset_attrs(),
                1 => self.screen.set_flag(CellFlags::BOLD),
                2 => self.screen.set_flag(CellFlags::FAINT),
                3 => self.screen.set_flag(CellFlags::ITALIC),
                4 => self.screen.set_flag(CellFlags::UNDERLINE),
                5 | 6 => self.screen.set_flag(CellFlags::BLINK),
                7 => self.screen.set_flag(CellFlags::INVERSE),
                8 => self.screen.set_flag(CellFlags::INVISIBLE),
                9 => self.screen.set_flag(CellFlags::STRIKETHROUGH),
                21 => self.screen.set_flag(CellFlags::UNDERLINE),
                22 => {
                    self.screen.clear_flag(CellFlags::BOLD);
                    self.screen.clear_flag(CellFlags::FAINT);
                }
                23 => self.screen.clear_flag(CellFlags::ITALIC),
                24 => self.screen.clear_flag(CellFlags::UNDERLINE),
                25 => self.screen.clear_flag(CellFlags::BLINK),
                27 => self.screen.clear_flag(CellFlags::INVERSE),
                28 => self.screen.clear_flag(CellFlags::INVISIBLE),
                29 => self.screen.clear_flag(CellFlags::STRIKETHROUGH),
                30..=37 => self.screen.set_fg(Color::Indexed((code - 30) as u8)),
                38 => {
                    if let Some((color, consumed)) = parse_extended_color(&groups, i) {
                        self.screen.set_fg(color);
                        i += consumed;
                    }
                }
                39 => self.screen.set_fg(Color::Default),
                40..=47 => self.screen.set_bg(Color::Indexed((code - 40) as u8)),
                48 => {
                    if let Some((color, consumed)) = parse_extended_color(&groups, i) {
                        self.screen.set_bg(color);
                        i += consumed;
                    }
                }
                49 => self.screen.set_bg(Color::Default),
                90..=97 => self.screen.set_fg(Color::Indexed((code - 90 + 8) as u8)),
                100..=107 => self.screen.set_bg(Color::Indexed((code - 100 + 8) as u8)),
                _ => debug!("unhandled SGR {code}"),
            }
            i += 1;
        }
    }

    fn handle_dec_modes(&mut self, params: &Params, enabled: bool) {
        for group in params.iter() {
            if let Some(&number) = group.first() {
                self.screen.set_dec_mode(number, enabled);
            }
        }
    }

    fn handle_ansi_modes(&mut self, params: &Params, enabled: bool) {
        for group in params.iter() {
            if let Some(&number) = group.first() {
                self.screen.set_ansi_mode(number, enabled);
            }
        }
    }

    fn device_status_report(&mut self, params: &Params) {
        match param_raw(params, 0) {
            5 => self.responses.push_str("\x1b[0n"),
            6 => {
                let report = format!(
                    "\x1b[{};{}R",
                    self.screen.cursor.row + 1,
                    self.screen.cursor.col + 1
                );
                self.responses.push_str(&report);
            }
            other => debug!("unhandled DSR {other}"),
        }
    }

    /// OSC 10/11/12 color queries answer in X11 rgb:RRRR/GGGG/BBBB form
    fn respond_color_query(&mut self, code: u16, color: Rgb) {
        let scale = |v: u8| u16::from(v) * 257;
        let report = format!(
            "\x1b]{};rgb:{:04x}/{:04x}/{:04x}\x1b\\",
            code,
            scale(color.r),
            scale(color.g),
            scale(color.b)
        );
        self.responses.push_str(&report);
    }
}

/// SGR 38/48 extended color, both colon and semicolon forms.
/// Returns the color and how many extra semicolon groups were consumed.
fn parse_extended_color(groups: &[&[u16]], i: usize) -> Option<(Color, usize)> {
    let group = groups[i];
    if group.len() > 1 {
        // Colon form: one group carries everything
        match group[1] {
            5 => {
                let idx = *group.get(2)?;
                Some((Color::Indexed(idx as u8), 0))
            }
            2 => {
                // 38:2:r:g:b or 38:2:<colorspace>:r:g:b
                let (r, g, b) = match group.len() {
                    5 => (group[2], group[3], group[4]),
                    n if n >= 6 => (group[3], group[4], group[5]),
                    _ => return None,
                };
                Some((Color::Rgb(Rgb::new(r as u8, g as u8, b as u8)), 0))
            }
            _ => None,
        }
    } else {
        // Semicolon form: the mode and components are separate groups
        match groups.get(i + 1)?.first()? {
            5 => {
                let idx = *groups.get(i + 2)?.first()?;
                Some((Color::Indexed(idx as u8), 2))
            }
            2 => {
                let r = *groups.get(i + 2)?.first()?;
                let g = *groups.get(i + 3)?.first()?;
                let b = *groups.get(i + 4)?.first()?;
                Some((Color::Rgb(Rgb::new(r as u8, g as u8, b as u8)), 4))
            }
            _ => None,
        }
    }
}

impl Perform for Performer<'_> {
    fn print(&mut self, c: char) {
        self.screen.put_char(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x08 => self.screen.backspace(),
            0x09 => self.screen.tab(),
            0x0a | 0x0b | 0x0c => self.screen.linefeed(),
            0x0d => self.screen.carriage_return(),
            0x07 => {} // BEL
            _ => debug!("unhandled control byte {byte:#04x}"),
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, action: char) {
        match (action, intermediates) {
            ('A', []) => self.screen.cursor_up(param_or(params, 0, 1) as usize),
            ('B', []) | ('e', []) => self.screen.cursor_down(param_or(params, 0, 1) as usize),
            ('C', []) | ('a', []) => self.screen.cursor_forward(param_or(params, 0, 1) as usize),
            ('D', []) => self.screen.cursor_backward(param_or(params, 0, 1) as usize),
            ('E', []) => {
                self.screen.cursor_down(param_or(params, 0, 1) as usize);
                self.screen.carriage_return();
            }
            ('F', []) => {
                self.screen.cursor_up(param_or(params, 0, 1) as usize);
                self.screen.carriage_return();
            }
            ('G', []) | ('`', []) => {
                let row = self.screen.cursor.row + 1;
                let col = param_or(params, 0, 1) as usize;
                self.screen.cursor_position(row, col);
            }
            ('d', []) => {
                let row = param_or(params, 0, 1) as usize;
                let col = self.screen.cursor.col + 1;
                self.screen.cursor_position(row, col);
            }
            ('H', []) | ('f', []) => {
                let row = param_or(params, 0, 1) as usize;
                let col = param_or(params, 1, 1) as usize;
                self.screen.cursor_position(row, col);
            }
            ('J', []) => self.screen.erase_in_display(param_raw(params, 0)),
            ('K', []) => self.screen.erase_in_line(param_raw(params, 0)),
            ('L', []) => self.screen.insert_lines(param_or(params, 0, 1) as usize),
            ('M', []) => self.screen.delete_lines(param_or(params, 0, 1) as usize),
            ('P', []) => self.screen.delete_chars(param_or(params, 0, 1) as usize),
            ('X', []) => self.screen.erase_chars(param_or(params, 0, 1) as usize),
            ('@', []) => self.screen.insert_chars(param_or(params, 0, 1) as usize),
            ('S', []) => self.screen.scroll_up(param_or(params, 0, 1) as usize),
            ('T', []) => self.screen.scroll_down(param_or(params, 0, 1) as usize),
            ('b', []) => self.screen.repeat_char(param_or(params, 0, 1) as usize),
            ('r', []) => {
                let top = param_raw(params, 0) as usize;
                let bottom = param_raw(params, 1) as usize;
                self.screen.set_scroll_region(top, bottom);
            }
            ('m', []) => self.handle_sgr(params),
            ('m', [b'>']) => {} // XTMODKEYS
            ('h', []) => self.handle_ansi_modes(params, true),
            ('l', []) => self.handle_ansi_modes(params, false),
            ('h', [b'?']) => self.handle_dec_modes(params, true),
            ('l', [b'?']) => self.handle_dec_modes(params, false),
            ('n', []) => self.device_status_report(params),
            ('c', []) | ('c', [b'?']) => {
                // DA1: VT220 with sixel-free feature set plus color
                self.responses.push_str("\x1b[?62;22c");
            }
            ('c', [b'>']) => {
                // DA2: VT220-class, firmware version 10
                self.responses.push_str("\x1b[>1;10;0c");
            }
            ('s', []) => self.screen.save_cursor(),
            ('u', []) => self.screen.restore_cursor(),
            ('u', [b'>']) => {
                let flags = param_raw(params, 0) as u8;
                self.screen.modes.kitty_keyboard_push(flags);
            }
            ('u', [b'<']) => {
                let n = param_or(params, 0, 1) as usize;
                self.screen.modes.kitty_keyboard_pop(n);
            }
            ('u', [b'=']) => {
                let flags = param_raw(params, 0) as u8;
                let mode = param_or(params, 1, 1);
                self.screen.modes.kitty_keyboard_set(flags, mode);
            }
            ('u', [b'?']) => {
                let flags = self.screen.modes.kitty_keyboard_flags();
                self.responses.push_str(&format!("\x1b[?{flags}u"));
            }
            ('t', _) => debug!("ignoring window manipulation"),
            _ => debug!(
                "unhandled CSI action {action:?} intermediates {intermediates:?}"
            ),
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        match (byte, intermediates) {
            (b'7', []) => self.screen.save_cursor(),
            (b'8', []) => self.screen.restore_cursor(),
            (b'D', []) => self.screen.index(),
            (b'E', []) => {
                self.screen.carriage_return();
                self.screen.index();
            }
            (b'M', []) => self.screen.reverse_index(),
            (b'c', []) => self.screen.reset(),
            // Charset designation, keyboard modes
            (_, [b'(']) | (_, [b')']) | (b'=', []) | (b'>', []) => {}
            _ => debug!("unhandled ESC {byte:?} intermediates {intermediates:?}"),
        }
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        let Some(&code) = params.first() else {
            return;
        };
        match code {
            b"0" | b"2" => {
                if let Some(title) = params.get(1) {
                    if let Ok(title) = std::str::from_utf8(title) {
                        self.screen.set_title(title);
                    }
                }
            }
            b"8" => {
                // OSC 8 ; params ; uri
                let uri = params
                    .get(2)
                    .and_then(|u| std::str::from_utf8(u).ok())
                    .unwrap_or("");
                self.screen.set_hyperlink(Some(uri));
            }
            b"10" | b"11" | b"12" => {
                if params.get(1).map(|p| *p == b"?").unwrap_or(false) {
                    let (code, color) = match code {
                        b"10" => (10, self.screen.default_fg()),
                        b"11" => (11, self.screen.default_bg()),
                        _ => (12, self.screen.cursor_color()),
                    };
                    self.respond_color_query(code, color);
                }
            }
            _ => debug!("unhandled OSC {:?}", String::from_utf8_lossy(code)),
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, action: char) {
        debug!("ignoring DCS {action:?}");
    }

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::modes::{self, ModeNamespace};

    struct Fixture {
        parser: Parser,
        screen: Screen,
        graphics: Graphics,
        responses: ResponseQueue,
    }

    impl Fixture {
        fn new(cols: usize, rows: usize) -> Self {
            Self {
                parser: Parser::new(),
                screen: Screen::new(cols, rows, &Config::default()),
                graphics: Graphics::new(),
                responses: ResponseQueue::new(),
            }
        }

        fn feed(&mut self, bytes: &[u8]) {
            self.parser.feed(
                bytes,
                &mut self.screen,
                &mut self.graphics,
                &mut self.responses,
                8,
                16,
            );
        }

        fn drain(&mut self) -> String {
            let mut buf = vec![0u8; self.responses.len()];
            self.responses.read(&mut buf);
            String::from_utf8(buf).unwrap()
        }
    }

    #[test]
    fn print_and_cursor_movement() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"hi\x1b[2;3Hx");
        assert_eq!(f.screen.cell(0, 0).codepoint, 'h' as u32);
        assert_eq!(f.screen.cell(1, 2).codepoint, 'x' as u32);
    }

    #[test]
    fn sgr_indexed_and_truecolor() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[31ma\x1b[38;5;10mb\x1b[38;2;1;2;3mc\x1b[0md");
        assert_eq!(f.screen.cell(0, 0).fg, Rgb::new(205, 0, 0));
        assert_eq!(f.screen.cell(0, 1).fg, Rgb::new(0, 255, 0));
        assert_eq!(f.screen.cell(0, 2).fg, Rgb::new(1, 2, 3));
        assert_eq!(f.screen.cell(0, 3).fg, f.screen.default_fg());
    }

    #[test]
    fn sgr_colon_subparams() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[38:2:9:8:7ma");
        assert_eq!(f.screen.cell(0, 0).fg, Rgb::new(9, 8, 7));
    }

    #[test]
    fn sgr_flags_accumulate() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[1;4ma\x1b[22mb");
        assert_eq!(
            f.screen.cell(0, 0).flags,
            CellFlags::BOLD | CellFlags::UNDERLINE
        );
        assert_eq!(f.screen.cell(0, 1).flags, CellFlags::UNDERLINE);
    }

    #[test]
    fn dsr_cursor_position_report() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[3;4H\x1b[6n");
        assert_eq!(f.drain(), "\x1b[3;4R");
    }

    #[test]
    fn decset_roundtrips_through_registry() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[?2004h");
        assert!(f
            .screen
            .modes
            .get(ModeNamespace::DecPrivate, modes::BRACKETED_PASTE));
        f.feed(b"\x1b[?2004l");
        assert!(!f
            .screen
            .modes
            .get(ModeNamespace::DecPrivate, modes::BRACKETED_PASTE));
    }

    #[test]
    fn recorded_modes_round_trip() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[?1h\x1b[?6h\x1b[?1000;1006h");
        assert!(f.screen.modes.get(ModeNamespace::DecPrivate, modes::DECCKM));
        assert!(f.screen.modes.get(ModeNamespace::DecPrivate, modes::DECOM));
        assert!(f.screen.modes.get(ModeNamespace::DecPrivate, modes::MOUSE_SGR));
        assert!(f.screen.modes.mouse_tracking());
        f.feed(b"\x1b[?1;6;1000;1006l");
        assert!(!f.screen.modes.get(ModeNamespace::DecPrivate, modes::DECCKM));
        assert!(!f.screen.modes.get(ModeNamespace::DecPrivate, modes::DECOM));
        assert!(!f.screen.modes.mouse_tracking());
    }

    #[test]
    fn alt_screen_via_1049() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"main\x1b[?1049halt\x1b[?1049l");
        assert!(!f.screen.is_alternate_screen());
        assert_eq!(f.screen.cell(0, 0).codepoint, 'm' as u32);
    }

    #[test]
    fn osc_title_and_hyperlink() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b]2;my title\x07");
        assert_eq!(f.screen.title(), Some("my title"));

        f.feed(b"\x1b]8;;https://example.com\x1b\\x\x1b]8;;\x1b\\");
        let id = f.screen.cell(0, 0).hyperlink;
        assert_eq!(f.screen.hyperlink_url(id), Some("https://example.com"));
    }

    #[test]
    fn osc_color_query() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b]10;?\x1b\\");
        assert_eq!(f.drain(), "\x1b]10;rgb:e5e5/e5e5/e5e5\x1b\\");
    }

    #[test]
    fn kitty_keyboard_stack_via_csi_u() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[>5u\x1b[?u");
        assert_eq!(f.drain(), "\x1b[?5u");
        f.feed(b"\x1b[<u\x1b[?u");
        assert_eq!(f.drain(), "\x1b[?0u");
    }

    #[test]
    fn apc_graphics_command_is_intercepted() {
        let mut f = Fixture::new(20, 5);
        // 1x1 RGB pixel, base64 "AAAA" decodes to 3 bytes
        f.feed(b"\x1b_Ga=t,f=24,i=1,s=1,v=1;AAAA\x1b\\after");
        assert_eq!(f.graphics.image_count(), 1);
        // Printing resumed after the terminator
        assert_eq!(f.screen.cell(0, 0).codepoint, 'a' as u32);
        assert_eq!(f.drain(), "\x1b_Gi=1;OK\x1b\\");
    }

    #[test]
    fn apc_split_across_feeds() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b");
        f.feed(b"_Ga=t,f=24,i=2,s=1,v=1;AA");
        f.feed(b"AA\x1b");
        f.feed(b"\\ok");
        assert_eq!(f.graphics.image_count(), 1);
        assert_eq!(f.screen.cell(0, 0).codepoint, 'o' as u32);
    }

    #[test]
    fn esc_sequences_still_work_after_apc_layer() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"a\x1b7b\x1b8c");
        // DECRC restored the position saved after 'a'
        assert_eq!(f.screen.cell(0, 1).codepoint, 'c' as u32);
    }

    #[test]
    fn split_csi_across_feeds() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[3");
        f.feed(b"1mx");
        assert_eq!(f.screen.cell(0, 0).fg, Rgb::new(205, 0, 0));
    }

    #[test]
    fn ris_resets_screen() {
        let mut f = Fixture::new(20, 5);
        f.feed(b"\x1b[31mhello\x1bc x");
        assert_eq!(f.screen.cell(0, 0).codepoint, ' ' as u32);
        assert_eq!(f.screen.cell(0, 0).fg, f.screen.default_fg());
    }

    #[test]
    fn scroll_region_sequence() {
        let mut f = Fixture::new(10, 4);
        f.feed(b"\x1b[2;3r");
        f.feed(b"\x1b[3;1Hx\n");
        // Cursor stayed inside the region and scrolled it
        assert_eq!(f.screen.cursor.row, 2);
    }
}
