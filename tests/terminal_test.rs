//! End-to-end tests through the public Terminal API

use gridterm::{Config, Dirty, Error, RenderCell, Terminal};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn viewport_of(term: &Terminal) -> Vec<RenderCell> {
    let mut out = vec![RenderCell::default(); term.cols() * term.rows()];
    term.viewport(&mut out).unwrap();
    out
}

fn row_text(term: &Terminal, row: usize) -> String {
    let mut out = vec![RenderCell::default(); term.cols()];
    term.viewport_row(row, &mut out).unwrap();
    out.iter()
        .filter(|c| c.codepoint != 0)
        .filter_map(|c| char::from_u32(c.codepoint))
        .collect()
}

#[test]
fn hello_lands_in_row_zero() {
    let mut term = Terminal::new(80, 24).unwrap();
    term.write(b"Hello");
    let cells = viewport_of(&term);
    let text: String = cells[..5]
        .iter()
        .filter_map(|c| char::from_u32(c.codepoint))
        .collect();
    assert_eq!(text, "Hello");
    assert_eq!(cells[5].codepoint, 0);
    assert_eq!(term.cursor(), (5, 0));
}

#[test]
fn byte_at_a_time_equals_one_write() {
    let input: &[u8] =
        b"\x1b[2;5H\x1b[1;32mSplit\x1b[0m me\r\nanywhere \xe6\xbc\xa2\x1b[31m!\x1b[m";

    let mut whole = Terminal::new(40, 10).unwrap();
    whole.write(input);

    let mut split = Terminal::new(40, 10).unwrap();
    for &b in input {
        split.write(&[b]);
    }

    assert_eq!(viewport_of(&whole), viewport_of(&split));
    assert_eq!(whole.cursor(), split.cursor());
}

#[test]
fn split_graphics_command_equals_one_write() {
    init_logs();
    // 1x1 RGB pixel: "AAAA" decodes to 3 zero bytes
    let input: &[u8] = b"\x1b_Ga=T,f=24,i=1,s=1,v=1;AAAA\x1b\\";

    let mut whole = Terminal::new(20, 5).unwrap();
    whole.write(input);
    let mut split = Terminal::new(20, 5).unwrap();
    for &b in input {
        split.write(&[b]);
    }

    assert_eq!(whole.image_count(), 1);
    assert_eq!(split.image_count(), 1);
    assert_eq!(whole.placement_count(), split.placement_count());
}

#[test]
fn autowrap_marks_continuation_row() {
    let mut term = Terminal::new(5, 4).unwrap();
    term.write(b"abcdefg");
    assert_eq!(row_text(&term, 0), "abcde");
    assert_eq!(row_text(&term, 1), "fg");
    assert!(term.row_wrapped(1));
    assert!(!term.row_wrapped(0));

    // A hard newline does not mark the next row
    term.write(b"\r\nhard");
    assert!(!term.row_wrapped(2));
}

#[test]
fn scrollback_holds_min_of_scrolled_and_limit() {
    let config = Config {
        scrollback_limit: 5,
        ..Config::default()
    };

    // Scroll fewer lines than the limit
    let mut term = Terminal::with_config(10, 2, &config).unwrap();
    term.write(b"a\r\nb\r\nc\r\nd");
    // 4 lines on a 2-row screen: 2 scrolled out
    assert_eq!(term.scrollback_len(), 2);

    // Scroll more lines than the limit
    let mut term = Terminal::with_config(10, 2, &config).unwrap();
    for i in 0..10 {
        term.write(format!("L{i}\r\n").as_bytes());
    }
    assert_eq!(term.scrollback_len(), 5);
}

#[test]
fn scrollback_evicts_oldest_first() {
    let config = Config {
        scrollback_limit: 5,
        ..Config::default()
    };
    let mut term = Terminal::with_config(10, 2, &config).unwrap();
    // L0..L9 on a 2-row screen: L0..L7 scroll out, the limit keeps L3..L7
    for i in 0..10 {
        term.write(format!("L{i}").as_bytes());
        if i < 9 {
            term.write(b"\r\n");
        }
    }
    assert_eq!(term.scrollback_len(), 5);

    let mut out = vec![RenderCell::default(); 10];
    let n = term.scrollback_line(0, &mut out).unwrap();
    let oldest: String = out[..n]
        .iter()
        .filter(|c| c.codepoint != 0)
        .filter_map(|c| char::from_u32(c.codepoint))
        .collect();
    assert_eq!(oldest, "L3");
}

#[test]
fn trim_clamps_to_available_lines() {
    let mut term = Terminal::new(10, 2).unwrap();
    term.write(b"a\r\nb\r\nc\r\nd\r\ne");
    assert_eq!(term.scrollback_len(), 3);

    term.trim_scrollback(2);
    assert_eq!(term.scrollback_len(), 1);
    // Over-trimming empties without error
    term.trim_scrollback(100);
    assert_eq!(term.scrollback_len(), 0);

    let mut out = vec![RenderCell::default(); 10];
    assert_eq!(
        term.scrollback_line(0, &mut out),
        Err(Error::OutOfRange)
    );
}

#[test]
fn erasing_either_half_of_wide_pair_blanks_both() {
    // Overwrite the head
    let mut term = Terminal::new(10, 2).unwrap();
    term.write("漢".as_bytes());
    term.write(b"\x1b[1;1Hx");
    let cells = viewport_of(&term);
    assert_eq!(cells[0].codepoint, 'x' as u32);
    assert_eq!(cells[1].codepoint, 0);
    assert_eq!(cells[1].width, 1);

    // Erase across the spacer
    let mut term = Terminal::new(10, 2).unwrap();
    term.write("漢".as_bytes());
    term.write(b"\x1b[1;2H\x1b[1X");
    let cells = viewport_of(&term);
    assert_eq!(cells[0].codepoint, 0);
    assert_eq!(cells[1].codepoint, 0);
}

#[test]
fn clear_and_home_resets_viewport() {
    let mut term = Terminal::new(20, 5).unwrap();
    term.write(b"some\r\ncontent\r\nhere");
    term.write(b"\x1b[2J\x1b[H");
    assert_eq!(term.cursor(), (0, 0));
    let cells = viewport_of(&term);
    assert!(cells.iter().all(|c| c.codepoint == 0));
    term.write(b"fresh");
    assert_eq!(row_text(&term, 0), "fresh");
}

#[test]
fn update_is_none_only_after_mark_clean() {
    let mut term = Terminal::new(20, 5).unwrap();
    assert_eq!(term.update(), Dirty::None);

    term.write(b"dirty");
    assert_ne!(term.update(), Dirty::None);
    // Reading does not acknowledge
    let _ = viewport_of(&term);
    assert_ne!(term.update(), Dirty::None);

    term.mark_clean();
    assert_eq!(term.update(), Dirty::None);

    term.write(b"x");
    assert_eq!(term.update(), Dirty::Partial);
    assert!(term.row_dirty(0));
    assert!(!term.row_dirty(1));
}

#[test]
fn resize_makes_everything_dirty() {
    let mut term = Terminal::new(20, 5).unwrap();
    term.mark_clean();
    term.resize(30, 6).unwrap();
    assert_eq!(term.update(), Dirty::Full);
}

#[test]
fn deleting_image_clears_its_placements() {
    init_logs();
    let mut term = Terminal::new(40, 10).unwrap();
    // Two 1x1 RGB images, transmitted and placed
    term.write(b"\x1b_Ga=T,f=24,i=1,s=1,v=1,q=1;AAAA\x1b\\");
    term.write(b"\x1b_Ga=T,f=24,i=2,s=1,v=1,q=1;AAAA\x1b\\");
    assert_eq!(term.image_count(), 2);
    assert_eq!(term.placement_count(), 2);

    term.write(b"\x1b_Ga=d,d=I,i=1,q=1\x1b\\");
    assert_eq!(term.image_count(), 1);
    assert_eq!(term.placement_count(), 1);
    assert!(term.placements().all(|p| p.image_id == 2));
    assert!(term.image(1).is_none());
    assert!(term.image(2).is_some());
}

#[test]
fn clearing_image_dirt_leaves_row_dirt() {
    init_logs();
    let mut term = Terminal::new(40, 10).unwrap();
    term.mark_clean();
    term.write(b"text\x1b_Ga=T,f=24,i=1,s=1,v=1,q=1;AAAA\x1b\\");
    assert!(term.images_dirty());
    assert!(term.row_dirty(0));

    term.clear_images_dirty();
    assert!(!term.images_dirty());
    // The written row is still unacknowledged
    assert!(term.row_dirty(0));
    assert_eq!(term.update(), Dirty::Partial);

    term.mark_clean();
    assert_eq!(term.update(), Dirty::None);
}

#[test]
fn graphics_responses_are_queued() {
    let mut term = Terminal::new(40, 10).unwrap();
    term.write(b"\x1b_Ga=t,f=24,i=7,s=1,v=1;AAAA\x1b\\");
    assert!(term.has_responses());
    let mut buf = [0u8; 64];
    let n = term.read_responses(&mut buf);
    assert_eq!(&buf[..n], b"\x1b_Gi=7;OK\x1b\\");
    assert!(!term.has_responses());
}

#[test]
fn cursor_position_report_roundtrip() {
    let mut term = Terminal::new(40, 10).unwrap();
    term.write(b"\x1b[4;7H\x1b[6n");
    let mut buf = [0u8; 32];
    let n = term.read_responses(&mut buf);
    assert_eq!(&buf[..n], b"\x1b[4;7R");
}

#[test]
fn grapheme_cluster_survives_scroll_into_scrollback() {
    let mut term = Terminal::new(10, 2).unwrap();
    term.write("e\u{0301}".as_bytes());
    term.write(b"\r\n\r\nmore");
    assert_eq!(term.scrollback_len(), 1);
    // The cluster scrolled out but its codepoints are still reachable
    let mut out = vec![RenderCell::default(); 10];
    let n = term.scrollback_line(0, &mut out).unwrap();
    assert_eq!(n, 10);
    assert_eq!(out[0].codepoint, 'e' as u32);
    assert_eq!(out[0].grapheme_len, 1);
}

#[test]
fn alternate_screen_session() {
    let mut term = Terminal::new(20, 5).unwrap();
    term.write(b"shell$ ");
    term.write(b"\x1b[?1049h");
    assert!(term.is_alternate_screen());
    term.write(b"editor");
    assert_eq!(row_text(&term, 0), "editor");
    term.write(b"\x1b[?1049l");
    assert!(!term.is_alternate_screen());
    assert_eq!(row_text(&term, 0), "shell$ ");
    assert_eq!(term.cursor(), (7, 0));
}

#[test]
fn modes_reflect_through_accessors() {
    let mut term = Terminal::new(20, 5).unwrap();
    assert!(!term.bracketed_paste());
    assert!(!term.mouse_tracking());
    term.write(b"\x1b[?2004h\x1b[?1002h");
    assert!(term.bracketed_paste());
    assert!(term.mouse_tracking());
    term.write(b"\x1b[?1002l");
    assert!(!term.mouse_tracking());
}
