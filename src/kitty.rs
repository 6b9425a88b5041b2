//! Kitty graphics protocol
//!
//! Handles APC `ESC _ G <params>;<base64 payload> ST` commands: image
//! transmission (direct medium, chunked, optionally zlib-compressed),
//! placement, deletion, and queries. Image data is stored as transmitted;
//! rasterization is the embedder's concern.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use flate2::read::ZlibDecoder;
use log::{debug, warn};

use crate::response::ResponseQueue;
use crate::screen::Screen;

/// Upper bound on decoded image data (256 MB)
const MAX_IMAGE_DATA_SIZE: usize = 256 * 1024 * 1024;

/// Raw RGB, 3 bytes per pixel
pub const FORMAT_RGB: u32 = 24;
/// Raw RGBA, 4 bytes per pixel
pub const FORMAT_RGBA: u32 = 32;
/// PNG-encoded payload, stored as-is
pub const FORMAT_PNG: u32 = 100;

/// One transmitted image
#[derive(Debug, Clone)]
pub struct Image {
    pub id: u32,
    /// Client-chosen image number (I key), 0 = none
    pub number: u32,
    /// Pixel width; 0 when unknown (PNG without s/v keys)
    pub width: u32,
    pub height: u32,
    pub format: u32,
    /// 0 = none, b'z' = zlib (already inflated by the time it is stored)
    pub compression: u8,
    /// True when the terminal assigned the id itself
    pub implicit_id: bool,
    /// Transmission order stamp, newer is larger
    pub transmit_time: u32,
    pub data: Vec<u8>,
}

/// One placement of an image on the screen, pinned to the cell it was
/// created at
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub image_id: u32,
    pub placement_id: u32,
    /// Top-left cell
    pub screen_x: u32,
    pub screen_y: u32,
    /// Pixel offset inside the top-left cell
    pub x_offset: u32,
    pub y_offset: u32,
    /// Source rectangle in the image (w/h 0 = full image)
    pub source_x: u32,
    pub source_y: u32,
    pub source_w: u32,
    pub source_h: u32,
    /// Cell span
    pub columns: u32,
    pub rows: u32,
    pub z: i32,
}

/// Parsed key=value control data of one APC G command
#[derive(Debug, Clone, Copy, Default)]
struct Command {
    action: u8,
    quiet: u32,
    more: bool,
    image_id: u32,
    image_number: u32,
    placement_id: u32,
    format: u32,
    compression: u8,
    medium: u8,
    width: u32,
    height: u32,
    source_x: u32,
    source_y: u32,
    source_w: u32,
    source_h: u32,
    x_offset: u32,
    y_offset: u32,
    columns: u32,
    rows: u32,
    z: i32,
    delete: u8,
    no_cursor_move: bool,
}

impl Command {
    fn parse(params: &[u8]) -> Self {
        let mut cmd = Self {
            action: b't',
            format: FORMAT_RGBA,
            ..Self::default()
        };
        for pair in params.split(|&b| b == b',') {
            let mut it = pair.splitn(2, |&b| b == b'=');
            let (Some(key), Some(value)) = (it.next(), it.next()) else {
                continue;
            };
            if key.len() != 1 {
                continue;
            }
            let num = parse_number(value);
            match key[0] {
                b'a' => cmd.action = *value.first().unwrap_or(&b't'),
                b'q' => cmd.quiet = num as u32,
                b'm' => cmd.more = num == 1,
                b'i' => cmd.image_id = num as u32,
                b'I' => cmd.image_number = num as u32,
                b'p' => cmd.placement_id = num as u32,
                b'f' => cmd.format = num as u32,
                b'o' => cmd.compression = *value.first().unwrap_or(&0),
                b't' => cmd.medium = *value.first().unwrap_or(&b'd'),
                b's' => cmd.width = num as u32,
                b'v' => cmd.height = num as u32,
                b'x' => cmd.source_x = num as u32,
                b'y' => cmd.source_y = num as u32,
                b'w' => cmd.source_w = num as u32,
                b'h' => cmd.source_h = num as u32,
                b'X' => cmd.x_offset = num as u32,
                b'Y' => cmd.y_offset = num as u32,
                b'c' => cmd.columns = num as u32,
                b'r' => cmd.rows = num as u32,
                b'z' => cmd.z = num as i32,
                b'd' => cmd.delete = *value.first().unwrap_or(&b'a'),
                b'C' => cmd.no_cursor_move = num == 1,
                _ => {}
            }
        }
        cmd
    }
}

fn parse_number(value: &[u8]) -> i64 {
    let s = std::str::from_utf8(value).unwrap_or("");
    s.trim().parse().unwrap_or(0)
}

/// Multi-chunk transmission in progress (m=1)
#[derive(Debug)]
struct PendingTransmission {
    cmd: Command,
    data: Vec<u8>,
}

/// Image store and placement list
#[derive(Debug, Default)]
pub struct Graphics {
    images: HashMap<u32, Image>,
    /// Keyed by (image_id, placement_id) so re-placement replaces
    placements: BTreeMap<(u32, u32), Placement>,
    pending: Option<PendingTransmission>,
    next_implicit_id: u32,
    transmit_counter: u32,
    dirty: bool,
}

impl Graphics {
    pub fn new() -> Self {
        Self {
            // Implicit ids start high to stay clear of client-chosen ids
            next_implicit_id: 0xffff_0000,
            ..Self::default()
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self, id: u32) -> Option<&Image> {
        self.images.get(&id)
    }

    pub fn image_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.images.keys().copied()
    }

    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.values()
    }

    /// True when images or placements changed since the last acknowledgement
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn reset(&mut self) {
        self.images.clear();
        self.placements.clear();
        self.pending = None;
        self.dirty = true;
    }

    /// Handle one APC G command body (after the leading 'G').
    ///
    /// `cell_w`/`cell_h` are the pixel dimensions of one cell, used to size
    /// placements when the client gives no c/r span.
    pub fn accept_command(
        &mut self,
        body: &[u8],
        screen: &mut Screen,
        responses: &mut ResponseQueue,
        cell_w: u32,
        cell_h: u32,
    ) {
        let (params, payload) = match body.iter().position(|&b| b == b';') {
            Some(idx) => (&body[..idx], &body[idx + 1..]),
            None => (body, &[][..]),
        };

        // Continuation chunks carry only m (and optionally q)
        if let Some(mut pending) = self.pending.take() {
            let cont = Command::parse(params);
            match base64_decode(payload) {
                Some(chunk) => pending.data.extend_from_slice(&chunk),
                None => {
                    respond_error(responses, &pending.cmd, "EINVAL:invalid base64");
                    return;
                }
            }
            if pending.data.len() > MAX_IMAGE_DATA_SIZE {
                respond_error(responses, &pending.cmd, "EFBIG:image data too large");
                return;
            }
            if cont.more {
                self.pending = Some(pending);
            } else {
                self.finish_transmission(pending.cmd, pending.data, screen, responses, cell_w, cell_h);
            }
            return;
        }

        let cmd = Command::parse(params);
        match cmd.action {
            b't' | b'T' => {
                if cmd.medium != 0 && cmd.medium != b'd' {
                    // File and shared-memory media need OS access we do not do
                    respond_error(responses, &cmd, "EINVAL:unsupported medium");
                    return;
                }
                let Some(data) = base64_decode(payload) else {
                    respond_error(responses, &cmd, "EINVAL:invalid base64");
                    return;
                };
                if cmd.more {
                    self.pending = Some(PendingTransmission { cmd, data });
                } else {
                    self.finish_transmission(cmd, data, screen, responses, cell_w, cell_h);
                }
            }
            b'p' => self.place_existing(cmd, screen, responses, cell_w, cell_h),
            b'd' => self.delete(cmd, responses),
            b'q' => self.query(cmd, payload, responses),
            other => {
                debug!("kitty: unhandled action {:?}", other as char);
                respond_error(responses, &cmd, "EINVAL:unknown action");
            }
        }
    }

    /// All chunks received: inflate, validate, store, optionally place
    fn finish_transmission(
        &mut self,
        cmd: Command,
        data: Vec<u8>,
        screen: &mut Screen,
        responses: &mut ResponseQueue,
        cell_w: u32,
        cell_h: u32,
    ) {
        let data = match cmd.compression {
            0 => data,
            b'z' => match inflate_zlib(&data) {
                Some(inflated) => inflated,
                None => {
                    respond_error(responses, &cmd, "EINVAL:zlib decompression failed");
                    return;
                }
            },
            _ => {
                respond_error(responses, &cmd, "EINVAL:unknown compression");
                return;
            }
        };

        if data.is_empty() {
            respond_error(responses, &cmd, "ENODATA:no image data");
            return;
        }
        if data.len() > MAX_IMAGE_DATA_SIZE {
            respond_error(responses, &cmd, "EFBIG:image data too large");
            return;
        }
        if let Err(msg) = validate_dimensions(&cmd, &data) {
            respond_error(responses, &cmd, msg);
            return;
        }

        let implicit = cmd.image_id == 0;
        let id = if implicit {
            self.allocate_implicit_id()
        } else {
            cmd.image_id
        };
        self.transmit_counter += 1;

        let image = Image {
            id,
            number: cmd.image_number,
            width: cmd.width,
            height: cmd.height,
            format: cmd.format,
            compression: cmd.compression,
            implicit_id: implicit,
            transmit_time: self.transmit_counter,
            data,
        };
        debug!(
            "kitty: stored image id={} number={} {}x{} {} bytes",
            id, image.number, image.width, image.height, image.data.len()
        );
        self.images.insert(id, image);
        self.dirty = true;

        if cmd.action == b'T' {
            self.place(id, cmd, screen, cell_w, cell_h);
        }
        respond_ok(responses, &cmd, id);
    }

    /// a=p: place a previously transmitted image
    fn place_existing(
        &mut self,
        cmd: Command,
        screen: &mut Screen,
        responses: &mut ResponseQueue,
        cell_w: u32,
        cell_h: u32,
    ) {
        let id = if cmd.image_id != 0 {
            cmd.image_id
        } else {
            match self.latest_by_number(cmd.image_number) {
                Some(id) => id,
                None => {
                    respond_error(responses, &cmd, "ENOENT:no such image");
                    return;
                }
            }
        };
        if !self.images.contains_key(&id) {
            respond_error(responses, &cmd, "ENOENT:no such image");
            return;
        }
        self.place(id, cmd, screen, cell_w, cell_h);
        respond_ok(responses, &cmd, id);
    }

    fn place(&mut self, image_id: u32, cmd: Command, screen: &mut Screen, cell_w: u32, cell_h: u32) {
        let (img_w, img_h) = self
            .images
            .get(&image_id)
            .map(|img| (img.width, img.height))
            .unwrap_or((0, 0));

        let src_w = if cmd.source_w != 0 { cmd.source_w } else { img_w };
        let src_h = if cmd.source_h != 0 { cmd.source_h } else { img_h };
        let columns = if cmd.columns != 0 {
            cmd.columns
        } else {
            span_cells(src_w, cell_w)
        };
        let rows = if cmd.rows != 0 {
            cmd.rows
        } else {
            span_cells(src_h, cell_h)
        };

        let placement = Placement {
            image_id,
            placement_id: cmd.placement_id,
            screen_x: screen.cursor.col as u32,
            screen_y: screen.cursor.row as u32,
            x_offset: cmd.x_offset,
            y_offset: cmd.y_offset,
            source_x: cmd.source_x,
            source_y: cmd.source_y,
            source_w: cmd.source_w,
            source_h: cmd.source_h,
            columns,
            rows,
            z: cmd.z,
        };
        self.placements
            .insert((image_id, cmd.placement_id), placement);
        self.dirty = true;

        if !cmd.no_cursor_move {
            screen.advance_past_image(rows as usize);
        }
    }

    /// a=d: delete placements (uppercase targets also drop image data)
    fn delete(&mut self, cmd: Command, responses: &mut ResponseQueue) {
        let target = if cmd.delete == 0 { b'a' } else { cmd.delete };
        match target {
            b'a' | b'A' => {
                self.placements.clear();
                if target == b'A' {
                    self.images.clear();
                }
            }
            b'i' | b'I' => {
                let id = cmd.image_id;
                if cmd.placement_id != 0 {
                    self.placements.remove(&(id, cmd.placement_id));
                } else {
                    self.placements.retain(|&(img, _), _| img != id);
                }
                if target == b'I' {
                    self.images.remove(&id);
                }
            }
            b'n' | b'N' => {
                let ids: Vec<u32> = self
                    .images
                    .values()
                    .filter(|img| img.number == cmd.image_number && cmd.image_number != 0)
                    .map(|img| img.id)
                    .collect();
                for id in &ids {
                    self.placements.retain(|&(img, _), _| img != *id);
                }
                if target == b'N' {
                    for id in &ids {
                        self.images.remove(id);
                    }
                }
            }
            other => {
                warn!("kitty: unhandled delete target {:?}", other as char);
            }
        }
        self.dirty = true;
        if cmd.quiet == 0 && cmd.image_id != 0 {
            respond_ok(responses, &cmd, cmd.image_id);
        }
    }

    /// a=q: validate a transmission without storing anything
    fn query(&self, cmd: Command, payload: &[u8], responses: &mut ResponseQueue) {
        if cmd.medium != 0 && cmd.medium != b'd' {
            respond_error(responses, &cmd, "EINVAL:unsupported medium");
            return;
        }
        if cmd.compression != 0 && cmd.compression != b'z' {
            respond_error(responses, &cmd, "EINVAL:unknown compression");
            return;
        }
        if base64_decode(payload).is_none() {
            respond_error(responses, &cmd, "EINVAL:invalid base64");
            return;
        }
        respond_ok(responses, &cmd, cmd.image_id);
    }

    fn latest_by_number(&self, number: u32) -> Option<u32> {
        if number == 0 {
            return None;
        }
        self.images
            .values()
            .filter(|img| img.number == number)
            .max_by_key(|img| img.transmit_time)
            .map(|img| img.id)
    }

    fn allocate_implicit_id(&mut self) -> u32 {
        loop {
            let id = self.next_implicit_id;
            self.next_implicit_id = self.next_implicit_id.wrapping_add(1).max(1);
            if !self.images.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Cells needed to span `pixels` at `cell` pixels per cell, at least 1
fn span_cells(pixels: u32, cell: u32) -> u32 {
    if pixels == 0 || cell == 0 {
        return 1;
    }
    pixels.div_ceil(cell)
}

/// Raw formats must carry enough pixel data for the declared size
fn validate_dimensions(cmd: &Command, data: &[u8]) -> Result<(), &'static str> {
    let bpp = match cmd.format {
        FORMAT_RGB => 3,
        FORMAT_RGBA => 4,
        FORMAT_PNG => return Ok(()), // stored as-is
        _ => return Err("EINVAL:unknown format"),
    };
    if cmd.width == 0 || cmd.height == 0 {
        return Err("EINVAL:missing dimensions");
    }
    let expected = cmd.width as usize * cmd.height as usize * bpp;
    if data.len() < expected {
        return Err("ENODATA:truncated pixel data");
    }
    Ok(())
}

fn respond_ok(responses: &mut ResponseQueue, cmd: &Command, id: u32) {
    if cmd.quiet >= 1 {
        return;
    }
    if cmd.image_number != 0 {
        responses.push_str(&format!("\x1b_Gi={},I={};OK\x1b\\", id, cmd.image_number));
    } else {
        responses.push_str(&format!("\x1b_Gi={};OK\x1b\\", id));
    }
}

fn respond_error(responses: &mut ResponseQueue, cmd: &Command, msg: &str) {
    if cmd.quiet >= 2 {
        return;
    }
    responses.push_str(&format!("\x1b_Gi={};{}\x1b\\", cmd.image_id, msg));
}

fn inflate_zlib(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) if out.len() <= MAX_IMAGE_DATA_SIZE => Some(out),
        Ok(_) => None,
        Err(err) => {
            warn!("kitty: zlib decompression failed: {err}");
            None
        }
    }
}

/// Standard base64 (RFC 4648 alphabet, optional padding)
fn base64_decode(input: &[u8]) -> Option<Vec<u8>> {
    fn value(b: u8) -> Option<u32> {
        match b {
            b'A'..=b'Z' => Some((b - b'A') as u32),
            b'a'..=b'z' => Some((b - b'a' + 26) as u32),
            b'0'..=b'9' => Some((b - b'0' + 52) as u32),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &b in input {
        if b == b'=' || b == b'\n' || b == b'\r' {
            continue;
        }
        acc = (acc << 6) | value(b)?;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn encode_base64(data: &[u8]) -> String {
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let mut out = String::new();
        for chunk in data.chunks(3) {
            let b = [
                chunk[0],
                chunk.get(1).copied().unwrap_or(0),
                chunk.get(2).copied().unwrap_or(0),
            ];
            let n = ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32;
            out.push(ALPHABET[(n >> 18) as usize & 63] as char);
            out.push(ALPHABET[(n >> 12) as usize & 63] as char);
            out.push(if chunk.len() > 1 {
                ALPHABET[(n >> 6) as usize & 63] as char
            } else {
                '='
            });
            out.push(if chunk.len() > 2 {
                ALPHABET[n as usize & 63] as char
            } else {
                '='
            });
        }
        out
    }

    fn setup() -> (Graphics, Screen, ResponseQueue) {
        (
            Graphics::new(),
            Screen::new(80, 24, &Config::default()),
            ResponseQueue::new(),
        )
    }

    fn transmit_rgb(
        g: &mut Graphics,
        screen: &mut Screen,
        responses: &mut ResponseQueue,
        id: u32,
        w: u32,
        h: u32,
        action: char,
    ) {
        let pixels = vec![0u8; (w * h * 3) as usize];
        let body = format!(
            "a={},f=24,i={},s={},v={};{}",
            action,
            id,
            w,
            h,
            encode_base64(&pixels)
        );
        g.accept_command(body.as_bytes(), screen, responses, 8, 16);
    }

    fn drain(responses: &mut ResponseQueue) -> String {
        let mut buf = vec![0u8; responses.len()];
        responses.read(&mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn transmit_stores_image_and_acks() {
        let (mut g, mut screen, mut responses) = setup();
        transmit_rgb(&mut g, &mut screen, &mut responses, 7, 2, 2, 't');
        assert_eq!(g.image_count(), 1);
        let img = g.image(7).unwrap();
        assert_eq!(img.data.len(), 12);
        assert_eq!(img.format, FORMAT_RGB);
        assert_eq!(drain(&mut responses), "\x1b_Gi=7;OK\x1b\\");
        // Transmit without placement does not create placements
        assert_eq!(g.placement_count(), 0);
    }

    #[test]
    fn transmit_and_place_advances_cursor() {
        let (mut g, mut screen, mut responses) = setup();
        // 16x32 pixels at 8x16 cells: 2 columns, 2 rows
        transmit_rgb(&mut g, &mut screen, &mut responses, 1, 16, 32, 'T');
        assert_eq!(g.placement_count(), 1);
        let p = g.placements().next().unwrap();
        assert_eq!((p.screen_x, p.screen_y), (0, 0));
        assert_eq!((p.columns, p.rows), (2, 2));
        assert_eq!(screen.cursor.row, 2);
        assert_eq!(screen.cursor.col, 0);
    }

    #[test]
    fn chunked_transmission_assembles() {
        let (mut g, mut screen, mut responses) = setup();
        let pixels = vec![0xabu8; 2 * 1 * 3];
        let encoded = encode_base64(&pixels);
        let (first, second) = encoded.split_at(4);

        let body = format!("a=t,f=24,i=3,s=2,v=1,m=1;{first}");
        g.accept_command(body.as_bytes(), &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image_count(), 0);
        assert!(!responses.has_pending());

        let body = format!("m=0;{second}");
        g.accept_command(body.as_bytes(), &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image_count(), 1);
        assert_eq!(g.image(3).unwrap().data, pixels);
        assert_eq!(drain(&mut responses), "\x1b_Gi=3;OK\x1b\\");
    }

    #[test]
    fn zlib_payload_is_inflated() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let (mut g, mut screen, mut responses) = setup();
        let pixels = vec![0x55u8; 4 * 4 * 4];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&pixels).unwrap();
        let compressed = encoder.finish().unwrap();

        let body = format!(
            "a=t,f=32,i=9,s=4,v=4,o=z;{}",
            encode_base64(&compressed)
        );
        g.accept_command(body.as_bytes(), &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image(9).unwrap().data, pixels);
    }

    #[test]
    fn truncated_pixel_data_is_rejected() {
        let (mut g, mut screen, mut responses) = setup();
        let body = format!("a=t,f=24,i=4,s=10,v=10;{}", encode_base64(&[0u8; 8]));
        g.accept_command(body.as_bytes(), &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image_count(), 0);
        assert!(drain(&mut responses).contains("ENODATA"));
    }

    #[test]
    fn quiet_suppresses_ok() {
        let (mut g, mut screen, mut responses) = setup();
        let pixels = vec![0u8; 3];
        let body = format!("a=t,f=24,i=5,s=1,v=1,q=1;{}", encode_base64(&pixels));
        g.accept_command(body.as_bytes(), &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image_count(), 1);
        assert!(!responses.has_pending());
    }

    #[test]
    fn place_existing_by_id() {
        let (mut g, mut screen, mut responses) = setup();
        transmit_rgb(&mut g, &mut screen, &mut responses, 2, 8, 16, 't');
        screen.cursor_position(5, 10);
        g.accept_command(b"a=p,i=2,p=1", &mut screen, &mut responses, 8, 16);
        assert_eq!(g.placement_count(), 1);
        let p = g.placements().next().unwrap();
        assert_eq!((p.screen_x, p.screen_y), (9, 4));
        assert_eq!(p.placement_id, 1);
    }

    #[test]
    fn place_unknown_image_errors() {
        let (mut g, mut screen, mut responses) = setup();
        g.accept_command(b"a=p,i=99", &mut screen, &mut responses, 8, 16);
        assert!(drain(&mut responses).contains("ENOENT"));
    }

    #[test]
    fn delete_by_id_clears_placements() {
        let (mut g, mut screen, mut responses) = setup();
        transmit_rgb(&mut g, &mut screen, &mut responses, 1, 8, 16, 'T');
        transmit_rgb(&mut g, &mut screen, &mut responses, 2, 8, 16, 'T');
        assert_eq!(g.placement_count(), 2);

        g.accept_command(b"a=d,d=i,i=1,q=1", &mut screen, &mut responses, 8, 16);
        assert_eq!(g.placement_count(), 1);
        // Lowercase delete keeps the data
        assert_eq!(g.image_count(), 2);

        g.accept_command(b"a=d,d=I,i=2,q=1", &mut screen, &mut responses, 8, 16);
        assert_eq!(g.placement_count(), 0);
        assert_eq!(g.image_count(), 1);
    }

    #[test]
    fn delete_all_keeps_images_unless_uppercase() {
        let (mut g, mut screen, mut responses) = setup();
        transmit_rgb(&mut g, &mut screen, &mut responses, 1, 8, 16, 'T');
        g.accept_command(b"a=d,q=1", &mut screen, &mut responses, 8, 16);
        assert_eq!(g.placement_count(), 0);
        assert_eq!(g.image_count(), 1);
        g.accept_command(b"a=d,d=A,q=1", &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image_count(), 0);
    }

    #[test]
    fn query_validates_without_storing() {
        let (mut g, mut screen, mut responses) = setup();
        g.accept_command(b"a=q,i=31,f=24,s=1,v=1;AAAA", &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image_count(), 0);
        assert_eq!(drain(&mut responses), "\x1b_Gi=31;OK\x1b\\");
    }

    #[test]
    fn implicit_id_is_allocated() {
        let (mut g, mut screen, mut responses) = setup();
        let pixels = vec![0u8; 3];
        let body = format!("a=t,f=24,I=44,s=1,v=1;{}", encode_base64(&pixels));
        g.accept_command(body.as_bytes(), &mut screen, &mut responses, 8, 16);
        assert_eq!(g.image_count(), 1);
        assert_eq!(g.placement_count(), 0);
        let reply = drain(&mut responses);
        assert!(reply.contains("I=44"));
        assert!(reply.ends_with(";OK\x1b\\"));
    }

    #[test]
    fn base64_rejects_garbage() {
        assert!(base64_decode(b"not!valid").is_none());
        assert_eq!(base64_decode(b"").unwrap(), Vec::<u8>::new());
    }
}
