//! Terminal graphics protocol encoding.
//!
//! Image payloads go out as kitty direct RGB transmissions (chunked base64),
//! packaged as an [`ImageDescriptor`]: the escape sequence to write at the
//! chart origin plus the number of terminal rows the image reserves. iTerm2
//! is detected so kitty codes are never sent to it; its inline-file protocol
//! needs an encoded image file, which this stack does not produce, so iTerm2
//! callers fall back to the text chart. The candle rasterizer that feeds the
//! kitty path lives here too.

use std::env;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::models::Ohlc;

/// Candle colors, shared with the block-mode renderer.
pub const BULLISH_RGB: (u8, u8, u8) = (52, 208, 88);
pub const BEARISH_RGB: (u8, u8, u8) = (234, 74, 90);
const BACKGROUND_RGB: (u8, u8, u8) = (16, 20, 24);

/// Deletes every image previously placed by the kitty protocol.
pub const KITTY_CLEAR: &str = "\x1b_Ga=d,d=a,q=2\x1b\\";

/// kitty caps escape payloads at 4096 bytes per chunk.
const KITTY_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsProtocol {
    Kitty,
    Iterm2,
}

/// Detect the active protocol from the environment.
pub fn detect_protocol() -> GraphicsProtocol {
    protocol_from(
        env::var("GRAPHICS_PROTOCOL").ok().as_deref(),
        env::var("TERM_PROGRAM").ok().as_deref(),
    )
}

/// `GRAPHICS_PROTOCOL` overrides, then `TERM_PROGRAM` identifies iTerm2;
/// everything else gets the kitty sequence, mirroring how most
/// kitty-compatible terminals advertise themselves only through `TERM`.
fn protocol_from(
    override_var: Option<&str>,
    term_program: Option<&str>,
) -> GraphicsProtocol {
    match override_var {
        Some(value) if value.eq_ignore_ascii_case("iterm") => return GraphicsProtocol::Iterm2,
        Some(value) if value.eq_ignore_ascii_case("kitty") => return GraphicsProtocol::Kitty,
        _ => {}
    }
    if term_program.is_some_and(|t| t.contains("iTerm")) {
        GraphicsProtocol::Iterm2
    } else {
        GraphicsProtocol::Kitty
    }
}

/// A rendered image ready for the terminal: the escape sequence and the
/// vertical space (in rows) it occupies.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    /// Sequence deleting previously transmitted images, written before the
    /// payload; may be empty.
    pub clear: String,
    /// The protocol escape sequence carrying the image payload.
    pub sequence: String,
    /// Rows of terminal space the image reserves.
    pub rows: u16,
}

/// Encode raw RGB pixels as a kitty direct transmission, displayed at the
/// cursor and scaled to `cols` x `rows` terminal cells.
pub fn kitty_rgb_descriptor(
    pixels: &[u8],
    width_px: u32,
    height_px: u32,
    cols: u16,
    rows: u16,
) -> ImageDescriptor {
    debug_assert_eq!(pixels.len(), (width_px * height_px * 3) as usize);

    let encoded = BASE64.encode(pixels);

    let mut sequence = String::with_capacity(encoded.len() + encoded.len() / KITTY_CHUNK_SIZE * 24 + 64);
    let mut start = 0;
    while start < encoded.len() {
        let end = (start + KITTY_CHUNK_SIZE).min(encoded.len());
        // Base64 output is ASCII, so byte offsets are char boundaries.
        let chunk = &encoded[start..end];
        let more = if end == encoded.len() { 0 } else { 1 };
        if start == 0 {
            sequence.push_str(&format!(
                "\x1b_Gf=24,s={width_px},v={height_px},a=T,q=2,c={cols},r={rows},m={more};{chunk}\x1b\\"
            ));
        } else {
            sequence.push_str(&format!("\x1b_Gm={more};{chunk}\x1b\\"));
        }
        start = end;
    }

    ImageDescriptor {
        clear: KITTY_CLEAR.to_string(),
        sequence,
        rows,
    }
}

/// Paint daily candles into an RGB pixel buffer. Geometry follows the text
/// renderer: per-candle column, thin wick from high to low, solid body
/// between open and close, 2% price margin above and below.
pub fn rasterize_candles(candles: &[Ohlc], width_px: u32, height_px: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; (width_px * height_px * 3) as usize];
    fill_background(&mut pixels);
    if candles.is_empty() || width_px == 0 || height_px == 0 {
        return pixels;
    }

    let max = candles.iter().fold(f64::NEG_INFINITY, |m, c| m.max(c.high));
    let min = candles.iter().fold(f64::INFINITY, |m, c| m.min(c.low));
    let margin = (max - min) * 0.02;
    let (min, max) = ((min - margin).max(0.0), max + margin);
    let span = if max > min { max - min } else { 1.0 };

    let price_to_y = |price: f64| -> u32 {
        let t = ((price - min) / span).clamp(0.0, 1.0);
        // Pixel row 0 is the top of the image.
        ((1.0 - t) * (height_px - 1) as f64).round() as u32
    };

    let n = candles.len() as u32;
    for (i, candle) in candles.iter().enumerate() {
        let x0 = i as u32 * width_px / n;
        let x1 = ((i as u32 + 1) * width_px / n).max(x0 + 1);
        let color = if candle.is_bullish() {
            BULLISH_RGB
        } else {
            BEARISH_RGB
        };

        // Wick: one pixel wide, centered in the candle's column span.
        let wick_x = x0 + (x1 - x0) / 2;
        let wick_top = price_to_y(candle.high);
        let wick_bottom = price_to_y(candle.low);
        fill_rect(
            &mut pixels,
            width_px,
            wick_x,
            wick_x + 1,
            wick_top,
            wick_bottom + 1,
            color,
        );

        // Body: the column span minus a 1px gap on the right, at least 1px
        // tall so dojis stay visible.
        let body_x1 = if x1 - x0 > 2 { x1 - 1 } else { x1 };
        let body_top = price_to_y(candle.open.max(candle.close));
        let body_bottom = price_to_y(candle.open.min(candle.close)).max(body_top + 1);
        fill_rect(
            &mut pixels,
            width_px,
            x0,
            body_x1,
            body_top,
            body_bottom,
            color,
        );
    }

    pixels
}

/// A plain white square, used by debug mode to probe graphics support.
pub fn test_pattern(side_px: u32) -> Vec<u8> {
    vec![255u8; (side_px * side_px * 3) as usize]
}

fn fill_background(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(3) {
        pixel[0] = BACKGROUND_RGB.0;
        pixel[1] = BACKGROUND_RGB.1;
        pixel[2] = BACKGROUND_RGB.2;
    }
}

fn fill_rect(
    pixels: &mut [u8],
    width_px: u32,
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
    color: (u8, u8, u8),
) {
    let height_px = pixels.len() as u32 / 3 / width_px;
    for y in y0..y1.min(height_px) {
        for x in x0..x1.min(width_px) {
            let offset = ((y * width_px + x) * 3) as usize;
            pixels[offset] = color.0;
            pixels[offset + 1] = color.1;
            pixels[offset + 2] = color.2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pixel_at(pixels: &[u8], width_px: u32, x: u32, y: u32) -> (u8, u8, u8) {
        let offset = ((y * width_px + x) * 3) as usize;
        (pixels[offset], pixels[offset + 1], pixels[offset + 2])
    }

    #[test]
    fn kitty_descriptor_single_chunk() {
        let pixels = vec![0u8; 4 * 4 * 3];
        let descriptor = kitty_rgb_descriptor(&pixels, 4, 4, 10, 5);

        assert!(descriptor.sequence.starts_with("\x1b_Gf=24,s=4,v=4,a=T,q=2,c=10,r=5,m=0;"));
        assert!(descriptor.sequence.ends_with("\x1b\\"));
        assert_eq!(descriptor.rows, 5);
        assert_eq!(descriptor.clear, KITTY_CLEAR);
    }

    #[test]
    fn kitty_descriptor_chunks_large_payloads() {
        // 64x64 RGB = 12288 bytes -> 16384 base64 chars -> 4 chunks.
        let pixels = vec![7u8; 64 * 64 * 3];
        let descriptor = kitty_rgb_descriptor(&pixels, 64, 64, 80, 24);

        assert_eq!(descriptor.sequence.matches("\x1b_G").count(), 4);
        assert_eq!(descriptor.sequence.matches("m=1;").count(), 3);
        assert_eq!(descriptor.sequence.matches("m=0;").count(), 1);
    }

    #[test]
    fn protocol_override_wins() {
        assert_eq!(protocol_from(Some("iterm"), None), GraphicsProtocol::Iterm2);
        assert_eq!(
            protocol_from(Some("KITTY"), Some("iTerm.app")),
            GraphicsProtocol::Kitty
        );
    }

    #[test]
    fn protocol_falls_back_to_term_program() {
        assert_eq!(protocol_from(None, Some("iTerm.app")), GraphicsProtocol::Iterm2);
        assert_eq!(protocol_from(None, Some("WezTerm")), GraphicsProtocol::Kitty);
        assert_eq!(protocol_from(None, None), GraphicsProtocol::Kitty);
        assert_eq!(protocol_from(Some("bogus"), None), GraphicsProtocol::Kitty);
    }

    #[test]
    fn raster_has_expected_size_and_background() {
        let pixels = rasterize_candles(&[], 8, 8);
        assert_eq!(pixels.len(), 8 * 8 * 3);
        assert_eq!(pixel_at(&pixels, 8, 0, 0), BACKGROUND_RGB);
    }

    #[test]
    fn raster_paints_bullish_body() {
        let candle = Ohlc::new(Utc::now(), 100.0, 110.0, 90.0, 108.0, 1000);
        let width = 10u32;
        let height = 40u32;
        let pixels = rasterize_candles(&[candle], width, height);

        // Mid-price sits inside the body; the wick column must be colored.
        let mid_y = height / 2;
        assert_eq!(pixel_at(&pixels, width, width / 2, mid_y), BULLISH_RGB);
        // The top row is margin, still background.
        assert_eq!(pixel_at(&pixels, width, 0, 0), BACKGROUND_RGB);
    }

    #[test]
    fn raster_paints_bearish_body() {
        let candle = Ohlc::new(Utc::now(), 108.0, 110.0, 90.0, 100.0, 1000);
        let pixels = rasterize_candles(&[candle], 10, 40);
        assert_eq!(pixel_at(&pixels, 10, 5, 20), BEARISH_RGB);
    }

    #[test]
    fn test_pattern_is_white() {
        let pixels = test_pattern(2);
        assert_eq!(pixels, vec![255u8; 12]);
    }
}
