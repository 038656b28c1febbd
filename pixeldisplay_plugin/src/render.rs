use crate::board::Board;
use crate::error::RenderError;
use crate::palette;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

/// Key image edge in pixels (high-DPI Stream Deck key).
pub const OUTPUT_SIZE: u32 = 288;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Scales the board onto an `OUTPUT_SIZE` square, nearest-neighbor.
///
/// Output pixel `(px, py)` takes board cell `(px * width / OUTPUT_SIZE,
/// py * height / OUTPUT_SIZE)`, so non-square boards are stretched on each
/// axis independently and no edge is ever blended.
pub fn rasterize(board: &Board) -> Result<RgbImage, RenderError> {
    if !board.has_pixels() {
        return Err(RenderError::EmptyBoard);
    }
    let width = board.width() as usize;
    let cols: Vec<usize> = (0..OUTPUT_SIZE)
        .map(|px| source_cell(px, board.width()))
        .collect();

    let pixels = board.pixels();
    let mut img = RgbImage::new(OUTPUT_SIZE, OUTPUT_SIZE);
    for py in 0..OUTPUT_SIZE {
        let row = source_cell(py, board.height()) * width;
        for (px, &col) in cols.iter().enumerate() {
            let color = palette::lookup(pixels[row + col])?;
            img.put_pixel(px as u32, py, Rgb(color));
        }
    }
    Ok(img)
}

pub fn encode_png(board: &Board) -> Result<Vec<u8>, RenderError> {
    let img = rasterize(board)?;
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(png)
}

/// Renders the board as the `data:` URL `setImage` expects.
pub fn render(board: &Board) -> Result<String, RenderError> {
    let png = encode_png(board)?;
    let mut out = String::with_capacity(DATA_URL_PREFIX.len() + png.len() * 4 / 3 + 4);
    out.push_str(DATA_URL_PREFIX);
    STANDARD.encode_string(&png, &mut out);
    Ok(out)
}

fn source_cell(out: u32, cells: u32) -> usize {
    (u64::from(out) * u64::from(cells) / u64::from(OUTPUT_SIZE)) as usize
}
