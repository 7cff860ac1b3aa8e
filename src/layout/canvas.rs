//! Drawing surface the layout engine paints through.
//!
//! Coordinates are millimetres with the origin at the top-left corner of the
//! page and y growing downwards, the same frame the page geometry in
//! [`super`] is written in. Backends convert to their own units.

use image::DynamicImage;

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

/// How a run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in points.
    pub size_pt: f32,
    pub bold: bool,
    pub color: Rgb,
}

impl TextStyle {
    pub const fn new(size_pt: f32, bold: bool, color: Rgb) -> Self {
        Self {
            size_pt,
            bold,
            color,
        }
    }
}

/// An axis-aligned box in page millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Handle to an image registered with a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub usize);

/// Decoded 8-bit image ready for embedding.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Packed RGB samples, row-major.
    pub rgb: Vec<u8>,
    /// One alpha sample per pixel, present only if some pixel is not opaque.
    pub alpha: Option<Vec<u8>>,
}

impl RasterImage {
    /// Decode any format the `image` crate was built with.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self::from_dynamic(&image::load_from_memory(bytes)?))
    }

    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for p in rgba.pixels() {
            rgb.extend_from_slice(&p.0[..3]);
            alpha.push(p.0[3]);
        }
        let alpha = alpha.iter().any(|&a| a != u8::MAX).then_some(alpha);
        Self {
            width,
            height,
            rgb,
            alpha,
        }
    }
}

/// A fixed-size, multi-page drawing surface.
///
/// Backends own the font: the layout engine asks them for glyph advances
/// and never sees font data itself.
pub trait Canvas {
    /// Start a new blank page; later draws land on it.
    fn add_page(&mut self);

    /// Pages started so far.
    fn page_count(&self) -> usize;

    /// Make an image drawable. Registering once and drawing many times keeps
    /// repeated backgrounds from being stored per page.
    fn register_image(&mut self, image: &RasterImage) -> ImageId;

    /// Draw a registered image stretched to `rect`.
    fn draw_image(&mut self, image: ImageId, rect: Rect);

    /// Draw `text` starting at `x` with its baseline at `baseline`.
    fn draw_text(&mut self, x: f32, baseline: f32, text: &str, style: &TextStyle);

    /// Outline `rect` with a line `line_width` mm wide.
    fn stroke_rect(&mut self, rect: Rect, line_width: f32);

    /// Advance width of `c` in mm at `size_pt`.
    fn char_width(&self, c: char, size_pt: f32) -> f32;

    /// Advance width of `text` in mm at `size_pt`.
    fn text_width(&self, text: &str, size_pt: f32) -> f32 {
        text.chars().map(|c| self.char_width(c, size_pt)).sum()
    }
}
