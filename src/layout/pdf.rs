//! PDF backend: a [`Canvas`] that records content streams with `pdf-writer`.
//!
//! Images are written as XObjects the moment they are registered; page
//! content is buffered until [`PdfCanvas::finish`], because fonts can only be
//! written once every glyph that will be used is known.

use super::canvas::{Canvas, ImageId, RasterImage, Rect, TextStyle};
use super::font::{FontFace, PT_TO_MM};
use super::PAGE_HEIGHT_MM;
use super::PAGE_WIDTH_MM;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, TextRenderingMode, UnicodeCmap};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Ref, Str, TextStr};
use std::io::Write;
use tracing::debug;

const FONT_NAME: Name<'static> = Name(b"F1");

const IDENTITY: SystemInfo<'static> = SystemInfo {
    registry: Str(b"Adobe"),
    ordering: Str(b"Identity"),
    supplement: 0,
};

/// Stroke width (mm) used to embolden text drawn with `bold: true`. The
/// embedded face has no bold variant.
const BOLD_STROKE_MM: f32 = 0.2;

fn mm(v: f32) -> f32 {
    v / PT_TO_MM
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    let _ = enc.write_all(data);
    enc.finish().unwrap_or_default()
}

/// A portrait A4 document under construction.
pub struct PdfCanvas {
    pdf: Pdf,
    next_id: i32,
    font: FontFace,
    pages: Vec<Content>,
    images: Vec<Ref>,
    title: Option<String>,
}

impl PdfCanvas {
    pub fn new(font: FontFace) -> Self {
        Self {
            pdf: Pdf::new(),
            next_id: 1,
            font,
            pages: Vec::new(),
            images: Vec::new(),
            title: None,
        }
    }

    /// Set the document-info title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn current(&mut self) -> &mut Content {
        if self.pages.is_empty() {
            self.pages.push(Content::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Write fonts, pages and the catalog; return the file bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let catalog_id = self.alloc();
        let tree_id = self.alloc();
        let font_id = self.write_font();
        let info_id = self.alloc();

        let pages = std::mem::take(&mut self.pages);
        let mut page_ids = Vec::with_capacity(pages.len());
        let image_names: Vec<String> = (0..self.images.len()).map(|i| format!("Im{i}")).collect();

        for content in pages {
            let page_id = self.alloc();
            let content_id = self.alloc();
            page_ids.push(page_id);

            let data = compress(&content.finish());
            self.pdf
                .stream(content_id, &data)
                .filter(Filter::FlateDecode);

            let mut page = self.pdf.page(page_id);
            page.media_box(pdf_writer::Rect::new(
                0.0,
                0.0,
                mm(PAGE_WIDTH_MM),
                mm(PAGE_HEIGHT_MM),
            ));
            page.parent(tree_id);
            page.contents(content_id);
            {
                let mut resources = page.resources();
                resources.fonts().pair(FONT_NAME, font_id);
                let mut xobjects = resources.x_objects();
                for (name, id) in image_names.iter().zip(&self.images) {
                    xobjects.pair(Name(name.as_bytes()), *id);
                }
            }
            page.finish();
        }

        self.pdf
            .pages(tree_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);
        self.pdf.catalog(catalog_id).pages(tree_id);
        if let Some(title) = &self.title {
            self.pdf.document_info(info_id).title(TextStr(title.as_str()));
        }

        debug!(
            "PDF: {} pages, {} images, {} objects",
            page_ids.len(),
            self.images.len(),
            self.next_id - 1
        );
        self.pdf.finish()
    }

    fn write_font(&mut self) -> Ref {
        let font_id = self.alloc();
        let embedded = match &self.font {
            FontFace::Helvetica => None,
            FontFace::Embedded(f) => Some((
                f.base_name.clone(),
                f.ascent(),
                f.descent(),
                f.used_glyphs()
                    .iter()
                    .map(|(&gid, &c)| (gid, c, f.glyph_advance(gid)))
                    .collect::<Vec<_>>(),
                compress(&f.data),
            )),
        };

        let Some((base, ascent, descent, glyphs, file)) = embedded else {
            self.pdf
                .type1_font(font_id)
                .base_font(Name(b"Helvetica"))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            return font_id;
        };

        let cid_id = self.alloc();
        let descriptor_id = self.alloc();
        let file_id = self.alloc();
        let cmap_id = self.alloc();
        let base = Name(base.as_bytes());

        self.pdf
            .type0_font(font_id)
            .base_font(base)
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_id)
            .to_unicode(cmap_id);

        {
            let mut cid = self.pdf.cid_font(cid_id);
            cid.subtype(CidFontType::Type2)
                .base_font(base)
                .system_info(IDENTITY)
                .font_descriptor(descriptor_id)
                .default_width(1000.0)
                .cid_to_gid_map_predefined(Name(b"Identity"));
            let mut widths = cid.widths();
            for (gid, _, advance) in &glyphs {
                widths.consecutive(*gid, [*advance]);
            }
        }

        self.pdf
            .font_descriptor(descriptor_id)
            .name(base)
            .flags(FontFlags::NON_SYMBOLIC)
            .bbox(pdf_writer::Rect::new(0.0, descent, 1000.0, ascent))
            .italic_angle(0.0)
            .ascent(ascent)
            .descent(descent)
            .cap_height(ascent)
            .stem_v(80.0)
            .font_file2(file_id);

        self.pdf
            .stream(file_id, &file)
            .filter(Filter::FlateDecode);

        let mut cmap = UnicodeCmap::new(Name(b"Custom"), IDENTITY);
        for (gid, c, _) in &glyphs {
            cmap.pair(*gid, *c);
        }
        self.pdf.cmap(cmap_id, &cmap.finish());

        font_id
    }
}

impl Canvas for PdfCanvas {
    fn add_page(&mut self) {
        self.pages.push(Content::new());
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn register_image(&mut self, image: &RasterImage) -> ImageId {
        let image_id = self.alloc();
        let mask_id = image.alpha.as_ref().map(|_| self.alloc());

        let data = compress(&image.rgb);
        {
            let mut xobject = self.pdf.image_xobject(image_id, &data);
            xobject.filter(Filter::FlateDecode);
            xobject.width(image.width as i32);
            xobject.height(image.height as i32);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            if let Some(mask_id) = mask_id {
                xobject.s_mask(mask_id);
            }
        }

        if let (Some(mask_id), Some(alpha)) = (mask_id, &image.alpha) {
            let data = compress(alpha);
            let mut mask = self.pdf.image_xobject(mask_id, &data);
            mask.filter(Filter::FlateDecode);
            mask.width(image.width as i32);
            mask.height(image.height as i32);
            mask.color_space().device_gray();
            mask.bits_per_component(8);
        }

        self.images.push(image_id);
        ImageId(self.images.len() - 1)
    }

    fn draw_image(&mut self, image: ImageId, rect: Rect) {
        let name = format!("Im{}", image.0);
        let matrix = [
            mm(rect.w),
            0.0,
            0.0,
            mm(rect.h),
            mm(rect.x),
            mm(PAGE_HEIGHT_MM - rect.y - rect.h),
        ];
        let content = self.current();
        content.save_state();
        content.transform(matrix);
        content.x_object(Name(name.as_bytes()));
        content.restore_state();
    }

    fn draw_text(&mut self, x: f32, baseline: f32, text: &str, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let encoded = self.font.encode(text);
        let (r, g, b) = (
            f32::from(style.color.0) / 255.0,
            f32::from(style.color.1) / 255.0,
            f32::from(style.color.2) / 255.0,
        );
        let content = self.current();
        content.save_state();
        content.set_fill_rgb(r, g, b);
        if style.bold {
            content.set_stroke_rgb(r, g, b);
            content.set_line_width(mm(BOLD_STROKE_MM));
        }
        content.begin_text();
        content.set_font(FONT_NAME, style.size_pt);
        if style.bold {
            content.set_text_rendering_mode(TextRenderingMode::FillStroke);
        }
        content.next_line(mm(x), mm(PAGE_HEIGHT_MM - baseline));
        content.show(Str(&encoded));
        content.end_text();
        content.restore_state();
    }

    fn stroke_rect(&mut self, rect: Rect, line_width: f32) {
        let content = self.current();
        content.save_state();
        content.set_line_width(mm(line_width));
        content.rect(
            mm(rect.x),
            mm(PAGE_HEIGHT_MM - rect.y - rect.h),
            mm(rect.w),
            mm(rect.h),
        );
        content.stroke();
        content.restore_state();
    }

    fn char_width(&self, c: char, size_pt: f32) -> f32 {
        self.font.char_width_mm(c, size_pt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::canvas::Rgb;
    use crate::layout::font::tests::fixture_font_path;
    use crate::layout::font::EmbeddedFont;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn empty_document_is_valid_pdf() {
        let bytes = PdfCanvas::new(FontFace::Helvetica).finish();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(count(&bytes, b"/Count 0") == 1);
    }

    #[test]
    fn pages_images_and_title_are_written() {
        let mut canvas = PdfCanvas::new(FontFace::Helvetica);
        canvas.set_title("Report");
        let img = RasterImage {
            width: 2,
            height: 1,
            rgb: vec![255, 0, 0, 0, 0, 255],
            alpha: Some(vec![255, 0]),
        };
        let id = canvas.register_image(&img);
        canvas.add_page();
        canvas.draw_image(id, Rect::new(0.0, 0.0, 210.0, 297.0));
        canvas.add_page();
        canvas.draw_image(id, Rect::new(0.0, 0.0, 210.0, 297.0));
        canvas.draw_text(10.0, 20.0, "Hello", &TextStyle::new(12.0, true, Rgb::BLACK));
        canvas.stroke_rect(Rect::new(30.0, 56.0, 150.0, 50.0), 0.2);
        assert_eq!(canvas.page_count(), 2);

        let bytes = canvas.finish();
        let pages = count(&bytes, b"/Type /Page") - count(&bytes, b"/Type /Pages");
        assert_eq!(pages, 2);
        assert!(count(&bytes, b"/Count 2") == 1);
        assert_eq!(count(&bytes, b"/Subtype /Image"), 2, "image plus soft mask");
        assert!(count(&bytes, b"/SMask") >= 1);
        assert!(count(&bytes, b"/Helvetica") >= 1);
        assert!(count(&bytes, b"(Report)") == 1);
    }

    #[test]
    fn embedded_font_is_written_as_cid_font() {
        let font = EmbeddedFont::open(&fixture_font_path()).unwrap();
        let mut canvas = PdfCanvas::new(FontFace::Embedded(Box::new(font)));
        canvas.add_page();
        canvas.draw_text(10.0, 20.0, "Name: Test", &TextStyle::new(14.0, true, Rgb::BLACK));

        let bytes = canvas.finish();
        assert!(count(&bytes, b"/Subtype /Type0") == 1);
        assert!(count(&bytes, b"/Subtype /CIDFontType2") == 1);
        assert!(count(&bytes, b"/Identity-H") == 1);
        assert!(count(&bytes, b"/ToUnicode") == 1);
        assert!(count(&bytes, b"/FontFile2") == 1);
        assert!(count(&bytes, b"/DejaVuSansMono") >= 1);
        assert_eq!(count(&bytes, b"/Helvetica"), 0);
        assert!(count(&bytes, b"beginbfchar") >= 1);
    }

    #[test]
    fn draw_before_add_page_opens_a_page() {
        let mut canvas = PdfCanvas::new(FontFace::Helvetica);
        canvas.stroke_rect(Rect::new(0.0, 0.0, 1.0, 1.0), 0.1);
        assert_eq!(canvas.page_count(), 1);
    }
}
