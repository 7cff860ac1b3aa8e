//! Paginated page layout for the report.
//!
//! [`LayoutEngine`] owns the [`Canvas`] and a [`LayoutCursor`] and walks a
//! fixed sequence of page kinds:
//!
//! ```text
//! start ──▶ Cover ──▶ Header ──▶ (sections, adding Continuation pages)
//! ```
//!
//! Geometry is millimetres on a 210 × 297 portrait page, origin top-left.
//! Text is placed in cells: a cell of height `h` puts its baseline at
//! `y + h/2 + 0.3·font size` and pads left-aligned text by
//! [`CELL_PADDING_MM`].
//!
//! ## Pagination
//!
//! There is no automatic page break. Before every physical line of body text
//! (and before each section title) the engine checks `y > PAGE_BREAK_Y_MM`
//! and, if so, starts a continuation page at the same x. Page index therefore
//! only grows, and grows exactly when content would cross the bottom margin.

pub mod canvas;
pub mod font;
pub mod pdf;
pub mod wrap;

use crate::error::ReportError;
use crate::output::ReportMetadata;
use crate::pipeline::normalize::BULLET_PREFIX;
use crate::pipeline::sections::Section;
use crate::{REPORT_SUBTITLES, REPORT_TITLE};
use canvas::{Canvas, ImageId, RasterImage, Rect, Rgb, TextStyle};
use font::PT_TO_MM;
use tracing::debug;
use wrap::wrap_lines;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Left, right and top margin.
pub const MARGIN_MM: f32 = 10.0;
/// Horizontal padding inside a text cell.
pub const CELL_PADDING_MM: f32 = 1.0;
/// A line starting below this y goes to a new page.
pub const PAGE_BREAK_Y_MM: f32 = 250.0;

const TITLE_BLUE: Rgb = Rgb(57, 96, 156);
const SUBTITLE_GREY: Rgb = Rgb(100, 100, 100);

const TITLE_STYLE: TextStyle = TextStyle::new(20.0, true, TITLE_BLUE);
const SUBTITLE_STYLE: TextStyle = TextStyle::new(12.0, false, SUBTITLE_GREY);
const LABEL_STYLE: TextStyle = TextStyle::new(14.0, true, Rgb::BLACK);
const SECTION_TITLE_STYLE: TextStyle = TextStyle::new(16.0, true, TITLE_BLUE);
const BODY_STYLE: TextStyle = TextStyle::new(12.0, false, Rgb::BLACK);

const INFO_BOX_W: f32 = 150.0;
const INFO_BOX_H: f32 = 50.0;
const THUMBNAIL_MM: f32 = 40.0;
const BOX_LINE_MM: f32 = 0.2;

const BODY_LINE_H: f32 = 8.0;
const BULLET_X: f32 = 20.0;
const BULLET_TEXT_X: f32 = 25.0;

/// Which kind of page the engine last started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Header,
    Continuation,
}

impl PageKind {
    fn as_str(self) -> &'static str {
        match self {
            PageKind::Cover => "cover",
            PageKind::Header => "header",
            PageKind::Continuation => "continuation",
        }
    }
}

/// Current position: page (0-based) and point on it in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    pub page_index: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

/// Draws the report onto a canvas page by page.
pub struct LayoutEngine<C: Canvas> {
    canvas: C,
    cursor: LayoutCursor,
    page: Option<PageKind>,
    background: Option<ImageId>,
}

impl<C: Canvas> LayoutEngine<C> {
    pub fn new(canvas: C) -> Self {
        Self {
            canvas,
            cursor: LayoutCursor {
                page_index: 0,
                x: MARGIN_MM,
                y: MARGIN_MM,
            },
            page: None,
            background: None,
        }
    }

    pub fn cursor(&self) -> LayoutCursor {
        self.cursor
    }

    pub fn page_kind(&self) -> Option<PageKind> {
        self.page
    }

    /// Read access to the canvas, mostly for inspection in tests.
    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    fn state_name(&self) -> &'static str {
        self.page.map_or("start", PageKind::as_str)
    }

    /// First page: the cover image, full bleed, nothing else. Only valid once,
    /// before anything else.
    pub fn render_cover(&mut self, cover: &RasterImage) -> Result<(), ReportError> {
        if self.page.is_some() {
            return Err(ReportError::LayoutState {
                step: "cover",
                after: self.state_name(),
            });
        }
        let id = self.canvas.register_image(cover);
        self.begin_page(PageKind::Cover);
        self.canvas.draw_image(id, full_page());
        Ok(())
    }

    /// Second page: background, title block and the name/date box.
    pub fn render_header(
        &mut self,
        background: &RasterImage,
        metadata: &ReportMetadata,
        thumbnail: Option<&RasterImage>,
    ) -> Result<(), ReportError> {
        if self.page != Some(PageKind::Cover) {
            return Err(ReportError::LayoutState {
                step: "header",
                after: self.state_name(),
            });
        }
        let bg = self.canvas.register_image(background);
        self.background = Some(bg);
        self.start_background_page(PageKind::Header);

        self.cell(0.0, 10.0, REPORT_TITLE, &TITLE_STYLE, Align::Center, true);
        self.ln(5.0);
        for line in REPORT_SUBTITLES {
            self.cell(0.0, 8.0, line, &SUBTITLE_STYLE, Align::Center, true);
        }
        self.ln(10.0);

        let box_x = (PAGE_WIDTH_MM - INFO_BOX_W) / 2.0;
        let box_y = self.cursor.y;
        self.canvas
            .stroke_rect(Rect::new(box_x, box_y, INFO_BOX_W, INFO_BOX_H), BOX_LINE_MM);

        // Two 8 mm label lines, centred vertically in the box.
        let label_y = box_y + (INFO_BOX_H - 16.0) / 2.0;
        self.set_xy(box_x + 10.0, label_y);
        let name = format!("姓名：{}", metadata.name);
        self.cell(80.0, 8.0, &name, &LABEL_STYLE, Align::Left, false);
        self.set_xy(box_x + 10.0, label_y + 8.0);
        let date = format!("日期：{}", metadata.date);
        self.cell(80.0, 8.0, &date, &LABEL_STYLE, Align::Left, false);

        if let Some(thumb) = thumbnail {
            let id = self.canvas.register_image(thumb);
            self.canvas.draw_image(
                id,
                Rect::new(
                    box_x + INFO_BOX_W - THUMBNAIL_MM - 10.0,
                    box_y + (INFO_BOX_H - THUMBNAIL_MM) / 2.0,
                    THUMBNAIL_MM,
                    THUMBNAIL_MM,
                ),
            );
        }

        self.set_xy(MARGIN_MM, box_y + INFO_BOX_H + 10.0);
        Ok(())
    }

    /// Render one titled section at the cursor, paginating as needed.
    /// Empty bodies render nothing.
    pub fn render_section(&mut self, section: &Section) -> Result<(), ReportError> {
        match self.page {
            Some(PageKind::Header) | Some(PageKind::Continuation) => {}
            _ => {
                return Err(ReportError::LayoutState {
                    step: "section",
                    after: self.state_name(),
                })
            }
        }
        if section.body.is_empty() {
            debug!("Skipping empty section '{}'", section.key);
            return Ok(());
        }

        self.ensure_room();
        self.cell(0.0, 10.0, &section.key, &SECTION_TITLE_STYLE, Align::Left, true);
        self.ln(2.0);

        for line in section.body.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                self.ln(5.0);
                continue;
            }
            self.ensure_room();
            match line.strip_prefix(BULLET_PREFIX) {
                Some(rest) => {
                    self.cursor.x = BULLET_X;
                    self.cell(5.0, BODY_LINE_H, "•", &BODY_STYLE, Align::Left, false);
                    self.cursor.x = BULLET_TEXT_X;
                    self.multi_cell(BODY_LINE_H, rest.trim(), &BODY_STYLE);
                }
                None => self.multi_cell(BODY_LINE_H, line, &BODY_STYLE),
            }
            self.ln(4.0);
        }
        self.ln(8.0);
        Ok(())
    }

    /// Consume the engine and hand back the canvas.
    pub fn finish(self) -> C {
        self.canvas
    }

    // ── primitives ───────────────────────────────────────────────────────

    fn begin_page(&mut self, kind: PageKind) {
        self.canvas.add_page();
        self.page = Some(kind);
        self.cursor = LayoutCursor {
            page_index: self.canvas.page_count() - 1,
            x: MARGIN_MM,
            y: MARGIN_MM,
        };
    }

    fn start_background_page(&mut self, kind: PageKind) {
        self.begin_page(kind);
        if let Some(bg) = self.background {
            self.canvas.draw_image(bg, full_page());
        }
        self.ln(5.0);
    }

    fn start_continuation(&mut self) {
        let x = self.cursor.x;
        self.start_background_page(PageKind::Continuation);
        // Keep clear of the logo in the background art.
        for _ in 0..4 {
            self.ln(8.0);
        }
        self.cursor.x = x;
        debug!("Continuation page {}", self.cursor.page_index + 1);
    }

    fn ensure_room(&mut self) {
        if self.cursor.y > PAGE_BREAK_Y_MM {
            self.start_continuation();
        }
    }

    fn ln(&mut self, h: f32) {
        self.cursor.x = MARGIN_MM;
        self.cursor.y += h;
    }

    fn set_xy(&mut self, x: f32, y: f32) {
        self.cursor.x = x;
        self.cursor.y = y;
    }

    fn cell_width(&self, w: f32) -> f32 {
        if w == 0.0 {
            PAGE_WIDTH_MM - MARGIN_MM - self.cursor.x
        } else {
            w
        }
    }

    fn cell(&mut self, w: f32, h: f32, text: &str, style: &TextStyle, align: Align, ln: bool) {
        let w = self.cell_width(w);
        if !text.is_empty() {
            let x = match align {
                Align::Left => self.cursor.x + CELL_PADDING_MM,
                Align::Center => {
                    self.cursor.x + (w - self.canvas.text_width(text, style.size_pt)) / 2.0
                }
            };
            let baseline = self.cursor.y + 0.5 * h + 0.3 * style.size_pt * PT_TO_MM;
            self.canvas.draw_text(x, baseline, text, style);
        }
        if ln {
            self.ln(h);
        } else {
            self.cursor.x += w;
        }
    }

    /// Wrap `text` to the right margin from the current x, one cell per line.
    fn multi_cell(&mut self, h: f32, text: &str, style: &TextStyle) {
        let x = self.cursor.x;
        let w = self.cell_width(0.0);
        let max = w - 2.0 * CELL_PADDING_MM;
        let canvas = &self.canvas;
        let lines = wrap_lines(text, max, |c| canvas.char_width(c, style.size_pt));

        for line in &lines {
            self.ensure_room();
            self.cursor.x = x;
            self.cell(w, h, line, style, Align::Left, false);
            self.cursor.x = x;
            self.cursor.y += h;
        }
        self.cursor.x = MARGIN_MM;
    }
}

fn full_page() -> Rect {
    Rect::new(0.0, 0.0, PAGE_WIDTH_MM, PAGE_HEIGHT_MM)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One recorded draw call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Page,
        Image { id: usize, rect: Rect },
        Text { page: usize, x: f32, baseline: f32, text: String, size: f32 },
        Box { rect: Rect },
    }

    /// Canvas that records calls; every character is 1 mm per 10 pt.
    #[derive(Default)]
    pub struct RecordingCanvas {
        pub ops: Vec<Op>,
        pub images: usize,
        pages: usize,
    }

    impl RecordingCanvas {
        pub fn texts(&self) -> Vec<(usize, f32, f32, String)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text {
                        page,
                        x,
                        baseline,
                        text,
                        ..
                    } => Some((*page, *x, *baseline, text.clone())),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn add_page(&mut self) {
            self.pages += 1;
            self.ops.push(Op::Page);
        }
        fn page_count(&self) -> usize {
            self.pages
        }
        fn register_image(&mut self, _image: &RasterImage) -> ImageId {
            self.images += 1;
            ImageId(self.images - 1)
        }
        fn draw_image(&mut self, image: ImageId, rect: Rect) {
            self.ops.push(Op::Image { id: image.0, rect });
        }
        fn draw_text(&mut self, x: f32, baseline: f32, text: &str, style: &TextStyle) {
            self.ops.push(Op::Text {
                page: self.pages - 1,
                x,
                baseline,
                text: text.to_string(),
                size: style.size_pt,
            });
        }
        fn stroke_rect(&mut self, rect: Rect, _line_width: f32) {
            self.ops.push(Op::Box { rect });
        }
        fn char_width(&self, _c: char, size_pt: f32) -> f32 {
            size_pt / 10.0
        }
    }

    fn pixel() -> RasterImage {
        RasterImage {
            width: 1,
            height: 1,
            rgb: vec![0, 0, 0],
            alpha: None,
        }
    }

    fn meta() -> ReportMetadata {
        ReportMetadata {
            name: "张三".into(),
            date: "2024-03-05".into(),
            source_image: None,
        }
    }

    fn section(key: &str, body: &str) -> Section {
        Section {
            key: key.into(),
            body: body.into(),
        }
    }

    fn engine_after_header() -> LayoutEngine<RecordingCanvas> {
        let mut e = LayoutEngine::new(RecordingCanvas::default());
        e.render_cover(&pixel()).unwrap();
        e.render_header(&pixel(), &meta(), Some(&pixel())).unwrap();
        e
    }

    #[test]
    fn cover_is_one_full_bleed_image_and_no_text() {
        let mut e = LayoutEngine::new(RecordingCanvas::default());
        e.render_cover(&pixel()).unwrap();
        assert_eq!(e.page_kind(), Some(PageKind::Cover));
        let c = e.finish();
        assert_eq!(
            c.ops,
            vec![Op::Page, Op::Image { id: 0, rect: full_page() }]
        );
    }

    #[test]
    fn header_geometry() {
        let e = engine_after_header();
        assert_eq!(e.cursor().page_index, 1);
        assert_eq!(e.cursor().x, MARGIN_MM);
        assert!((e.cursor().y - 116.0).abs() < 1e-4);

        let c = e.canvas();
        assert!(c.ops.contains(&Op::Box {
            rect: Rect::new(30.0, 56.0, 150.0, 50.0)
        }));
        assert!(c.ops.contains(&Op::Image {
            id: 2,
            rect: Rect::new(130.0, 61.0, 40.0, 40.0)
        }));

        let texts = c.texts();
        let title = texts.iter().find(|t| t.3 == REPORT_TITLE).unwrap();
        // 8 characters of 2 mm each, centred in 190 mm starting at x = 10
        assert!((title.1 - (10.0 + (190.0 - 16.0) / 2.0)).abs() < 1e-4);
        let name = texts.iter().find(|t| t.3 == "姓名：张三").unwrap();
        assert_eq!(name.1, 41.0);
        let date = texts.iter().find(|t| t.3 == "日期：2024-03-05").unwrap();
        assert!(date.2 > name.2);
    }

    #[test]
    fn header_without_thumbnail_draws_no_third_image() {
        let mut e = LayoutEngine::new(RecordingCanvas::default());
        e.render_cover(&pixel()).unwrap();
        e.render_header(&pixel(), &meta(), None).unwrap();
        assert_eq!(e.canvas().images, 2);
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut e = LayoutEngine::new(RecordingCanvas::default());
        let s = section("1. 图案结构解读", "正文");
        assert!(matches!(
            e.render_section(&s),
            Err(ReportError::LayoutState { step: "section", after: "start" })
        ));
        assert!(matches!(
            e.render_header(&pixel(), &meta(), None),
            Err(ReportError::LayoutState { step: "header", .. })
        ));
        e.render_cover(&pixel()).unwrap();
        assert!(matches!(
            e.render_cover(&pixel()),
            Err(ReportError::LayoutState { step: "cover", after: "cover" })
        ));
        assert!(e.render_section(&s).is_err());
    }

    #[test]
    fn bullet_and_plain_lines() {
        let mut e = engine_after_header();
        e.render_section(&section("1. 图案结构解读", "普通行\n- 要点")).unwrap();
        let texts = e.finish().texts();
        let bullet = texts.iter().find(|t| t.3 == "•").unwrap();
        assert_eq!(bullet.1, BULLET_X + CELL_PADDING_MM);
        let item = texts.iter().find(|t| t.3 == "要点").unwrap();
        assert_eq!(item.1, BULLET_TEXT_X + CELL_PADDING_MM);
        assert_eq!(item.2, bullet.2, "bullet and text share a baseline");
        let plain = texts.iter().find(|t| t.3 == "普通行").unwrap();
        assert_eq!(plain.1, MARGIN_MM + CELL_PADDING_MM);
    }

    #[test]
    fn section_advances_cursor_by_fixed_steps() {
        let mut e = engine_after_header();
        let y0 = e.cursor().y;
        // title 10 + gap 2 + (line 8 + gap 4) + blank 5 + (line 8 + gap 4) + tail 8
        e.render_section(&section("2. 颜色能量解读", "一\n\n二")).unwrap();
        assert!((e.cursor().y - (y0 + 10.0 + 2.0 + 12.0 + 5.0 + 12.0 + 8.0)).abs() < 1e-4);
    }

    #[test]
    fn empty_section_draws_nothing() {
        let mut e = engine_after_header();
        let before = e.canvas().ops.len();
        e.render_section(&section("3. 绘画表现方式", "")).unwrap();
        assert_eq!(e.canvas().ops.len(), before);
    }

    #[test]
    fn long_line_wraps_within_right_margin() {
        let mut e = engine_after_header();
        // 12 pt → 1.2 mm per char; 188 mm usable → 156 chars per line
        let body = "字".repeat(400);
        e.render_section(&section("4. 性格与核心天赋", &body)).unwrap();
        let texts = e.finish().texts();
        let wrapped: Vec<_> = texts.iter().filter(|t| t.3.starts_with('字')).collect();
        assert_eq!(wrapped.len(), 3);
        for t in &wrapped {
            assert!(t.3.chars().count() as f32 * 1.2 <= 188.0 + 1e-3);
        }
        assert!((wrapped[1].2 - wrapped[0].2 - 8.0).abs() < 1e-4);
    }

    #[test]
    fn pagination_is_monotonic_and_breaks_only_past_the_limit() {
        let mut e = engine_after_header();
        let body = (0..60).map(|i| format!("第{i}行")).collect::<Vec<_>>().join("\n");
        let mut last_page = e.cursor().page_index;
        let mut last_top = e.cursor().y;
        e.render_section(&section("5. 荣格原型分析", &body)).unwrap();

        let c = e.finish();
        let mut page_starts = 0;
        for (page, _x, baseline, text) in c.texts().iter().skip_while(|t| t.3 != "5. 荣格原型分析") {
            // body cell top = baseline - 8/2 - 0.3 * 12 pt
            let top = baseline - 4.0 - 0.3 * 12.0 * PT_TO_MM;
            assert!(*page >= last_page, "page index went backwards at {text}");
            if *page > last_page {
                page_starts += 1;
                // one more 8 mm line + 4 mm gap would have started past the limit
                assert!(last_top + 12.0 > PAGE_BREAK_Y_MM, "early break before {text}");
                assert!((top - 47.0).abs() < 1e-3, "{text} not below the logo area");
            }
            assert!(top <= PAGE_BREAK_Y_MM + 1e-3, "{text} starts below the break line");
            last_page = *page;
            last_top = top;
        }
        assert_eq!(page_starts, 3);
        assert_eq!(c.page_count(), last_page + 1);
    }

    #[test]
    fn wrapped_bullet_keeps_its_indent_across_a_page_break() {
        let mut e = engine_after_header();
        // ten filler lines leave the cursor at y = 248, just above the limit
        let body = format!("{}\n- {}", vec!["行"; 10].join("\n"), "项".repeat(300));
        e.render_section(&section("7. 成长与建议", &body)).unwrap();
        let texts = e.finish().texts();
        let items: Vec<_> = texts.iter().filter(|t| t.3.starts_with('项')).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].0, 1);
        assert_eq!(items[1].0, 2, "second wrapped line moves to a continuation page");
        for t in items {
            assert_eq!(t.1, BULLET_TEXT_X + CELL_PADDING_MM);
        }
    }
}
