//! Integration tests for report assembly.
//!
//! Everything here runs offline: assets are generated PNGs in a temp
//! directory. Unless a test copies in the fixture font, no font is installed
//! and the Helvetica fallback is used.
//! The model call is not exercised; `generate_from_text_file` stands in for
//! the full run from the archived text onwards.

use fol_report::{
    assemble, generate_from_text_file, split_sections, write_report, AssetKind, DuplicatePolicy,
    ImageSource, RenderWarning, ReportConfig, ReportError,
};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// ── Test helpers ─────────────────────────────────────────────────────────────

const TITLES: [&str; 8] = [
    "图案结构解读",
    "颜色能量解读",
    "绘画表现方式",
    "性格与核心天赋",
    "荣格原型分析",
    "职业与发展方向",
    "成长与建议",
    "总结金句",
];

fn write_png(path: &Path, w: u32, h: u32, color: [u8; 3]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(w, h, Rgb(color)).save(path).unwrap();
}

/// Cover, background and fallback thumbnail under `dir`, no font.
fn make_assets(dir: &Path) {
    write_png(&dir.join("fengmian.png"), 42, 60, [200, 180, 220]);
    write_png(&dir.join("background.png"), 42, 60, [250, 245, 240]);
    write_png(&dir.join("flower.png"), 16, 16, [255, 0, 128]);
}

fn config(assets: &Path, out: &Path) -> ReportConfig {
    ReportConfig::builder()
        .assets_dir(assets)
        .output_dir(out)
        .build()
        .unwrap()
}

/// Eight headings, each with two plain lines and one bullet.
fn analysis_text() -> String {
    let mut s = String::from("**生命之花分析报告**\n\n");
    for (i, t) in TITLES.iter().enumerate() {
        s.push_str(&format!("### {}. {}\n", i + 1, t));
        s.push_str(&format!("第{}部分的第一行。\n", i + 1));
        s.push_str("**重点**在于平衡。\n");
        s.push_str("- 要点\n\n");
    }
    s
}

fn today_md() -> String {
    chrono::Local::now().format("%m.%d").to_string()
}

fn dir_is_empty(dir: &Path) -> bool {
    !dir.exists() || std::fs::read_dir(dir).unwrap().next().is_none()
}

// ── Assembly ────────────────────────────────────────────────────────────────

#[test]
fn full_report_from_text() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    let out = tmp.path().join("output");
    make_assets(&assets);

    let report = assemble(&analysis_text(), None, Some("Test User"), &config(&assets, &out)).unwrap();

    assert_eq!(report.metadata.name, "Test User");
    assert_eq!(
        report.metadata.date,
        chrono::Local::now().format("%Y-%m-%d").to_string()
    );
    assert_eq!(
        report.identifier,
        format!("生命之花分析报告-Test User{}", today_md())
    );
    assert_eq!(report.sections_rendered, 8);
    // cover + header page at least
    assert!(report.page_count >= 2, "pages: {}", report.page_count);
    assert!(report.document.starts_with(b"%PDF-"));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, RenderWarning::FontFallback { .. })));
    assert!(!report.warnings.contains(&RenderWarning::NoSections));

    let path = write_report(&report, &out).unwrap();
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        format!("生命之花分析报告-Test User{}.pdf", today_md())
    );
    assert_eq!(std::fs::read(&path).unwrap(), report.document);
}

#[test]
fn installed_font_is_embedded_without_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    make_assets(&assets);
    std::fs::create_dir_all(assets.join("fonts")).unwrap();
    std::fs::copy(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf"),
        assets.join("fonts/simhei.ttf"),
    )
    .unwrap();

    let report = assemble(&analysis_text(), None, Some("Test User"), &config(&assets, tmp.path())).unwrap();
    assert!(!report
        .warnings
        .iter()
        .any(|w| matches!(w, RenderWarning::FontFallback { .. })));
    let has = |needle: &[u8]| report.document.windows(needle.len()).any(|w| w == needle);
    assert!(has(b"/FontFile2"));
    assert!(has(b"/ToUnicode"));
}

#[test]
fn sections_have_cleaned_three_line_bodies() {
    let sections = split_sections(&fol_report::normalize(&analysis_text()));
    assert_eq!(sections.len(), 8);
    for (i, t) in TITLES.iter().enumerate() {
        let key = format!("{}. {}", i + 1, t);
        let body = &sections.get(&key).unwrap().body;
        assert_eq!(body.lines().count(), 3, "{key}: {body:?}");
        assert!(!body.contains("**"));
    }
}

#[test]
fn text_metadata_is_used_without_caller_name() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    make_assets(&assets);

    let text = format!("姓名：李四\n日期：2024-03-05\n{}", analysis_text());
    let report = assemble(&text, None, None, &config(&assets, tmp.path())).unwrap();
    assert_eq!(report.metadata.name, "李四");
    assert_eq!(report.identifier, "生命之花分析报告-李四03.05");

    let report = assemble(&text, None, Some("王五"), &config(&assets, tmp.path())).unwrap();
    assert_eq!(report.metadata.name, "王五");
}

#[test]
fn text_without_sections_still_renders_header() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    make_assets(&assets);

    let report = assemble("模型没有按格式回答。", None, Some("a"), &config(&assets, tmp.path())).unwrap();
    assert_eq!(report.sections_rendered, 0);
    assert_eq!(report.page_count, 2);
    assert!(report.warnings.contains(&RenderWarning::NoSections));
}

#[test]
fn user_image_is_recorded_and_embedded() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    make_assets(&assets);
    let drawing = tmp.path().join("drawing.png");
    RgbaImage::from_pixel(8, 8, Rgba([0, 128, 255, 200]))
        .save(&drawing)
        .unwrap();

    let image = ImageSource::LocalPath(drawing.clone());
    let report = assemble(&analysis_text(), Some(&image), Some("a"), &config(&assets, tmp.path())).unwrap();
    assert_eq!(report.metadata.source_image, Some(image));
    assert!(!report
        .warnings
        .iter()
        .any(|w| matches!(w, RenderWarning::ThumbnailUnavailable { .. })));
}

#[test]
fn duplicate_headings_follow_policy() {
    let text = "1. 图案结构解读\n旧\n1. 图案结构解读\n新\n";
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    make_assets(&assets);

    let first = ReportConfig::builder()
        .assets_dir(&assets)
        .output_dir(tmp.path())
        .duplicate_policy(DuplicatePolicy::FirstWriteWins)
        .build()
        .unwrap();
    let report = assemble(text, None, Some("a"), &first).unwrap();
    assert_eq!(report.sections_rendered, 1);
}

// ── Failures ────────────────────────────────────────────────────────────────

#[test]
fn missing_cover_fails_and_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    let out = tmp.path().join("output");
    make_assets(&assets);
    std::fs::remove_file(assets.join("fengmian.png")).unwrap();
    let text_path = tmp.path().join("analysis.txt");
    std::fs::write(&text_path, analysis_text()).unwrap();

    let err = generate_from_text_file(&text_path, None, Some("a"), &config(&assets, &out))
        .unwrap_err();
    assert!(
        matches!(err, ReportError::AssetMissing { asset: AssetKind::Cover, .. }),
        "{err:?}"
    );
    assert!(dir_is_empty(&out));
}

#[test]
fn corrupt_background_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    make_assets(&assets);
    std::fs::write(assets.join("background.png"), b"not a png").unwrap();

    let err = assemble(&analysis_text(), None, None, &config(&assets, tmp.path())).unwrap_err();
    assert!(matches!(err, ReportError::AssetUnreadable { .. }), "{err:?}");
}

// ── Re-render from archived text ────────────────────────────────────────────

#[test]
fn generate_from_text_file_writes_pdf() {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    let out = tmp.path().join("output");
    make_assets(&assets);
    let text_path = tmp.path().join("20240305_101500_张三_drawing.txt");
    std::fs::write(&text_path, analysis_text()).unwrap();

    let output = generate_from_text_file(&text_path, None, Some("张三"), &config(&assets, &out)).unwrap();
    assert_eq!(output.pdf_path.parent().unwrap(), out);
    assert!(output.pdf_path.is_file());
    assert!(output.text_path.is_none());
    assert_eq!(output.sections_rendered, 8);
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);

    let json = serde_json::to_string(&output).unwrap();
    assert!(json.contains("张三"));
}
