//! Report assembly: raw analysis text in, finished PDF bytes out.
//!
//! ```text
//! raw text ─▶ normalize ─▶ extract_metadata ─┐
//!                        └▶ strip_title_line ─▶ split_sections ─┐
//!                    load_assets (cover, background, font, thumbnail)
//!                                                                ▼
//!                                        LayoutEngine<PdfCanvas> ─▶ bytes
//! ```
//!
//! Everything here is synchronous and CPU-bound. Async callers run it on
//! `spawn_blocking` (see [`crate::analyze::generate_report`]).

use crate::assets::load_assets;
use crate::config::ReportConfig;
use crate::error::{ReportError, RenderWarning};
use crate::layout::pdf::PdfCanvas;
use crate::layout::canvas::Canvas;
use crate::layout::LayoutEngine;
use crate::output::{AssembledReport, ReportMetadata, ReportOutput};
use crate::pipeline::input::ImageSource;
use crate::pipeline::metadata::{extract_metadata, strip_title_line, DATE_FORMAT};
use crate::pipeline::normalize::normalize;
use crate::pipeline::sections::split_sections_with;
use crate::progress::ReportStage;
use crate::REPORT_TITLE;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Turn raw analysis text into a complete report document.
///
/// `image` (the analysed picture) and `user_name` take precedence over any
/// `图片路径：` / `姓名：` lines in the text. Fails only on missing or corrupt
/// cover/background art; nothing is written to disk.
pub fn assemble(
    raw_text: &str,
    image: Option<&ImageSource>,
    user_name: Option<&str>,
    config: &ReportConfig,
) -> Result<AssembledReport, ReportError> {
    let text = normalize(raw_text);

    let mut metadata = extract_metadata(&text, user_name);
    if let Some(image) = image {
        metadata.source_image = Some(image.clone());
    }

    let body = strip_title_line(&text);
    let sections = split_sections_with(&body, config.duplicate_policy);

    let assets = load_assets(&config.assets, metadata.source_image.as_ref())?;
    let mut warnings = assets.warnings;
    if sections.non_empty().next().is_none() {
        warn!("No sections found in analysis text");
        warnings.push(RenderWarning::NoSections);
    }

    let identifier = report_identifier(&metadata);
    let mut canvas = PdfCanvas::new(assets.font);
    canvas.set_title(identifier.clone());

    let mut engine = LayoutEngine::new(canvas);
    engine.render_cover(&assets.cover)?;
    engine.render_header(&assets.background, &metadata, assets.thumbnail.as_ref())?;
    let mut sections_rendered = 0;
    for section in sections.non_empty() {
        engine.render_section(section)?;
        sections_rendered += 1;
    }

    let canvas = engine.finish();
    let page_count = canvas.page_count();
    let document = canvas.finish();

    if let Some(cb) = &config.progress_callback {
        for w in &warnings {
            cb.on_warning(&w.to_string());
        }
    }

    info!(
        "Assembled '{}': {} pages, {} sections, {} bytes",
        identifier,
        page_count,
        sections_rendered,
        document.len()
    );

    Ok(AssembledReport {
        identifier,
        metadata,
        document,
        page_count,
        sections_rendered,
        warnings,
    })
}

/// `生命之花分析报告-{name}{MM.DD}`.
///
/// MM.DD comes from the metadata date when it parses as `YYYY-MM-DD`, and
/// from today otherwise.
pub fn report_identifier(metadata: &ReportMetadata) -> String {
    let month_day = NaiveDate::parse_from_str(metadata.date.trim(), DATE_FORMAT)
        .map(|d| d.format("%m.%d").to_string())
        .unwrap_or_else(|_| chrono::Local::now().format("%m.%d").to_string());
    format!("{}-{}{}", REPORT_TITLE, metadata.name, month_day)
}

/// Write the document to `{dir}/{identifier}.pdf`.
///
/// The directory is created if needed. The bytes go to a temp file first
/// and are renamed into place, so a reader never sees a half-written PDF.
pub fn write_report(report: &AssembledReport, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join(format!("{}.pdf", sanitize_file_name(&report.identifier)));
    let fail = |source| ReportError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(fail)?;
    let tmp_path = path.with_extension("pdf.tmp");
    std::fs::write(&tmp_path, &report.document).map_err(fail)?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(fail(e));
    }

    debug!("Wrote {} bytes to {}", report.document.len(), path.display());
    Ok(path)
}

/// Re-render a report from an archived analysis text file.
///
/// Reports the `Render` and `Write` stages to the configured progress
/// callback.
pub fn generate_from_text_file(
    text_path: &Path,
    image: Option<&ImageSource>,
    user_name: Option<&str>,
    config: &ReportConfig,
) -> Result<ReportOutput, ReportError> {
    let report = run_stage(config, ReportStage::Render, || {
        let raw =
            std::fs::read_to_string(text_path).map_err(|e| ReportError::InputUnreadable {
                path: text_path.to_path_buf(),
                source: e,
            })?;
        let r = assemble(&raw, image, user_name, config)?;
        let detail = format!("{} pages", r.page_count);
        Ok((r, detail))
    })?;
    let pdf_path = run_stage(config, ReportStage::Write, || {
        let p = write_report(&report, &config.output_dir)?;
        let detail = p.display().to_string();
        Ok((p, detail))
    })?;
    Ok(ReportOutput::from_assembled(report, pdf_path, None))
}

/// Synchronous counterpart of the async stage runner in `analyze`.
fn run_stage<T>(
    config: &ReportConfig,
    stage: ReportStage,
    f: impl FnOnce() -> Result<(T, String), ReportError>,
) -> Result<T, ReportError> {
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_stage_start(stage);
    }
    match f() {
        Ok((value, detail)) => {
            if let Some(cb) = cb {
                cb.on_stage_complete(stage, &detail);
            }
            Ok(value)
        }
        Err(e) => {
            warn!("Stage '{}' failed: {}", stage, e);
            if let Some(cb) = cb {
                cb.on_error(stage, &e.to_string());
            }
            Err(e)
        }
    }
}

/// Replace characters that are not allowed in file names on common systems.
/// The identifier itself is left untouched.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}
