//! Header extraction: name, date and image path from fixed-format lines.
//!
//! The model is asked for an analysis, not a form, but transcripts that were
//! edited by hand (or produced by older prompts) carry `姓名：…` / `日期：…`
//! lines near the top. These are picked up here and merged with whatever the
//! caller supplied; caller values always win.

use crate::output::ReportMetadata;
use crate::pipeline::input::ImageSource;
use crate::REPORT_TITLE;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Display format of [`ReportMetadata::date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Name shown when neither the caller nor the text provides one.
pub const UNKNOWN_NAME: &str = "未知";

// Labels accept either an ASCII or a full-width colon.
static RE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t]*(?:姓名|name)[ \t]*[:：][ \t]*(.+)$").unwrap());
static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t]*(?:日期|date)[ \t]*[:：][ \t]*(.+)$").unwrap());
static RE_IMAGE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:图片路径|image[ _-]?path)[ \t]*[:：][ \t]*(.+)$").unwrap()
});
static RE_TITLE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*{}[ \t]*(?:\n|$)",
        regex::escape(REPORT_TITLE)
    ))
    .unwrap()
});

/// Build the report metadata from normalised text and an optional caller name.
///
/// * A non-empty `user_name` overrides any `姓名：` / `Name:` line.
/// * A missing date becomes today's local date (`YYYY-MM-DD`).
/// * A missing image path is `None`; the assembler falls back to the default
///   thumbnail asset.
pub fn extract_metadata(text: &str, user_name: Option<&str>) -> ReportMetadata {
    let name = user_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| capture(&RE_NAME, text))
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    let date = capture(&RE_DATE, text).unwrap_or_else(today);
    let source_image = capture(&RE_IMAGE_PATH, text).map(|s| ImageSource::parse(&s));

    debug!(
        "Metadata: name={:?} date={:?} image={:?}",
        name, date, source_image
    );

    ReportMetadata {
        name,
        date,
        source_image,
    }
}

/// Remove standalone report-title lines (`生命之花分析报告`) from the body.
pub fn strip_title_line(text: &str) -> String {
    RE_TITLE_LINE.replace_all(text, "").into_owned()
}

/// Today's local date in [`DATE_FORMAT`].
pub fn today() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|v| !v.is_empty())
}
