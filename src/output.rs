//! Output types returned by the report pipeline.

use crate::error::RenderWarning;
use crate::pipeline::input::ImageSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Who and when a report is for.
///
/// Caller-supplied values take precedence over values found in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Name printed on the header page and in the identifier.
    pub name: String,
    /// Display date, `YYYY-MM-DD` unless the text supplied something else.
    pub date: String,
    /// The analysed image, if known. Used for the header thumbnail.
    pub source_image: Option<ImageSource>,
}

/// A rendered report held in memory, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct AssembledReport {
    /// `生命之花分析报告-{name}{MM.DD}`; also the output file stem.
    pub identifier: String,
    pub metadata: ReportMetadata,
    /// Complete PDF bytes.
    pub document: Vec<u8>,
    /// Pages in the document, the cover included.
    pub page_count: usize,
    /// Sections that produced output.
    pub sections_rendered: usize,
    /// Degradations noticed along the way.
    pub warnings: Vec<RenderWarning>,
}

/// Result of a complete run: where things were written and what they hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    pub identifier: String,
    /// The written PDF.
    pub pdf_path: PathBuf,
    /// Archived raw analysis text, when the run called the model.
    pub text_path: Option<PathBuf>,
    pub metadata: ReportMetadata,
    pub page_count: usize,
    pub sections_rendered: usize,
    pub warnings: Vec<RenderWarning>,
}

impl ReportOutput {
    pub(crate) fn from_assembled(
        report: AssembledReport,
        pdf_path: PathBuf,
        text_path: Option<PathBuf>,
    ) -> Self {
        Self {
            identifier: report.identifier,
            pdf_path,
            text_path,
            metadata: report.metadata,
            page_count: report.page_count,
            sections_rendered: report.sections_rendered,
            warnings: report.warnings,
        }
    }
}

/// The model's answer for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Raw text as returned, before any normalisation.
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Wall-clock time including retries.
    pub duration_ms: u64,
    /// Retries needed (0 = first attempt succeeded).
    pub retries: u32,
}
