//! Error types for the fol-report library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`ReportError`]: **fatal**, the report cannot be produced at all
//!   (cover art missing, output directory not writable, provider not
//!   configured). Returned as `Err(ReportError)` from the top-level
//!   `assemble`/`generate*` functions.
//!
//! * [`RenderWarning`]: **non-fatal**, something degraded (the CJK font is
//!   missing, the user's thumbnail could not be decoded) but the document is
//!   still complete. Collected on [`crate::output::AssembledReport`] so callers
//!   can surface them without losing the report.
//!
//! Parsing-stage problems (malformed headings, missing name or date lines) are
//! neither: they are resolved locally by defaulting and never surface here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which fixed render-time asset an [`ReportError::AssetMissing`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// Full-bleed art on the first page.
    Cover,
    /// Full-bleed art behind every content page.
    Background,
    /// Thumbnail used when the user's own image is unavailable.
    FallbackThumbnail,
    /// TrueType font covering CJK text.
    Font,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::Cover => "cover image",
            AssetKind::Background => "background image",
            AssetKind::FallbackThumbnail => "fallback thumbnail",
            AssetKind::Font => "font",
        };
        f.write_str(name)
    }
}

/// All fatal errors returned by the fol-report library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The analysis text file could not be read.
    #[error("Cannot read analysis text '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image reference is neither an existing file nor an HTTP/HTTPS URL.
    #[error("Invalid image '{input}': not an existing file or a valid HTTP/HTTPS URL")]
    InvalidImageSource { input: String },

    /// The image is larger than the provider accepts.
    #[error("Image is {size} bytes, larger than the {limit}-byte limit.\nCompress it and try again.")]
    ImageTooLarge { size: usize, limit: usize },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Asset errors ──────────────────────────────────────────────────────
    /// A required render asset does not exist.
    #[error("Required {asset} not found at '{path}'\nCheck --assets-dir.")]
    AssetMissing { asset: AssetKind, path: PathBuf },

    /// A required render asset exists but could not be decoded.
    #[error("Cannot load {asset} '{path}': {detail}")]
    AssetUnreadable {
        asset: AssetKind,
        path: PathBuf,
        detail: String,
    },

    // ── Layout errors ─────────────────────────────────────────────────────
    /// The layout engine was driven out of order (e.g. sections before the cover).
    #[error("Layout step '{step}' is not allowed after '{after}'")]
    LayoutState {
        step: &'static str,
        after: &'static str,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API kept failing after all retries.
    #[error("LLM API error after {retries} retries: {message}")]
    LlmApiError { retries: u32, message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal degradation noticed while building a report.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RenderWarning {
    /// The CJK font could not be loaded; built-in Helvetica was used instead
    /// and characters outside Latin-1 render blank.
    #[error("font '{path}' unavailable ({detail}); falling back to Helvetica")]
    FontFallback { path: PathBuf, detail: String },

    /// Neither the user's image nor the fallback thumbnail could be embedded.
    #[error("no thumbnail could be embedded: {detail}")]
    ThumbnailUnavailable { detail: String },

    /// The analysis text contained none of the expected section headings.
    #[error("no recognizable sections in the analysis text; report has header only")]
    NoSections,
}
