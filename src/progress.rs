//! Progress-callback trait for report generation stages.
//!
//! Inject an [`Arc<dyn ReportProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive events
//! as the end-to-end run moves from download to model call to layout.
//!
//! # Example
//!
//! ```rust
//! use fol_report::{ReportConfig, ReportProgressCallback, ReportStage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ReportProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: ReportStage) {
//!         eprintln!("→ {}", stage);
//!     }
//! }
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Coarse stages of one report run, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportStage {
    /// Resolving the image reference (download for URLs).
    FetchImage,
    /// Waiting on the vision model.
    Analyze,
    /// Writing the raw analysis text to the archive.
    SaveText,
    /// Normalising, splitting and laying out the document.
    Render,
    /// Writing the finished PDF.
    Write,
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportStage::FetchImage => "fetching image",
            ReportStage::Analyze => "analysing image",
            ReportStage::SaveText => "saving analysis text",
            ReportStage::Render => "rendering report",
            ReportStage::Write => "writing report",
        };
        f.write_str(s)
    }
}

/// Called by the report pipeline as it moves between stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: rendering
/// runs on a blocking worker thread.
pub trait ReportProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: ReportStage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// # Arguments
    /// * `stage`: the stage that finished
    /// * `detail`: short human-readable summary (token counts, a path, …)
    fn on_stage_complete(&self, stage: ReportStage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called once when a stage fails; no further events follow.
    fn on_error(&self, stage: ReportStage, error: &str) {
        let _ = (stage, error);
    }

    /// Called when a non-fatal rendering problem was recorded.
    fn on_warning(&self, warning: &str) {
        let _ = warning;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn ReportProgressCallback>;
