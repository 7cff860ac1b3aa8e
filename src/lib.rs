//! # fol-report
//!
//! Turn a "Flower of Life" (生命之花) mandala drawing into a styled,
//! multi-page PDF reading.
//!
//! The drawing is sent to a hosted vision model, which answers in loosely
//! structured Markdown under eight numbered headings. That answer is
//! normalised, split into its sections and laid out onto A4 pages with the
//! report's cover, background art and a name/date header block.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image (path or URL)
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Analyse    base64 image + prompt → vision model (edgequake-llm)
//!  ├─ 3. Archive    raw answer saved as {timestamp}_{name}_{stem}.txt
//!  ├─ 4. Normalise  strip emphasis, rules, bullet glyphs, blank runs
//!  ├─ 5. Parse      header fields + the eight canonical sections
//!  ├─ 6. Layout     cover → header page → sections (paginated)
//!  └─ 7. Output     生命之花分析报告-{name}{MM.DD}.pdf, written atomically
//! ```
//!
//! Steps 4–7 are synchronous and need no network; [`generate_from_text_file`]
//! re-renders an archived answer without calling the model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fol_report::{generate_report, AnalysisConfig, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analysis = AnalysisConfig::default();
//!     let report = ReportConfig::builder().assets_dir("assets").build()?;
//!     let out = generate_report("drawing.png", "张三", None, &analysis, &report).await?;
//!     println!("{}", out.pdf_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fol-report` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod assemble;
pub mod assets;
pub mod config;
pub mod error;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

/// Title printed on the header page and used in identifiers.
pub const REPORT_TITLE: &str = "生命之花分析报告";

/// Lines printed under the title on the header page.
pub const REPORT_SUBTITLES: [&str; 2] = ["訫香方阁", "AI解密人生～树洞计划～帮你读懂自己"];

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_image, generate_report, resolve_provider, save_text_report};
pub use assemble::{assemble, generate_from_text_file, report_identifier, write_report};
pub use config::{
    AnalysisConfig, AnalysisConfigBuilder, AssetPaths, DuplicatePolicy, ReportConfig,
    ReportConfigBuilder,
};
pub use error::{AssetKind, RenderWarning, ReportError};
pub use output::{AnalysisOutput, AssembledReport, ReportMetadata, ReportOutput};
pub use pipeline::input::ImageSource;
pub use pipeline::metadata::extract_metadata;
pub use pipeline::normalize::normalize;
pub use pipeline::sections::{split_sections, split_sections_with, Section, SectionMap};
pub use progress::{NoopProgressCallback, ProgressCallback, ReportProgressCallback, ReportStage};
