//! Configuration types for report generation.
//!
//! Two structs split the two collaborators cleanly:
//!
//! * [`ReportConfig`]: where assets live, where reports go, and how the
//!   section splitter treats duplicate headings. Everything the synchronous
//!   rendering core needs.
//! * [`AnalysisConfig`]: which vision model to call and how patiently. It is
//!   passed to the model call explicitly; there is no process-wide client.
//!
//! Both are built via builders so callers set only what they care about.

use crate::error::ReportError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default vision model: Qwen-VL via DashScope's OpenAI-compatible endpoint.
pub const DEFAULT_MODEL: &str = "qwen-vl-max-latest";

/// Provider used when only a model is configured.
pub const DEFAULT_PROVIDER: &str = "openai";

/// What to do when the same section heading appears twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// The later occurrence replaces the earlier one. (default)
    #[default]
    LastWriteWins,
    /// The first occurrence is kept; later ones are ignored.
    FirstWriteWins,
}

/// File locations of the fixed render-time assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPaths {
    /// Full-bleed cover art. Missing → fatal.
    pub cover: PathBuf,
    /// Full-bleed art behind content pages. Missing → fatal.
    pub background: PathBuf,
    /// Thumbnail shown when the user's image is unavailable. Missing → no thumbnail.
    pub fallback_thumbnail: PathBuf,
    /// TrueType font with CJK coverage. Missing → Helvetica with a warning.
    pub font: PathBuf,
}

impl AssetPaths {
    /// Default asset names resolved under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            cover: dir.join("fengmian.png"),
            background: dir.join("background.png"),
            fallback_thumbnail: dir.join("flower.png"),
            font: dir.join("fonts").join("simhei.ttf"),
        }
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

// ── ReportConfig ─────────────────────────────────────────────────────────

/// Configuration for the rendering core.
#[derive(Clone)]
pub struct ReportConfig {
    /// Asset locations. Default: the standard names in the working directory.
    pub assets: AssetPaths,

    /// Directory reports and archived texts are written to. Default: `output`.
    pub output_dir: PathBuf,

    /// Duplicate-heading policy for the section splitter. Default: last wins.
    pub duplicate_policy: DuplicatePolicy,

    /// Optional stage events for progress displays.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            output_dir: PathBuf::from("output"),
            duplicate_policy: DuplicatePolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("assets", &self.assets)
            .field("output_dir", &self.output_dir)
            .field("duplicate_policy", &self.duplicate_policy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReportProgressCallback>"),
            )
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReportConfig`].
#[derive(Debug)]
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    /// Resolve every asset under `dir` using the default file names.
    pub fn assets_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.assets = AssetPaths::in_dir(dir);
        self
    }

    pub fn cover(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.assets.cover = path.into();
        self
    }

    pub fn background(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.assets.background = path.into();
        self
    }

    pub fn fallback_thumbnail(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.assets.fallback_thumbnail = path.into();
        self
    }

    pub fn font(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.assets.font = path.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        if self.config.output_dir.as_os_str().is_empty() {
            return Err(ReportError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── AnalysisConfig ───────────────────────────────────────────────────────

/// Configuration for the vision-model call.
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// LLM provider name (e.g. "openai", "gemini"). If None, resolved from
    /// the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// The analysis is interpretive prose, not transcription, so a moderate
    /// temperature reads better than the near-zero values used for OCR.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// Eight sections of bullet points routinely run past 2 000 tokens in
    /// Chinese; too low a cap truncates "8. 总结金句" mid-sentence.
    pub max_tokens: usize,

    /// Maximum retry attempts on a failed call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 1000.
    pub retry_backoff_ms: u64,

    /// Largest image accepted for upload, in bytes. Default: 19 000 000.
    ///
    /// DashScope rejects requests around 20 MB; the margin leaves room for
    /// base64 framing in the JSON body.
    pub max_image_bytes: usize,

    /// Download timeout for URL images in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Per-call timeout for the model request in seconds. Default: 180.
    pub api_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 1000,
            max_image_bytes: 19_000_000,
            download_timeout_secs: 60,
            api_timeout_secs: 180,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_image_bytes(mut self, n: usize) -> Self {
        self.config.max_image_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, ReportError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ReportError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(ReportError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_image_bytes == 0 {
            return Err(ReportError::InvalidConfig(
                "max_image_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_paths_default_names() {
        let a = AssetPaths::in_dir("/srv/fol");
        assert_eq!(a.cover, PathBuf::from("/srv/fol/fengmian.png"));
        assert_eq!(a.background, PathBuf::from("/srv/fol/background.png"));
        assert_eq!(a.fallback_thumbnail, PathBuf::from("/srv/fol/flower.png"));
        assert_eq!(a.font, PathBuf::from("/srv/fol/fonts/simhei.ttf"));
    }

    #[test]
    fn report_builder_overrides_single_asset() {
        let c = ReportConfig::builder()
            .assets_dir("a")
            .font("/usr/share/fonts/noto.ttf")
            .output_dir("out")
            .build()
            .unwrap();
        assert_eq!(c.assets.cover, PathBuf::from("a/fengmian.png"));
        assert_eq!(c.assets.font, PathBuf::from("/usr/share/fonts/noto.ttf"));
        assert_eq!(c.output_dir, PathBuf::from("out"));
        assert_eq!(c.duplicate_policy, DuplicatePolicy::LastWriteWins);
    }

    #[test]
    fn report_builder_rejects_empty_output_dir() {
        assert!(ReportConfig::builder().output_dir("").build().is_err());
    }

    #[test]
    fn analysis_defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.max_image_bytes, 19_000_000);
        assert!(c.provider.is_none());
    }

    #[test]
    fn analysis_builder_validates() {
        assert!(AnalysisConfig::builder().model(" ").build().is_err());
        assert!(AnalysisConfig::builder().max_tokens(0).build().is_err());
        let c = AnalysisConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }
}
