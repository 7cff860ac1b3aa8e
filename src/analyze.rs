//! Async entry points: image → model analysis → archived text → PDF report.
//!
//! ## Pipeline
//!
//! ```text
//! image ref ─▶ fetch_image ─▶ encode_image ─▶ request_analysis ─▶ save_text_report
//!                                                                   │
//!                                         spawn_blocking(assemble + write_report)
//! ```
//!
//! The model call is the only network-bound step; layout runs on a blocking
//! worker so a large background image never stalls the runtime.

use crate::assemble::{assemble, write_report};
use crate::config::{AnalysisConfig, ReportConfig, DEFAULT_PROVIDER};
use crate::error::ReportError;
use crate::output::{AnalysisOutput, ReportOutput};
use crate::pipeline::encode::encode_image;
use crate::pipeline::input::{fetch_image, ImageSource, ResolvedImage};
use crate::pipeline::llm::request_analysis;
use crate::progress::ReportStage;
use crate::prompts::build_user_prompt;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **Environment pair** `FOL_LLM_PROVIDER` + `FOL_MODEL`, both non-empty.
/// 4. **Full auto-detection** via [`ProviderFactory::from_env`].
///
/// Resolved per call; nothing is cached process-wide.
pub fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn LLMProvider>, ReportError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("FOL_LLM_PROVIDER"),
        std::env::var("FOL_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider(DEFAULT_PROVIDER, &config.model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReportError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                For DashScope set OPENAI_API_KEY and OPENAI_BASE_URL=\
                https://dashscope.aliyuncs.com/compatible-mode/v1.\n\
                Error: {}",
                e
            ),
        })?;
    Ok(llm_provider)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReportError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        ReportError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Ask the vision model to analyse an already-fetched image.
///
/// `prompt` overrides the default prompt (see [`build_user_prompt`]).
pub async fn analyze_image(
    image: &ResolvedImage,
    prompt: Option<&str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, ReportError> {
    let provider = resolve_provider(config)?;
    let bytes = tokio::fs::read(image.path())
        .await
        .map_err(|e| ReportError::InputUnreadable {
            path: image.path().to_path_buf(),
            source: e,
        })?;
    let data = encode_image(&bytes, config.max_image_bytes)?;
    let user_prompt = build_user_prompt(prompt);

    info!(
        "Analysing {} ({} bytes) with {}",
        image.path().display(),
        bytes.len(),
        config.model
    );
    let output = request_analysis(&provider, data, &user_prompt, config).await?;
    info!(
        "Analysis done: {} chars, {} in / {} out tokens, {} ms",
        output.text.chars().count(),
        output.input_tokens,
        output.output_tokens,
        output.duration_ms
    );
    Ok(output)
}

/// Archive raw analysis text as `{YYYYmmdd_HHMMSS}_{name}_{stem}.txt` in `dir`.
///
/// `stem` is the image's file stem, or `report` when there is none.
pub fn save_text_report(
    text: &str,
    name: &str,
    image: Option<&ImageSource>,
    dir: &Path,
) -> Result<PathBuf, ReportError> {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let stem = image
        .and_then(ImageSource::stem)
        .unwrap_or_else(|| "report".to_string());
    let file_name = crate::assemble::sanitize_file_name(&format!("{ts}_{name}_{stem}.txt"));
    let path = dir.join(file_name);

    std::fs::create_dir_all(dir).map_err(|e| ReportError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    })?;
    std::fs::write(&path, text).map_err(|e| ReportError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    })?;
    info!("Saved analysis text to {}", path.display());
    Ok(path)
}

/// Full run: fetch the image, analyse it, archive the text and write the PDF.
pub async fn generate_report(
    image: &str,
    name: &str,
    prompt: Option<&str>,
    analysis: &AnalysisConfig,
    report: &ReportConfig,
) -> Result<ReportOutput, ReportError> {
    let source = ImageSource::parse(image);

    let resolved = stage(report, ReportStage::FetchImage, async {
        let r = fetch_image(&source, analysis.download_timeout_secs).await?;
        let detail = r.path().display().to_string();
        Ok::<_, ReportError>((r, detail))
    })
    .await?;

    let analysis_out = stage(report, ReportStage::Analyze, async {
        let out = analyze_image(&resolved, prompt, analysis).await?;
        let detail = format!("{} in / {} out tokens", out.input_tokens, out.output_tokens);
        Ok::<_, ReportError>((out, detail))
    })
    .await?;

    let text_path = stage(report, ReportStage::SaveText, async {
        let p = save_text_report(&analysis_out.text, name, Some(&source), &report.output_dir)?;
        let detail = p.display().to_string();
        Ok::<_, ReportError>((p, detail))
    })
    .await?;

    // The thumbnail reads the local copy; the download is dropped afterwards.
    let thumb = ImageSource::LocalPath(resolved.path().to_path_buf());
    let recorded_source = resolved.source().clone();
    let text = analysis_out.text;
    let user_name = name.to_string();
    let config = report.clone();

    let assembled = stage(report, ReportStage::Render, async move {
        let r = tokio::task::spawn_blocking(move || {
            assemble(&text, Some(&thumb), Some(&user_name), &config)
        })
        .await
        .map_err(|e| ReportError::Internal(format!("Render task panicked: {e}")))??;
        let detail = format!("{} pages", r.page_count);
        Ok::<_, ReportError>((r, detail))
    })
    .await?;
    drop(resolved);

    let out_dir = report.output_dir.clone();
    let (assembled, pdf_path) = stage(report, ReportStage::Write, async move {
        let (r, p) = tokio::task::spawn_blocking(move || {
            let p = write_report(&assembled, &out_dir)?;
            Ok::<_, ReportError>((assembled, p))
        })
        .await
        .map_err(|e| ReportError::Internal(format!("Write task panicked: {e}")))??;
        let detail = p.display().to_string();
        Ok::<_, ReportError>(((r, p), detail))
    })
    .await?;

    // Record the caller's reference, not the temp copy used for rendering.
    let mut output = ReportOutput::from_assembled(assembled, pdf_path, Some(text_path));
    output.metadata.source_image = Some(recorded_source);
    Ok(output)
}

/// Run one stage, reporting start/complete/error to the progress callback.
async fn stage<T, F>(config: &ReportConfig, stage: ReportStage, fut: F) -> Result<T, ReportError>
where
    F: std::future::Future<Output = Result<(T, String), ReportError>>,
{
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_stage_start(stage);
    }
    match fut.await {
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
