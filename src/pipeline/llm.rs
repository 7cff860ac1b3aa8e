//! Vision-model interaction: build the analysis request and call the provider.
//!
//! Intentionally thin. Prompt wording lives in [`crate::prompts`] and image
//! handling in [`super::encode`], so this module only owns message layout,
//! timeouts and retries.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 from the hosted model are transient. Exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): with the 1 s default and 2 retries
//! the waits are 1 s → 2 s. A timed-out attempt counts as a failed attempt.

use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::output::AnalysisOutput;
use crate::prompts::SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Send one image plus prompt to the model and return its text answer.
///
/// ## Message Layout
///
/// 1. **System message**: [`SYSTEM_PROMPT`]
/// 2. **User message**: the prompt text with the image attached
pub async fn request_analysis(
    provider: &Arc<dyn LLMProvider>,
    image: ImageData,
    prompt: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, ReportError> {
    let start = Instant::now();
    let messages = vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user_with_images(prompt, vec![image]),
    ];
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Analysis retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "Analysis: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens, response.completion_tokens, duration
                );
                if response.content.trim().is_empty() {
                    warn!("Attempt {} returned empty text", attempt + 1);
                    last_err = Some("model returned an empty answer".to_string());
                    continue;
                }
                return Ok(AnalysisOutput {
                    text: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt,
                });
            }
            Ok(Err(e)) => {
                let err_msg = e.to_string();
                warn!("Attempt {} failed: {}", attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
            Err(_) => {
                warn!(
                    "Attempt {} timed out after {}s",
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(format!("timed out after {}s", config.api_timeout_secs));
            }
        }
    }

    Err(ReportError::LlmApiError {
        retries: config.max_retries,
        message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Upper bound on a single retry delay.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .map_or(u64::MAX, |factor| base.saturating_mul(factor))
        .min(MAX_BACKOFF_MS)
}

/// Build `CompletionOptions` from the analysis config.
fn build_options(config: &AnalysisConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = AnalysisConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_ms(1000, 1), 1000);
        assert_eq!(backoff_ms(1000, 2), 2000);
        assert_eq!(backoff_ms(1000, 4), 8000);
        assert_eq!(backoff_ms(1000, 10), MAX_BACKOFF_MS);
        // Large retry counts must not overflow.
        assert_eq!(backoff_ms(1000, 64), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(u64::MAX, 3), MAX_BACKOFF_MS);
    }

    #[test]
    fn build_options_follow_builder() {
        let config = AnalysisConfig::builder()
            .temperature(0.2)
            .max_tokens(1024)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(1024));
    }
}
