//! CLI binary for fol-report.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig` / `ReportConfig` and prints where the report went.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fol_report::pipeline::metadata::UNKNOWN_NAME;
use fol_report::{
    generate_from_text_file, generate_report, AnalysisConfig, DuplicatePolicy, ImageSource,
    ProgressCallback, ReportConfig, ReportOutput, ReportProgressCallback, ReportStage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that shows the current stage and logs each finished one.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("fol-report");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }
}

impl ReportProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: ReportStage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: ReportStage, detail: &str) {
        self.bar.println(format!(
            "  {} {:<22} {}",
            green("✓"),
            stage.to_string(),
            dim(detail)
        ));
        if stage == ReportStage::Write {
            self.bar.finish_and_clear();
            eprintln!(
                "{} done in {:.1}s",
                green("✔"),
                self.started.elapsed().as_secs_f64()
            );
        }
    }

    fn on_error(&self, stage: ReportStage, error: &str) {
        // Keep the line readable; the full error follows from main.
        let msg = match error.char_indices().nth(80) {
            Some((i, _)) => format!("{}\u{2026}", &error[..i]),
            None => error.to_string(),
        };
        self.bar.println(format!("  {} {:<22} {}", red("✗"), stage.to_string(), red(&msg)));
        self.bar.finish_and_clear();
    }

    fn on_warning(&self, warning: &str) {
        self.bar.println(format!("  {} {}", yellow("⚠"), warning));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a drawing and write the PDF to ./output
  fol-report drawing.png --name 张三

  # Image from a URL, assets in another directory
  fol-report https://example.org/flower.jpg --name 李四 --assets-dir /srv/fol/assets

  # Custom prompt (a no-table instruction is appended automatically)
  fol-report drawing.png --name 王五 --prompt "请重点分析颜色"

  # Re-render an archived analysis without calling the model
  fol-report --from-text output/20240305_101500_张三_drawing.txt --name 张三 drawing.png

  # JSON summary for scripts
  fol-report drawing.png --name 张三 --json --no-progress

ASSETS (resolved under --assets-dir, each overridable):
  fengmian.png        cover page art                 required
  background.png      content page background        required
  flower.png          thumbnail when no image        optional
  fonts/simhei.ttf    CJK font                       optional (Helvetica fallback)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY      API key (DashScope keys work with OPENAI_BASE_URL set)
  OPENAI_BASE_URL     e.g. https://dashscope.aliyuncs.com/compatible-mode/v1
  FOL_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  FOL_MODEL           Override model ID (default qwen-vl-max-latest)
  RUST_LOG            Log filter, overrides --verbose/--quiet
"#;

/// Generate Flower of Life analysis reports as PDF.
#[derive(Parser, Debug)]
#[command(
    name = "fol-report",
    version,
    about = "Analyse a Flower of Life drawing with a vision model and render a PDF report",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image to analyse: local path or HTTP/HTTPS URL. With --from-text it is
    /// only used as the header thumbnail.
    image: Option<String>,

    /// Name printed on the report; overrides any 姓名： line in the text.
    #[arg(short, long, env = "FOL_REPORT_NAME")]
    name: Option<String>,

    /// Render from an existing analysis text file instead of calling the model.
    #[arg(long, env = "FOL_REPORT_FROM_TEXT")]
    from_text: Option<PathBuf>,

    /// Replacement user prompt.
    #[arg(long, env = "FOL_REPORT_PROMPT", conflicts_with = "prompt_file")]
    prompt: Option<String>,

    /// Read the replacement user prompt from a file.
    #[arg(long, env = "FOL_REPORT_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Directory holding the default assets.
    #[arg(long, env = "FOL_REPORT_ASSETS_DIR", default_value = ".")]
    assets_dir: PathBuf,

    /// Cover image (overrides <assets-dir>/fengmian.png).
    #[arg(long, env = "FOL_REPORT_COVER")]
    cover: Option<PathBuf>,

    /// Page background (overrides <assets-dir>/background.png).
    #[arg(long, env = "FOL_REPORT_BACKGROUND")]
    background: Option<PathBuf>,

    /// Fallback thumbnail (overrides <assets-dir>/flower.png).
    #[arg(long, env = "FOL_REPORT_THUMBNAIL")]
    thumbnail: Option<PathBuf>,

    /// TrueType font (overrides <assets-dir>/fonts/simhei.ttf).
    #[arg(long, env = "FOL_REPORT_FONT")]
    font: Option<PathBuf>,

    /// Directory for PDFs and archived analysis texts.
    #[arg(short, long, env = "FOL_REPORT_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Keep the first of two identical section headings instead of the last.
    #[arg(long, env = "FOL_REPORT_FIRST_WINS")]
    first_wins: bool,

    /// Vision model ID.
    #[arg(long, env = "FOL_REPORT_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "FOL_REPORT_PROVIDER")]
    provider: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "FOL_REPORT_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max tokens the model may generate.
    #[arg(long, env = "FOL_REPORT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Retries on model failure.
    #[arg(long, env = "FOL_REPORT_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FOL_REPORT_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Model call timeout in seconds.
    #[arg(long, env = "FOL_REPORT_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// Print a JSON summary (ReportOutput) on stdout.
    #[arg(long, env = "FOL_REPORT_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "FOL_REPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FOL_REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FOL_REPORT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ReportProgressCallback>)
    } else {
        None
    };
    let report_config = build_report_config(&cli, progress_cb)?;
    let name = cli
        .name
        .clone()
        .filter(|n| !n.trim().is_empty());

    // ── Run ──────────────────────────────────────────────────────────────
    let output = if let Some(ref text_path) = cli.from_text {
        let image = cli.image.as_deref().map(ImageSource::parse);
        let config = report_config.clone();
        let text_path = text_path.clone();
        let user_name = name.clone();
        tokio::task::spawn_blocking(move || {
            generate_from_text_file(&text_path, image.as_ref(), user_name.as_deref(), &config)
        })
        .await
        .context("Render task failed")?
        .context("Report generation failed")?
    } else {
        let Some(ref image) = cli.image else {
            bail!("An image path or URL is required unless --from-text is given");
        };
        let prompt = read_prompt(&cli).await?;
        let analysis_config = build_analysis_config(&cli)?;
        let name = name.unwrap_or_else(|| UNKNOWN_NAME.to_string());
        generate_report(
            image,
            &name,
            prompt.as_deref(),
            &analysis_config,
            &report_config,
        )
        .await
        .context("Report generation failed")?
    };

    print_summary(&cli, &output, show_progress)
}

fn print_summary(cli: &Cli, output: &ReportOutput, show_progress: bool) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }
    if !show_progress {
        for w in &output.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
    }
    eprintln!(
        "{}  {}  {} pages, {} sections  →  {}",
        green("✔"),
        bold(&output.identifier),
        output.page_count,
        output.sections_rendered,
        output.pdf_path.display()
    );
    if let Some(ref t) = output.text_path {
        eprintln!("   analysis text  →  {}", dim(&t.display().to_string()));
    }
    Ok(())
}

async fn read_prompt(cli: &Cli) -> Result<Option<String>> {
    if let Some(ref path) = cli.prompt_file {
        let p = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        return Ok(Some(p));
    }
    Ok(cli.prompt.clone())
}

/// Map CLI args to `ReportConfig`.
fn build_report_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReportConfig> {
    let mut builder = ReportConfig::builder()
        .assets_dir(&cli.assets_dir)
        .output_dir(&cli.output_dir);
    if let Some(ref p) = cli.cover {
        builder = builder.cover(p);
    }
    if let Some(ref p) = cli.background {
        builder = builder.background(p);
    }
    if let Some(ref p) = cli.thumbnail {
        builder = builder.fallback_thumbnail(p);
    }
    if let Some(ref p) = cli.font {
        builder = builder.font(p);
    }
    if cli.first_wins {
        builder = builder.duplicate_policy(DuplicatePolicy::FirstWriteWins);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid report configuration")
}

/// Map CLI args to `AnalysisConfig`.
fn build_analysis_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);
    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    builder.build().context("Invalid analysis configuration")
}
