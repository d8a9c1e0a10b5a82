use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use certforge_batch::{
    BatchError, BatchJobRunner, DelimitedNameSource, DirectorySink, LogProgress, NameList,
    NameSource, RunnerConfig, WorkbookNameSource,
};
use certforge_engine::logging::{init_logging, LoggingConfig};
use certforge_engine::render::RasterRenderer;
use certforge_engine::scene::{Scene, Template, DEFAULT_FONT_SIZE_PX, DEFAULT_POSITION};
use certforge_engine::text::FontSystem;

/// Render one certificate per name onto a template image.
#[derive(Debug, Parser)]
#[command(name = "certforge", version)]
struct Cli {
    /// Template image (PNG, JPEG, WebP, ...).
    #[arg(long, env = "CERTFORGE_TEMPLATE")]
    template: PathBuf,

    /// Names file: a workbook (.xlsx, .xls, .ods, ...) whose first sheet is
    /// read, or a CSV/TSV text file. Every non-blank cell is one certificate.
    #[arg(long, env = "CERTFORGE_NAMES", required_unless_present_any = ["name", "preview"])]
    names: Option<PathBuf>,

    /// Render a single certificate for this name instead of a names file.
    #[arg(long, conflicts_with = "names")]
    name: Option<String>,

    /// Write a preview of the scene to this path and exit.
    #[arg(long, value_name = "PNG")]
    preview: Option<PathBuf>,

    /// Output directory.
    #[arg(long, short, env = "CERTFORGE_OUT", default_value = "certificates")]
    out: PathBuf,

    /// Font to register, as FAMILY=PATH. The first one is the fallback.
    #[arg(
        long = "font",
        value_name = "FAMILY=PATH",
        value_parser = parse_font_spec,
        required = true
    )]
    fonts: Vec<FontSpec>,

    /// Font family for the name. Defaults to the first --font.
    #[arg(long, env = "CERTFORGE_FAMILY")]
    family: Option<String>,

    /// Font size in template pixels (12-100).
    #[arg(long, env = "CERTFORGE_SIZE", default_value_t = DEFAULT_FONT_SIZE_PX)]
    size: u32,

    /// Text colour, #rgb / #rrggbb / #rrggbbaa.
    #[arg(long, env = "CERTFORGE_COLOR", default_value = "#000000")]
    color: String,

    /// Left offset of the name, in template pixels.
    #[arg(long, allow_negative_numbers = true, default_value_t = DEFAULT_POSITION.x)]
    x: i32,

    /// Top offset of the name, in template pixels.
    #[arg(long, allow_negative_numbers = true, default_value_t = DEFAULT_POSITION.y)]
    y: i32,

    /// Pause before each capture, in milliseconds (minimum 250).
    #[arg(long, env = "CERTFORGE_SETTLE_MS", default_value_t = 300)]
    settle_ms: u64,

    /// Delete already written certificates when the batch fails.
    #[arg(long)]
    cleanup_on_failure: bool,

    /// Log filter, env_logger syntax. Falls back to RUST_LOG.
    #[arg(long, env = "CERTFORGE_LOG")]
    log: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FontSpec {
    family: String,
    path: PathBuf,
}

fn parse_font_spec(s: &str) -> Result<FontSpec, String> {
    let (family, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FAMILY=PATH, got {s:?}"))?;
    let family = family.trim();
    if family.is_empty() || path.trim().is_empty() {
        return Err(format!("expected FAMILY=PATH, got {s:?}"));
    }
    Ok(FontSpec {
        family: family.to_string(),
        path: PathBuf::from(path.trim()),
    })
}

fn load_fonts(specs: &[FontSpec]) -> Result<FontSystem> {
    let mut fonts = FontSystem::new();
    for spec in specs {
        let bytes = std::fs::read(&spec.path)
            .with_context(|| format!("failed to read font {}", spec.path.display()))?;
        fonts
            .load_font(&spec.family, &bytes)
            .with_context(|| format!("failed to load font {}", spec.path.display()))?;
    }
    log::debug!("fonts loaded: {:?}", fonts.families().collect::<Vec<_>>());
    Ok(fonts)
}

/// Reads the names file, picking the workbook reader by extension.
fn read_names(path: &Path) -> Result<NameList> {
    let names = if WorkbookNameSource::handles(path) {
        WorkbookNameSource::from_path(path).names()
    } else {
        DelimitedNameSource::from_path(path).and_then(|source| source.names())
    };
    names.with_context(|| format!("failed to read names from {}", path.display()))
}

fn build_scene(cli: &Cli) -> Result<Scene> {
    let template = Template::open(&cli.template)
        .with_context(|| format!("failed to open template {}", cli.template.display()))?;

    let mut scene = Scene::with_template(template);
    let family = match (&cli.family, cli.fonts.first()) {
        (Some(family), _) => family.clone(),
        (None, Some(first)) => first.family.clone(),
        (None, None) => bail!("at least one --font is required"),
    };
    scene.set_font_family(family);
    scene.set_font_size(cli.size);
    scene.set_color_hex(&cli.color).context("invalid --color")?;
    scene.set_position(cli.x, cli.y);
    if let Some(name) = &cli.name {
        scene.set_text(name.clone());
    }
    Ok(scene)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    let renderer = RasterRenderer::new(load_fonts(&cli.fonts)?);
    let scene = build_scene(&cli)?;
    let config = RunnerConfig::default()
        .with_settle_delay(Duration::from_millis(cli.settle_ms))
        .with_cleanup_on_failure(cli.cleanup_on_failure);
    let mut runner = BatchJobRunner::new(renderer, DirectorySink::new(&cli.out), LogProgress)
        .with_config(config);

    if let Some(path) = &cli.preview {
        let preview = runner.preview(&scene).await.context("preview failed")?;
        tokio::fs::write(path, &preview.bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("preview written to {} ({}x{})", path.display(), preview.width, preview.height);
        return Ok(());
    }

    let outcome = match (&cli.name, &cli.names) {
        (Some(name), _) => runner.render_one(name, &scene).await,
        (None, Some(path)) => {
            let names = read_names(path)?;
            log::info!("{} names loaded from {}", names.len(), path.display());
            runner.run_all(&names, &scene).await
        }
        (None, None) => bail!("either --names or --name is required"),
    };

    match outcome {
        Ok(report) => {
            log::info!(
                "all certificates generated: {} files in {}",
                report.files.len(),
                cli.out.display()
            );
            log::debug!("files: {:?}", report.files);
            Ok(())
        }
        Err(err) => {
            if let Some(state) = err.failed_state() {
                log::error!(
                    "stopped at item {} of {} ({:?})",
                    state.current_index() + 1,
                    state.total(),
                    state.current_name()
                );
            }
            Err(describe(err))
        }
    }
}

fn describe(err: BatchError) -> anyhow::Error {
    let hint = match &err {
        BatchError::EmptyNameList => "the names file has no non-blank cells",
        BatchError::MissingTemplate => "no template image was loaded",
        BatchError::Capture { .. } => "certificate generation failed",
        BatchError::Persist { .. } => "a certificate could not be saved",
    };
    anyhow::Error::new(err).context(hint)
}
