use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use scrollreel::{
    FrameDiagnostic, FsFrameLoader, PixmapSurface, ReelConfig, ScrollPhase, SectionLayout,
    SequencePlayer, YearIndicator, map_scroll,
};

#[derive(Parser, Debug)]
#[command(name = "scrollreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the frame shown at one scroll offset as a PNG.
    Frame(FrameArgs),
    /// Walk the section and write a PNG for every frame change.
    Scrub(ScrubArgs),
    /// Print the scroll -> frame/year table as JSON lines.
    Map(MapArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Config JSON.
    #[arg(long)]
    config: PathBuf,

    /// Directory frame sources resolve against (defaults to the config's directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Document offset of the viewport's top edge.
    #[arg(long, allow_negative_numbers = true)]
    scroll: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ScrubArgs {
    /// Config JSON.
    #[arg(long)]
    config: PathBuf,

    /// Directory frame sources resolve against (defaults to the config's directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Evenly spaced scroll offsets across the section.
    #[arg(long, default_value_t = 32)]
    steps: usize,

    /// Output directory for PNGs.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct MapArgs {
    /// Config JSON.
    #[arg(long)]
    config: PathBuf,

    /// Evenly spaced scroll offsets across the section.
    #[arg(long, default_value_t = 32)]
    steps: usize,
}

#[derive(serde::Serialize)]
struct MapRow {
    viewport_top: f64,
    phase: ScrollPhase,
    progress: f64,
    frame: usize,
    source: String,
    overlay_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Scrub(args) => cmd_scrub(args),
        Command::Map(args) => cmd_map(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = ReelConfig::from_path(&args.config)?;
    let section = require_section(&cfg, &args.config)?;
    let mut player = open_player(&cfg, section, &args.config, args.root.as_deref())?;

    let update = player.on_scroll(&section.metrics_at(args.scroll));
    tracing::info!(
        frame = update.mapping.frame,
        phase = ?update.mapping.phase,
        "resolved scroll offset"
    );

    write_png(player.surface(), &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_scrub(args: ScrubArgs) -> anyhow::Result<()> {
    let cfg = ReelConfig::from_path(&args.config)?;
    let section = require_section(&cfg, &args.config)?;
    let mut player = open_player(&cfg, section, &args.config, args.root.as_deref())?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let mut written = 0usize;
    let first = args.out_dir.join(format!("frame_{:05}.png", player.current_frame()));
    write_png(player.surface(), &first)?;
    written += 1;

    for top in offsets(&section, args.steps) {
        let update = player.on_scroll(&section.metrics_at(top));
        if update.redrawn {
            let path = args
                .out_dir
                .join(format!("frame_{:05}.png", update.mapping.frame));
            write_png(player.surface(), &path)?;
            written += 1;
        }
    }

    let stats = player.cache_stats();
    tracing::info!(?stats, "scrub finished");
    eprintln!("wrote {written} frames to {}", args.out_dir.display());
    Ok(())
}

fn cmd_map(args: MapArgs) -> anyhow::Result<()> {
    let cfg = ReelConfig::from_path(&args.config)?;
    let section = require_section(&cfg, &args.config)?;
    let total = cfg.sequence.total_frames();
    let years = cfg.sequence.year_indicator().map(|ind| YearIndicator {
        span: cfg.player.year_span,
        ..ind
    });

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for top in offsets(&section, args.steps) {
        let m = map_scroll(&section.metrics_at(top), total, cfg.player.overlay_band);
        let year = years.map(|ind| ind.year_for_mapping(&m));
        let row = MapRow {
            viewport_top: top,
            phase: m.phase,
            progress: m.progress,
            frame: m.frame,
            source: cfg.sequence.frame_source(m.frame),
            overlay_visible: m.overlay_visible,
            year,
        };
        serde_json::to_writer(&mut out, &row).context("write mapping row")?;
        std::io::Write::write_all(&mut out, b"\n").context("write mapping row")?;
    }
    Ok(())
}

fn require_section(cfg: &ReelConfig, path: &Path) -> anyhow::Result<SectionLayout> {
    cfg.section
        .with_context(|| format!("config '{}' has no \"section\" layout", path.display()))
}

fn open_player(
    cfg: &ReelConfig,
    section: SectionLayout,
    config_path: &Path,
    root: Option<&Path>,
) -> anyhow::Result<SequencePlayer<PixmapSurface>> {
    let root = root
        .map(Path::to_path_buf)
        .or_else(|| config_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let loader = Arc::new(FsFrameLoader::new(root));
    let surface = PixmapSurface::new(section.viewport);

    let mut builder = SequencePlayer::builder(cfg.sequence.clone(), loader, surface)
        .opts(cfg.player.clone())
        .diagnostics(Box::new(|d: &FrameDiagnostic| {
            if let FrameDiagnostic::LoadFailed(f) = d {
                eprintln!("warning: frame {} ({}) failed: {}", f.index, f.source, f.reason);
            }
        }));
    if let Some(table) = cfg.load_year_table()? {
        builder = builder.year_table(Arc::new(table));
    }
    Ok(builder.build()?)
}

/// Viewport offsets from the section top through the end of its scroll range.
fn offsets(section: &SectionLayout, steps: usize) -> Vec<f64> {
    let range = section.scroll_range();
    match steps {
        0 => Vec::new(),
        1 => vec![section.section_top],
        n => (0..n)
            .map(|k| section.section_top + range * k as f64 / (n - 1) as f64)
            .collect(),
    }
}

fn write_png(surface: &PixmapSurface, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    surface
        .save_png(path)
        .with_context(|| format!("write png '{}'", path.display()))
}
