//! dotty CLI: detect dotty-grid targets, generate model tables and render
//! synthetic targets.

use clap::{Args, Parser, Subcommand};
use dotty::core::{CameraModel, ImageSize};
use dotty::detect;
use dotty::grid::{
    render_distorted, render_reference, DottyGridDetectConfig, DottyGridDetectReport, GridLayout,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "dotty")]
#[command(about = "Detect dotty-grid calibration targets and generate synthetic ones")]
#[command(version)]
struct Cli {
    /// Log debug messages to stderr. Otherwise `DOTTY_LOG` sets the level (default `info`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run detection from a JSON config and write a JSON report.
    Detect {
        /// Path to the detection config (JSON).
        #[arg(long)]
        config: PathBuf,

        /// Report path; overrides `output_path` from the config.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write the model table of a regular grid layout.
    Layout {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Path of the model table text file to write.
        #[arg(long)]
        out: PathBuf,
    },

    /// Render a synthetic target image (PNG) for a grid layout.
    Render {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Output image path.
        #[arg(long)]
        out: PathBuf,

        /// Dot radius in reference pixels.
        #[arg(long, default_value = "6.0")]
        dot_radius: f64,

        /// Fiducial dot radius in reference pixels.
        #[arg(long, default_value = "11.0")]
        fiducial_radius: f64,

        /// Camera model JSON; when given, the image is rendered with lens distortion.
        #[arg(long)]
        camera: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct LayoutArgs {
    /// Grid layout JSON; individual flags below override its fields.
    #[arg(long)]
    layout: Option<PathBuf>,

    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    cols: Option<usize>,

    /// Dot spacing in reference pixels.
    #[arg(long)]
    spacing: Option<f64>,

    /// Border margin in reference pixels.
    #[arg(long)]
    margin: Option<f64>,

    /// Dot pitch on the target in mm.
    #[arg(long)]
    pitch: Option<f64>,

    /// Fiducial cells as `col,row` pairs in TL, TR, BL, BR order (8 values).
    #[arg(long, value_delimiter = ',')]
    fiducials: Option<Vec<usize>>,
}

impl LayoutArgs {
    fn resolve(&self) -> CliResult<GridLayout> {
        let mut layout = match &self.layout {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => GridLayout::default(),
        };
        if let Some(rows) = self.rows {
            layout.rows = rows;
        }
        if let Some(cols) = self.cols {
            layout.cols = cols;
        }
        if let Some(spacing) = self.spacing {
            layout.spacing_px = spacing;
        }
        if let Some(margin) = self.margin {
            layout.margin_px = margin;
        }
        if let Some(pitch) = self.pitch {
            layout.pitch_mm = pitch;
        }
        if let Some(values) = &self.fiducials {
            let [c0, r0, c1, r1, c2, r2, c3, r3] = values[..] else {
                return Err(format!(
                    "--fiducials expects 8 values (4 col,row pairs), got {}",
                    values.len()
                )
                .into());
            };
            layout.fiducial_cells = [[c0, r0], [c1, r1], [c2, r2], [c3, r3]];
        }
        Ok(layout)
    }
}

#[derive(Serialize)]
struct LayoutSummary<'a> {
    model_path: &'a Path,
    points: usize,
    fiducial_indexes: [usize; 4],
    reference_image_size: ImageSize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Detect { config, out } => run_detect(&config, out.as_deref()),
        Commands::Layout { layout, out } => run_layout(&layout, &out),
        Commands::Render {
            layout,
            out,
            dot_radius,
            fiducial_radius,
            camera,
        } => run_render(&layout, &out, dot_radius, fiducial_radius, camera.as_deref()),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: bool) -> CliResult<()> {
    // Level comes from RUST_LOG.
    dotty::init_tracing(false);
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: bool) -> CliResult<()> {
    use log::LevelFilter;

    // `SetLoggerError` only implements `Error` with log's `std` feature.
    let installed = if verbose {
        dotty::core::init_with_level(LevelFilter::Debug)
    } else {
        dotty::core::init_from_env(LevelFilter::Info)
    };
    installed.map_err(|e| e.to_string())?;
    Ok(())
}

fn run_detect(config_path: &Path, out: Option<&Path>) -> CliResult<()> {
    let cfg = DottyGridDetectConfig::load_json(config_path)?;
    let detector = cfg.build_detector()?;
    let out_path = out.map(Path::to_path_buf).unwrap_or_else(|| cfg.output_path());

    log::info!("loading image {}", cfg.image_path);
    let img = detect::load_gray(&cfg.image_path)?;
    log::info!("image size {}x{}", img.width(), img.height());

    let mut report = DottyGridDetectReport::new(&cfg, config_path);
    let result = detect::detect_dotty_grid_with_diagnostics(&img, &detector, cfg.is_distorted);
    match result.rejection {
        Some(reason) => log::info!("frame rejected: {reason:?}"),
        None => log::info!(
            "detected {} of {} model points",
            result.detection.len(),
            detector.model().len()
        ),
    }
    report.set_result(result);
    report.write_json(&out_path)?;
    log::info!("report written to {}", out_path.display());
    println!("{}", report.detection.len());
    Ok(())
}

fn run_layout(args: &LayoutArgs, out: &Path) -> CliResult<()> {
    let grid = args.resolve()?.build()?;
    grid.model.write_text(out)?;
    let summary = LayoutSummary {
        model_path: out,
        points: grid.model.len(),
        fiducial_indexes: grid.fiducial_indexes,
        reference_image_size: grid.reference_size,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_render(
    args: &LayoutArgs,
    out: &Path,
    dot_radius: f64,
    fiducial_radius: f64,
    camera: Option<&Path>,
) -> CliResult<()> {
    let grid = args.resolve()?.build()?;
    let mut img = render_reference(
        &grid.model,
        &grid.fiducial_indexes,
        grid.reference_size,
        dot_radius,
        fiducial_radius,
    );
    if let Some(path) = camera {
        let camera: CameraModel = serde_json::from_str(&fs::read_to_string(path)?)?;
        camera.validate()?;
        img = render_distorted(&img.view(), &camera);
    }
    detect::to_image(&img)?.save(out)?;
    log::info!(
        "rendered {}x{} target with {} dots to {}",
        img.width,
        img.height,
        grid.model.len(),
        out.display()
    );
    Ok(())
}
