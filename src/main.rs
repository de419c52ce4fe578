use clap::{Parser, Subcommand};
use fitcrop::config::{self, Preset};
use fitcrop::imaging::{CropRect, OutputFormat, RustBackend};
use fitcrop::pipeline::{self, CropRequest, PipelineOutput};
use fitcrop::progress::{CancelToken, ProgressEvent, ProgressPlan, Reporter};
use fitcrop::{batch, output};
use serde::Serialize;
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let hash = env!("FITCROP_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{} ({hash})", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "fitcrop")]
#[command(about = "Crop, rotate and squeeze photographs under a byte budget")]
#[command(long_about = "\
Crop, rotate and squeeze photographs under a byte budget

Crop coordinates are in the rotated canvas: the photo is rotated about its
centre inside a canvas just large enough to hold it, and the crop is read
from that canvas, the way an editor shows it.

The output is the largest, best-looking encode that fits the budget:

  1. the source itself at full quality, if it already fits
  2. otherwise JPEG, trying long-edge caps from large to small and, at each
     cap, qualities from high to low; the first fit wins
  3. otherwise a best-effort encode at the fallback cap and quality

Settings are layered: stock defaults -> --preset -> fitcrop.toml -> flags.
Run 'fitcrop gen-config' to generate a documented fitcrop.toml.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Flags selecting the config layers.
#[derive(clap::Args, Clone)]
struct ConfigArgs {
    /// Use-case preset applied on top of the stock defaults
    #[arg(long, value_enum, default_value_t = Preset::Asset)]
    preset: Preset,

    /// Config file (default: ./fitcrop.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Flags describing the crop.
#[derive(clap::Args, Clone)]
struct GeometryArgs {
    /// Crop rectangle in rotated-canvas pixels (default: whole canvas)
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_crop)]
    crop: Option<CropRect>,

    /// Rotation in degrees, clockwise
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rotate: f64,
}

/// Flags overriding the budget.
#[derive(clap::Args, Clone)]
struct BudgetArgs {
    /// Byte budget for the output
    #[arg(long)]
    target_bytes: Option<u64>,

    /// First long-edge cap tried, in pixels
    #[arg(long)]
    max_dimension: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Crop, rotate and optimize one image under the byte budget
    Process {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        geometry: GeometryArgs,
        #[command(flatten)]
        budget: BudgetArgs,
        #[command(flatten)]
        config: ConfigArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Do not print progress to stderr
        #[arg(short, long)]
        quiet: bool,
    },
    /// Crop and rotate only; PNG stays PNG, JPEG is written at extraction quality
    Crop {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        geometry: GeometryArgs,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Validate an image and report its format and dimensions
    Check {
        input: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Optimize every JPEG and PNG under a directory in parallel
    Batch {
        dir: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        #[command(flatten)]
        budget: BudgetArgs,
        #[command(flatten)]
        config: ConfigArgs,
        /// Print the summary as JSON instead of per-image lines
        #[arg(long)]
        json: bool,
    },
    /// Print a stock fitcrop.toml with all options documented
    GenConfig,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    input: &'a Path,
    output: &'a Path,
    #[serde(flatten)]
    report: &'a PipelineOutput,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let backend = RustBackend::new();
    let cancel = CancelToken::new();

    match cli.command {
        Command::Process {
            input,
            output: requested,
            geometry,
            budget,
            config: config_args,
            json,
            quiet,
        } => {
            let config = load_config(&config_args)?;
            let request = CropRequest {
                crop: geometry.crop,
                rotation_degrees: geometry.rotate,
                target_bytes: budget.target_bytes,
                initial_max_dimension: budget.max_dimension,
            };
            let source = std::fs::read(&input)?;
            let sink = |event: ProgressEvent| output::print_progress(&event);
            let progress = if quiet || json {
                Reporter::silent()
            } else {
                Reporter::new(ProgressPlan::pipeline(), &sink)
            };

            let result = pipeline::run(&source, &request, &config, &backend, &progress, &cancel)?;
            let written = resolve_output_path(&requested, result.result.format());
            std::fs::write(&written, result.result.buffer())?;

            if json {
                let report = JsonReport {
                    input: &input,
                    output: &written,
                    report: &result,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let target = request.target_bytes.unwrap_or(config.optimizer.target_bytes);
                output::print_report(&result, &input, &written, target);
            }
        }
        Command::Crop {
            input,
            output: requested,
            geometry,
            config: config_args,
        } => {
            let config = load_config(&config_args)?;
            let request = CropRequest {
                crop: geometry.crop,
                rotation_degrees: geometry.rotate,
                ..CropRequest::default()
            };
            let source = std::fs::read(&input)?;
            let result = pipeline::crop_only(
                &source,
                &request,
                &config,
                &backend,
                &Reporter::silent(),
                &cancel,
            )?;
            let written = resolve_output_path(&requested, result.format);
            std::fs::write(&written, &result.bytes)?;
            output::print_crop_report(&result, &input, &written);
        }
        Command::Check {
            input,
            config: config_args,
        } => {
            let config = load_config(&config_args)?;
            let source = std::fs::read(&input)?;
            let info = pipeline::inspect(&source, &config, &backend)?;
            output::print_check(&info, &input);
        }
        Command::Batch {
            dir,
            output_dir,
            budget,
            config: config_args,
            json,
        } => {
            let config = load_config(&config_args)?;
            init_thread_pool(&config.processing);
            let request = CropRequest {
                target_bytes: budget.target_bytes,
                initial_max_dimension: budget.max_dimension,
                ..CropRequest::default()
            };
            let inputs = batch::collect_inputs(&dir)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    if json {
                        continue;
                    }
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = batch::run_batch(
                &inputs,
                &output_dir,
                &request,
                &config,
                &backend,
                Some(tx),
                &cancel,
            )?;
            printer
                .join()
                .map_err(|_| "batch printer thread panicked")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_batch_summary(&summary);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_config(args: &ConfigArgs) -> Result<config::PipelineConfig, config::ConfigError> {
    let cwd = std::env::current_dir()?;
    config::load_config(args.preset, args.config.as_deref(), &cwd)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Keep the requested path unless its extension contradicts the encoded format.
fn resolve_output_path(requested: &Path, format: OutputFormat) -> PathBuf {
    let ext = requested
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let matches = match (format, ext.as_deref()) {
        (OutputFormat::Jpeg, Some("jpg" | "jpeg")) => true,
        (OutputFormat::Png, Some("png")) => true,
        _ => false,
    };
    if matches {
        return requested.to_path_buf();
    }
    let adjusted = requested.with_extension(format.extension());
    log::warn!(
        "output is {:?}, writing {} instead of {}",
        format,
        adjusted.display(),
        requested.display()
    );
    adjusted
}

/// Parse `X,Y,W,H`.
fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid crop '{s}': {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(CropRect::new(*x, *y, *w, *h)),
        _ => Err(format!("invalid crop '{s}': expected X,Y,W,H")),
    }
}
