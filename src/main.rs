use clap::{Parser, Subcommand};
use pixpack::batch::Batch;
use pixpack::decoder::inspect;
use pixpack::notify::{ConsoleNotifier, Notifier, TracingNotifier};
use pixpack::{CollisionPolicy, DecodeOptions, EncodeOptions, Layout};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pixpack", about = "Hide files inside lossless RGB images and get them back")]
struct Cli {
    /// Log every record packed or extracted
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Send notifications to the log instead of the terminal
    #[arg(long, global = true)]
    log_notifications: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack files and directories into one PNG, BMP or TIFF image
    Encode {
        #[arg(short, long)]
        output: PathBuf,
        /// Fixed canvas width in pixels (default: near-square)
        #[arg(short, long)]
        width: Option<u32>,
        /// Print a JSON summary of the packed image
        #[arg(long)]
        json: bool,
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Extract every file hidden in the given images
    Decode {
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Fail an image instead of overwriting an existing file
        #[arg(long)]
        reject_collisions: bool,
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// List the files hidden in an image without extracting them
    List {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show canvas and container details for an image
    Info {
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let console = ConsoleNotifier { quiet: cli.quiet };
    let notifier: &dyn Notifier = if cli.log_notifications { &TracingNotifier } else { &console };

    match run(cli.command, notifier, cli.quiet) {
        Ok(true)  => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            notifier.exception(e.as_ref(), "Something went wrong!");
            ExitCode::FAILURE
        }
    }
}

fn run(
    command: Commands,
    notifier: &dyn Notifier,
    quiet: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let info_title  = "Operation successful!";
    let error_title = "Operation failed!";

    match command {

        // ── Encode ───────────────────────────────────────────────────────────
        Commands::Encode { output, width, json, input } => {
            let opts = EncodeOptions {
                layout: width.map(Layout::Width).unwrap_or_default(),
            };
            let report = Batch::new(notifier).encode(&input, &output, &opts);
            if json {
                println!("{}", serde_json::to_string_pretty(&report.summary())?);
            } else if !quiet {
                for name in &report.packed {
                    println!("  packed  {name}");
                }
            }
            if report.succeeded() {
                notifier.info(info_title, "Image created from files.");
            } else {
                notifier.error(error_title, "Image not created due to errors.");
            }
            Ok(report.succeeded())
        }

        // ── Decode ───────────────────────────────────────────────────────────
        Commands::Decode { output_dir, reject_collisions, input } => {
            let opts = DecodeOptions {
                collisions: if reject_collisions {
                    CollisionPolicy::Reject
                } else {
                    CollisionPolicy::Overwrite
                },
            };
            let report = Batch::new(notifier).decode(&input, &output_dir, &opts);
            if !quiet {
                for path in &report.written {
                    println!("  extracted  {}", path.display());
                }
            }
            if report.succeeded() {
                notifier.info(info_title, "Files extracted from image.");
            } else {
                notifier.error(error_title, "Unable to extract any files.");
            }
            Ok(report.succeeded())
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let inspection = inspect(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&inspection.entries)?);
                return Ok(true);
            }
            println!("Image: {}", input.display());
            println!("{:<40} {:>12}  BLAKE3", "Name", "Size");
            for entry in &inspection.entries {
                println!("{:<40} {:>12}  {}", entry.name, entry.size, &entry.blake3[..12]);
            }
            Ok(true)
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let inspection = inspect(&input)?;
            let payload: usize = inspection.entries.iter().map(|e| e.size).sum();
            println!("── pixpack image ────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Canvas         {} x {}", inspection.width, inspection.height);
            println!("  Capacity       {} B", inspection.capacity);
            println!("  Container      {} B", inspection.stream_len);
            println!("  Files          {}", inspection.entries.len());
            println!("  Payload        {} B", payload);
            Ok(true)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pixpack=debug" } else { "pixpack=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
