use clap::{Parser, Subcommand};
use pixbatch::logging::{self, LogConfig};
use pixbatch::process::Orchestrator;
use pixbatch::source::{FileSource, ImageSource};
use pixbatch::{config, output};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pixbatch")]
#[command(about = "Batch image processor: originals, medium renditions and thumbnails")]
#[command(long_about = "\
Batch image processor: originals, medium renditions and thumbnails

Each input image becomes a job. Jobs run in parallel, but only a limited
number decode, resize and encode at the same time; the rest wait their turn
in arrival order. A job that fails never stops the others.

Output structure:

  <storage root>/                  # default: <system temp>/Processed
  └── <job id>/
      ├── original.jpg             # input bytes, unmodified
      ├── small.jpg                # medium rendition (1024px longest edge)
      └── thumb.jpg                # thumbnail (256px longest edge)

Limits, sizes, quality and the storage root are read from pixbatch.toml in
the config directory. Run 'pixbatch gen-config' for a documented file.")]
#[command(version)]
struct Cli {
    /// Directory containing pixbatch.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a batch of image files
    Process {
        /// Input images (JPEG, PNG, TIFF, WebP)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the final batch report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print a stock pixbatch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(LogConfig {
        json: cli.json_logs,
        verbose: cli.verbose,
    });

    match cli.command {
        Command::Process { files, report } => {
            let config = config::load_config(&cli.config_dir)?;
            let orchestrator = Orchestrator::new(config)?;

            let events = orchestrator.subscribe();
            let printer = std::thread::spawn(move || {
                for event in events {
                    output::print_process_event(&event);
                }
            });

            let inputs: Vec<Arc<dyn ImageSource>> = files
                .into_iter()
                .map(|path| Arc::new(FileSource::new(path)) as Arc<dyn ImageSource>)
                .collect();
            orchestrator.select(inputs);
            let result = orchestrator.start();

            // Dropping the orchestrator closes the event stream and ends the printer.
            drop(orchestrator);
            if printer.join().is_err() {
                return Err("progress printer panicked".into());
            }

            let Some(result) = result else {
                return Ok(());
            };
            println!();
            output::print_batch_report(&result);

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&result)?;
                std::fs::write(&path, json)?;
                println!("Report: {}", path.display());
            }
            if result.failed() > 0 {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
