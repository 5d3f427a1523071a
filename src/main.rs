use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};

use mli_morphometry_lib::image_io::save_image;
use mli_morphometry_lib::output::{write_result_json, write_results_csv};
use mli_morphometry_lib::preview::{run_preview, PreviewOutcome, PreviewScheduler};
use mli_morphometry_lib::{
    analyze_batch, get_image_files_in_dir, load_input, AnalysisImage, AnalysisImageRecord,
    AnalysisOptions, AnalysisResultRecord, AppConfig, BatchRecord, ImageInput, ResultStore,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Mean Linear Intercept measurement for lung histology")]
struct Args {
    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Log stage details
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse all images of one animal and record the result
    Analyze {
        /// Animal or specimen identifier
        #[clap(short, long)]
        animal: String,

        /// Image files or directories
        #[clap(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Analyse a single image without recording anything
    Preview {
        image: PathBuf,
    },
    /// Print every recorded result
    Results,
    /// Remove every recorded result
    Clear,
    /// Export recorded results as CSV, or as JSON for one animal
    Export {
        /// Restrict the export to one animal
        #[clap(short, long)]
        animal: Option<String>,

        /// Output file (.json or .csv)
        #[clap(short, long)]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module(
            "mli_morphometry_lib",
            if args.verbose { LevelFilter::Debug } else { LevelFilter::Info },
        )
        .init();

    let config = if Path::new(&args.config).exists() {
        AppConfig::from_file(&args.config)?
    } else {
        info!("No config file at {}, using defaults", args.config);
        AppConfig::default()
    };
    let options = AnalysisOptions::from(&config);

    let start_time = Instant::now();

    match args.command {
        Command::Analyze { animal, inputs } => {
            let inputs = collect_inputs(&inputs)?;
            let outcome = analyze_batch(&animal, &inputs, &config.analysis, &options)?;

            if let Some(dir) = &config.overlay_dir {
                for image in &outcome.result.images {
                    write_overlays(Path::new(dir), &animal, image)?;
                }
            }

            let record = AnalysisResultRecord::from_result(&outcome.result)?;
            let store = ResultStore::open(&config.results_path)?;
            store.record_analysis(record.clone())?;

            let batch = BatchRecord {
                result: record,
                failures: outcome.failures,
            };
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
        Command::Preview { image } => {
            let input = load_input(&image)?;
            let scheduler = PreviewScheduler::new();
            let ticket = scheduler.begin(&input.image_id);
            match run_preview(&ticket, &input, 1, &config.analysis, &options)? {
                PreviewOutcome::Completed(result) => {
                    let record = AnalysisImageRecord::from_image(&result)?;
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                PreviewOutcome::Superseded => bail!("preview was superseded"),
            }
        }
        Command::Results => {
            let store = ResultStore::open(&config.results_path)?;
            println!("{}", serde_json::to_string_pretty(&store.results())?);
        }
        Command::Clear => {
            ResultStore::open(&config.results_path)?.clear_results()?;
            info!("Cleared results in {}", config.results_path);
        }
        Command::Export { animal, out } => {
            let store = ResultStore::open(&config.results_path)?;
            let results = match &animal {
                Some(id) => match store.result_for_animal(id) {
                    Some(record) => vec![record],
                    None => bail!("no recorded result for animal {}", id),
                },
                None => store.results(),
            };

            let as_json = out.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
            let written = if as_json {
                let [record] = results.as_slice() else {
                    bail!("JSON export needs exactly one animal, pass --animal");
                };
                write_result_json(record, &out)
            } else {
                write_results_csv(&results, &out)
            };
            written.with_context(|| format!("exporting to {}", out.display()))?;
            info!("Exported results to {}", out.display());
        }
    }

    info!("Completed in {:.2} seconds", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Expand directories and load every image, in path order
fn collect_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<ImageInput>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(get_image_files_in_dir(path)?);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("input not found: {}", path.display());
        }
    }

    files
        .iter()
        .map(|path| load_input(path).with_context(|| format!("reading {}", path.display())))
        .collect()
}

fn write_overlays(dir: &Path, animal: &str, image: &AnalysisImage) -> anyhow::Result<()> {
    let dir = dir.join(animal);
    std::fs::create_dir_all(&dir)?;
    let stem = format!("{:03}_{}", image.image_number, image.image_id);
    save_image(&image.overlays.processed, dir.join(format!("{}_processed.png", stem)))?;
    save_image(&image.overlays.threshold, dir.join(format!("{}_threshold.png", stem)))?;
    Ok(())
}
