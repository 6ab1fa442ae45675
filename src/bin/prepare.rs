use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use spike_density::config::{ConfigOverrides, PipelineConfig};
use spike_density::data::loader::FileSource;
use spike_density::pipeline::prepare_multiscale_spike_density;
use spike_density::store::{LocalStore, StoreContext};

/// Bin a units table into a multiscale spike density and publish it.
#[derive(Parser, Debug)]
#[command(name = "prepare", version, long_about = None)]
struct Args {
    /// Units table with per-unit spike times (.parquet, .json or .csv)
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Full-resolution bin width in milliseconds (default: 20)
    #[arg(long)]
    bin_size_msec: Option<f64>,

    /// Storage zone to publish to (default: "scratch")
    #[arg(long)]
    zone: Option<String>,

    /// Root directory of the artifact store
    #[arg(long)]
    store_root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let overrides = ConfigOverrides {
        bin_size_msec: args.bin_size_msec,
        zone: args.zone,
        store_root: args.store_root,
    };
    let config = PipelineConfig::load(args.config.as_deref(), &overrides)?;
    log::debug!("Configuration: {config:?}");

    let source = FileSource::new(&args.input);
    let store = LocalStore::new(&config.store_root, StoreContext::new(&config.zone));

    let uri = prepare_multiscale_spike_density(&source, &config, &store)?;
    println!("{uri}");
    Ok(())
}
