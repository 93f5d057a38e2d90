use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nqs_swo::{read_config, LinearPhase, LogLinearAmplitude, Swo};

#[derive(Parser, Debug)]
#[command(version, about = "Sampling-while-optimizing for spin-1/2 systems", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Overrides the number of SWO iterations in the config file
    #[arg(short, long)]
    epochs: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match read_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Cannot read {}: {}", args.config, e);
            std::process::exit(1);
        }
    };
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut amplitude = LogLinearAmplitude::random(config.number_spins, &mut rng);
    let mut phase = LinearPhase::random(config.number_spins, &mut rng);

    let mut swo = match Swo::from_config(config) {
        Ok(swo) => swo,
        Err(e) => {
            error!("Cannot set up the run: {}", e);
            std::process::exit(1);
        }
    };
    let summary = swo.run(&mut amplitude, &mut phase);
    info!(
        "Finished: {} iterations completed, {} failed",
        summary.completed, summary.failed
    );
}
