use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use meshkit::config::{CliArgs, PipelineConfig};
use meshkit::pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let log_json = args.log_json;
    let config: PipelineConfig = args.into();

    // RUST_LOG wins over the -v default
    let default_filter = if config.verbose {
        "meshkit=debug"
    } else {
        "meshkit=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    match Pipeline::run(&config) {
        Ok(result) => {
            if let Some(report) = &result.profile_report {
                eprint!("{report}");
            }
            eprintln!(
                "Done: {} vertices, {} faces in {:.3}s",
                result.vertex_count,
                result.face_count,
                result.duration.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            error!(%e, "Pipeline failed");
            Err(anyhow::anyhow!(e)).context("meshkit failed")
        }
    }
}
