use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use lantern::{SceneConfig, Viewer};

#[derive(Debug, Parser)]
#[command(name = "lantern", version, about = "Real-time PBR scene viewer with point-light shadows")]
struct Cli {
    /// Scene file (YAML). Without one the stock scene is loaded.
    #[arg(short, long, value_name = "FILE")]
    scene: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.scene {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("could not load scene '{}'", path.display()))?,
        None => SceneConfig::default(),
    };

    Viewer::new(config).run()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
