use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;

use crate::config::Config;
use crate::{observability, run};

/// Synthetic request workload for graph stores.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Distributions(DistributionsCommand),
    Version(VersionCommand),
}

/// run the request phase against the in-memory store
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// number of concurrent requesters, overrides the configuration
    #[argh(option, short = 'r')]
    requesters: Option<usize>,

    /// random seed, overrides the configuration
    #[argh(option, short = 's')]
    seed: Option<u64>,
}

/// list the registered multiget count distributions
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "distributions")]
struct DistributionsCommand {}

/// print the linkbench version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let run_command = match args.command {
        Command::Version(VersionCommand {}) => {
            println!("linkbench {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Distributions(DistributionsCommand {}) => {
            for name in linkbench_engine::distribution::registered_distributions() {
                println!("{name}");
            }
            return Ok(());
        }
        Command::Run(run_command) => run_command,
    };

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(requesters) = run_command.requesters {
        config.requesters = requesters;
    }
    if let Some(seed) = run_command.seed {
        config.seed = Some(seed);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("linkbench-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    runtime.block_on(run::run(config))
}
