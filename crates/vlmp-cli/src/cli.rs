use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "VLMP Developers",
    version,
    about = "VLMP CLI - Compose pools of coarse-grained simulations into sessions and launch them on GPUs.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble a simulation pool, distribute it into sets and write the session to disk.
    Prepare(PrepareArgs),
    /// Launch the simulator for every simulation set of a prepared session.
    Run(RunArgs),
}

/// Arguments for the `prepare` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PrepareArgs {
    /// Path to the simulation pool (JSON array or TOML `[[simulation]]` tables).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub pool: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the session name.
    #[arg(short = 'n', long, value_name = "NAME")]
    pub session_name: Option<String>,

    /// Override the directory the session folder is created in.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Override the distribution strategy.
    /// One of: none, one, size:<k>, upperLimit:<property>:<limit>, property:<path>
    #[arg(short, long, value_name = "STRATEGY")]
    pub distribution: Option<String>,

    /// Directory of additional declarative components, one sub-folder per category.
    #[arg(long, value_name = "DIR")]
    pub components: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S distribution.strategy=size:4
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the session descriptor (`VLMPsession.json`).
    #[arg(short = 's', long = "simulationSetsInfo", required = true, value_name = "PATH")]
    pub simulation_sets_info: PathBuf,

    #[command(flatten)]
    pub mode: RunMode,

    /// GPUs to run on; one worker is started per GPU in local mode.
    #[arg(long = "gpuList", value_name = "INT", num_args(1..))]
    pub gpu_list: Option<Vec<u32>>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S launcher.simulator=UAMMDlauncher
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Exactly one launch mode must be chosen.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = true, multiple = false)]
pub struct RunMode {
    /// Run the simulator on this machine, one worker per GPU.
    #[arg(long)]
    pub local: bool,
    /// Submit one batch job per simulation set to the queue.
    #[arg(long)]
    pub liquid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_requires_exactly_one_mode() {
        assert!(Cli::try_parse_from(["vlmp", "run", "-s", "VLMPsession.json"]).is_err());
        assert!(
            Cli::try_parse_from(["vlmp", "run", "-s", "x.json", "--local", "--liquid"]).is_err()
        );
        let cli = Cli::try_parse_from([
            "vlmp",
            "run",
            "--simulationSetsInfo",
            "x.json",
            "--local",
            "--gpuList",
            "0",
            "2",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert!(args.mode.local);
        assert_eq!(args.gpu_list, Some(vec![0, 2]));
    }

    #[test]
    fn prepare_collects_overrides() {
        let cli = Cli::try_parse_from([
            "vlmp",
            "-vv",
            "prepare",
            "--pool",
            "pool.json",
            "--distribution",
            "size:2",
            "-S",
            "session.name=demo",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Prepare(args) = cli.command else {
            panic!("Expected 'prepare' subcommand");
        };
        assert_eq!(args.distribution.as_deref(), Some("size:2"));
        assert_eq!(args.set_values, vec!["session.name=demo"]);
    }
}
