use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::validate_config;
use crate::error::{Error, Result};
use crate::models::{ConnectionConfig, Settings, SimConfig, StrategyConfig};
use crate::protocol::ControlAction;

#[derive(Parser, Debug)]
#[command(name = "raq-sim", about = "Rake dispatch simulation and live socket client")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a headless simulation in virtual time and print a report
    Run(RunArgs),
    /// Drive the simulation against the wall clock
    Live(LiveArgs),
    /// Connect to a simulation server and print inbound messages
    Watch(WatchArgs),
    /// List the assignment strategies
    ListStrategies,
    /// Print the resolved simulation configuration
    ShowConfig(SimArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SimArgs {
    #[arg(long, help = "TOML or JSON config file")]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
    #[arg(long)]
    pub rakes: Option<usize>,
    #[arg(long, help = "Seed the random source; omit for a fresh run every time")]
    pub seed: Option<u64>,
    #[arg(long, help = "Disable automatic order generation")]
    pub no_generation: bool,
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub sim: SimArgs,
    #[arg(long, default_value_t = 3_600_000)]
    pub duration_ms: u64,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
}

#[derive(ClapArgs, Debug)]
pub struct LiveArgs {
    #[command(flatten)]
    pub sim: SimArgs,
    #[arg(long, default_value_t = 30)]
    pub duration_secs: u64,
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,
    #[arg(long, default_value_t = 5)]
    pub report_every_secs: u64,
    #[arg(long, value_enum, default_value_t = FormatArg::Summary)]
    pub format: FormatArg,
}

#[derive(ClapArgs, Debug)]
pub struct WatchArgs {
    #[arg(long, help = "Socket URL; overrides the config file")]
    pub url: Option<String>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub control: Option<ControlArg>,
    #[arg(long)]
    pub speed: Option<f64>,
    #[arg(long, default_value_t = 10)]
    pub duration_secs: u64,
    #[arg(long, default_value_t = 1, help = "Connect attempts before giving up")]
    pub retry: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    FirstFit,
    NearestRake,
    LargestStock,
}

impl From<StrategyArg> for StrategyConfig {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::FirstFit => StrategyConfig::FirstFit,
            StrategyArg::NearestRake => StrategyConfig::NearestRake,
            StrategyArg::LargestStock => StrategyConfig::LargestStock,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlArg {
    Pause,
    Resume,
    Stop,
}

impl From<ControlArg> for ControlAction {
    fn from(value: ControlArg) -> Self {
        match value {
            ControlArg::Pause => ControlAction::Pause,
            ControlArg::Resume => ControlAction::Resume,
            ControlArg::Stop => ControlAction::Stop,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

pub fn parse_args() -> Result<Args> {
    Args::try_parse().map_err(|err| match err.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => err.exit(),
        _ => Error::Cli(err.to_string()),
    })
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

fn settings_from(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => load_settings(path),
        None => Ok(Settings::default()),
    }
}

/// Resolves the simulation config: file (or defaults), then CLI overrides,
/// then validation.
pub fn build_sim_config(args: &SimArgs) -> Result<SimConfig> {
    let mut config = settings_from(args.config.as_deref())?.simulation;

    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(rakes) = args.rakes {
        config.rake_count = rakes;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.no_generation {
        config.generation.enabled = false;
    }

    validate_config(&config)?;
    Ok(config)
}

pub fn build_connection_config(args: &WatchArgs) -> Result<ConnectionConfig> {
    let mut config = settings_from(args.config.as_deref())?.connection;
    if let Some(url) = &args.url {
        config.url = url.clone();
    }
    if !config.url.starts_with("ws://") && !config.url.starts_with("wss://") {
        return Err(Error::Cli(format!(
            "socket url must start with ws:// or wss:// (got '{}')",
            config.url
        )));
    }
    Ok(config)
}

/// Human-readable dump of a resolved config.
pub fn describe(config: &SimConfig) -> String {
    let mut out = String::new();
    let seed = match config.seed {
        Some(seed) => seed.to_string(),
        None => "none".to_string(),
    };
    let generation = &config.generation;

    out.push_str(&format!("Strategy: {}\n", config.strategy));
    out.push_str(&format!(
        "Rakes: {} x {}t at ({}, {})\n",
        config.rake_count, config.rake_capacity, config.depot.x, config.depot.y
    ));
    out.push_str(&format!("Seed: {}\n", seed));
    if generation.enabled {
        out.push_str(&format!(
            "Generation: every {}-{}ms, {}-{}t\n",
            generation.min_interval_ms,
            generation.max_interval_ms,
            generation.min_quantity,
            generation.max_quantity
        ));
    } else {
        out.push_str("Generation: off\n");
    }
    out.push_str("Stockyards:\n");
    for yard in &config.stockyards {
        let stock = yard
            .materials
            .iter()
            .map(|(material, tons)| format!("{} {}t", material, tons))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "- {} at ({}, {}), {} slots: {}\n",
            yard.name, yard.position.x, yard.position.y, yard.loading_capacity, stock
        ));
    }
    out.push_str("Destinations:\n");
    for destination in &config.destinations {
        out.push_str(&format!(
            "- {} at ({}, {})\n",
            destination.name, destination.position.x, destination.position.y
        ));
    }
    out
}
