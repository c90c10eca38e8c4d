use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use raq_sim::config::{self, Command, FormatArg, LiveArgs, RunArgs, WatchArgs};
use raq_sim::connection::Connection;
use raq_sim::driver::{self, Command as DriverCommand};
use raq_sim::engine::{self, SimulationEngine};
use raq_sim::error::{Error, Result};
use raq_sim::models::StrategyConfig;
use raq_sim::output::{self, Formatter, HumanFormatter, JsonFormatter, SummaryFormatter};
use raq_sim::protocol::{ERROR_EVENT, WILDCARD};
use raq_sim::retry::{connect_with_retry, RetryPolicy};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("raq_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = config::parse_args()?;

    match args.command {
        Command::Run(args) => run_headless(args),
        Command::Live(args) => run_live(args).await,
        Command::Watch(args) => watch(args).await,
        Command::ListStrategies => {
            for strategy in StrategyConfig::ALL {
                println!("{}", strategy);
            }
            Ok(())
        }
        Command::ShowConfig(args) => {
            let config = config::build_sim_config(&args)?;
            print!("{}", config::describe(&config));
            Ok(())
        }
    }
}

fn run_headless(args: RunArgs) -> Result<()> {
    let config = config::build_sim_config(&args.sim)?;
    let snapshot = engine::run_simulation(&config, args.duration_ms)?;
    print!("{}", formatter_for(&args.format).write(&snapshot));
    Ok(())
}

async fn run_live(args: LiveArgs) -> Result<()> {
    let config = config::build_sim_config(&args.sim)?;
    let mut engine = SimulationEngine::from_config(config)?;
    engine.set_speed(args.speed)?;

    let handle = driver::spawn(engine, driver::DEFAULT_TICK);
    handle.send(DriverCommand::Start);
    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);
    let mut report = time::interval(Duration::from_secs(args.report_every_secs.max(1)));

    loop {
        tokio::select! {
            _ = report.tick() => info!("{}", output::status_line(&handle.snapshot())),
            _ = time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    let last = handle.snapshot();
    let snapshot = match handle.shutdown().await {
        Some(engine) => engine.snapshot(),
        None => last,
    };
    print!("{}", formatter_for(&args.format).write(&snapshot));
    Ok(())
}

async fn watch(args: WatchArgs) -> Result<()> {
    if let Some(speed) = args.speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::InvalidSpeed(speed));
        }
    }
    let config = config::build_connection_config(&args)?;
    let connection = Connection::new(config);
    connection.on(WILDCARD, |message| println!("{}", message));
    connection.on(ERROR_EVENT, |payload| warn!(%payload, "socket error"));

    connect_with_retry(&connection, &RetryPolicy::with_attempts(args.retry)).await?;
    if let Some(control) = args.control {
        connection.control_simulation(control.into());
    }
    if let Some(speed) = args.speed {
        connection.set_speed(speed);
    }

    tokio::select! {
        _ = time::sleep(Duration::from_secs(args.duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    connection.disconnect();
    Ok(())
}

fn formatter_for(format: &FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}
