use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

mod collector;
mod config;
mod emitter;
mod error;
mod extract;
mod provider;
mod rates;
mod sink;
mod snapshot;
mod tags;
mod timings;

use collector::CollectorKind;
use config::{AgentConfig, CollectorOptions};
use error::Result;
use provider::SnapshotProvider;
use sink::Sink;

/// Polls a vitess server's /debug/vars endpoint and forwards flattened,
/// tagged samples to the metrics sink.
#[derive(Debug, Parser)]
#[command(name = "vitess-metrics-agent")]
struct Cli {
    /// Which server flavour to collect from.
    #[arg(value_enum)]
    collector: CollectorKind,

    /// Host serving the vars endpoint.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port on the host; defaults to the collector's well-known port.
    #[arg(long)]
    port: Option<u16>,

    /// Path of the vars endpoint.
    #[arg(long, default_value = "/debug/vars")]
    path: String,

    /// Read the snapshot from a local JSON file instead of HTTP.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Seconds between polls. 0 polls once and exits.
    #[arg(long, default_value_t = 10)]
    interval: u64,

    /// Forward info/debug diagnostics too.
    #[arg(long, short)]
    verbose: bool,

    /// Collectd-style toggle, e.g. --set IncludeACLStats=false. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_agent(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vitess-metrics-agent: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_agent(cli: Cli) -> Result<()> {
    let mut options = CollectorOptions::default();
    for pair in &cli.set {
        let (key, value) = config::split_option(pair)?;
        options.set(key, value);
    }

    let config = AgentConfig {
        host: cli.host,
        port: cli.port.unwrap_or_else(|| cli.collector.default_port()),
        path: cli.path,
        interval: cli.interval,
        verbose: cli.verbose,
        options,
    };

    // Info and debug diagnostics are forwarded only in verbose mode;
    // warnings and errors always go through.
    env_logger::Builder::new()
        .filter_level(if config.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let provider = match &cli.file {
        Some(path) => SnapshotProvider::file(path),
        None => SnapshotProvider::url(&config.host, config.port, &config.path)?,
    };

    println!();
    println!("vitess-metrics-agent → {}", cli.collector.name());
    match &provider {
        SnapshotProvider::Url { url, .. } => println!("   source   {url}"),
        SnapshotProvider::File { path } => {
            println!("   source   {}", path.display())
        }
    }
    println!("   interval {}s", config.interval);
    println!();

    let collector = cli.collector.build(&config.options);
    let mut sink = Sink::Console;

    collector::run(&collector, &provider, &mut sink, config.interval).await
}
