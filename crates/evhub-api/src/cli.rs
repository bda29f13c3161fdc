//! CLI definitions for the `evhubd` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use evhub_types::config::DaemonConfig;

/// Event distribution daemon.
#[derive(Parser)]
#[command(name = "evhubd", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log verbosity (-v for debug, -vv for trace). `RUST_LOG` wins when set.
    #[arg(short = 'v', long = "verbose-log", action = clap::ArgAction::Count, global = true)]
    pub log_verbosity: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the event server.
    Serve(ServeArgs),

    /// Print the effective configuration as TOML and exit.
    Config(ServeArgs),
}

/// Options for `serve`. Flags override values from the config file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to the TOML config file.
    #[arg(long, short, env = "EVHUBD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on.
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Forward `debug` logging events to listeners.
    #[arg(long)]
    pub debug: bool,

    /// Forward `info` logging events to listeners.
    #[arg(long)]
    pub verbose: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long)]
    pub otel: bool,
}

impl ServeArgs {
    /// Layer command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(host) = &self.host {
            config.listen.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        config.events.debug |= self.debug;
        config.events.verbose |= self.verbose;
        config.telemetry.otel |= self.otel;
    }
}
