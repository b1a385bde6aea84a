//! # statusinfo
//!
//! Status line for dwlb, sway/tmux (text) and other bars.
//!
//! # Usage
//!
//! ```bash
//! # Set the X root window name (dwm); text on stdout without a display
//! statusinfo
//!
//! # Print status lines on stdout (sway bar, tmux)
//! statusinfo -t
//!
//! # Drive dwlb through $XDG_RUNTIME_DIR/dwlb/dwlb-0
//! statusinfo 0
//!
//! # Custom configuration and verbose logging
//! statusinfo -t --config ~/.config/statusinfo.toml -v
//! ```

use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use statusinfo::classifier::{Classifier, ClassifierContext, watched_subsystems};
use statusinfo::composer::Composer;
use statusinfo::core::Reactor;
use statusinfo::error::StatusError;
use statusinfo::net::{SystemNetwork, WifiQuery};
use statusinfo::sink::{OutputMode, emit_closing_line};
use statusinfo::sources::{SignalTerminator, UeventSocket};
use statusinfo_common::config::StatusConfig;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// statusinfo - event-driven status line
#[derive(Parser, Debug)]
#[command(name = "statusinfo")]
#[command(version)]
#[command(about = "Status line with network, temperature, power, battery, clock and device notifications")]
#[command(long_about = None)]
struct Args {
    /// Write status lines to stdout (sway bar, tmux)
    #[arg(short, long)]
    text: bool,

    /// dwlb socket number ($XDG_RUNTIME_DIR/dwlb/dwlb-<N>); without it and
    /// without -t the X root window name is set
    #[arg(value_name = "N", conflicts_with = "text")]
    socket: Option<u32>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), StatusError> {
    let args = Args::parse();
    let config = StatusConfig::load_or_default(args.config.as_deref());
    setup_tracing(&args, config.as_ref().ok());
    let config = config?;

    info!("statusinfo v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut sink = OutputMode::select(args.text, args.socket).open()?;
    let termination = match SignalTerminator::install() {
        Ok(termination) => termination,
        Err(e) => {
            error!("Unable to initialise signal handling ({e}): exit requested");
            emit_closing_line(sink.as_mut())?;
            return Ok(());
        }
    };

    let wifi = match WifiQuery::connect() {
        Ok(query) => {
            info!("nl80211 available: wifi signal reporting enabled");
            Some(query)
        }
        Err(e) => {
            warn!("nl80211 unavailable ({e}): wifi signal reporting disabled");
            None
        }
    };

    let composer = Composer::new(&config, Box::new(SystemNetwork::new(wifi)));
    let classifier = Classifier::new(ClassifierContext::from_config(&config));
    let mut reactor = Reactor::new(&config, composer, classifier, Box::new(termination), sink);

    match UeventSocket::open(&config.sysfs_root, &watched_subsystems()) {
        Ok(devices) => {
            info!("Device event monitoring enabled");
            reactor = reactor.with_devices(Box::new(devices));
        }
        Err(e) => warn!("Device events unavailable ({e}): udev notifications disabled"),
    }

    #[cfg(feature = "alsa")]
    match statusinfo::sources::AlsaMixer::open(&config.alsa_device, &config.mixer_controls) {
        Ok(mixer) => reactor = reactor.with_audio(Box::new(mixer)),
        Err(e) => warn!("Mixer unavailable ({e}): volume events won't be reported"),
    }

    let outcome = reactor.run();
    if let Err(e) = reactor.close() {
        warn!("Could not send closing line: {e}");
    }

    let signal = outcome?;
    info!(
        "Exit: {} received. Status info closed",
        signal.as_deref().unwrap_or("signal")
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and configuration.
///
/// Logs always go to stderr; stdout belongs to the text sink.
fn setup_tracing(args: &Args, config: Option<&StatusConfig>) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        config
            .map(|c| c.log_level.as_directive())
            .unwrap_or("info")
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}
