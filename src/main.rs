mod alerts;
mod config;
mod shell;
mod timer;

use alerts::{DesktopNotifier, Muted, SoundPlayer, SystemSound};
use anyhow::Context;
use clap::Parser;
use config::SettingsStore;
use shell::{Event, Shell, TICK_PERIOD};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Pomodoro timer for the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to pomodoro_settings.json next to the executable)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Don't play a sound when an interval ends
    #[arg(long)]
    no_sound: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let path = cli.settings.unwrap_or_else(SettingsStore::default_path);
    let store = SettingsStore::load(path).context("could not load settings")?;

    let sound: Box<dyn SoundPlayer> = if cli.no_sound {
        Box::new(Muted)
    } else {
        Box::new(SystemSound::default())
    };
    let mut shell = Shell::new(store, sound, Box::new(DesktopNotifier), io::stdout());
    println!(
        "🍅 Pomodoro timer (settings: {})",
        shell.store().path().display()
    );

    let (tx, rx) = mpsc::channel();
    let interrupt = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Event::Interrupt);
    })
    .context("could not set Ctrl-C handler")?;
    let _ticker = shell::spawn_ticker(tx.clone(), TICK_PERIOD).context("could not start ticker")?;
    let _input = shell::spawn_input_reader(tx, BufReader::new(io::stdin()))
        .context("could not read stdin")?;

    shell.run(rx).context("could not write to the terminal")?;
    info!(
        "exiting after {} pomodoros",
        shell.timer().pomodoros_completed()
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
