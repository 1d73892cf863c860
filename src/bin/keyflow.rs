// Keyflow CLI
// Captures the configured input devices, translates their events
// through the keymap and replays the result on a virtual device

use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{debug, error, info};

use keyflow_core::{
    DeviceReader, RuleTable, Settings, TranslationEngine, VirtualOutput, VIRTUAL_DEVICE_PREFIX,
};

/// Exit code when no matching input device is found
const EXIT_NO_DEVICE: i32 = 1;
/// Exit code when the keymap fails to load
const EXIT_BAD_KEYMAP: i32 = 2;

/// Poll timeout so the loop can notice a shutdown signal
const POLL_TIMEOUT_MS: i32 = 200;

/// Remap input-device events through a keymap rule file
#[derive(Parser, Debug)]
#[command(name = "keyflow")]
#[command(version)]
#[command(about = "Input event translator driven by a keymap rule file", long_about = None)]
struct Args {
    /// Keymap rule file
    #[arg(short, long, value_name = "FILE")]
    keymap: Option<PathBuf>,

    /// TOML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Capture devices whose name contains this string, or whose path
    /// equals it (can be used multiple times)
    #[arg(short, long, value_name = "FILTER")]
    device: Vec<String>,

    /// List available input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Validate the keymap and exit
    #[arg(long)]
    check_keymap: bool,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        log::LevelFilter::Warn
    } else {
        match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn list_devices() -> anyhow::Result<()> {
    let devices = keyflow_core::list_devices().context("enumerating input devices")?;
    println!("Found {} input device(s):", devices.len());
    for device in &devices {
        match &device.path {
            Some(path) => println!("  {}: {} ({})", device.index, device.name, path),
            None => println!("  {}: {}", device.index, device.name),
        }
    }
    Ok(())
}

fn run(args: Args) -> anyhow::Result<()> {
    let settings = match &args.config {
        Some(path) => Settings::from_toml_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let keymap_path = args
        .keymap
        .clone()
        .or_else(|| settings.keymap.path.clone())
        .unwrap_or_else(|| PathBuf::from("keymap.txt"));

    let rules = match RuleTable::from_path(&keymap_path) {
        Ok(rules) => Arc::new(rules),
        Err(e) => {
            error!("Failed to load keymap {}: {}", keymap_path.display(), e);
            exit(EXIT_BAD_KEYMAP);
        }
    };
    info!(
        "Loaded {} rule(s) from {}",
        rules.len(),
        keymap_path.display()
    );

    if args.check_keymap {
        println!("Keymap is valid: {} rule(s)", rules.len());
        return Ok(());
    }

    let filters = if args.device.is_empty() {
        settings.devices.filter.clone()
    } else {
        args.device.clone()
    };

    let mut reader = match DeviceReader::open_grabbed(&filters) {
        Ok(reader) => reader,
        Err(e) => {
            error!("{}", e);
            exit(EXIT_NO_DEVICE);
        }
    };
    info!("Listening on {:?}", reader.device_names());

    let mut output = VirtualOutput::new(VIRTUAL_DEVICE_PREFIX)
        .context("creating the virtual output device")?;

    // One independent engine per physical device; sessions never share
    // modifier, queue or variable state.
    let mut engines: Vec<TranslationEngine> = (0..reader.device_count())
        .map(|_| TranslationEngine::new(Arc::clone(&rules)))
        .collect();

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    while !shutdown.load(Ordering::Relaxed) {
        let events = reader.poll_events(POLL_TIMEOUT_MS)?;
        for polled in events {
            let out = engines[polled.device_index].handle_raw(polled.event);
            if !out.is_empty() {
                for event in &out {
                    debug!(" --> {}", event);
                }
                output.write_events(&out)?;
            }
        }
    }

    info!("Shutting down");
    reader.ungrab_all();
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let result = if args.list_devices {
        list_devices()
    } else {
        run(args)
    };

    if let Err(e) = result {
        error!("{:#}", e);
        exit(1);
    }
}
