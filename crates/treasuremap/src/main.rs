//! `tmap` - CLI for treasuremap
//!
//! This binary hosts the marker store: it opens the configured database,
//! applies one command, and exits.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;

use treasuremap::cli::{
    ClearCommand, Cli, Command, ConfigCommand, CoordinateArgs, ExportCommand, ListCommand,
};
use treasuremap::handoff::{Delivery, NO_RECEIVER_NOTICE};
use treasuremap::{init_logging, Config, MapViewModel, MarkerRepository, SqliteStore};

type ViewModel = MapViewModel<SqliteStore>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Config commands load configuration on their own.
    let load_config = || Config::load_from(cli.config.clone());

    match cli.command {
        Command::Config(config_cmd) => handle_config(cli.config.clone(), config_cmd),
        Command::Add(coords) => handle_add(&open_view_model(&load_config()?)?, coords),
        Command::Remove(coords) => handle_remove(&open_view_model(&load_config()?)?, coords),
        Command::Clear(clear_cmd) => {
            handle_clear(&open_view_model(&load_config()?)?, &clear_cmd)
        }
        Command::List(list_cmd) => handle_list(&open_view_model(&load_config()?)?, &list_cmd),
        Command::Export(export_cmd) => {
            let config = load_config()?;
            handle_export(&config, &open_view_model(&config)?, &export_cmd)
        }
    }
}

fn open_view_model(config: &Config) -> anyhow::Result<ViewModel> {
    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .with_context(|| format!("failed to open flag storage at {}", path.display()))?;
    let location = store.path().display().to_string();
    let repository = MarkerRepository::open(store, config.repository_options())
        .with_context(|| format!("failed to load flags from {location}"))?;
    Ok(MapViewModel::new(Rc::new(repository)))
}

fn handle_add(view_model: &ViewModel, coords: CoordinateArgs) -> anyhow::Result<()> {
    let marker = view_model.add_marker(coords.latitude, coords.longitude)?;
    println!(
        "Added flag {} at {:.6}, {:.6}",
        view_model.markers().len(),
        marker.latitude,
        marker.longitude
    );
    Ok(())
}

fn handle_remove(view_model: &ViewModel, coords: CoordinateArgs) -> anyhow::Result<()> {
    let before = view_model.markers().len();
    if view_model.remove_marker(coords.latitude, coords.longitude)? {
        let removed = before - view_model.markers().len();
        println!("Removed {removed} flag(s)");
    } else {
        println!("No flag at {}, {}", coords.latitude, coords.longitude);
    }
    Ok(())
}

fn handle_clear(view_model: &ViewModel, cmd: &ClearCommand) -> anyhow::Result<()> {
    let count = view_model.markers().len();
    if !cmd.yes {
        println!("This will remove all {count} flag(s).");
        println!("Use --yes to confirm.");
        return Ok(());
    }
    view_model.clear_all_markers()?;
    println!("Removed all {count} flag(s)");
    Ok(())
}

fn handle_list(view_model: &ViewModel, cmd: &ListCommand) -> anyhow::Result<()> {
    let markers = view_model.markers().get();
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&*markers)?);
        return Ok(());
    }

    println!("Flags: {}", markers.len());
    for (index, marker) in markers.iter().enumerate() {
        println!(
            "{:>4}. {:.6}, {:.6}  {}  [{}]",
            index + 1,
            marker.latitude,
            marker.longitude,
            marker.title,
            marker.id
        );
        if !marker.description.is_empty() {
            println!("      {}", marker.description);
        }
    }
    Ok(())
}

fn handle_export(config: &Config, view_model: &ViewModel, cmd: &ExportCommand) -> anyhow::Result<()> {
    let format = cmd.format.map_or(config.export.format, Into::into);
    let payload = view_model.export_payload(format, &config.export.task_label)?;
    println!("{payload}");

    if !cmd.send {
        return Ok(());
    }

    if !cmd.yes && !confirm_send(io::stdin().lock(), &mut io::stderr())? {
        eprintln!("Nothing sent.");
        return Ok(());
    }

    let target = config.export_target();
    match view_model.send_to_logbook(&target, &payload)? {
        Delivery::Delivered => {
            eprintln!("Sent {} flag(s) to the logbook", view_model.markers().len());
        }
        Delivery::NoReceiver => eprintln!("{NO_RECEIVER_NOTICE}"),
    }
    Ok(())
}

/// Ask on `output` whether to send and read the answer from `input`.
///
/// Only an explicit yes confirms; end of input declines.
fn confirm_send(mut input: impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "Send this payload to the logbook? [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Slot key:           {}", config.storage.slot_key);
                println!();
                println!("[Markers]");
                println!("  Default title:      {}", config.markers.default_title);
                println!("  Corruption policy:  {:?}", config.markers.corruption_policy);
                println!();
                println!("[Export]");
                println!("  Format:             {}", config.export.format);
                println!("  Task label:         {}", config.export.task_label);
                println!();
                println!("[Receiver]");
                println!("  Program:            {}", config.receiver.program);
                println!("  Action:             {}", config.receiver.action);
                println!("  Extra key:          {}", config.receiver.extra_key);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            validate_config_file(path)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn validate_config_file(path: PathBuf) -> anyhow::Result<Config> {
    let display = path.display().to_string();
    Config::load_from(Some(path)).with_context(|| format!("configuration error in {display}"))
}
