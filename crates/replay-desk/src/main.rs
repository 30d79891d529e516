//! Replay Desk - terminal front-end for recorded race replays
//!
//! Wires the HTTP client, the remote service and the replay controller into
//! one event loop. The loop thread owns the controller and reacts to two
//! sources: lines typed on stdin and completions of network requests.
//!
//! ## Command line flags
//!
//! - `--config <path>`: YAML config file (default: platform config dir)
//! - `--base-url <url>`: override the server root from the config file

mod command;
mod view;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use crossbeam::channel::{Receiver, RecvTimeoutError};

use command::{Command, HELP};
use replay_core::config::{default_config_path, load_config, save_config, ClientConfig};
use replay_core::resource::HttpReplayApi;
use replay_core::services::{Completion, RemoteClient, RemoteService};
use replay_core::{ReplayController, TagRef};

struct Args {
    config_path: PathBuf,
    base_url: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        config_path: default_config_path("config.yaml"),
        base_url: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                parsed.config_path = args
                    .next()
                    .map(PathBuf::from)
                    .context("--config needs a path")?;
            }
            "--base-url" => {
                parsed.base_url = Some(args.next().context("--base-url needs a URL")?);
            }
            "--help" | "-h" => {
                println!("Usage: replay-desk [--config <path>] [--base-url <url>]\n\n{}", HELP);
                std::process::exit(0);
            }
            other => bail!("Unknown argument '{}'", other),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    let mut config: ClientConfig = load_config(&args.config_path);
    if !args.config_path.exists() {
        // First run: leave an editable config behind
        if let Err(e) = save_config(&config, &args.config_path) {
            log::warn!("Could not write default config: {:#}", e);
        }
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    log::info!("replay-desk starting, server at {}", config.base_url);

    let api = Arc::new(HttpReplayApi::from_config(&config));
    let (handle, completions) = RemoteService::spawn(api.clone(), api, config.worker_count())
        .context("Failed to start remote service")?;
    let client = RemoteClient::new(&handle);

    let mut controller = ReplayController::new(client);
    controller.init().context("Failed to request the replay list")?;

    let lines = spawn_stdin_reader()?;
    println!("Type 'help' for commands.");

    run(&mut controller, &lines, &completions);

    // stdin closed: let in-flight requests finish before tearing down
    drain(&mut controller, &completions, config.timeout() * 2);

    controller.dispose();
    if let Err(e) = controller.sink().shutdown() {
        log::warn!("Remote service shutdown failed: {}", e);
    }
    handle.join();
    log::info!("replay-desk stopped");
    Ok(())
}

/// Forward stdin lines to the event loop
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (line_tx, line_rx) = crossbeam::channel::unbounded();
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(line_rx)
}

/// Event loop; returns on `quit` or when stdin closes
fn run(
    controller: &mut ReplayController<RemoteClient>,
    lines: &Receiver<String>,
    completions: &Receiver<Completion>,
) {
    loop {
        crossbeam::channel::select! {
            recv(lines) -> line => {
                let Ok(line) = line else { return };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => return,
                    Ok(Some(command)) => {
                        if let Err(e) = execute(controller, command) {
                            println!("{}", e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
            recv(completions) -> completion => {
                let Ok(completion) = completion else {
                    log::error!("Remote service stopped unexpectedly");
                    return;
                };
                if let Some(event) = controller.handle_completion(completion) {
                    println!("{}", view::format_event(&event));
                }
            }
        }
    }
}

fn drain(
    controller: &mut ReplayController<RemoteClient>,
    completions: &Receiver<Completion>,
    timeout: std::time::Duration,
) {
    while controller.pending_count() > 0 {
        match completions.recv_timeout(timeout) {
            Ok(completion) => {
                if let Some(event) = controller.handle_completion(completion) {
                    println!("{}", view::format_event(&event));
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Giving up on {} requests still in flight",
                    controller.pending_count()
                );
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn execute(controller: &mut ReplayController<RemoteClient>, command: Command) -> Result<()> {
    match command {
        Command::List => println!("{}", view::format_list(&controller.snapshot())),
        Command::Show(replay) => match controller.replay(&replay) {
            Some(r) => println!("{}", view::format_details(r)),
            None => println!("No replay named {}", replay),
        },
        Command::Html(replay) => match controller.replay(&replay) {
            Some(r) => println!("{}", view::comments_html(r)),
            None => println!("No replay named {}", replay),
        },
        Command::Refresh => {
            controller.refresh()?;
        }
        Command::Play(replay) => {
            controller.play_replay(&replay)?;
        }
        Command::Stop => {
            controller.stop_all()?;
        }
        Command::Comment { replay, text } => {
            controller.set_comment_text(text);
            controller.submit_comment(&replay)?;
        }
        Command::Tag { replay, name } => {
            controller.set_tag_name(name);
            controller.add_tag(&replay)?;
        }
        Command::Untag { replay, name } => {
            if !controller.remove_tag(&replay, &TagRef::new(name.as_str()))? {
                println!("{} has no label '{}'", replay, name);
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}
