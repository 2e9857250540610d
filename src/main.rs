//! multiverse-explorer: interactive terminal explorer for the Rick & Morty multiverse.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use multiverse_explorer::app::{AppEvent, Explorer};
use multiverse_explorer::backend::BackendClient;
use multiverse_explorer::catalog::CatalogClient;
use multiverse_explorer::config::{Config, SpeechBackend};
use multiverse_explorer::narrator::{Narrator, SpeechEvent};
use multiverse_explorer::shell::{ShellCommand, HELP};
use multiverse_explorer::{speech, view};

#[derive(Parser, Debug)]
#[command(name = "multiverse-explorer", about = "Rick & Morty AI explorer")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and MULTIVERSE_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Catalog GraphQL endpoint
    #[arg(long)]
    catalog_url: Option<String>,

    /// First catalog page to show
    #[arg(long)]
    page: Option<u32>,

    /// Speech engine: command, console, or none
    #[arg(long)]
    speech: Option<String>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so the rendered screen on stdout stays readable
    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
        EnvFilter::new("warn,multiverse_explorer=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(args.config.as_deref());
    if let Some(url) = &args.backend_url {
        config.apply_backend_url(url);
    }
    if let Some(url) = args.catalog_url {
        config.catalog.url = url;
    }
    if let Some(engine) = &args.speech {
        config.speech.engine = SpeechBackend::from_name(engine);
    }
    let start_page = args.page.unwrap_or(config.start_page);
    info!("Backend: {}, catalog: {}", config.backend.url, config.catalog.url);

    let catalog = Arc::new(CatalogClient::new(&config.catalog).context("building catalog client")?);
    let backend = Arc::new(BackendClient::new(&config.backend).context("building backend client")?);

    let (speech_tx, mut speech_rx) = mpsc::unbounded_channel::<SpeechEvent>();
    let narrator = match speech::build_engine(&config.speech, speech_tx).await {
        Some(engine) => Narrator::new(engine),
        None => Narrator::unsupported(),
    };

    let (app_tx, mut app_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut explorer = Explorer::new(catalog, backend, narrator, app_tx);
    explorer.load_page(start_page);

    println!("{HELP}\n");
    println!("{}", view::render(&explorer));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read input: {e}");
                        break;
                    }
                };
                match ShellCommand::parse(&line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(ShellCommand::Help) => println!("{HELP}"),
                    Ok(cmd) => {
                        run_command(&mut explorer, cmd);
                        println!("{}", view::render(&explorer));
                    }
                    Err(msg) => println!("{msg}"),
                }
            }
            Some(event) = app_rx.recv() => {
                explorer.handle_event(event);
                println!("{}", view::render(&explorer));
            }
            Some(event) = speech_rx.recv() => {
                if explorer.handle_speech_event(event) {
                    println!("{}", view::render(&explorer));
                }
            }
        }
    }

    explorer.close_detail();
    info!("Bye");
    Ok(())
}

fn run_command(explorer: &mut Explorer, cmd: ShellCommand) {
    match cmd {
        ShellCommand::Next => explorer.next_page(),
        ShellCommand::Prev => explorer.prev_page(),
        ShellCommand::Page(n) => explorer.load_page(n),
        ShellCommand::Open(id) => {
            if !explorer.select_by_id(&id) {
                println!("No character {id} on screen");
            }
        }
        ShellCommand::Close => explorer.close_detail(),
        ShellCommand::Generate => explorer.generate(),
        ShellCommand::Mute => {
            explorer.toggle_mute();
        }
        ShellCommand::ToggleScript => explorer.toggle_script(),
        ShellCommand::Note(text) => {
            explorer.set_note_input(&text);
            explorer.save_note();
        }
        ShellCommand::DeleteNote(id) => {
            if !explorer.delete_note_by_label(&id) {
                println!("No deletable note {id}");
            }
        }
        ShellCommand::Search(query) => {
            if !explorer.submit_search(&query) {
                println!("Still loading, try the search again in a moment");
            }
        }
        ShellCommand::ClearSearch => explorer.clear_search(),
        ShellCommand::Show => {}
        ShellCommand::Help | ShellCommand::Quit => {}
    }
}
