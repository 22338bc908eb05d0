use std::cell::RefCell;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use quicklaunch::catalog::{match_indices, CatalogIndex, CommandId, QueryResult};
use quicklaunch::config::{self, Config};
use quicklaunch::debouncer::UpdateDebouncer;
use quicklaunch::error::ResultExt;
use quicklaunch::event_loop::{EventLoop, SystemClock};
use quicklaunch::protocol::{self, Response};
use quicklaunch::tracking::UsageStore;
use quicklaunch::{logging, manifest};

#[derive(Parser, Debug)]
#[command(name = "quicklaunch", version, about = "Search and run commands from JSON manifests")]
struct Cli {
    /// Config file (defaults to ~/.quicklaunch/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extra manifest files, in addition to the configured ones
    #[arg(short, long = "manifest", global = true)]
    manifests: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank commands against a query
    Query {
        /// Query text; several words are joined with spaces
        #[arg(required = true)]
        text: Vec<String>,
        /// Maximum number of results
        #[arg(long)]
        max: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a command by id
    Exec { id: String },
    /// List every indexed command
    List,
    /// Most recently executed commands
    Recent,
    /// Registrations that were rejected
    Missing,
    /// Answer JSONL requests on stdin until EOF
    Serve,
}

fn main() -> ExitCode {
    let _guard = logging::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "quicklaunch failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    let tracking = config.get_tracking();

    let index = Rc::new(RefCell::new(CatalogIndex::new(&config)));
    let mut store = UsageStore::with_config(&tracking);
    if tracking.enabled {
        store.load().warn_on_err();
        store.apply_to(&mut index.borrow_mut());
    }

    register_manifests(&index, &config, &cli.manifests);

    let code = {
        let mut index = index.borrow_mut();
        match cli.command {
            Commands::Query { text, max, json } => {
                let text = text.join(" ");
                let results = match max {
                    Some(max) => index.query(&text, max),
                    None => index.query_default(&text),
                };
                if json {
                    let out = serde_json::to_string_pretty(&results)
                        .context("Failed to serialize results")?;
                    println!("{}", out);
                } else {
                    print_results(&text, &results);
                }
                ExitCode::SUCCESS
            }
            Commands::Exec { id } => {
                let id: CommandId = id.parse()?;
                if index.execute(&id) {
                    ExitCode::SUCCESS
                } else {
                    eprintln!("command {} did not run successfully", id);
                    ExitCode::FAILURE
                }
            }
            Commands::List => {
                for entry in index.get_all() {
                    println!(
                        "{}  {:<32} {:<16} used {}",
                        entry.id,
                        entry.name,
                        entry.category.as_deref().unwrap_or("-"),
                        entry.usage_count
                    );
                }
                ExitCode::SUCCESS
            }
            Commands::Recent => {
                for id in index.recent() {
                    match index.get_by_id(&id) {
                        Some(entry) => println!("{}  {}", id, entry.name),
                        None => println!("{}  (not registered)", id),
                    }
                }
                ExitCode::SUCCESS
            }
            Commands::Missing => {
                for missing in index.missing() {
                    println!(
                        "{}: {}",
                        missing.name.as_deref().unwrap_or("(unnamed)"),
                        missing.reason
                    );
                }
                ExitCode::SUCCESS
            }
            Commands::Serve => {
                let stdin = io::stdin();
                let stdout = io::stdout();
                protocol::serve(&mut index, stdin.lock(), stdout.lock(), |index, response| {
                    if tracking.enabled && matches!(response, Response::Executed { success: true, .. }) {
                        store.capture(index);
                        store.save().warn_on_err();
                    }
                })?;
                ExitCode::SUCCESS
            }
        }
    };

    if tracking.enabled {
        store.capture(&index.borrow());
        store.save()?;
    }
    Ok(code)
}

/// Feed manifest registrations through the debouncer so the first lands
/// immediately and the rest are applied as one batch.
fn register_manifests(index: &Rc<RefCell<CatalogIndex>>, config: &Config, extra: &[PathBuf]) {
    let clock = Rc::new(SystemClock);
    let event_loop = Rc::new(EventLoop::new(clock.clone()));
    let debouncer = UpdateDebouncer::new(config.get_debounce().interval(), clock, event_loop.clone());

    let paths = config.manifest_paths().into_iter().chain(extra.iter().cloned());
    for path in paths {
        let descriptors = match manifest::load_manifest(&path) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Skipping manifest");
                continue;
            }
        };
        for raw in descriptors {
            let index = Rc::clone(index);
            debouncer.add(move || {
                index.borrow_mut().register(raw).log_err();
            });
        }
    }

    event_loop.run_until_idle();
    let index = index.borrow();
    info!(
        commands = index.len(),
        missing = index.missing().len(),
        "Catalog ready"
    );
}

fn print_results(query: &str, results: &[QueryResult]) {
    let color = io::stdout().is_terminal();
    for result in results {
        let name = if color {
            highlight(&result.name, query)
        } else {
            result.name.clone()
        };
        let state = if result.enabled { "" } else { "  (disabled)" };
        println!(
            "{}  {:>5.2}  {}{}",
            result.id, result.score, name, state
        );
    }
}

fn highlight(text: &str, query: &str) -> String {
    let indices = match_indices(text, query);
    let mut out = String::with_capacity(text.len() + indices.len() * 8);
    for (position, ch) in text.chars().enumerate() {
        if indices.binary_search(&position).is_ok() {
            out.push_str("\x1b[1m");
            out.push(ch);
            out.push_str("\x1b[0m");
        } else {
            out.push(ch);
        }
    }
    out
}
