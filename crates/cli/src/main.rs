//! Sift CLI: terminal front end for a site's compiled search module.
//!
//! Three modes:
//! - **Shell mode**: `sift [flags] COMMAND`: single command, exit
//! - **REPL mode**: `sift [flags]`: interactive search prompt (if stdin is TTY)
//! - **Pipe mode**: `echo "rust server" | sift`: one query per line from stdin

mod commands;
mod format;
mod parse;
mod repl;
mod state;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use sift_core::{SiftError, SiftResult};
use sift_engine::{AssetSource, EngineHandle, EngineLoader, SiftConfig, CONFIG_FILE_NAME};
use sift_modal::ResultsView;
use sift_search::{Query, QueryProtocol};
use tracing::Level;

use commands::build_cli;
use format::{format_document, format_error, format_view, OutputMode};
use state::SessionState;

fn main() {
    let cli = build_cli();
    let matches = cli.get_matches();

    init_logging(matches.get_count("verbose"));

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    // Handle `init-config` before loading anything.
    if let Some(("init-config", sub)) = matches.subcommand() {
        let path = sub
            .get_one::<String>("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        match SiftConfig::write_default_if_missing(&path) {
            Ok(()) => {
                println!("{}", path.display());
                return;
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, output_mode));
                process::exit(1);
            }
        }
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };
    let loader = match build_loader(&config) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };

    // Dispatch mode
    if matches.subcommand().is_some() {
        let exit_code = run_shell_mode(&matches, &loader, output_mode);
        process::exit(exit_code);
    }

    let mut state = SessionState::new(loader, settle_timeout(&config));
    if std::io::stdin().is_terminal() {
        repl::run_repl(&mut state, output_mode);
    } else {
        let exit_code = repl::run_pipe(&mut state, output_mode);
        process::exit(exit_code);
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// `--config`, else `./sift.toml` if present, else defaults; then flag overrides.
fn load_config(matches: &clap::ArgMatches) -> SiftResult<SiftConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => SiftConfig::from_file(Path::new(path))?,
        None => SiftConfig::from_file_or_default(Path::new(CONFIG_FILE_NAME))?,
    };
    if let Some(base) = matches.get_one::<String>("base") {
        config.assets.base = base.clone();
    }
    if let Some(timeout_ms) = matches.get_one::<u64>("timeout-ms") {
        config.fetch.timeout_ms = *timeout_ms;
    }
    config.validate()?;
    tracing::debug!(target: "sift::cli", base = %config.assets.base, "Configuration loaded");
    Ok(config)
}

fn build_loader(config: &SiftConfig) -> SiftResult<EngineLoader> {
    let source: Arc<dyn AssetSource> = Arc::from(config.source()?);
    Ok(EngineLoader::new(
        source,
        Arc::new(config.runtime()),
        config.asset_paths(),
    ))
}

/// Three sequential fetches plus instantiation.
fn settle_timeout(config: &SiftConfig) -> Duration {
    Duration::from_millis(config.fetch.timeout_ms.saturating_mul(3)) + Duration::from_secs(10)
}

fn run_shell_mode(matches: &clap::ArgMatches, loader: &EngineLoader, mode: OutputMode) -> i32 {
    let engine = EngineHandle::new();
    if let Err(e) = loader.load(&engine) {
        eprintln!("{}", format_error(&e, mode));
        return 1;
    }
    let protocol = QueryProtocol::new(&engine);

    match matches.subcommand() {
        Some(("search", sub)) => {
            let terms: Vec<&str> = sub
                .get_many::<String>("query")
                .map(|values| values.map(String::as_str).collect())
                .unwrap_or_default();
            let query = Query::parse(&terms.join(" "));
            let view = ResultsView::from_outcome(&query, protocol.search(&query));
            let formatted = format_view(&view, mode);
            match view {
                ResultsView::Error { .. } => {
                    eprintln!("{}", formatted);
                    1
                }
                _ => {
                    if !formatted.is_empty() {
                        println!("{}", formatted);
                    }
                    0
                }
            }
        }
        Some(("doc", sub)) => {
            let Some(id) = sub.get_one::<u32>("id").copied() else {
                return 1;
            };
            match protocol.get_document(id) {
                Ok(text) => {
                    println!("{}", format_document(id, text.as_deref(), mode));
                    if text.is_some() {
                        0
                    } else {
                        1
                    }
                }
                Err(e) => {
                    eprintln!("{}", format_error(&e, mode));
                    1
                }
            }
        }
        Some((other, _)) => {
            eprintln!(
                "{}",
                format_error(&SiftError::config(format!("unknown command '{}'", other)), mode)
            );
            1
        }
        None => 0,
    }
}
