//! REPL loop with rustyline.
//!
//! Interactive mode: prompt, meta-commands, history, TAB completion.
//! Pipe mode: read lines from stdin, search each.

use std::io::{self, BufRead};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use sift_modal::ResultsView;

use crate::format::{format_document, format_error, format_view, OutputMode};
use crate::parse::{check_meta_command, MetaCommand, META_COMMANDS};
use crate::state::SessionState;

/// Run the interactive REPL.
pub fn run_repl(state: &mut SessionState, mode: OutputMode) {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<SiftHelper, _> = match Editor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("(error) {}", e);
            return;
        }
    };
    rl.set_helper(Some(SiftHelper));

    let history_path = history_file();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        state.drain_events();
        let prompt = state.prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match check_meta_command(trimmed) {
                    Some(Ok(MetaCommand::Quit)) => break,
                    Some(Ok(meta)) => {
                        execute_meta(meta, state, mode);
                    }
                    Some(Err(usage)) => eprintln!("(error) {}", usage),
                    None => {
                        execute_query(trimmed, state, mode);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: just show new prompt
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D: exit
                break;
            }
            Err(err) => {
                eprintln!("(error) {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }
}

/// Run in pipe mode: read lines from stdin, search each.
pub fn run_pipe(state: &mut SessionState, mode: OutputMode) -> i32 {
    let stdin = io::stdin();
    let mut exit_code = 0;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let ok = match check_meta_command(trimmed) {
            Some(Ok(MetaCommand::Quit)) => break,
            Some(Ok(meta)) => execute_meta(meta, state, mode),
            Some(Err(usage)) => {
                eprintln!("(error) {}", usage);
                false
            }
            None => execute_query(trimmed, state, mode),
        };
        if !ok {
            exit_code = 1;
        }
    }

    exit_code
}

/// Search for `line` and print the view. Returns false for an error view.
fn execute_query(line: &str, state: &mut SessionState, mode: OutputMode) -> bool {
    let view = state.query(line);
    let formatted = format_view(view, mode);
    let failed = matches!(view, ResultsView::Error { .. } | ResultsView::Loading);
    if failed {
        eprintln!("{}", formatted);
    } else if !formatted.is_empty() {
        println!("{}", formatted);
    }
    !failed
}

/// Execute a meta-command. Returns true on success, false on error.
fn execute_meta(meta: MetaCommand, state: &mut SessionState, mode: OutputMode) -> bool {
    match meta {
        MetaCommand::Quit => true,
        MetaCommand::Help => {
            print_help();
            true
        }
        MetaCommand::Clear => {
            // ANSI clear screen
            print!("\x1B[2J\x1B[1;1H");
            true
        }
        MetaCommand::Status => {
            println!("{}", state.status());
            true
        }
        MetaCommand::Retry => {
            if state.retry() {
                println!("{}", state.status());
                true
            } else {
                eprintln!("(error) engine has not failed ({})", state.status());
                false
            }
        }
        MetaCommand::Open(number) => match state.open_result(number - 1) {
            Some(link) => {
                println!("{}", link);
                true
            }
            None => {
                eprintln!("(error) no result {}", number);
                false
            }
        },
        MetaCommand::Doc(id) => match state.document(id) {
            Ok(text) => {
                println!("{}", format_document(id, text.as_deref(), mode));
                text.is_some()
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                false
            }
        },
    }
}

fn history_file() -> Option<String> {
    std::env::var("HOME")
        .ok()
        .map(|h| format!("{}/.sift_history", h))
}

fn print_help() {
    println!("Type terms to search; whitespace separates terms that must all match.");
    println!();
    println!("Meta-commands:");
    println!("  :open N      Follow result N and print its link");
    println!("  :doc ID      Print the full text of document ID");
    println!("  :status      Show the search engine state");
    println!("  :retry       Reload the engine after a failed load");
    println!("  :clear       Clear screen");
    println!("  :help        Show help");
    println!("  :quit        Exit REPL");
}

// =========================================================================
// TAB Completion
// =========================================================================

struct SiftHelper;

impl Helper for SiftHelper {}
impl Validator for SiftHelper {}
impl Highlighter for SiftHelper {}
impl Hinter for SiftHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for SiftHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_pos = &line[..pos];
        // Only the meta-command name completes; search terms are free text
        if !line_to_pos.starts_with(':') || line_to_pos.contains(char::is_whitespace) {
            return Ok((pos, vec![]));
        }
        let candidates = META_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line_to_pos))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}
