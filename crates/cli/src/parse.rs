//! REPL meta-command parsing.
//!
//! Lines starting with `:` are meta-commands. Everything else is search input.

use sift_core::DocumentId;

/// Meta-commands available in REPL and pipe mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Quit,
    Help,
    Clear,
    Status,
    Retry,
    /// Follow result `n` (1-based, as printed)
    Open(usize),
    /// Print the text of a document
    Doc(DocumentId),
}

/// Names offered by TAB completion.
pub const META_COMMANDS: &[&str] = &[
    ":quit", ":exit", ":help", ":clear", ":status", ":retry", ":open", ":doc",
];

/// Check if a line is a meta-command.
///
/// Returns `None` for search input, `Some(Err(_))` for a malformed
/// meta-command.
pub fn check_meta_command(line: &str) -> Option<Result<MetaCommand, String>> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix(':')?;
    let mut parts = rest.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let arg = parts.next();

    let parsed = match cmd {
        "quit" | "q" | "exit" => Ok(MetaCommand::Quit),
        "help" | "h" => Ok(MetaCommand::Help),
        "clear" => Ok(MetaCommand::Clear),
        "status" => Ok(MetaCommand::Status),
        "retry" => Ok(MetaCommand::Retry),
        "open" | "o" => match arg.map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => Ok(MetaCommand::Open(n)),
            _ => Err("usage: :open N (result number, starting at 1)".to_string()),
        },
        "doc" | "d" => match arg.map(str::parse::<DocumentId>) {
            Some(Ok(id)) => Ok(MetaCommand::Doc(id)),
            _ => Err("usage: :doc ID".to_string()),
        },
        "" => Err("empty meta-command, try :help".to_string()),
        other => Err(format!("unknown meta-command ':{}', try :help", other)),
    };
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_search_input() {
        assert_eq!(check_meta_command("rust server"), None);
        assert_eq!(check_meta_command("  lifetimes "), None);
    }

    #[test]
    fn parses_meta_commands() {
        assert_eq!(check_meta_command(":q"), Some(Ok(MetaCommand::Quit)));
        assert_eq!(check_meta_command(" :exit "), Some(Ok(MetaCommand::Quit)));
        assert_eq!(check_meta_command(":open 2"), Some(Ok(MetaCommand::Open(2))));
        assert_eq!(check_meta_command(":doc 3"), Some(Ok(MetaCommand::Doc(3))));
        assert_eq!(check_meta_command(":retry"), Some(Ok(MetaCommand::Retry)));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(check_meta_command(":open"), Some(Err(_))));
        assert!(matches!(check_meta_command(":open 0"), Some(Err(_))));
        assert!(matches!(check_meta_command(":doc x"), Some(Err(_))));
        assert!(matches!(check_meta_command(":frobnicate"), Some(Err(_))));
        assert!(matches!(check_meta_command(":"), Some(Err(_))));
    }

    #[test]
    fn completion_list_parses() {
        for name in META_COMMANDS {
            if *name == ":open" || *name == ":doc" {
                continue;
            }
            assert!(matches!(check_meta_command(name), Some(Ok(_))), "{}", name);
        }
    }
}
