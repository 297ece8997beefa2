//! Clap command tree definition.
//!
//! Shell mode uses the subcommands directly. Without a subcommand the binary
//! starts the interactive modal (or reads queries from a pipe).

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("sift")
        .about("Search a static site through its compiled search module")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("Config file (default: sift.toml if present)")
                .global(true),
        )
        .arg(
            Arg::new("base")
                .long("base")
                .value_name("DIR|URL")
                .help("Directory or http(s) URL the assets are served from")
                .global(true),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .value_name("MS")
                .value_parser(value_parser!(u64))
                .help("Per-request fetch timeout in milliseconds")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("More logging on stderr (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(build_search())
        .subcommand(build_doc())
        .subcommand(build_init_config())
}

fn build_search() -> Command {
    Command::new("search")
        .about("Run one query and print the results")
        .arg(
            Arg::new("query")
                .required(true)
                .num_args(1..)
                .value_name("TERMS")
                .help("Terms, all of which must match"),
        )
}

fn build_doc() -> Command {
    Command::new("doc")
        .about("Print the full text of a document")
        .arg(
            Arg::new("id")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("Document id"),
        )
}

fn build_init_config() -> Command {
    Command::new("init-config")
        .about("Write a default sift.toml")
        .arg(
            Arg::new("path")
                .value_name("PATH")
                .help("Where to write it (default: ./sift.toml)"),
        )
}
