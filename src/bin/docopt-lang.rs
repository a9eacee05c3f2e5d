//! Command-line interface for docopt-lang
//!
//! This binary inspects docopt documents: dump the token stream, print
//! the parsed tree, or flatten the options section into its lookup map.
//!
//! Usage:
//!   docopt-lang tokens `<path>` [--format `<format>`]   - Dump prologue-state tokens
//!   docopt-lang ast `<path>`                          - Print the parsed tree
//!   docopt-lang options `<path>` [--format `<format>`]  - Print the options map

use clap::{Arg, Command};
use docopt_lang::ast::to_treeviz_str;
use docopt_lang::{lexing, DocoptParser, OptionRule};
use std::collections::BTreeMap;
use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = Command::new("docopt-lang")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for inspecting docopt help-text documents")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("tokens")
                .about("Dump the token stream of a document")
                .arg(
                    Arg::new("path")
                        .help("Path to the docopt document")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format: text or json")
                        .default_value("text"),
                ),
        )
        .subcommand(
            Command::new("ast")
                .about("Parse a document and print the tree")
                .arg(
                    Arg::new("path")
                        .help("Path to the docopt document")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("options")
                .about("Parse a document and print the options map")
                .arg(
                    Arg::new("path")
                        .help("Path to the docopt document")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format: text or json")
                        .default_value("text"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("tokens", sub)) => {
            let path = sub.get_one::<String>("path").expect("path is required");
            let format = sub.get_one::<String>("format").expect("format has a default");
            handle_tokens(path, format)
        }
        Some(("ast", sub)) => {
            let path = sub.get_one::<String>("path").expect("path is required");
            handle_ast(path)
        }
        Some(("options", sub)) => {
            let path = sub.get_one::<String>("path").expect("path is required");
            let format = sub.get_one::<String>("format").expect("format has a default");
            handle_options(path, format)
        }
        _ => ExitCode::FAILURE,
    }
}

fn read_document(path: &str) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            eprintln!("error: cannot read {path}: {e}");
            None
        }
    }
}

fn handle_tokens(path: &str, format: &str) -> ExitCode {
    let Some(source) = read_document(path) else {
        return ExitCode::FAILURE;
    };
    let tokens = lexing::tokenize(&source);
    match format {
        "json" => match serde_json::to_string_pretty(&tokens) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        _ => {
            for token in &tokens {
                println!("{}:{:?}", token.kind, token.value);
            }
        }
    }
    ExitCode::SUCCESS
}

fn handle_ast(path: &str) -> ExitCode {
    let Some(source) = read_document(path) else {
        return ExitCode::FAILURE;
    };
    let mut parser = match DocoptParser::new(&source) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    parser.parse();
    print!("{}", to_treeviz_str(parser.ast()));
    if parser.errors().is_empty() {
        ExitCode::SUCCESS
    } else {
        for error in parser.errors() {
            eprintln!("error: {error}");
        }
        ExitCode::FAILURE
    }
}

fn handle_options(path: &str, format: &str) -> ExitCode {
    let Some(source) = read_document(path) else {
        return ExitCode::FAILURE;
    };
    let mut parser = match DocoptParser::new(&source) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    parser.parse();
    let options = match parser.options_map() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // sorted for stable output
    let sorted: BTreeMap<&str, &OptionRule> = options
        .iter()
        .map(|(key, rule)| (key.as_str(), rule.as_ref()))
        .collect();
    match format {
        "json" => match serde_json::to_string_pretty(&sorted) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        _ => {
            for (key, rule) in &sorted {
                let argument = rule.argument_name.as_deref().unwrap_or("-");
                println!("{key}\targ_count={}\targument={argument}", rule.arg_count);
            }
        }
    }
    ExitCode::SUCCESS
}
