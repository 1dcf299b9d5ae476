//! Command-line interface for add-language
//! Adds a target language to the GritQL tree-sitter grammar and regenerates the parser.
//!
//! Usage:
//!   add-language --language `<name>` [--repo `<dir>`] [--config `<file>`] [--skip-existing]
//!
//! Exits 0 when the run completes or when the generator is not installed (after printing
//! how to install it), and 1 on any other failure.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use langadd_config::Loader;
use langadd_core::{Language, Outcome, SystemRunner, UpdateError, Workflow};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] langadd_config::ConfigError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error("cannot determine the repository root: {0}")]
    Root(io::Error),
}

fn cli() -> Command {
    Command::new("add-language")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Add a new language to the tree-sitter-gritql grammar")
        .arg(
            Arg::new("language")
                .long("language")
                .visible_alias("lang")
                .value_name("NAME")
                .help("The name of the language to add, e.g. 'kotlin'")
                .required(true),
        )
        .arg(
            Arg::new("repo")
                .long("repo")
                .value_name("DIR")
                .help("Repository root containing grammar.js (default: current directory)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Extra configuration file layered over langadd.toml")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("skip-existing")
                .long("skip-existing")
                .help("Leave grammar.js unchanged if the language is already listed")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("FILTER")
                .help("Diagnostic log filter written to stderr (e.g. 'debug')")
                .default_value("warn"),
        )
}

fn main() {
    let matches = cli().get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("warn");
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&matches) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), CliError> {
    let root = match matches.get_one::<PathBuf>("repo") {
        Some(root) => root.clone(),
        None => std::env::current_dir().map_err(CliError::Root)?,
    };

    let mut loader = Loader::new().with_project_file(&root);
    if let Some(path) = matches.get_one::<PathBuf>("config") {
        loader = loader.with_file(path);
    }
    if matches.get_flag("skip-existing") {
        loader = loader.set_override("grammar.skip_existing", true)?;
    }
    let config = loader.build()?;

    let name = matches
        .get_one::<String>("language")
        .expect("language is a required argument");
    let language = Language::new(name.as_str())?;

    let runner = SystemRunner;
    let workflow = Workflow::new(config.layout(&root), config.workflow_options(), &runner);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = workflow.run(&language, &mut out)?;
    out.flush().map_err(UpdateError::from)?;

    match outcome {
        Outcome::Completed(report) => {
            info!(?report, "done");
        }
        Outcome::GeneratorMissing { reason, .. } => {
            info!(%reason, "stopped before generation");
        }
    }
    Ok(())
}
