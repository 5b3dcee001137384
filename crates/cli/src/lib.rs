pub mod commands;

use clap::{Parser, Subcommand};
use draftdesk_core::config::{ConfigOverrides, LoadOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "draftdesk",
    about = "Draftdesk operator CLI",
    long_about = "Operate the Draftdesk contact directory and document index: migrations, \
                  sample data, config inspection, readiness checks, lookup, extraction, indexing \
                  and search.",
    after_help = "Examples:\n  draftdesk seed\n  draftdesk lookup Ashu\n  \
                  draftdesk search \"annual leave\" -k 2\n  draftdesk doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file path (must exist when given)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the sample directory and index the sample policy document")]
    Seed {
        #[arg(long, help = "Remove the sample contacts and policy chunks instead")]
        clean: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, migrations and the embedder")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Look up a contact by full or partial name")]
    Lookup { name: String },
    #[command(about = "Extract recipient, subject and body from a drafted email")]
    Extract {
        #[arg(long, help = "Read the draft from a file instead of stdin")]
        file: Option<PathBuf>,
        #[arg(long, help = "Do not resolve a recipient name through the directory")]
        no_resolve: bool,
    },
    #[command(about = "Index a plain-text document for search")]
    Index {
        path: PathBuf,
        #[arg(long, help = "Source name to store the chunks under (defaults to the file name)")]
        source: Option<String>,
    },
    #[command(about = "List indexed documents, or remove one from the index")]
    Sources {
        #[arg(long, value_name = "SOURCE", help = "Remove every chunk stored under SOURCE")]
        remove: Option<String>,
    },
    #[command(about = "Search indexed documents")]
    Search {
        query: String,
        #[arg(short, long, help = "Number of snippets to return")]
        k: Option<usize>,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed { clean } => commands::seed::run(&options, clean),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
        Command::Lookup { name } => commands::lookup::run(&options, &name),
        Command::Extract { file, no_resolve } => {
            commands::extract::run(&options, file.as_deref(), !no_resolve)
        }
        Command::Index { path, source } => {
            commands::index::run(&options, &path, source.as_deref())
        }
        Command::Sources { remove } => commands::sources::run(&options, remove.as_deref()),
        Command::Search { query, k } => commands::search::run(&options, &query, k),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
