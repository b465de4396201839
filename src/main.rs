//! `prefstore` command-line tool.
//!
//! Inspects and edits a preferences database from the shell.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use prefstore::ValueKind;
use prefstore::backend::BackendKind;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "prefstore", version, about = "Inspect and edit a prefstore database")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the store lives and how it is encrypted.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Config file (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Backend, overriding the config
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Encryption secret; enables AES when set
    #[arg(long)]
    pub secret: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get {
        key: String,
        /// Printed when the key is missing instead of failing
        #[arg(long)]
        default: Option<String>,
    },
    /// Store a value
    Set {
        key: String,
        value: String,
        /// Value kind: string, bool, int, long, float, double
        #[arg(long, short, default_value = "string")]
        kind: ValueKind,
    },
    /// Remove a key
    Remove { key: String },
    /// List keys with their kinds
    List {
        /// Only keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Print every entry
    Dump {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every entry
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Show entry counts and database size
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let opened = commands::open_store(&cli.store)?;

    match cli.command {
        Commands::Get { key, default } => {
            commands::entries::get(&opened.store, &key, default.as_deref())
        },
        Commands::Set { key, value, kind } => {
            commands::entries::set(&opened.store, &key, &value, kind)
        },
        Commands::Remove { key } => commands::entries::remove(&opened.store, &key),
        Commands::List { prefix } => {
            commands::entries::list(&opened.store, prefix.as_deref());
            Ok(())
        },
        Commands::Dump { json } => commands::entries::dump(&opened.store, json),
        Commands::Clear { yes } => commands::entries::clear(&opened.store, yes),
        Commands::Stats => {
            commands::stats::execute(&opened);
            Ok(())
        },
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the `warn` default.
fn init_logging(json: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_with_kind() {
        let cli = Cli::try_parse_from(["prefstore", "--db", "p.db", "set", "age", "23", "--kind", "int"])
            .unwrap();
        assert_eq!(cli.store.db, Some(PathBuf::from("p.db")));
        match cli.command {
            Commands::Set { key, value, kind } => {
                assert_eq!(key, "age");
                assert_eq!(value, "23");
                assert_eq!(kind, ValueKind::Int);
            },
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_parse_backend_and_bad_kind() {
        let cli = Cli::try_parse_from(["prefstore", "--backend", "redb", "stats"]).unwrap();
        assert_eq!(cli.store.backend, Some(BackendKind::Redb));

        assert!(Cli::try_parse_from(["prefstore", "set", "k", "v", "--kind", "char"]).is_err());
    }
}
