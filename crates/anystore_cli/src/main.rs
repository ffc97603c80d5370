//! AnyStore CLI
//!
//! Command-line access to an AnyStore persistence file.
//!
//! # Commands
//!
//! - `new-key` - Print a fresh random encryption key
//! - `set` - Store a value under a key
//! - `get` - Print the value under a key as JSON
//! - `delete` - Remove a key
//! - `keys` - Print all keys as JSON
//! - `len` - Print the number of entries

mod commands;

use anystore_core::DEFAULT_PERSISTENCE_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Encrypted key/value files shared between processes.
#[derive(Parser)]
#[command(name = "anystore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Persistence file; a leading ~/ is the home directory
    #[arg(global = true, short, long, default_value = DEFAULT_PERSISTENCE_FILE)]
    file: PathBuf,

    /// Encryption key, base64 without padding (default: the insecure built-in key)
    #[arg(global = true, short, long, env = "ANYSTORE_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Read and write files carrying an HMAC-SHA256 tag
    #[arg(global = true, short, long)]
    authenticated: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh random 32-byte encryption key
    NewKey,

    /// Store a value under a key
    Set {
        /// Key (text)
        key: String,

        /// Value; stored as text unless --json is given
        value: String,

        /// Parse the value as JSON (integers only, no floats)
        #[arg(short, long)]
        json: bool,
    },

    /// Print the value under a key as JSON
    Get {
        /// Key (text)
        key: String,
    },

    /// Remove a key
    Delete {
        /// Key (text)
        key: String,
    },

    /// Print all keys as a JSON array
    Keys,

    /// Print the number of entries
    Len,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let target = commands::Target {
        file: cli.file,
        key: cli.key,
        authenticated: cli.authenticated,
    };

    match cli.command {
        Commands::NewKey => commands::new_key::run()?,
        Commands::Set { key, value, json } => commands::set::run(&target, &key, &value, json)?,
        Commands::Get { key } => commands::get::run(&target, &key)?,
        Commands::Delete { key } => commands::delete::run(&target, &key)?,
        Commands::Keys => commands::list::keys(&target)?,
        Commands::Len => commands::list::len(&target)?,
    }

    Ok(())
}
