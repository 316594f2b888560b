mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use webstash_backend_file::FileBackend;
use webstash_core::{BackendKind, EntryKey, Store};

use config::{FileConfig, Settings};

#[derive(Parser)]
#[command(name = "webstash", version, about = "Namespaced JSON key-value store")]
struct Cli {
    /// Directory holding the persistent store.
    #[arg(long, global = true, env = "WEBSTASH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Namespace separator character.
    #[arg(long, global = true)]
    separator: Option<char>,

    /// Config file (defaults to <config dir>/webstash/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the JSON value stored under a key, or `null`.
    Get {
        #[arg(short, long)]
        namespace: Option<String>,
        key: String,
    },
    /// Store a value. VALUE is parsed as JSON, or stored as a string if it
    /// is not valid JSON. Storing `null` deletes the key.
    Set {
        #[arg(short, long)]
        namespace: Option<String>,
        key: String,
        value: String,
    },
    /// Delete a key.
    Del {
        #[arg(short, long)]
        namespace: Option<String>,
        key: String,
    },
    /// Delete every key in a namespace, or everything.
    Clear {
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// List keys in a namespace, or every stored key.
    Keys {
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

fn entry_key<'a>(namespace: &'a Option<String>, key: &'a str) -> EntryKey<'a> {
    EntryKey {
        namespace: namespace.as_deref(),
        key,
    }
}

/// Interpret a command-line value: JSON if it parses, a plain string otherwise.
fn parse_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn open_store(settings: &Settings) -> Result<Store> {
    let path = settings.persistent_path();
    let backend = FileBackend::open(&path, BackendKind::Persistent)
        .with_context(|| format!("failed to open store {}", path.display()))?;
    Ok(Store::new(Box::new(backend), &settings.store))
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.or_else(FileConfig::default_path);
    let file = match config_path {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file, cli.data_dir, cli.separator)?;
    debug!(
        data_dir = %settings.data_dir.display(),
        separator = %settings.store.separator,
        "resolved settings"
    );
    let mut store = open_store(&settings)?;

    match cli.command {
        Command::Get { namespace, key } => {
            let value: Option<Value> = store.get(entry_key(&namespace, &key))?;
            let value = value.unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Set {
            namespace,
            key,
            value,
        } => {
            store.set(entry_key(&namespace, &key), &parse_value(value))?;
        }
        Command::Del { namespace, key } => {
            store.del(entry_key(&namespace, &key))?;
        }
        Command::Clear { namespace } => {
            store.clear(namespace.as_deref())?;
        }
        Command::Keys { namespace } => {
            for key in store.keys(namespace.as_deref())? {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
