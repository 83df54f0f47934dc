//! StrataKV CLI
//!
//! Local operator tool over a StrataKV data directory.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use stratakv::config::{Config, CorruptTablePolicy};
use stratakv::storage::SSTableReader;
use stratakv::wal::WalRecovery;
use stratakv::{Engine, Entry};
use tracing_subscriber::{fmt, EnvFilter};

/// StrataKV CLI
#[derive(Parser, Debug)]
#[command(name = "stratakv-cli")]
#[command(about = "Inspect and modify a StrataKV data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./stratakv_data")]
    data_dir: PathBuf,

    /// Live memtable entries that trigger a flush
    #[arg(short = 't', long, default_value = "10")]
    flush_threshold: usize,

    /// Fail lookups on corrupt tables instead of skipping them
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Flush the memtable rebuilt from the WAL into a new table
    Flush,

    /// Print the header and entries of a table file
    Dump {
        /// Path to an .sst file
        table: PathBuf,
    },

    /// Verify the WAL without modifying it
    Wal,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stratakv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> stratakv::Result<()> {
    match &args.command {
        Commands::Dump { table } => return dump_table(table),
        Commands::Wal => {
            let wal_path = args.data_dir.join(Engine::WAL_FILENAME);
            let result = WalRecovery::verify(&wal_path)?;
            println!("wal:        {}", wal_path.display());
            println!("recovered:  {}", result.entries_recovered);
            println!("corrupted:  {}", result.entries_corrupted);
            println!("last lsn:   {}", result.last_lsn);
            println!("truncated:  {}", result.was_truncated);
            return Ok(());
        }
        _ => {}
    }

    let policy = if args.strict {
        CorruptTablePolicy::Fail
    } else {
        CorruptTablePolicy::Skip
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .flush_threshold(args.flush_threshold)
        .corrupt_table_policy(policy)
        .build();

    let engine = Engine::start(config)?;
    tracing::debug!("StrataKV v{} serving {}", stratakv::VERSION, args.data_dir.display());

    match args.command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(not found)"),
        },
        Commands::Set { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => match engine.delete(key.as_bytes())? {
            Some(value) => println!("deleted {} = {}", key, String::from_utf8_lossy(&value)),
            None => println!("(not found)"),
        },
        Commands::Flush => {
            engine.flush()?;
            println!("OK ({} tables)", engine.sstable_count());
        }
        Commands::Dump { .. } | Commands::Wal => {}
    }

    engine.close()
}

fn dump_table(path: &Path) -> stratakv::Result<()> {
    let mut reader = SSTableReader::open(path)?;
    let header = *reader.header();
    println!("table:      {}", path.display());
    println!("entries:    {}", header.entry_count);
    println!(
        "key length: {}..={} (hint)",
        header.min_key_len_hint, header.max_key_len_hint
    );

    for item in reader.iter()? {
        let (key, entry) = item?;
        match entry {
            Entry::Value(value) => println!(
                "SET {} = {}",
                String::from_utf8_lossy(&key),
                String::from_utf8_lossy(&value)
            ),
            Entry::Tombstone => println!("DEL {}", String::from_utf8_lossy(&key)),
        }
    }

    Ok(())
}
