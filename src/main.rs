use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hostel_cache::cache::{KvStore, LocalCache, SqliteStore};
use hostel_cache::config::Config;
use hostel_cache::role::Role;

#[derive(Parser, Debug)]
#[command(name = "hostel-cache")]
#[command(about = "Inspect and maintain the hostel app's local dashboard cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/hostel-cache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Cache store to operate on (overrides the config file)
  #[arg(short, long)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List cached keys, optionally only those containing PATTERN
  Keys { pattern: Option<String> },

  /// Print the cached JSON value at KEY if it is still fresh
  Get {
    key: String,

    /// Role the freshness window is evaluated for
    #[arg(short, long)]
    role: Option<Role>,
  },

  /// Show age and time to expiry for KEY
  Info { key: String },

  /// Remove a single key
  Clear { key: String },

  /// Remove every key containing PATTERN
  Purge { pattern: String },
}

fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;

  let store = match args.store.or(config.store_path) {
    Some(path) => SqliteStore::open_at(&path)?,
    None => SqliteStore::open()?,
  };

  match args.command {
    Command::Keys { pattern } => {
      for key in store.keys()? {
        if pattern.as_deref().map_or(true, |p| key.contains(p)) {
          println!("{}", key);
        }
      }
    }
    Command::Get { key, role } => {
      let cache = LocalCache::new(store);
      match cache.get::<serde_json::Value>(&key, role) {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => {
          eprintln!("{}: no fresh entry", key);
          std::process::exit(1);
        }
      }
    }
    Command::Info { key } => {
      let cache = LocalCache::new(store);
      let info = cache.info(&key);
      println!("exists: {}", info.exists);
      if let Some(age) = info.age_ms {
        println!("age: {}", format_duration_ms(age));
      }
      if let Some(left) = info.expires_in_ms {
        println!("expires in: {}", format_duration_ms(left));
      }
    }
    Command::Clear { key } => {
      LocalCache::new(store).clear(&key);
    }
    Command::Purge { pattern } => {
      LocalCache::new(store).clear_matching(&pattern);
    }
  }

  Ok(())
}

/// Render a millisecond duration as "MMm SSs".
fn format_duration_ms(ms: i64) -> String {
  let total_secs = ms / 1000;
  format!("{}m {:02}s", total_secs / 60, total_secs % 60)
}
