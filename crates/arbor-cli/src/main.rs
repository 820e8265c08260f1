//! `arbor` binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs a query or maintenance subcommand against it. All output
//! is JSON lines on stdout; logging goes to stderr via `tracing`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use arbor_core::span::AccessScope;
use arbor_store_sqlite::SqliteStore;
use clap::Parser;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;

use commands::{MaintainOp, Relation};

#[derive(Parser)]
#[command(author, version, about = "Arbor temporal graph store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// SQLite database path. Overrides the config file.
  #[arg(long)]
  store: Option<PathBuf>,

  /// Principal id for access filtering. Omit to query as anonymous.
  #[arg(long)]
  principal: Option<Uuid>,

  #[command(subcommand)]
  command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
  /// Infer family relations for a person span.
  Tree {
    #[arg(value_enum)]
    relation: Relation,
    span_id:  Uuid,
    /// Traversal depth for ancestors/descendants.
    #[arg(long, default_value_t = 3)]
    generations: u32,
  },

  /// Per-year activity counts for a span's connections.
  Activity {
    span_id: Uuid,
    #[arg(long)]
    from: i32,
    #[arg(long)]
    to:   i32,
  },

  /// Consistency scans and repairs. Dry-run unless `--apply` is given.
  Maintain {
    #[arg(value_enum)]
    op: MaintainOp,
    /// Actually write the repairs.
    #[arg(long)]
    apply: bool,
    /// Cap on records scanned.
    #[arg(long)]
    limit: Option<usize>,
    /// Writes per transaction (clamped to 5..=500).
    #[arg(long)]
    batch_size: Option<usize>,
  },
}

/// Settings deserialised from config.toml / `ARBOR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
struct Settings {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
  /// Default principal when `--principal` is not given.
  #[serde(default)]
  principal:  Option<Uuid>,
  #[serde(default)]
  batch_size: Option<usize>,
}

fn default_store_path() -> PathBuf {
  PathBuf::from("arbor.db")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Load configuration; flags take precedence over env over file.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("ARBOR"))
    .build()
    .context("failed to read config file")?;
  let settings: Settings = settings
    .try_deserialize()
    .context("failed to deserialise settings")?;

  let store_path = cli.store.unwrap_or(settings.store_path);
  let store_path = expand_tilde(&store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let scope = match cli.principal.or(settings.principal) {
    Some(principal) => AccessScope::Principal(principal),
    None => AccessScope::Anonymous,
  };

  match cli.command {
    Command::Tree { relation, span_id, generations } => {
      commands::tree(&store, scope, relation, span_id, generations).await
    }
    Command::Activity { span_id, from, to } => {
      commands::activity(&store, scope, span_id, from, to).await
    }
    Command::Maintain { op, apply, limit, batch_size } => {
      commands::maintain(
        &store,
        op,
        apply,
        limit,
        batch_size.or(settings.batch_size),
      )
      .await
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
