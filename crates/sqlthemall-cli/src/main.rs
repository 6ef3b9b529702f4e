//! `sqlthemall`: import JSON documents into a relational database, creating
//! the schema on the fly.
//!
//! # Usage
//!
//! ```
//! sqlthemall -d sqlite:////var/data/import.sqlite -f data.json
//! curl -s https://example.org/feed.jsonl | sqlthemall -d sqlite:///out.sqlite --line
//! sqlthemall -d sqlite:///out.sqlite -u https://example.org/data.json --noimport
//! ```
//!
//! Settings are read from `sqlthemall.toml` (or `--config`), then from
//! `SQLTHEMALL_*` environment variables, then from the command line.

mod input;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use input::Source;
use serde::Deserialize;
use serde_json::Value;
use sqlthemall_core::InsertStats;
use sqlthemall_store_sqlite::{BatchMode, BatchReport, ImportOptions, Importer};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, filter::Directive};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sqlthemall", version, about = "Import JSON into a relational database")]
struct Cli {
  /// Database URL, e.g. `sqlite:///import.sqlite` (relative) or
  /// `sqlite:////var/data/import.sqlite` (absolute); `sqlite://` is in-memory.
  #[arg(short = 'd', long = "databaseurl", value_name = "URL")]
  database_url: Option<String>,

  /// URL to read JSON from.
  #[arg(short, long)]
  url: Option<String>,

  /// File to read JSON from (default: stdin).
  #[arg(short, long, value_name = "FILE")]
  file: Option<PathBuf>,

  /// Link lists with direct foreign keys instead of bridge tables, and do
  /// not deduplicate rows.
  #[arg(short, long)]
  simple: bool,

  /// Only create the schema, skip the import.
  #[arg(short, long)]
  noimport: bool,

  /// Log level.
  #[arg(short = 'L', long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
  loglevel: LogLevel,

  /// Do not print progress while importing.
  #[arg(short = 'p', long, alias = "no_progress")]
  no_progress: bool,

  /// Log every SQL statement.
  #[arg(short, long)]
  echo: bool,

  /// Table that receives the top level of each document (default: main).
  #[arg(short = 't', long, value_name = "TABLE")]
  root_table: Option<String>,

  /// Read JSON lines instead of a single document.
  #[arg(short = 'l', long)]
  line: bool,

  /// Import documents one at a time; a failing document does not stop the
  /// others.
  #[arg(short = 'S', long)]
  sequential: bool,

  /// Documents per batch in JSON-lines mode (default: 100).
  #[arg(short = 'N', long, alias = "batch_size", value_name = "N")]
  batch_size: Option<u64>,

  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "sqlthemall.toml")]
  config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
  Error,
  Warning,
  Info,
  Debug,
}

impl LogLevel {
  fn filter(self) -> LevelFilter {
    match self {
      Self::Error => LevelFilter::ERROR,
      Self::Warning => LevelFilter::WARN,
      Self::Info => LevelFilter::INFO,
      Self::Debug => LevelFilter::DEBUG,
    }
  }
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Merged configuration: file, then environment, then flags.
#[derive(Debug, Deserialize)]
struct Settings {
  database_url: Option<String>,
  #[serde(default = "default_batch_size")]
  batch_size:   usize,
  /// `root_table` and `simple`.
  #[serde(flatten)]
  import:       ImportOptions,
}

fn default_batch_size() -> usize { 100 }

fn load_settings(cli: &Cli) -> Result<Settings> {
  config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("SQLTHEMALL").try_parsing(true))
    .set_override_option("database_url", cli.database_url.clone())?
    .set_override_option("root_table", cli.root_table.clone())?
    .set_override_option("simple", cli.simple.then_some(true))?
    .set_override_option("batch_size", cli.batch_size)?
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("invalid configuration")
}

// ─── Progress ─────────────────────────────────────────────────────────────────

/// One dot per imported document on stderr.
struct Progress {
  enabled: bool,
  dots:    usize,
}

impl Progress {
  fn tick(&mut self, documents: usize) {
    if self.enabled && documents > 0 {
      eprint!("{}", ".".repeat(documents));
      self.dots += documents;
    }
  }

  fn finish(&self) {
    if self.dots > 0 {
      eprintln!();
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.loglevel, cli.echo)?;

  let settings = load_settings(&cli)?;
  let database_url = settings
    .database_url
    .clone()
    .context("no database given; pass --databaseurl or set SQLTHEMALL_DATABASE_URL")?;

  let mut importer = Importer::connect(&database_url, settings.import)
    .await
    .with_context(|| format!("failed to open {database_url}"))?;

  let text = Source::new(cli.url.clone(), cli.file.clone()).read().await?;
  let mode = if cli.sequential { BatchMode::Sequential } else { BatchMode::Batched };
  let progress = !cli.no_progress && cli.loglevel.filter() >= LevelFilter::INFO;
  let mut run = Run::new(&mut importer, mode, cli.noimport, progress);

  if cli.line {
    let docs = input::parse_lines(&text);
    for batch in docs.chunks(settings.batch_size.max(1)) {
      run.batch(batch.to_vec()).await?;
    }
  } else if let Some(doc) = input::parse_document(&text)? {
    match doc {
      Value::Array(items) if cli.sequential => run.batch(items).await?,
      doc => run.batch(vec![doc]).await?,
    }
  }
  run.progress.finish();

  info!(
    documents = run.documents,
    inserted = run.stats.inserted,
    reused = run.stats.reused,
    "import finished"
  );
  anyhow::ensure!(run.failed == 0, "{} documents failed to import", run.failed);
  Ok(())
}

fn init_tracing(level: LogLevel, echo: bool) -> Result<()> {
  let mut filter = EnvFilter::builder()
    .with_default_directive(level.filter().into())
    .from_env_lossy();
  if echo {
    let sql: Directive = "sqlthemall_store_sqlite=trace".parse().context("bad log directive")?;
    filter = filter.add_directive(sql);
  }
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
  Ok(())
}

/// State of one invocation.
struct Run<'a> {
  importer:  &'a mut Importer,
  mode:      BatchMode,
  noimport:  bool,
  progress:  Progress,
  documents: usize,
  failed:    usize,
  stats:     InsertStats,
}

impl<'a> Run<'a> {
  fn new(importer: &'a mut Importer, mode: BatchMode, noimport: bool, progress: bool) -> Self {
    Self {
      importer,
      mode,
      noimport,
      progress: Progress { enabled: progress, dots: 0 },
      documents: 0,
      failed: 0,
      stats: InsertStats::default(),
    }
  }

  async fn batch(&mut self, mut docs: Vec<Value>) -> Result<()> {
    // A lone document is handled as it is rather than as a one-element list,
    // so a document that is itself a list is not nested one level deeper.
    if self.noimport {
      let value = if docs.len() == 1 { docs.swap_remove(0) } else { Value::Array(docs) };
      self
        .importer
        .infer_schema(&value)
        .await
        .context("failed to create schema")?;
      return Ok(());
    }

    let report = if self.mode == BatchMode::Batched && docs.len() == 1 {
      let stats = self.importer.import(&docs[0]).await.context("import failed")?;
      BatchReport { imported: 1, failed: vec![], stats }
    } else {
      self
        .importer
        .import_batch(docs, self.mode)
        .await
        .context("batch import failed")?
    };

    self.progress.tick(report.imported);
    self.documents += report.imported;
    self.failed += report.failed.len();
    self.stats += report.stats;
    Ok(())
  }
}
