//! Reading JSON from a URL, a file or stdin.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde_json::Value;
use sqlthemall_core::shape;
use tokio::io::AsyncReadExt as _;
use tracing::{debug, warn};

/// How long a download may take in total.
const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Where the JSON comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  Url(String),
  File(PathBuf),
  Stdin,
}

impl Source {
  /// A URL wins over a file; with neither, read stdin.
  pub fn new(url: Option<String>, file: Option<PathBuf>) -> Self {
    match (url, file) {
      (Some(url), _) => Self::Url(url),
      (None, Some(path)) => Self::File(path),
      (None, None) => Self::Stdin,
    }
  }

  /// Read the whole source as text.
  pub async fn read(&self) -> Result<String> {
    match self {
      Self::Url(url) => {
        let client = reqwest::Client::builder()
          .timeout(FETCH_TIMEOUT)
          .build()
          .context("failed to build HTTP client")?;
        let resp = client
          .get(url)
          .send()
          .await
          .with_context(|| format!("GET {url} failed"))?
          .error_for_status()
          .with_context(|| format!("GET {url} returned an error"))?;
        resp.text().await.with_context(|| format!("reading body of {url}"))
      }
      Self::File(path) => tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display())),
      Self::Stdin => {
        let mut text = String::new();
        tokio::io::stdin()
          .read_to_string(&mut text)
          .await
          .context("reading stdin")?;
        Ok(text)
      }
    }
  }
}

/// Parse a whole input as one document. Blank input and empty documents give
/// `None`.
pub fn parse_document(text: &str) -> Result<Option<Value>> {
  if text.trim().is_empty() {
    return Ok(None);
  }
  let value: Value = serde_json::from_str(text).context("input is not valid JSON")?;
  Ok((!shape::is_empty(&value)).then_some(value))
}

/// Parse JSON lines. Lines that fail to parse are reported and skipped, as
/// are blank lines and empty documents.
pub fn parse_lines(text: &str) -> Vec<Value> {
  let mut docs = Vec::new();
  for (index, line) in text.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    match serde_json::from_str::<Value>(line) {
      Ok(value) if shape::is_empty(&value) => debug!(line = index + 1, "skipping empty document"),
      Ok(value) => docs.push(value),
      Err(err) => warn!(line = index + 1, error = %err, "skipping unparseable line"),
    }
  }
  docs
}
