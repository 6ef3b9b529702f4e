//! Error types for `sqlthemall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Only objects and arrays can be imported at the top level.
  #[error("cannot import a bare {0} value; expected an object or an array")]
  InvalidRoot(&'static str),

  #[error("table not found in catalog: {0}")]
  UnknownTable(String),

  /// A schema or row write failed in the backing store. Fatal for the run.
  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Backend(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
