//! Parsing of the database connection string.

use std::{fmt, path::PathBuf, str::FromStr};

use crate::Error;

/// Where the SQLite database lives.
///
/// Accepts `sqlite://` (in-memory), `sqlite:///rel/path`, `sqlite:////abs/path`,
/// `sqlite::memory:`, `:memory:` and bare file paths. As in SQLAlchemy URLs,
/// the slash after `sqlite://` separates the (empty) host from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
  Memory,
  File(PathBuf),
}

impl FromStr for DatabaseUrl {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() || s == ":memory:" {
      return Ok(Self::Memory);
    }

    let Some((scheme, rest)) = s.split_once("://").or_else(|| s.split_once(":")) else {
      return Ok(Self::File(PathBuf::from(s)));
    };
    if !scheme.eq_ignore_ascii_case("sqlite") {
      // A Windows drive letter looks like a one-letter scheme.
      if scheme.len() == 1 && s.contains(":\\") {
        return Ok(Self::File(PathBuf::from(s)));
      }
      return Err(Error::UnsupportedUrl(s.to_owned()));
    }

    let path = rest.split('?').next().unwrap_or_default();
    let path = path.strip_prefix('/').unwrap_or(path);
    match path {
      "" | ":memory:" => Ok(Self::Memory),
      path => Ok(Self::File(PathBuf::from(path))),
    }
  }
}

impl fmt::Display for DatabaseUrl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Memory => f.write_str("sqlite://"),
      Self::File(path) => write!(f, "sqlite:///{}", path.display()),
    }
  }
}
