use std::path::PathBuf;

use itertools::Itertools;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
  #[error(
    "Cannot resolve \"{specifier}\" from \"{}\". Tried: {}",
    .base.display(),
    .tried.iter().map(|path| path.display()).join(", ")
  )]
  NotFound { specifier: String, base: PathBuf, tried: Vec<PathBuf> },

  #[error("Cannot resolve \"{specifier}\": `resolve.extensions` is empty")]
  EmptyExtensions { specifier: String },

  #[error("Invalid package.json at \"{}\": {message}", .path.display())]
  PackageJson { path: PathBuf, message: String },
}

impl ResolveError {
  /// Candidate paths tried before giving up, in order.
  pub fn tried(&self) -> &[PathBuf] {
    match self {
      Self::NotFound { tried, .. } => tried,
      Self::EmptyExtensions { .. } | Self::PackageJson { .. } => &[],
    }
  }
}
