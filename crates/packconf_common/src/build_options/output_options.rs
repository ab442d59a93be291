use std::path::PathBuf;

use serde::Serialize;
use sugar_path::SugarPath;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
  /// Relative to `path`.
  pub filename: String,
  /// Absolute output directory.
  pub path: PathBuf,
  pub public_path: Option<String>,
}

impl OutputOptions {
  pub const DEFAULT_FILENAME: &'static str = "bundle.js";

  pub fn bundle_path(&self) -> PathBuf {
    self.path.join(&self.filename).normalize()
  }
}
