use std::path::PathBuf;

use serde::Serialize;

pub const DEFAULT_EXTENSIONS: [&str; 4] = ["", ".webpack.js", ".web.js", ".js"];
pub const DEFAULT_MODULES_DIRECTORIES: [&str; 2] = ["web_modules", "node_modules"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOptions {
  /// Suffixes appended to a request, in priority order. `""` stands for the request itself.
  pub extensions: Vec<String>,
  /// Directory names searched in the importer's directory and every ancestor for bare requests.
  pub modules_directories: Vec<String>,
  /// Absolute directories searched for bare requests before `modules_directories`.
  pub roots: Vec<PathBuf>,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    Self {
      extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
      modules_directories: DEFAULT_MODULES_DIRECTORIES.iter().map(ToString::to_string).collect(),
      roots: vec![],
    }
  }
}
