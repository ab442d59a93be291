use std::path::PathBuf;

use serde::Serialize;

use crate::{EntryItem, ModuleRules, OutputOptions, ResolveOptions, SourceMapMode};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBuildConfiguration {
  // --- Input
  pub config_path: Option<PathBuf>,
  pub context: PathBuf,
  pub entry: EntryItem,

  // --- Output
  pub output: OutputOptions,

  // --- Resolve
  pub resolve: ResolveOptions,

  // --- Module
  pub module_rules: ModuleRules,

  // --- Source maps
  pub devtool: Option<SourceMapMode>,
}

impl NormalizedBuildConfiguration {
  /// The `.map` file written next to the bundle, if the source map mode writes one.
  pub fn sourcemap_path(&self) -> Option<PathBuf> {
    let devtool = self.devtool?;
    devtool.map_filename(&self.output.filename).map(|filename| self.output.path.join(filename))
  }

  pub fn source_mapping_url(&self) -> Option<String> {
    self.devtool.and_then(|devtool| devtool.source_mapping_url(&self.output.filename))
  }
}
