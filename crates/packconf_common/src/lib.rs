mod build_options;

pub use build_options::{
  entry_item::EntryItem,
  loader_rule::{parse_loader_chain, LoaderRef, LoaderRule, ModuleRules},
  normalized_build_configuration::NormalizedBuildConfiguration,
  output_options::OutputOptions,
  resolve_options::ResolveOptions,
  source_map_mode::SourceMapMode,
  BuildConfiguration, DevtoolConfig, EntryConfig, ModuleConfig, OneOrMany, OutputConfig,
  RawRule, ResolveConfig,
};
