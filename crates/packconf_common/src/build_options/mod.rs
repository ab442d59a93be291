pub mod entry_item;
pub mod loader_rule;
pub mod normalized_build_configuration;
pub mod output_options;
pub mod resolve_options;
pub mod source_map_mode;

use indexmap::IndexMap;
use serde::Deserialize;

/// The configuration record as written by the user. Every field is optional here;
/// defaults and checks are applied when it is normalized.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
  // --- Input
  pub context: Option<String>,
  pub entry: Option<EntryConfig>,

  // --- Output
  pub output: Option<OutputConfig>,

  // --- Resolve
  pub resolve: Option<ResolveConfig>,

  // --- Module
  pub module: Option<ModuleConfig>,

  // --- Source maps
  pub devtool: Option<DevtoolConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntryConfig {
  Single(String),
  Multiple(Vec<String>),
  Named(IndexMap<String, String>),
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
  pub filename: Option<String>,
  pub path: Option<String>,
  pub public_path: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConfig {
  pub extensions: Option<Vec<String>>,
  pub modules_directories: Option<Vec<String>>,
  pub root: Option<OneOrMany<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ModuleConfig {
  pub loaders: Option<Vec<RawRule>>,
  /// Newer spelling of `loaders`. Both lists are honored, `loaders` first.
  pub rules: Option<Vec<RawRule>>,
}

/// A single entry of `module.loaders`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawRule {
  pub test: Option<String>,
  pub loader: Option<String>,
  pub loaders: Option<Vec<String>>,
  pub include: Option<OneOrMany<String>>,
  pub exclude: Option<OneOrMany<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DevtoolConfig {
  Name(String),
  Enabled(bool),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
  One(T),
  Many(Vec<T>),
}

impl<T> OneOrMany<T> {
  pub fn into_vec(self) -> Vec<T> {
    match self {
      Self::One(item) => vec![item],
      Self::Many(items) => items,
    }
  }
}

#[test]
fn test_deserialize_configuration() {
  let config: BuildConfiguration = serde_json::from_value(serde_json::json!({
    "entry": "./src/main.ts",
    "output": { "filename": "dist/bundle.js" },
    "resolve": { "extensions": [".webpack.js", ".web.js", ".ts", ".js"] },
    "module": { "loaders": [{ "test": "\\.ts$", "loader": "ts-loader" }] },
    "devtool": "source-map",
    "plugins": []
  }))
  .unwrap();

  assert!(matches!(config.entry, Some(EntryConfig::Single(ref entry)) if entry == "./src/main.ts"));
  assert_eq!(config.output.unwrap().filename.as_deref(), Some("dist/bundle.js"));
  assert_eq!(config.resolve.unwrap().extensions.unwrap().len(), 4);
  let loaders = config.module.unwrap().loaders.unwrap();
  assert_eq!(loaders[0].test.as_deref(), Some("\\.ts$"));
  assert_eq!(loaders[0].loader.as_deref(), Some("ts-loader"));
  assert!(matches!(config.devtool, Some(DevtoolConfig::Name(ref name)) if name == "source-map"));
}

#[test]
fn test_deserialize_entry_shapes() {
  let config: BuildConfiguration =
    serde_json::from_value(serde_json::json!({ "entry": { "app": "./app.js" }, "devtool": false }))
      .unwrap();
  match config.entry {
    Some(EntryConfig::Named(map)) => assert_eq!(map["app"], "./app.js"),
    other => panic!("unexpected entry {other:?}"),
  }
  assert!(matches!(config.devtool, Some(DevtoolConfig::Enabled(false))));

  let config: BuildConfiguration =
    serde_json::from_value(serde_json::json!({ "entry": ["./a.js", "./b.js"] })).unwrap();
  assert!(matches!(config.entry, Some(EntryConfig::Multiple(ref items)) if items.len() == 2));
}
