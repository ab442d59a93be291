use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use oxc::span::SourceType;
use tracing::debug;

use packconf_common::BuildConfiguration;
use packconf_error::BuildResult;
use packconf_fs::FileSystem;

use super::eval_js_config::eval_js_config;

/// File names looked up by [`find_config`], in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["webpack.config.js", "webpack.config.json", "packconf.json"];

pub fn find_config<F: FileSystem>(fs: &F, dir: &Path) -> Option<PathBuf> {
  CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| fs.is_file(path))
}

/// Like [`find_config`], but a missing config file is an error listing the names looked for.
pub fn locate_config<F: FileSystem>(fs: &F, dir: &Path) -> anyhow::Result<PathBuf> {
  find_config(fs, dir).ok_or_else(|| {
    anyhow!("No config file found in {}, looked for {}", dir.display(), CONFIG_FILE_NAMES.join(", "))
  })
}

/// Reads the configuration record from a `.json` file or a JavaScript config module.
pub fn load_config<F: FileSystem>(fs: &F, path: &Path) -> BuildResult<BuildConfiguration> {
  let source = fs
    .read_to_string(path)
    .with_context(|| format!("Failed to read config file {}", path.display()))?;

  let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
  debug!(path = %path.display(), extension, "loading config");

  let value = match extension {
    "json" => serde_json::from_str(&source)
      .with_context(|| format!("Failed to parse config file {}", path.display()))?,
    "js" | "cjs" | "mjs" | "ts" | "cts" | "mts" => {
      let source_type = SourceType::from_path(path)
        .map_err(|err| anyhow!("Unsupported config file {}: {err:?}", path.display()))?;
      let dirname = path.parent().unwrap_or_else(|| Path::new(""));
      eval_js_config(&source, source_type, dirname)
        .with_context(|| format!("Failed to evaluate config file {}", path.display()))?
    }
    _ => {
      return Err(
        anyhow!(
          "Unsupported config file {}: expected a .json, .js, .cjs, .mjs or .ts file",
          path.display()
        )
        .into(),
      )
    }
  };

  let config = serde_json::from_value(value)
    .with_context(|| format!("Invalid configuration in {}", path.display()))?;
  Ok(config)
}

#[test]
fn test_find_config() {
  let fs = packconf_fs::MemoryFileSystem::new([
    ("/app/webpack.config.json", "{}"),
    ("/app/packconf.json", "{}"),
    ("/other/readme.md", ""),
  ]);
  assert_eq!(find_config(&fs, Path::new("/app")), Some(PathBuf::from("/app/webpack.config.json")));
  assert_eq!(find_config(&fs, Path::new("/other")), None);

  let err = locate_config(&fs, Path::new("/other")).unwrap_err();
  assert_eq!(
    err.to_string(),
    "No config file found in /other, looked for webpack.config.js, webpack.config.json, packconf.json"
  );
}

#[test]
fn test_load_json_and_js_configs() {
  let fs = packconf_fs::MemoryFileSystem::new([
    ("/app/webpack.config.json", r#"{ "entry": "./main.js", "devtool": "eval" }"#),
    ("/app/webpack.config.js", "module.exports = { entry: './main.js', devtool: 'eval' };"),
  ]);

  for name in ["webpack.config.json", "webpack.config.js"] {
    let config = load_config(&fs, &Path::new("/app").join(name)).unwrap();
    assert!(matches!(config.entry, Some(packconf_common::EntryConfig::Single(ref entry)) if entry == "./main.js"));
    assert!(matches!(config.devtool, Some(packconf_common::DevtoolConfig::Name(ref name)) if name == "eval"));
  }
}

#[test]
fn test_load_config_errors() {
  let fs = packconf_fs::MemoryFileSystem::new([
    ("/app/broken.json", "{ entry: "),
    ("/app/config.yaml", "entry: ./main.js"),
    ("/app/wrong-type.json", r#"{ "resolve": { "extensions": ".js" } }"#),
  ]);

  let message = |name: &str| load_config(&fs, &Path::new("/app").join(name)).unwrap_err().to_string();
  assert!(message("broken.json").starts_with("Failed to parse config file /app/broken.json"));
  assert!(message("config.yaml").starts_with("Unsupported config file /app/config.yaml"));
  assert!(message("wrong-type.json").starts_with("Invalid configuration in /app/wrong-type.json"));
  assert!(message("missing.json").starts_with("Failed to read config file /app/missing.json"));
}
