use std::fs;

use packconf::{find_config, BuildConfig, BuildConfiguration, OsFileSystem};

const WEBPACK_CONFIG: &str = r"module.exports = {
  entry: './src/main.ts',
  output: {
    filename: 'dist/bundle.js'
  },
  resolve: {
    extensions: ['.webpack.js', '.web.js', '.ts', '.js']
  },
  module: {
    loaders: [
      { test: /\.ts$/, loader: 'ts-loader' }
    ]
  },
  devtool: 'source-map'
}
";

#[test]
fn discovers_and_loads_a_config_on_disk() {
  let dir = tempfile::tempdir().unwrap();
  let root = real_path(dir.path());
  fs::create_dir_all(root.join("src")).unwrap();
  fs::write(root.join("webpack.config.js"), WEBPACK_CONFIG).unwrap();
  fs::write(root.join("src/main.ts"), "export {};").unwrap();
  fs::write(root.join("src/fit.ts"), "export {};").unwrap();

  assert_eq!(find_config(&OsFileSystem, &root), Some(root.join("webpack.config.js")));

  let config = BuildConfig::discover(&root).unwrap();
  assert_eq!(config.entry_path(), root.join("src").join("main.ts"));
  assert_eq!(config.output_file(), root.join("dist").join("bundle.js"));

  let resolved = config.resolve(Some(config.entry_path()), "./fit").unwrap();
  assert_eq!(resolved.path.as_str(), root.join("src").join("fit.ts").to_string_lossy());

  let from_path = BuildConfig::from_path(root.join("webpack.config.js")).unwrap();
  assert_eq!(from_path.entry_path(), config.entry_path());
}

#[test]
fn reports_missing_config_file() {
  let dir = tempfile::tempdir().unwrap();
  let err = BuildConfig::discover(dir.path()).err().unwrap();
  assert!(err.to_string().starts_with("No config file found in"));

  let err = BuildConfig::from_path(dir.path().join("webpack.config.js")).err().unwrap();
  assert!(err.to_string().starts_with("Failed to read config file"));
}

#[test]
fn entry_only_needs_to_be_readable() {
  let dir = tempfile::tempdir().unwrap();
  let root = real_path(dir.path());
  fs::write(root.join("webpack.config.json"), r#"{ "entry": "./main.js" }"#).unwrap();
  fs::write(root.join("main.js"), b"// caf\xe9\n").unwrap();

  let config = BuildConfig::discover(&root).unwrap();
  assert_eq!(config.entry_path(), root.join("main.js"));
}

#[cfg(unix)]
#[test]
fn canonicalizes_a_symlinked_config_path() {
  let dir = tempfile::tempdir().unwrap();
  let root = real_path(dir.path()).join("project");
  fs::create_dir_all(root.join("src")).unwrap();
  fs::write(root.join("webpack.config.js"), WEBPACK_CONFIG).unwrap();
  fs::write(root.join("src/main.ts"), "export {};").unwrap();
  let link = real_path(dir.path()).join("link");
  std::os::unix::fs::symlink(&root, &link).unwrap();

  let raw: BuildConfiguration = serde_json::from_value(serde_json::json!({
    "entry": "./src/main",
    "resolve": { "extensions": [".ts"] }
  }))
  .unwrap();
  let config = BuildConfig::new(raw, Some(&link.join("webpack.config.js"))).unwrap();

  assert_eq!(config.options().config_path, Some(root.join("webpack.config.js")));
  assert_eq!(config.context(), root);
  assert_eq!(config.entry_path(), root.join("src").join("main.ts"));
}

/// Temp dirs may live behind symlinks (`/tmp` on macOS); compare against the real path.
fn real_path(path: &std::path::Path) -> std::path::PathBuf {
  fs::canonicalize(path).unwrap()
}
