use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;

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

fn project(config: &str) -> tempfile::TempDir {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  fs::create_dir_all(root.join("src")).unwrap();
  fs::write(root.join("webpack.config.js"), config).unwrap();
  fs::write(root.join("src/main.ts"), "import './fit';").unwrap();
  fs::write(root.join("src/fit.ts"), "export {};").unwrap();
  dir
}

fn packconf(dir: &Path) -> Command {
  let mut cmd = Command::cargo_bin("packconf").unwrap();
  cmd.current_dir(dir);
  cmd
}

#[test]
fn check_prints_a_summary() {
  let dir = project(WEBPACK_CONFIG);
  packconf(dir.path())
    .arg("check")
    .assert()
    .success()
    .stdout(predicate::str::contains("main.ts"))
    .stdout(predicate::str::contains("bundle.js"))
    .stdout(predicate::str::contains(".webpack.js, .web.js, .ts, .js"))
    .stdout(predicate::str::contains("ts-loader"))
    .stdout(predicate::str::contains("source-map"))
    .stdout(predicate::str::contains("Checked in"));
}

#[test]
fn check_fails_on_unknown_devtool() {
  let dir = project(&WEBPACK_CONFIG.replace("'source-map'", "'sourcemaps'"));
  packconf(dir.path())
    .arg("check")
    .assert()
    .failure()
    .stdout(predicate::str::contains("Invalid devtool \"sourcemaps\""));
}

#[test]
fn devtool_flag_overrides_the_config() {
  let dir = project(&WEBPACK_CONFIG.replace("'source-map'", "'sourcemaps'"));
  packconf(dir.path())
    .args(["check", "--devtool", "cheap-module-source-map"])
    .assert()
    .success()
    .stdout(predicate::str::contains("cheap-module-source-map"));
}

#[test]
fn devtool_flag_accepts_combined_names() {
  let dir = project(WEBPACK_CONFIG);
  packconf(dir.path())
    .args(["check", "--devtool", "cheap-module-inline-source-map"])
    .assert()
    .success()
    .stdout(predicate::str::contains("inline-cheap-module-source-map"));

  packconf(dir.path())
    .args(["check", "--devtool", "fast-map"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid devtool \"fast-map\""));
}

#[test]
fn resolve_prints_the_resolved_file() {
  let dir = project(WEBPACK_CONFIG);
  packconf(dir.path())
    .args(["resolve", "./fit", "--from", "src/main.ts"])
    .assert()
    .success()
    .stdout(predicate::str::contains("fit.ts"));

  packconf(dir.path())
    .args(["resolve", "./nope", "--from", "src/main.ts"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("Cannot resolve \"./nope\""));
}

#[test]
fn match_prints_the_loader_chain() {
  let dir = project(WEBPACK_CONFIG);
  packconf(dir.path())
    .args(["match", "src/main.ts", "src/other.js"])
    .assert()
    .success()
    .stdout(predicate::str::contains("ts-loader"))
    .stdout(predicate::str::contains("(none)"));
}

#[test]
fn print_emits_json() {
  let dir = project(WEBPACK_CONFIG);
  let output = packconf(dir.path()).arg("print").output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["entry"]["request"], "./src/main.ts");
  assert_eq!(json["output"]["filename"], "dist/bundle.js");
  assert_eq!(json["moduleRules"][0]["test"], "\\.ts$");
  assert_eq!(json["moduleRules"][0]["loaders"][0], "ts-loader");
  assert_eq!(json["devtool"], "source-map");
}

#[test]
fn explicit_config_path() {
  let dir = project(WEBPACK_CONFIG);
  fs::rename(dir.path().join("webpack.config.js"), dir.path().join("build.config.js")).unwrap();

  packconf(dir.path())
    .arg("check")
    .assert()
    .failure()
    .stdout(predicate::str::contains("No config file found"));
  packconf(dir.path()).args(["check", "--config", "build.config.js"]).assert().success();
}
