use std::path::{Path, PathBuf};

use packconf::{BuildConfig, BuildConfiguration, MemoryFileSystem, SourceMapMode};

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

fn client_project(config: &str) -> MemoryFileSystem {
  MemoryFileSystem::new([
    ("/client/webpack.config.js", config),
    ("/client/src/main.ts", "import { fit } from './fit';\nimport $ from 'jquery';\n"),
    ("/client/src/fit.ts", "export const fit = 1;"),
    ("/client/src/polyfill.web.js", ""),
    ("/client/src/polyfill.js", ""),
    ("/client/src/legacy.js", ""),
    ("/client/node_modules/jquery/package.json", r#"{ "main": "dist/jquery" }"#),
    ("/client/node_modules/jquery/dist/jquery.js", ""),
  ])
}

fn load(fs: MemoryFileSystem) -> packconf::BuildResult<BuildConfig<MemoryFileSystem>> {
  BuildConfig::from_path_with_fs(fs, Path::new("webpack.config.js"), Path::new("/client"))
}

fn error_messages(config: &str) -> Vec<String> {
  match load(client_project(config)) {
    Ok(_) => panic!("expected the configuration to be rejected"),
    Err(errors) => errors.iter().map(|err| format!("{err:#}")).collect(),
  }
}

#[test]
fn loads_the_client_configuration() {
  let config = load(client_project(WEBPACK_CONFIG)).unwrap();

  assert_eq!(config.options().config_path.as_deref(), Some(Path::new("/client/webpack.config.js")));
  assert_eq!(config.context(), Path::new("/client"));
  assert_eq!(config.entry_path(), Path::new("/client/src/main.ts"));
  assert_eq!(config.output_file(), PathBuf::from("/client/dist/bundle.js"));
  assert_eq!(config.options().devtool, Some(SourceMapMode::SOURCE_MAP));
  assert_eq!(config.sourcemap_file(), Some(PathBuf::from("/client/dist/bundle.js.map")));
  assert_eq!(config.source_mapping_url().as_deref(), Some("bundle.js.map"));
}

#[test]
fn resolves_imports_by_extension_priority() {
  let config = load(client_project(WEBPACK_CONFIG)).unwrap();
  let main = config.entry_path().to_path_buf();

  assert_eq!(config.resolve(Some(&main), "./fit").unwrap().path, "/client/src/fit.ts");
  assert_eq!(config.resolve(Some(&main), "./polyfill").unwrap().path, "/client/src/polyfill.web.js");
  assert_eq!(config.resolve(Some(&main), "./legacy").unwrap().path, "/client/src/legacy.js");
  assert_eq!(
    config.resolve(Some(&main), "jquery").unwrap().path,
    "/client/node_modules/jquery/dist/jquery.js"
  );

  let err = config.resolve(Some(&main), "./missing").unwrap_err();
  assert_eq!(err.tried().len(), 4);
  assert_eq!(err.tried()[0], Path::new("/client/src/missing.webpack.js"));
  assert_eq!(err.tried()[3], Path::new("/client/src/missing.js"));
}

#[test]
fn applies_the_first_matching_loader() {
  let config = load(client_project(WEBPACK_CONFIG)).unwrap();

  assert_eq!(config.loaders_for("src/main.ts").unwrap().loader_request(), "ts-loader");
  assert_eq!(config.loaders_for("/elsewhere/types.ts").unwrap().loaders[0].name, "ts-loader");
  assert!(config.loaders_for("src/polyfill.js").is_none());
  assert!(config.loaders_for("src/main.tsx").is_none());
}

#[test]
fn accepts_look_around_in_rule_patterns() {
  let config = WEBPACK_CONFIG.replace(
    "{ test: /\\.ts$/, loader: 'ts-loader' }",
    "{ test: /\\.ts$/, exclude: /node_modules\\/(?!my-lib)/, loader: 'ts-loader' }",
  );
  let config = load(client_project(&config)).unwrap();

  assert!(config.loaders_for("node_modules/my-lib/index.ts").is_some());
  assert!(config.loaders_for("node_modules/other/index.ts").is_none());
  assert_eq!(config.options().module_rules[0].exclude[0].as_str(), r"node_modules/(?!my-lib)");
}

#[test]
fn rules_apply_after_loaders() {
  let config = WEBPACK_CONFIG.replace(
    "    ]\n  },",
    "    ],\n    rules: [\n      { test: /\\.tsx?$/, loader: 'babel!ts-loader' },\n      { test: /\\.css$/, loader: 'style!css' }\n    ]\n  },",
  );
  let config = load(client_project(&config)).unwrap();

  assert_eq!(config.options().module_rules.len(), 3);
  assert_eq!(config.loaders_for("src/main.ts").unwrap().loader_request(), "ts-loader");
  assert_eq!(config.loaders_for("src/view.tsx").unwrap().loader_request(), "babel!ts-loader");
  assert_eq!(config.loaders_for("src/site.css").unwrap().loader_request(), "style!css");
}

#[test]
fn exposes_the_resolver() {
  let config = load(client_project(WEBPACK_CONFIG)).unwrap();
  let resolver = config.resolver();

  assert_eq!(resolver.options().extensions, [".webpack.js", ".web.js", ".ts", ".js"]);
  assert_eq!(resolver.resolve(None, "./src/fit").unwrap().path, "/client/src/fit.ts");
}

#[test]
fn accepts_an_entry_that_is_not_utf8() {
  let fs = client_project(WEBPACK_CONFIG);
  fs.add_file_bytes(Path::new("/client/src/main.ts"), b"// caf\xe9\nexport {};\n").unwrap();

  let config = load(fs).unwrap();
  assert_eq!(config.entry_path(), Path::new("/client/src/main.ts"));
}

#[test]
fn reports_a_missing_entry() {
  let messages = error_messages(&WEBPACK_CONFIG.replace("./src/main.ts", "./src/app.ts"));
  assert_eq!(messages.len(), 1, "{messages:#?}");
  assert!(messages[0].starts_with("Entry module \"./src/app.ts\" could not be resolved"));
  assert!(messages[0].contains("/client/src/app.ts"));
}

#[test]
fn entry_resolves_relative_to_the_config_file() {
  let fs = client_project(WEBPACK_CONFIG);
  fs.add_file(Path::new("/client/build/webpack.config.js"), &WEBPACK_CONFIG.replace("./src", "../src"))
    .unwrap();
  let config =
    BuildConfig::from_path_with_fs(fs, Path::new("/client/build/webpack.config.js"), Path::new("/"))
      .unwrap();
  assert_eq!(config.entry_path(), Path::new("/client/src/main.ts"));
  assert_eq!(config.output_file(), PathBuf::from("/client/build/dist/bundle.js"));
}

#[test]
fn rejects_unknown_devtool_before_building() {
  let messages = error_messages(&WEBPACK_CONFIG.replace("'source-map'", "'sourcemaps'"));
  assert_eq!(messages.len(), 1, "{messages:#?}");
  assert!(messages[0].starts_with("Invalid devtool \"sourcemaps\""));
}

#[test]
fn rejects_empty_extensions() {
  let messages = error_messages(
    &WEBPACK_CONFIG.replace("['.webpack.js', '.web.js', '.ts', '.js']", "[]"),
  );
  assert_eq!(messages.len(), 1, "{messages:#?}");
  assert!(messages[0].starts_with("`resolve.extensions` must not be empty"));
}

#[test]
fn reports_every_problem_at_once() {
  let config = WEBPACK_CONFIG
    .replace("./src/main.ts", "./src/app.ts")
    .replace(r"/\.ts$/", r"'\\.ts('")
    .replace("'source-map'", "'map'");
  let messages = error_messages(&config);
  assert_eq!(messages.len(), 3, "{messages:#?}");
  assert!(messages[0].contains("module.loaders[0].test"));
  assert!(messages[1].starts_with("Invalid devtool \"map\""));
  assert!(messages[2].starts_with("Entry module \"./src/app.ts\""));
}

#[test]
fn builds_from_raw_options() {
  let fs = client_project(WEBPACK_CONFIG);
  let raw: BuildConfiguration = serde_json::from_value(serde_json::json!({
    "entry": "./src/main",
    "resolve": { "extensions": [".ts"] },
    "output": { "path": "out", "filename": "app.js" },
    "devtool": "inline-source-map"
  }))
  .unwrap();

  let config = BuildConfig::with_fs(fs, raw, None, Path::new("/client")).unwrap();
  assert_eq!(config.entry_path(), Path::new("/client/src/main.ts"));
  assert_eq!(config.output_file(), PathBuf::from("/client/out/app.js"));
  assert_eq!(config.sourcemap_file(), None);
  assert!(config.source_mapping_url().unwrap().starts_with("data:application/json"));
  assert!(config.loaders_for("src/main.ts").is_none());
}

#[test]
fn config_is_shareable_across_threads() {
  let config = load(client_project(WEBPACK_CONFIG)).unwrap();
  let main = config.entry_path().to_path_buf();

  std::thread::scope(|scope| {
    for _ in 0..4 {
      let config = config.clone();
      let main = &main;
      scope.spawn(move || {
        assert_eq!(config.resolve(Some(main), "./fit").unwrap().path, "/client/src/fit.ts");
      });
    }
  });
}
