use std::path::Path;

use anyhow::anyhow;
use fancy_regex::Regex;

use packconf_common::{
  parse_loader_chain, BuildConfiguration, DevtoolConfig, EntryConfig, EntryItem, LoaderRule,
  ModuleRules, NormalizedBuildConfiguration, OneOrMany, OutputOptions, RawRule, ResolveOptions,
  SourceMapMode,
};
use packconf_utils::path_ext::PathExt;

pub struct NormalizeOptionsReturn {
  pub options: NormalizedBuildConfiguration,
  /// Problems found while normalizing. Offending values are dropped or replaced by defaults so
  /// that validation can still run on the rest.
  pub errors: Vec<anyhow::Error>,
}

pub fn normalize_options(
  raw_options: BuildConfiguration,
  config_path: Option<&Path>,
  cwd: &Path,
) -> NormalizeOptionsReturn {
  let mut errors = vec![];

  let config_dir = config_path
    .and_then(Path::parent)
    .map_or_else(|| cwd.to_path_buf(), |dir| dir.absolutize_from(cwd));

  let context = raw_options
    .context
    .map_or_else(|| config_dir.clone(), |context| Path::new(&context).absolutize_from(&config_dir));

  let entry = normalize_entry(raw_options.entry, &mut errors);

  let raw_output = raw_options.output.unwrap_or_default();
  let output = OutputOptions {
    filename: raw_output.filename.unwrap_or_else(|| OutputOptions::DEFAULT_FILENAME.to_string()),
    path: raw_output
      .path
      .map_or_else(|| context.clone(), |path| Path::new(&path).absolutize_from(&context)),
    public_path: raw_output.public_path,
  };

  let raw_resolve = raw_options.resolve.unwrap_or_default();
  let default_resolve = ResolveOptions::default();
  let resolve = ResolveOptions {
    extensions: raw_resolve.extensions.unwrap_or(default_resolve.extensions),
    modules_directories: raw_resolve
      .modules_directories
      .unwrap_or(default_resolve.modules_directories),
    roots: raw_resolve
      .root
      .map(OneOrMany::into_vec)
      .unwrap_or_default()
      .iter()
      .map(|root| Path::new(root).absolutize_from(&context))
      .collect(),
  };

  let raw_module = raw_options.module.unwrap_or_default();
  let raw_rules = raw_module
    .loaders
    .unwrap_or_default()
    .into_iter()
    .enumerate()
    .map(|(idx, rule)| (format!("module.loaders[{idx}]"), rule))
    .chain(
      raw_module
        .rules
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, rule)| (format!("module.rules[{idx}]"), rule)),
    );
  let module_rules = ModuleRules::new(
    raw_rules.filter_map(|(label, rule)| normalize_rule(&label, rule, &mut errors)).collect(),
  );

  let devtool = match raw_options.devtool {
    None | Some(DevtoolConfig::Enabled(false)) => None,
    Some(DevtoolConfig::Enabled(true)) => {
      errors.push(anyhow!("`devtool: true` is not a source map mode, use a name like \"source-map\""));
      None
    }
    Some(DevtoolConfig::Name(name)) => match name.parse::<SourceMapMode>() {
      Ok(mode) => Some(mode),
      Err(message) => {
        errors.push(anyhow!(message));
        None
      }
    },
  };

  let options = NormalizedBuildConfiguration {
    config_path: config_path.map(|path| path.absolutize_from(cwd)),
    context,
    entry,
    output,
    resolve,
    module_rules,
    devtool,
  };

  NormalizeOptionsReturn { options, errors }
}

/// Only a single entry point is supported. A missing entry is reported and replaced by an empty
/// request, which validation skips.
fn normalize_entry(entry: Option<EntryConfig>, errors: &mut Vec<anyhow::Error>) -> EntryItem {
  let items = match entry {
    None => {
      errors.push(anyhow!("`entry` is required"));
      return EntryItem::default();
    }
    Some(EntryConfig::Single(request)) => return EntryItem::from(request.as_str()),
    Some(EntryConfig::Multiple(requests)) => requests
      .into_iter()
      .map(|request| EntryItem { name: EntryItem::DEFAULT_NAME.to_string(), request })
      .collect::<Vec<_>>(),
    Some(EntryConfig::Named(map)) => {
      map.into_iter().map(|(name, request)| EntryItem { name, request }).collect()
    }
  };

  match <[EntryItem; 1]>::try_from(items) {
    Ok([item]) => item,
    Err(items) => {
      errors.push(anyhow!("`entry` must name exactly one entry point, got {}", items.len()));
      EntryItem::default()
    }
  }
}

fn normalize_rule(
  label: &str,
  rule: RawRule,
  errors: &mut Vec<anyhow::Error>,
) -> Option<LoaderRule> {
  let mut compile = |field: &str, pattern: &str| match Regex::new(pattern) {
    Ok(regex) => Some(regex),
    Err(err) => {
      errors.push(anyhow!("Invalid regular expression /{pattern}/ in `{label}.{field}`: {err}"));
      None
    }
  };

  let test = rule.test.as_deref().and_then(|pattern| compile("test", pattern));
  let include = compile_all(rule.include, "include", &mut compile);
  let exclude = compile_all(rule.exclude, "exclude", &mut compile);

  let chain = match (rule.loader, rule.loaders) {
    (Some(loader), None) => parse_loader_chain(&loader),
    (None, Some(loaders)) if !loaders.is_empty() => loaders
      .iter()
      .map(|loader| parse_loader_chain(loader))
      .collect::<Result<Vec<_>, _>>()
      .map(|chains| chains.concat()),
    (Some(_), Some(_)) => Err("`loader` and `loaders` cannot be used together".to_string()),
    (None, _) => Err("a rule needs a `loader` or a non-empty `loaders` list".to_string()),
  };

  let loaders = match chain {
    Ok(loaders) => Some(loaders),
    Err(message) => {
      errors.push(anyhow!("Invalid `{label}`: {message}"));
      None
    }
  };

  if rule.test.is_none() {
    errors.push(anyhow!("Invalid `{label}`: `test` is required"));
  }

  Some(LoaderRule { test: test?, include: include?, exclude: exclude?, loaders: loaders? })
}

fn compile_all(
  patterns: Option<OneOrMany<String>>,
  field: &str,
  compile: &mut impl FnMut(&str, &str) -> Option<Regex>,
) -> Option<Vec<Regex>> {
  let patterns = patterns.map(OneOrMany::into_vec).unwrap_or_default();
  let compiled: Vec<_> = patterns.iter().map(|pattern| compile(field, pattern)).collect();
  compiled.into_iter().collect()
}

#[cfg(test)]
use std::path::PathBuf;

#[cfg(test)]
fn normalize(value: serde_json::Value) -> NormalizeOptionsReturn {
  let raw = serde_json::from_value(value).unwrap();
  normalize_options(raw, Some(Path::new("/project/webpack.config.js")), Path::new("/cwd"))
}

#[test]
fn test_normalize_original_config() {
  let NormalizeOptionsReturn { options, errors } = normalize(serde_json::json!({
    "entry": "./src/main.ts",
    "output": { "filename": "dist/bundle.js" },
    "resolve": { "extensions": [".webpack.js", ".web.js", ".ts", ".js"] },
    "module": { "loaders": [{ "test": "\\.ts$", "loader": "ts-loader" }] },
    "devtool": "source-map"
  }));

  assert!(errors.is_empty(), "{errors:?}");
  assert_eq!(options.config_path.as_deref(), Some(Path::new("/project/webpack.config.js")));
  assert_eq!(options.context, PathBuf::from("/project"));
  assert_eq!(options.entry, EntryItem::from("./src/main.ts"));
  assert_eq!(options.output.bundle_path(), PathBuf::from("/project/dist/bundle.js"));
  assert_eq!(options.resolve.extensions, [".webpack.js", ".web.js", ".ts", ".js"]);
  assert_eq!(options.resolve.modules_directories, ["web_modules", "node_modules"]);
  assert_eq!(options.module_rules.len(), 1);
  assert_eq!(options.module_rules[0].loader_request(), "ts-loader");
  assert_eq!(options.devtool, Some(SourceMapMode::SOURCE_MAP));
  assert_eq!(options.sourcemap_path(), Some(PathBuf::from("/project/dist/bundle.js.map")));
}

#[test]
fn test_normalize_defaults() {
  let NormalizeOptionsReturn { options, errors } =
    normalize(serde_json::json!({ "entry": "./index", "context": "../app" }));

  assert!(errors.is_empty(), "{errors:?}");
  assert_eq!(options.context, PathBuf::from("/app"));
  assert_eq!(options.output.filename, "bundle.js");
  assert_eq!(options.output.path, PathBuf::from("/app"));
  assert_eq!(options.resolve.extensions, ["", ".webpack.js", ".web.js", ".js"]);
  assert!(options.module_rules.is_empty());
  assert_eq!(options.devtool, None);
}

#[test]
fn test_normalize_without_config_path_uses_cwd() {
  let raw = serde_json::from_value(serde_json::json!({ "entry": "./main.js" })).unwrap();
  let NormalizeOptionsReturn { options, .. } = normalize_options(raw, None, Path::new("/cwd"));
  assert_eq!(options.context, PathBuf::from("/cwd"));
  assert_eq!(options.config_path, None);
}

#[test]
fn test_normalize_rules() {
  let NormalizeOptionsReturn { options, errors } = normalize(serde_json::json!({
    "entry": "./main.js",
    "resolve": { "root": "lib" },
    "module": {
      "loaders": [
        { "test": "\\.css$", "loader": "style!css?modules" },
        { "test": "\\.js$", "loaders": ["babel?cacheDirectory", "eslint"], "exclude": "node_modules" }
      ],
      "rules": [{ "test": "\\.json$", "loader": "json-loader", "include": ["/src/", "/data/"] }]
    }
  }));

  assert!(errors.is_empty(), "{errors:?}");
  assert_eq!(options.resolve.roots, [PathBuf::from("/project/lib")]);
  let rules = &options.module_rules;
  assert_eq!(rules.len(), 3);
  assert_eq!(rules[0].loader_request(), "style!css?modules");
  assert_eq!(rules[1].loader_request(), "babel?cacheDirectory!eslint");
  assert_eq!(rules[1].exclude.len(), 1);
  assert_eq!(rules[2].include.len(), 2);
  assert!(rules.match_str("/project/node_modules/x.js").is_none());
  assert_eq!(rules.match_str("/project/src/data.json").unwrap().loader_request(), "json-loader");
}

#[test]
fn test_normalize_collects_every_error() {
  let NormalizeOptionsReturn { options, errors } = normalize(serde_json::json!({
    "entry": ["./a.js", "./b.js"],
    "module": {
      "loaders": [
        { "test": "\\.ts(", "loader": "ts-loader" },
        { "test": "\\.js$" },
        { "loader": "raw" },
        { "test": "\\.css$", "loader": "style!!css" },
        { "test": "\\.md$", "loader": "md", "exclude": ["[z-a]"] },
        { "test": "\\.ok$", "loader": "ok" }
      ]
    },
    "devtool": "sourcemaps"
  }));

  let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
  assert_eq!(messages.len(), 7, "{messages:#?}");
  assert!(messages[0].contains("exactly one entry point, got 2"));
  assert!(messages[1].starts_with("Invalid regular expression /\\.ts(/ in `module.loaders[0].test`"));
  assert!(messages[2].contains("`module.loaders[1]`: a rule needs a `loader`"));
  assert!(messages[3].contains("`module.loaders[2]`: `test` is required"));
  assert!(messages[4].contains("Empty loader name in \"style!!css\""));
  assert!(messages[5].contains("`module.loaders[4].exclude`"));
  assert!(messages[6].starts_with("Invalid devtool \"sourcemaps\""));

  assert_eq!(options.entry, EntryItem::default());
  assert_eq!(options.module_rules.len(), 1);
  assert_eq!(options.module_rules[0].loader_request(), "ok");
  assert_eq!(options.devtool, None);
}

#[test]
fn test_normalize_devtool_values() {
  let devtool = |value: serde_json::Value| {
    let ret = normalize(serde_json::json!({ "entry": "./a.js", "devtool": value }));
    (ret.options.devtool, ret.errors.len())
  };
  assert_eq!(devtool(serde_json::json!(false)), (None, 0));
  assert_eq!(devtool(serde_json::json!(true)), (None, 1));
  assert_eq!(
    devtool(serde_json::json!("#@cheap-module-source-map")),
    (Some(SourceMapMode::CHEAP | SourceMapMode::MODULE | SourceMapMode::SOURCE_MAP), 0)
  );
  assert_eq!(
    devtool(serde_json::json!("cheap-module-inline-source-map")),
    (
      Some(
        SourceMapMode::INLINE
          | SourceMapMode::CHEAP
          | SourceMapMode::MODULE
          | SourceMapMode::SOURCE_MAP
      ),
      0
    )
  );
}
