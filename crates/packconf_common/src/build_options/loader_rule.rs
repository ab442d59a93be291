use std::{fmt::Display, ops::Deref, path::Path};

use itertools::Itertools;
use fancy_regex::Regex;
use serde::{ser::SerializeStruct, Serialize, Serializer};

use packconf_utils::path_ext::PathExt;

/// One element of a loader chain, e.g. `ts-loader?transpileOnly=true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderRef {
  pub name: String,
  pub query: Option<String>,
}

impl Display for LoaderRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.query {
      Some(query) => write!(f, "{}?{query}", self.name),
      None => f.write_str(&self.name),
    }
  }
}

impl Serialize for LoaderRef {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// Splits `style!css?modules` into `[style, css?modules]`.
pub fn parse_loader_chain(value: &str) -> Result<Vec<LoaderRef>, String> {
  value
    .split('!')
    .map(|segment| {
      let (name, query) = match segment.split_once('?') {
        Some((name, query)) => (name.trim(), Some(query.to_string())),
        None => (segment.trim(), None),
      };
      if name.is_empty() {
        Err(format!("Empty loader name in \"{value}\""))
      } else {
        Ok(LoaderRef { name: name.to_string(), query })
      }
    })
    .collect()
}

#[derive(Debug, Clone)]
pub struct LoaderRule {
  pub test: Regex,
  pub include: Vec<Regex>,
  pub exclude: Vec<Regex>,
  /// Never empty.
  pub loaders: Vec<LoaderRef>,
}

impl LoaderRule {
  /// `test` must match, one of `include` must match if any is given, and no `exclude` may match.
  pub fn matches(&self, path: &str) -> bool {
    is_match(&self.test, path)
      && (self.include.is_empty() || self.include.iter().any(|re| is_match(re, path)))
      && !self.exclude.iter().any(|re| is_match(re, path))
  }

  /// The loader chain in the `a!b` form.
  pub fn loader_request(&self) -> String {
    self.loaders.iter().join("!")
  }
}

impl Serialize for LoaderRule {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("LoaderRule", 4)?;
    state.serialize_field("test", self.test.as_str())?;
    state.serialize_field("include", &self.include.iter().map(Regex::as_str).collect_vec())?;
    state.serialize_field("exclude", &self.exclude.iter().map(Regex::as_str).collect_vec())?;
    state.serialize_field("loaders", &self.loaders)?;
    state.end()
  }
}

/// Patterns follow JS semantics, so look-around and backreferences are allowed. A pattern that
/// exceeds the backtracking limit while matching counts as not matching.
fn is_match(regex: &Regex, path: &str) -> bool {
  regex.is_match(path).unwrap_or(false)
}

/// Loader rules in declaration order. The first matching rule wins.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ModuleRules(Vec<LoaderRule>);

impl ModuleRules {
  pub fn new(rules: Vec<LoaderRule>) -> Self {
    Self(rules)
  }

  pub fn match_str(&self, path: &str) -> Option<&LoaderRule> {
    self.0.iter().find(|rule| rule.matches(path))
  }

  /// Rules are tested against the `/`-separated form of the path.
  pub fn match_path(&self, path: &Path) -> Option<&LoaderRule> {
    self.match_str(&path.to_slash_string())
  }
}

impl Deref for ModuleRules {
  type Target = [LoaderRule];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

#[cfg(test)]
fn rule(test: &str, loader: &str) -> LoaderRule {
  LoaderRule {
    test: Regex::new(test).unwrap(),
    include: vec![],
    exclude: vec![],
    loaders: parse_loader_chain(loader).unwrap(),
  }
}

#[test]
fn test_parse_loader_chain() {
  let chain = parse_loader_chain("style!css?modules&importLoaders=1").unwrap();
  assert_eq!(chain.len(), 2);
  assert_eq!(chain[0], LoaderRef { name: "style".to_string(), query: None });
  assert_eq!(chain[1].name, "css");
  assert_eq!(chain[1].query.as_deref(), Some("modules&importLoaders=1"));
  assert_eq!(chain[1].to_string(), "css?modules&importLoaders=1");

  assert_eq!(parse_loader_chain("ts-loader").unwrap()[0].name, "ts-loader");
  assert!(parse_loader_chain("").is_err());
  assert!(parse_loader_chain("style!!css").is_err());
  assert!(parse_loader_chain("?query").is_err());
}

#[test]
fn test_first_matching_rule_wins() {
  let rules = ModuleRules::new(vec![
    rule(r"\.ts$", "ts-loader"),
    rule(r"\.tsx?$", "babel!ts-loader"),
    rule(r"\.css$", "style!css"),
  ]);

  assert_eq!(rules.match_path(Path::new("/app/src/main.ts")).unwrap().loader_request(), "ts-loader");
  assert_eq!(
    rules.match_path(Path::new("/app/src/view.tsx")).unwrap().loader_request(),
    "babel!ts-loader"
  );
  assert_eq!(rules.match_str("/app/style.css").unwrap().loaders.len(), 2);
  assert!(rules.match_str("/app/src/main.js").is_none());
  assert!(rules.match_str("/app/src/main.ts.bak").is_none());
}

#[test]
fn test_include_and_exclude() {
  let mut ts = rule(r"\.ts$", "ts-loader");
  ts.exclude = vec![Regex::new("node_modules").unwrap()];
  let mut js = rule(r"\.js$", "babel-loader");
  js.include = vec![Regex::new("/src/").unwrap()];
  let rules = ModuleRules::new(vec![ts, js]);

  assert!(rules.match_str("/app/src/main.ts").is_some());
  assert!(rules.match_str("/app/node_modules/lib/index.ts").is_none());
  assert!(rules.match_str("/app/src/util.js").is_some());
  assert!(rules.match_str("/app/vendor/util.js").is_none());
}

#[test]
fn test_look_around_patterns() {
  let mut js = rule(r"\.js$", "babel-loader");
  js.exclude = vec![Regex::new(r"node_modules/(?!my-lib)").unwrap()];
  let mut css = rule(r"(?<!\.module)\.css$", "style!css");
  css.include = vec![Regex::new(r"^/app/(\w+)/\1/").unwrap()];
  let rules = ModuleRules::new(vec![js, css]);

  assert!(rules.match_str("/app/node_modules/my-lib/index.js").is_some());
  assert!(rules.match_str("/app/node_modules/other/index.js").is_none());
  assert!(rules.match_str("/app/src/theme.css").is_none());
  assert!(rules.match_str("/app/src/src/theme.css").is_some());
  assert!(rules.match_str("/app/src/src/theme.module.css").is_none());
}

#[test]
fn test_empty_rules_match_nothing() {
  assert!(ModuleRules::default().match_str("/app/src/main.ts").is_none());
}
