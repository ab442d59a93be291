use std::{
  ffi::OsString,
  path::{Path, PathBuf},
};

use arcstr::ArcStr;
use dashmap::DashMap;
use itertools::Itertools;
use sugar_path::SugarPath;
use tracing::{debug, trace};

use packconf_common::ResolveOptions;
use packconf_fs::{FileSystem, OsFileSystem};
use packconf_utils::path_ext::PathExt;

use crate::error::ResolveError;

/// `package.json` fields consulted for a package's entry file, in priority order.
const PACKAGE_MAIN_FIELDS: [&str; 4] = ["webpack", "browser", "web", "main"];

#[derive(Debug)]
pub struct Resolver<F: FileSystem = OsFileSystem> {
  cwd: PathBuf,
  fs: F,
  options: ResolveOptions,
  cache: DashMap<(PathBuf, String), ResolveReturn>,
}

#[derive(Debug, Clone)]
pub struct ResolveReturn {
  /// Display form of `absolute_path`. Lossy for paths that are not valid UTF-8.
  pub path: ArcStr,
  pub absolute_path: PathBuf,
  pub package_json: Option<PathBuf>,
}

impl ResolveReturn {
  fn new(absolute_path: PathBuf, package_json: Option<PathBuf>) -> Self {
    Self { path: absolute_path.to_string_lossy().as_ref().into(), absolute_path, package_json }
  }
}

impl<F: FileSystem> Resolver<F> {
  pub fn new(options: ResolveOptions, cwd: PathBuf, fs: F) -> Self {
    Self { cwd, fs, options, cache: DashMap::default() }
  }

  pub fn options(&self) -> &ResolveOptions {
    &self.options
  }

  pub fn fs(&self) -> &F {
    &self.fs
  }

  /// Resolves `specifier` relative to the directory of `importer`, or to `cwd` without one.
  pub fn resolve(
    &self,
    importer: Option<&Path>,
    specifier: &str,
  ) -> Result<ResolveReturn, ResolveError> {
    let dir = importer
      .and_then(Path::parent)
      .filter(|inner| inner.components().next().is_some())
      .map_or_else(|| self.cwd.clone(), |dir| dir.absolutize_from(&self.cwd));

    let key = (dir, specifier.to_string());
    if let Some(cached) = self.cache.get(&key) {
      return Ok(cached.value().clone());
    }

    let resolved = self.resolve_uncached(&key.0, specifier)?;
    debug!(specifier, base = %key.0.display(), resolved = %resolved.path, "resolved");
    self.cache.insert(key, resolved.clone());
    Ok(resolved)
  }

  fn resolve_uncached(&self, dir: &Path, specifier: &str) -> Result<ResolveReturn, ResolveError> {
    let mut tried = vec![];

    let resolved = if is_path_like(specifier) {
      let request = Path::new(specifier).absolutize_from(dir);
      if self.options.extensions.is_empty() && !request.has_extension() {
        return Err(ResolveError::EmptyExtensions { specifier: specifier.to_string() });
      }
      self
        .load_as_file(&request, &mut tried)
        .map(|path| ResolveReturn::new(path, None))
    } else {
      self.load_from_module_directories(dir, specifier, &mut tried)?
    };

    resolved.ok_or_else(|| ResolveError::NotFound {
      specifier: specifier.to_string(),
      base: dir.to_path_buf(),
      tried,
    })
  }

  /// Tries the request as written when it already has an extension, then every configured
  /// extension appended in order.
  fn load_as_file(&self, request: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    let exact = request.has_extension().then(|| request.to_path_buf());
    let candidates = exact
      .into_iter()
      .chain(self.options.extensions.iter().map(|ext| append_suffix(request, ext)))
      .unique();

    for candidate in candidates {
      let is_file = self.fs.is_file(&candidate);
      trace!(candidate = %candidate.display(), is_file, "candidate");
      tried.push(candidate);
      if is_file {
        return tried.last().cloned();
      }
    }
    None
  }

  fn load_index(&self, dir: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    if self.fs.is_dir(dir) {
      self.load_as_file(&dir.join("index"), tried)
    } else {
      None
    }
  }

  fn load_as_directory(
    &self,
    dir: &Path,
    tried: &mut Vec<PathBuf>,
  ) -> Result<Option<ResolveReturn>, ResolveError> {
    if !self.fs.is_dir(dir) {
      return Ok(None);
    }

    let package_json = dir.join("package.json");
    let package_json = self.fs.is_file(&package_json).then_some(package_json);

    if let Some(package_json) = &package_json {
      if let Some(main) = self.read_package_main(package_json)? {
        let main = dir.join(main).normalize();
        if let Some(path) = self.load_as_file(&main, tried).or_else(|| self.load_index(&main, tried)) {
          return Ok(Some(ResolveReturn::new(path, Some(package_json.clone()))));
        }
      }
    }

    Ok(self.load_index(dir, tried).map(|path| ResolveReturn::new(path, package_json)))
  }

  fn load_from_module_directories(
    &self,
    dir: &Path,
    specifier: &str,
    tried: &mut Vec<PathBuf>,
  ) -> Result<Option<ResolveReturn>, ResolveError> {
    let modules_directories = &self.options.modules_directories;
    let search_dirs = self
      .options
      .roots
      .iter()
      .map(|root| root.absolutize_from(&self.cwd))
      .chain(
        dir
          .ancestors()
          // `node_modules/node_modules` is never a place to look in.
          .filter(|ancestor| {
            ancestor
              .file_name()
              .and_then(|name| name.to_str())
              .map_or(true, |name| !modules_directories.iter().any(|dir| dir == name))
          })
          .flat_map(|ancestor| modules_directories.iter().map(move |name| ancestor.join(name))),
      )
      .collect_vec();

    for search_dir in search_dirs {
      if !self.fs.is_dir(&search_dir) {
        continue;
      }
      let request = search_dir.join(specifier).normalize();
      if let Some(path) = self.load_as_file(&request, tried) {
        return Ok(Some(ResolveReturn::new(path, None)));
      }
      if let Some(resolved) = self.load_as_directory(&request, tried)? {
        return Ok(Some(resolved));
      }
    }
    Ok(None)
  }

  fn read_package_main(&self, package_json: &Path) -> Result<Option<String>, ResolveError> {
    let invalid = |message: String| ResolveError::PackageJson { path: package_json.to_path_buf(), message };

    let content = self.fs.read_to_string(package_json).map_err(|err| invalid(err.to_string()))?;
    let value: serde_json::Value =
      serde_json::from_str(&content).map_err(|err| invalid(err.to_string()))?;

    Ok(
      PACKAGE_MAIN_FIELDS
        .iter()
        .find_map(|field| {
          value.get(field).and_then(serde_json::Value::as_str).filter(|main| !main.is_empty())
        })
        .map(ToString::to_string),
    )
  }
}

fn is_path_like(specifier: &str) -> bool {
  matches!(specifier, "." | "..")
    || specifier.starts_with("./")
    || specifier.starts_with("../")
    || specifier.starts_with('/')
    || Path::new(specifier).is_absolute()
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
  let mut path: OsString = path.as_os_str().to_owned();
  path.push(suffix);
  path.into()
}

#[cfg(test)]
fn resolver(extensions: &[&str], files: &[&str]) -> Resolver<packconf_fs::MemoryFileSystem> {
  resolver_with_content(extensions, &files.iter().map(|path| (*path, "")).collect_vec())
}

#[cfg(test)]
fn resolver_with_content(
  extensions: &[&str],
  files: &[(&str, &str)],
) -> Resolver<packconf_fs::MemoryFileSystem> {
  let fs = packconf_fs::MemoryFileSystem::new(files.iter().copied());
  let options = ResolveOptions {
    extensions: extensions.iter().map(ToString::to_string).collect(),
    ..ResolveOptions::default()
  };
  Resolver::new(options, PathBuf::from("/app"), fs)
}

#[test]
fn test_extensions_are_tried_in_order() {
  let resolver = resolver(
    &[".webpack.js", ".web.js", ".ts", ".js"],
    &["/app/src/main.ts", "/app/src/util.ts", "/app/src/util.js", "/app/src/dom.web.js", "/app/src/dom.js"],
  );
  let importer = Path::new("/app/src/main.ts");

  assert_eq!(resolver.resolve(Some(importer), "./util").unwrap().path, "/app/src/util.ts");
  assert_eq!(resolver.resolve(Some(importer), "./dom").unwrap().path, "/app/src/dom.web.js");
  assert_eq!(resolver.resolve(None, "./src/main").unwrap().path, "/app/src/main.ts");
  assert_eq!(resolver.resolve(Some(importer), "../src/util").unwrap().path, "/app/src/util.ts");
}

#[test]
fn test_extensionless_request_requires_matching_extension() {
  let resolver = resolver(&[".ts", ".js"], &["/app/src/main.ts", "/app/src/LICENSE", "/app/src/style.css"]);
  let importer = Path::new("/app/src/main.ts");

  let err = resolver.resolve(Some(importer), "./LICENSE").unwrap_err();
  assert_eq!(err.tried(), [Path::new("/app/src/LICENSE.ts"), Path::new("/app/src/LICENSE.js")]);
  assert!(err.to_string().starts_with("Cannot resolve \"./LICENSE\" from \"/app/src\""));

  assert!(resolver.resolve(Some(importer), "./style").is_err());
  // Requests that already carry an extension are tried as written first.
  assert_eq!(resolver.resolve(Some(importer), "./style.css").unwrap().path, "/app/src/style.css");
}

#[test]
fn test_empty_string_extension_means_exact_path() {
  let resolver = resolver(&["", ".js"], &["/app/src/LICENSE", "/app/src/a.js"]);
  assert_eq!(resolver.resolve(None, "./src/LICENSE").unwrap().path, "/app/src/LICENSE");
  assert_eq!(resolver.resolve(None, "./src/a").unwrap().path, "/app/src/a.js");
}

#[test]
fn test_empty_extensions() {
  let resolver = resolver(&[], &["/app/src/a.js"]);
  assert!(matches!(
    resolver.resolve(None, "./src/a"),
    Err(ResolveError::EmptyExtensions { specifier }) if specifier == "./src/a"
  ));
  assert_eq!(resolver.resolve(None, "./src/a.js").unwrap().path, "/app/src/a.js");
}

#[test]
fn test_directories_are_not_files() {
  let resolver = resolver(&["", ".js"], &["/app/src/lib/index.js"]);
  assert!(resolver.resolve(None, "./src/lib").is_err());
}

#[test]
fn test_bare_specifiers_search_modules_directories() {
  let resolver = resolver_with_content(
    &["", ".js"],
    &[
      ("/app/node_modules/left-pad/package.json", r#"{ "main": "./lib/pad" }"#),
      ("/app/node_modules/left-pad/lib/pad.js", ""),
      ("/app/node_modules/lodash/index.js", ""),
      ("/app/node_modules/lodash/fp.js", ""),
      ("/app/web_modules/lodash/index.js", ""),
      ("/app/src/deep/main.js", ""),
    ],
  );
  let importer = Path::new("/app/src/deep/main.js");

  let left_pad = resolver.resolve(Some(importer), "left-pad").unwrap();
  assert_eq!(left_pad.path, "/app/node_modules/left-pad/lib/pad.js");
  assert_eq!(left_pad.package_json.as_deref(), Some(Path::new("/app/node_modules/left-pad/package.json")));

  // `web_modules` comes before `node_modules`.
  assert_eq!(resolver.resolve(Some(importer), "lodash").unwrap().path, "/app/web_modules/lodash/index.js");
  assert_eq!(resolver.resolve(Some(importer), "lodash/fp").unwrap().path, "/app/node_modules/lodash/fp.js");
  assert!(matches!(resolver.resolve(Some(importer), "missing"), Err(ResolveError::NotFound { .. })));
}

#[test]
fn test_bare_specifiers_with_an_extension() {
  let resolver = resolver_with_content(
    &[".webpack.js", ".web.js", ".js"],
    &[
      ("/app/node_modules/jquery/package.json", r#"{ "main": "dist/jquery" }"#),
      ("/app/node_modules/jquery/dist/jquery.js", ""),
      ("/app/node_modules/jquery/dist/jquery.min.js", ""),
    ],
  );

  let exact = resolver.resolve(None, "jquery/dist/jquery.js").unwrap();
  assert_eq!(exact.path, "/app/node_modules/jquery/dist/jquery.js");
  assert_eq!(exact.absolute_path, Path::new("/app/node_modules/jquery/dist/jquery.js"));
  assert_eq!(exact.package_json, None);

  // `jquery.min` carries an extension, the configured ones are still appended after it.
  assert_eq!(
    resolver.resolve(None, "jquery/dist/jquery.min").unwrap().path,
    "/app/node_modules/jquery/dist/jquery.min.js"
  );
}

#[test]
fn test_package_main_falls_back_to_its_index() {
  let resolver = resolver_with_content(
    &["", ".js"],
    &[
      ("/app/node_modules/ui/package.json", r#"{ "main": "./lib", "browser": "" }"#),
      ("/app/node_modules/ui/lib/index.js", ""),
      ("/app/node_modules/ui/index.js", ""),
    ],
  );

  let resolved = resolver.resolve(None, "ui").unwrap();
  assert_eq!(resolved.path, "/app/node_modules/ui/lib/index.js");
  assert_eq!(resolved.package_json.as_deref(), Some(Path::new("/app/node_modules/ui/package.json")));
}

#[test]
fn test_roots_are_searched_first() {
  let fs = packconf_fs::MemoryFileSystem::new([
    ("/app/shared/config.js", ""),
    ("/app/node_modules/config/index.js", ""),
  ]);
  let options =
    ResolveOptions { roots: vec![PathBuf::from("shared")], ..ResolveOptions::default() };
  let resolver = Resolver::new(options, PathBuf::from("/app"), fs);
  assert_eq!(resolver.resolve(None, "config").unwrap().path, "/app/shared/config.js");
}

#[test]
fn test_invalid_package_json() {
  let resolver = resolver_with_content(&[".js"], &[("/app/node_modules/broken/package.json", "{ main: ")]);
  assert!(matches!(resolver.resolve(None, "broken"), Err(ResolveError::PackageJson { .. })));
}

#[test]
fn test_results_are_cached() {
  let resolver = resolver(&[".ts", ".js"], &["/app/a.js"]);
  assert_eq!(resolver.resolve(None, "./a").unwrap().path, "/app/a.js");
  resolver.fs().add_file(Path::new("/app/a.ts"), "").unwrap();
  assert_eq!(resolver.resolve(None, "./a").unwrap().path, "/app/a.js");
  assert_eq!(resolver.cache.len(), 1);
}
