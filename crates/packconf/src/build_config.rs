use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context;
use tracing::debug;

use packconf_common::{BuildConfiguration, LoaderRule, NormalizedBuildConfiguration};
use packconf_error::{BuildError, BuildResult};
use packconf_fs::{FileSystem, OsFileSystem};
use packconf_resolver::{ResolveError, ResolveReturn, Resolver};
use packconf_utils::path_ext::PathExt;

use crate::{
  utils::{
    load_config::{load_config, locate_config},
    normalize_options::{normalize_options, NormalizeOptionsReturn},
    validate_options::validate_options,
  },
  SharedOptions, SharedResolver,
};

/// A loaded, normalized and validated build configuration.
///
/// Construction fails with every problem found at once, so a build never starts from a
/// configuration that names a missing entry, an invalid loader pattern or an unknown devtool.
pub struct BuildConfig<F: FileSystem = OsFileSystem> {
  options: SharedOptions,
  resolver: SharedResolver<F>,
  entry_path: PathBuf,
}

impl BuildConfig<OsFileSystem> {
  pub fn from_path(path: impl AsRef<Path>) -> BuildResult<Self> {
    Self::from_path_with_fs(OsFileSystem, path.as_ref(), &current_dir()?)
  }

  /// Loads the first of [`crate::CONFIG_FILE_NAMES`] found in `dir`.
  pub fn discover(dir: impl AsRef<Path>) -> BuildResult<Self> {
    let dir = dir.as_ref().absolutize_from(&current_dir()?);
    let path = locate_config(&OsFileSystem, &dir)?;
    Self::from_path_with_fs(OsFileSystem, &path, &dir)
  }

  pub fn new(raw_options: BuildConfiguration, config_path: Option<&Path>) -> BuildResult<Self> {
    Self::with_fs(OsFileSystem, raw_options, config_path, &current_dir()?)
  }
}

impl<F: FileSystem> BuildConfig<F> {
  pub fn from_path_with_fs(fs: F, path: &Path, cwd: &Path) -> BuildResult<Self> {
    let path = path.absolutize_from(cwd);
    let raw_options = load_config(&fs, &path)?;
    Self::with_fs(fs, raw_options, Some(&path), cwd)
  }

  /// `config_path` anchors the default context. It is canonicalized when it exists, so a config
  /// reached through a symlink resolves the entry next to the real file.
  pub fn with_fs(
    fs: F,
    raw_options: BuildConfiguration,
    config_path: Option<&Path>,
    cwd: &Path,
  ) -> BuildResult<Self> {
    let config_path = config_path.map(|path| {
      let path = path.absolutize_from(cwd);
      fs.canonicalize(&path).unwrap_or(path)
    });
    let NormalizeOptionsReturn { options, mut errors } =
      normalize_options(raw_options, config_path.as_deref(), cwd);

    let resolver = Resolver::new(options.resolve.clone(), options.context.clone(), fs);
    let entry_path = validate_options(&options, &resolver, &mut errors);

    let Some(entry_path) = entry_path.filter(|_| errors.is_empty()) else {
      return Err(BuildError::from(errors));
    };

    debug!(
      entry = %entry_path.display(),
      output = %options.output.bundle_path().display(),
      rules = options.module_rules.len(),
      "configuration loaded"
    );

    Ok(Self { options: Arc::new(options), resolver: Arc::new(resolver), entry_path })
  }

  pub fn options(&self) -> &NormalizedBuildConfiguration {
    &self.options
  }

  pub fn resolver(&self) -> &Resolver<F> {
    &self.resolver
  }

  pub fn context(&self) -> &Path {
    &self.options.context
  }

  /// The file the entry request resolved to.
  pub fn entry_path(&self) -> &Path {
    &self.entry_path
  }

  pub fn resolve(
    &self,
    importer: Option<&Path>,
    specifier: &str,
  ) -> Result<ResolveReturn, ResolveError> {
    self.resolver.resolve(importer, specifier)
  }

  /// The first loader rule matching `path`. Relative paths are taken from the context.
  pub fn loaders_for(&self, path: impl AsRef<Path>) -> Option<&LoaderRule> {
    let path = path.as_ref().absolutize_from(&self.options.context);
    self.options.module_rules.match_path(&path)
  }

  pub fn output_file(&self) -> PathBuf {
    self.options.output.bundle_path()
  }

  pub fn sourcemap_file(&self) -> Option<PathBuf> {
    self.options.sourcemap_path()
  }

  pub fn source_mapping_url(&self) -> Option<String> {
    self.options.source_mapping_url()
  }
}

impl<F: FileSystem> Clone for BuildConfig<F> {
  fn clone(&self) -> Self {
    Self {
      options: Arc::clone(&self.options),
      resolver: Arc::clone(&self.resolver),
      entry_path: self.entry_path.clone(),
    }
  }
}

fn current_dir() -> BuildResult<PathBuf> {
  Ok(std::env::current_dir().context("Failed to get current dir")?)
}
