use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use itertools::Itertools;
use tracing::warn;

use packconf_common::NormalizedBuildConfiguration;
use packconf_fs::FileSystem;
use packconf_resolver::Resolver;

/// Checks what normalization cannot: the output location, the extension list and that the entry
/// resolves to a readable file. Returns the resolved entry when it does.
pub fn validate_options<F: FileSystem>(
  options: &NormalizedBuildConfiguration,
  resolver: &Resolver<F>,
  errors: &mut Vec<anyhow::Error>,
) -> Option<PathBuf> {
  let filename = &options.output.filename;
  if filename.is_empty() {
    errors.push(anyhow!("`output.filename` must not be empty"));
  } else if Path::new(filename).is_absolute() {
    errors.push(anyhow!("`output.filename` must be relative to `output.path`, got \"{filename}\""));
  }

  let extensions = &options.resolve.extensions;
  if extensions.is_empty() {
    errors.push(anyhow!(
      "`resolve.extensions` must not be empty, requests without an extension would never resolve"
    ));
  }
  for extension in extensions.iter().filter(|ext| !ext.is_empty() && !ext.starts_with('.')) {
    warn!(%extension, "`resolve.extensions` entry does not start with a dot");
  }
  for extension in extensions.iter().duplicates() {
    warn!(%extension, "`resolve.extensions` lists the same extension more than once");
  }

  let request = &options.entry.request;
  if request.is_empty() {
    return None;
  }

  let entry = resolver
    .resolve(None, request)
    .with_context(|| format!("Entry module \"{request}\" could not be resolved"));
  let entry = match entry {
    Ok(resolved) => resolved.absolute_path,
    Err(err) => {
      errors.push(err);
      return None;
    }
  };

  // Only readability matters here, the entry may use any encoding.
  match resolver.fs().read(&entry) {
    Ok(_) => Some(entry),
    Err(err) => {
      errors.push(anyhow!("Entry module {} is not readable: {err}", entry.display()));
      None
    }
  }
}
