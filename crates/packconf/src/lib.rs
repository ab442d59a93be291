mod build_config;
mod utils;

use std::sync::Arc;

pub use crate::{
  build_config::BuildConfig,
  utils::{
    load_config::{find_config, load_config, locate_config, CONFIG_FILE_NAMES},
    normalize_options::{normalize_options, NormalizeOptionsReturn},
  },
};
pub use packconf_common::*;
pub use packconf_error::{BuildError, BuildResult};
pub use packconf_fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use packconf_resolver::{ResolveError, ResolveReturn, Resolver};

pub(crate) type SharedOptions = Arc<NormalizedBuildConfiguration>;
pub(crate) type SharedResolver<F> = Arc<Resolver<F>>;
