use std::{
  io,
  path::{Path, PathBuf},
};

/// The file system a configuration is read from and resolved against.
pub trait FileSystem: Send + Sync {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn read_to_string(&self, path: &Path) -> io::Result<String>;

  fn is_file(&self, path: &Path) -> bool;

  fn is_dir(&self, path: &Path) -> bool;

  fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}
