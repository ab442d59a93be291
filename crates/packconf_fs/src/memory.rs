use std::{
  io::{self, Read, Write},
  path::{Path, PathBuf},
  sync::Arc,
};

use sugar_path::SugarPath;
use vfs::{FileSystem as _, MemoryFS, VfsFileType};

use crate::file_system::FileSystem;

/// In-memory file system backed by `vfs::MemoryFS`. Paths are absolute, `/`-separated.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
  inner: Arc<MemoryFS>,
}

impl Default for MemoryFileSystem {
  fn default() -> Self {
    Self { inner: Arc::new(MemoryFS::new()) }
  }
}

impl MemoryFileSystem {
  pub fn new<P: AsRef<Path>, C: AsRef<str>>(files: impl IntoIterator<Item = (P, C)>) -> Self {
    let fs = Self::default();
    for (path, content) in files {
      fs.add_file(path.as_ref(), content.as_ref())
        .unwrap_or_else(|err| panic!("Failed to add {:?} to memory fs: {err}", path.as_ref()));
    }
    fs
  }

  /// Writes `content` to `path`, creating missing parent directories.
  pub fn add_file(&self, path: &Path, content: &str) -> io::Result<()> {
    self.add_file_bytes(path, content.as_bytes())
  }

  pub fn add_file_bytes(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    let path = vfs_path(path);
    let mut parent = String::new();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if let Some((_, dirs)) = segments.split_last() {
      for dir in dirs {
        parent.push('/');
        parent.push_str(dir);
        if !self.inner.exists(&parent).map_err(to_io_error)? {
          self.inner.create_dir(&parent).map_err(to_io_error)?;
        }
      }
    }
    let mut file = self.inner.create_file(&path).map_err(to_io_error)?;
    file.write_all(content)?;
    file.flush()
  }

  fn file_type(&self, path: &Path) -> Option<VfsFileType> {
    self.inner.metadata(&vfs_path(path)).ok().map(|metadata| metadata.file_type)
  }
}

impl FileSystem for MemoryFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    if !self.is_file(path) {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
      ));
    }
    let mut file = self.inner.open_file(&vfs_path(path)).map_err(to_io_error)?;
    let mut content = vec![];
    file.read_to_end(&mut content)?;
    Ok(content)
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    String::from_utf8(self.read(path)?)
      .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
  }

  fn is_file(&self, path: &Path) -> bool {
    matches!(self.file_type(path), Some(VfsFileType::File))
  }

  fn is_dir(&self, path: &Path) -> bool {
    matches!(self.file_type(path), Some(VfsFileType::Directory))
  }

  fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
    let normalized = path.normalize();
    if self.file_type(&normalized).is_some() {
      Ok(normalized)
    } else {
      Err(io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", path.display())))
    }
  }
}

/// `MemoryFS` keys files as `/a/b` with the root being the empty string.
fn vfs_path(path: &Path) -> String {
  let slash = path.normalize().to_slash_lossy().into_owned();
  let trimmed = slash.trim_end_matches('/');
  if trimmed.is_empty() {
    String::new()
  } else if trimmed.starts_with('/') {
    trimmed.to_string()
  } else {
    format!("/{trimmed}")
  }
}

fn to_io_error(err: vfs::VfsError) -> io::Error {
  io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[test]
fn test_memory_file_system() {
  let fs = MemoryFileSystem::new([
    ("/project/src/main.ts", "import './util';"),
    ("/project/src/util.js", "export {};"),
  ]);

  assert!(fs.is_file(Path::new("/project/src/main.ts")));
  assert!(fs.is_dir(Path::new("/project/src")));
  assert!(!fs.is_file(Path::new("/project/src")));
  assert!(!fs.is_file(Path::new("/project/src/missing.js")));
  assert_eq!(fs.read_to_string(Path::new("/project/src/util.js")).unwrap(), "export {};");
  assert_eq!(
    fs.read_to_string(Path::new("/project/src/missing.js")).unwrap_err().kind(),
    io::ErrorKind::NotFound
  );
  fs.add_file_bytes(Path::new("/project/src/latin1.js"), b"// caf\xe9").unwrap();
  assert_eq!(fs.read(Path::new("/project/src/latin1.js")).unwrap(), b"// caf\xe9");
  assert_eq!(
    fs.read_to_string(Path::new("/project/src/latin1.js")).unwrap_err().kind(),
    io::ErrorKind::InvalidData
  );
  assert_eq!(
    fs.canonicalize(Path::new("/project/src/../src/main.ts")).unwrap(),
    Path::new("/project/src/main.ts")
  );
}
