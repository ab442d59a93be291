use std::path::{Path, PathBuf};

use sugar_path::SugarPath;

pub trait PathExt {
  /// Forward-slash form of the path. Loader rules and error messages always see this form.
  fn to_slash_string(&self) -> String;

  /// Resolves `self` against `base` unless it is already absolute, then normalizes `.` and `..`.
  fn absolutize_from(&self, base: &Path) -> PathBuf;

  /// Slash path relative to `cwd`, used when printing paths back to the user.
  fn stabilize(&self, cwd: &Path) -> String;

  /// Whether the last component carries an extension, e.g. `main.ts` or `jquery.min`.
  fn has_extension(&self) -> bool;
}

impl PathExt for Path {
  fn to_slash_string(&self) -> String {
    self.to_slash_lossy().into_owned()
  }

  fn absolutize_from(&self, base: &Path) -> PathBuf {
    if self.is_absolute() {
      self.normalize()
    } else {
      base.join(self).normalize()
    }
  }

  fn stabilize(&self, cwd: &Path) -> String {
    if self.is_absolute() {
      self.relative(cwd).to_slash_string()
    } else {
      self.to_slash_string()
    }
  }

  fn has_extension(&self) -> bool {
    self.extension().is_some_and(|ext| !ext.is_empty())
  }
}

#[test]
fn test_absolutize_from() {
  let base = Path::new("/project/config");
  assert_eq!(Path::new("./src/main.ts").absolutize_from(base), Path::new("/project/config/src/main.ts"));
  assert_eq!(Path::new("../dist").absolutize_from(base), Path::new("/project/dist"));
  assert_eq!(Path::new("/abs/./file.js").absolutize_from(base), Path::new("/abs/file.js"));
}

#[test]
fn test_stabilize() {
  let cwd = Path::new("/project");
  assert_eq!(Path::new("/project/src/main.ts").stabilize(cwd), "src/main.ts");
  assert_eq!(Path::new("src/main.ts").stabilize(cwd), "src/main.ts");
  assert_eq!(Path::new("/other/main.ts").stabilize(cwd), "../other/main.ts");
}

#[test]
fn test_has_extension() {
  assert!(Path::new("./src/main.ts").has_extension());
  assert!(Path::new("jquery.min").has_extension());
  assert!(!Path::new("./src/main").has_extension());
  assert!(!Path::new("./src/.hidden").has_extension());
}
