use std::{
  fmt::{self, Display},
  ops::{Deref, DerefMut},
};

/// Every diagnostic collected while loading, normalizing or validating a configuration.
#[derive(Debug, Default)]
pub struct BuildError(pub Vec<anyhow::Error>);

impl BuildError {
  pub fn new() -> Self {
    Self(Vec::new())
  }

  /// `Ok(value)` if nothing was collected, otherwise `Err(self)`.
  pub fn into_result<T>(self, value: T) -> BuildResult<T> {
    if self.0.is_empty() {
      Ok(value)
    } else {
      Err(self)
    }
  }
}

impl Deref for BuildError {
  type Target = Vec<anyhow::Error>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl DerefMut for BuildError {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.0
  }
}

impl Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, error) in self.0.iter().enumerate() {
      if idx > 0 {
        writeln!(f)?;
      }
      write!(f, "{error:#}")?;
    }
    Ok(())
  }
}

impl std::error::Error for BuildError {}

impl From<anyhow::Error> for BuildError {
  fn from(error: anyhow::Error) -> Self {
    Self(vec![error])
  }
}

impl From<Vec<anyhow::Error>> for BuildError {
  fn from(errors: Vec<anyhow::Error>) -> Self {
    Self(errors)
  }
}

pub type BuildResult<T> = anyhow::Result<T, BuildError>;

#[test]
fn test_into_result() {
  assert_eq!(BuildError::new().into_result(1).unwrap(), 1);

  let mut errors = BuildError::new();
  errors.push(anyhow::anyhow!("first"));
  errors.push(anyhow::anyhow!("second"));
  let err = errors.into_result(()).unwrap_err();
  assert_eq!(err.len(), 2);
  assert_eq!(err.to_string(), "first\nsecond");
}
