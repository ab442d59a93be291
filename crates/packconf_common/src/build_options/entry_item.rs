use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct EntryItem {
  pub name: String,
  pub request: String,
}

impl EntryItem {
  pub const DEFAULT_NAME: &'static str = "main";
}

impl From<&str> for EntryItem {
  fn from(value: &str) -> Self {
    Self { name: Self::DEFAULT_NAME.to_string(), request: value.to_string() }
  }
}
