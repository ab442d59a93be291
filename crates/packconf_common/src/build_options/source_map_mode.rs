use std::{fmt::Display, path::Path, str::FromStr};

use serde::{Serialize, Serializer};

bitflags::bitflags! {
  /// How debug-mapping metadata is produced and attached to the bundle (`devtool`).
  ///
  /// A devtool name is a `-` separated set of these parts in any order, e.g.
  /// `cheap-module-inline-source-map` and `inline-cheap-module-source-map` are the same mode.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct SourceMapMode: u8 {
    /// Each module is wrapped in `eval`. Without `SOURCE_MAP` only a `//# sourceURL` is added.
    const EVAL = 1;
    const SOURCE_MAP = 1 << 1;
    /// The map is appended to the bundle as a data URL.
    const INLINE = 1 << 2;
    /// The map file is written but not referenced from the bundle.
    const HIDDEN = 1 << 3;
    /// Line-only mappings, no column information.
    const CHEAP = 1 << 4;
    /// Mappings go back through loader output to the original source.
    const MODULE = 1 << 5;
    /// The map carries no `sourcesContent`.
    const NOSOURCES = 1 << 6;
  }
}

impl SourceMapMode {
  #[inline]
  pub fn is_eval(self) -> bool {
    self.contains(Self::EVAL)
  }

  #[inline]
  pub fn is_cheap(self) -> bool {
    self.contains(Self::CHEAP)
  }

  /// Cheap maps only include module maps when `module` is given.
  #[inline]
  pub fn includes_module_maps(self) -> bool {
    self.produces_source_map() && (!self.is_cheap() || self.contains(Self::MODULE))
  }

  #[inline]
  pub fn produces_source_map(self) -> bool {
    self.contains(Self::SOURCE_MAP)
  }

  #[inline]
  pub fn is_inline(self) -> bool {
    self.contains(Self::INLINE)
  }

  #[inline]
  pub fn is_hidden(self) -> bool {
    self.contains(Self::HIDDEN)
  }

  #[inline]
  pub fn includes_sources(self) -> bool {
    self.produces_source_map() && !self.contains(Self::NOSOURCES)
  }

  /// Whether a separate `.map` file is written next to the bundle.
  #[inline]
  pub fn emits_map_file(self) -> bool {
    self.produces_source_map() && !self.intersects(Self::EVAL | Self::INLINE)
  }

  pub fn map_filename(self, output_filename: &str) -> Option<String> {
    self.emits_map_file().then(|| format!("{output_filename}.map"))
  }

  /// The value of the trailing `//# sourceMappingURL=` comment of the bundle.
  ///
  /// Map files are referenced relative to the bundle. Inline maps yield the data URL prefix the
  /// base64 encoded map is appended to. Hidden and eval modes add no comment to the bundle.
  pub fn source_mapping_url(self, output_filename: &str) -> Option<String> {
    if self.is_inline() {
      return Some("data:application/json;charset=utf-8;base64,".to_string());
    }
    if !self.emits_map_file() || self.is_hidden() {
      return None;
    }
    let basename = Path::new(output_filename)
      .file_name()
      .map_or_else(|| output_filename.into(), |name| name.to_string_lossy());
    Some(format!("{basename}.map"))
  }
}

impl FromStr for SourceMapMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = |reason: &str| {
      format!(
        "Invalid devtool \"{s}\": {reason}. Expected `eval` or \
         `[eval-|inline-|hidden-][nosources-][cheap-[module-]]source-map`."
      )
    };

    // Legacy pragma markers: `#@source-map`, `@source-map`, `#source-map`.
    let name = s.strip_prefix("#@").or_else(|| s.strip_prefix(['#', '@'])).unwrap_or(s);

    let mut mode = Self::empty();
    let mut parts = name.split('-');
    while let Some(part) = parts.next() {
      let flag = match part {
        "eval" => Self::EVAL,
        "inline" => Self::INLINE,
        "hidden" => Self::HIDDEN,
        "cheap" => Self::CHEAP,
        "module" => Self::MODULE,
        "nosources" => Self::NOSOURCES,
        "sourcemap" => Self::SOURCE_MAP,
        "source" if parts.next() == Some("map") => Self::SOURCE_MAP,
        _ => return Err(invalid(&format!("unknown part \"{part}\""))),
      };
      if mode.contains(flag) {
        return Err(invalid(&format!("\"{part}\" is given twice")));
      }
      mode.insert(flag);
    }

    if !mode.produces_source_map() && mode != Self::EVAL {
      return Err(invalid("missing \"source-map\""));
    }
    if (mode & (Self::EVAL | Self::INLINE | Self::HIDDEN)).bits().count_ones() > 1 {
      return Err(invalid("only one of eval, inline or hidden may be used"));
    }
    Ok(mode)
  }
}

impl Display for SourceMapMode {
  /// Writes the canonical name, e.g. `eval-cheap-module-source-map`.
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if !self.produces_source_map() {
      return f.write_str("eval");
    }
    let parts = [
      (Self::EVAL, "eval-"),
      (Self::INLINE, "inline-"),
      (Self::HIDDEN, "hidden-"),
      (Self::NOSOURCES, "nosources-"),
      (Self::CHEAP, "cheap-"),
      (Self::MODULE, "module-"),
    ];
    for (flag, prefix) in parts {
      if self.contains(flag) {
        f.write_str(prefix)?;
      }
    }
    f.write_str("source-map")
  }
}

impl Serialize for SourceMapMode {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

#[cfg(test)]
fn parse(value: &str) -> SourceMapMode {
  value.parse().unwrap()
}

#[test]
fn test_parse_source_map_mode() {
  for name in [
    "eval",
    "source-map",
    "hidden-source-map",
    "inline-source-map",
    "eval-source-map",
    "cheap-source-map",
    "cheap-module-source-map",
    "nosources-source-map",
    "eval-cheap-module-source-map",
    "hidden-nosources-cheap-module-source-map",
  ] {
    assert_eq!(parse(name).to_string(), name);
  }

  assert_eq!(parse("source-map"), SourceMapMode::SOURCE_MAP);
  assert_eq!(parse("#@source-map"), SourceMapMode::SOURCE_MAP);
  assert_eq!(parse("@eval"), SourceMapMode::EVAL);
  assert_eq!(parse("#cheap-source-map"), SourceMapMode::CHEAP | SourceMapMode::SOURCE_MAP);
  assert_eq!(parse("sourcemap"), SourceMapMode::SOURCE_MAP);
}

#[test]
fn test_parts_combine_in_any_order() {
  let expected = SourceMapMode::INLINE
    | SourceMapMode::CHEAP
    | SourceMapMode::MODULE
    | SourceMapMode::SOURCE_MAP;
  assert_eq!(parse("cheap-module-inline-source-map"), expected);
  assert_eq!(parse("inline-cheap-module-source-map"), expected);
  assert_eq!(parse("cheap-module-inline-source-map").to_string(), "inline-cheap-module-source-map");
  assert_eq!(parse("cheap-module-eval-source-map").to_string(), "eval-cheap-module-source-map");
  assert_eq!(parse("source-map-cheap"), SourceMapMode::CHEAP | SourceMapMode::SOURCE_MAP);
}

#[test]
fn test_reject_invalid_devtool() {
  let err = "sourcemaps".parse::<SourceMapMode>().unwrap_err();
  assert!(err.starts_with("Invalid devtool \"sourcemaps\": unknown part \"sourcemaps\""), "{err}");
  assert!(err.contains("[eval-|inline-|hidden-]"));

  assert!("".parse::<SourceMapMode>().is_err());
  assert!("Source-Map".parse::<SourceMapMode>().is_err());
  assert!("cheap-module".parse::<SourceMapMode>().unwrap_err().contains("missing \"source-map\""));
  assert!("cheap-cheap-source-map".parse::<SourceMapMode>().unwrap_err().contains("twice"));
  assert!("source".parse::<SourceMapMode>().is_err());
  assert!("inline-hidden-source-map".parse::<SourceMapMode>().unwrap_err().contains("only one of"));
  assert!("eval-inline-source-map".parse::<SourceMapMode>().is_err());
}

#[test]
fn test_source_map_mode_properties() {
  let mode = parse("source-map");
  assert!(mode.emits_map_file() && mode.includes_sources() && mode.includes_module_maps());
  assert!(!mode.is_eval() && !mode.is_cheap() && !mode.is_inline());

  assert!(!parse("eval").produces_source_map());
  assert!(!parse("eval").includes_sources());
  assert!(parse("cheap-module-eval-source-map").is_eval());
  assert!(parse("cheap-module-eval-source-map").includes_module_maps());
  assert!(!parse("cheap-eval-source-map").includes_module_maps());
  assert!(!parse("nosources-source-map").includes_sources());
  assert!(!parse("cheap-module-inline-source-map").emits_map_file());
}

#[test]
fn test_source_mapping_url() {
  let source_map = parse("source-map");
  assert_eq!(source_map.map_filename("dist/bundle.js").as_deref(), Some("dist/bundle.js.map"));
  assert_eq!(source_map.source_mapping_url("dist/bundle.js").as_deref(), Some("bundle.js.map"));

  let hidden = parse("hidden-source-map");
  assert_eq!(hidden.source_mapping_url("dist/bundle.js"), None);
  assert_eq!(hidden.map_filename("bundle.js").as_deref(), Some("bundle.js.map"));

  let eval = parse("eval-source-map");
  assert_eq!(eval.source_mapping_url("bundle.js"), None);
  assert_eq!(eval.map_filename("bundle.js"), None);

  assert!(parse("inline-cheap-module-source-map")
    .source_mapping_url("bundle.js")
    .is_some_and(|url| url.starts_with("data:application/json")));
}
