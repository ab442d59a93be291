// Module resolution driven by `resolve.extensions`, `resolve.root` and `resolve.modulesDirectories`.

pub mod error;
mod resolver;

pub use crate::{
  error::ResolveError,
  resolver::{ResolveReturn, Resolver},
};

pub use packconf_common::ResolveOptions;
