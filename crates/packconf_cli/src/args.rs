use std::path::PathBuf;

use clap::{Args, Subcommand};
use packconf::SourceMapMode;

#[derive(Args)]
pub struct GlobalArgs {
  /// Config file. Defaults to the first of webpack.config.js, webpack.config.json and
  /// packconf.json in the current directory.
  #[clap(long, short, global = true)]
  pub config: Option<PathBuf>,

  /// Overrides `devtool` from the config file, e.g. `cheap-module-source-map`.
  #[clap(long, global = true, value_parser = parse_devtool)]
  pub devtool: Option<SourceMapMode>,

  /// Log resolution and loading steps to stderr. `RUST_LOG` is honored otherwise.
  #[clap(long, short, global = true)]
  pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
  /// Validate the configuration and print a summary.
  Check,

  /// Resolve a request the way the bundler would.
  Resolve {
    specifier: String,

    /// The importing file. Without it the request is resolved from the context.
    #[clap(long)]
    from: Option<PathBuf>,
  },

  /// Print the loader chain applied to each path.
  Match {
    #[clap(required = true)]
    paths: Vec<PathBuf>,
  },

  /// Print the normalized configuration as JSON.
  Print,
}

fn parse_devtool(value: &str) -> Result<SourceMapMode, String> {
  value.parse()
}
