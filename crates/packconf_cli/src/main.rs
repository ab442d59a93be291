mod args;

use std::{
  path::{Path, PathBuf},
  process::ExitCode,
  time::Instant,
};

use ansi_term::Colour;
use anyhow::anyhow;
use args::{Command, GlobalArgs};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{prelude::*, EnvFilter};

use packconf::{
  load_config, locate_config, BuildConfig, BuildError, BuildResult, DevtoolConfig, OsFileSystem,
};
use packconf_utils::path_ext::PathExt;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Commands {
  #[clap(flatten)]
  global: GlobalArgs,

  #[command(subcommand)]
  command: Command,
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

fn load(global: &GlobalArgs, cwd: &Path) -> BuildResult<BuildConfig> {
  let path = match &global.config {
    Some(path) => path.absolutize_from(cwd),
    None => locate_config(&OsFileSystem, cwd)?,
  };

  debug!(config = %path.display(), "Loading config");
  let mut raw_options = load_config(&OsFileSystem, &path)?;
  if let Some(devtool) = global.devtool {
    raw_options.devtool = Some(DevtoolConfig::Name(devtool.to_string()));
  }

  BuildConfig::new(raw_options, Some(&path))
}

fn print_errors(errors: &BuildError) {
  for error in errors.iter() {
    println!("{} {:#}", Colour::Red.paint("Error:"), error);
  }
}

fn print_summary(config: &BuildConfig, cwd: &Path) {
  let options = config.options();
  let dim = Colour::White.dimmed();
  let color = Colour::Cyan;

  let extensions = options
    .resolve
    .extensions
    .iter()
    .map(|ext| if ext.is_empty() { "\"\"".to_string() } else { ext.clone() })
    .collect::<Vec<_>>()
    .join(", ");

  println!("{} {}", dim.paint("entry     "), color.paint(config.entry_path().stabilize(cwd)));
  println!("{} {}", dim.paint("output    "), color.paint(config.output_file().stabilize(cwd)));
  println!("{} {}", dim.paint("extensions"), extensions);

  if options.module_rules.is_empty() {
    println!("{} {}", dim.paint("loaders   "), dim.paint("(none)"));
  }
  for rule in options.module_rules.iter() {
    println!(
      "{} /{}/ {} {}",
      dim.paint("loaders   "),
      rule.test.as_str(),
      dim.paint("→"),
      rule.loader_request()
    );
  }

  match (options.devtool, config.sourcemap_file()) {
    (Some(devtool), Some(map)) => {
      let map = format!("({})", map.stabilize(cwd));
      println!("{} {} {}", dim.paint("devtool   "), devtool, dim.paint(map));
    }
    (Some(devtool), None) => println!("{} {}", dim.paint("devtool   "), devtool),
    (None, _) => println!("{} {}", dim.paint("devtool   "), dim.paint("(none)")),
  }
}

fn run(command: Command, config: &BuildConfig, cwd: &Path) -> ExitCode {
  match command {
    Command::Check => {
      print_summary(config, cwd);
      ExitCode::SUCCESS
    }
    Command::Resolve { specifier, from } => {
      let importer = from.map(|importer| cwd.join(importer));
      match config.resolve(importer.as_deref(), &specifier) {
        Ok(resolved) => {
          println!("{}", resolved.path);
          ExitCode::SUCCESS
        }
        Err(err) => {
          println!("{} {}", Colour::Red.paint("Error:"), err);
          ExitCode::FAILURE
        }
      }
    }
    Command::Match { paths } => {
      for path in paths {
        let label = Colour::Cyan.paint(path.display().to_string());
        match config.loaders_for(cwd.join(&path)) {
          Some(rule) => println!("{label} {}", rule.loader_request()),
          None => println!("{label} {}", Colour::White.dimmed().paint("(none)")),
        }
      }
      ExitCode::SUCCESS
    }
    Command::Print => match serde_json::to_string_pretty(config.options()) {
      Ok(json) => {
        println!("{json}");
        ExitCode::SUCCESS
      }
      Err(err) => {
        println!("{} {}", Colour::Red.paint("Error:"), err);
        ExitCode::FAILURE
      }
    },
  }
}

fn main() -> ExitCode {
  let args = Commands::parse();
  init_tracing(args.global.verbose);

  let cwd: PathBuf = match std::env::current_dir() {
    Ok(cwd) => cwd,
    Err(err) => {
      print_errors(&BuildError::from(anyhow!("Failed to get current dir: {err}")));
      return ExitCode::FAILURE;
    }
  };

  let start = Instant::now();
  let config = match load(&args.global, &cwd) {
    Ok(config) => config,
    Err(errors) => {
      print_errors(&errors);
      return ExitCode::FAILURE;
    }
  };

  let is_check = matches!(args.command, Command::Check);
  let code = run(args.command, &config, &cwd);

  if is_check {
    let elapsed = format!("{:.2} ms", start.elapsed().as_secs_f64() * 1000.0);
    println!("\n{} Checked in {}", Colour::Green.paint("✔"), Colour::White.bold().paint(elapsed));
  }
  code
}
