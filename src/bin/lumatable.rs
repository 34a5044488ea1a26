//! lumatable - interactive shell for LumaDB tables
//!
//! Reads commands from stdin (or `--execute`) and runs them against the
//! database snapshots under the configured data directory.

#![forbid(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use luma_table::{Config, Outcome, Shell};

#[derive(Parser)]
#[command(name = "lumatable")]
#[command(author, version, about = "LumaDB embedded table shell", long_about = None)]
struct Cli {
    /// Configuration file path (TOML or JSON)
    #[arg(short, long, default_value = "lumatable.toml", env = "LUMA_CONFIG")]
    config: PathBuf,

    /// Directory holding database snapshots
    #[arg(short, long, env = "LUMA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Cached query results per table
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Run a command and exit; may be repeated
    #[arg(short, long = "execute")]
    execute: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(capacity) = cli.cache_capacity {
        config.cache_capacity = capacity;
    }
    config.validate()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    info!(data_dir = %config.data_dir.display(), "starting lumatable");

    let mut shell = Shell::new(config);

    if !cli.execute.is_empty() {
        for command in &cli.execute {
            match shell.execute(command)? {
                Outcome::Continue(output) => print_output(&output),
                Outcome::Exit => break,
            }
        }
        return Ok(());
    }

    println!("LumaDB table shell. Type 'help' for available commands.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", shell.prompt());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        match shell.execute(&line?) {
            Ok(Outcome::Continue(output)) => print_output(&output),
            Ok(Outcome::Exit) => break,
            Err(e) => println!("Error: {}", e),
        }
    }

    info!("goodbye");
    Ok(())
}

fn print_output(output: &str) {
    if !output.is_empty() {
        println!("{}", output);
    }
}
