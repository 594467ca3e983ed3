use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use attrib_prefilter::PrefilterConfig;
use attrib_router::{route_call, CallInput, RouterConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "attrib")]
#[command(about = "Span-to-project attribution routing", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a raw transcript for junk-call signals
    Screen {
        /// Transcript text file, or "-" for stdin
        file: PathBuf,

        /// Call duration in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Route a JSON call package through the full pipeline
    Route {
        /// Call package JSON file, or "-" for stdin
        file: PathBuf,
    },
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command {
        Commands::Screen { file, duration } => {
            let transcript = read_input(&file)?;
            let report = attrib_prefilter::evaluate(
                Some(&transcript),
                duration,
                &PrefilterConfig::default(),
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Route { file } => {
            let raw = read_input(&file)?;
            let call: CallInput =
                serde_json::from_str(&raw).context("parse call package JSON")?;
            let outcome = route_call(&call, &RouterConfig::default());
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
