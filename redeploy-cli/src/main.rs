//! Redeploy CLI - determines which cloud functions must be redeployed

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use redeploy_core::{analyze_changes, config, render_json, render_text};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "redeploy")]
#[command(about = "Determine which cloud functions must be redeployed for the current edits")]
#[command(version = env!("REDEPLOY_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the working tree and list affected deployable functions
    Analyze {
        /// Project root (default: current directory)
        path: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also print the changed-declaration seeds (to stderr)
        #[arg(long)]
        seeds: bool,
    },
    /// Validate or inspect the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            format,
            config: config_path,
            seeds,
        } => {
            let project_root = match path {
                Some(p) if p.is_relative() => std::env::current_dir()?.join(p),
                Some(p) => p,
                None => std::env::current_dir()?,
            };
            if !project_root.is_dir() {
                anyhow::bail!("Path is not a directory: {}", project_root.display());
            }

            let resolved = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;
            if let Some(ref config_path) = resolved.config_path {
                eprintln!("Using config: {}", config_path.display());
            }

            let outcome = analyze_changes(resolved)?;

            if seeds {
                eprintln!("Changed declarations:");
                for seed in &outcome.seeds {
                    eprintln!("  {} ({})", seed.name, seed.file.display());
                }
            }

            match format {
                OutputFormat::Text => print!("{}", render_text(&outcome.endpoints)),
                OutputFormat::Json => println!("{}", render_json(&outcome.endpoints)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(resolved) => {
                        if let Some(ref p) = resolved.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;

                println!("Configuration:");
                if let Some(ref p) = resolved.config_path {
                    println!("  Source: {}", p.display());
                } else {
                    println!("  Source: defaults (no config file found)");
                }
                println!();
                println!("Project root: {}", resolved.project_root.display());
                println!("Entrypoint: {}", resolved.entrypoint.display());
                println!("Source directories:");
                for dir in &resolved.source_dirs {
                    println!("  {}", dir.display());
                }
                println!(
                    "Include: {}",
                    if resolved.include.is_some() {
                        "custom patterns"
                    } else {
                        "all files"
                    }
                );
                println!(
                    "Exclude: {} patterns",
                    if resolved.config_path.is_some() {
                        "custom"
                    } else {
                        "default"
                    }
                );
            }
        },
    }

    Ok(())
}
