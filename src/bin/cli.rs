// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! polyframe-3mf CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polyframe_3mf::cli::{Reporter, Runner};
use polyframe_3mf::config::{CodecConfig, StlEncoding};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyframe-3mf")]
#[command(about = "Convert between 3MF packages and STL files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to polyframe-3mf.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert .3mf to .stl or .stl to .3mf
    Convert {
        /// Input file(s)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the converted files (defaults to next to each input)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// STL record form (binary, ascii)
        #[arg(short, long)]
        encoding: Option<StlEncoding>,

        /// Tolerate malformed references instead of failing
        #[arg(short, long)]
        lenient: bool,
    },

    /// Summarize the document in a 3MF or STL file
    Info {
        /// Input file
        input: PathBuf,

        /// Print JSON instead of the colored report
        #[arg(long)]
        json: bool,

        /// Tolerate malformed references instead of failing
        #[arg(short, long)]
        lenient: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        Reporter::report_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Convert {
            inputs,
            out_dir,
            encoding,
            lenient,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(encoding) = encoding {
                config.output_encoding = encoding;
            }
            if lenient {
                config.strict_mode = false;
            }
            convert_command(&inputs, out_dir.as_deref(), config, cli.verbose)
        }
        Commands::Info {
            input,
            json,
            lenient,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if lenient {
                config.strict_mode = false;
            }
            info_command(&input, json, config)
        }
        Commands::Version => {
            println!("polyframe-3mf v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    match path {
        Some(path) => {
            let mut config = CodecConfig::from_file(path)?;
            config.apply_env_overrides()?;
            Ok(config)
        }
        None => CodecConfig::load(),
    }
}

fn convert_command(
    inputs: &[PathBuf],
    out_dir: Option<&Path>,
    config: CodecConfig,
    verbose: bool,
) -> Result<()> {
    let runner = Runner::new(config);
    if verbose {
        Reporter::report_info(&format!(
            "strict mode: {}, STL encoding: {}",
            config.strict_mode, config.output_encoding
        ));
    }

    let mut failed = 0;
    for input in inputs {
        match runner.run_convert(input, out_dir) {
            Ok(run) => {
                if verbose || !run.summary.diagnostics.is_empty() {
                    Reporter::report_conversion(input, &run);
                } else {
                    Reporter::success(&format!(
                        "{} -> {}",
                        input.display(),
                        run.output.display()
                    ));
                }
            }
            Err(err) => {
                failed += 1;
                Reporter::report_error(&format!("{err:#}"));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} conversions failed", inputs.len());
    }
    Ok(())
}

fn info_command(input: &Path, json: bool, config: CodecConfig) -> Result<()> {
    let run = Runner::new(config).run_info(input)?;

    if json {
        let output = serde_json::json!({
            "document": run.summary,
            "diagnostics": run.diagnostics,
        });
        let text = serde_json::to_string_pretty(&output).context("Failed to serialize summary")?;
        println!("{text}");
    } else {
        Reporter::report_document(input, &run);
        if run.summary.build_items == 0 {
            Reporter::report_warning("document has no build items; nothing would be printed");
        }
    }
    Ok(())
}
