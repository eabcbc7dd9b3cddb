// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio command line.
//
// Entry point. Initialises logging, loads the config, runs one tool over the
// given files and writes the results to the output directory.
//
//   folio merge a.pdf b.pdf -o out/
//   folio rotate-pdf scan.pdf --option rotation=90 --option rotateMode=specific --option pages=2,4
//   folio tools

mod files;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use folio_core::error::Result;
use folio_core::human_errors::humanize_error;
use folio_tools::{Category, Dispatcher, ToolId};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Run PDF tools over local files")]
struct Args {
    /// Tool identifier (for example `merge` or `pdf-to-png`), or `tools` to
    /// list the catalog.
    tool: String,

    /// Input files, in order.
    inputs: Vec<PathBuf>,

    /// Directory the results are written to.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Tool option as `key=value`. Values that parse as JSON are used as JSON.
    #[arg(long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,

    /// JSON object of tool options, applied before `--option`.
    #[arg(long, value_name = "FILE")]
    options_json: Option<PathBuf>,

    /// JSON config file. Defaults are used when it is absent.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.tool == "tools" {
        print_catalog();
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(written) => {
            for path in written {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, tool = %args.tool, "Tool failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<Vec<PathBuf>> {
    let config = files::load_config(args.config.as_deref());
    let options = files::collect_options(args.options_json.as_deref(), &args.options)?;
    let inputs = files::read_inputs(&args.inputs)?;

    tracing::info!(tool = %args.tool, inputs = inputs.len(), "Folio starting");
    let outputs = Dispatcher::new(config).dispatch(&args.tool, &inputs, &options)?;
    files::write_outputs(&args.output, &outputs)
}

fn print_catalog() {
    for category in Category::ALL {
        println!("{}", category.label());
        for tool in ToolId::in_category(category) {
            println!("  {:<22} {}", tool.id(), tool.name());
        }
    }
}
