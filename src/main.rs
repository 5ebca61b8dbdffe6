use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use env_logger::Env;
use log::{debug, error, info};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use swag_convert::{convert_file, to_json};

/// Converts a Swagger 2.0 or OpenAPI 3.x document into a folder-oriented API collection export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON or YAML document to convert
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the export; printed to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Indent the JSON output
    #[arg(
        long,
        default_value_t = true,
        default_missing_value = "true",
        num_args = 0..=1,
        action = ArgAction::Set
    )]
    pretty: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Long flags also accepted with a single dash, as in `-input api.json`
const SINGLE_DASH_FLAGS: [&str; 5] = ["input", "output", "pretty", "verbose", "help"];

fn main() {
    let cli = Cli::parse_from(single_dash_long_flags(std::env::args_os()));

    // Initialize logger with appropriate verbosity level
    let env = Env::default().filter_or("RUST_LOG", if cli.verbose { "debug" } else { "info" });
    env_logger::init_from_env(env);

    let Some(input) = cli.input.clone() else {
        let _ = Cli::command().print_help();
        eprintln!();
        std::process::exit(1);
    };

    if let Err(e) = run(&cli, input) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, input: PathBuf) -> Result<()> {
    debug!("Input: {:?}", input);
    debug!("Output: {:?}", cli.output);

    let result =
        convert_file(&input).with_context(|| format!("Failed to convert {:?}", input))?;
    let json = to_json(&result, cli.pretty).context("Failed to serialize export")?;

    match &cli.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Wrote export to {:?}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Rewrites `-input`, `-pretty=false` and friends into their `--` form
fn single_dash_long_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let long = arg.to_str().and_then(|a| {
                let rest = a.strip_prefix('-').filter(|r| !r.starts_with('-'))?;
                let name = rest.split_once('=').map_or(rest, |(name, _)| name);
                SINGLE_DASH_FLAGS
                    .contains(&name)
                    .then(|| format!("--{}", rest))
            });
            long.map(OsString::from).unwrap_or(arg)
        })
        .collect()
}
