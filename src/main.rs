//! taskcrew command line entry point
//!
//! `run` resolves credentials, downloads reference documents, assembles the
//! crew, asks for any missing inputs and prints the final result to stdout.
//! `validate` checks a crew file without touching the network.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use taskcrew::config::{ConfigError, CrewConfig};
use taskcrew::credentials::Credentials;
use taskcrew::download::DocumentFetcher;
use taskcrew::error::{CrewError, CrewResult};
use taskcrew::observability::init_default_logging;
use taskcrew::pipeline::CrewBuilder;
use taskcrew::task::RunInputs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["crew.toml", "config/crew.toml"];
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Run multi-agent task pipelines described in TOML crew files
#[derive(Parser)]
#[command(name = "taskcrew")]
#[command(about = "Run multi-agent task pipelines described in TOML crew files")]
#[command(version)]
struct Cli {
    /// Crew file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crew once and print the final task's output
    Run {
        /// Run input as name=value; prompted for when absent
        #[arg(short, long = "input", value_name = "NAME=VALUE", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },
    /// Validate the crew file
    Validate {
        /// Print the parsed configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    let result = match load_configuration(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Run { inputs } => run_crew(config, inputs).await,
            Commands::Validate { show } => validate_crew(&config, show),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.console_message());
        process::exit(e.exit_code());
    }
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("input name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn load_configuration(config_path: Option<&Path>) -> CrewResult<CrewConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .ok_or_else(|| {
                ConfigError::InvalidConfig(
                    "no crew file found; pass one with -c/--config or create crew.toml".to_string(),
                )
            })?,
    };

    info!(path = %path.display(), "Loading crew configuration");
    Ok(CrewConfig::load_from_file(&path)?)
}

async fn run_crew(config: CrewConfig, given: Vec<(String, String)>) -> CrewResult<()> {
    info!(crew = %config.crew.name, "Starting crew");

    let credentials = Credentials::from_env(config.required_env_vars())?;

    if !config.documents.is_empty() {
        let fetcher = DocumentFetcher::new(DOWNLOAD_TIMEOUT)?;
        fetcher.fetch_all(&config.documents).await?;
    }

    let pipeline = CrewBuilder::new(&config, &credentials).build()?;
    let inputs = collect_inputs(&config.crew.inputs, given).await?;

    let output = pipeline.kickoff(&inputs).await?;
    println!("{output}");
    Ok(())
}

/// Inputs from the command line, prompting on the console for the rest
async fn collect_inputs(
    declared: &BTreeMap<String, String>,
    given: Vec<(String, String)>,
) -> CrewResult<RunInputs> {
    let mut inputs: RunInputs = given.into_iter().collect();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stderr = tokio::io::stderr();

    for (name, prompt) in declared {
        if inputs.contains_key(name) {
            continue;
        }
        let prompt = if prompt.trim().is_empty() {
            format!("Enter {name}")
        } else {
            prompt.trim_end_matches(&[':', ' '][..]).to_string()
        };
        let read = async {
            stderr.write_all(format!("{prompt}: ").as_bytes()).await?;
            stderr.flush().await?;
            stdin.next_line().await
        };
        let line = read.await.map_err(|e| {
            CrewError::Config(ConfigError::InvalidConfig(format!(
                "failed to read input '{name}': {e}"
            )))
        })?;
        inputs.insert(name.clone(), line.unwrap_or_default().trim().to_string());
    }

    Ok(inputs)
}

fn validate_crew(config: &CrewConfig, show: bool) -> CrewResult<()> {
    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::InvalidConfig(format!("cannot render configuration: {e}")))?;
        println!("{rendered}");
    }

    println!(
        "Crew '{}' is valid: {} agents, {} tasks, process {:?}",
        config.crew.name,
        config.agents.len(),
        config.tasks.len(),
        config.crew.process
    );
    for name in config.required_env_vars() {
        let state = match std::env::var(&name) {
            Ok(value) if !value.trim().is_empty() => "set",
            _ => "MISSING",
        };
        println!("  {name}: {state}");
    }

    info!("Configuration validation complete");
    Ok(())
}
