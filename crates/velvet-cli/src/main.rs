use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use velvet_lib::{
    build_velvetg_command, build_velveth_command, Pipeline, ProcessRunner, ToolConfig,
    VelvetResults, VelvetgParams, VelvethParams,
};

mod manifest;

use manifest::ManifestReporter;

#[derive(Parser)]
#[command(name = "velvet")]
#[command(version = "0.1.0")]
#[command(about = "Run the Velvet assembler (velveth + velvetg) from JSON parameters", long_about = None)]
struct Cli {
    #[command(flatten)]
    tools: ToolArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configuration file
#[derive(Args)]
struct ToolArgs {
    /// JSON tool configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Scratch directory; relative folders resolve against it
    #[arg(short, long, global = true)]
    scratch: Option<PathBuf>,

    /// velveth binary
    #[arg(long, global = true)]
    velveth_bin: Option<PathBuf>,

    /// velvetg binary
    #[arg(long, global = true)]
    velvetg_bin: Option<PathBuf>,

    /// Maximum k-mer length of the installed build
    #[arg(long, global = true)]
    max_kmer_length: Option<u32>,

    /// Time budget per phase in seconds
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash reads into a k-mer index
    Velveth {
        /// velveth parameters (JSON)
        #[arg(short, long)]
        params: PathBuf,
    },

    /// Build the assembly graph from an existing index
    Velvetg {
        /// velvetg parameters (JSON)
        #[arg(short, long)]
        params: PathBuf,
    },

    /// Run velveth then velvetg
    Run {
        /// velveth parameters (JSON)
        #[arg(long)]
        velveth: PathBuf,

        /// velvetg parameters (JSON)
        #[arg(long)]
        velvetg: PathBuf,
    },

    /// Print the command lines without running them
    Command {
        /// velveth parameters (JSON)
        #[arg(long)]
        velveth: Option<PathBuf>,

        /// velvetg parameters (JSON)
        #[arg(long)]
        velvetg: Option<PathBuf>,
    },

    /// Show version and configuration
    Status,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.tools)?;

    match cli.command {
        Commands::Velveth { params } => {
            let params: VelvethParams = read_params(&params)?;
            let results = pipeline(config)?.run_velveth(&params)?;
            print_results(&results);
        }
        Commands::Velvetg { params } => {
            let params: VelvetgParams = read_params(&params)?;
            let results = pipeline(config)?.run_velvetg(&params)?;
            print_results(&results);
        }
        Commands::Run { velveth, velvetg } => {
            let velveth: VelvethParams = read_params(&velveth)?;
            let velvetg: VelvetgParams = read_params(&velvetg)?;
            let results = pipeline(config)?.run(&velveth, &velvetg)?;
            print_results(&results);
        }
        Commands::Command { velveth, velvetg } => {
            command_command(&config, velveth.as_deref(), velvetg.as_deref())?;
        }
        Commands::Status => status_command(&config),
    }

    Ok(())
}

/// Merge the configuration file (if any) with command-line overrides
fn load_config(args: &ToolArgs) -> anyhow::Result<ToolConfig> {
    let mut config = match &args.config {
        Some(path) => ToolConfig::from_json_file(path)?,
        None => ToolConfig::default(),
    };
    if let Some(scratch) = &args.scratch {
        config.scratch_dir = scratch.clone();
    }
    if let Some(bin) = &args.velveth_bin {
        config.velveth_binary = bin.clone();
    }
    if let Some(bin) = &args.velvetg_bin {
        config.velvetg_binary = bin.clone();
    }
    if let Some(k) = args.max_kmer_length {
        config.max_kmer_length = k;
    }
    if let Some(secs) = args.timeout {
        config.velveth_timeout_secs = Some(secs);
        config.velvetg_timeout_secs = Some(secs);
    }
    config.validate()?;
    Ok(config)
}

fn pipeline(config: ToolConfig) -> anyhow::Result<Pipeline<ProcessRunner, ManifestReporter>> {
    fs::create_dir_all(&config.scratch_dir).with_context(|| {
        format!("Failed to create scratch directory: {}", config.scratch_dir.display())
    })?;
    let runner = ProcessRunner::new(&config);
    let reporter = ManifestReporter::new(config.scratch_dir.clone());
    Ok(Pipeline::new(config, runner, reporter)?)
}

fn read_params<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameter file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse parameter file: {}", path.display()))
}

fn print_results(results: &VelvetResults) {
    println!("\nResults:");
    println!("  report_name: {}", results.report_name);
    println!("  report_ref: {}", results.report_ref);
}

/// Print the velveth and/or velvetg command lines
fn command_command(config: &ToolConfig, velveth: Option<&Path>, velvetg: Option<&Path>) -> anyhow::Result<()> {
    if velveth.is_none() && velvetg.is_none() {
        return Err(anyhow::anyhow!("Provide --velveth and/or --velvetg parameters"));
    }
    if let Some(path) = velveth {
        let params: VelvethParams = read_params(path)?;
        let plan = build_velveth_command(&params, config)?;
        info!("velveth: {} channels, hash length {}", plan.channels.len(), plan.hash_length.token());
        println!("{}", plan.command);
    }
    if let Some(path) = velvetg {
        let params: VelvetgParams = read_params(path)?;
        println!("{}", build_velvetg_command(&params, config)?);
    }
    Ok(())
}

fn status_command(config: &ToolConfig) {
    let (major, minor, patch) = velvet_lib::version();
    println!("state: OK");
    println!("version: {major}.{minor}.{patch}");
    config.print();
}
