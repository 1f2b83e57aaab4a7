//! Console host for condition balancing
//!
//! Run with: condition-balancer --info participant=P01 --info age=young assign

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use condition_balancer::assignment::{AssignmentConfigBuilder, InfoField};
use condition_balancer::host::{unwrap_or_halt, ConsoleHost, Host};
use condition_balancer::{Assignment, AssignmentConfig, ClassificationInfo, GroupSize};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "condition-balancer", version, about = "Assign participants to the least used condition")]
struct Cli {
    /// JSON configuration file (flags below override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Conditions file
    #[arg(long, global = true)]
    conditions: Option<PathBuf>,

    /// Sessions file
    #[arg(long, global = true)]
    sessions: Option<PathBuf>,

    /// Delimiter of a newly created sessions file
    #[arg(long, global = true)]
    delimiter: Option<char>,

    /// Advisory group size: a number or "unbounded"
    #[arg(long, global = true)]
    group_size: Option<GroupSize>,

    /// Do not rewrite files when reading them
    #[arg(long, global = true)]
    no_normalize: bool,

    /// Wait for Enter after each message
    #[arg(long, global = true)]
    wait: bool,

    /// Classification field, repeatable: --info participant=P01 --info age=young
    #[arg(long = "info", value_name = "NAME=VALUE", global = true)]
    info: Vec<InfoField>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the condition that would be assigned, without saving
    Assign,
    /// Assign, save the session as kept, and show group counts
    Finish,
    /// Show kept sessions per factor combination
    Summary,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let info: ClassificationInfo = cli.info.into_iter().collect();
    let mut host = ConsoleHost::new(cli.wait);

    let mut assignment = unwrap_or_halt(Assignment::new(config, &info), &mut host);
    match cli.command {
        Command::Assign => {
            let fields = assignment
                .row()
                .fields()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect::<Vec<_>>()
                .join("\n");
            host.show_message(&format!("{}\n\n{fields}", assignment.info_message()));
        }
        Command::Finish => {
            host.show_message(&assignment.info_message());
            let summary = unwrap_or_halt(assignment.finish(), &mut host);
            host.show_message(&summary.to_string());
        }
        Command::Summary => {
            let summary = unwrap_or_halt(assignment.summarize(), &mut host);
            host.show_message(&summary.to_string());
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<AssignmentConfig> {
    let base = match &cli.config {
        Some(path) => AssignmentConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AssignmentConfig::default(),
    };

    let mut builder = AssignmentConfigBuilder::from_config(base);
    if let Some(path) = &cli.conditions {
        builder = builder.conditions(path);
    }
    if let Some(path) = &cli.sessions {
        builder = builder.sessions(path);
    }
    if let Some(delimiter) = cli.delimiter {
        builder = builder.delimiter(delimiter);
    }
    if let Some(size) = cli.group_size {
        builder = builder.group_size(size);
    }
    if cli.no_normalize {
        builder = builder.normalize_on_read(false);
    }
    builder.build().context("invalid configuration")
}
