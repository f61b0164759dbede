//! vlanlabd - virtual VLAN topology orchestrator
//!
//! Entry point for the vlanlabd binary.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vlanlab_common::SystemRunner;
use vlanlabd::{
    load_topology, plan, reference_topology, Provisioner, ShellBackend, TeardownReport, Topology,
};

/// Virtual VLAN topology orchestrator
#[derive(Parser, Debug)]
#[command(name = "vlanlabd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topology file (TOML); the built-in reference scenario when omitted
    #[arg(short = 't', long, global = true)]
    topology: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,

    /// Run kernel commands through sudo
    #[arg(long, global = true)]
    sudo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision the topology, wait for Ctrl-C, then tear it down
    Start,
    /// Print the kernel commands provisioning would run
    Plan,
    /// Validate the topology and exit
    Validate,
    /// Remove resources left behind by an earlier session
    Cleanup,
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load(args: &Args) -> anyhow::Result<Topology> {
    match &args.topology {
        Some(path) => load_topology(path)
            .with_context(|| format!("loading topology {}", path.display())),
        None => reference_topology().context("building reference topology"),
    }
}

fn report_teardown(report: &TeardownReport) {
    if report.is_clean() {
        info!(destroyed = report.destroyed, "Network removed");
    } else {
        warn!(
            destroyed = report.destroyed,
            failed = report.failures.len(),
            "Network removed with errors"
        );
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let topology = load(&args)?;
    let provisioner = Provisioner::new(ShellBackend::new(SystemRunner::new().with_sudo(args.sudo)));

    match args.command {
        Command::Validate => {
            info!(
                topology = %topology.name(),
                nodes = topology.nodes().len(),
                links = topology.links().len(),
                "Topology is valid"
            );
        }
        Command::Plan => {
            for planned in plan(&topology) {
                println!("# {}: {}", planned.step, planned.resource);
                for cmd in planned.resource.create_commands() {
                    println!("{}", cmd);
                }
            }
        }
        Command::Cleanup => {
            let report = provisioner.reconcile(&topology).await;
            report_teardown(&report);
            if !report.is_clean() {
                bail!("{} resources could not be removed", report.failures.len());
            }
        }
        Command::Start => {
            let state = provisioner.provision(&topology).await?;
            info!(
                session = %state.session(),
                resources = state.handle_count(),
                "Network is up; press Ctrl-C to stop"
            );

            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot wait for Ctrl-C; stopping");
            }

            info!("Stopping network");
            report_teardown(&provisioner.teardown(state).await);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting vlanlabd ---");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
