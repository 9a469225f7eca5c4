use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pod_cgroups::{bootstrap, metrics, NodeConfig, Pod};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "podcgctl", version, about = "Manage per-pod and QoS cgroups on this node")]
struct Cli {
    /// Node config (JSON); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the top level QoS cgroups and print their names
    Init,
    /// Create the pod cgroup if needed and apply its limits
    Ensure { pod: PathBuf },
    /// Remove the pod cgroup
    Destroy { pod: PathBuf },
    /// Exit 0 if the pod cgroup exists, 1 otherwise
    Exists { pod: PathBuf },
    /// Print the pod's cgroup name
    Name { pod: PathBuf },
    /// Print Prometheus metrics
    Metrics,
}

fn load_pod(path: &Path) -> Result<Pod, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Runs one command. `Ok(false)` is a negative answer, not a failure.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    if let Command::Metrics = cli.command {
        print!("{}", metrics::encode_metrics()?);
        return Ok(true);
    }

    // Every per-pod command needs the QoS hierarchy in place first
    let (qos, pods) = bootstrap(&config)?;

    match cli.command {
        Command::Init => {
            println!("Guaranteed\t{}", qos.guaranteed);
            println!("Burstable\t{}", qos.burstable);
            println!("BestEffort\t{}", qos.best_effort);
        }
        Command::Ensure { pod } => {
            let pod = load_pod(&pod)?;
            pods.ensure_exists(&pod)?;
            println!("{}", pods.pod_container_name(&pod));
        }
        Command::Destroy { pod } => {
            let pod = load_pod(&pod)?;
            pods.destroy(&pod)?;
        }
        Command::Exists { pod } => {
            let pod = load_pod(&pod)?;
            return Ok(pods.exists(&pod));
        }
        Command::Name { pod } => {
            let pod = load_pod(&pod)?;
            println!("{}", pods.pod_container_name(&pod));
        }
        Command::Metrics => {}
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = pod_cgroups::tracing::init_tracing(cli.json_logs) {
        eprintln!("failed to initialize logging: {}", e);
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "podcgctl failed");
            ExitCode::FAILURE
        }
    }
}
