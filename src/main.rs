use std::{path::PathBuf, process::ExitCode, sync::Arc};

use ip_topology::{
    TopologyService,
    acquisition::{
        core::DeviceRegistry,
        inventory::{INVENTORY_ENV_VAR, JsonInventory},
        snapshot::InterfaceSnapshot,
    },
    config::TopologyConfig,
    topology::{adjacency, summary},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: ip-topology <snapshot.json> [--inventory <hosts.json>] [--config <config.json>]";

struct Args {
    snapshot: PathBuf,
    inventory: Option<PathBuf>,
    config: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut snapshot = None;
        let mut inventory = None;
        let mut config = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--inventory" => inventory = Some(args.next().ok_or("--inventory needs a path")?.into()),
                "--config" => config = Some(args.next().ok_or("--config needs a path")?.into()),
                flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
                _ if snapshot.is_none() => snapshot = Some(PathBuf::from(&arg)),
                _ => return Err(format!("unexpected argument {arg}")),
            }
        }
        Ok(Self {
            snapshot: snapshot.ok_or("missing snapshot path")?,
            inventory,
            config,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "topology discovery failed");
            ExitCode::FAILURE
        }
    }
}

/// Replays a snapshot through the topology pipeline and prints the result as JSON.
/// Returns `false` when the build was aborted.
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => TopologyConfig::from_file(path)?,
        None => TopologyConfig::default(),
    };
    let snapshot = InterfaceSnapshot::from_file(&args.snapshot).await?;

    let explicit = args.inventory.or_else(|| config.inventory_path.clone());
    let registry: Arc<dyn DeviceRegistry> =
        if explicit.is_some() || std::env::var_os(INVENTORY_ENV_VAR).is_some() {
            let inventory = JsonInventory::resolve(explicit.as_deref())?;
            info!(path = %inventory.path().display(), "using inventory file");
            Arc::new(inventory)
        } else {
            Arc::new(snapshot.clone())
        };

    let service = TopologyService::from_shared(registry, Arc::new(snapshot), config);
    let result = service.build().await?;

    if let Some(failure) = result.failure() {
        error!(device = %failure.device, error = %failure, "build aborted");
        println!("{}", serde_json::to_string_pretty(&summary(&result))?);
        return Ok(false);
    }

    let report = serde_json::json!({
        "summary": summary(&result),
        "error_devices": result.error_devices(),
        "adjacency": adjacency(&result)?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(true)
}
