//! otagate CLI
//!
//! Operator commands run straight against the director, device registry and
//! TUF repository, without going through the daemon.

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use otagate_core::{BackendsConfig, OtaService};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "otagate-cli")]
#[command(about = "OTA device management CLI", long_about = None)]
struct Cli {
    /// Tenant namespace
    #[arg(long, env = "OTA_NAMESPACE", default_value = "default", global = true)]
    namespace: String,

    /// Director base URL
    #[arg(long, env = "DIRECTOR_URL", default_value = "http://director", global = true)]
    director_url: String,

    /// Device registry base URL
    #[arg(long, env = "REGISTRY_URL", default_value = "http://device-registry", global = true)]
    registry_url: String,

    /// TUF repository base URL
    #[arg(long, env = "REPO_URL", default_value = "http://tuf-reposerver", global = true)]
    repo_url: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List devices, one JSON object per line
    #[command(name = "list")]
    List {
        /// Registry-side regex on device names
        #[arg(long)]
        regex: Option<String>,
    },
    /// Show one device with hardware, network and auto-update details
    #[command(name = "show")]
    Show { name: String },
    /// Show installed packages
    #[command(name = "packages")]
    Packages {
        name: String,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
    /// Show targets the device can install
    #[command(name = "updates")]
    Updates { name: String },
    /// Dispatch the target with the given sha256 to a device
    #[command(name = "apply")]
    Apply {
        name: String,
        #[arg(long)]
        hash: String,
    },
    /// Turn auto-updates on or off
    #[command(name = "autoupdates")]
    AutoUpdates { name: String, state: Toggle },
    /// Rename a device
    #[command(name = "rename")]
    Rename { name: String, new_name: String },
    /// Delete a device from the registry
    #[command(name = "delete")]
    Delete { name: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Cli {
    fn backends(&self) -> BackendsConfig {
        BackendsConfig {
            namespace: self.namespace.clone(),
            director_url: self.director_url.clone(),
            registry_url: self.registry_url.clone(),
            repository_url: self.repo_url.clone(),
            ..BackendsConfig::default()
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let service = OtaService::new(cli.backends());
    debug!(namespace = %cli.namespace, "backends configured");

    match cli.command {
        Commands::List { regex } => {
            let mut pager = service.list_devices(regex)?;
            while let Some(device) = pager.next().await? {
                println!("{}", serde_json::to_string(&device)?);
            }
        }
        Commands::Show { name } => print_json(&service.device(&name).await?)?,
        Commands::Packages {
            name,
            offset,
            limit,
        } => print_json(&service.device_packages(&name, offset, limit).await?)?,
        Commands::Updates { name } => print_json(&service.device_updates(&name).await?)?,
        Commands::Apply { name, hash } => print_json(&service.device_update(&name, &hash).await?)?,
        Commands::AutoUpdates { name, state } => {
            let enabled = state == Toggle::On;
            print_json(&service.device_set_autoupdates(&name, enabled).await?)?;
        }
        Commands::Rename { name, new_name } => {
            print_json(&service.device_rename(&name, &new_name).await?)?;
        }
        Commands::Delete { name } => {
            service.device_delete(&name).await?;
            eprintln!("deleted {name}");
        }
    }

    Ok(())
}
