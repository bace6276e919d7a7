// tolino-cloud - Tolino Cloud Library Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tolino_cloud::api::partner::HUGENDUBEL;
use tolino_cloud::{ClientConfig, DeviceTarget, PartnerRegistry, SessionAuthenticator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tolino-cli")]
#[command(about = "tolino cloud CLI - manage devices and content of a partner account", long_about = None)]
struct Cli {
    /// Partner (reseller) id
    #[arg(long, default_value_t = HUGENDUBEL)]
    partner: u32,

    /// JSON file with additional partner records
    #[arg(long)]
    partners_file: Option<PathBuf>,

    /// Account login
    #[arg(short, long, env = "TOLINO_USER")]
    user: Option<String>,

    /// Account password
    #[arg(short, long, env = "TOLINO_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known partners
    Partners,
    /// List devices registered to the account
    Devices,
    /// Register this hardware id as a device
    Register,
    /// Remove a device from the account (this device if no id is given)
    Unregister {
        device_id: Option<String>,
    },
    /// List uploaded and purchased content
    Inventory,
    /// Upload a PDF or EPUB file
    Upload {
        file: PathBuf,
    },
    /// Delete content by deliverable id
    Delete {
        id: String,
    },
    /// Download content by deliverable id
    Download {
        id: String,
        /// Destination directory (defaults to the working directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let mut registry = PartnerRegistry::builtin();
    if let Some(file) = &cli.partners_file {
        let json = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        registry.extend_from_json(&json)?;
    }

    if let Commands::Partners = cli.command {
        for partner in registry.partners() {
            println!("{:>4}  {}", partner.id, partner.name);
        }
        return Ok(());
    }

    let user = cli.user.clone().context("--user (or TOLINO_USER) is required")?;
    let password = cli
        .password
        .clone()
        .context("--password (or TOLINO_PASSWORD) is required")?;

    let mut auth = SessionAuthenticator::for_partner(&registry, cli.partner, ClientConfig::default())?;
    auth.login(&user, &password)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let outcome = run(&auth, cli.command).await;

    if let Err(e) = auth.logout().await {
        tracing::warn!(error = %e, "logout failed");
    }

    outcome
}

async fn run(auth: &SessionAuthenticator, command: Commands) -> Result<()> {
    match command {
        Commands::Partners => {}
        Commands::Devices => {
            for device in auth.devices().devices().await? {
                let last_used = device
                    .last_used_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{}  {:<16} {:<24} {}", device.id, device.device_type, device.name, last_used);
            }
        }
        Commands::Register => {
            auth.devices().register().await?;
            println!("Registered {}", auth.hardware_id());
        }
        Commands::Unregister { device_id } => {
            let target = device_id.map(DeviceTarget::Id).unwrap_or(DeviceTarget::ThisDevice);
            auth.devices().unregister(target).await?;
            println!("Unregistered");
        }
        Commands::Inventory => {
            for entry in auth.catalog().inventory().await? {
                println!(
                    "{}  [{}] {} - {}",
                    entry.id,
                    entry.content_type,
                    entry.authors.join(", "),
                    entry.title
                );
            }
        }
        Commands::Upload { file } => {
            let id = auth.transfer().upload(&file).await?;
            println!("Uploaded {} as {}", file.display(), id);
        }
        Commands::Delete { id } => {
            auth.transfer().delete(&id).await?;
            println!("Deleted {}", id);
        }
        Commands::Download { id, output } => {
            let path = auth
                .transfer()
                .download_with_progress(output.as_deref(), &id, |progress| {
                    if let Some(percent) = progress.percent() {
                        tracing::debug!(percent, "downloading");
                    }
                })
                .await?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}
