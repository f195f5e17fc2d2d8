//! ipintel
//!
//! Enrich an IP address with geolocation, reputation, and threat
//! intelligence from local GeoIP databases and external providers.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod lookup;
mod models;
mod providers;
mod report;

use config::{Config, PassiveTotalCredentials, VirusTotalCredentials, VtApiMode};
use lookup::LocalLookup;
use models::ip_utils::parse_ip;
use providers::{
    Aggregator, IntelProvider, greynoise::GreyNoiseProvider, otx::OtxProvider,
    passivetotal::PassiveTotalProvider, robtex::RobtexProvider, threatgrid::ThreatGridProvider,
    virustotal::VirusTotalProvider,
};

/// ipintel
#[derive(Parser, Debug)]
#[command(name = "ipintel")]
#[command(about = "Gather information on an IP address")]
struct Args {
    /// Directory holding the local GeoIP databases
    #[arg(long, env = "IPINTEL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// AlienVault OTX API key
    #[arg(long, env = "OTX_API_KEY")]
    otx_api_key: Option<String>,

    /// PassiveTotal account username
    #[arg(long, env = "PASSIVETOTAL_USERNAME")]
    passivetotal_username: Option<String>,

    /// PassiveTotal API key
    #[arg(long, env = "PASSIVETOTAL_API_KEY")]
    passivetotal_api_key: Option<String>,

    /// VirusTotal API key
    #[arg(long, env = "VIRUSTOTAL_API_KEY")]
    virustotal_api_key: Option<String>,

    /// VirusTotal API tier
    #[arg(long, env = "VIRUSTOTAL_API_MODE", value_enum, default_value = "public")]
    virustotal_api_mode: VtApiMode,

    /// Threat Grid API key
    #[arg(long, env = "THREATGRID_API_KEY")]
    threatgrid_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Local geolocation and ASN information on an IP
    Info {
        /// IP address
        ip: String,
    },
    /// Gather threat intelligence information on an IP
    Intel {
        /// IP address
        ip: String,
    },
}

impl Args {
    fn into_config(self) -> (Config, Command) {
        let passivetotal = match (self.passivetotal_username, self.passivetotal_api_key) {
            (Some(username), Some(api_key)) => Some(PassiveTotalCredentials { username, api_key }),
            _ => None,
        };
        let virustotal = self.virustotal_api_key.map(|api_key| VirusTotalCredentials {
            api_key,
            mode: self.virustotal_api_mode,
        });

        (
            Config {
                data_dir: self.data_dir,
                otx_api_key: self.otx_api_key,
                passivetotal,
                virustotal,
                threatgrid_api_key: self.threatgrid_api_key,
            },
            self.command,
        )
    }
}

fn build_providers(config: &Config) -> Vec<Arc<dyn IntelProvider>> {
    vec![
        Arc::new(OtxProvider::new(config.otx_api_key.clone())),
        Arc::new(RobtexProvider::new()),
        Arc::new(PassiveTotalProvider::new(config.passivetotal.clone())),
        Arc::new(VirusTotalProvider::new(config.virustotal.clone())),
        Arc::new(GreyNoiseProvider::new()),
        Arc::new(ThreatGridProvider::new(config.threatgrid_api_key.clone())),
    ]
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ipintel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (config, command) = Args::parse().into_config();

    match run(config, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, command: Command) -> Result<()> {
    match command {
        Command::Info { ip } => {
            // Validate before touching any store
            let ip = parse_ip(&ip)?;
            let local = LocalLookup::open(&config.store_paths())
                .context("Local database lookup is unavailable")?;
            let info = local.lookup(ip);
            print!("{}", report::render_info(ip, &info));
        }
        Command::Intel { ip } => {
            let ip = parse_ip(&ip)?;
            let aggregator = Aggregator::new(build_providers(&config));
            let intel = aggregator.aggregate(ip).await;
            print!("{}", report::render_intel(&intel));
        }
    }
    Ok(())
}
