use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use pollenwatch::pollen::{PollenFetcher, PollenService, SensorValue};
use pollenwatch::{GooglePollenClient, PollenWatchConfig, PollenWatchError, logging, web};

/// Google Pollen API poller
#[derive(Parser)]
#[command(name = "pollenwatch", version, about = "Polls Google Pollen data for configured locations")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh every location once, print the sensor values as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match PollenWatchConfig::load_from_path(cli.config) {
        Ok(config) => config,
        Err(e) => {
            match e.downcast_ref::<PollenWatchError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("{e:#}"),
            }
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(config, cli.once).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            if let Some(err) = e.downcast_ref::<PollenWatchError>() {
                eprintln!("{}", err.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: PollenWatchConfig, once: bool) -> Result<()> {
    let client = GooglePollenClient::with_options(
        config.api.api_key.clone(),
        config.api.referrer.clone(),
        config.api.base_url.clone(),
        config.request_timeout(),
    )
    .map_err(PollenWatchError::from)?;
    let fetcher: Arc<dyn PollenFetcher> = Arc::new(client);

    if once {
        let service = PollenService::run_once(config.to_locations(), fetcher).await;
        let mut output: BTreeMap<String, BTreeMap<&'static str, SensorValue>> = BTreeMap::new();
        for runtime in service.locations().await {
            let sensors = runtime
                .sensors()
                .iter()
                .map(|sensor| (sensor.key(), sensor.native_value()))
                .collect();
            output.insert(runtime.location().id.clone(), sensors);
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to render sensor values")?
        );
        return Ok(());
    }

    let service = Arc::new(
        PollenService::start(config.to_locations(), fetcher, config.polling_interval()).await,
    );

    if config.web.enabled {
        web::run(Arc::clone(&service), &config.web_address(), shutdown_signal()).await?;
    } else {
        shutdown_signal().await;
    }

    info!("Shutting down");
    service.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
}
