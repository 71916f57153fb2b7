mod db;
mod fetch;
mod scrape;

use std::path::{Path, PathBuf};

use clap::{Arg, ArgMatches, Command};
use tracing::{debug, error, info, warn};
use webcam_index_common::config::Config;
use webcam_index_common::registry::{Registry, RegistryError};

use db::RegistryStore;
use fetch::FetchError;
use scrape::ScrapeError;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid webcam registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("failed to write image: {0}")]
    ImageWrite(#[from] image::ImageError),
    #[error("webcam not found: {0}")]
    UnknownWebcam(String),
}

fn cli() -> Command {
    Command::new("webcam-index-backend")
        .about("Maintains the latest image indices for a resort's webcams")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML file with resort and webcam config")
                .default_value("config.toml"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("seed-registry")
                .about("Create or update the stored webcam records from config"),
        )
        .subcommand(
            Command::new("scrape-indices")
                .about("Scrape the resort's index page and update stored image indices"),
        )
        .subcommand(
            Command::new("fetch-image")
                .about("Fetch one webcam image and write it to disk")
                .arg(Arg::new("webcam").required(true).help("Webcam name"))
                .arg(
                    Arg::new("index")
                        .value_parser(clap::value_parser!(u64))
                        .help("Image index; defaults to the last known index"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("webcam.jpg")
                        .help("Output file path"),
                ),
        )
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let config_path = PathBuf::from(matches.get_one::<String>("config").unwrap());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        resort = config.resort.name,
        db = config.database.path,
        "starting webcam index backend"
    );

    let result = match matches.subcommand() {
        Some(("seed-registry", _)) => seed_registry(&config),
        Some(("scrape-indices", _)) => update_indices(&config).await,
        Some(("fetch-image", args)) => save_image(&config, args).await,
        _ => unreachable!("subcommand is required"),
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

/// Create or update the webcam records from the configured registry.
fn seed_registry(config: &Config) -> Result<(), BackendError> {
    let registry = Registry::from_entries(config.resort.webcams.clone())?;
    if registry.is_empty() {
        warn!("config declares no webcams");
    }
    let store = RegistryStore::open(Path::new(&config.database.path))?;
    store.upsert_all(&registry)?;
    info!(webcams = registry.len(), "webcam registry seeded");
    Ok(())
}

/// Scrape the index page once and write the discovered indices back.
async fn update_indices(config: &Config) -> Result<(), BackendError> {
    let store = RegistryStore::open(Path::new(&config.database.path))?;
    let webcams = store.list_all()?;
    if webcams.is_empty() {
        warn!("no webcams registered; run seed-registry first");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let page =
        fetch::fetch_index_page(&client, &config.resort.index_url, config.http.timeout()).await?;
    let indices = scrape::scrape_indices(&page, &webcams)?;
    for (name, index) in &indices {
        debug!(webcam = %name, index = *index, "discovered index");
    }
    store.apply_scrape_results(&indices)?;
    info!(webcams = indices.len(), "image indices updated");
    Ok(())
}

/// Fetch one webcam's image at the requested (or last known) index and
/// save it to disk.
async fn save_image(config: &Config, args: &ArgMatches) -> Result<(), BackendError> {
    let name = args.get_one::<String>("webcam").unwrap();
    let output = args.get_one::<String>("output").unwrap();

    let store = RegistryStore::open(Path::new(&config.database.path))?;
    let mut webcam = store
        .get(name)?
        .ok_or_else(|| BackendError::UnknownWebcam(name.clone()))?;
    let index = args
        .get_one::<u64>("index")
        .copied()
        .unwrap_or(webcam.last_index);

    let client = reqwest::Client::new();
    let image = fetch::fetch_image(&client, &mut webcam, index, config.http.timeout()).await?;
    store.record_fetched(name, webcam.last_index)?;
    image.save(output)?;
    info!(webcam = %name, index, output = %output, "image saved");
    Ok(())
}
