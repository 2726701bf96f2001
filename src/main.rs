use anyhow::Result;
use clap::Parser;
use log::info;
use photo_ingest::cli::{read_candidate, Cli, Commands};
use photo_ingest::config::AppConfig;
use photo_ingest::error::AppError;
use photo_ingest::open_store;
use photo_ingest::service::PhotoService;
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new()?;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting photo-ingest");

    for dir in config.layout().directories() {
        std::fs::create_dir_all(dir)?;
    }

    let store = open_store(&config)?;
    let service = PhotoService::new(&config, store);

    let result: Result<(), AppError> = async {
        match cli.command {
            Commands::Upload { files, content_type } => {
                let candidates = files
                    .iter()
                    .map(|path| read_candidate(path, content_type.as_deref()))
                    .collect::<Result<Vec<_>, _>>()?;
                let report = service.upload_batch(candidates).await?;
                println!(
                    "{} photo(s) created, {} skipped",
                    report.created.len(),
                    report.skipped.len()
                );
                print_json(&report)?;
            }
            Commands::List { trashed } => {
                let photos = if trashed {
                    service.list_trashed().await?
                } else {
                    service.list_photos().await?
                };
                print_json(&photos)?;
            }
            Commands::Trash { ids } => {
                let modified = service.trash(ids.as_deref()).await?;
                println!("{} Photos trashed successfully!", modified);
            }
            Commands::Purge => {
                let report = service.purge_all().await?;
                println!("Deleted successfully!");
                print_json(&report)?;
            }
            Commands::Faces { file } => {
                let faces = std::fs::read_to_string(&file)?;
                let saved = service.save_face_descriptors(&faces).await?;
                println!("{} face label(s) saved", saved);
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        if e.is_client_error() {
            eprintln!("error: {}", e);
        } else {
            log::error!("Error: {}", e);
            eprintln!("error: Something went wrong");
        }
        std::process::exit(1);
    }

    info!("photo-ingest finished");
    Ok(())
}
