use crate::config::{AppConfig, StorageLayout};
use crate::error::AppError;
use crate::extractor;
use crate::metadata::{NewPhoto, Photo};
use crate::normalizer::normalize;
use crate::store::RecordStore;
use crate::thumbnail::ThumbnailGenerator;
use crate::upload::StoredUpload;
use chrono::{Local, NaiveDateTime, SubsecRound};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs the per-file pipeline (thumbnail, metadata, record) over one upload
/// batch. Either every file of the batch ends up persisted, or none does.
pub struct BatchIngestor {
    store: Arc<dyn RecordStore>,
    layout: StorageLayout,
    thumbnails: Arc<ThumbnailGenerator>,
    permits: Arc<Semaphore>,
    num_workers: usize,
}

impl BatchIngestor {
    pub fn new(config: &AppConfig, store: Arc<dyn RecordStore>) -> Self {
        let num_workers = config.num_workers.max(1);
        Self {
            store,
            layout: config.layout(),
            thumbnails: Arc::new(ThumbnailGenerator::new(config)),
            permits: Arc::new(Semaphore::new(num_workers)),
            num_workers,
        }
    }

    pub async fn ingest(&self, files: Vec<StoredUpload>) -> Result<Vec<Photo>, AppError> {
        log::info!(
            "Starting ingestion of {} file(s) with {} workers",
            files.len(),
            self.num_workers
        );

        let (names, handles): (Vec<String>, Vec<_>) = files
            .into_iter()
            .map(|file| {
                let store = self.store.clone();
                let thumbnails = self.thumbnails.clone();
                let permits = self.permits.clone();
                let name = file.name.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| AppError::processing(&file.name, e))?;
                    process_file(store, thumbnails, file).await
                });
                (name, handle)
            })
            .unzip();

        let results = futures::future::join_all(handles).await;

        let mut committed = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(Ok(photo)) => committed.push(photo),
                Ok(Err(e)) => {
                    log::error!("Failed to process image {}: {}", name, e);
                    failed.push(name);
                }
                Err(e) => {
                    log::error!("Pipeline for {} did not complete: {}", name, e);
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            log::info!("All {} image(s) processed.", committed.len());
            return Ok(committed);
        }

        for name in &failed {
            remove_artifacts(&self.layout, name).await;
        }
        // Sibling files may only go once their records are gone.
        if self.compensate(&committed).await {
            for photo in &committed {
                remove_artifacts(&self.layout, &photo.name).await;
            }
            log::warn!(
                "Batch failed for {} file(s); {} sibling record(s) rolled back",
                failed.len(),
                committed.len()
            );
        } else {
            log::warn!(
                "Batch failed for {} file(s); {} sibling record(s) kept with their files",
                failed.len(),
                committed.len()
            );
        }
        Err(AppError::BatchFailed { failed })
    }

    /// Deletes records committed by siblings of a failed pipeline. Returns
    /// whether none of them is left in the store.
    async fn compensate(&self, committed: &[Photo]) -> bool {
        if committed.is_empty() {
            return true;
        }
        let ids: Vec<_> = committed.iter().map(|p| p.id).collect();
        match self.store.delete_photos(&ids).await {
            Ok(deleted) => {
                log::debug!("Rolled back {} committed record(s)", deleted);
                true
            }
            Err(e) => {
                log::error!("Could not roll back committed records {:?}: {}", ids, e);
                false
            }
        }
    }
}

async fn process_file(
    store: Arc<dyn RecordStore>,
    thumbnails: Arc<ThumbnailGenerator>,
    file: StoredUpload,
) -> Result<Photo, AppError> {
    log::info!("Processing image started for: {}", file.name);
    let name = file.name.clone();
    let path = file.path.clone();

    let (preview, raw) = tokio::task::spawn_blocking(move || {
        let preview = thumbnails.generate(&file.name)?;
        let raw = extractor::extract(&file.path)?;
        Ok::<_, AppError>((preview, raw))
    })
    .await
    .map_err(|e| AppError::processing(&name, e))?
    .map_err(|e| AppError::processing(&name, e))?;

    let normalized = normalize(raw.as_ref(), file.size, ingestion_time(), preview.dimensions)
        .map_err(|e| AppError::processing(&name, e))?;
    log::trace!("Normalized metadata for {:?}: {}", path, normalized.meta_data);

    let photo = store
        .insert_photo(NewPhoto {
            name: name.clone(),
            date_created: normalized.date_created,
            meta_data: normalized.meta_data,
        })
        .await?;

    log::info!("Processing image finished for: {} (id {})", name, photo.id);
    Ok(photo)
}

fn ingestion_time() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Best-effort removal of a name's original and thumbnail.
pub(crate) async fn remove_artifacts(layout: &StorageLayout, name: &str) {
    remove_if_present(&layout.original_path(name)).await;
    remove_if_present(&layout.thumbnail_path(name)).await;
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("Removed {:?}", path),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove {:?}: {}", path, e),
    }
}
