use crate::config::{AppConfig, StorageLayout};
use crate::error::AppError;
use crate::lifecycle::{self, PurgeReport};
use crate::metadata::{NewFaceDescriptor, Photo};
use crate::processor::BatchIngestor;
use crate::store::RecordStore;
use crate::upload::{UploadCandidate, UploadValidator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub created: Vec<Photo>,
    pub skipped: Vec<String>,
}

/// The operations offered to the calling layer.
pub struct PhotoService {
    store: Arc<dyn RecordStore>,
    layout: StorageLayout,
    validator: UploadValidator,
    ingestor: BatchIngestor,
}

impl PhotoService {
    pub fn new(config: &AppConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            layout: config.layout(),
            validator: UploadValidator::new(config),
            ingestor: BatchIngestor::new(config, store.clone()),
            store,
        }
    }

    pub async fn list_photos(&self) -> Result<Vec<Photo>, AppError> {
        self.store.find_photos(false).await
    }

    pub async fn list_trashed(&self) -> Result<Vec<Photo>, AppError> {
        self.store.find_photos(true).await
    }

    pub async fn upload_batch(&self, candidates: Vec<UploadCandidate>) -> Result<BatchReport, AppError> {
        let accepted = self.validator.accept_batch(candidates).await?;
        let created = self.ingestor.ingest(accepted.stored).await?;
        Ok(BatchReport {
            created,
            skipped: accepted.skipped,
        })
    }

    pub async fn trash(&self, ids: Option<&str>) -> Result<u64, AppError> {
        lifecycle::trash(self.store.as_ref(), ids).await
    }

    pub async fn purge_all(&self) -> Result<PurgeReport, AppError> {
        lifecycle::purge_all(&self.layout, self.store.as_ref()).await
    }

    /// Stores one face-descriptor record per label of a `{label: [[f64]]}` JSON
    /// object and returns how many were saved.
    pub async fn save_face_descriptors(&self, faces_json: &str) -> Result<usize, AppError> {
        let faces: BTreeMap<String, Vec<Vec<f64>>> = serde_json::from_str(faces_json)?;
        log::debug!("Face labels: {:?}", faces.keys().collect::<Vec<_>>());

        let saved = self
            .store
            .insert_faces(
                faces
                    .into_iter()
                    .map(|(label, descriptors)| NewFaceDescriptor { label, descriptors })
                    .collect(),
            )
            .await?;
        for face in &saved {
            log::debug!("Face saved at id: {}", face.id);
        }
        Ok(saved.len())
    }
}
