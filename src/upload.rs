use crate::config::{AppConfig, StorageLayout};
use crate::error::AppError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// A file as handed over by the transport, before anything touches disk.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    /// A file with this name is already stored; drop it without failing the batch.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct AcceptedBatch {
    pub stored: Vec<StoredUpload>,
    pub skipped: Vec<String>,
}

pub struct UploadValidator {
    allowed_content_types: HashSet<String>,
    layout: StorageLayout,
}

impl UploadValidator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            allowed_content_types: config
                .allowed_content_types
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            layout: config.layout(),
        }
    }

    pub fn admit(&self, content_type: &str, original_name: &str) -> Result<Admission, AppError> {
        let essence = content_type
            .parse::<mime::Mime>()
            .map(|m| m.essence_str().to_ascii_lowercase())
            .map_err(|_| AppError::Validation(format!("Invalid content type: {}", content_type)))?;

        if !self.allowed_content_types.contains(&essence) {
            log::debug!("Rejecting {} with content type {}", original_name, essence);
            return Err(AppError::Validation("Only images are allowed".to_string()));
        }

        if !is_plain_file_name(original_name) {
            return Err(AppError::Validation(format!("Invalid file name: {:?}", original_name)));
        }

        if self.layout.original_exists(original_name) {
            log::debug!("Skipping {}: a file with that name is already stored", original_name);
            return Ok(Admission::Skip);
        }

        Ok(Admission::Accept)
    }

    /// Validates every candidate, then stores the accepted ones in the upload
    /// directory. A single rejected candidate aborts the batch before any write.
    pub async fn accept_batch(&self, candidates: Vec<UploadCandidate>) -> Result<AcceptedBatch, AppError> {
        let mut admitted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let admission = self.admit(&candidate.content_type, &candidate.original_name)?;
            admitted.push((candidate, admission));
        }

        let mut batch = AcceptedBatch::default();
        let mut seen = HashSet::new();

        for (candidate, admission) in admitted {
            if admission == Admission::Skip || !seen.insert(candidate.original_name.clone()) {
                batch.skipped.push(candidate.original_name);
                continue;
            }

            let path = self.layout.original_path(&candidate.original_name);
            match write_new_file(&path, &candidate.bytes).await {
                Ok(true) => {
                    log::trace!("Stored original {:?} ({} bytes)", path, candidate.bytes.len());
                    batch.stored.push(StoredUpload {
                        name: candidate.original_name,
                        path,
                        size: candidate.bytes.len() as u64,
                    });
                }
                Ok(false) => {
                    log::debug!("Skipping {}: stored concurrently by another upload", candidate.original_name);
                    batch.skipped.push(candidate.original_name);
                }
                Err(e) => {
                    log::error!("Failed to store original {:?}: {}", path, e);
                    for stored in &batch.stored {
                        if let Err(e) = tokio::fs::remove_file(&stored.path).await {
                            log::warn!("Could not remove stored original {:?}: {}", stored.path, e);
                        }
                    }
                    return Err(AppError::Io(e));
                }
            }
        }

        log::info!(
            "Accepted {} file(s), skipped {} duplicate(s)",
            batch.stored.len(),
            batch.skipped.len()
        );
        Ok(batch)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(|c: char| c == '/' || c == '\\')
}

/// Writes `bytes` to a file that must not exist yet. Returns `Ok(false)` when
/// the name was taken in the meantime.
async fn write_new_file(path: &Path, bytes: &[u8]) -> std::io::Result<bool> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    if let Err(e) = file.write_all(bytes).await {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
        return Err(e);
    }
    file.flush().await?;
    Ok(true)
}
