use crate::config::StorageLayout;
use crate::error::AppError;
use crate::metadata::PhotoId;
use crate::store::RecordStore;
use serde::Serialize;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub files_removed: usize,
    pub files_failed: usize,
    pub photos_deleted: u64,
    pub faces_deleted: u64,
}

/// Parses a comma-separated id list. Missing, empty or malformed lists are
/// request errors.
pub fn parse_ids(ids: Option<&str>) -> Result<Vec<PhotoId>, AppError> {
    let raw = ids
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("ids parameter is missing!".to_string()))?;

    let mut parsed = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = PhotoId::parse_str(id)
            .map_err(|_| AppError::Validation(format!("Invalid id: {}", id)))?;
        if !parsed.contains(&id) {
            parsed.push(id);
        }
    }

    if parsed.is_empty() {
        return Err(AppError::Validation("ids parameter is missing!".to_string()));
    }
    Ok(parsed)
}

/// Marks the given records as trashed and returns how many changed.
pub async fn trash(store: &dyn RecordStore, ids: Option<&str>) -> Result<u64, AppError> {
    let ids = parse_ids(ids)?;
    log::debug!("Trashing ids: {:?}", ids);
    let modified = store.trash_photos(&ids).await?;
    log::info!("{} Photos trashed successfully!", modified);
    Ok(modified)
}

/// Deletes every stored original and thumbnail, then every photo and face
/// record. File failures are logged and tolerated; record failures are not.
pub async fn purge_all(layout: &StorageLayout, store: &dyn RecordStore) -> Result<PurgeReport, AppError> {
    let mut report = PurgeReport::default();

    for dir in layout.directories() {
        let (removed, failed) = delete_files_in_dir(dir).await;
        report.files_removed += removed;
        report.files_failed += failed;
    }

    let photos = store.delete_all_photos().await;
    let faces = store.delete_all_faces().await;
    log::info!("Delete Photos res: {:?}", photos);
    log::info!("Delete Faces res: {:?}", faces);

    report.photos_deleted = photos?;
    report.faces_deleted = faces?;
    Ok(report)
}

async fn delete_files_in_dir(dir: &Path) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("Error deleting files in {:?}: {}", dir, e);
                failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => {
                log::error!("Error deleting file {:?}: {}", entry.path(), e);
                failed += 1;
            }
        }
    }

    log::debug!("Removed {} file(s) from {:?}, {} failure(s)", removed, dir, failed);
    (removed, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn missing_or_empty_ids_are_rejected() {
        for ids in [None, Some(""), Some("  "), Some(",,")] {
            let err = parse_ids(ids).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{:?} was accepted", ids);
        }
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(matches!(parse_ids(Some("not-an-id")), Err(AppError::Validation(_))));
    }

    #[test]
    fn ids_are_trimmed_and_deduplicated() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let list = format!("{}, {} ,{}", a, b, a);

        assert_eq!(parse_ids(Some(&list)).unwrap(), vec![a, b]);
    }
}
