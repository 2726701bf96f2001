use crate::error::AppError;
use crate::metadata::{FaceDescriptor, NewFaceDescriptor, NewPhoto, Photo, PhotoId};
use async_trait::async_trait;

/// Persistence for photo and face-descriptor records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persists a new record and returns it with its assigned id.
    async fn insert_photo(&self, photo: NewPhoto) -> Result<Photo, AppError>;
    async fn find_photos(&self, trashed: bool) -> Result<Vec<Photo>, AppError>;
    /// Sets `trashed` on every matching record; returns how many changed.
    async fn trash_photos(&self, ids: &[PhotoId]) -> Result<u64, AppError>;
    async fn delete_photos(&self, ids: &[PhotoId]) -> Result<u64, AppError>;
    async fn delete_all_photos(&self) -> Result<u64, AppError>;
    async fn insert_faces(&self, faces: Vec<NewFaceDescriptor>) -> Result<Vec<FaceDescriptor>, AppError>;
    async fn find_faces(&self) -> Result<Vec<FaceDescriptor>, AppError>;
    async fn delete_all_faces(&self) -> Result<u64, AppError>;
}
