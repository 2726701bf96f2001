use crate::error::AppError;
use crate::metadata::{FaceDescriptor, NewFaceDescriptor, NewPhoto, Photo, PhotoId};
use crate::store::RecordStore;
use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

/// Process-local store. Records are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    photos: RwLock<Vec<Photo>>,
    faces: RwLock<Vec<FaceDescriptor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Storage("memory store lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_photo(&self, photo: NewPhoto) -> Result<Photo, AppError> {
        let photo = photo.into_photo(Uuid::new_v4());
        self.photos.write().map_err(poisoned)?.push(photo.clone());
        Ok(photo)
    }

    async fn find_photos(&self, trashed: bool) -> Result<Vec<Photo>, AppError> {
        Ok(self
            .photos
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|p| p.trashed == trashed)
            .cloned()
            .collect())
    }

    async fn trash_photos(&self, ids: &[PhotoId]) -> Result<u64, AppError> {
        let mut photos = self.photos.write().map_err(poisoned)?;
        let mut modified = 0;
        for photo in photos.iter_mut().filter(|p| ids.contains(&p.id)) {
            if !photo.trashed {
                photo.trashed = true;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_photos(&self, ids: &[PhotoId]) -> Result<u64, AppError> {
        let mut photos = self.photos.write().map_err(poisoned)?;
        let before = photos.len();
        photos.retain(|p| !ids.contains(&p.id));
        Ok((before - photos.len()) as u64)
    }

    async fn delete_all_photos(&self) -> Result<u64, AppError> {
        let mut photos = self.photos.write().map_err(poisoned)?;
        let deleted = photos.len() as u64;
        photos.clear();
        Ok(deleted)
    }

    async fn insert_faces(&self, faces: Vec<NewFaceDescriptor>) -> Result<Vec<FaceDescriptor>, AppError> {
        let faces: Vec<FaceDescriptor> = faces
            .into_iter()
            .map(|f| f.into_face(Uuid::new_v4()))
            .collect();
        self.faces.write().map_err(poisoned)?.extend(faces.iter().cloned());
        Ok(faces)
    }

    async fn find_faces(&self) -> Result<Vec<FaceDescriptor>, AppError> {
        Ok(self.faces.read().map_err(poisoned)?.clone())
    }

    async fn delete_all_faces(&self) -> Result<u64, AppError> {
        let mut faces = self.faces.write().map_err(poisoned)?;
        let deleted = faces.len() as u64;
        faces.clear();
        Ok(deleted)
    }
}
