use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use crate::error::AppError;
use config::{Config, File};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub upload_directory: String,
    pub thumbnail_directory: String,
    pub thumbnail_prefix: String,
    pub thumbnail_max_width: u32,
    pub thumbnail_max_height: u32,
    pub allowed_content_types: HashSet<String>,
    pub engine: String,
    pub tantivy_index_path: String,
    pub num_workers: usize,
    pub log_level: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, AppError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .build()?;

        Ok(s.try_deserialize()?)
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout {
            upload_dir: PathBuf::from(&self.upload_directory),
            thumbnail_dir: PathBuf::from(&self.thumbnail_directory),
            thumbnail_prefix: self.thumbnail_prefix.clone(),
        }
    }
}

/// Where originals and thumbnails live, and how their paths derive from a
/// stored name.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub upload_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    pub thumbnail_prefix: String,
}

impl StorageLayout {
    pub fn original_path(&self, name: &str) -> PathBuf {
        self.upload_dir.join(name)
    }

    pub fn thumbnail_name(&self, name: &str) -> String {
        format!("{}{}", self.thumbnail_prefix, name)
    }

    pub fn thumbnail_path(&self, name: &str) -> PathBuf {
        self.thumbnail_dir.join(self.thumbnail_name(name))
    }

    pub fn original_exists(&self, name: &str) -> bool {
        self.original_path(name).exists()
    }

    pub fn directories(&self) -> [&Path; 2] {
        [&self.upload_dir, &self.thumbnail_dir]
    }
}

#[cfg(test)]
pub(crate) fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        upload_directory: root.join("uploads").to_string_lossy().to_string(),
        thumbnail_directory: root.join("thumbnails").to_string_lossy().to_string(),
        thumbnail_prefix: "thumb_".to_string(),
        thumbnail_max_width: 64,
        thumbnail_max_height: 64,
        allowed_content_types: ["image/png", "image/jpeg", "image/jpg", "image/webp"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        engine: "memory".to_string(),
        tantivy_index_path: root.join("index").to_string_lossy().to_string(),
        num_workers: 4,
        log_level: "debug".to_string(),
    }
}
