pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod lifecycle;
pub mod metadata;
pub mod normalizer;
pub mod processor;
pub mod service;
pub mod store;
pub mod stores;
pub mod thumbnail;
pub mod upload;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::RecordStore;
use crate::stores::{memory::MemoryStore, tantivy::TantivyStore};
use std::sync::Arc;

/// Picks the record store backend named by `config.engine`.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn RecordStore>, AppError> {
    match config.engine.as_str() {
        "tantivy" => Ok(Arc::new(TantivyStore::new(config)?)),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(AppError::Validation(format!("Unknown engine: {}", other))),
    }
}
