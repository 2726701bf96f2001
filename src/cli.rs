use crate::error::AppError;
use crate::upload::UploadCandidate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Ingest photos, derive thumbnails and capture metadata")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a batch of images
    Upload {
        /// Image files to upload as one batch
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Content type to declare instead of guessing from the extension
        #[arg(long)]
        content_type: Option<String>,
    },

    /// List stored photos
    List {
        /// List trashed photos instead
        #[arg(long)]
        trashed: bool,
    },

    /// Move photos to the trash
    Trash {
        /// Comma-separated photo ids
        ids: Option<String>,
    },

    /// Delete every stored file and record
    Purge,

    /// Save face descriptors from a JSON file mapping labels to vectors
    Faces {
        #[arg(required = true)]
        file: PathBuf,
    },
}

/// Reads a local file the way an upload transport would hand it over.
pub fn read_candidate(path: &Path, content_type: Option<&str>) -> Result<UploadCandidate, AppError> {
    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::Validation(format!("Not a file: {}", path.display())))?;
    let content_type = match content_type {
        Some(t) => t.to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };

    Ok(UploadCandidate {
        original_name,
        content_type,
        bytes: std::fs::read(path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_guessed_from_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.JPG");
        std::fs::write(&path, b"jpeg").unwrap();

        let candidate = read_candidate(&path, None).unwrap();
        assert_eq!(candidate.original_name, "photo.JPG");
        assert_eq!(candidate.content_type, "image/jpeg");
        assert_eq!(candidate.bytes, b"jpeg");
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.unknownext");
        std::fs::write(&path, b"x").unwrap();

        let candidate = read_candidate(&path, None).unwrap();
        assert_eq!(candidate.content_type, "application/octet-stream");
    }

    #[test]
    fn parses_the_trash_command() {
        let cli = Cli::parse_from(["photo-ingest", "trash", "a,b"]);
        match cli.command {
            Commands::Trash { ids } => assert_eq!(ids.as_deref(), Some("a,b")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
