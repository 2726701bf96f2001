use crate::config::{AppConfig, StorageLayout};
use crate::error::AppError;
use crate::metadata::Dimensions;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedThumbnail {
    pub path: PathBuf,
    pub dimensions: Dimensions,
}

pub struct ThumbnailGenerator {
    layout: StorageLayout,
    max_width: u32,
    max_height: u32,
}

impl ThumbnailGenerator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            layout: config.layout(),
            max_width: config.thumbnail_max_width.max(1),
            max_height: config.thumbnail_max_height.max(1),
        }
    }

    /// Decodes the stored original `name` and writes its preview next to the
    /// other thumbnails. Blocking; run it off the async executor.
    pub fn generate(&self, name: &str) -> Result<GeneratedThumbnail, AppError> {
        let source = self.layout.original_path(name);
        let thumbnail_path = self.layout.thumbnail_path(name);

        log::trace!("Opening image for thumbnail generation: {:?}", source);
        let reader = ImageReader::open(&source)?.with_guessed_format()?;
        let source_format = reader.format();
        let image = reader.decode().map_err(|e| {
            log::warn!("Could not decode image for thumbnail generation {:?}: {}", source, e);
            e
        })?;

        let (width, height) = image.dimensions();
        let (bound_w, bound_h) = preview_bounds(width, height, self.max_width, self.max_height);
        let mut thumbnail = image.thumbnail(bound_w, bound_h);

        let format = ImageFormat::from_path(&thumbnail_path)
            .ok()
            .or(source_format)
            .unwrap_or(ImageFormat::Png);
        if format == ImageFormat::Jpeg {
            thumbnail = DynamicImage::ImageRgb8(thumbnail.to_rgb8());
        }
        thumbnail.save_with_format(&thumbnail_path, format)?;

        let dimensions = Dimensions {
            width: thumbnail.width(),
            height: thumbnail.height(),
        };
        log::debug!(
            "Thumbnail saved to: {:?} ({}x{})",
            thumbnail_path,
            dimensions.width,
            dimensions.height
        );

        Ok(GeneratedThumbnail {
            path: thumbnail_path,
            dimensions,
        })
    }
}

/// The box the preview is fitted into. Images that already fit inside the
/// configured bounds are halved so the preview is always smaller.
pub fn preview_bounds(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        ((width / 2).max(1), (height / 2).max(1))
    } else {
        (max_width, max_height)
    }
}
