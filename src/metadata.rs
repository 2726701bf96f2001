// src/metadata.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Textual timestamp format shared by capture dates and ingestion fallbacks.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type PhotoId = Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: PhotoId,
    pub name: String,
    pub date_created: NaiveDateTime,
    pub meta_data: String,
    pub trashed: bool,
}

/// A photo record before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub name: String,
    pub date_created: NaiveDateTime,
    pub meta_data: String,
}

impl NewPhoto {
    pub fn into_photo(self, id: PhotoId) -> Photo {
        Photo {
            id,
            name: self.name,
            date_created: self.date_created,
            meta_data: self.meta_data,
            trashed: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FaceDescriptor {
    pub id: Uuid,
    pub label: String,
    pub descriptors: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFaceDescriptor {
    pub label: String,
    pub descriptors: Vec<Vec<f64>>,
}

impl NewFaceDescriptor {
    pub fn into_face(self, id: Uuid) -> FaceDescriptor {
        FaceDescriptor {
            id,
            label: self.label,
            descriptors: self.descriptors,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A GPS coordinate in degree/minute/second form with its hemisphere reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsCoordinate {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub reference: Option<char>,
}

impl GpsCoordinate {
    /// Signed decimal degrees; southern and western references are negative.
    pub fn to_decimal(&self) -> f64 {
        let value = self.degrees + self.minutes / 60.0 + self.seconds / 3600.0;
        match self.reference.map(|r| r.to_ascii_uppercase()) {
            Some('S') | Some('W') => -value,
            _ => value,
        }
    }
}

/// Embedded capture fields as read from an image container. Any subset may be
/// missing; defaults are applied by the normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    pub capture_date: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub f_number: Option<f64>,
    pub max_aperture_apex: Option<f64>,
    pub focal_length: Option<f64>,
    pub iso: Option<u32>,
    pub latitude: Option<GpsCoordinate>,
    pub longitude: Option<GpsCoordinate>,
    /// Embedded thumbnail dimensions, already axis-corrected.
    pub thumbnail: Option<Dimensions>,
}

/// Serialized into `Photo::meta_data`. Absent values are omitted from the JSON.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataBlob {
    pub date_created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mega_pixels: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub thumb_width: u32,
    pub thumb_height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gps_conversion_matches_known_coordinates() {
        let lat = GpsCoordinate { degrees: 40.0, minutes: 26.0, seconds: 46.0, reference: Some('N') };
        assert!((lat.to_decimal() - 40.4461).abs() < 0.0001);

        let lon = GpsCoordinate { degrees: 79.0, minutes: 58.0, seconds: 56.0, reference: Some('W') };
        assert!((lon.to_decimal() - (-79.9822)).abs() < 0.0001);
    }

    #[test]
    fn gps_without_reference_is_positive() {
        let coord = GpsCoordinate { degrees: 10.0, minutes: 30.0, seconds: 0.0, reference: None };
        assert_eq!(coord.to_decimal(), 10.5);
    }

    #[test]
    fn new_photo_starts_untrashed() {
        let created = NaiveDateTime::parse_from_str("2024-05-21 12:30:00", DATE_FORMAT).unwrap();
        let photo = NewPhoto {
            name: "a.jpg".into(),
            date_created: created,
            meta_data: String::new(),
        }
        .into_photo(Uuid::new_v4());
        assert!(!photo.trashed);
        assert_eq!(photo.name, "a.jpg");
    }
}
