use crate::error::AppError;
use crate::metadata::{Dimensions, MetadataBlob, RawMetadata, DATE_FORMAT};
use chrono::NaiveDateTime;

const SI_UNITS: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// What ends up on the photo record.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub date_created: NaiveDateTime,
    pub meta_data: String,
}

/// Maps the extractor's raw fields onto the persisted record shape. Without
/// raw metadata the blob is the empty string and the ingestion time is used.
pub fn normalize(
    raw: Option<&RawMetadata>,
    size_bytes: u64,
    ingested_at: NaiveDateTime,
    preview: Dimensions,
) -> Result<Normalized, AppError> {
    let raw = match raw {
        Some(raw) => raw,
        None => {
            return Ok(Normalized {
                date_created: ingested_at,
                meta_data: String::new(),
            })
        }
    };

    let date_created = raw
        .capture_date
        .as_deref()
        .and_then(parse_capture_date)
        .unwrap_or(ingested_at);
    let thumbnail = raw.thumbnail.unwrap_or(preview);

    let blob = MetadataBlob {
        date_created: date_created.format(DATE_FORMAT).to_string(),
        mega_pixels: raw.width.zip(raw.height).map(|(w, h)| mega_pixels(w, h)),
        width: raw.width,
        height: raw.height,
        size: format_bytes(size_bytes),
        device: device(raw.make.as_deref(), raw.model.as_deref()),
        aperture: raw
            .f_number
            .or_else(|| raw.max_aperture_apex.map(apex_to_f_number))
            .map(|f| truncate_decimal(f, 1)),
        focal_length: raw.focal_length,
        iso: raw.iso,
        latitude: raw.latitude.map(|c| c.to_decimal()),
        longitude: raw.longitude.map(|c| c.to_decimal()),
        thumb_width: thumbnail.width,
        thumb_height: thumbnail.height,
    };

    Ok(Normalized {
        date_created,
        meta_data: serde_json::to_string(&blob)?,
    })
}

/// EXIF writes `YYYY:MM:DD HH:MM:SS`; some writers use dashes.
pub fn parse_capture_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, DATE_FORMAT))
        .ok()
}

pub fn mega_pixels(width: u32, height: u32) -> f64 {
    let mp = (width as f64 * height as f64) / 1_000_000.0;
    (mp * 10.0).round() / 10.0
}

pub fn apex_to_f_number(apex: f64) -> f64 {
    2f64.powf(apex / 2.0)
}

/// Cuts `value` to `digits` decimals without rounding: 2.849999 -> "2.8".
pub fn truncate_decimal(value: f64, digits: usize) -> String {
    let repr = value.to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    if digits == 0 {
        return int_part.to_string();
    }
    let frac: String = frac_part
        .chars()
        .chain(std::iter::repeat('0'))
        .take(digits)
        .collect();
    format!("{}.{}", int_part, frac)
}

/// SI magnitude with one decimal: `999 B`, `1.5 kB`, `2.3 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const THRESHOLD: f64 = 1000.0;
    if (bytes as f64) < THRESHOLD {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    loop {
        value /= THRESHOLD;
        if (value * 10.0).round() / 10.0 < THRESHOLD || unit == SI_UNITS.len() - 1 {
            break;
        }
        unit += 1;
    }
    format!("{:.1} {}", value, SI_UNITS[unit])
}

fn device(make: Option<&str>, model: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [make, model].into_iter().flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
