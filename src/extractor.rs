use crate::error::AppError;
use crate::metadata::{Dimensions, GpsCoordinate, RawMetadata};
use exif::{Exif, In, Reader, Tag, Value};
use image::ImageReader;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

/// How an extractor lays out the embedded thumbnail's axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    AsReported,
    /// Height is reported in the width slot and vice versa.
    Swapped,
}

/// kamadak-exif reports IFD1 dimensions in their declared slots.
const THUMBNAIL_AXES: AxisOrder = AxisOrder::AsReported;

/// The only place where an extractor's thumbnail axis quirk is undone.
pub fn correct_thumbnail_axes(reported_width: u32, reported_height: u32, order: AxisOrder) -> Dimensions {
    match order {
        AxisOrder::AsReported => Dimensions { width: reported_width, height: reported_height },
        AxisOrder::Swapped => Dimensions { width: reported_height, height: reported_width },
    }
}

/// Reads the embedded capture metadata of a stored original. `Ok(None)` means
/// the container carries no EXIF block at all.
pub fn extract(path: &Path) -> Result<Option<RawMetadata>, AppError> {
    log::trace!("Extracting EXIF data for image: {:?}", path);
    let file = File::open(path)?;
    let mut buf_reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut buf_reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(container)) => {
            log::debug!("No EXIF data found for {:?} ({})", path, container);
            return Ok(None);
        }
        Err(e) => {
            log::warn!("Could not read EXIF data for {:?}: {}", path, e);
            return Err(e.into());
        }
    };

    let raw = RawMetadata {
        capture_date: ascii(&exif, Tag::DateTimeDigitized, In::PRIMARY)
            .or_else(|| ascii(&exif, Tag::DateTimeOriginal, In::PRIMARY)),
        width: uint(&exif, Tag::PixelXDimension, In::PRIMARY)
            .or_else(|| uint(&exif, Tag::ImageWidth, In::PRIMARY)),
        height: uint(&exif, Tag::PixelYDimension, In::PRIMARY)
            .or_else(|| uint(&exif, Tag::ImageLength, In::PRIMARY)),
        make: ascii(&exif, Tag::Make, In::PRIMARY),
        model: ascii(&exif, Tag::Model, In::PRIMARY),
        f_number: rational(&exif, Tag::FNumber, In::PRIMARY),
        max_aperture_apex: rational(&exif, Tag::MaxApertureValue, In::PRIMARY),
        focal_length: rational(&exif, Tag::FocalLength, In::PRIMARY),
        iso: uint(&exif, Tag::PhotographicSensitivity, In::PRIMARY),
        latitude: gps(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
        longitude: gps(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
        thumbnail: thumbnail_dimensions(&exif)
            .map(|(w, h)| correct_thumbnail_axes(w, h, THUMBNAIL_AXES)),
    };
    log::trace!("Extracted metadata for {:?}: {:?}", path, raw);

    Ok(Some(raw))
}

fn ascii(exif: &Exif, tag: Tag, ifd: In) -> Option<String> {
    match exif.get_field(tag, ifd)?.value {
        Value::Ascii(ref values) => values
            .first()
            .map(|v| String::from_utf8_lossy(v).trim_matches(char::from(0)).trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn uint(exif: &Exif, tag: Tag, ifd: In) -> Option<u32> {
    exif.get_field(tag, ifd)?.value.get_uint(0)
}

fn rational(exif: &Exif, tag: Tag, ifd: In) -> Option<f64> {
    let value = match exif.get_field(tag, ifd)?.value {
        Value::Rational(ref v) if !v.is_empty() => Some(v[0].to_f64()),
        Value::SRational(ref v) if !v.is_empty() => Some(v[0].to_f64()),
        _ => None,
    };
    value.filter(|f| f.is_finite())
}

fn gps(exif: &Exif, tag: Tag, ref_tag: Tag) -> Option<GpsCoordinate> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let parts = match field.value {
        Value::Rational(ref v) if v.len() >= 3 => [v[0].to_f64(), v[1].to_f64(), v[2].to_f64()],
        _ => return None,
    };
    if parts.iter().any(|p| !p.is_finite()) {
        return None;
    }

    Some(GpsCoordinate {
        degrees: parts[0],
        minutes: parts[1],
        seconds: parts[2],
        reference: ascii(exif, ref_tag, In::PRIMARY).and_then(|r| r.chars().next()),
    })
}

/// Dimensions of the embedded (IFD1) thumbnail, from its tags or, failing
/// that, from the header of the embedded JPEG.
fn thumbnail_dimensions(exif: &Exif) -> Option<(u32, u32)> {
    let declared = uint(exif, Tag::ImageWidth, In::THUMBNAIL)
        .zip(uint(exif, Tag::ImageLength, In::THUMBNAIL))
        .or_else(|| {
            uint(exif, Tag::PixelXDimension, In::THUMBNAIL)
                .zip(uint(exif, Tag::PixelYDimension, In::THUMBNAIL))
        });
    if declared.is_some() {
        return declared;
    }

    let offset = uint(exif, Tag::JPEGInterchangeFormat, In::THUMBNAIL)? as usize;
    let length = uint(exif, Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)? as usize;
    let bytes = exif.buf().get(offset..offset.checked_add(length)?)?;

    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
