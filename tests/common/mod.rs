#![allow(dead_code)]

use image::{Rgb, RgbImage};
use photo_ingest::config::AppConfig;
use photo_ingest::upload::UploadCandidate;
use std::io::Cursor;
use std::path::Path;

pub fn config(root: &Path) -> AppConfig {
    let config = AppConfig {
        upload_directory: root.join("uploads").to_string_lossy().to_string(),
        thumbnail_directory: root.join("thumbnails").to_string_lossy().to_string(),
        thumbnail_prefix: "thumb_".to_string(),
        thumbnail_max_width: 32,
        thumbnail_max_height: 32,
        allowed_content_types: ["image/png", "image/jpeg", "image/jpg", "image/webp"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        engine: "memory".to_string(),
        tantivy_index_path: root.join("index").to_string_lossy().to_string(),
        num_workers: 4,
        log_level: "debug".to_string(),
    };
    for dir in config.layout().directories() {
        std::fs::create_dir_all(dir).unwrap();
    }
    config
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, Rgb([120, 80, 40]))
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, Rgb([0, 90, 200]))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// A decodable JPEG carrying the EXIF block from `camera_exif_segment`.
pub fn jpeg_with_exif(width: u32, height: u32) -> Vec<u8> {
    jpeg_with_exif_thumbnail(width, height, EmbeddedThumbnail::Absent)
}

/// Like `jpeg_with_exif`, with an IFD1 describing an embedded thumbnail.
pub fn jpeg_with_exif_thumbnail(width: u32, height: u32, thumbnail: EmbeddedThumbnail) -> Vec<u8> {
    let plain = jpeg_bytes(width, height);
    let mut out = plain[..2].to_vec();
    out.extend(camera_exif_segment(thumbnail));
    out.extend(&plain[2..]);
    out
}

pub enum EmbeddedThumbnail {
    Absent,
    /// IFD1 declares `ImageWidth`/`ImageLength` only.
    Declared(u32, u32),
    /// IFD1 points at these JPEG bytes and declares no dimensions.
    Jpeg(Vec<u8>),
}

pub fn candidate(name: &str, content_type: &str, bytes: Vec<u8>) -> UploadCandidate {
    UploadCandidate {
        original_name: name.to_string(),
        content_type: content_type.to_string(),
        bytes,
    }
}

enum Entry {
    Ascii(u16, &'static str),
    Short(u16, u16),
    Long(u16, u32),
    Rationals(u16, Vec<(u32, u32)>),
}

impl Entry {
    fn encode(&self) -> (u16, u16, u32, Vec<u8>) {
        match self {
            Entry::Ascii(tag, s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                (*tag, 2, bytes.len() as u32, bytes)
            }
            Entry::Short(tag, v) => (*tag, 3, 1, v.to_le_bytes().to_vec()),
            Entry::Long(tag, v) => (*tag, 4, 1, v.to_le_bytes().to_vec()),
            Entry::Rationals(tag, values) => {
                let mut bytes = Vec::new();
                for (num, den) in values {
                    bytes.extend(num.to_le_bytes());
                    bytes.extend(den.to_le_bytes());
                }
                (*tag, 5, values.len() as u32, bytes)
            }
        }
    }
}

fn ifd_len(entries: &[Entry]) -> usize {
    let data: usize = entries
        .iter()
        .map(|e| e.encode().3.len())
        .filter(|len| *len > 4)
        .map(|len| len + len % 2)
        .sum();
    2 + 12 * entries.len() + 4 + data
}

/// Appends an IFD at the current end of the little-endian TIFF buffer `out`,
/// linking to the IFD at `next` (0 ends the chain).
fn write_ifd(out: &mut Vec<u8>, entries: &[Entry], next: u32) {
    let start = out.len();
    let mut data_offset = start + 2 + 12 * entries.len() + 4;
    let mut data = Vec::new();

    out.extend((entries.len() as u16).to_le_bytes());
    for entry in entries {
        let (tag, kind, count, mut bytes) = entry.encode();
        out.extend(tag.to_le_bytes());
        out.extend(kind.to_le_bytes());
        out.extend(count.to_le_bytes());
        if bytes.len() <= 4 {
            bytes.resize(4, 0);
            out.extend(bytes);
        } else {
            out.extend((data_offset as u32).to_le_bytes());
            if bytes.len() % 2 == 1 {
                bytes.push(0);
            }
            data_offset += bytes.len();
            data.extend(bytes);
        }
    }
    out.extend(next.to_le_bytes());
    out.extend(data);
}

/// APP1 segment for a "Canon EOS 5D" shot: f/2.849999, ISO 400, 50 mm,
/// 4000x3000, taken 2019:07:04 10:20:30 at 40°26'46" N, 79°58'56" W.
pub fn camera_exif_segment(thumbnail: EmbeddedThumbnail) -> Vec<u8> {
    let exif_ifd = vec![
        Entry::Rationals(0x829D, vec![(2_849_999, 1_000_000)]),
        Entry::Short(0x8827, 400),
        Entry::Ascii(0x9004, "2019:07:04 10:20:30"),
        Entry::Rationals(0x920A, vec![(50, 1)]),
        Entry::Long(0xA002, 4000),
        Entry::Long(0xA003, 3000),
    ];
    let gps_ifd = vec![
        Entry::Ascii(0x0001, "N"),
        Entry::Rationals(0x0002, vec![(40, 1), (26, 1), (46, 1)]),
        Entry::Ascii(0x0003, "W"),
        Entry::Rationals(0x0004, vec![(79, 1), (58, 1), (56, 1)]),
    ];

    let mut ifd0 = vec![
        Entry::Ascii(0x010F, "Canon"),
        Entry::Ascii(0x0110, "EOS 5D"),
        Entry::Long(0x8769, 0),
        Entry::Long(0x8825, 0),
    ];
    let exif_offset = 8 + ifd_len(&ifd0);
    let gps_offset = exif_offset + ifd_len(&exif_ifd);
    let ifd1_offset = gps_offset + ifd_len(&gps_ifd);
    ifd0[2] = Entry::Long(0x8769, exif_offset as u32);
    ifd0[3] = Entry::Long(0x8825, gps_offset as u32);

    let (ifd1, jpeg) = match thumbnail {
        EmbeddedThumbnail::Absent => (Vec::new(), Vec::new()),
        EmbeddedThumbnail::Declared(w, h) => (vec![Entry::Long(0x0100, w), Entry::Long(0x0101, h)], Vec::new()),
        EmbeddedThumbnail::Jpeg(bytes) => {
            let entries = vec![Entry::Long(0x0201, 0), Entry::Long(0x0202, bytes.len() as u32)];
            let jpeg_offset = ifd1_offset + ifd_len(&entries);
            let entries = vec![
                Entry::Long(0x0201, jpeg_offset as u32),
                Entry::Long(0x0202, bytes.len() as u32),
            ];
            (entries, bytes)
        }
    };
    let next = if ifd1.is_empty() { 0 } else { ifd1_offset as u32 };

    let mut tiff = b"II*\0".to_vec();
    tiff.extend(8u32.to_le_bytes());
    write_ifd(&mut tiff, &ifd0, next);
    write_ifd(&mut tiff, &exif_ifd, 0);
    write_ifd(&mut tiff, &gps_ifd, 0);
    if !ifd1.is_empty() {
        assert_eq!(tiff.len(), ifd1_offset);
        write_ifd(&mut tiff, &ifd1, 0);
        tiff.extend(jpeg);
    }

    let mut segment = vec![0xFF, 0xE1];
    segment.extend(((2 + 6 + tiff.len()) as u16).to_be_bytes());
    segment.extend(b"Exif\0\0");
    segment.extend(tiff);
    segment
}
