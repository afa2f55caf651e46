//! Image conversion: format sniffing, EXIF GPS extraction and
//! aspect-preserving multi-resolution downscaling.
//!
//! Unsupported input is not an error: whatever bytes came in go out again
//! as a single verbatim `original` variant, and the pipeline stores them
//! untouched.

use std::collections::BTreeMap;
use std::io::Cursor;

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use crate::models::{Coordinates, ImageVariant};

/// Ascending target boxes for the downscaled renditions.
const TARGET_SIZES: &[(u32, u32)] = &[(320, 180), (768, 432), (1280, 720), (1920, 1080)];

/// Formats the converter decodes; anything else passes through verbatim.
const SUPPORTED: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Result of converting one image payload.
#[derive(Debug, Clone, Default)]
pub struct ConvertedImage {
    /// Variants keyed by size label (`"original"`, `"640x360"`, ...).
    pub variants: BTreeMap<String, ImageVariant>,
    pub gps: Option<Coordinates>,
    pub width: u32,
    pub height: u32,
    pub landscape: bool,
}

impl ConvertedImage {
    fn passthrough(data: &[u8], name: &str) -> Self {
        let mut converted = ConvertedImage::default();
        converted.variants.insert(
            "original".to_string(),
            ImageVariant {
                data: data.to_vec(),
                width: 0,
                height: 0,
                landscape: false,
                filename: variant_filename("original", name),
                mime_type: String::new(),
            },
        );
        converted
    }
}

/// Convert one image payload into its stored variants.
///
/// Decoded images yield the four target renditions where the source is
/// large enough (never upscaled), a full-resolution JPEG when the source
/// was not JPEG already, and the verbatim `original`. GPS coordinates are
/// extracted from EXIF when present.
pub fn convert(data: &[u8], name: &str) -> ConvertedImage {
    let mime = infer::get(data).map(|kind| kind.mime_type()).unwrap_or_default();
    if !SUPPORTED.contains(&mime) {
        debug!(name, mime, "unsupported image format, passing through");
        return ConvertedImage::passthrough(data, name);
    }

    let decoded = match image::load_from_memory(data) {
        Ok(img) => img,
        Err(err) => {
            debug!(name, mime, error = %err, "image failed to decode, passing through");
            return ConvertedImage::passthrough(data, name);
        }
    };

    let (width, height) = (decoded.width(), decoded.height());
    let landscape = width > height;

    let mut converted = ConvertedImage {
        gps: extract_gps(data),
        width,
        height,
        landscape,
        ..Default::default()
    };

    for &(target_w, target_h) in TARGET_SIZES {
        let fits = if landscape { width >= target_w } else { height >= target_h };
        if !fits {
            continue;
        }
        let (new_w, new_h) = scaled_size(width, height, landscape, target_w, target_h);
        let rendition = decoded.resize_exact(new_w, new_h, FilterType::Lanczos3);
        if let Some(jpeg) = encode_jpeg(&rendition) {
            let label = format!("{new_w}x{new_h}");
            converted.variants.insert(
                label.clone(),
                ImageVariant {
                    data: jpeg,
                    width: new_w,
                    height: new_h,
                    landscape,
                    filename: variant_filename(&label, name),
                    mime_type: "image/jpeg".to_string(),
                },
            );
        }
    }

    // A full-size JPEG rendition when the source uses another codec.
    if mime != "image/jpeg" {
        if let Some(jpeg) = encode_jpeg(&decoded) {
            converted.variants.insert(
                "original-size-jpeg".to_string(),
                ImageVariant {
                    data: jpeg,
                    width,
                    height,
                    landscape,
                    filename: variant_filename("original-size-jpeg", name),
                    mime_type: "image/jpeg".to_string(),
                },
            );
        }
    }

    converted.variants.insert(
        "original".to_string(),
        ImageVariant {
            data: data.to_vec(),
            width,
            height,
            landscape,
            filename: variant_filename("original", name),
            mime_type: mime.to_string(),
        },
    );

    converted
}

/// Scale the non-dominant axis to preserve the aspect ratio exactly.
fn scaled_size(width: u32, height: u32, landscape: bool, target_w: u32, target_h: u32) -> (u32, u32) {
    if landscape {
        let new_h = (height as f64 * target_w as f64 / width as f64).round() as u32;
        (target_w, new_h.max(1))
    } else {
        let new_w = (width as f64 * target_h as f64 / height as f64).round() as u32;
        (new_w.max(1), target_h)
    }
}

fn encode_jpeg(img: &DynamicImage) -> Option<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    match rgb.write_to(&mut buffer, image::ImageFormat::Jpeg) {
        Ok(()) => Some(buffer.into_inner()),
        Err(err) => {
            debug!(error = %err, "JPEG encode failed");
            None
        }
    }
}

fn variant_filename(label: &str, name: &str) -> String {
    format!("{label}-{name}")
}

/// Best-effort EXIF GPS extraction. Absence of EXIF data is the normal
/// case, not an error.
fn extract_gps(data: &[u8]) -> Option<Coordinates> {
    let exif = exif::Reader::new().read_from_container(&mut Cursor::new(data)).ok()?;

    let lat = dms_to_decimal(exif.get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)?)?;
    let lon = dms_to_decimal(exif.get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)?)?;

    let lat_sign = match reference(exif.get_field(exif::Tag::GPSLatitudeRef, exif::In::PRIMARY)) {
        Some('S') => -1.0,
        _ => 1.0,
    };
    let lon_sign = match reference(exif.get_field(exif::Tag::GPSLongitudeRef, exif::In::PRIMARY)) {
        Some('W') => -1.0,
        _ => 1.0,
    };

    Some(Coordinates { lat: lat * lat_sign, lon: lon * lon_sign })
}

/// Degrees/minutes/seconds to signed decimal degrees.
fn dms_to_decimal(field: &exif::Field) -> Option<f64> {
    match &field.value {
        exif::Value::Rational(parts) if parts.len() >= 3 => {
            let d = parts[0].to_f64();
            let m = parts[1].to_f64();
            let s = parts[2].to_f64();
            Some(d + m / 60.0 + s / 3600.0)
        }
        _ => None,
    }
}

fn reference(field: Option<&exif::Field>) -> Option<char> {
    match &field?.value {
        exif::Value::Ascii(values) => values
            .first()
            .and_then(|v| v.first())
            .map(|b| *b as char),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 64x32 single-color JPEG built through the image crate itself.
    fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 10, 30]),
        ));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Jpeg).unwrap();
        buffer.into_inner()
    }

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([0, 80, 200]),
        ));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn unsupported_bytes_pass_through_verbatim() {
        let data = b"%PDF-1.4 definitely not an image";
        let converted = convert(data, "report.pdf");
        assert_eq!(converted.variants.len(), 1);
        let original = &converted.variants["original"];
        assert_eq!(original.data, data);
        assert!(original.mime_type.is_empty());
        assert!(converted.gps.is_none());
    }

    #[test]
    fn small_image_is_never_upscaled() {
        let converted = convert(&sample_jpeg(64, 32), "klein.jpg");
        // Too small for every target box: only the verbatim original.
        assert_eq!(converted.variants.len(), 1);
        assert!(converted.variants.contains_key("original"));
        assert_eq!(converted.width, 64);
        assert!(converted.landscape);
    }

    #[test]
    fn landscape_source_scales_to_fitting_boxes_only() {
        let converted = convert(&sample_jpeg(800, 400), "breed.jpg");
        // Dominant axis 800 fits the 320 and 768 boxes, not 1280/1920.
        assert!(converted.variants.contains_key("320x160"));
        assert!(converted.variants.contains_key("768x384"));
        assert_eq!(converted.variants.len(), 3); // + original

        for variant in converted.variants.values() {
            assert!(variant.width <= 800 && variant.height <= 400);
        }
    }

    #[test]
    fn aspect_ratio_is_preserved_within_a_pixel() {
        let (width, height) = (1000u32, 750u32);
        let converted = convert(&sample_jpeg(width, height), "ratio.jpg");
        let source_ratio = width as f64 / height as f64;
        for (label, variant) in &converted.variants {
            if label == "original" {
                continue;
            }
            let ratio = variant.width as f64 / variant.height as f64;
            let tolerance = 1.0 / variant.height as f64;
            assert!(
                (ratio - source_ratio).abs() <= tolerance,
                "variant {label} ratio {ratio} drifts from {source_ratio}"
            );
        }
    }

    #[test]
    fn portrait_source_uses_height_as_dominant_axis() {
        let converted = convert(&sample_jpeg(300, 600), "hoog.jpg");
        // Height 600 fits the 180 and 432 boxes.
        assert!(converted.variants.contains_key("90x180"));
        assert!(converted.variants.contains_key("216x432"));
        assert!(!converted.landscape);
    }

    #[test]
    fn non_jpeg_source_gains_full_size_jpeg_rendition() {
        let converted = convert(&sample_png(64, 64), "vierkant.png");
        let full = converted.variants.get("original-size-jpeg").expect("jpeg rendition");
        assert_eq!(full.mime_type, "image/jpeg");
        assert_eq!((full.width, full.height), (64, 64));
        assert_eq!(converted.variants["original"].mime_type, "image/png");
    }
}
