//! Image handling around the cipher.
//!
//! Imports are re-encoded to PNG before encryption. After decryption the
//! bytes are decoded again; a failure there is the only signal that a record
//! was read with the wrong passphrase or is corrupt.

use std::io::Cursor;
use std::path::Path;

use image::{GenericImageView, ImageFormat};

use crate::error::MediaError;

/// File extensions accepted for import.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Decodes `bytes` and re-encodes them as PNG.
pub fn normalize_to_png(bytes: &[u8]) -> Result<Vec<u8>, MediaError> {
    let format = image::guess_format(bytes)?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(MediaError::Unsupported(format!("{format:?}")));
    }

    let img = image::load_from_memory_with_format(bytes, format)?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Decodes `bytes` fully and reports what was found.
pub fn validate(bytes: &[u8]) -> Result<ImageInfo, MediaError> {
    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = img.dimensions();

    Ok(ImageInfo {
        format,
        width,
        height,
    })
}

#[cfg(test)]
pub(crate) fn sample_image(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_ignore_case() {
        assert!(is_supported_path(Path::new("a.png")));
        assert!(is_supported_path(Path::new("dir/b.JPG")));
        assert!(is_supported_path(Path::new("c.Jpeg")));
        assert!(!is_supported_path(Path::new("d.gif")));
        assert!(!is_supported_path(Path::new("noext")));
    }

    #[test]
    fn jpeg_is_normalized_to_png() {
        let jpeg = sample_image(ImageFormat::Jpeg, 8, 6);
        let png = normalize_to_png(&jpeg).unwrap();

        let info = validate(&png).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((info.width, info.height), (8, 6));
    }

    #[test]
    fn png_stays_png() {
        let png = sample_image(ImageFormat::Png, 3, 4);
        let info = validate(&normalize_to_png(&png).unwrap()).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((info.width, info.height), (3, 4));
    }

    #[test]
    fn garbage_fails_validation() {
        assert!(validate(b"definitely not an image").is_err());
        assert!(normalize_to_png(&[0u8; 64]).is_err());
    }

    #[test]
    fn truncated_png_fails_validation() {
        let png = sample_image(ImageFormat::Png, 16, 16);
        assert!(validate(&png[..png.len() / 2]).is_err());
    }
}
