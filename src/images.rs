//! Image decode and preview-encoding utilities
//!
//! Handles decoding uploaded image bytes and encoding patch previews as
//! JPEG data URLs for the API response.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};

/// Data-URL prefix for JPEG previews
const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Decode uploaded bytes into an image (any format supported by the `image`
/// crate).
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(data).context("Failed to decode image")
}

/// Encode an image as a `data:image/jpeg;base64,...` URL for embedding in a
/// JSON response.
///
/// The image is flattened to RGB first; the JPEG encoder does not accept an
/// alpha channel.
pub fn jpeg_data_url(img: &DynamicImage) -> Result<String> {
    let rgb = img.to_rgb8();

    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    rgb.write_to(&mut cursor, ImageFormat::Jpeg)
        .context("Failed to encode JPEG preview")?;

    Ok(format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(&buf)))
}

/// Decode a base64 payload (as sent by the web client) into image bytes.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    // Tolerate a data-URL wrapper
    let payload = data
        .rsplit_once("base64,")
        .map(|(_, tail)| tail)
        .unwrap_or(data);
    STANDARD
        .decode(payload.trim())
        .context("Failed to decode base64 image payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_png() -> Vec<u8> {
        let mut img = image::RgbaImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 1, image::Rgba([0, 0, 255, 255]));

        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_decode_valid_png() {
        let png = create_test_png();
        let img = decode_image(&png).unwrap();
        assert_eq!(img.width(), 2);
        assert_eq!(img.height(), 2);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_image(&[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn test_jpeg_data_url_prefix() {
        let png = create_test_png();
        let img = decode_image(&png).unwrap();
        let url = jpeg_data_url(&img).unwrap();
        assert!(url.starts_with(JPEG_DATA_URL_PREFIX));
        assert!(url.len() > JPEG_DATA_URL_PREFIX.len());
    }

    #[test]
    fn test_decode_base64_roundtrip() {
        let png = create_test_png();
        let encoded = STANDARD.encode(&png);
        assert_eq!(decode_base64(&encoded).unwrap(), png);
    }

    #[test]
    fn test_decode_base64_data_url() {
        let png = create_test_png();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&png));
        assert_eq!(decode_base64(&url).unwrap(), png);
    }

    #[test]
    fn test_decode_base64_invalid() {
        assert!(decode_base64("!!not base64!!").is_err());
    }
}
