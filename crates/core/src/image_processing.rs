//! Image loading and encoding utilities.
//!
//! Source images travel to the model as Base64 text tagged with a content
//! type, and generated candidates come back the same way. This module turns
//! files into that form, checks that they really are PNG or JPEG, and turns
//! candidates back into PNG bytes for saving.

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::ImageFormat;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Content types accepted at the input boundary.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// A Base64 payload plus its content type.
///
/// Used both for the uploaded source and for generated candidates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    /// Base64 (standard alphabet, padded) image bytes.
    pub data: String,
    /// MIME type such as `image/png`.
    pub mime_type: String,
}

/// The uploaded photo. Immutable once set on the controller.
pub type SourceImage = EncodedImage;

impl EncodedImage {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Decodes the Base64 payload back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| AppError::Decode(e.to_string()))
    }

    /// Size of the decoded payload, computed without decoding.
    pub fn approx_len(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

/// Stateless helpers for the encode/decode boundary.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Reads a file and encodes it for the model.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Read`] when the file cannot be read and
    /// [`AppError::UnsupportedFormat`] when it is not PNG or JPEG.
    pub fn load_file(path: impl AsRef<Path>) -> Result<SourceImage> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::encode_bytes(&bytes)
    }

    /// Encodes raw bytes, sniffing the content type from the data itself.
    pub fn encode_bytes(bytes: &[u8]) -> Result<SourceImage> {
        let mime_type = Self::sniff_mime(bytes)?;
        Ok(EncodedImage::new(BASE64.encode(bytes), mime_type))
    }

    /// Returns the accepted MIME type for the bytes, or an error naming
    /// what was found instead.
    pub fn sniff_mime(bytes: &[u8]) -> Result<&'static str> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => Ok("image/png"),
            Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
            Ok(other) => Err(AppError::UnsupportedFormat(format!("{other:?}"))),
            Err(_) => Err(AppError::UnsupportedFormat("not an image".to_string())),
        }
    }

    pub fn is_supported_mime(mime_type: &str) -> bool {
        ACCEPTED_MIME_TYPES.contains(&mime_type)
    }

    /// Produces PNG bytes for a candidate, re-encoding when the model
    /// returned another format.
    pub fn to_png(image: &EncodedImage) -> Result<Vec<u8>> {
        let bytes = image.decode()?;
        if matches!(image::guess_format(&bytes), Ok(ImageFormat::Png)) {
            return Ok(bytes);
        }

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| AppError::image(format!("Failed to decode generated image: {}", e)))?;

        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        decoded
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| AppError::image(format!("Failed to encode image: {}", e)))?;

        Ok(buffer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    pub(crate) fn sample_bytes(format: ImageFormat) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10])));
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    #[test]
    fn encode_png_and_jpeg() {
        let png = ImageProcessor::encode_bytes(&sample_bytes(ImageFormat::Png)).unwrap();
        assert_eq!(png.mime_type, "image/png");

        let jpeg = ImageProcessor::encode_bytes(&sample_bytes(ImageFormat::Jpeg)).unwrap();
        assert_eq!(jpeg.mime_type, "image/jpeg");
    }

    #[test]
    fn rejects_non_images() {
        let err = ImageProcessor::encode_bytes(b"hello, plain text").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn decode_inverts_encode() {
        let bytes = sample_bytes(ImageFormat::Png);
        let encoded = ImageProcessor::encode_bytes(&bytes).unwrap();
        assert_eq!(encoded.decode().unwrap(), bytes);
    }

    #[test]
    fn decode_rejects_garbage() {
        let bad = EncodedImage::new("***", "image/png");
        assert!(matches!(bad.decode(), Err(AppError::Decode(_))));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ImageProcessor::load_file("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, AppError::Read { .. }));
    }

    #[test]
    fn jpeg_candidate_is_converted_to_png() {
        let jpeg = ImageProcessor::encode_bytes(&sample_bytes(ImageFormat::Jpeg)).unwrap();
        let png = ImageProcessor::to_png(&jpeg).unwrap();
        assert!(matches!(image::guess_format(&png), Ok(ImageFormat::Png)));
    }

    #[test]
    fn supported_mime_types() {
        assert!(ImageProcessor::is_supported_mime("image/png"));
        assert!(ImageProcessor::is_supported_mime("image/jpeg"));
        assert!(!ImageProcessor::is_supported_mime("image/gif"));
    }
}
