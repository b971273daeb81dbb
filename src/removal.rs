//! Boundary to the external background-removal service
//!
//! The service receives an encoded JPEG of the pre-padded photo and answers
//! with a PNG cutout that carries an alpha channel and a rendered ground
//! shadow. Transport, authentication and retries belong to the implementor.

use crate::error::{CompositeError, Result};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, RgbImage};

/// Quality used when encoding the padded photo for the service
pub const REMOVAL_JPEG_QUALITY: u8 = 95;

/// External background-removal call
///
/// Implementations must be callable from several threads at once; the
/// pipeline itself never retries or times out a call.
pub trait BackgroundRemover: Send + Sync {
    /// Turn an encoded photo into PNG-with-alpha bytes
    ///
    /// # Errors
    /// Any failure aborts the current request.
    fn remove_background(&self, encoded: &[u8]) -> Result<Vec<u8>>;
}

impl<F> BackgroundRemover for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync,
{
    fn remove_background(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        self(encoded)
    }
}

/// Encode the pre-padded photo for the service
///
/// # Errors
/// Returns `CompositeError::Image` if encoding fails.
pub fn encode_for_removal(padded: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, REMOVAL_JPEG_QUALITY);
    encoder.encode_image(padded)?;
    Ok(buffer)
}

/// Decode and sanity-check a service response
///
/// # Errors
/// Returns `CompositeError::Removal` when the response is empty, is not a
/// PNG, cannot be decoded or has zero size.
pub fn decode_cutout(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(CompositeError::removal("service returned an empty response"));
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => {},
        Ok(other) => {
            return Err(CompositeError::removal(format!(
                "expected a PNG cutout, got {:?}",
                other
            )))
        },
        Err(e) => {
            return Err(CompositeError::removal(format!(
                "unrecognized response ({} bytes): {}",
                bytes.len(),
                e
            )))
        },
    }

    let cutout = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| CompositeError::removal(format!("malformed PNG cutout: {}", e)))?;
    if cutout.width() == 0 || cutout.height() == 0 {
        return Err(CompositeError::removal("service returned a zero-size cutout"));
    }
    Ok(cutout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_closures_are_removers() {
        let remover = |encoded: &[u8]| -> Result<Vec<u8>> { Ok(encoded.to_vec()) };
        assert_eq!(remover.remove_background(b"abc").unwrap(), b"abc");

        let boxed: Box<dyn BackgroundRemover> =
            Box::new(|_: &[u8]| -> Result<Vec<u8>> { Err(CompositeError::removal("HTTP 503")) });
        assert!(boxed.remove_background(b"x").unwrap_err().is_removal_failure());
    }

    #[test]
    fn test_encode_for_removal_is_jpeg() {
        let padded = RgbImage::from_pixel(32, 20, Rgb([128, 128, 128]));
        let bytes = encode_for_removal(&padded).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_decode_cutout_keeps_alpha() {
        let cutout = RgbaImage::from_pixel(10, 6, Rgba([5, 5, 5, 77]));
        let decoded = decode_cutout(&png_bytes(&cutout)).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 77);
    }

    #[test]
    fn test_malformed_responses_are_removal_errors() {
        assert!(decode_cutout(&[]).unwrap_err().is_removal_failure());
        assert!(decode_cutout(b"<html>502 Bad Gateway</html>")
            .unwrap_err()
            .is_removal_failure());

        let jpeg = encode_for_removal(&RgbImage::new(4, 4)).unwrap();
        let err = decode_cutout(&jpeg).unwrap_err();
        assert!(err.is_removal_failure());
        assert!(err.to_string().contains("PNG"));

        // Valid signature, truncated body
        let mut truncated = png_bytes(&RgbaImage::new(8, 8));
        truncated.truncate(20);
        assert!(decode_cutout(&truncated).unwrap_err().is_removal_failure());
    }
}
