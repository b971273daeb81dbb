//! Image I/O operations service
//!
//! Keeps file and stream handling out of the pipeline so the stages only
//! ever see decoded buffers or raw bytes.

use crate::error::{CompositeError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Falls back to content sniffing when the extension does not match the
    /// actual format.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use showroom_compose::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("photo.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    /// - Neither extension-based nor content-based decoding succeeds
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(CompositeError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );
                let data = Self::read_bytes(path_ref)?;
                image::load_from_memory(&data).map_err(|content_err| {
                    CompositeError::stage_error(
                        "image loading",
                        &format!(
                            "{}: extension error: {}; content error: {}",
                            path_ref.display(),
                            e,
                            content_err
                        ),
                    )
                })
            },
        }
    }

    /// Load an optional asset (background template, logo)
    ///
    /// Missing or undecodable assets are logged and yield `None`.
    #[must_use]
    pub fn load_asset<P: AsRef<Path>>(path: P) -> Option<DynamicImage> {
        match Self::load_image(path.as_ref()) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!(
                    "Asset {} unavailable ({}); using fallback",
                    path.as_ref().display(),
                    e
                );
                None
            },
        }
    }

    /// Read a file fully into memory
    ///
    /// # Errors
    /// Returns `CompositeError::Io` carrying the path.
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        std::fs::read(path_ref).map_err(|e| CompositeError::file_io_error("read", path_ref, &e))
    }

    /// Write bytes to a file, creating parent directories as needed
    ///
    /// # Errors
    /// Returns `CompositeError::Io` carrying the path.
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CompositeError::file_io_error("create output directory", parent, &e)
            })?;
        }
        std::fs::write(path_ref, bytes).map_err(|e| CompositeError::file_io_error("write", path_ref, &e))
    }

    /// Whether a path has an extension the pipeline can decode
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| {
                matches!(
                    ext.as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif"
                )
            })
    }

    /// Decode an image from bytes
    ///
    /// # Errors
    /// Returns `CompositeError::Processing` when the bytes are not a
    /// decodable image.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| {
            CompositeError::processing(format!("Failed to decode image from bytes: {}", e))
        })
    }

    /// Read all bytes from an async reader
    ///
    /// # Examples
    /// ```rust,no_run
    /// use showroom_compose::services::ImageIOService;
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let file = File::open("photo.jpg").await?;
    /// let bytes = ImageIOService::read_from_reader(file).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns `CompositeError::Io` when the stream fails.
    pub async fn read_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
        Ok(buffer)
    }

    /// Write encoded bytes to an async writer and flush it
    ///
    /// # Errors
    /// Returns `CompositeError::Io` when the stream fails.
    pub async fn write_to_writer<W: tokio::io::AsyncWrite + Unpin>(
        bytes: &[u8],
        mut writer: W,
    ) -> Result<u64> {
        use tokio::io::AsyncWriteExt;

        AsyncWriteExt::write_all(&mut writer, bytes).await?;
        AsyncWriteExt::flush(&mut writer).await?;
        Ok(bytes.len() as u64)
    }

    /// Encode an RGBA buffer as PNG
    ///
    /// # Errors
    /// Returns `CompositeError::Image` if encoding fails.
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }
}
