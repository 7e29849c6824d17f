//! PDF rasterizing and preview encoding
//!
//! The rasterizer only turns the first page of a PDF into pixels. Flattening,
//! resizing and PNG encoding happen in [`encode_preview`], which is the same
//! for every backend.

use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Decodes the first page of a PDF into a raster image
#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    /// Render page one at roughly `width` pixels wide
    async fn first_page(&self, pdf: Bytes, width: u32) -> MediaResult<DynamicImage>;

    /// Whether the backend can run in this environment
    async fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}

/// Rasterizer backed by poppler's `pdftoppm`
pub struct PdftoppmRasterizer {
    program: String,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl PdfRasterizer for PdftoppmRasterizer {
    async fn first_page(&self, pdf: Bytes, width: u32) -> MediaResult<DynamicImage> {
        // Render at twice the target width so the final downscale stays sharp
        let render_width = width.saturating_mul(2).to_string();

        let mut child = Command::new(&self.program)
            .args(["-f", "1", "-l", "1", "-singlefile", "-png"])
            .args(["-scale-to-x", render_width.as_str(), "-scale-to-y", "-1"])
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::Rasterize(format!("{}: {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::Rasterize("stdin not captured".to_string()))?;

        // Feed stdin concurrently; a large PDF would otherwise fill the pipe
        // while pdftoppm blocks on a full stdout
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&pdf).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MediaError::Rasterize(e.to_string()))?;

        if let Ok(Err(e)) = writer.await {
            debug!(error = %e, "pdftoppm closed stdin early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Rasterize(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(image::load_from_memory(&output.stdout)?)
    }

    async fn is_available(&self) -> bool {
        match Command::new(&self.program)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(program = %self.program, error = %e, "PDF rasterizer not found");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "pdftoppm"
    }
}

/// Encoded preview ready to be stored
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Flatten onto white, resize to `width` keeping the aspect ratio, and
/// encode as PNG
pub fn encode_preview(image: &DynamicImage, width: u32) -> MediaResult<PreviewImage> {
    let width = width.max(1);
    let height = scaled_height(image.width(), image.height(), width);

    let flat = flatten(image);
    let resized = image::imageops::resize(&flat, width, height, FilterType::Lanczos3);

    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, PngFilter::Adaptive);
    DynamicImage::ImageRgb8(resized).write_with_encoder(encoder)?;

    Ok(PreviewImage {
        bytes: Bytes::from(buf),
        width,
        height,
    })
}

fn scaled_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    if src_width == 0 {
        return 1;
    }
    let height = (u64::from(src_height) * u64::from(width) + u64::from(src_width) / 2)
        / u64::from(src_width);
    height.clamp(1, u64::from(u32::MAX)) as u32
}

/// Composite every pixel over an opaque white background
fn flatten(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(400, 566, 200), 283);
        assert_eq!(scaled_height(200, 100, 200), 100);
        assert_eq!(scaled_height(1000, 1, 200), 1);
        assert_eq!(scaled_height(0, 10, 200), 1);
    }

    #[test]
    fn test_encode_preview_is_opaque_png() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            400,
            600,
            Rgba([0, 0, 0, 0]),
        ));

        let preview = encode_preview(&source, 200).unwrap();
        assert_eq!((preview.width, preview.height), (200, 300));
        assert_eq!(&preview.bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&preview.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (200, 300));
        assert!(!decoded.color().has_alpha());
        assert_eq!(decoded.to_rgb8().get_pixel(10, 10).0, [255, 255, 255]);
    }

    #[test]
    fn test_flatten_keeps_opaque_pixels() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten(&source).get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let rasterizer = PdftoppmRasterizer::new("/nonexistent/pdftoppm-missing");
        assert!(!rasterizer.is_available().await);

        let result = rasterizer
            .first_page(Bytes::from_static(b"%PDF-1.4"), 200)
            .await;
        assert!(matches!(result, Err(MediaError::Rasterize(_))));
    }
}
