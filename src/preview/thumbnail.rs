//! Display-sized previews of catalog images
//!
//! Decoding is only used to show the image. The labelling session never
//! decodes files and never rejects an image because it fails to decode.

use image::imageops::FilterType;
use image::GenericImageView;
use std::path::Path;
use tracing::debug;

/// Largest size an image is shown at (width, height)
pub const MAX_DISPLAY_SIZE: (u32, u32) = (900, 650);

/// Decoded RGBA pixels ready for the viewer
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode and downscale an image without blocking the UI
pub async fn load_preview(path: String) -> Result<PreviewImage, String> {
    // Spawn blocking because decoding is CPU-intensive
    tokio::task::spawn_blocking(move || load_preview_blocking(&path))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

/// Blocking implementation of preview loading
pub fn load_preview_blocking(path: &str) -> Result<PreviewImage, String> {
    let file = Path::new(path);

    // Verify file exists
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()));
    }

    let img = image::open(file).map_err(|e| format!("Could not load image: {}", e))?;

    let (width, height) = img.dimensions();
    let (fit_width, fit_height) = fit_within(width, height, MAX_DISPLAY_SIZE);

    // Only shrink; small images are shown as-is
    let img = if (fit_width, fit_height) != (width, height) {
        img.resize_exact(fit_width, fit_height, FilterType::Lanczos3)
    } else {
        img
    };

    let rgba = img.to_rgba8();
    debug!(
        "📸 Preview {}x{} -> {}x{}: {}",
        width,
        height,
        rgba.width(),
        rgba.height(),
        file.display()
    );

    Ok(PreviewImage {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

/// Largest size with the same aspect ratio that fits in `bounds`, never upscaled
pub fn fit_within(width: u32, height: u32, bounds: (u32, u32)) -> (u32, u32) {
    let (max_width, max_height) = bounds;
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let fit_width = ((width as f64 * scale).floor() as u32).max(1);
    let fit_height = ((height as f64 * scale).floor() as u32).max(1);
    (fit_width, fit_height)
}
