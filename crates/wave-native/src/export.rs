use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use wave_core::{PixelBuffer, EXPORT_FILE_PREFIX, EXPORT_MAX_SEQUENCE};

/// First `wavefield_NNN.png` in `dir` that does not exist yet.
pub fn next_export_path(dir: &Path) -> anyhow::Result<PathBuf> {
    (0..=EXPORT_MAX_SEQUENCE)
        .map(|n| dir.join(format!("{}{:03}.png", EXPORT_FILE_PREFIX, n)))
        .find(|p| !p.exists())
        .ok_or_else(|| anyhow!("no free export name left in {}", dir.display()))
}

pub fn save_png(pixels: &PixelBuffer, path: &Path) -> anyhow::Result<()> {
    let image = image::RgbaImage::from_raw(pixels.width, pixels.height, pixels.data.clone())
        .ok_or_else(|| {
            anyhow!(
                "pixel buffer does not match {}x{}",
                pixels.width,
                pixels.height
            )
        })?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", path.display()))
}

/// Save into the next free sequential name under `dir`.
pub fn save_next(pixels: &PixelBuffer, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = next_export_path(dir)?;
    save_png(pixels, &path)?;
    log::info!(
        "[export] saved {}x{} to {}",
        pixels.width,
        pixels.height,
        path.display()
    );
    Ok(path)
}
