// SPDX-License-Identifier: MIT OR Apache-2.0
//! PNG export of computed artifacts.

use image::{ImageBuffer, Luma, Rgba};
use std::path::Path;
use terrain_engine_graph::{Artifact, Heightfield, Image};

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Encoding or writing failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Nothing to write
    #[error("Artifact has no pixels")]
    Empty,
}

/// Write a heightfield as a 16-bit grayscale PNG, stretched to the full range
pub fn export_heightfield(field: &Heightfield, path: &Path) -> Result<(), ExportError> {
    if field.data().is_empty() {
        return Err(ExportError::Empty);
    }
    let (lo, hi) = (field.min(), field.max());
    let range = hi - lo;
    let buffer = ImageBuffer::from_fn(field.width(), field.height(), |x, y| {
        let t = if range > f32::EPSILON { (field.sample(x, y) - lo) / range } else { 0.5 };
        Luma([(t.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16])
    });
    buffer.save(path)?;
    tracing::info!("Exported heightfield to {}", path.display());
    Ok(())
}

/// Write an RGBA image (channels in `[0, 1]`) as an 8-bit PNG
pub fn export_image(image: &Image, path: &Path) -> Result<(), ExportError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ExportError::Empty);
    }
    let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        Rgba(image.pixel(x, y).unwrap_or([0.0; 4]).map(to_byte))
    });
    buffer.save(path)?;
    tracing::info!("Exported image to {}", path.display());
    Ok(())
}

/// Write whichever artifact kind was computed
pub fn export_artifact(artifact: &Artifact, path: &Path) -> Result<(), ExportError> {
    match artifact {
        Artifact::Heightfield(field) => export_heightfield(field, path),
        Artifact::Image(image) => export_image(image, path),
    }
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heightfield_png() {
        let field = Heightfield::from_fn(8, 4, |x, _| x as f32);
        let path = std::env::temp_dir().join(format!("terrain_export_{}.png", std::process::id()));
        export_heightfield(&field, &path).unwrap();

        let decoded = image::open(&path).unwrap().into_luma16();
        std::fs::remove_file(&path).ok();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.get_pixel(0, 0)[0], 0);
        assert_eq!(decoded.get_pixel(7, 3)[0], u16::MAX);
    }

    #[test]
    fn test_image_png_keeps_alpha() {
        let mut texture = Image::new(2, 1);
        texture.set_pixel(1, 0, [1.0, 0.5, 0.0, 0.25]);
        let path = std::env::temp_dir().join(format!("terrain_export_rgba_{}.png", std::process::id()));
        export_artifact(&Artifact::Image(texture), &path).unwrap();

        let decoded = image::open(&path).unwrap().into_rgba8();
        std::fs::remove_file(&path).ok();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 128, 0, 64]);
    }

    #[test]
    fn test_empty_heightfield_rejected() {
        let path = std::env::temp_dir().join("terrain_export_empty.png");
        assert!(matches!(
            export_heightfield(&Heightfield::new(0, 0), &path),
            Err(ExportError::Empty)
        ));
    }
}
