//! Saliency overlay rendering
//!
//! Renders the saliency grid as a jet-style heat layer alpha-blended over
//! the original image and writes it next to other prediction artifacts.
//! The output filename is derived from the source image name, so repeated
//! predictions for the same file overwrite the same artifact.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

use crate::inference::saliency::SaliencyGrid;
use crate::utils::error::Result;

/// Blend weight of the heat layer over the source image
const OVERLAY_ALPHA: f32 = 0.4;

/// Jet-style color anchors from cold to hot
const HEAT_ANCHORS: [(f32, [f32; 3]); 6] = [
    (0.0, [0.0, 0.0, 128.0]),
    (0.15, [0.0, 0.0, 255.0]),
    (0.35, [0.0, 255.0, 255.0]),
    (0.65, [255.0, 255.0, 0.0]),
    (0.85, [255.0, 0.0, 0.0]),
    (1.0, [128.0, 0.0, 0.0]),
];

/// Map a saliency value in `[0, 1]` to a heat color
fn heat_color(value: f32) -> Rgb<u8> {
    let value = value.clamp(0.0, 1.0);

    let mut color = HEAT_ANCHORS[HEAT_ANCHORS.len() - 1].1;
    for window in HEAT_ANCHORS.windows(2) {
        let (x0, c0) = window[0];
        let (x1, c1) = window[1];
        if value <= x1 {
            let t = if x1 > x0 { (value - x0) / (x1 - x0) } else { 0.0 };
            color = [
                c0[0] + (c1[0] - c0[0]) * t,
                c0[1] + (c1[1] - c0[1]) * t,
                c0[2] + (c1[2] - c0[2]) * t,
            ];
            break;
        }
    }

    Rgb([
        color[0].round() as u8,
        color[1].round() as u8,
        color[2].round() as u8,
    ])
}

/// Deterministic overlay path derived from the source image name
pub fn artifact_path(output_dir: &Path, source_path: &Path) -> PathBuf {
    let stem = source_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("image");

    output_dir.join(format!("{}_saliency.png", stem))
}

/// Render the heat overlay at the original resolution and write it under
/// the output directory, creating the directory if needed.
///
/// The drawing buffer lives only for the duration of this call.
pub fn render(
    original: &RgbImage,
    saliency: &SaliencyGrid,
    output_dir: &Path,
    source_path: &Path,
) -> Result<PathBuf> {
    let (width, height) = original.dimensions();
    let saliency = saliency.resize(width, height);

    fs::create_dir_all(output_dir)?;
    let path = artifact_path(output_dir, source_path);

    let mut canvas = RgbImage::new(width, height);
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let base = original.get_pixel(x, y);
        let heat = heat_color(saliency.value(x, y));

        let mut blended = [0u8; 3];
        for c in 0..3 {
            let value = OVERLAY_ALPHA * heat[c] as f32 + (1.0 - OVERLAY_ALPHA) * base[c] as f32;
            blended[c] = value.round() as u8;
        }
        *pixel = Rgb(blended);
    }

    canvas.save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(0.0), Rgb([0, 0, 128]));
        assert_eq!(heat_color(1.0), Rgb([128, 0, 0]));
    }

    #[test]
    fn test_heat_color_midpoint_is_warm() {
        let mid = heat_color(0.5);
        assert_eq!(mid[1], 255);
        assert_eq!(mid[0], mid[2]);
    }

    #[test]
    fn test_heat_color_clamps_out_of_range() {
        assert_eq!(heat_color(-1.0), heat_color(0.0));
        assert_eq!(heat_color(2.0), heat_color(1.0));
    }

    #[test]
    fn test_artifact_path_uses_source_stem() {
        let path = artifact_path(Path::new("static/saliency"), Path::new("uploads/photo.jpg"));
        assert_eq!(path, Path::new("static/saliency/photo_saliency.png"));
    }

    #[test]
    fn test_artifact_path_without_stem_falls_back() {
        let path = artifact_path(Path::new("out"), Path::new("/"));
        assert_eq!(path, Path::new("out/image_saliency.png"));
    }

    #[test]
    fn test_render_writes_blended_image() {
        let original = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let grid = SaliencyGrid::normalized(vec![0.0; 4], 2, 2).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = render(&original, &grid, dir.path(), Path::new("leaf.png")).unwrap();

        assert!(path.exists());
        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (4, 4));
        // Cold heat color over black: 0.4 * (0, 0, 128)
        assert_eq!(written.get_pixel(0, 0), &Rgb([0, 0, 51]));
    }

    #[test]
    fn test_render_creates_output_directory() {
        let original = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let grid = SaliencyGrid::normalized(vec![0.0, 1.0, 1.0, 0.0], 2, 2).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("static").join("saliency");
        let path = render(&original, &grid, &nested, Path::new("scan.jpeg")).unwrap();

        assert!(nested.is_dir());
        assert_eq!(path.file_name().unwrap(), "scan_saliency.png");
    }
}
