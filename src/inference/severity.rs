//! Severity estimation from saliency and leaf masking
//!
//! Severity is the share of leaf pixels whose saliency activation exceeds
//! a threshold. Bright background pixels are excluded by a grayscale leaf
//! mask; when the mask is empty the ratio falls back to the full image so
//! the estimate stays defined.

use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::inference::overlay;
use crate::inference::round2;
use crate::inference::saliency::SaliencyGrid;
use crate::utils::error::Result;

/// Epsilon guarding the severity denominator
pub const SEVERITY_EPS: f64 = 1e-9;

/// Thresholds for severity estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// Grayscale brightness (0..1) below which a pixel counts as leaf
    pub brightness_threshold: f32,
    /// Saliency activation (0..1) above which a leaf pixel counts as diseased
    pub activation_threshold: f32,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: 0.95,
            activation_threshold: 0.25,
        }
    }
}

/// Boolean mask separating leaf tissue from bright background
#[derive(Debug, Clone)]
pub struct LeafMask {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl LeafMask {
    /// Mark pixels darker than the brightness threshold as leaf
    pub fn from_image(image: &RgbImage, brightness_threshold: f32) -> Self {
        let gray = image::imageops::grayscale(image);
        let (width, height) = gray.dimensions();
        let pixels = gray
            .pixels()
            .map(|p| (p[0] as f32 / 255.0) < brightness_threshold)
            .collect();

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Mask width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether a pixel belongs to the leaf
    pub fn is_leaf(&self, x: u32, y: u32) -> bool {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Number of leaf pixels
    pub fn foreground_count(&self) -> usize {
        self.pixels.iter().filter(|&&leaf| leaf).count()
    }
}

/// Estimates disease severity and renders the saliency overlay
#[derive(Debug, Clone, Default)]
pub struct SeverityEstimator {
    config: SeverityConfig,
}

impl SeverityEstimator {
    /// Create an estimator with explicit thresholds
    pub fn new(config: SeverityConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &SeverityConfig {
        &self.config
    }

    /// Severity percentage in `[0, 100]`, rounded to 2 decimals.
    ///
    /// The saliency grid is resampled to the original resolution, masked
    /// to the leaf, and thresholded; the diseased count is taken over leaf
    /// pixels, or over the whole image when no pixel passes the mask.
    pub fn score(&self, saliency: &SaliencyGrid, original: &RgbImage) -> f64 {
        let (width, height) = original.dimensions();
        let saliency = saliency.resize(width, height);
        let mask = LeafMask::from_image(original, self.config.brightness_threshold);

        let mut diseased = 0usize;
        for y in 0..height {
            for x in 0..width {
                let value = if mask.is_leaf(x, y) {
                    saliency.value(x, y)
                } else {
                    0.0
                };
                if value > self.config.activation_threshold {
                    diseased += 1;
                }
            }
        }

        let leaf_pixels = mask.foreground_count();
        let denominator = if leaf_pixels > 0 {
            leaf_pixels
        } else {
            saliency.values().len()
        };

        round2(diseased as f64 / (denominator as f64 + SEVERITY_EPS) * 100.0)
    }

    /// Estimate severity and render the overlay artifact.
    ///
    /// Returns the severity percentage and the path of the written overlay.
    pub fn estimate(
        &self,
        saliency: &SaliencyGrid,
        original: &RgbImage,
        output_dir: &Path,
        source_path: &Path,
    ) -> Result<(f64, PathBuf)> {
        let severity = self.score(saliency, original);
        let artifact = overlay::render(original, saliency, output_dir, source_path)?;

        Ok((severity, artifact))
    }
}
