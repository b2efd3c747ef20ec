//! Image loading and normalization for inference
//!
//! Turns an image file into a normalized `[1, 3, size, size]` tensor the
//! classifier expects, while keeping the full-resolution RGB image around
//! for severity estimation and overlay rendering.

use std::path::Path;

use burn::tensor::{backend::Backend, Tensor};
use image::{imageops::FilterType, RgbImage};

use crate::utils::error::{LeafsightError, Result};

/// ImageNet normalization mean (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization standard deviation (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Default model input edge length in pixels
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Prepares image files for the classifier
#[derive(Debug, Clone)]
pub struct Preprocessor {
    image_size: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
        }
    }
}

impl Preprocessor {
    /// Create a preprocessor with the default input size
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model input edge length
    pub fn with_image_size(mut self, image_size: u32) -> Self {
        self.image_size = image_size;
        self
    }

    /// Model input edge length in pixels
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Load an image file and produce the model input tensor.
    ///
    /// The image is forced to three channels, resized to the model input
    /// size, and normalized per channel with the ImageNet statistics. The
    /// returned `RgbImage` keeps the original resolution.
    pub fn preprocess<B: Backend>(
        &self,
        path: &Path,
        device: &B::Device,
    ) -> Result<(Tensor<B, 4>, RgbImage)> {
        let dynamic = image::open(path)
            .map_err(|e| LeafsightError::ImageLoad(path.to_path_buf(), e.to_string()))?;
        let original = dynamic.to_rgb8();

        let size = self.image_size;
        let resized = image::imageops::resize(&original, size, size, FilterType::Lanczos3);
        let data = normalize_chw(&resized);

        let tensor = Tensor::<B, 1>::from_floats(&data[..], device).reshape([
            1,
            3,
            size as usize,
            size as usize,
        ]);

        Ok((tensor, original))
    }
}

/// Normalize an RGB image into a flat CHW buffer
fn normalize_chw(image: &RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let num_pixels = (width * height) as usize;
    let mut normalized = vec![0.0f32; num_pixels * 3];

    for (i, pixel) in image.pixels().enumerate() {
        let r = (pixel[0] as f32 / 255.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let g = (pixel[1] as f32 / 255.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        let b = (pixel[2] as f32 / 255.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];

        normalized[i] = r;
        normalized[num_pixels + i] = g;
        normalized[2 * num_pixels + i] = b;
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    type TestBackend = burn::backend::NdArray;

    fn save_image(image: &RgbImage, name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        image.save(&path).unwrap();
        (dir, path)
    }

    #[test]
    fn test_preprocess_shape_and_original_resolution() {
        let image = RgbImage::from_pixel(100, 80, Rgb([40, 120, 60]));
        let (_dir, path) = save_image(&image, "leaf.png");

        let device = Default::default();
        let (tensor, original) = Preprocessor::new()
            .preprocess::<TestBackend>(&path, &device)
            .unwrap();

        assert_eq!(tensor.dims(), [1, 3, 224, 224]);
        assert_eq!(original.dimensions(), (100, 80));
    }

    #[test]
    fn test_channel_normalization_values() {
        let image = RgbImage::from_pixel(16, 16, Rgb([255, 0, 0]));
        let (_dir, path) = save_image(&image, "red.png");

        let device = Default::default();
        let preprocessor = Preprocessor::new().with_image_size(8);
        let (tensor, _) = preprocessor.preprocess::<TestBackend>(&path, &device).unwrap();

        let values: Vec<f32> = tensor.into_data().to_vec().unwrap();
        let num_pixels = 64;
        let expected_r = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let expected_g = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        let expected_b = (0.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];

        assert!((values[0] - expected_r).abs() < 1e-3);
        assert!((values[num_pixels] - expected_g).abs() < 1e-3);
        assert!((values[2 * num_pixels] - expected_b).abs() < 1e-3);
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let mut image = RgbImage::new(20, 20);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 12) as u8, (y * 9) as u8, 77]);
        }
        let (_dir, path) = save_image(&image, "pattern.png");

        let device = Default::default();
        let preprocessor = Preprocessor::new().with_image_size(8);
        let (first, _) = preprocessor.preprocess::<TestBackend>(&path, &device).unwrap();
        let (second, _) = preprocessor.preprocess::<TestBackend>(&path, &device).unwrap();

        let first: Vec<f32> = first.into_data().to_vec().unwrap();
        let second: Vec<f32> = second.into_data().to_vec().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_image_load_error() {
        let device = Default::default();
        let result =
            Preprocessor::new().preprocess::<TestBackend>(Path::new("/nonexistent/leaf.png"), &device);

        assert!(matches!(result, Err(LeafsightError::ImageLoad(_, _))));
    }
}
