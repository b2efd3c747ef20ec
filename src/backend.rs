//! Backend abstraction - portable CPU default with optional GPU
//!
//! The default build runs on the NdArray (CPU) backend so the pipeline works
//! everywhere; enable the `wgpu` feature for GPU acceleration.

use burn::backend::Autodiff;

// --------------------------------------------------------------------------------
// BACKEND SELECTION: WGPU (opt-in) or NdArray (default)
// --------------------------------------------------------------------------------

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray;

/// The autodiff wrapper over the default backend, used for the saliency
/// gradient pass. Classification runs on the inner backend via `valid()`.
pub type SaliencyBackend = Autodiff<DefaultBackend>;

/// Get the default device
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    <DefaultBackend as burn::tensor::backend::Backend>::Device::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "WGPU (GPU)"
    }

    #[cfg(not(feature = "wgpu"))]
    {
        "NdArray (CPU)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name_is_nonempty() {
        assert!(!backend_name().is_empty());
    }

    #[test]
    fn test_default_device() {
        // Device construction must not panic on any backend
        let _device = default_device();
    }
}
