//! Burn inference backend for box-prompted segmentation.
//!
//! This module provides a `BurnSegmenter` that implements `SegmentationOracle`
//! for running mask-producing models built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use boxmask_rs::oracle::{BurnMaskModel, BurnSegmenter};
//! use burn::backend::NdArray;
//!
//! // Implement BurnMaskModel for your segmentation model
//! struct MyMaskModel { /* ... */ }
//!
//! impl BurnMaskModel<NdArray> for MyMaskModel {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> burn::tensor::Tensor<NdArray, 3> {
//!         // Run inference, return [instances, height, width] logits
//!     }
//! }
//!
//! let model = MyMaskModel::load("model.bin");
//! let segmenter = BurnSegmenter::new(model, Default::default());
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array3;

use crate::error::OracleError;
use crate::oracle::{IntoRegionMasks, RegionMask, SegmentationOracle};

/// Trait for Burn-based mask models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnMaskModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [1, 3, height, width], values in [0, 1]
    ///
    /// # Returns
    /// Mask logits of shape [instances, height, width] at the input resolution.
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 3>;

    /// Get the expected input size (height, width).
    fn input_size(&self) -> (u32, u32) {
        (1024, 1024) // Default SAM-style input size
    }
}

/// Burn-based segmenter implementing `SegmentationOracle`.
pub struct BurnSegmenter<B: Backend, M: BurnMaskModel<B>> {
    model: M,
    device: B::Device,
    logit_threshold: f32,
}

impl<B: Backend, M: BurnMaskModel<B>> BurnSegmenter<B, M> {
    /// Create a new Burn segmenter with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            logit_threshold: 0.0,
        }
    }

    /// Set the logit above which a pixel counts as foreground.
    pub fn with_logit_threshold(mut self, threshold: f32) -> Self {
        self.logit_threshold = threshold;
        self
    }

    /// Resize the crop to the model input and lay it out as [1, C, H, W].
    fn preprocess(&self, crop: &RgbImage) -> Tensor<B, 4> {
        let (target_h, target_w) = self.model.input_size();
        let resized = imageops::resize(crop, target_w, target_h, FilterType::Triangle);

        let plane = (target_h * target_w) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                data[c * plane + i] = pixel.0[c] as f32 / 255.0;
            }
        }

        Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            3,
            target_h as usize,
            target_w as usize,
        ])
    }

    /// Threshold logits and bring each mask back to the crop resolution.
    fn postprocess(
        &self,
        logits: Tensor<B, 3>,
        crop_width: u32,
        crop_height: u32,
    ) -> Result<Vec<RegionMask>, OracleError> {
        let [instances, height, width] = logits.dims();
        let values: Vec<f32> = logits
            .into_data()
            .to_vec()
            .map_err(|e| OracleError::Backend(format!("{e:?}")))?;

        let (crop_h, crop_w) = (crop_height as usize, crop_width as usize);
        let threshold = self.logit_threshold;
        let stacked = Array3::from_shape_fn((instances, crop_h, crop_w), |(n, y, x)| {
            // Nearest-neighbour sample from model resolution.
            let sy = (y * height / crop_h).min(height - 1);
            let sx = (x * width / crop_w).min(width - 1);
            values[(n * height + sy) * width + sx] > threshold
        });

        Ok(stacked.into_region_masks())
    }
}

impl<B: Backend, M: BurnMaskModel<B>> SegmentationOracle for BurnSegmenter<B, M>
where
    B::Device: Send + Sync,
{
    fn predict(&self, crop: &RgbImage) -> Result<Vec<RegionMask>, OracleError> {
        let (width, height) = crop.dimensions();
        if width == 0 || height == 0 {
            return Err(OracleError::InvalidInput(format!(
                "crop has no pixels ({width}x{height})"
            )));
        }

        let tensor = self.preprocess(crop);
        let logits = self.model.forward(tensor);

        let [_, h, w] = logits.dims();
        if h == 0 || w == 0 {
            return Err(OracleError::Backend(format!(
                "model returned empty masks ({w}x{h})"
            )));
        }
        self.postprocess(logits, width, height)
    }

    fn name(&self) -> &str {
        "burn"
    }
}
