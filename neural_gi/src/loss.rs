//! Reconstruction loss for predicted geometry images.
//!
//! - Masked: `mean((target - prediction)² · (mask + 1))`, so background pixels
//!   keep weight 1 and foreground pixels weigh up to 2
//! - Unmasked: plain mean squared error

use burn::prelude::*;

use crate::config::LossConfig;
use crate::error::{NeuralGiError, Result};

/// Loss calculator.
#[derive(Debug, Clone)]
pub struct MaskedLoss {
    config: LossConfig,
}

impl MaskedLoss {
    /// Create a new loss calculator.
    pub fn new(config: LossConfig) -> Self {
        Self { config }
    }

    /// Whether a mask is required.
    pub fn uses_mask(&self) -> bool {
        self.config.use_mask
    }

    /// Reject a mask-less batch up front, before any forward pass.
    pub fn check_batch(&self, has_mask: bool) -> Result<()> {
        if self.config.use_mask && !has_mask {
            Err(NeuralGiError::MissingMask)
        } else {
            Ok(())
        }
    }

    /// Compute the loss.
    ///
    /// Inputs:
    /// - prediction, target: [batch, channels, height, width]
    /// - mask: [batch, 1, height, width], broadcast over channels
    ///
    /// Output: scalar loss, shape [1]
    ///
    /// Fails with `MissingMask` when masks are enabled and none is given, and
    /// with `ShapeMismatch` when the tensors disagree. A mask passed while
    /// masks are disabled is ignored.
    pub fn compute<B: Backend>(
        &self,
        prediction: Tensor<B, 4>,
        target: Tensor<B, 4>,
        mask: Option<Tensor<B, 4>>,
    ) -> Result<Tensor<B, 1>> {
        check_shape(&target.dims(), &prediction.dims())?;
        if !self.config.use_mask {
            return Ok(mse(prediction, target));
        }
        let mask = mask.ok_or(NeuralGiError::MissingMask)?;

        let diff = target - prediction;
        let squared = diff.clone() * diff;
        let [n, _, h, w] = squared.dims();
        check_shape(&[n, 1, h, w], &mask.dims())?;

        // [N, 1, H, W] broadcasts over the channel axis.
        Ok((squared * mask.add_scalar(1.0)).mean())
    }
}

fn check_shape(expected: &[usize], got: &[usize]) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(NeuralGiError::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        })
    }
}

/// Mean squared error.
pub fn mse<B: Backend>(prediction: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    let diff = target - prediction;
    (diff.clone() * diff).mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar()
    }

    #[test]
    fn test_unmasked_is_mse() {
        let device = Default::default();
        let loss = MaskedLoss::new(LossConfig::new().with_use_mask(false));

        let pred = Tensor::<TestBackend, 4>::zeros([1, 3, 2, 2], &device);
        let target = Tensor::<TestBackend, 4>::full([1, 3, 2, 2], 0.5, &device);

        let value = scalar(loss.compute(pred, target, None).unwrap());
        assert!((value - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_missing_mask_is_an_error() {
        let device = Default::default();
        let loss = MaskedLoss::new(LossConfig::new());
        let pred = Tensor::<TestBackend, 4>::zeros([1, 3, 2, 2], &device);
        let result = loss.compute(pred.clone(), pred, None);
        assert!(matches!(result, Err(NeuralGiError::MissingMask)));
    }

    #[test]
    fn test_full_mask_doubles_loss() {
        let device = Default::default();
        let loss = MaskedLoss::new(LossConfig::new());

        let pred = Tensor::<TestBackend, 4>::zeros([2, 3, 4, 4], &device);
        let target = Tensor::<TestBackend, 4>::full([2, 3, 4, 4], 0.5, &device);
        let mask = Tensor::<TestBackend, 4>::ones([2, 1, 4, 4], &device);

        let value = scalar(loss.compute(pred, target, Some(mask)).unwrap());
        assert!((value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch() {
        let device = Default::default();
        let loss = MaskedLoss::new(LossConfig::new());
        let pred = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);
        let target = Tensor::<TestBackend, 4>::zeros([1, 3, 2, 2], &device);
        assert!(matches!(
            loss.compute(pred.clone(), target, None),
            Err(NeuralGiError::ShapeMismatch { .. })
        ));

        let bad_mask = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);
        assert!(matches!(
            loss.compute(pred.clone(), pred, Some(bad_mask)),
            Err(NeuralGiError::ShapeMismatch { .. })
        ));
    }
}
