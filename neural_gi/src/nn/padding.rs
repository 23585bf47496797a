//! Explicit, possibly asymmetric, zero padding for NCHW tensors.
//!
//! Convolutions in this crate are always run with `PaddingConfig2d::Valid`;
//! any padding they need is applied here first. For a total of `p` padded
//! rows the leading side gets `p / 2` and the trailing side the rest.

use burn::prelude::*;

/// Zero padding amounts on each side of the spatial dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding2d {
    /// Rows added above.
    pub top: usize,
    /// Rows added below.
    pub bottom: usize,
    /// Columns added left.
    pub left: usize,
    /// Columns added right.
    pub right: usize,
}

/// Split a total padding into (leading, trailing).
#[inline]
pub fn split_padding(total: usize) -> (usize, usize) {
    let before = total / 2;
    (before, total - before)
}

/// Total padding Keras-style "same" convolutions add along one axis.
///
/// The output length is `ceil(len / stride)`.
pub fn same_padding_total(len: usize, kernel: usize, stride: usize) -> usize {
    let out = len.div_ceil(stride);
    ((out.saturating_sub(1)) * stride + kernel).saturating_sub(len)
}

impl Padding2d {
    /// No padding.
    pub const fn none() -> Self {
        Self {
            top: 0,
            bottom: 0,
            left: 0,
            right: 0,
        }
    }

    /// `kernel - 1` rows and columns, split leading/trailing.
    ///
    /// For stride 1 this is "same" padding, for any kernel parity.
    pub fn for_kernel(kernel: usize) -> Self {
        let (before, after) = split_padding(kernel.saturating_sub(1));
        Self {
            top: before,
            bottom: after,
            left: before,
            right: after,
        }
    }

    /// "Same" padding for a strided convolution over an `height × width` input.
    pub fn same(height: usize, width: usize, kernel: usize, stride: usize) -> Self {
        let (top, bottom) = split_padding(same_padding_total(height, kernel, stride));
        let (left, right) = split_padding(same_padding_total(width, kernel, stride));
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Whether no padding is added.
    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }

    /// Padded spatial size.
    pub fn padded(&self, height: usize, width: usize) -> (usize, usize) {
        (
            height + self.top + self.bottom,
            width + self.left + self.right,
        )
    }

    /// Pad `[batch, channels, height, width]` with zeros.
    pub fn apply<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        if self.is_zero() {
            return x;
        }
        let [n, c, h, w] = x.dims();
        let (ph, pw) = self.padded(h, w);
        let device = x.device();

        Tensor::zeros([n, c, ph, pw], &device).slice_assign(
            [0..n, 0..c, self.top..self.top + h, self.left..self.left + w],
            x,
        )
    }
}
