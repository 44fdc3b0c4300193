//! Fixed-stride decimation of the aligned sequence.

use std::num::NonZeroUsize;

/// Default decimation step
pub const DEFAULT_STRIDE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(stride) => stride,
    None => NonZeroUsize::MIN,
};

/// Keeps every `stride`-th point, starting with the first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downsampler {
    stride: NonZeroUsize,
}

impl Default for Downsampler {
    fn default() -> Self {
        Self::new(DEFAULT_STRIDE)
    }
}

impl Downsampler {
    pub fn new(stride: NonZeroUsize) -> Self {
        Self { stride }
    }

    pub fn stride(&self) -> NonZeroUsize {
        self.stride
    }

    /// Output length for `n` input points: `ceil(n / stride)`
    pub fn output_len(&self, n: usize) -> usize {
        n.div_ceil(self.stride.get())
    }

    /// Positions `0, stride, 2 * stride, ...`; points are not modified
    pub fn apply<T>(&self, points: Vec<T>) -> Vec<T> {
        let input = points.len();
        let output: Vec<T> = points.into_iter().step_by(self.stride.get()).collect();
        tracing::trace!(input, output = output.len(), stride = self.stride.get(), "downsampled");
        metrics::histogram!("sync_downsampled_points").record(output.len() as f64);
        output
    }
}
