mod cpu_kernel;

use crate::{
    dtypes::Dtype,
    shapes::Shape,
    tensor::{Error, Storage, Tensor},
};

/// Dimension and scale record handed to device kernels.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct RoiPoolOp {
    pub temporal_scale: f64,
    pub batch: usize,
    pub chan: usize,
    pub length: usize,
    pub height: usize,
    pub width: usize,
    pub num_rois: usize,
    pub pooled_l: usize,
    pub pooled_h: usize,
    pub pooled_w: usize,
}

pub trait RoiPoolKernel<E: Dtype>: Storage<E> + Storage<i64> {
    fn alloc(&self, s: Shape) -> Result<Tensor<E, Self>, Error>;

    fn alloc_argmax(&self, s: Shape) -> Result<Tensor<i64, Self>, Error>;

    fn forward(
        &self,
        op: RoiPoolOp,
        features: &Tensor<E, Self>,
        rois: &Tensor<E, Self>,
        out: &mut Tensor<E, Self>,
        argmax: &mut Tensor<i64, Self>,
    ) -> Result<(), Error>;

    fn backward(
        &self,
        op: RoiPoolOp,
        rois: &Tensor<E, Self>,
        argmax: &Tensor<i64, Self>,
        grad_out: &Tensor<E, Self>,
        grad_inp: &mut Tensor<E, Self>,
    ) -> Result<(), Error>;
}

/// Temporal region-of-interest max pooling.
///
/// Pools a 5d feature volume `(batch, channels, length, height, width)` into
/// a fixed `(pooled_l, pooled_h, pooled_w)` grid per region. Regions are
/// `(batch index, start, end)` temporal spans given in units that
/// `temporal_scale` converts into feature-volume frames; the spatial axes are
/// always pooled over the full height/width, partitioned evenly.
///
/// The forward pass returns the pooled maxima together with an argmax volume
/// recording, per pooled cell, the flat index of the winning position inside
/// that region's batch element (or `-1` for a cell whose bin was empty, in
/// which case the pooled value is `0`). The backward pass consumes the argmax
/// volume unchanged and accumulates upstream gradients into the recorded
/// positions.
///
/// ```rust
/// # use troi_core::prelude::*;
/// let dev: Cpu = Default::default();
/// // one batch element, one channel, four frames of 1x1 features
/// let features = dev.tensor((vec![1.0f32, 3.0, 2.0, 5.0], [1, 1, 4, 1, 1]));
/// // one region covering frames [0, 4) of batch element 0
/// let rois = dev.tensor((vec![0.0f32, 0.0, 4.0], [1, 3]));
/// let pool = RoiPool::new((2, 1, 1), 1.0);
///
/// let (out, argmax) = pool.forward(&features, &rois);
/// assert_eq!(out.as_vec(), [3.0, 5.0]);
/// assert_eq!(argmax.as_vec(), [1, 3]);
///
/// let grad_out = dev.tensor((vec![1.0f32, 2.0], [1, 1, 2, 1, 1]));
/// let grad = pool.backward(&grad_out, &rois, &argmax, features.shape());
/// assert_eq!(grad.as_vec(), [0.0, 1.0, 0.0, 2.0]);
/// ```
#[derive(Debug, Copy, Clone)]
pub struct RoiPool {
    pub pooled_l: usize,
    pub pooled_h: usize,
    pub pooled_w: usize,
    /// Converts region start/end coordinates into feature-volume frames.
    pub temporal_scale: f64,
}

impl RoiPool {
    pub fn new(pooled: (usize, usize, usize), temporal_scale: f64) -> Self {
        Self {
            pooled_l: pooled.0,
            pooled_h: pooled.1,
            pooled_w: pooled.2,
            temporal_scale,
        }
    }

    /// See [RoiPool::try_forward]. Panics on failure.
    pub fn forward<E: Dtype, D: RoiPoolKernel<E>>(
        &self,
        features: &Tensor<E, D>,
        rois: &Tensor<E, D>,
    ) -> (Tensor<E, D>, Tensor<i64, D>) {
        self.try_forward(features, rois).unwrap()
    }

    /// Pools `features` under every region in `rois`, returning the pooled
    /// volume and the argmax volume, both shaped
    /// `(num_rois, channels, pooled_l, pooled_h, pooled_w)`.
    ///
    /// `features` must be a contiguous rank 5 tensor and `rois` a contiguous
    /// `(num_rois, 3)` tensor of `(batch index, start, end)` rows whose batch
    /// indices name existing batch elements.
    pub fn try_forward<E: Dtype, D: RoiPoolKernel<E>>(
        &self,
        features: &Tensor<E, D>,
        rois: &Tensor<E, D>,
    ) -> Result<(Tensor<E, D>, Tensor<i64, D>), Error> {
        let op = self.op_for(features.shape(), rois.shape())?;
        if !features.is_contiguous() || !rois.is_contiguous() {
            return Err(Error::NonContiguous);
        }
        let pooled = Shape::from([op.num_rois, op.chan, op.pooled_l, op.pooled_h, op.pooled_w]);
        let mut out: Tensor<E, D> = features.device.alloc(pooled.clone())?;
        let mut argmax: Tensor<i64, D> = features.device.alloc_argmax(pooled)?;
        features
            .device
            .forward(op, features, rois, &mut out, &mut argmax)?;
        Ok((out, argmax))
    }

    /// See [RoiPool::try_backward]. Panics on failure.
    pub fn backward<E: Dtype, D: RoiPoolKernel<E>>(
        &self,
        grad_out: &Tensor<E, D>,
        rois: &Tensor<E, D>,
        argmax: &Tensor<i64, D>,
        input_shape: &Shape,
    ) -> Tensor<E, D> {
        self.try_backward(grad_out, rois, argmax, input_shape)
            .unwrap()
    }

    /// Scatters `grad_out` back into a zeroed gradient volume shaped like
    /// `input_shape`, adding each cell's upstream value at the position its
    /// argmax recorded. Cells whose argmax is `-1` contribute nothing;
    /// positions won by several cells receive the sum of their gradients.
    ///
    /// `argmax` must come from a forward call of this same configuration:
    /// its shape has to match `grad_out` exactly, and `grad_out` has to match
    /// the configured pooled dims.
    pub fn try_backward<E: Dtype, D: RoiPoolKernel<E>>(
        &self,
        grad_out: &Tensor<E, D>,
        rois: &Tensor<E, D>,
        argmax: &Tensor<i64, D>,
        input_shape: &Shape,
    ) -> Result<Tensor<E, D>, Error> {
        let op = self.op_for(input_shape, rois.shape())?;
        let pooled = Shape::from([op.num_rois, op.chan, op.pooled_l, op.pooled_h, op.pooled_w]);
        if grad_out.shape() != &pooled {
            return Err(Error::ShapeMismatch {
                expected: pooled.dims().to_vec(),
                found: grad_out.shape().dims().to_vec(),
            });
        }
        if argmax.shape() != grad_out.shape() {
            return Err(Error::ShapeMismatch {
                expected: grad_out.shape().dims().to_vec(),
                found: argmax.shape().dims().to_vec(),
            });
        }
        if !grad_out.is_contiguous() || !rois.is_contiguous() || !argmax.is_contiguous() {
            return Err(Error::NonContiguous);
        }
        let mut grad_inp: Tensor<E, D> = grad_out.device.alloc(input_shape.clone())?;
        grad_out
            .device
            .backward(op, rois, argmax, grad_out, &mut grad_inp)?;
        Ok(grad_inp)
    }

    fn op_for(&self, features: &Shape, rois: &Shape) -> Result<RoiPoolOp, Error> {
        if features.rank() != 5 {
            return Err(Error::WrongRank {
                expected: 5,
                found: features.rank(),
            });
        }
        if rois.rank() != 2 {
            return Err(Error::WrongRank {
                expected: 2,
                found: rois.rank(),
            });
        }
        let size_rois = rois.dims()[1];
        if size_rois != 3 {
            return Err(Error::WrongRoiSize { found: size_rois });
        }
        let dims = features.dims();
        Ok(RoiPoolOp {
            temporal_scale: self.temporal_scale,
            batch: dims[0],
            chan: dims[1],
            length: dims[2],
            height: dims[3],
            width: dims[4],
            num_rois: rois.dims()[0],
            pooled_l: self.pooled_l,
            pooled_h: self.pooled_h,
            pooled_w: self.pooled_w,
        })
    }
}
