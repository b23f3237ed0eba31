use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    dtypes::Dtype,
    shapes::Shape,
    tensor::{Cpu, Error, Tensor, ZerosTensor},
};

use super::{RoiPoolKernel, RoiPoolOp};

/// A region proposal decoded from one row of the region tensor.
#[derive(Debug, Copy, Clone)]
struct Region {
    batch: usize,
    start: f64,
    end: f64,
}

impl RoiPoolOp {
    /// Pooled cells written per region.
    fn cells_per_roi(&self) -> usize {
        self.chan * self.pooled_l * self.pooled_h * self.pooled_w
    }

    /// Elements in one batch element of the feature volume.
    fn cells_per_batch(&self) -> usize {
        self.chan * self.length * self.height * self.width
    }

    /// Temporal window of a region in feature frames, half-open. May be empty
    /// or fall outside the volume.
    #[inline(always)]
    fn temporal_window(&self, region: &Region) -> (isize, isize) {
        let start = (region.start * self.temporal_scale).round() as isize;
        let end = (region.end * self.temporal_scale).round() as isize;
        (start, end - start)
    }

    /// Source frames `[lo, hi)` covered by temporal bin `pl` of a window.
    #[inline(always)]
    fn temporal_bin(&self, start: isize, span: isize, pl: usize) -> std::ops::Range<usize> {
        let scale = span as f64 / self.pooled_l as f64;
        let lo = start + (pl as f64 * scale).floor() as isize;
        let hi = start + ((pl + 1) as f64 * scale).ceil() as isize;
        let lo = lo.clamp(0, self.length as isize) as usize;
        let hi = hi.clamp(0, self.length as isize) as usize;
        lo..hi
    }
}

/// Evenly partitions a full source axis into `bins` ranges. Neighboring bins
/// overlap by one element when `bins` does not divide `axis`.
#[inline(always)]
fn spatial_bin(axis: usize, bins: usize, i: usize) -> std::ops::Range<usize> {
    let lo = (i * axis) / bins;
    let hi = ((i + 1) * axis + bins - 1) / bins;
    lo..hi.min(axis)
}

fn parse_regions<E: Dtype>(op: &RoiPoolOp, rois: &[E]) -> Result<Vec<Region>, Error> {
    let mut regions = Vec::with_capacity(op.num_rois);
    for (i, row) in rois.chunks_exact(3).enumerate() {
        let batch = row[0].to_f64().unwrap();
        if !(batch >= 0.0 && batch < op.batch as f64) {
            return Err(Error::RoiBatchOutOfRange {
                roi: i,
                batch_index: batch as i64,
                batch_size: op.batch,
            });
        }
        regions.push(Region {
            batch: batch as usize,
            start: row[1].to_f64().unwrap(),
            end: row[2].to_f64().unwrap(),
        });
    }
    Ok(regions)
}

/// Max-pools every bin of one region. `features` is the region's batch
/// element, `out`/`argmax` the region's chunk of the output volumes.
fn pool_region<E: Dtype + num_traits::Float>(
    op: &RoiPoolOp,
    region: &Region,
    features: &[E],
    out: &mut [E],
    argmax: &mut [i64],
) {
    let (start, span) = op.temporal_window(region);
    let mut cell = 0;
    for c in 0..op.chan {
        for pl in 0..op.pooled_l {
            let frames = op.temporal_bin(start, span, pl);
            for ph in 0..op.pooled_h {
                let rows = spatial_bin(op.height, op.pooled_h, ph);
                for pw in 0..op.pooled_w {
                    let cols = spatial_bin(op.width, op.pooled_w, pw);
                    let mut best = E::neg_infinity();
                    let mut best_idx: i64 = -1;
                    // scan order fixes which position wins a tie
                    for l in frames.clone() {
                        for h in rows.clone() {
                            for w in cols.clone() {
                                let idx = ((c * op.length + l) * op.height + h) * op.width + w;
                                let v = features[idx];
                                if best_idx < 0 || v > best {
                                    best = v;
                                    best_idx = idx as i64;
                                }
                            }
                        }
                    }
                    out[cell] = if best_idx < 0 { E::default() } else { best };
                    argmax[cell] = best_idx;
                    cell += 1;
                }
            }
        }
    }
}

impl<E: Dtype + num_traits::Float> RoiPoolKernel<E> for Cpu {
    fn alloc(&self, s: Shape) -> Result<Tensor<E, Self>, Error> {
        self.try_zeros_like(&s)
    }

    fn alloc_argmax(&self, s: Shape) -> Result<Tensor<i64, Self>, Error> {
        self.try_zeros_like(&s)
    }

    fn forward(
        &self,
        op: RoiPoolOp,
        features: &Tensor<E, Self>,
        rois: &Tensor<E, Self>,
        out: &mut Tensor<E, Self>,
        argmax: &mut Tensor<i64, Self>,
    ) -> Result<(), Error> {
        let regions = parse_regions(&op, rois.data.as_ref())?;
        let cells = op.cells_per_roi();
        if op.num_rois == 0 || cells == 0 {
            return Ok(());
        }
        let per_batch = op.cells_per_batch();
        let feats = features.data.as_ref().as_slice();
        let out_buf = Arc::make_mut(&mut out.data);
        let arg_buf = Arc::make_mut(&mut argmax.data);
        out_buf
            .par_chunks_mut(cells)
            .zip(arg_buf.par_chunks_mut(cells))
            .zip(regions.par_iter())
            .for_each(|((out_roi, arg_roi), region)| {
                let batch = &feats[region.batch * per_batch..][..per_batch];
                pool_region(&op, region, batch, out_roi, arg_roi);
            });
        Ok(())
    }

    fn backward(
        &self,
        op: RoiPoolOp,
        rois: &Tensor<E, Self>,
        argmax: &Tensor<i64, Self>,
        grad_out: &Tensor<E, Self>,
        grad_inp: &mut Tensor<E, Self>,
    ) -> Result<(), Error> {
        let regions = parse_regions(&op, rois.data.as_ref())?;
        let per_batch = op.cells_per_batch();
        let indices = argmax.data.as_ref().as_slice();
        if let Some(&bad) = indices.iter().find(|&&i| i >= per_batch as i64) {
            return Err(Error::ArgmaxOutOfRange {
                found: bad,
                limit: per_batch,
            });
        }
        if per_batch == 0 {
            return Ok(());
        }
        let cells = op.cells_per_roi();
        let upstream = grad_out.data.as_ref().as_slice();
        let grad = Arc::make_mut(&mut grad_inp.data);
        // each worker owns one batch element; colliding contributions within
        // it are summed serially
        grad.par_chunks_mut(per_batch)
            .enumerate()
            .for_each(|(b, grad_batch)| {
                for (r, region) in regions.iter().enumerate() {
                    if region.batch != b {
                        continue;
                    }
                    let base = r * cells;
                    for (i, &idx) in indices[base..base + cells].iter().enumerate() {
                        if idx >= 0 {
                            grad_batch[idx as usize] += upstream[base + i];
                        }
                    }
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_with(length: usize, pooled_l: usize, temporal_scale: f64) -> RoiPoolOp {
        RoiPoolOp {
            temporal_scale,
            batch: 1,
            chan: 1,
            length,
            height: 1,
            width: 1,
            num_rois: 1,
            pooled_l,
            pooled_h: 1,
            pooled_w: 1,
        }
    }

    #[test]
    fn test_spatial_bin_partitions_evenly() {
        assert_eq!(spatial_bin(4, 2, 0), 0..2);
        assert_eq!(spatial_bin(4, 2, 1), 2..4);
        // uneven split: neighboring bins overlap by one element
        assert_eq!(spatial_bin(5, 2, 0), 0..3);
        assert_eq!(spatial_bin(5, 2, 1), 2..5);
        assert_eq!(spatial_bin(1, 3, 1), 0..1);
    }

    #[test]
    fn test_temporal_bins_cover_window() {
        let op = op_with(8, 2, 1.0);
        let (start, span) = op.temporal_window(&Region {
            batch: 0,
            start: 2.0,
            end: 6.0,
        });
        assert_eq!((start, span), (2, 4));
        assert_eq!(op.temporal_bin(start, span, 0), 2..4);
        assert_eq!(op.temporal_bin(start, span, 1), 4..6);
    }

    #[test]
    fn test_temporal_window_applies_scale_and_rounds() {
        let op = op_with(8, 1, 0.25);
        let (start, span) = op.temporal_window(&Region {
            batch: 0,
            start: 5.0,
            end: 14.0,
        });
        // 5 * 0.25 = 1.25 -> 1, 14 * 0.25 = 3.5 -> 4
        assert_eq!((start, span), (1, 3));
    }

    #[test]
    fn test_temporal_bin_clamps_to_volume() {
        let op = op_with(3, 2, 1.0);
        // window [-2, 2): the first bin falls entirely before frame 0
        assert_eq!(op.temporal_bin(-2, 4, 0), 0..0);
        assert_eq!(op.temporal_bin(-2, 4, 1), 0..2);
        // degenerate window
        assert_eq!(op.temporal_bin(1, 0, 0), 1..1);
        assert_eq!(op.temporal_bin(1, 0, 1), 1..1);
    }

    #[test]
    fn test_parse_regions_rejects_bad_batch_index() {
        let op = op_with(4, 1, 1.0);
        let err = parse_regions::<f32>(&op, &[2.0, 0.0, 4.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::RoiBatchOutOfRange {
                roi: 0,
                batch_index: 2,
                batch_size: 1
            }
        ));
        let err = parse_regions::<f32>(&op, &[-1.0, 0.0, 4.0]).unwrap_err();
        assert!(matches!(err, Error::RoiBatchOutOfRange { .. }));
    }
}
