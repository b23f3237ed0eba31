//! # troi-core
//!
//! Temporal region-of-interest (ROI) max pooling for video feature volumes,
//! written entirely in rust.
//!
//! The crate implements one fused operator pair: a forward pass that pools a
//! 5d feature volume `(batch, channels, length, height, width)` into a fixed
//! size grid per region proposal, and a backward pass that routes upstream
//! gradients through the positions that won the max.
//!
//! # Tensors & devices
//!
//! *See [tensor] for more information.*
//!
//! A [tensor::Tensor] is an owned, dense, row-major nd-array with a runtime
//! [shapes::Shape] and a device type parameter. Devices allocate tensors and
//! execute the ops on them; [tensor::Cpu] is the device this crate ships.
//!
//! ```rust
//! # use troi_core::prelude::*;
//! let dev: Cpu = Default::default();
//! let features: Tensor<f32, _> = dev.sample_normal_like(&Shape::from([1, 8, 16, 7, 7]));
//! ```
//!
//! # The operator
//!
//! *See [tensor_ops] for more information.*
//!
//! Region proposals are `(batch index, start, end)` temporal spans; start and
//! end are multiplied by a `temporal_scale` to land in feature-volume frames.
//! Each region is pooled over `pooled_l` temporal bins and a
//! `pooled_h x pooled_w` partition of the full spatial extent:
//!
//! ```rust
//! # use troi_core::prelude::*;
//! let dev: Cpu = Default::default();
//! let features = dev.tensor((vec![1.0f32, 3.0, 2.0, 5.0], [1, 1, 4, 1, 1]));
//! let rois = dev.tensor((vec![0.0f32, 0.0, 4.0], [1, 3]));
//! let pool = RoiPool::new((2, 1, 1), 1.0);
//!
//! let (out, argmax) = pool.forward(&features, &rois);
//! assert_eq!(out.as_vec(), [3.0, 5.0]);
//!
//! // gradients flow back through the recorded argmax
//! let grad_out = dev.tensor((vec![1.0f32, 1.0], [1, 1, 2, 1, 1]));
//! let grad = pool.backward(&grad_out, &rois, &argmax, features.shape());
//! assert_eq!(grad.as_vec(), [0.0, 1.0, 0.0, 1.0]);
//! ```

pub mod dtypes;
pub mod shapes;
pub mod tensor;
pub mod tensor_ops;

/// Contains subset of all public exports.
pub mod prelude {
    pub use crate::shapes::*;
    pub use crate::tensor::*;
    pub use crate::tensor_ops::*;
}

#[cfg(test)]
pub(crate) mod tests {
    pub type TestDevice = crate::tensor::Cpu;

    pub type TestDtype = f32;

    pub trait AssertClose {
        type Elem: std::fmt::Display + std::fmt::Debug + Copy;
        const DEFAULT_TOLERANCE: Self::Elem;
        fn get_default_tol(&self) -> Self::Elem {
            Self::DEFAULT_TOLERANCE
        }
        fn get_far_pair(
            &self,
            rhs: &Self,
            tolerance: Self::Elem,
        ) -> Option<(Self::Elem, Self::Elem)>;
    }

    impl AssertClose for f32 {
        type Elem = f32;
        const DEFAULT_TOLERANCE: Self::Elem = 1e-6;
        fn get_far_pair(&self, rhs: &Self, tolerance: f32) -> Option<(f32, f32)> {
            if (self - rhs).abs() > tolerance {
                Some((*self, *rhs))
            } else {
                None
            }
        }
    }

    impl AssertClose for f64 {
        type Elem = f64;
        const DEFAULT_TOLERANCE: Self::Elem = 1e-6;
        fn get_far_pair(&self, rhs: &Self, tolerance: f64) -> Option<(f64, f64)> {
            if (self - rhs).abs() > tolerance {
                Some((*self, *rhs))
            } else {
                None
            }
        }
    }

    impl<T: AssertClose> AssertClose for Vec<T> {
        type Elem = T::Elem;
        const DEFAULT_TOLERANCE: Self::Elem = T::DEFAULT_TOLERANCE;
        fn get_far_pair(
            &self,
            rhs: &Self,
            tolerance: Self::Elem,
        ) -> Option<(Self::Elem, Self::Elem)> {
            assert_eq!(self.len(), rhs.len());
            for (l, r) in self.iter().zip(rhs.iter()) {
                if let Some(pair) = l.get_far_pair(r, tolerance) {
                    return Some(pair);
                }
            }
            None
        }
    }

    macro_rules! assert_close_to_literal {
        ($Lhs:expr, $Rhs:expr) => {{
            let lhs = $Lhs.as_vec();
            let rhs: Vec<_> = $Rhs
                .iter()
                .map(|x| num_traits::FromPrimitive::from_f64(*x).unwrap())
                .collect();
            let tol = AssertClose::get_default_tol(&lhs);
            if let Some((l, r)) = AssertClose::get_far_pair(&lhs, &rhs, tol) {
                panic!("lhs != rhs | {l} != {r}");
            }
        }};
    }
    pub(crate) use assert_close_to_literal;

    macro_rules! assert_close {
        ($Lhs:expr, $Rhs:expr) => {{
            let lhs = $Lhs;
            let tol = AssertClose::get_default_tol(&lhs);
            if let Some((l, r)) = AssertClose::get_far_pair(&lhs, &$Rhs, tol) {
                panic!("lhs != rhs | {l} != {r}");
            }
        }};
        ($Lhs:expr, $Rhs:expr, $Tolerance:expr) => {{
            let far_pair = $Lhs.get_far_pair(
                &$Rhs,
                num_traits::FromPrimitive::from_f64($Tolerance).unwrap(),
            );
            if let Some((l, r)) = far_pair {
                panic!("lhs != rhs | {l} != {r}");
            }
        }};
    }
    pub(crate) use assert_close;
}
