//! The [Tensor] struct, the [Cpu] device, and traits for creating tensors.
//!
//! A [Tensor] is an owned, dense, row-major nd array with a runtime
//! [crate::shapes::Shape]. Tensors are created through a device value, which
//! also executes every operation on them:
//!
//! ```rust
//! # use troi_core::prelude::*;
//! let dev: Cpu = Default::default();
//! let t = dev.tensor((vec![1.0f32, 2.0, 3.0, 4.0], [2, 2]));
//! assert_eq!(t.as_vec(), [1.0, 2.0, 3.0, 4.0]);
//! ```

pub(crate) mod cpu;
mod error;
pub(crate) mod storage_traits;
mod tensor_impls;

pub use cpu::Cpu;
pub use error::Error;
pub use storage_traits::{
    OnesTensor, SampleTensor, Storage, TensorFrom, TensorFromVec, ZerosTensor,
};
pub use tensor_impls::Tensor;
