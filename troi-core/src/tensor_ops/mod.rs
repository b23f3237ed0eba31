//! Implementations of the tensor operations this crate ships.
//!
//! Each operation lives in its own submodule together with the device
//! kernels that implement it.

mod roi_pool;

pub use roi_pool::{RoiPool, RoiPoolKernel, RoiPoolOp};
