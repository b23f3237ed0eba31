use std::sync::Arc;

use crate::shapes::{HasShape, Shape};

use super::{storage_traits::Storage, Cpu};

/// The single tensor struct: an owned, dense, row-major nd array together
/// with the device that allocated it.
///
/// The device a tensor lives on is part of its type: two tensors can only be
/// passed to the same operation when their `D` parameters match, so
/// cross-device calls fail at compile time rather than at launch.
#[derive(Debug, Clone)]
pub struct Tensor<E, D: Storage<E> = Cpu> {
    pub(crate) data: Arc<D::Vec>,
    pub(crate) shape: Shape,
    pub(crate) strides: Vec<usize>,
    pub(crate) device: D,
}

impl<E, D: Storage<E>> Tensor<E, D> {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Whether the data is laid out in packed row-major order.
    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.strides()
    }

    /// Number of elements stored.
    pub fn len(&self) -> usize {
        self.device.len(self.data.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the tensor's data out into a plain vector.
    pub fn as_vec(&self) -> Vec<E> {
        self.device.tensor_to_vec(self)
    }
}

impl<E, D: Storage<E>> HasShape for Tensor<E, D> {
    fn shape(&self) -> &Shape {
        &self.shape
    }
}
