use rand::distributions::Distribution;
use rand_distr::{Standard, StandardNormal};

use crate::shapes::{HasShape, Shape};

use super::{Error, Tensor};

/// Something that can store nd arrays for a given element type.
pub trait Storage<E>: 'static + std::fmt::Debug + Default + Clone {
    /// Generic Storage type
    type Vec: 'static + std::fmt::Debug + Clone + Send + Sync;

    /// Allocates a zero-filled buffer holding `len` elements.
    fn try_alloc_len(&self, len: usize) -> Result<Self::Vec, Error>;

    fn tensor_to_vec(&self, tensor: &Tensor<E, Self>) -> Vec<E>;

    fn len(&self, v: &Self::Vec) -> usize;
}

/// Construct tensors filled with zeros.
pub trait ZerosTensor<E>: Storage<E> {
    /// Build a zero-filled tensor with a shape given by something else.
    ///
    /// Given a shape directly:
    /// ```rust
    /// # use troi_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let a: Tensor<f32, _> = dev.zeros_like(&Shape::from([2, 3]));
    /// ```
    ///
    /// Given another tensor:
    /// ```rust
    /// # use troi_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// # let a: Tensor<f32, _> = dev.zeros_like(&Shape::from([2, 3]));
    /// let b: Tensor<f32, _> = dev.zeros_like(&a);
    /// ```
    fn zeros_like<S: HasShape>(&self, src: &S) -> Tensor<E, Self> {
        self.try_zeros_like(src).unwrap()
    }

    /// Fallible version of [ZerosTensor::zeros_like]
    fn try_zeros_like<S: HasShape>(&self, src: &S) -> Result<Tensor<E, Self>, Error>;
}

/// Construct tensors filled with ones.
pub trait OnesTensor<E>: Storage<E> {
    /// Build a one-filled tensor with a shape given by something else. See
    /// [ZerosTensor::zeros_like].
    fn ones_like<S: HasShape>(&self, src: &S) -> Tensor<E, Self> {
        self.try_ones_like(src).unwrap()
    }

    /// Fallible version of [OnesTensor::ones_like]
    fn try_ones_like<S: HasShape>(&self, src: &S) -> Result<Tensor<E, Self>, Error>;
}

/// Constructs tensors filled with random values from a given distribution.
pub trait SampleTensor<E>: Storage<E> {
    /// Samples a tensor with a given shape from a uniform distribution
    fn sample_uniform_like<S: HasShape>(&self, src: &S) -> Tensor<E, Self>
    where
        Standard: Distribution<E>,
    {
        self.sample_like::<S, _>(src, Standard)
    }

    /// Samples a tensor with a given shape from a normal distribution
    fn sample_normal_like<S: HasShape>(&self, src: &S) -> Tensor<E, Self>
    where
        StandardNormal: Distribution<E>,
    {
        self.sample_like::<S, _>(src, StandardNormal)
    }

    /// Samples a tensor with a given shape from a given distribution.
    fn sample_like<S: HasShape, D: Distribution<E>>(&self, src: &S, distr: D) -> Tensor<E, Self> {
        self.try_sample_like(src, distr).unwrap()
    }

    /// Fallibly samples a tensor with a given shape from a given distribution.
    fn try_sample_like<S: HasShape, D: Distribution<E>>(
        &self,
        src: &S,
        distr: D,
    ) -> Result<Tensor<E, Self>, Error>;
}

/// Construct tensors from rust vectors. This trait is only used to implement
/// [TensorFrom].
pub trait TensorFromVec<E>: Storage<E> {
    fn tensor_from_vec<S: Into<Shape>>(&self, src: Vec<E>, shape: S) -> Tensor<E, Self> {
        self.try_tensor_from_vec(src, shape).unwrap()
    }

    fn try_tensor_from_vec<S: Into<Shape>>(
        &self,
        src: Vec<E>,
        shape: S,
    ) -> Result<Tensor<E, Self>, Error>;
}

/// Construct tensors from rust data
pub trait TensorFrom<Src, E>: Storage<E> {
    /// Create a tensor from rust data paired with a shape
    /// ```rust
    /// # use troi_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let _ = dev.tensor((vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]));
    /// ```
    fn tensor(&self, src: Src) -> Tensor<E, Self> {
        self.try_tensor(src).unwrap()
    }

    /// Fallible version of [TensorFrom::tensor]
    fn try_tensor(&self, src: Src) -> Result<Tensor<E, Self>, Error>;
}

impl<E, S: Into<Shape>, D: TensorFromVec<E>> TensorFrom<(Vec<E>, S), E> for D {
    fn try_tensor(&self, (src, shape): (Vec<E>, S)) -> Result<Tensor<E, Self>, Error> {
        self.try_tensor_from_vec(src, shape)
    }
}
