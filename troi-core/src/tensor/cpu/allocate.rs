use crate::{
    dtypes::Unit,
    shapes::{HasShape, Shape},
    tensor::{storage_traits::*, Error, Tensor},
};

use super::Cpu;

use rand::{distributions::Distribution, Rng};
use std::sync::Arc;

impl<E: Unit> ZerosTensor<E> for Cpu {
    fn try_zeros_like<S: HasShape>(&self, src: &S) -> Result<Tensor<E, Self>, Error> {
        let shape = src.shape().clone();
        let strides = shape.strides();
        let data = self.try_alloc_zeros::<E>(shape.num_elements())?;
        Ok(Tensor {
            data: Arc::new(data),
            shape,
            strides,
            device: self.clone(),
        })
    }
}

impl<E: Unit> OnesTensor<E> for Cpu {
    fn try_ones_like<S: HasShape>(&self, src: &S) -> Result<Tensor<E, Self>, Error> {
        let shape = src.shape().clone();
        let strides = shape.strides();
        let data = self.try_alloc_elem::<E>(shape.num_elements(), E::ONE)?;
        Ok(Tensor {
            data: Arc::new(data),
            shape,
            strides,
            device: self.clone(),
        })
    }
}

impl<E: Unit> SampleTensor<E> for Cpu {
    fn try_sample_like<S: HasShape, D: Distribution<E>>(
        &self,
        src: &S,
        distr: D,
    ) -> Result<Tensor<E, Self>, Error> {
        let mut tensor = self.try_zeros_like(src)?;
        {
            let mut rng = self.rng.lock().unwrap();
            for v in Arc::get_mut(&mut tensor.data).unwrap().iter_mut() {
                *v = rng.sample(&distr);
            }
        }
        Ok(tensor)
    }
}

impl<E: Unit> TensorFromVec<E> for Cpu {
    fn try_tensor_from_vec<S: Into<Shape>>(
        &self,
        src: Vec<E>,
        shape: S,
    ) -> Result<Tensor<E, Self>, Error> {
        let shape: Shape = shape.into();
        if src.len() != shape.num_elements() {
            Err(Error::WrongNumElements)
        } else {
            let strides = shape.strides();
            Ok(Tensor {
                data: Arc::new(src),
                shape,
                strides,
                device: self.clone(),
            })
        }
    }
}
