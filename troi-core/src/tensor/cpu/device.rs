use std::sync::{Arc, Mutex};

use rand::{rngs::StdRng, SeedableRng};

use crate::dtypes::Unit;
use crate::tensor::{storage_traits::Storage, Error, Tensor};

/// A device that stores data on the heap.
///
/// Use something like `Cpu::seed_from_u64(0)` to control what random
/// numbers the device generates.
#[derive(Clone, Debug)]
pub struct Cpu {
    /// A thread safe random number generator.
    pub(crate) rng: Arc<Mutex<StdRng>>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::seed_from_u64(0)
    }
}

impl Cpu {
    /// Constructs the device with the rng seeded with the given seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Cpu {
    #[inline]
    pub(crate) fn try_alloc_zeros<E: Unit>(&self, numel: usize) -> Result<Vec<E>, Error> {
        self.try_alloc_elem::<E>(numel, Default::default())
    }

    #[inline]
    pub(crate) fn try_alloc_elem<E: Unit>(&self, numel: usize, elem: E) -> Result<Vec<E>, Error> {
        let mut data: Vec<E> = Vec::new();
        data.try_reserve(numel).map_err(|_| Error::OutOfMemory)?;
        data.resize(numel, elem);
        Ok(data)
    }
}

impl<E: Unit> Storage<E> for Cpu {
    type Vec = Vec<E>;

    fn try_alloc_len(&self, len: usize) -> Result<Self::Vec, Error> {
        self.try_alloc_zeros(len)
    }

    fn tensor_to_vec(&self, tensor: &Tensor<E, Self>) -> Vec<E> {
        tensor.data.as_ref().clone()
    }

    fn len(&self, v: &Self::Vec) -> usize {
        v.len()
    }
}
