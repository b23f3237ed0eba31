/// Represents a number of different errors that can occur from creating
/// tensors or launching tensor operations.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Device is out of memory
    OutOfMemory,
    /// Not enough elements were provided when creating a tensor
    WrongNumElements,
    /// A tensor had a different number of dimensions than the operation expects.
    WrongRank { expected: usize, found: usize },
    /// Region descriptors must be (batch index, start, end) triples.
    WrongRoiSize { found: usize },
    /// Two tensors that must agree on shape did not.
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// The operation requires packed row-major data.
    NonContiguous,
    /// A region referenced a batch element outside the feature volume.
    RoiBatchOutOfRange {
        roi: usize,
        batch_index: i64,
        batch_size: usize,
    },
    /// An argmax entry referenced a position outside one batch element's volume.
    ArgmaxOutOfRange { found: i64, limit: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Error {}
