use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The map is not a bijection on `0 .. len`.  `index` is the first entry that is out of
    /// range or repeats an earlier value.
    #[error("not a permutation of 0..{len}: entry {index} is {value}")]
    InvalidPermutation { len: usize, index: usize, value: u32 },

    #[error("expected a vector of length {expected}, but got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("unsupported size: n = {n}, block size = {block_size}")]
    UnsupportedSize { n: usize, block_size: usize },

    #[error("malformed network tables: {0}")]
    MalformedNetwork(String),
}

pub type Result<T> = std::result::Result<T, Error>;
