pub mod debug;
pub mod error;
pub mod perm;
pub mod routing;

pub use crate::error::{Error, Result};
pub use crate::routing::{PermutationDecomposer, SwitchNetwork, Topology};
