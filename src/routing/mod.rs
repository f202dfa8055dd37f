//! Construction of switching networks that realize arbitrary permutations.
//!
//! A network on `n` wires consists of `perm::level(n)` levels.  Each level first relabels the
//! wires by a fixed, data-independent permutation and then runs a row of 2x2 switches, each of
//! which either passes its two wires straight through or swaps them.  Only the switch settings
//! depend on the permutation being realized, which is what lets an oblivious evaluator reuse
//! the same level structure with secret switch bits.
use std::fmt;
use std::str::FromStr;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use crate::error::Result;

mod builder;
pub mod decompose;
pub mod network;

pub use self::decompose::PermutationDecomposer;
pub use self::network::{NetworkTables, SwitchNetwork, IDLE_WIRE};


bitflags! {
    pub struct SwitchFlags: u8 {
        /// This switch is configured to swap its inputs instead of passing them through.
        const F_SWAP = 1;
        /// The swap mode of this switch is fixed by the construction and does not depend on
        /// the permutation.
        const F_PUBLIC = 2;
    }
}

/// The topology used to lay out a network.  Both produce the same number of levels and
/// switches per level; they differ in where the odd wire of an odd-sized block goes and in
/// which side of the network each routing loop is anchored.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// The odd wire sits at the end of its block and joins the lower (larger) half.  Loops are
    /// anchored at the output switches.
    Waksman,
    /// The odd wire sits at the front of its block and joins the upper (larger) half.  Loops are
    /// anchored at the input switches.
    Benes,
}

/// One of the two subnetworks inside a block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Half {
    Upper,
    Lower,
}

impl Half {
    pub fn other(self) -> Half {
        match self {
            Half::Upper => Half::Lower,
            Half::Lower => Half::Upper,
        }
    }
}

/// The side of a block whose switches start each routing loop.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Input,
    Output,
}

impl Topology {
    pub const ALL: [Topology; 2] = [Topology::Waksman, Topology::Benes];

    /// Number of wires routed through the upper subnetwork of a block of size `m`.
    pub(crate) fn upper_size(self, m: usize) -> usize {
        match self {
            Topology::Waksman => m / 2,
            Topology::Benes => m - m / 2,
        }
    }

    pub(crate) fn half_size(self, m: usize, half: Half) -> usize {
        match half {
            Half::Upper => self.upper_size(m),
            Half::Lower => m - self.upper_size(m),
        }
    }

    /// Offset of the first half within the block.
    pub(crate) fn half_base(self, m: usize, half: Half) -> usize {
        match half {
            Half::Upper => 0,
            Half::Lower => self.upper_size(m),
        }
    }

    /// The wire of an odd-sized block that is not attached to any switch.
    pub(crate) fn idle_wire(self, m: usize) -> Option<usize> {
        if m % 2 == 0 {
            return None;
        }
        match self {
            Topology::Waksman => Some(m - 1),
            Topology::Benes => Some(0),
        }
    }

    fn head(self, m: usize) -> usize {
        match self {
            Topology::Waksman => 0,
            Topology::Benes => m % 2,
        }
    }

    /// The two block-local wires of switch `k` in the outer layers of a block of size `m`.
    pub(crate) fn switch_wires(self, m: usize, k: usize) -> [usize; 2] {
        let w = self.head(m) + 2 * k;
        [w, w + 1]
    }

    /// The switch that wire `w` belongs to, and which of its two wires it is.  `None` for the
    /// idle wire.
    pub(crate) fn switch_of(self, m: usize, w: usize) -> Option<(usize, usize)> {
        let head = self.head(m);
        if Some(w) == self.idle_wire(m) {
            return None;
        }
        debug_assert!(w >= head && w < m);
        Some(((w - head) / 2, (w - head) % 2))
    }

    /// The other wire on the same switch as `w`.
    pub(crate) fn partner(self, m: usize, w: usize) -> Option<usize> {
        self.switch_of(m, w).map(|(k, side)| self.switch_wires(m, k)[1 - side])
    }

    /// The half that carries the idle wire of an odd block.
    pub(crate) fn idle_half(self) -> Half {
        match self {
            Topology::Waksman => Half::Lower,
            Topology::Benes => Half::Upper,
        }
    }

    /// Position of the idle wire within its half.
    pub(crate) fn idle_slot(self, m: usize) -> usize {
        match self {
            Topology::Waksman => m / 2,
            Topology::Benes => 0,
        }
    }

    /// Position within `half` of the wire that switch `k` exchanges with that half.
    pub(crate) fn slot(self, m: usize, half: Half, k: usize) -> usize {
        match (self, half) {
            (Topology::Benes, Half::Upper) => m % 2 + k,
            _ => k,
        }
    }

    pub(crate) fn loop_side(self) -> Side {
        match self {
            Topology::Waksman => Side::Output,
            Topology::Benes => Side::Input,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Topology::Waksman => write!(f, "waksman"),
            Topology::Benes => write!(f, "benes"),
        }
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Topology, String> {
        match s {
            "waksman" => Ok(Topology::Waksman),
            "benes" => Ok(Topology::Benes),
            _ => Err(format!("unknown topology `{}` (expected `waksman` or `benes`)", s)),
        }
    }
}

impl Default for Topology {
    fn default() -> Topology {
        Topology::Waksman
    }
}

/// Build a network of the given topology realizing `perm`.
pub fn build(topology: Topology, perm: &[u32]) -> Result<SwitchNetwork> {
    SwitchNetwork::new(topology, perm)
}
