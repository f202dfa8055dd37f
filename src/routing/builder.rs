//! Routing of a permutation through a Waksman or Benes network.
//!
//! The construction is recursive.  A block of `m` wires is split into two halves, an upper and
//! a lower subnetwork, with a layer of switches on the input side feeding the halves and a
//! mirrored layer on the output side collecting from them.  Each route `in[perm[i]] -> out[i]`
//! is assigned to one half, the outer switches are set to steer it there, and the two halves
//! are routed recursively as smaller permutations.
//!
//! The assignment processes one "loop" at a time.  Two inputs on the same switch must use
//! different halves, and so must the inputs feeding two outputs of the same switch.  Following
//! these constraints from any starting input alternates between the halves and eventually
//! returns to the start, so every loop can be assigned as soon as one of its routes is fixed.
//! For example, on 4 wires with `perm = [2, 0, 1, 3]` (`in0 -> out1`, `in1 -> out2`,
//! `in2 -> out0`, `in3 -> out3`), the single loop is `in0 -> out1 - out0 <- in2 - in3 -> out3 -
//! out2 <- in1 - in0`, so `in0` and `in3` take one half and `in1` and `in2` the other.
//!
//! In a block of odd size the idle input (the one without a switch) and the input feeding the
//! idle output both have to use the half that holds the idle wire.  They are the two ends of
//! the only non-cyclic chain of constraints, which is assigned before any loop.
use log::trace;
use crate::perm;
use super::{Half, Side, SwitchFlags, Topology};
use super::network::IDLE_WIRE;

/// Blocks smaller than this are routed on the current thread even with the `parallel` feature.
#[cfg(feature = "parallel")]
const PARALLEL_MIN_SIZE: usize = 256;

/// Switch settings for one block of the recursion.
#[derive(Clone, Debug)]
pub(crate) enum RouteTree {
    /// Blocks of size 0 or 1 have nothing to route.
    Empty,
    /// A block of two wires is a single switch, repeated on every level the block spans.
    Pair { swap: bool },
    Split {
        size: usize,
        input: Vec<SwitchFlags>,
        output: Vec<SwitchFlags>,
        upper: Box<RouteTree>,
        lower: Box<RouteTree>,
    },
}

/// Compute the switch settings for every block needed to realize `perm`.
pub(crate) fn route(topology: Topology, perm: &[u32]) -> RouteTree {
    let m = perm.len();
    match m {
        0 | 1 => RouteTree::Empty,
        2 => RouteTree::Pair { swap: perm[0] == 1 },
        _ => {
            let mut la = LoopAssignment::new(topology, perm);
            la.assign();
            let (input, output) = la.switch_flags();
            let (upper_perm, lower_perm) = la.sub_permutations();
            trace!(
                "block of size {}: upper {:?}, lower {:?}",
                m, upper_perm, lower_perm,
            );
            let (upper, lower) = route_halves(topology, &upper_perm, &lower_perm);
            RouteTree::Split {
                size: m,
                input,
                output,
                upper: Box::new(upper),
                lower: Box::new(lower),
            }
        },
    }
}

#[cfg(feature = "parallel")]
fn route_halves(topology: Topology, upper: &[u32], lower: &[u32]) -> (RouteTree, RouteTree) {
    if upper.len() + lower.len() >= PARALLEL_MIN_SIZE {
        rayon::join(|| route(topology, upper), || route(topology, lower))
    } else {
        (route(topology, upper), route(topology, lower))
    }
}

#[cfg(not(feature = "parallel"))]
fn route_halves(topology: Topology, upper: &[u32], lower: &[u32]) -> (RouteTree, RouteTree) {
    (route(topology, upper), route(topology, lower))
}


/// Assignment of every route in one block to the upper or lower half.
struct LoopAssignment<'a> {
    topology: Topology,
    perm: &'a [u32],
    inv: Vec<u32>,
    /// The half used by the route starting at each input.
    half: Vec<Option<Half>>,
}

impl<'a> LoopAssignment<'a> {
    fn new(topology: Topology, perm: &'a [u32]) -> LoopAssignment<'a> {
        LoopAssignment {
            topology,
            perm,
            inv: perm::invert(perm),
            half: vec![None; perm.len()],
        }
    }

    fn size(&self) -> usize {
        self.perm.len()
    }

    fn assign(&mut self) {
        let t = self.topology;
        let m = self.size();

        if let Some(idle) = t.idle_wire(m) {
            self.follow(idle, t.idle_half());
            debug_assert_eq!(self.half[self.perm[idle] as usize], Some(t.idle_half()));
        }

        // Each loop not yet assigned is anchored at its lowest switch on the topology's loop
        // side, which is set straight.
        for k in 0 .. m / 2 {
            let [w, _] = t.switch_wires(m, k);
            let start = match t.loop_side() {
                Side::Input => w,
                Side::Output => self.perm[w] as usize,
            };
            if self.half[start].is_none() {
                self.follow(start, Half::Upper);
            }
        }

        debug_assert!(self.half.iter().all(|h| h.is_some()));
    }

    /// Send the route from input `start` through `half`, and then assign the rest of its loop.
    fn follow(&mut self, start: usize, half: Half) {
        let t = self.topology;
        let m = self.size();
        let mut a1 = start;
        loop {
            self.half[a1] = Some(half);

            // The other output on the switch that `a1` feeds must be fed from the other half.
            let b1 = self.inv[a1] as usize;
            let b2 = match t.partner(m, b1) {
                Some(b) => b,
                None => break,
            };
            let a2 = self.perm[b2] as usize;
            if let Some(h) = self.half[a2] {
                debug_assert_eq!(h, half.other());
                break;
            }
            self.half[a2] = Some(half.other());

            // The input sharing a switch with `a2` goes back through `half`.
            let a3 = match t.partner(m, a2) {
                Some(a) => a,
                None => break,
            };
            if let Some(h) = self.half[a3] {
                debug_assert_eq!(h, half);
                break;
            }
            a1 = a3;
        }
    }

    fn half_of(&self, a: usize) -> Half {
        self.half[a].unwrap_or_else(|| panic!("input {} was not assigned to a half", a))
    }

    /// Flags for the input-side and output-side switches of this block.  A switch is swapped when
    /// its first wire uses the lower half.
    fn switch_flags(&self) -> (Vec<SwitchFlags>, Vec<SwitchFlags>) {
        let t = self.topology;
        let m = self.size();
        let mut input = Vec::with_capacity(m / 2);
        let mut output = Vec::with_capacity(m / 2);
        for k in 0 .. m / 2 {
            let [w, _] = t.switch_wires(m, k);
            let mut fi = SwitchFlags::empty();
            let mut fo = SwitchFlags::empty();
            if self.half_of(w) == Half::Lower {
                fi.insert(SwitchFlags::F_SWAP);
            }
            if self.half_of(self.perm[w] as usize) == Half::Lower {
                fo.insert(SwitchFlags::F_SWAP);
            }

            // With no idle chain, the first loop always starts at switch 0.
            if k == 0 && m % 2 == 0 {
                let f = match t.loop_side() {
                    Side::Input => &mut fi,
                    Side::Output => &mut fo,
                };
                debug_assert!(!f.contains(SwitchFlags::F_SWAP));
                f.insert(SwitchFlags::F_PUBLIC);
            }

            input.push(fi);
            output.push(fo);
        }
        (input, output)
    }

    /// Position of block wire `w` within `half`.  Inputs and outputs share the same layout.
    fn slot(&self, w: usize, half: Half) -> usize {
        let t = self.topology;
        let m = self.size();
        match t.switch_of(m, w) {
            Some((k, _)) => t.slot(m, half, k),
            None => {
                debug_assert_eq!(half, t.idle_half());
                t.idle_slot(m)
            },
        }
    }

    /// The permutations that the upper and lower halves must realize.
    fn sub_permutations(&self) -> (Vec<u32>, Vec<u32>) {
        let t = self.topology;
        let m = self.size();
        let mut upper = vec![0; t.half_size(m, Half::Upper)];
        let mut lower = vec![0; t.half_size(m, Half::Lower)];
        for (b, &a) in self.perm.iter().enumerate() {
            let a = a as usize;
            let half = self.half_of(a);
            let inner_b = self.slot(b, half);
            let inner_a = self.slot(a, half) as u32;
            match half {
                Half::Upper => upper[inner_b] = inner_a,
                Half::Lower => lower[inner_b] = inner_a,
            }
        }
        debug_assert!(perm::is_valid_permutation(&upper));
        debug_assert!(perm::is_valid_permutation(&lower));
        (upper, lower)
    }
}


/// The flat per-level tables of a network.
pub(crate) struct Tables {
    pub switch_indexes: Vec<Vec<i32>>,
    pub fixed_permutations: Vec<Vec<u32>>,
    pub flags: Vec<Vec<SwitchFlags>>,
}

/// Route `perm` and lay the result out level by level.
pub(crate) fn build_tables(topology: Topology, perm: &[u32]) -> Tables {
    let n = perm.len();
    let num_levels = perm::level(n);
    let tree = route(topology, perm);
    let mut layout = Layout::new(n, num_levels);
    if num_levels > 0 {
        layout.place(topology, &tree, 0, 0, num_levels - 1);
    }
    layout.finish()
}

/// Per-level tables being filled in while placing a `RouteTree`.  Every block occupies
/// consecutive wire positions starting at some `base`, over a contiguous range of levels.
struct Layout {
    n: usize,
    /// For each level, the flags of the switch whose first wire is at each position.
    switches: Vec<Vec<Option<SwitchFlags>>>,
    fixed: Vec<Vec<u32>>,
}

impl Layout {
    fn new(n: usize, num_levels: usize) -> Layout {
        Layout {
            n,
            switches: vec![vec![None; n]; num_levels],
            fixed: vec![perm::identity(n); num_levels],
        }
    }

    /// Place `tree` at wire positions `base ..` over levels `lo ..= hi`.
    fn place(&mut self, topology: Topology, tree: &RouteTree, base: usize, lo: usize, hi: usize) {
        match *tree {
            RouteTree::Empty => {},
            RouteTree::Pair { swap } => {
                for l in lo ..= hi {
                    let mut flags = SwitchFlags::empty();
                    if l == lo {
                        flags.set(SwitchFlags::F_SWAP, swap);
                    } else {
                        flags.insert(SwitchFlags::F_PUBLIC);
                    }
                    self.switches[l][base] = Some(flags);
                }
            },
            RouteTree::Split { size: m, ref input, ref output, ref upper, ref lower } => {
                assert!(
                    hi >= lo + 2,
                    "block of size {} does not fit in levels {} ..= {}", m, lo, hi,
                );
                for k in 0 .. m / 2 {
                    let [w0, w1] = topology.switch_wires(m, k);
                    self.switches[lo][base + w0] = Some(input[k]);
                    self.switches[hi][base + w0] = Some(output[k]);
                    for &(w, half) in &[(w0, Half::Upper), (w1, Half::Lower)] {
                        let inner = topology.half_base(m, half) + topology.slot(m, half, k);
                        self.connect(lo, hi, base + w, base + inner);
                    }
                }
                if let Some(w) = topology.idle_wire(m) {
                    let half = topology.idle_half();
                    let inner = topology.half_base(m, half) + topology.idle_slot(m);
                    self.connect(lo, hi, base + w, base + inner);
                }

                let lower_base = base + topology.half_base(m, Half::Lower);
                self.place(topology, upper, base, lo + 1, hi - 1);
                self.place(topology, lower, lower_base, lo + 1, hi - 1);
            },
        }
    }

    /// Join position `outer` of a block's outer layers (levels `lo` and `hi`) to position
    /// `inner` of its subnetworks.
    fn connect(&mut self, lo: usize, hi: usize, outer: usize, inner: usize) {
        self.fixed[lo + 1][inner] = outer as u32;
        self.fixed[hi][outer] = inner as u32;
    }

    /// Number the switches of each level in wire order.
    fn finish(self) -> Tables {
        let n = self.n;
        let mut switch_indexes = Vec::with_capacity(self.switches.len());
        let mut flags = Vec::with_capacity(self.switches.len());
        for row in self.switches {
            let mut indexes = vec![IDLE_WIRE; n];
            let mut level_flags = Vec::new();
            for (w, f) in row.into_iter().enumerate() {
                if let Some(f) = f {
                    let s = level_flags.len() as i32;
                    indexes[w] = s;
                    indexes[w + 1] = s;
                    level_flags.push(f);
                }
            }
            switch_indexes.push(indexes);
            flags.push(level_flags);
        }
        Tables {
            switch_indexes,
            fixed_permutations: self.fixed,
            flags,
        }
    }
}
