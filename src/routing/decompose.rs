//! Decomposition of a permutation into rounds of bounded-width local permutations.
//!
//! On a power-of-two number of wires, the network built by `SwitchNetwork` only moves wires
//! around between levels through its fixed relabelings.  Undoing those relabelings gives every
//! wire a "home" position that never changes, and in home positions each level's switches all
//! connect pairs of positions that differ in a single bit.  Consecutive levels touching at most
//! `log2(t)` distinct bits therefore only move values within groups of `t` positions that agree
//! on all the other bits, and can be fused into a single round of `n / t` independent local
//! permutations.
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::perm;
use super::{SwitchNetwork, Topology};

/// A permutation split into rounds.  Applying the rounds in order, where each round permutes the
/// values within each of its groups, is equivalent to applying the whole permutation.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PermutationDecomposer {
    n: usize,
    block_size: usize,
    /// For each round and group, the positions in the group, in increasing order.
    split_groups: Vec<Vec<Vec<u32>>>,
    /// For each round and group, the permutation to apply within the group, indexed by position
    /// within the group.
    sub_permutations: Vec<Vec<Vec<u32>>>,
}

impl PermutationDecomposer {
    /// Decompose `perm` into rounds of local permutations on at most `block_size` elements.
    /// Both `perm.len()` and `block_size` must be powers of two, with
    /// `2 <= block_size <= perm.len()` (or `block_size == 1` for a single element).
    pub fn new(perm: &[u32], block_size: usize) -> Result<PermutationDecomposer> {
        PermutationDecomposer::with_topology(Topology::Benes, perm, block_size)
    }

    /// Like `new`, but routing through a network of the given topology.  The round structure
    /// depends only on the sizes; the topology only changes the local permutations.
    pub fn with_topology(
        topology: Topology,
        perm: &[u32],
        block_size: usize,
    ) -> Result<PermutationDecomposer> {
        let n = perm.len();
        check_sizes(n, block_size)?;
        let net = SwitchNetwork::new(topology, perm)?;
        let d = decompose(&net, block_size);
        debug!(
            "decomposed permutation of {} elements into {} rounds of {} groups of {}",
            n, d.rounds(), d.sub_num(), block_size,
        );
        Ok(d)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of rounds.
    pub fn rounds(&self) -> usize {
        self.split_groups.len()
    }

    /// Number of groups in each round.
    pub fn sub_num(&self) -> usize {
        self.n / self.block_size
    }

    pub fn split_groups(&self) -> &[Vec<Vec<u32>>] {
        &self.split_groups
    }

    pub fn sub_permutations(&self) -> &[Vec<Vec<u32>>] {
        &self.sub_permutations
    }

    /// Apply round `round` to `xs` in place: each group's values are gathered according to its
    /// local permutation and written back to the group's positions.
    pub fn apply_round<T: Clone>(&self, round: usize, xs: &mut [T]) {
        assert_eq!(xs.len(), self.n);
        let groups = &self.split_groups[round];
        let subs = &self.sub_permutations[round];
        for (group, sub) in groups.iter().zip(subs) {
            let local = sub.iter()
                .map(|&j| xs[group[j as usize] as usize].clone())
                .collect::<Vec<_>>();
            for (&w, x) in group.iter().zip(local) {
                xs[w as usize] = x;
            }
        }
    }

    /// Apply every round in order, producing `out[i] = xs[perm[i]]`.
    pub fn apply<T: Clone>(&self, xs: &[T]) -> Result<Vec<T>> {
        if xs.len() != self.n {
            return Err(Error::LengthMismatch { expected: self.n, actual: xs.len() });
        }
        let mut ys = xs.to_vec();
        for round in 0 .. self.rounds() {
            self.apply_round(round, &mut ys);
        }
        Ok(ys)
    }
}

fn check_sizes(n: usize, block_size: usize) -> Result<()> {
    let ok =
        n.is_power_of_two() &&
        block_size.is_power_of_two() &&
        block_size <= n &&
        (block_size >= 2 || n == 1);
    if !ok {
        return Err(Error::UnsupportedSize { n, block_size });
    }
    Ok(())
}

/// Place the bits of `x` at the bit positions listed in `bits`.
fn deposit(x: usize, bits: &[u32]) -> usize {
    bits.iter().enumerate().fold(0, |acc, (j, &b)| acc | ((x >> j) & 1) << b)
}

/// Inverse of `deposit`: gather the bits of `h` at the positions in `bits`.
fn extract(h: usize, bits: &[u32]) -> usize {
    bits.iter().enumerate().fold(0, |acc, (j, &b)| acc | ((h >> b) & 1) << j)
}

fn bit_positions(mask: usize) -> Vec<u32> {
    (0 .. usize::BITS).filter(|&b| mask & (1 << b) != 0).collect()
}

fn decompose(net: &SwitchNetwork, block_size: usize) -> PermutationDecomposer {
    let n = net.n();
    let num_levels = net.level();
    let round_bits = block_size.trailing_zeros();

    // `home[l][w]` is the home position of the wire at position `w` of level `l`, and
    // `level_bits[l]` is the single bit in which the home positions of every switch of level `l`
    // differ.
    let mut home = Vec::with_capacity(num_levels);
    let mut level_bits = Vec::with_capacity(num_levels);
    let mut cur = perm::identity(n);
    for l in 0 .. num_levels {
        cur = perm::direct_apply(&net.fixed_permutations()[l], &cur);
        let mut bit = None;
        for &[a, b] in net.switch_wires(l) {
            let diff = (cur[a as usize] ^ cur[b as usize]) as usize;
            assert!(diff.is_power_of_two(), "switch ({}, {}) at level {} spans several bits", a, b, l);
            match bit {
                None => bit = Some(diff),
                Some(d) => assert_eq!(d, diff, "level {} switches differ in more than one bit", l),
            }
        }
        level_bits.push(bit.unwrap_or_else(|| panic!("level {} has no switches", l)));
        home.push(cur.clone());
    }
    debug_assert_eq!(cur, perm::identity(n), "wires do not return to their home positions");

    // Fuse levels greedily while they touch at most `round_bits` distinct bits.
    let mut rounds = Vec::new();
    let mut start = 0;
    let mut mask = 0;
    for (l, &bit) in level_bits.iter().enumerate() {
        if (mask | bit).count_ones() > round_bits {
            rounds.push((start, l, mask));
            start = l;
            mask = bit;
        } else {
            mask |= bit;
        }
    }
    if num_levels > 0 {
        rounds.push((start, num_levels, mask));
    }

    let mut split_groups = Vec::with_capacity(rounds.len());
    let mut sub_permutations = Vec::with_capacity(rounds.len());
    for (start, end, mut mask) in rounds {
        // Widen the round to exactly `block_size` positions per group.
        let mut b = 1;
        while mask.count_ones() < round_bits {
            mask |= b;
            b <<= 1;
        }
        let inside = bit_positions(mask);
        let outside = bit_positions((n - 1) & !mask);
        trace!("round over levels {} .. {}: bits {:?}", start, end, inside);

        // `pos[h]` is the home position whose value ends up at `h` after this round.
        let mut pos = perm::identity(n);
        for l in start .. end {
            for (s, &[a, b]) in net.switch_wires(l).iter().enumerate() {
                if net.gate(l, s) {
                    pos.swap(home[l][a as usize] as usize, home[l][b as usize] as usize);
                }
            }
        }

        let mut groups = Vec::with_capacity(n / block_size);
        let mut subs = Vec::with_capacity(n / block_size);
        for g in 0 .. n / block_size {
            let base = deposit(g, &outside);
            let members = (0 .. block_size)
                .map(|i| (base | deposit(i, &inside)) as u32)
                .collect::<Vec<_>>();
            let sub = members.iter()
                .map(|&h| {
                    let src = pos[h as usize] as usize;
                    debug_assert_eq!(src & !mask, base);
                    extract(src, &inside) as u32
                })
                .collect::<Vec<_>>();
            groups.push(members);
            subs.push(sub);
        }
        split_groups.push(groups);
        sub_permutations.push(subs);
    }

    PermutationDecomposer {
        n,
        block_size,
        split_groups,
        sub_permutations,
    }
}
