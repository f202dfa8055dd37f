use std::convert::TryFrom;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::perm;
use super::{builder, SwitchFlags, Topology};

/// Entry in `switch_indexes` for a wire that is not attached to any switch at that level.
pub const IDLE_WIRE: i32 = -1;

/// A switching network realizing a fixed permutation of `n` wires.
///
/// Level `l` of the network first relabels the wires by `fixed_permutations()[l]` (as a gather:
/// `new[i] = old[fixed[i]]`) and then runs its switches.  `switch_indexes()[l][w]` names the
/// switch that wire `w` passes through at level `l`, or `IDLE_WIRE`; every switch has exactly
/// two wires.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SwitchNetwork {
    topology: Topology,
    n: usize,
    switch_indexes: Vec<Vec<i32>>,
    fixed_permutations: Vec<Vec<u32>>,
    /// The two wires of each switch, indexed by level and then by switch id.
    switches: Vec<Vec<[u32; 2]>>,
    flags: Vec<Vec<SwitchFlags>>,
}

impl SwitchNetwork {
    /// Build a network of the given topology realizing `perm`, so that `evaluate(xs)` produces
    /// `out[i] = xs[perm[i]]`.
    pub fn new(topology: Topology, perm: &[u32]) -> Result<SwitchNetwork> {
        perm::validate(perm)?;
        let tables = builder::build_tables(topology, perm);
        let net = SwitchNetwork::from_parts(
            topology,
            perm.len(),
            tables.switch_indexes,
            tables.fixed_permutations,
            tables.flags,
        );

        if cfg!(debug_assertions) {
            debug_assert_eq!(net.realized_permutation(), perm, "failed to route {:?}", perm);
        }

        debug!(
            "built {} network on {} wires: {} levels, {} switches ({} public)",
            topology, net.n, net.level(), net.num_switches(), net.num_public_switches(),
        );
        Ok(net)
    }

    fn from_parts(
        topology: Topology,
        n: usize,
        switch_indexes: Vec<Vec<i32>>,
        fixed_permutations: Vec<Vec<u32>>,
        flags: Vec<Vec<SwitchFlags>>,
    ) -> SwitchNetwork {
        let switches = switch_indexes.iter().zip(&flags).map(|(row, level_flags)| {
            let mut wires = vec![[u32::MAX; 2]; level_flags.len()];
            for (w, &s) in row.iter().enumerate() {
                if s == IDLE_WIRE {
                    continue;
                }
                let pair = &mut wires[s as usize];
                let side = if pair[0] == u32::MAX { 0 } else { 1 };
                pair[side] = w as u32;
            }
            wires
        }).collect();

        SwitchNetwork {
            topology,
            n,
            switch_indexes,
            fixed_permutations,
            switches,
            flags,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Number of levels.
    pub fn level(&self) -> usize {
        self.switch_indexes.len()
    }

    pub fn max_width(&self) -> usize {
        perm::max_width(self.n)
    }

    pub fn switch_indexes(&self) -> &[Vec<i32>] {
        &self.switch_indexes
    }

    pub fn fixed_permutations(&self) -> &[Vec<u32>] {
        &self.fixed_permutations
    }

    /// The switch that wire `w` passes through at level `l`, if any.
    pub fn switch_of(&self, l: usize, w: usize) -> Option<usize> {
        match self.switch_indexes[l][w] {
            IDLE_WIRE => None,
            s => Some(s as usize),
        }
    }

    /// The wire pair of every switch in level `l`, in switch id order.
    pub fn switch_wires(&self, l: usize) -> &[[u32; 2]] {
        &self.switches[l]
    }

    pub fn num_switches_in(&self, l: usize) -> usize {
        self.flags[l].len()
    }

    pub fn num_switches(&self) -> usize {
        self.flags.iter().map(|f| f.len()).sum()
    }

    pub fn num_public_switches(&self) -> usize {
        self.flags.iter().flatten().filter(|f| f.contains(SwitchFlags::F_PUBLIC)).count()
    }

    pub fn flags(&self, l: usize, switch: usize) -> SwitchFlags {
        self.flags[l][switch]
    }

    pub fn gate(&self, l: usize, switch: usize) -> bool {
        self.flags[l][switch].contains(SwitchFlags::F_SWAP)
    }

    /// Gate bits of level `l`, indexed by switch id.  `true` means the switch swaps its wires.
    pub fn gates(&self, l: usize) -> Vec<bool> {
        self.flags[l].iter().map(|f| f.contains(SwitchFlags::F_SWAP)).collect()
    }

    /// Run level `l` on `xs`: the fixed relabeling, then the switches.
    pub fn apply_level<T: Clone>(&self, l: usize, xs: &[T]) -> Vec<T> {
        assert_eq!(xs.len(), self.n);
        let mut ys = perm::direct_apply(&self.fixed_permutations[l], xs);
        for (&[a, b], f) in self.switches[l].iter().zip(&self.flags[l]) {
            if f.contains(SwitchFlags::F_SWAP) {
                ys.swap(a as usize, b as usize);
            }
        }
        ys
    }

    /// The permutation computed by the network, in the same convention as the `perm` passed to
    /// `new`.
    pub fn realized_permutation(&self) -> Vec<u32> {
        let mut idx = perm::identity(self.n);
        for l in 0 .. self.level() {
            idx = self.apply_level(l, &idx);
        }
        idx
    }

    /// Permute `xs` by running it through every level of the network.
    pub fn evaluate<T: Clone>(&self, xs: &[T]) -> Result<Vec<T>> {
        if xs.len() != self.n {
            return Err(Error::LengthMismatch { expected: self.n, actual: xs.len() });
        }
        // Route indices rather than values so `T` is only cloned once.
        Ok(perm::direct_apply(&self.realized_permutation(), xs))
    }

    /// Find the input that is routed to output `b`, along with the wire position it occupies
    /// after each level (starting with its input position).
    pub fn trace_output(&self, b: u32) -> Vec<u32> {
        assert!((b as usize) < self.n, "output {} out of range", b);
        let mut xs = Vec::with_capacity(self.level() + 1);
        let mut x = b;
        xs.push(x);
        for l in (0 .. self.level()).rev() {
            if let Some(s) = self.switch_of(l, x as usize) {
                if self.gate(l, s) {
                    let [w0, w1] = self.switches[l][s];
                    x = if x == w0 { w1 } else { w0 };
                }
            }
            x = self.fixed_permutations[l][x as usize];
            xs.push(x);
        }
        xs.reverse();
        xs
    }

    /// Export the structural tables.
    pub fn tables(&self) -> NetworkTables {
        NetworkTables {
            topology: self.topology,
            n: self.n,
            level: self.level(),
            max_width: self.max_width(),
            switch_indexes: self.switch_indexes.clone(),
            fixed_permutations: self.fixed_permutations.clone(),
            gates: self.flags.iter()
                .map(|fs| fs.iter().map(|f| f.contains(SwitchFlags::F_SWAP) as u8).collect())
                .collect(),
            public: self.flags.iter()
                .map(|fs| fs.iter().map(|f| f.contains(SwitchFlags::F_PUBLIC)).collect())
                .collect(),
        }
    }

    /// Rebuild a network from exported tables, checking that they describe a well-formed
    /// network.  The tables may come from another source, so the permutation they realize is
    /// not checked against anything.
    pub fn from_tables(t: NetworkTables) -> Result<SwitchNetwork> {
        let malformed = |msg: String| Error::MalformedNetwork(msg);
        let n = t.n;
        if u32::try_from(n).is_err() {
            return Err(malformed(format!("network size {} overflows u32", n)));
        }
        let num_levels = perm::level(n);
        if t.level != num_levels {
            return Err(malformed(format!(
                "a network on {} wires has {} levels, not {}", n, num_levels, t.level,
            )));
        }
        if t.max_width != perm::max_width(n) {
            return Err(malformed(format!(
                "a network on {} wires has width {}, not {}", n, perm::max_width(n), t.max_width,
            )));
        }
        for (name, len) in &[
            ("switch_indexes", t.switch_indexes.len()),
            ("fixed_permutations", t.fixed_permutations.len()),
            ("gates", t.gates.len()),
        ] {
            if *len != num_levels {
                return Err(malformed(format!("`{}` has {} rows, expected {}", name, len, num_levels)));
            }
        }
        if !t.public.is_empty() && t.public.len() != num_levels {
            return Err(malformed(format!(
                "`public` has {} rows, expected {}", t.public.len(), num_levels,
            )));
        }

        let mut flags = Vec::with_capacity(num_levels);
        for l in 0 .. num_levels {
            let fixed = &t.fixed_permutations[l];
            if fixed.len() != n {
                return Err(malformed(format!("`fixed_permutations[{}]` has length {}", l, fixed.len())));
            }
            perm::validate(fixed)
                .map_err(|e| malformed(format!("`fixed_permutations[{}]`: {}", l, e)))?;

            let row = &t.switch_indexes[l];
            if row.len() != n {
                return Err(malformed(format!("`switch_indexes[{}]` has length {}", l, row.len())));
            }
            let num_switches = t.gates[l].len();
            if num_switches > t.max_width {
                return Err(malformed(format!(
                    "level {} has {} switches, more than the width {}", l, num_switches, t.max_width,
                )));
            }
            let mut uses = vec![0; num_switches];
            for (w, &s) in row.iter().enumerate() {
                if s == IDLE_WIRE {
                    continue;
                }
                if s < 0 || s as usize >= num_switches {
                    return Err(malformed(format!(
                        "wire {} at level {} uses switch {}, but the level has {} gates",
                        w, l, s, num_switches,
                    )));
                }
                uses[s as usize] += 1;
            }
            if let Some(s) = uses.iter().position(|&u| u != 2) {
                return Err(malformed(format!(
                    "switch {} at level {} has {} wires", s, l, uses[s],
                )));
            }

            let public = t.public.get(l);
            if let Some(p) = public {
                if p.len() != num_switches {
                    return Err(malformed(format!("`public[{}]` has length {}", l, p.len())));
                }
            }
            let mut level_flags = Vec::with_capacity(num_switches);
            for (s, &g) in t.gates[l].iter().enumerate() {
                let mut f = SwitchFlags::empty();
                match g {
                    0 => {},
                    1 => f.insert(SwitchFlags::F_SWAP),
                    _ => return Err(malformed(format!("gate {} at level {} is {}", s, l, g))),
                }
                if public.map_or(false, |p| p[s]) {
                    f.insert(SwitchFlags::F_PUBLIC);
                }
                level_flags.push(f);
            }
            flags.push(level_flags);
        }

        Ok(SwitchNetwork::from_parts(t.topology, n, t.switch_indexes, t.fixed_permutations, flags))
    }
}

/// Flat, serializable form of a `SwitchNetwork`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NetworkTables {
    pub topology: Topology,
    pub n: usize,
    pub level: usize,
    pub max_width: usize,
    pub switch_indexes: Vec<Vec<i32>>,
    pub fixed_permutations: Vec<Vec<u32>>,
    /// Gate bits, 0 for straight and 1 for swap, indexed by level and switch id.
    pub gates: Vec<Vec<u8>>,
    /// Which switches have a setting that does not depend on the permutation.
    #[serde(default)]
    pub public: Vec<Vec<bool>>,
}


#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Check that every permutation of `n` elements routes correctly, enumerating them by
    /// decoding each index in the factorial number system.
    fn check_all_permutations(n: usize) {
        let count: usize = (1 ..= n).product();
        for i in 0 .. count {
            let mut pool = (0 .. n as u32).collect::<Vec<_>>();
            let mut p = vec![0; n];
            let mut x = i;
            for j in (0 .. n).rev() {
                let k = x % (j + 1);
                x /= j + 1;
                // Like `p[j] = pool.swap_remove(k)`
                p[j] = pool[k];
                pool[k] = pool[j];
            }

            for &t in &Topology::ALL {
                let net = SwitchNetwork::new(t, &p).unwrap();
                assert_eq!(net.realized_permutation(), p, "{} network for {:?}", t, p);
            }
        }
    }

    #[test]
    fn test_all_small_permutations() {
        init();
        for n in 0 ..= 6 {
            check_all_permutations(n);
        }
    }

    #[test]
    fn test_invalid_permutation() {
        init();
        for &t in &Topology::ALL {
            assert_eq!(
                SwitchNetwork::new(t, &[0, 2, 2]),
                Err(Error::InvalidPermutation { len: 3, index: 2, value: 2 }),
            );
            assert!(SwitchNetwork::new(t, &[1, 5]).is_err());
        }
    }

    #[test]
    fn test_length_mismatch() {
        init();
        let net = SwitchNetwork::new(Topology::Waksman, &[2, 0, 1]).unwrap();
        assert_eq!(
            net.evaluate(&[1, 2]),
            Err(Error::LengthMismatch { expected: 3, actual: 2 }),
        );
    }

    #[test]
    fn test_trace_output() {
        init();
        let mut rng = StdRng::seed_from_u64(1);
        let p = perm::random_permutation(13, &mut rng);
        let net = SwitchNetwork::new(Topology::Benes, &p).unwrap();
        for b in 0 .. 13 {
            let steps = net.trace_output(b);
            assert_eq!(steps.len(), net.level() + 1);
            assert_eq!(steps[0], p[b as usize]);
            assert_eq!(*steps.last().unwrap(), b);
        }
    }

    #[test]
    fn test_switch_wires_match_indexes() {
        init();
        let mut rng = StdRng::seed_from_u64(2);
        let p = perm::random_permutation(23, &mut rng);
        for &t in &Topology::ALL {
            let net = SwitchNetwork::new(t, &p).unwrap();
            for l in 0 .. net.level() {
                assert_eq!(net.switch_wires(l).len(), net.num_switches_in(l));
                for (s, &[a, b]) in net.switch_wires(l).iter().enumerate() {
                    assert!(a < b);
                    assert_eq!(net.switch_of(l, a as usize), Some(s));
                    assert_eq!(net.switch_of(l, b as usize), Some(s));
                }
            }
        }
    }

    #[test]
    fn test_public_switches_are_straight() {
        init();
        let mut rng = StdRng::seed_from_u64(3);
        for &t in &Topology::ALL {
            for n in 2 .. 20 {
                let p = perm::random_permutation(n, &mut rng);
                let net = SwitchNetwork::new(t, &p).unwrap();
                for l in 0 .. net.level() {
                    for s in 0 .. net.num_switches_in(l) {
                        if net.flags(l, s).contains(SwitchFlags::F_PUBLIC) {
                            assert!(!net.gate(l, s));
                        }
                    }
                }
            }
        }
        // Waksman anchors its loops at the output side, so the first output switch of an even
        // network is always public.
        let net = SwitchNetwork::new(Topology::Waksman, &[3, 1, 0, 2]).unwrap();
        assert!(net.flags(2, 0).contains(SwitchFlags::F_PUBLIC));
        assert!(!net.flags(0, 0).contains(SwitchFlags::F_PUBLIC));
    }

    #[test]
    fn test_tables_round_trip() {
        init();
        let mut rng = StdRng::seed_from_u64(4);
        for &t in &Topology::ALL {
            for &n in &[0, 1, 2, 7, 16, 31] {
                let p = perm::random_permutation(n, &mut rng);
                let net = SwitchNetwork::new(t, &p).unwrap();
                let tables = net.tables();
                let json = serde_json::to_string(&tables).unwrap();
                let parsed: NetworkTables = serde_json::from_str(&json).unwrap();
                let net2 = SwitchNetwork::from_tables(parsed).unwrap();
                assert_eq!(net2, net);
                assert_eq!(net2.realized_permutation(), p);
            }
        }
    }

    #[test]
    fn test_malformed_tables() {
        init();
        let net = SwitchNetwork::new(Topology::Waksman, &[4, 2, 0, 1, 3]).unwrap();
        let good = net.tables();
        let is_malformed = |r: Result<SwitchNetwork>| match r {
            Err(Error::MalformedNetwork(_)) => true,
            _ => false,
        };

        let mut t = good.clone();
        t.level += 1;
        assert!(is_malformed(SwitchNetwork::from_tables(t)));

        let mut t = good.clone();
        t.gates[0][0] = 2;
        assert!(is_malformed(SwitchNetwork::from_tables(t)));

        let mut t = good.clone();
        t.switch_indexes[1][4] = 0;
        assert!(is_malformed(SwitchNetwork::from_tables(t)));

        let mut t = good.clone();
        t.gates[2].pop();
        assert!(is_malformed(SwitchNetwork::from_tables(t)));

        let mut t = good.clone();
        t.fixed_permutations[1][0] = t.fixed_permutations[1][1];
        assert!(is_malformed(SwitchNetwork::from_tables(t)));

        assert!(SwitchNetwork::from_tables(good).is_ok());
    }
}
