//! Plain permutation helpers shared by the network builders and their tests.
//!
//! Permutations use the "gather" convention throughout: applying `map` to `input` produces
//! `output[i] = input[map[i]]`.
use std::convert::TryFrom;
use rand::Rng;
use rand::seq::SliceRandom;
use crate::error::{Error, Result};

/// Number of levels in a Waksman or Benes network on `n` wires.
pub fn level(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    n.next_power_of_two().trailing_zeros() as usize * 2 - 1
}

/// Maximum number of switches in a single level of a network on `n` wires.
pub fn max_width(n: usize) -> usize {
    n / 2
}

pub fn is_valid_permutation(map: &[u32]) -> bool {
    validate(map).is_ok()
}

/// Check that `map` is a bijection on `0 .. map.len()`.
pub fn validate(map: &[u32]) -> Result<()> {
    let len = map.len();
    let mut seen = vec![false; len];
    for (index, &value) in map.iter().enumerate() {
        let j = value as usize;
        if j >= len || seen[j] {
            return Err(Error::InvalidPermutation { len, index, value });
        }
        seen[j] = true;
    }
    Ok(())
}

pub fn identity(n: usize) -> Vec<u32> {
    assert!(u32::try_from(n).is_ok(), "permutation size {} overflows u32", n);
    (0 .. n as u32).collect()
}

/// Draw a uniformly random permutation of `0 .. n`.
pub fn random_permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<u32> {
    let mut map = identity(n);
    map.shuffle(rng);
    map
}

/// Reference application of `map` to `input`: `output[i] = input[map[i]]`.  Panics if `map`
/// refers to an index outside of `input`.
pub fn direct_apply<T: Clone>(map: &[u32], input: &[T]) -> Vec<T> {
    map.iter().map(|&j| input[j as usize].clone()).collect()
}

/// The inverse of `map`, so that `direct_apply(&invert(map), &direct_apply(map, xs)) == xs`.
pub fn invert(map: &[u32]) -> Vec<u32> {
    let mut inv = vec![0; map.len()];
    for (i, &j) in map.iter().enumerate() {
        inv[j as usize] = i as u32;
    }
    inv
}

/// The permutation that applies `first` and then `second`.
pub fn compose(first: &[u32], second: &[u32]) -> Vec<u32> {
    assert_eq!(first.len(), second.len());
    second.iter().map(|&j| first[j as usize]).collect()
}
