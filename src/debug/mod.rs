//! Human-readable dumps of a `SwitchNetwork`, for debugging and golden tests.
use std::fmt::Write;
use crate::routing::SwitchNetwork;

pub mod svg;

pub use self::svg::dump_svg;

/// List every switch of every level with its wires and flags.
pub fn dump(net: &SwitchNetwork) -> String {
    let mut s = String::new();
    for l in 0 .. net.level() {
        writeln!(s, "level {}:", l).unwrap();
        for (i, wires) in net.switch_wires(l).iter().enumerate() {
            writeln!(
                s, "  switch {}: wires {:?}, flags {:?}",
                i, wires, net.flags(l, i),
            ).unwrap();
        }
    }
    s
}

/// Print the permutation-independent structure of the network: the switch index and fixed
/// relabeling of every level.  Two networks of the same topology and size always produce the
/// same layout.
pub fn dump_layout(net: &SwitchNetwork) -> String {
    let mut s = String::new();
    writeln!(
        s, "{} n={} levels={} max_width={}",
        net.topology(), net.n(), net.level(), net.max_width(),
    ).unwrap();
    for (l, (row, fixed)) in net.switch_indexes().iter().zip(net.fixed_permutations()).enumerate() {
        writeln!(s, "level {}: switches {:?} fixed {:?}", l, row, fixed).unwrap();
    }
    s
}
