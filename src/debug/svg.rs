use std::fmt::{self, Write};
use crate::routing::{SwitchFlags, SwitchNetwork};

const LEVEL_WIDTH: usize = 200;
const SWITCH_WIDTH: usize = 100;
const ROW_HEIGHT: usize = 40;
const MARGIN: usize = 25;

fn row_y(w: u32) -> usize {
    w as usize * ROW_HEIGHT + MARGIN
}

fn line(
    s: &mut String,
    (x0, y0): (usize, usize),
    (x1, y1): (usize, usize),
    color: &str,
) -> fmt::Result {
    writeln!(
        s, "<path d='M {},{} L {},{}' style='stroke: {}; stroke-width: 3px' />",
        x0, y0, x1, y1, color,
    )
}

/// Render the network as an SVG image.  Public switches are drawn in blue and the others in
/// red.  If `highlight` is set, the path of the value that ends up at that output is drawn in
/// red.
pub fn dump_svg(net: &SwitchNetwork, highlight: Option<u32>) -> Result<String, fmt::Error> {
    // For each level, the wire position of the highlighted value before and after the switches.
    let path = highlight.map(|b| {
        let xs = net.trace_output(b);
        (0 .. net.level()).map(|l| {
            let out = xs[l + 1];
            let inp = match net.switch_of(l, out as usize) {
                Some(i) if net.gate(l, i) => {
                    let [w0, w1] = net.switch_wires(l)[i];
                    if out == w0 { w1 } else { w0 }
                },
                _ => out,
            };
            (inp, out)
        }).collect::<Vec<_>>()
    });
    let color = |l: usize, w: u32, after_switch: bool| {
        match path {
            Some(ref p) if (if after_switch { p[l].1 } else { p[l].0 }) == w => "red",
            _ => "black",
        }
    };

    let mut s = String::new();
    writeln!(s, "<?xml version='1.0' encoding='UTF-8' standalone='no'?>")?;
    writeln!(
        s, "<svg width='{}' height='{}' xmlns='http://www.w3.org/2000/svg'>",
        net.level() * LEVEL_WIDTH + 2 * MARGIN,
        net.n() * ROW_HEIGHT + MARGIN,
    )?;
    for l in 0 .. net.level() {
        let x0 = l * LEVEL_WIDTH + 50;
        let x1 = x0 + SWITCH_WIDTH;
        let prev_x = if l == 0 { 0 } else { x0 - (LEVEL_WIDTH - SWITCH_WIDTH) };

        for (i, &j) in net.fixed_permutations()[l].iter().enumerate() {
            let i = i as u32;
            line(&mut s, (prev_x, row_y(j)), (x0, row_y(i)), color(l, i, false))?;
        }

        for (i, &[w0, w1]) in net.switch_wires(l).iter().enumerate() {
            let flags = net.flags(l, i);
            let (top, bottom) = (w0.min(w1), w0.max(w1));
            writeln!(
                s, "<rect x='{}' y='{}' width='{}' height='{}' \
                    style='stroke: black; stroke-width: 3px; fill: {}' />",
                x0, row_y(top) - 12,
                SWITCH_WIDTH, row_y(bottom) - row_y(top) + 24,
                if flags.contains(SwitchFlags::F_PUBLIC) { "#ccccff" } else { "#ffcccc" },
            )?;

            let (e0, e1) = if flags.contains(SwitchFlags::F_SWAP) {
                (w1, w0)
            } else {
                (w0, w1)
            };
            line(&mut s, (x0, row_y(w0)), (x1, row_y(e0)), color(l, e0, true))?;
            line(&mut s, (x0, row_y(w1)), (x1, row_y(e1)), color(l, e1, true))?;
        }

        for w in 0 .. net.n() {
            if net.switch_of(l, w).is_none() {
                let w = w as u32;
                line(&mut s, (x0, row_y(w)), (x1, row_y(w)), color(l, w, true))?;
            }
        }
    }
    writeln!(s, "</svg>")?;
    Ok(s)
}
