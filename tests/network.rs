use std::sync::Arc;
use std::thread;
use permnet::perm;
use permnet::routing::{self, PermutationDecomposer, SwitchNetwork, Topology, IDLE_WIRE};
use proptest::collection::vec;
use proptest::prelude::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const PERM_8: [u32; 8] = [1, 7, 3, 5, 2, 0, 4, 6];

#[test]
fn scenario_a_single_switch() {
    init();
    for &t in &Topology::ALL {
        let net = SwitchNetwork::new(t, &[1, 0]).unwrap();
        assert_eq!(net.level(), 1);
        assert_eq!(net.max_width(), 1);
        assert_eq!(net.num_switches(), 1);
        assert_eq!(net.switch_indexes(), &[vec![0, 0]]);
        assert_eq!(net.gates(0), vec![true]);
        assert_eq!(net.evaluate(&["a", "b"]).unwrap(), vec!["b", "a"]);
    }
}

#[test]
fn scenario_b_evaluate() {
    init();
    let v = (0 .. 8).collect::<Vec<u32>>();
    for &t in &Topology::ALL {
        let net = routing::build(t, &PERM_8).unwrap();
        assert_eq!(net.level(), 5);
        assert_eq!(net.max_width(), 4);
        assert_eq!(net.evaluate(&v).unwrap(), PERM_8.to_vec());
    }
}

#[test]
fn scenario_c_waksman_switch_indexes() {
    init();
    let p = [3, 8, 0, 6, 1, 7, 2, 5, 4];
    let net = SwitchNetwork::new(Topology::Waksman, &p).unwrap();
    let row = vec![0, 0, 1, 1, 2, 2, 3, 3, -1];
    let mid = vec![0, 0, 1, 1, 2, 2, -1, 3, 3];
    let expected = vec![
        row.clone(), row.clone(), row.clone(), mid, row.clone(), row.clone(), row,
    ];
    assert_eq!(net.level(), 7);
    assert_eq!(net.max_width(), 4);
    assert_eq!(net.switch_indexes(), &expected[..]);
    assert_eq!(net.evaluate(&perm::identity(9)).unwrap(), p.to_vec());
}

#[test]
fn scenario_d_decompose_rounds() {
    init();
    let d = PermutationDecomposer::new(&PERM_8, 2).unwrap();
    assert_eq!(d.sub_num(), 4);
    assert_eq!(d.rounds(), 5);

    let mut v = (0 .. 8).collect::<Vec<u32>>();
    for round in 0 .. d.rounds() {
        assert_eq!(d.split_groups()[round].len(), 4);
        for (group, sub) in d.split_groups()[round].iter().zip(&d.sub_permutations()[round]) {
            assert_eq!(group.len(), 2);
            assert!(perm::is_valid_permutation(sub));
        }
        d.apply_round(round, &mut v);
    }
    assert_eq!(v, PERM_8.to_vec());
}

#[test]
fn evaluate_with_duplicates() {
    init();
    let p = [2, 0, 4, 1, 3, 6, 5];
    let xs = ["x", "y", "x", "z", "y", "x", "z"];
    for &t in &Topology::ALL {
        let net = SwitchNetwork::new(t, &p).unwrap();
        assert_eq!(net.evaluate(&xs).unwrap(), perm::direct_apply(&p, &xs));
    }
}

#[test]
fn concurrent_evaluate() {
    init();
    let p = perm::invert(&PERM_8);
    let net = Arc::new(SwitchNetwork::new(Topology::Benes, &p).unwrap());
    let handles = (0 .. 4u32).map(|k| {
        let net = Arc::clone(&net);
        thread::spawn(move || {
            let xs = (0 .. 8).map(|i| i + 8 * k).collect::<Vec<u32>>();
            net.evaluate(&xs).unwrap()
        })
    }).collect::<Vec<_>>();
    for (k, h) in handles.into_iter().enumerate() {
        let xs = (0 .. 8).map(|i| i + 8 * k as u32).collect::<Vec<u32>>();
        assert_eq!(h.join().unwrap(), perm::direct_apply(&p, &xs));
    }
}

#[test]
fn layout_depends_only_on_size() {
    init();
    for &t in &Topology::ALL {
        let a = SwitchNetwork::new(t, &perm::identity(21)).unwrap();
        let b = SwitchNetwork::new(t, &perm::invert(&[
            20, 3, 7, 1, 0, 15, 2, 9, 11, 4, 19, 5, 6, 8, 10, 12, 13, 14, 16, 17, 18,
        ])).unwrap();
        assert_eq!(a.switch_indexes(), b.switch_indexes());
        assert_eq!(a.fixed_permutations(), b.fixed_permutations());
    }
}


fn arb_topology() -> impl Strategy<Value = Topology> {
    prop_oneof![Just(Topology::Waksman), Just(Topology::Benes)]
}

fn arb_perm(max_n: usize) -> impl Strategy<Value = Vec<u32>> {
    (0 .. max_n).prop_flat_map(|n| Just(perm::identity(n)).prop_shuffle())
}

/// A permutation together with a payload of the same length, with plenty of duplicates.
fn arb_perm_and_payload(max_n: usize) -> impl Strategy<Value = (Vec<u32>, Vec<u8>)> {
    (0 .. max_n).prop_flat_map(|n| (Just(perm::identity(n)).prop_shuffle(), vec(0u8 .. 4, n)))
}

/// A power-of-two permutation and a supported block size for it.
fn arb_decomposable() -> impl Strategy<Value = (Vec<u32>, usize)> {
    (0u32 .. 8).prop_flat_map(|k| {
        let n = 1usize << k;
        let t = if k == 0 { Just(0u32).boxed() } else { (1 ..= k).boxed() };
        (Just(perm::identity(n)).prop_shuffle(), t.prop_map(|j| 1usize << j))
    })
}

proptest! {
    #[test]
    fn evaluate_matches_direct_apply(t in arb_topology(), (p, xs) in arb_perm_and_payload(70)) {
        let net = SwitchNetwork::new(t, &p).unwrap();
        prop_assert_eq!(net.evaluate(&xs).unwrap(), perm::direct_apply(&p, &xs));
    }

    #[test]
    fn level_and_width(t in arb_topology(), p in arb_perm(70)) {
        let n = p.len();
        let net = SwitchNetwork::new(t, &p).unwrap();
        let expected_level = if n <= 1 {
            0
        } else {
            2 * (64 - (n as u64 - 1).leading_zeros() as usize) - 1
        };
        prop_assert_eq!(net.level(), expected_level);
        prop_assert_eq!(net.max_width(), n / 2);
        for l in 0 .. net.level() {
            prop_assert!(net.num_switches_in(l) <= n / 2);
        }
    }

    #[test]
    fn construction_is_deterministic(t in arb_topology(), p in arb_perm(50)) {
        let a = SwitchNetwork::new(t, &p).unwrap();
        let b = SwitchNetwork::new(t, &p).unwrap();
        prop_assert_eq!(a.tables(), b.tables());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn idle_wires_pass_through(t in arb_topology(), p in arb_perm(50)) {
        let n = p.len();
        let net = SwitchNetwork::new(t, &p).unwrap();
        let mut xs = perm::identity(n);
        for l in 0 .. net.level() {
            let row = &net.switch_indexes()[l];
            let idle = row.iter().filter(|&&s| s == IDLE_WIRE).count();
            prop_assert_eq!(n - idle, 2 * net.num_switches_in(l));
            if n % 2 == 1 {
                prop_assert_eq!(idle % 2, 1);
            }

            let relabeled = perm::direct_apply(&net.fixed_permutations()[l], &xs);
            let ys = net.apply_level(l, &xs);
            for (w, &s) in row.iter().enumerate() {
                if s == IDLE_WIRE {
                    prop_assert_eq!(ys[w], relabeled[w]);
                }
            }
            xs = ys;
        }
        prop_assert_eq!(xs, p);
    }

    #[test]
    fn decomposer_reproduces_permutation((p, t) in arb_decomposable()) {
        let n = p.len();
        let d = PermutationDecomposer::new(&p, t).unwrap();
        prop_assert_eq!(d.sub_num(), n / t);
        let xs = (0 .. n).map(|i| i * 3 + 1).collect::<Vec<_>>();
        prop_assert_eq!(d.apply(&xs).unwrap(), perm::direct_apply(&p, &xs));
    }
}
