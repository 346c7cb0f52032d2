// tests/property_validator.rs

use std::collections::BTreeSet;

use pipeflow::dag::validate;
use proptest::prelude::*;

// Strategy to generate a DAG over vertices 1..=n with at least one edge.
// We ensure acyclicity by only allowing vertex i to depend on vertices < i.
fn dag_strategy(max_vertices: u64) -> impl Strategy<Value = (Vec<u64>, Vec<(u64, u64)>)> {
    (2..=max_vertices).prop_flat_map(|n| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<u64>(), 0..n as usize),
            n as usize,
        );

        deps.prop_map(move |raw| {
            let vertices: Vec<u64> = (1..=n).collect();
            let mut edges = BTreeSet::new();
            for (i, picks) in raw.into_iter().enumerate() {
                let head = i as u64 + 1;
                for pick in picks {
                    if head > 1 {
                        edges.insert((pick % (head - 1) + 1, head));
                    }
                }
            }
            // keep the graph non-trivial
            edges.insert((1, 2));
            (vertices, edges.into_iter().collect())
        })
    })
}

proptest! {
    #[test]
    fn forward_edge_dags_validate((vertices, edges) in dag_strategy(12)) {
        prop_assert!(validate(&vertices, &edges));
        // idempotent
        prop_assert!(validate(&vertices, &edges));
    }

    #[test]
    fn back_edge_along_a_path_breaks_acyclicity(n in 2u64..12) {
        let vertices: Vec<u64> = (1..=n).collect();
        let mut edges: Vec<(u64, u64)> = (1..n).map(|v| (v, v + 1)).collect();
        prop_assert!(validate(&vertices, &edges));

        edges.push((n, 1));
        prop_assert!(!validate(&vertices, &edges));
    }

    #[test]
    fn edge_order_does_not_matter(
        (vertices, edges) in dag_strategy(10),
        seed in any::<u64>(),
    ) {
        let mut shuffled = edges.clone();
        let len = shuffled.len();
        if len > 1 {
            shuffled.rotate_left((seed % len as u64) as usize);
            shuffled.reverse();
        }
        prop_assert_eq!(validate(&vertices, &edges), validate(&vertices, &shuffled));
    }
}
