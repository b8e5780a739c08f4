//! Distance-table construction.
//!
//! The routing heuristic needs, for every pair of physical qubits, the
//! cheapest cost of bringing the pair together with SWAPs. Two subtleties
//! distinguish this from plain shortest paths:
//!
//! - On devices with unidirectional edges, a CNOT executed against the
//!   native direction pays a reversal surcharge. Every path starts out
//!   assuming the surcharge; the first forward edge encountered along a
//!   path removes it again.
//! - The final hop of a path may be absorbed by the gate to be executed
//!   (the gate itself realizes the adjacency), so callers can choose a
//!   table that drops the weight of the last traversed edge.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::BTreeSet;

/// A directed coupling edge between two physical qubits.
pub type Edge = (u16, u16);

/// Dense square cost matrix.
pub type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Clone, Copy)]
struct PathState {
    cost: f64,
    prev_cost: f64,
    contains_forward_edge: bool,
    visited: bool,
}

struct QueueEntry {
    cost: f64,
    pos: u16,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we need the cheapest first
        other.cost.total_cmp(&self.cost)
    }
}

/// Build the all-pairs distance table.
///
/// `edge_weights[u][v]` is the cost of one SWAP across the (undirected)
/// connection `u—v`. `reversal_cost` is the surcharge for a path that never
/// traverses a forward edge. With `skip_last_edge` the weight of the final
/// hop is excluded (the gate to be executed absorbs it).
pub fn build_table(
    num_qubits: u16,
    coupling_map: &BTreeSet<Edge>,
    edge_weights: &Matrix,
    reversal_cost: f64,
    skip_last_edge: bool,
) -> Matrix {
    let n = num_qubits as usize;
    let mut table = vec![vec![f64::INFINITY; n]; n];

    // undirected adjacency; `forward` records whether the directed edge exists
    let mut adjacency: Vec<Vec<(u16, bool)>> = vec![vec![]; n];
    for &(u, v) in coupling_map {
        if !adjacency[u as usize].iter().any(|&(to, _)| to == v) {
            adjacency[u as usize].push((v, true));
        } else if let Some(entry) = adjacency[u as usize].iter_mut().find(|(to, _)| *to == v) {
            entry.1 = true;
        }
        if !adjacency[v as usize].iter().any(|&(to, _)| to == u) {
            adjacency[v as usize].push((u, false));
        }
    }

    for src in 0..n {
        let mut states = vec![
            PathState {
                cost: f64::INFINITY,
                prev_cost: f64::INFINITY,
                contains_forward_edge: false,
                visited: false,
            };
            n
        ];
        // all paths initially assume a CNOT reversal will be necessary; the
        // surcharge is removed once a forward edge is traversed
        states[src].cost = reversal_cost;
        states[src].prev_cost = reversal_cost;

        let mut queue = BinaryHeap::new();
        queue.push(QueueEntry {
            cost: reversal_cost,
            pos: src as u16,
        });

        while let Some(QueueEntry { pos, .. }) = queue.pop() {
            if states[pos as usize].visited {
                continue;
            }
            states[pos as usize].visited = true;
            let current = states[pos as usize];

            for &(to, forward) in &adjacency[pos as usize] {
                if states[to as usize].visited {
                    continue;
                }
                let mut cost = current.cost + edge_weights[pos as usize][to as usize];
                let mut prev_cost = current.cost;
                let contains_forward_edge = current.contains_forward_edge || forward;
                if contains_forward_edge && !current.contains_forward_edge {
                    // first forward edge along this path: the reversal
                    // surcharge no longer applies
                    cost -= reversal_cost;
                    prev_cost -= reversal_cost;
                }
                let candidate_better = match cost.total_cmp(&states[to as usize].cost) {
                    Ordering::Less => true,
                    Ordering::Equal => {
                        contains_forward_edge && !states[to as usize].contains_forward_edge
                    }
                    Ordering::Greater => false,
                };
                if candidate_better {
                    states[to as usize] = PathState {
                        cost,
                        prev_cost,
                        contains_forward_edge,
                        visited: false,
                    };
                    queue.push(QueueEntry { cost, pos: to });
                }
            }
        }

        for dst in 0..n {
            table[src][dst] = if src == dst {
                0.0
            } else if skip_last_edge {
                states[dst].prev_cost
            } else {
                states[dst].cost
            };
        }
    }

    table
}

/// Build edge-skip distance tables on top of a base distance table.
///
/// `tables[k][a][b]` is the cheapest `a → b` cost when up to `k` coupling
/// edges along the way may be traversed for free. To skip one edge, assume
/// each coupling edge in turn to be the skipped one and stitch the base
/// distances to its endpoints together; skipping `k` edges reuses the
/// table for `l` skips on one side and `k − l − 1` on the other.
/// Construction stops once a table is identically zero.
pub fn build_edge_skip_table(
    base: &Matrix,
    coupling_map: &BTreeSet<Edge>,
) -> Vec<Matrix> {
    let n = base.len();
    let mut tables: Vec<Matrix> = vec![base.clone()];

    for k in 1..=n {
        let mut current = vec![vec![f64::INFINITY; n]; n];
        for (q, row) in current.iter_mut().enumerate() {
            row[q] = 0.0;
        }

        for &(e1, e2) in coupling_map {
            let (e1, e2) = (e1 as usize, e2 as usize);
            for l in 0..k {
                for q1 in 0..n {
                    for q2 in (q1 + 1)..n {
                        let via = f64::min(
                            tables[l][q1][e1] + tables[k - l - 1][e2][q2],
                            tables[l][q1][e2] + tables[k - l - 1][e1][q2],
                        );
                        if via < current[q1][q2] {
                            current[q1][q2] = via;
                            current[q2][q1] = via;
                        }
                    }
                }
            }
        }

        let all_zero = current
            .iter()
            .all(|row| row.iter().all(|&c| c == 0.0 || c == f64::INFINITY));
        if all_zero {
            break;
        }
        tables.push(current);
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{COST_BIDIRECTIONAL_SWAP, COST_DIRECTION_REVERSE, COST_UNIDIRECTIONAL_SWAP};

    fn uniform_weights(n: usize, w: f64) -> Matrix {
        vec![vec![w; n]; n]
    }

    fn line3_directed() -> BTreeSet<Edge> {
        [(0, 1), (1, 2)].into_iter().collect()
    }

    fn ring5() -> BTreeSet<Edge> {
        let mut cm = BTreeSet::new();
        for i in 0u16..5 {
            cm.insert((i, (i + 1) % 5));
            cm.insert(((i + 1) % 5, i));
        }
        cm
    }

    #[test]
    fn test_forward_distances_on_directed_line() {
        let weights = uniform_weights(3, COST_UNIDIRECTIONAL_SWAP);
        let table = build_table(3, &line3_directed(), &weights, COST_DIRECTION_REVERSE, true);

        // adjacent, forward: the gate absorbs the hop
        assert_eq!(table[0][1], 0.0);
        // adjacent, reverse-only: just the H sandwich
        assert_eq!(table[1][0], COST_DIRECTION_REVERSE);
        // two forward hops: one swap
        assert_eq!(table[0][2], COST_UNIDIRECTIONAL_SWAP);
        // two reverse hops: one swap plus the reversal
        assert_eq!(table[2][0], COST_UNIDIRECTIONAL_SWAP + COST_DIRECTION_REVERSE);
    }

    #[test]
    fn test_symmetry_on_bidirectional_ring() {
        let weights = uniform_weights(5, COST_BIDIRECTIONAL_SWAP);
        let table = build_table(5, &ring5(), &weights, 0.0, true);

        for u in 0..5 {
            for v in 0..5 {
                assert_eq!(table[u][v], table[v][u], "distance asymmetry at ({u},{v})");
            }
        }
        // around the ring the far side is two hops, one swap
        assert_eq!(table[0][2], COST_BIDIRECTIONAL_SWAP);
        assert_eq!(table[0][1], 0.0);
    }

    #[test]
    fn test_unreachable_pair() {
        let cm: BTreeSet<Edge> = [(0, 1)].into_iter().collect();
        let weights = uniform_weights(3, 1.0);
        let table = build_table(3, &cm, &weights, 0.0, false);
        assert!(table[0][2].is_infinite());
    }

    #[test]
    fn test_edge_skip_monotonicity() {
        let weights = uniform_weights(5, COST_BIDIRECTIONAL_SWAP);
        let base = build_table(5, &ring5(), &weights, 0.0, false);
        let tables = build_edge_skip_table(&base, &ring5());

        assert!(tables.len() > 1);
        for k in 0..tables.len() - 1 {
            for u in 0..5 {
                for v in 0..5 {
                    assert!(
                        tables[k + 1][u][v] <= tables[k][u][v],
                        "edge-skip not monotone at k={k}, ({u},{v})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_edge_skip_adjacent_is_free() {
        let weights = uniform_weights(5, COST_BIDIRECTIONAL_SWAP);
        let base = build_table(5, &ring5(), &weights, 0.0, false);
        let tables = build_edge_skip_table(&base, &ring5());

        // skipping one edge makes adjacent qubits free to reach
        assert_eq!(tables[1][0][1], 0.0);
        // 0 -> 2 can skip one of its two hops
        assert_eq!(tables[1][0][2], COST_BIDIRECTIONAL_SWAP);
        // no pair on the ring is more than two hops away, so the skip-2
        // table would be identically zero and is never materialized
        assert_eq!(tables.len(), 2);
    }
}
