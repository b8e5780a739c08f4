//! Search nodes for the per-layer A* routing search.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use alsvid_arch::cost::{
    COST_BIDIRECTIONAL_SWAP, COST_TELEPORTATION, COST_UNIDIRECTIONAL_SWAP,
};
use alsvid_arch::{Architecture, Edge};
use rustc_hash::FxHashSet;

use crate::error::{MapError, MapResult};

/// The kind of routing operation recorded on a search branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKind {
    /// A SWAP across a real coupling edge.
    Swap,
    /// A teleportation across a reserved ancilla pair.
    Teleport,
}

/// One committed routing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOp {
    /// First physical qubit.
    pub first: u16,
    /// Second physical qubit.
    pub second: u16,
    /// SWAP or teleportation.
    pub kind: SwapKind,
    /// Middle ancilla for teleportations.
    pub middle: Option<u16>,
}

/// Number of single-qubit gates per logical qubit in the current layer.
pub type SingleMultiplicity = Vec<u32>;

/// Per canonical logical pair `(a, b)` with `a < b`: the number of layer
/// gates with control `a` (forward) and with control `b` (reverse).
pub type TwoMultiplicity = BTreeMap<(u16, u16), (u32, u32)>;

/// One state of the per-layer A* search: a placement permutation plus the
/// swaps that produced it and its cost bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Node id; also the FIFO tiebreak for equal-cost nodes.
    pub id: u64,
    /// Id of the node this one was expanded from.
    pub parent: u64,
    /// Logical qubit occupying each physical qubit.
    pub qubits: Vec<Option<u16>>,
    /// Physical location of each logical qubit.
    pub locations: Vec<Option<u16>>,
    /// Swap batches applied along this branch, root to leaf.
    pub swaps: Vec<Vec<SwapOp>>,
    /// Total number of swaps along this branch.
    pub nswaps: usize,
    /// Expansion depth.
    pub depth: usize,
    /// g(n): cost already paid.
    pub cost_fixed: f64,
    /// h(n): estimated remaining cost.
    pub cost_heur: f64,
    /// Discounted estimate for upcoming layers.
    pub lookahead_penalty: f64,
    /// True iff every two-qubit pair of the layer is adjacent.
    pub done: bool,
    /// Pairs whose gate cost is included in `cost_fixed` (fidelity mode).
    pub valid_mapped_two_qubit_gates: FxHashSet<(u16, u16)>,
}

impl SearchNode {
    /// Create a root node from a committed placement.
    pub fn root(qubits: Vec<Option<u16>>, locations: Vec<Option<u16>>) -> Self {
        Self {
            id: 0,
            parent: 0,
            qubits,
            locations,
            swaps: vec![],
            nswaps: 0,
            depth: 0,
            cost_fixed: 0.0,
            cost_heur: 0.0,
            lookahead_penalty: 0.0,
            done: false,
            valid_mapped_two_qubit_gates: FxHashSet::default(),
        }
    }

    /// f(n): ordering key of the search queue.
    #[inline]
    pub fn total_cost(&self) -> f64 {
        self.cost_fixed + self.cost_heur + self.lookahead_penalty
    }

    /// The cost of this node once its heuristic share is realized.
    #[inline]
    pub fn total_fixed_cost(&self) -> f64 {
        self.cost_fixed + self.lookahead_penalty
    }

    /// Exchange the occupants of a coupling edge and account for the cost.
    pub fn apply_swap(
        &mut self,
        swap: Edge,
        arch: &Architecture,
        single: &SingleMultiplicity,
        two: &TwoMultiplicity,
        consider_fidelity: bool,
    ) -> MapResult<()> {
        if !arch.is_edge_connected(swap.0, swap.1) {
            return Err(MapError::InvalidSwap {
                first: swap.0,
                second: swap.1,
            });
        }

        let q1 = self.qubits[swap.0 as usize];
        let q2 = self.qubits[swap.1 as usize];
        self.qubits[swap.0 as usize] = q2;
        self.qubits[swap.1 as usize] = q1;
        if let Some(q1) = q1 {
            self.locations[q1 as usize] = Some(swap.1);
        }
        if let Some(q2) = q2 {
            self.locations[q2 as usize] = Some(swap.0);
        }

        if let Some(batch) = self.swaps.last_mut() {
            batch.push(SwapOp {
                first: swap.0,
                second: swap.1,
                kind: SwapKind::Swap,
                middle: None,
            });
        }

        if consider_fidelity {
            let q1_mult = q1.map_or(0.0, |q| f64::from(single[q as usize]));
            let q2_mult = q2.map_or(0.0, |q| f64::from(single[q as usize]));
            // single-qubit gates previously charged at one endpoint now
            // execute at the other
            self.cost_fixed += (q2_mult - q1_mult) * arch.single_qubit_fidelity_cost(swap.0)
                + (q1_mult - q2_mult) * arch.single_qubit_fidelity_cost(swap.1);
            self.cost_fixed += arch.swap_fidelity_cost(swap.0, swap.1);
            self.reassess_touched_pairs(swap, q1, q2, arch, two);
        } else if arch.bidirectional() {
            self.cost_fixed += COST_BIDIRECTIONAL_SWAP;
        } else {
            self.cost_fixed += COST_UNIDIRECTIONAL_SWAP;
        }
        Ok(())
    }

    /// Re-evaluate which two-qubit pairs are executable after a swap of
    /// the logicals `q1`, `q2` across `swap`, moving their gate costs in
    /// or out of `cost_fixed`.
    fn reassess_touched_pairs(
        &mut self,
        swap: Edge,
        q1: Option<u16>,
        q2: Option<u16>,
        arch: &Architecture,
        two: &TwoMultiplicity,
    ) {
        for (&(a, b), &(forward, reverse)) in two {
            let touched = q1 == Some(a) || q1 == Some(b) || q2 == Some(a) || q2 == Some(b);
            if !touched {
                continue;
            }
            let (Some(loc_a), Some(loc_b)) =
                (self.locations[a as usize], self.locations[b as usize])
            else {
                continue;
            };
            let now_valid = arch.is_edge_connected(loc_a, loc_b);
            let was_valid = self.valid_mapped_two_qubit_gates.contains(&(a, b));
            if now_valid && !was_valid {
                self.cost_fixed += pair_gate_cost(arch, loc_a, loc_b, forward, reverse);
                self.valid_mapped_two_qubit_gates.insert((a, b));
            } else if !now_valid && was_valid {
                // the pair was executable before this swap moved it apart;
                // remove the cost charged at the pre-swap locations
                let prev_a = pre_swap_location(a, q1, q2, swap, loc_a);
                let prev_b = pre_swap_location(b, q1, q2, swap, loc_b);
                self.cost_fixed -= pair_gate_cost(arch, prev_a, prev_b, forward, reverse);
                self.valid_mapped_two_qubit_gates.remove(&(a, b));
            }
        }
    }

    /// Exchange the occupants of a virtual teleportation edge.
    pub fn apply_teleportation(
        &mut self,
        swap: Edge,
        arch: &Architecture,
        teleportation_pairs: &[Edge],
        consider_fidelity: bool,
    ) -> MapResult<()> {
        if consider_fidelity {
            return Err(MapError::IncompatibleConfig(
                "teleportation is not supported for fidelity-aware mapping".into(),
            ));
        }

        let q1 = self.qubits[swap.0 as usize];
        let q2 = self.qubits[swap.1 as usize];
        self.qubits[swap.0 as usize] = q2;
        self.qubits[swap.1 as usize] = q1;
        if let Some(q1) = q1 {
            self.locations[q1 as usize] = Some(swap.1);
        }
        if let Some(q2) = q2 {
            self.locations[q2 as usize] = Some(swap.0);
        }

        let mut middle = None;
        for &(anc1, anc2) in teleportation_pairs {
            if swap.0 == anc1 || swap.1 == anc1 {
                middle = Some(anc2);
            } else if swap.0 == anc2 || swap.1 == anc2 {
                middle = Some(anc1);
            }
        }
        let middle = middle.ok_or(MapError::TeleportationFailed {
            first: swap.0,
            second: swap.1,
        })?;

        // the endpoint with a real connection to the ancilla is the source
        let (source, target) = if arch.is_edge_connected(swap.0, middle) {
            (swap.0, swap.1)
        } else {
            (swap.1, swap.0)
        };
        if source == middle || target == middle {
            return Err(MapError::TeleportationFailed {
                first: swap.0,
                second: swap.1,
            });
        }

        if let Some(batch) = self.swaps.last_mut() {
            batch.push(SwapOp {
                first: source,
                second: target,
                kind: SwapKind::Teleport,
                middle: Some(middle),
            });
        }
        self.cost_fixed += COST_TELEPORTATION;
        Ok(())
    }

    /// Recompute `cost_fixed` (and the valid-pair set) from scratch.
    ///
    /// Used once per layer on the root node; children update incrementally.
    pub fn recalculate_fixed_cost(
        &mut self,
        arch: &Architecture,
        single: &SingleMultiplicity,
        two: &TwoMultiplicity,
        consider_fidelity: bool,
    ) {
        self.cost_fixed = 0.0;
        self.valid_mapped_two_qubit_gates.clear();

        if consider_fidelity {
            for (q, &mult) in single.iter().enumerate() {
                if mult == 0 {
                    continue;
                }
                if let Some(loc) = self.locations[q] {
                    self.cost_fixed += f64::from(mult) * arch.single_qubit_fidelity_cost(loc);
                }
            }
            for batch in &self.swaps {
                for swap in batch {
                    self.cost_fixed += arch.swap_fidelity_cost(swap.first, swap.second);
                }
            }
            for (&(a, b), &(forward, reverse)) in two {
                let (Some(loc_a), Some(loc_b)) =
                    (self.locations[a as usize], self.locations[b as usize])
                else {
                    continue;
                };
                if arch.is_edge_connected(loc_a, loc_b) {
                    self.cost_fixed += pair_gate_cost(arch, loc_a, loc_b, forward, reverse);
                    self.valid_mapped_two_qubit_gates.insert((a, b));
                }
            }
        } else {
            for batch in &self.swaps {
                for swap in batch {
                    self.cost_fixed += match swap.kind {
                        SwapKind::Swap => {
                            if arch.bidirectional() {
                                COST_BIDIRECTIONAL_SWAP
                            } else {
                                COST_UNIDIRECTIONAL_SWAP
                            }
                        }
                        SwapKind::Teleport => COST_TELEPORTATION,
                    };
                }
            }
        }
    }

    /// Recompute `cost_heur` and the `done` flag for the current placement.
    pub fn update_heuristic_cost(
        &mut self,
        arch: &Architecture,
        single: &SingleMultiplicity,
        two: &TwoMultiplicity,
        considered_count: usize,
        admissible_heuristic: bool,
        consider_fidelity: bool,
    ) {
        self.cost_heur = 0.0;
        self.done = true;

        // fidelity savings obtainable by moving single-qubit gates to
        // better physical qubits
        let mut savings_potential = 0.0;
        if consider_fidelity {
            for (q, &mult) in single.iter().enumerate() {
                if mult == 0 {
                    continue;
                }
                let Some(loc) = self.locations[q] else {
                    continue;
                };
                let current_cost = arch.single_qubit_fidelity_cost(loc);
                let mut qubit_savings: f64 = 0.0;
                for phys in 0..arch.num_qubits() {
                    if arch.single_qubit_fidelity_cost(phys) >= current_cost {
                        continue;
                    }
                    let savings = f64::from(mult)
                        * (current_cost - arch.single_qubit_fidelity_cost(phys))
                        - arch.fidelity_distance(loc, phys, considered_count);
                    qubit_savings = qubit_savings.max(savings);
                }
                savings_potential += qubit_savings;
            }
        }

        for (&(a, b), &(forward, reverse)) in two {
            let (Some(loc_a), Some(loc_b)) =
                (self.locations[a as usize], self.locations[b as usize])
            else {
                self.done = false;
                continue;
            };
            let edge_done = arch.is_edge_connected(loc_a, loc_b);
            if !edge_done {
                self.done = false;
            }

            if consider_fidelity {
                // cheapest edge to remap the pair to, counting the swaps to
                // get there plus executing all shared gates there
                let mut swap_cost = f64::INFINITY;
                for &(e1, e2) in arch.coupling_map() {
                    let fwd = f64::from(forward);
                    let rev = f64::from(reverse);
                    swap_cost = swap_cost.min(
                        fwd * arch.two_qubit_fidelity_cost(e1, e2)
                            + rev * arch.two_qubit_fidelity_cost(e2, e1)
                            + arch.fidelity_distance(loc_a, e1, considered_count)
                            + arch.fidelity_distance(loc_b, e2, considered_count),
                    );
                    swap_cost = swap_cost.min(
                        fwd * arch.two_qubit_fidelity_cost(e2, e1)
                            + rev * arch.two_qubit_fidelity_cost(e1, e2)
                            + arch.fidelity_distance(loc_b, e1, considered_count)
                            + arch.fidelity_distance(loc_a, e2, considered_count),
                    );
                }

                if edge_done {
                    let current_cost = pair_gate_cost(arch, loc_a, loc_b, forward, reverse);
                    savings_potential += current_cost - swap_cost;
                } else if admissible_heuristic {
                    self.cost_heur = self.cost_heur.max(swap_cost);
                } else {
                    self.cost_heur += swap_cost;
                }
            } else {
                let swap_cost_straight = arch.distance(loc_a, loc_b);
                let swap_cost_reverse = arch.distance(loc_b, loc_a);
                if admissible_heuristic {
                    if forward > 0 {
                        self.cost_heur = self.cost_heur.max(swap_cost_straight);
                    }
                    if reverse > 0 {
                        self.cost_heur = self.cost_heur.max(swap_cost_reverse);
                    }
                } else {
                    self.cost_heur += swap_cost_straight * f64::from(forward)
                        + swap_cost_reverse * f64::from(reverse);
                }
            }
        }

        self.cost_heur -= savings_potential;
    }

    /// Check that `qubits` and `locations` are inverse partial bijections.
    pub fn is_consistent(&self) -> bool {
        for (p, q) in self.qubits.iter().enumerate() {
            if let Some(q) = q {
                if self.locations[*q as usize] != Some(p as u16) {
                    return false;
                }
            }
        }
        for (q, p) in self.locations.iter().enumerate() {
            if let Some(p) = p {
                if self.qubits[*p as usize] != Some(q as u16) {
                    return false;
                }
            }
        }
        true
    }
}

/// Fidelity cost of executing all of a pair's layer gates at the given
/// physical locations.
fn pair_gate_cost(arch: &Architecture, loc_a: u16, loc_b: u16, forward: u32, reverse: u32) -> f64 {
    f64::from(forward) * arch.two_qubit_fidelity_cost(loc_a, loc_b)
        + f64::from(reverse) * arch.two_qubit_fidelity_cost(loc_b, loc_a)
}

/// Where logical `l` sat before the swap of occupants `q1`/`q2` across
/// `swap` was applied.
fn pre_swap_location(l: u16, q1: Option<u16>, q2: Option<u16>, swap: Edge, current: u16) -> u16 {
    if q1 == Some(l) {
        swap.0
    } else if q2 == Some(l) {
        swap.1
    } else {
        current
    }
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed for a min-heap on total cost; FIFO on ties
        other
            .total_cost()
            .total_cmp(&self.total_cost())
            .then_with(|| other.id.cmp(&self.id))
    }
}
