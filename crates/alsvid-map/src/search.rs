//! The per-layer A* search: node expansion, lookahead, and on-demand
//! placement.

use std::collections::{BTreeSet, BinaryHeap};
use std::io::Write;

use alsvid_arch::Edge;
use alsvid_ir::QubitId;
use serde_json::json;
use tracing::debug;

use crate::error::{MapError, MapResult};
use crate::layering::{canonical_pair, GateRef};
use crate::mapper::HeuristicMapper;
use crate::node::{SearchNode, SingleMultiplicity, TwoMultiplicity};

impl HeuristicMapper<'_> {
    /// Route one layer: search for the cheapest swap sequence that makes
    /// every two-qubit pair of the layer adjacent.
    pub(crate) fn a_star_map(&mut self, layer: usize) -> MapResult<SearchNode> {
        let gates = self.layers[layer].clone();
        let p = self.arch.num_qubits() as usize;

        let mut single: SingleMultiplicity = vec![0; p];
        let mut two = TwoMultiplicity::new();
        let mut considered: BTreeSet<u16> = BTreeSet::new();

        for gate in &gates {
            match *gate {
                GateRef::Single { target, .. } => {
                    single[target as usize] += 1;
                    if self.config.consider_fidelity {
                        considered.insert(target);
                    }
                }
                GateRef::Two {
                    control, target, ..
                } => {
                    let reverse = control >= target;
                    let key = canonical_pair(control, target);
                    let entry = two.entry(key).or_insert((0, 0));
                    if reverse {
                        entry.1 += 1;
                    } else {
                        entry.0 += 1;
                    }
                    considered.insert(key.0);
                    considered.insert(key.1);
                }
            }
        }

        self.map_unmapped_gates(&single, &two)?;

        let mut root = SearchNode::root(self.qubits.clone(), self.locations.clone());
        root.id = self.next_node_id;
        self.next_node_id += 1;
        root.recalculate_fixed_cost(self.arch, &single, &two, self.config.consider_fidelity);
        root.update_heuristic_cost(
            self.arch,
            &single,
            &two,
            considered.len(),
            self.config.admissible_heuristic,
            self.config.consider_fidelity,
        );
        // an infinite estimate means a pair is unreachable on this device
        if !root.cost_heur.is_finite() {
            return Err(MapError::NoViableMapping { layer });
        }

        let mut heap = BinaryHeap::new();
        heap.push(root);
        let mut best_done: Option<SearchNode> = None;
        let mut expanded = 0usize;

        // search to the first goal node; in fidelity mode keep going while
        // cheaper-looking nodes remain (the fidelity heuristic is not a
        // strict lower bound)
        loop {
            let Some(head_cost) = heap.peek().map(SearchNode::total_cost) else {
                break;
            };
            if let Some(best) = &best_done {
                if head_cost >= best.total_fixed_cost() {
                    break;
                }
            }
            let Some(current) = heap.pop() else { break };

            if current.done {
                if !self.config.consider_fidelity {
                    best_done = Some(current);
                    break;
                }
                let improves = best_done
                    .as_ref()
                    .map_or(true, |b| current.total_fixed_cost() < b.total_fixed_cost());
                if improves {
                    best_done = Some(current.clone());
                }
                // a done node may still pay off further swaps in fidelity
                // mode, so it is expanded like any other
            }

            expanded += 1;
            self.expand_node(&mut heap, &considered, &current, layer, &single, &two)?;
        }

        let result = best_done.ok_or(MapError::NoViableMapping { layer })?;

        if !self.settling {
            debug!(
                layer,
                expanded,
                swaps = result.nswaps,
                cost = result.cost_fixed,
                "layer routed"
            );
            if let Some(file) = &mut self.data_log {
                let record = json!({
                    "layer": layer,
                    "expanded_nodes": expanded,
                    "cost_fixed": result.cost_fixed,
                    "swaps": result.nswaps,
                });
                writeln!(file, "{record}")?;
            }
        }
        Ok(result)
    }

    /// Generate all children of a node: one swap (or teleportation) per
    /// candidate edge incident to a considered qubit's location.
    fn expand_node(
        &mut self,
        heap: &mut BinaryHeap<SearchNode>,
        considered: &BTreeSet<u16>,
        node: &SearchNode,
        layer: usize,
        single: &SingleMultiplicity,
        two: &TwoMultiplicity,
    ) -> MapResult<()> {
        let p = self.arch.num_qubits() as usize;
        let mut used_swaps = vec![false; p * p];

        // virtual edges contributed by the reserved teleportation pairs at
        // their current locations
        let mut teleport_pairs: Vec<Edge> = vec![];
        let mut virtual_edges: BTreeSet<Edge> = BTreeSet::new();
        let n_logical = self.circuit.num_qubits() as usize;
        for i in (0..self.config.teleportation_qubits).step_by(2) {
            let (Some(p1), Some(p2)) = (
                node.locations[n_logical + i],
                node.locations[n_logical + i + 1],
            ) else {
                continue;
            };
            teleport_pairs.push((p1, p2));
            for &(u, v) in self.arch.coupling_map() {
                if u == p1 && v != p2 {
                    virtual_edges.insert((v, p2));
                }
                if v == p1 && u != p2 {
                    virtual_edges.insert((u, p2));
                }
                if u == p2 && v != p1 {
                    virtual_edges.insert((v, p1));
                }
                if v == p2 && u != p1 {
                    virtual_edges.insert((u, p1));
                }
            }
        }

        let mut perms = self.arch.coupling_map().clone();
        perms.extend(virtual_edges.iter().copied());

        for &q in considered {
            let Some(loc) = node.locations[q as usize] else {
                continue;
            };
            for &edge in &perms {
                if edge.0 != loc && edge.1 != loc {
                    continue;
                }
                let q1 = node.qubits[edge.0 as usize];
                let q2 = node.qubits[edge.1 as usize];
                if let (Some(q1), Some(q2)) = (q1, q2) {
                    // the same logical pair exchanged across another edge is
                    // a duplicate permutation
                    let key = q1 as usize * p + q2 as usize;
                    if used_swaps[key] {
                        continue;
                    }
                    used_swaps[key] = true;
                    used_swaps[q2 as usize * p + q1 as usize] = true;
                }
                self.expand_node_add_one_swap(
                    heap,
                    edge,
                    node,
                    layer,
                    single,
                    two,
                    considered.len(),
                    &teleport_pairs,
                    &virtual_edges,
                )?;
            }
        }
        Ok(())
    }

    /// Clone the parent, apply one swap or teleportation, re-evaluate the
    /// heuristic and lookahead, and queue the child.
    #[allow(clippy::too_many_arguments)]
    fn expand_node_add_one_swap(
        &mut self,
        heap: &mut BinaryHeap<SearchNode>,
        swap: Edge,
        node: &SearchNode,
        layer: usize,
        single: &SingleMultiplicity,
        two: &TwoMultiplicity,
        considered_count: usize,
        teleport_pairs: &[Edge],
        virtual_edges: &BTreeSet<Edge>,
    ) -> MapResult<()> {
        let mut child = SearchNode {
            id: self.next_node_id,
            parent: node.id,
            qubits: node.qubits.clone(),
            locations: node.locations.clone(),
            swaps: node.swaps.clone(),
            nswaps: node.nswaps + 1,
            depth: node.depth + 1,
            cost_fixed: node.cost_fixed,
            cost_heur: 0.0,
            lookahead_penalty: 0.0,
            done: false,
            valid_mapped_two_qubit_gates: node.valid_mapped_two_qubit_gates.clone(),
        };
        self.next_node_id += 1;

        child.swaps.push(vec![]);
        if self.arch.is_edge_connected(swap.0, swap.1) {
            child.apply_swap(swap, self.arch, single, two, self.config.consider_fidelity)?;
        } else {
            child.apply_teleportation(
                swap,
                self.arch,
                teleport_pairs,
                self.config.consider_fidelity,
            )?;
        }
        child.update_heuristic_cost(
            self.arch,
            single,
            two,
            considered_count,
            self.config.admissible_heuristic,
            self.config.consider_fidelity,
        );
        if self.config.lookahead {
            self.lookahead(self.next_layer(layer), &mut child, virtual_edges);
        }
        heap.push(child);
        Ok(())
    }

    /// Penalize a child for placements that hurt upcoming layers, with
    /// geometrically decaying weight per layer.
    fn lookahead(
        &self,
        start: Option<usize>,
        node: &mut SearchNode,
        virtual_edges: &BTreeSet<Edge>,
    ) {
        let mut factor = self.config.first_lookahead_factor;
        let mut next = start;

        for _ in 0..self.config.nr_lookaheads {
            let Some(layer) = next else { break };
            let mut penalty: f64 = 0.0;

            for gate in &self.layers[layer] {
                let GateRef::Two {
                    control, target, ..
                } = *gate
                else {
                    continue;
                };
                let loc1 = node.locations[control as usize];
                let loc2 = node.locations[target as usize];
                let cost = match (loc1, loc2) {
                    (None, None) => continue,
                    (Some(l1), Some(l2)) => {
                        self.arch.distance_with_teleportations(l1, l2, virtual_edges)
                    }
                    (mapped, _) => {
                        // one endpoint still floats: the best it can do is
                        // land on the nearest free physical qubit
                        let anchor = mapped.or(loc2).unwrap_or_default();
                        let mut min = f64::INFINITY;
                        for (free, occupant) in node.qubits.iter().enumerate() {
                            if occupant.is_none() {
                                min = min.min(self.arch.distance_with_teleportations(
                                    anchor,
                                    free as u16,
                                    virtual_edges,
                                ));
                            }
                        }
                        min
                    }
                };
                penalty = if self.config.admissible_heuristic {
                    penalty.max(cost)
                } else {
                    penalty + cost
                };
            }

            node.lookahead_penalty += factor * penalty;
            factor *= self.config.lookahead_factor;
            next = self.next_layer(layer);
        }
    }

    /// The next layer after `idx` that contains a two-qubit gate.
    pub(crate) fn next_layer(&self, idx: usize) -> Option<usize> {
        self.layers
            .iter()
            .enumerate()
            .skip(idx + 1)
            .find(|(_, layer)| layer.iter().any(|g| !g.is_single()))
            .map(|(idx, _)| idx)
    }

    /// Place every logical qubit the current layer needs but that has no
    /// location yet.
    pub(crate) fn map_unmapped_gates(
        &mut self,
        single: &SingleMultiplicity,
        two: &TwoMultiplicity,
    ) -> MapResult<()> {
        if self.config.consider_fidelity {
            // single-qubit-only logicals must sit somewhere for their gate
            // costs to be accounted
            for (q, &mult) in single.iter().enumerate() {
                if mult == 0 || self.locations[q].is_some() {
                    continue;
                }
                for phys in 0..self.arch.num_qubits() {
                    if self.qubits[phys as usize].is_none() {
                        self.place(q as u16, phys);
                        break;
                    }
                }
            }
        }

        for &(a, b) in two.keys() {
            let a_loc = self.locations[a as usize];
            let b_loc = self.locations[b as usize];
            match (a_loc, b_loc) {
                (None, None) => {
                    let free_edge = self.arch.coupling_map().iter().copied().find(|&(u, v)| {
                        self.qubits[u as usize].is_none() && self.qubits[v as usize].is_none()
                    });
                    let chosen = match free_edge {
                        Some(edge) => edge,
                        None => self.closest_free_pair()?,
                    };
                    self.place(a, chosen.0);
                    self.place(b, chosen.1);
                }
                (Some(_), None) => self.map_to_min_distance(a, b)?,
                (None, Some(_)) => self.map_to_min_distance(b, a)?,
                (Some(_), Some(_)) => {}
            }
        }
        Ok(())
    }

    /// The pair of free physical qubits with minimal distance.
    fn closest_free_pair(&self) -> MapResult<Edge> {
        let mut best: Option<(f64, Edge)> = None;
        for i in 0..self.arch.num_qubits() {
            for j in (i + 1)..self.arch.num_qubits() {
                if self.qubits[i as usize].is_some() || self.qubits[j as usize].is_some() {
                    continue;
                }
                let dist = self.arch.distance(i, j);
                if best.map_or(true, |(d, _)| dist < d) {
                    best = Some((dist, (i, j)));
                }
            }
        }
        best.map(|(_, edge)| edge)
            .ok_or(MapError::CircuitTooLarge {
                required: self.circuit.num_qubits() as usize
                    + self.config.teleportation_qubits,
                available: self.arch.num_qubits(),
            })
    }

    /// Map `target` to the free physical qubit closest to `source`'s
    /// location.
    fn map_to_min_distance(&mut self, source: u16, target: u16) -> MapResult<()> {
        let Some(src_loc) = self.locations[source as usize] else {
            return Err(MapError::UnsupportedOperation(
                "min-distance placement with unmapped anchor".into(),
            ));
        };
        let mut best: Option<(f64, u16)> = None;
        for phys in 0..self.arch.num_qubits() {
            if self.qubits[phys as usize].is_some() {
                continue;
            }
            let dist = if self.config.consider_fidelity {
                self.arch.fidelity_distance(src_loc, phys, 0)
            } else {
                self.arch.distance(src_loc, phys)
            };
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, phys));
            }
        }
        let (_, pos) = best.ok_or(MapError::CircuitTooLarge {
            required: self.circuit.num_qubits() as usize + self.config.teleportation_qubits,
            available: self.arch.num_qubits(),
        })?;
        self.place(target, pos);
        Ok(())
    }

    /// Commit a placement decision and patch the mapped circuit's layouts.
    fn place(&mut self, logical: u16, phys: u16) {
        self.locations[logical as usize] = Some(phys);
        self.qubits[phys as usize] = Some(logical);
        self.mapped
            .initial_layout
            .find_and_swap(QubitId::from(logical), phys);
        self.mapped
            .output_permutation
            .find_and_swap(QubitId::from(logical), phys);
    }
}
