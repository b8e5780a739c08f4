//! Device model: connectivity, distances, and fidelity data.

use std::collections::BTreeSet;
use std::io::BufRead;

use petgraph::graph::UnGraph;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::calibration::CalibrationData;
use crate::cost::{
    fidelity_cost, COST_BIDIRECTIONAL_SWAP, COST_DIRECTION_REVERSE, COST_TELEPORTATION,
    COST_UNIDIRECTIONAL_SWAP,
};
use crate::dijkstra::{self, Edge, Matrix};
use crate::error::{ArchError, ArchResult};

/// A set of physical qubit indices.
pub type QubitSubset = BTreeSet<u16>;

/// A target device: coupling graph plus precomputed routing tables.
///
/// The model is read-only after construction; independent routings may
/// share one `Architecture` by reference.
#[derive(Debug, Clone, Default)]
pub struct Architecture {
    name: String,
    num_qubits: u16,
    coupling_map: BTreeSet<Edge>,
    bidirectional: bool,
    /// All-pairs SWAP distances, last edge skipped (the routed gate itself
    /// realizes the final adjacency).
    distance_table: Matrix,
    calibration: Vec<CalibrationData>,
    single_qubit_fidelity_costs: Vec<f64>,
    two_qubit_fidelity_costs: FxHashMap<Edge, f64>,
    swap_fidelity_costs: FxHashMap<Edge, f64>,
    /// Edge-skip distance tables over the swap-fidelity-weighted graph.
    fidelity_distance_tables: Vec<Matrix>,
}

impl Architecture {
    /// Build a device from an explicit edge list.
    pub fn from_edge_list(
        num_qubits: u16,
        edges: impl IntoIterator<Item = Edge>,
    ) -> ArchResult<Self> {
        let mut arch = Self {
            name: format!("generic_{num_qubits}"),
            num_qubits,
            coupling_map: edges.into_iter().collect(),
            ..Self::default()
        };
        for &(u, v) in &arch.coupling_map {
            for q in [u, v] {
                if q >= num_qubits {
                    return Err(ArchError::QubitOutOfRange {
                        qubit: q,
                        num_qubits,
                    });
                }
            }
        }
        arch.build_distance_table();
        Ok(arch)
    }

    /// Load a device from a coupling-map description.
    ///
    /// The first non-blank line is the qubit count; each subsequent line
    /// `u v` defines one directed edge.
    pub fn load_coupling_map(name: impl Into<String>, reader: impl BufRead) -> ArchResult<Self> {
        let mut num_qubits: Option<u16> = None;
        let mut edges = BTreeSet::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match num_qubits {
                None => {
                    num_qubits = Some(line.parse().map_err(|_| {
                        ArchError::InvalidCouplingMap(format!(
                            "no qubit count found in coupling map file: {line}"
                        ))
                    })?);
                }
                Some(_) => {
                    let mut parts = line.split_whitespace();
                    let (u, v) = match (parts.next(), parts.next(), parts.next()) {
                        (Some(u), Some(v), None) => (u, v),
                        _ => {
                            return Err(ArchError::InvalidCouplingMap(format!(
                                "could not identify edge in coupling map file: {line}"
                            )))
                        }
                    };
                    let parse = |s: &str| {
                        s.parse::<u16>().map_err(|_| {
                            ArchError::InvalidCouplingMap(format!("invalid qubit index: {s}"))
                        })
                    };
                    edges.insert((parse(u)?, parse(v)?));
                }
            }
        }

        let num_qubits = num_qubits
            .ok_or_else(|| ArchError::InvalidCouplingMap("empty coupling map file".into()))?;
        let mut arch = Self::from_edge_list(num_qubits, edges)?;
        arch.name = name.into();
        Ok(arch)
    }

    /// Load calibration data from a CSV stream (header line first).
    ///
    /// If no coupling map has been loaded, the edges are inferred from the
    /// CNOT entries. Edges without a calibrated error fall back to the
    /// running average over all calibrated edges.
    pub fn load_calibration(&mut self, reader: impl BufRead) -> ArchResult<()> {
        let mut lines = reader.lines();
        lines
            .next()
            .transpose()?
            .ok_or_else(|| ArchError::InvalidCalibration("empty calibration file".into()))?;

        let had_coupling_map = !self.coupling_map.is_empty();
        let mut calibration = vec![];
        let mut average_error = 0.0;
        let mut num_errors = 0usize;

        let mut qubit = 0u16;
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = CalibrationData::from_csv_row(qubit, &line)?;
            qubit += 1;
            for (&edge, &err) in &entry.cnot_errors {
                if !had_coupling_map {
                    self.coupling_map.insert(edge);
                }
                num_errors += 1;
                average_error += (err - average_error) / num_errors as f64;
            }
            calibration.push(entry);
        }

        if calibration.is_empty() {
            return Err(ArchError::InvalidCalibration(
                "calibration file contains no qubit rows".into(),
            ));
        }

        if !had_coupling_map {
            self.num_qubits = calibration.len() as u16;
            for &(u, v) in &self.coupling_map {
                let worst = u.max(v);
                if worst >= self.num_qubits {
                    return Err(ArchError::QubitOutOfRange {
                        qubit: worst,
                        num_qubits: self.num_qubits,
                    });
                }
            }
            self.build_distance_table();
        } else if calibration.len() != self.num_qubits as usize {
            return Err(ArchError::InvalidCalibration(format!(
                "calibration covers {} qubits, device has {}",
                calibration.len(),
                self.num_qubits
            )));
        }

        // fill uncalibrated edges with the average error
        for &(u, v) in &self.coupling_map {
            let entry = &mut calibration[u as usize];
            entry.cnot_errors.entry((u, v)).or_insert(average_error);
        }

        self.calibration = calibration;
        self.build_fidelity_tables();
        Ok(())
    }

    fn build_distance_table(&mut self) {
        self.bidirectional = self
            .coupling_map
            .iter()
            .all(|&(u, v)| self.coupling_map.contains(&(v, u)));
        debug!(
            name = %self.name,
            bidirectional = self.bidirectional,
            "building distance table"
        );

        let n = self.num_qubits as usize;
        let (swap_cost, reversal_cost) = if self.bidirectional {
            (COST_BIDIRECTIONAL_SWAP, 0.0)
        } else {
            (COST_UNIDIRECTIONAL_SWAP, COST_DIRECTION_REVERSE)
        };
        let edge_weights = vec![vec![swap_cost; n]; n];
        self.distance_table = dijkstra::build_table(
            self.num_qubits,
            &self.coupling_map,
            &edge_weights,
            reversal_cost,
            true,
        );
    }

    fn build_fidelity_tables(&mut self) {
        let n = self.num_qubits as usize;

        self.single_qubit_fidelity_costs = self
            .calibration
            .iter()
            .map(|c| fidelity_cost(c.single_qubit_error))
            .collect();

        self.two_qubit_fidelity_costs.clear();
        for entry in &self.calibration {
            for (&edge, &err) in &entry.cnot_errors {
                self.two_qubit_fidelity_costs.insert(edge, fidelity_cost(err));
            }
        }

        // SWAP = three CNOTs; on a one-way connection the middle CNOT is
        // reversed with four Hadamards
        self.swap_fidelity_costs.clear();
        let mut edge_weights = vec![vec![0.0; n]; n];
        for &(u, v) in &self.coupling_map {
            let forward = self.two_qubit_fidelity_costs[&(u, v)];
            let cost = if self.coupling_map.contains(&(v, u)) {
                let reverse = self.two_qubit_fidelity_costs[&(v, u)];
                2.0 * forward + reverse
            } else {
                3.0 * forward
                    + 2.0 * self.single_qubit_fidelity_costs[u as usize]
                    + 2.0 * self.single_qubit_fidelity_costs[v as usize]
            };
            self.swap_fidelity_costs.insert((u, v), cost);
            edge_weights[u as usize][v as usize] = cost;
            if !self.coupling_map.contains(&(v, u)) {
                edge_weights[v as usize][u as usize] = cost;
            }
        }

        let base = dijkstra::build_table(
            self.num_qubits,
            &self.coupling_map,
            &edge_weights,
            0.0,
            false,
        );
        self.fidelity_distance_tables = dijkstra::build_edge_skip_table(&base, &self.coupling_map);
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of physical qubits.
    pub fn num_qubits(&self) -> u16 {
        self.num_qubits
    }

    /// The directed coupling edges.
    pub fn coupling_map(&self) -> &BTreeSet<Edge> {
        &self.coupling_map
    }

    /// True iff every edge has its reverse.
    pub fn bidirectional(&self) -> bool {
        self.bidirectional
    }

    /// True iff calibration data is loaded.
    pub fn supports_fidelity(&self) -> bool {
        !self.calibration.is_empty()
    }

    /// Loaded calibration records.
    pub fn calibration(&self) -> &[CalibrationData] {
        &self.calibration
    }

    /// Check whether two physical qubits are connected (either direction).
    #[inline]
    pub fn is_edge_connected(&self, u: u16, v: u16) -> bool {
        self.coupling_map.contains(&(u, v)) || self.coupling_map.contains(&(v, u))
    }

    /// SWAP distance between two physical qubits (last edge skipped).
    #[inline]
    pub fn distance(&self, u: u16, v: u16) -> f64 {
        self.distance_table[u as usize][v as usize]
    }

    /// Fidelity-weighted distance between two physical qubits, allowed to
    /// skip up to `carry` coupling edges (other qubits routed in the same
    /// batch carry the qubit along for free).
    ///
    /// Returns infinity if no calibration is loaded.
    #[inline]
    pub fn fidelity_distance(&self, u: u16, v: u16, carry: usize) -> f64 {
        match self.fidelity_distance_tables.len() {
            0 => f64::INFINITY,
            len => self.fidelity_distance_tables[carry.min(len - 1)][u as usize][v as usize],
        }
    }

    /// Fidelity cost of the single-qubit gates on a physical qubit.
    #[inline]
    pub fn single_qubit_fidelity_cost(&self, q: u16) -> f64 {
        self.single_qubit_fidelity_costs
            .get(q as usize)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Fidelity cost of a CNOT along the directed edge `(u, v)`.
    #[inline]
    pub fn two_qubit_fidelity_cost(&self, u: u16, v: u16) -> f64 {
        self.two_qubit_fidelity_costs
            .get(&(u, v))
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Fidelity cost of a SWAP across the connection `(u, v)`.
    #[inline]
    pub fn swap_fidelity_cost(&self, u: u16, v: u16) -> f64 {
        self.swap_fidelity_costs
            .get(&(u, v))
            .or_else(|| self.swap_fidelity_costs.get(&(v, u)))
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Distance between two physical qubits when the given virtual
    /// teleportation edges are usable alongside the coupling map.
    ///
    /// BFS over shortest paths; a path that never traverses a forward
    /// coupling edge pays the direction-reversal surcharge. A single pure
    /// teleportation hop costs one teleportation.
    pub fn distance_with_teleportations(
        &self,
        start: u16,
        goal: u16,
        teleportations: &BTreeSet<Edge>,
    ) -> f64 {
        if teleportations.is_empty() {
            return self.distance(start, goal);
        }
        if start == goal {
            return 0.0;
        }

        let mut queue = std::collections::VecDeque::new();
        queue.push_back(vec![start]);
        let mut solutions: Vec<Vec<u16>> = vec![];
        let mut length = 0usize;

        while let Some(path) = queue.pop_front() {
            let current = *path.last().unwrap_or(&start);
            if current == goal {
                length = path.len();
                solutions.push(path);
                break;
            }
            let mut successors = BTreeSet::new();
            for &(u, v) in self.coupling_map.iter().chain(teleportations.iter()) {
                if u == current && !path.contains(&v) {
                    successors.insert(v);
                }
                if v == current && !path.contains(&u) {
                    successors.insert(u);
                }
            }
            for succ in successors {
                let mut next = path.clone();
                next.push(succ);
                queue.push_back(next);
            }
        }

        while queue.front().is_some_and(|front| front.len() == length) {
            if let Some(front) = queue.pop_front() {
                if front.last() == Some(&goal) {
                    solutions.push(front);
                }
            }
        }

        if solutions.is_empty() {
            return f64::INFINITY;
        }

        let swap_unit = if self.bidirectional {
            COST_BIDIRECTIONAL_SWAP
        } else {
            COST_UNIDIRECTIONAL_SWAP
        };
        let swaps = (length - 2) as f64;

        // a path containing any forward coupling edge avoids the reversal
        for path in &solutions {
            for hop in path.windows(2) {
                if self.coupling_map.contains(&(hop[0], hop[1])) {
                    return swaps * swap_unit;
                }
            }
        }
        if length == 2 && !self.is_edge_connected(start, goal) {
            return COST_TELEPORTATION;
        }
        swaps * swap_unit + COST_DIRECTION_REVERSE
    }

    /// The coupling limit: the longest simple path reachable from any
    /// qubit, following directed edges. Bounds the number of SWAPs any
    /// single routing step can require.
    pub fn coupling_limit(&self) -> usize {
        self.coupling_limit_for(&self.coupling_map, None)
    }

    /// Coupling limit restricted to a subset of qubits.
    pub fn coupling_limit_of(&self, subset: &QubitSubset) -> usize {
        self.coupling_limit_for(&self.coupling_map, Some(subset))
    }

    fn coupling_limit_for(&self, cm: &BTreeSet<Edge>, subset: Option<&QubitSubset>) -> usize {
        let n = self.num_qubits as usize;
        let mut connections: Vec<Vec<u16>> = vec![vec![]; n];
        for &(u, v) in cm {
            let keep = subset.map_or(true, |s| s.contains(&u) && s.contains(&v));
            if keep {
                connections[u as usize].push(v);
            }
        }

        let mut max_sum = 0usize;
        for q in 0..n {
            if subset.is_some() && connections[q].is_empty() {
                continue;
            }
            let mut longest = vec![0usize; n];
            let mut visited = vec![false; n];
            longest_path_dfs(q as u16, 0, &connections, &mut longest, &mut visited);
            let best = longest.into_iter().max().unwrap_or(0);
            max_sum = max_sum.max(best);
        }
        max_sum
    }

    /// All physical qubits as a subset.
    pub fn qubit_set(&self) -> QubitSubset {
        (0..self.num_qubits).collect()
    }

    /// The coupling edges whose endpoints both lie in `subset`.
    pub fn reduced_coupling_map(&self, subset: &QubitSubset) -> BTreeSet<Edge> {
        self.coupling_map
            .iter()
            .copied()
            .filter(|(u, v)| subset.contains(u) && subset.contains(v))
            .collect()
    }

    /// Enumerate all `size`-element qubit subsets whose induced coupling
    /// subgraph is connected.
    pub fn connected_subsets(&self, size: u16) -> ArchResult<Vec<QubitSubset>> {
        if size == 0 {
            return Err(ArchError::EmptySubset);
        }
        if size > self.num_qubits {
            return Err(ArchError::SubsetTooLarge {
                requested: size,
                available: self.num_qubits,
            });
        }
        if size == self.num_qubits {
            return Ok(vec![self.qubit_set()]);
        }

        let mut result = vec![];
        let mut current = vec![];
        enumerate_subsets(0, self.num_qubits, size as usize, &mut current, &mut |subset| {
            let subset: QubitSubset = subset.iter().copied().collect();
            if self.is_connected(&subset) {
                result.push(subset);
            }
        });
        Ok(result)
    }

    /// Reduced coupling maps of all connected `size`-qubit subsets.
    pub fn reduced_coupling_maps(&self, size: u16) -> ArchResult<Vec<BTreeSet<Edge>>> {
        Ok(self
            .connected_subsets(size)?
            .iter()
            .map(|subset| self.reduced_coupling_map(subset))
            .collect())
    }

    /// Check whether a qubit subset induces a connected subgraph.
    pub fn is_connected(&self, subset: &QubitSubset) -> bool {
        let mut graph = UnGraph::<u16, ()>::default();
        let mut nodes = FxHashMap::default();
        for &q in subset {
            nodes.insert(q, graph.add_node(q));
        }
        for (u, v) in self.reduced_coupling_map(subset) {
            if u != v {
                graph.add_edge(nodes[&u], nodes[&v], ());
            }
        }
        petgraph::algo::connected_components(&graph) <= 1
    }

    /// Product of induced-edge and member-qubit fidelities for a subset.
    pub fn average_fidelity(&self, map: &BTreeSet<Edge>, subset: &QubitSubset) -> f64 {
        if self.calibration.is_empty() {
            return 0.0;
        }
        let mut result = 1.0;
        for &(u, v) in map {
            if let Some(err) = self.calibration[u as usize].cnot_errors.get(&(u, v)) {
                result *= 1.0 - err;
            }
        }
        for &q in subset {
            result *= 1.0 - self.calibration[q as usize].single_qubit_error;
        }
        result
    }

    /// The connected `size`-qubit subset with the highest fidelity
    /// product, as a reduced coupling map.
    ///
    /// Without calibration data (or when the subset covers the whole
    /// device) the full coupling map is returned.
    pub fn highest_fidelity_coupling_map(&self, size: u16) -> ArchResult<BTreeSet<Edge>> {
        if self.calibration.is_empty() || size == self.num_qubits {
            return Ok(self.coupling_map.clone());
        }
        let mut best_fidelity = 0.0;
        let mut best_map = self.coupling_map.clone();
        for subset in self.connected_subsets(size)? {
            let map = self.reduced_coupling_map(&subset);
            let fidelity = self.average_fidelity(&map, &subset);
            if fidelity > best_fidelity {
                best_fidelity = fidelity;
                best_map = map;
            }
        }
        Ok(best_map)
    }

    /// Minimum number of SWAPs (restricted to coupling edges among the
    /// permuted qubits) needed to realize `permutation`, where the qubit at
    /// the i-th smallest used index must end up holding `permutation[i]`.
    ///
    /// With `limit` set, the search aborts once every candidate needs more
    /// than `limit` swaps and returns `limit + 1`.
    pub fn minimum_number_of_swaps(&self, permutation: &[u16], limit: Option<usize>) -> usize {
        self.swap_search(permutation, limit)
            .map_or_else(|n| n, |seq| seq.len())
    }

    /// The shortest SWAP sequence realizing `permutation`, as edges.
    pub fn minimum_swap_sequence(&self, permutation: &[u16]) -> Vec<Edge> {
        self.swap_search(permutation, None).unwrap_or_default()
    }

    /// Uniform-cost search over edge transpositions. `Ok` carries the swap
    /// sequence; `Err` carries the count when aborted by the limit.
    fn swap_search(
        &self,
        permutation: &[u16],
        limit: Option<usize>,
    ) -> Result<Vec<Edge>, usize> {
        let used: BTreeSet<u16> = permutation.iter().copied().collect();

        let mut goal = FxHashMap::default();
        let mut identity = true;
        for (q, &target) in used.iter().zip(permutation.iter()) {
            goal.insert(*q, target);
            if *q != target {
                identity = false;
            }
        }
        if identity {
            return Ok(vec![]);
        }

        // SWAPs between qubits not being permuted never help
        let mut possible_swaps: BTreeSet<Edge> = BTreeSet::new();
        for &(u, v) in &self.coupling_map {
            if !used.contains(&u) || !used.contains(&v) {
                continue;
            }
            if !possible_swaps.contains(&(v, u)) {
                possible_swaps.insert((u, v));
            }
        }

        let start: Vec<u16> = (0..self.num_qubits).collect();
        let is_done =
            |perm: &[u16]| goal.iter().all(|(&q, &target)| perm[q as usize] == target);

        let mut visited: BTreeSet<Vec<u16>> = BTreeSet::new();
        visited.insert(start.clone());
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((start, vec![]));

        while let Some((perm, swaps)) = queue.pop_front() {
            if let Some(limit) = limit {
                if swaps.len() >= limit {
                    return Err(limit + 1);
                }
            }
            for &swap in &possible_swaps {
                let mut next = perm.clone();
                next.swap(swap.0 as usize, swap.1 as usize);
                let mut next_swaps = swaps.clone();
                next_swaps.push(swap);
                if is_done(&next) {
                    return Ok(next_swaps);
                }
                if visited.insert(next.clone()) {
                    queue.push_back((next, next_swaps));
                }
            }
        }

        Err(usize::MAX)
    }
}

/// Longest simple path by DFS with backtracking.
fn longest_path_dfs(
    node: u16,
    current: usize,
    connections: &[Vec<u16>],
    longest: &mut [usize],
    visited: &mut [bool],
) {
    if visited[node as usize] {
        return;
    }
    visited[node as usize] = true;
    if longest[node as usize] < current {
        longest[node as usize] = current;
    }
    for &child in &connections[node as usize] {
        longest_path_dfs(child, current + 1, connections, longest, visited);
    }
    visited[node as usize] = false;
}

/// Enumerate all `size`-element subsets of `[from, n)` into `current`.
fn enumerate_subsets(
    from: u16,
    n: u16,
    size: usize,
    current: &mut Vec<u16>,
    emit: &mut impl FnMut(&[u16]),
) {
    if current.len() == size {
        emit(current);
        return;
    }
    let remaining = size - current.len();
    for q in from..n {
        if ((n - q) as usize) < remaining {
            break;
        }
        current.push(q);
        enumerate_subsets(q + 1, n, size, current, emit);
        current.pop();
    }
}

/// Convenience constructors for common topologies.
impl Architecture {
    /// Bidirectional linear chain 0—1—…—(n−1).
    pub fn linear(n: u16) -> Self {
        let mut edges = BTreeSet::new();
        for i in 0..n.saturating_sub(1) {
            edges.insert((i, i + 1));
            edges.insert((i + 1, i));
        }
        let mut arch = Self::from_edge_list(n, edges).unwrap_or_default();
        arch.name = format!("linear_{n}");
        arch
    }

    /// Bidirectional ring over n qubits.
    pub fn ring(n: u16) -> Self {
        let mut edges = BTreeSet::new();
        for i in 0..n {
            edges.insert((i, (i + 1) % n));
            edges.insert(((i + 1) % n, i));
        }
        let mut arch = Self::from_edge_list(n, edges).unwrap_or_default();
        arch.name = format!("ring_{n}");
        arch
    }

    /// Fully connected device over n qubits.
    pub fn fully_connected(n: u16) -> Self {
        let mut edges = BTreeSet::new();
        for u in 0..n {
            for v in (u + 1)..n {
                edges.insert((u, v));
                edges.insert((v, u));
            }
        }
        let mut arch = Self::from_edge_list(n, edges).unwrap_or_default();
        arch.name = format!("full_{n}");
        arch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_load_coupling_map() {
        let data = "3\n0 1\n1 2\n";
        let arch = Architecture::load_coupling_map("chain", Cursor::new(data)).unwrap();
        assert_eq!(arch.num_qubits(), 3);
        assert!(arch.is_edge_connected(0, 1));
        assert!(arch.is_edge_connected(1, 0)); // undirected connectivity
        assert!(!arch.bidirectional());
        assert!(!arch.is_edge_connected(0, 2));
    }

    #[test]
    fn test_load_coupling_map_rejects_garbage() {
        let data = "3\n0 - 1\n";
        assert!(Architecture::load_coupling_map("bad", Cursor::new(data)).is_err());
    }

    #[test]
    fn test_distance_symmetry_on_bidirectional() {
        let arch = Architecture::ring(5);
        assert!(arch.bidirectional());
        for u in 0..5 {
            for v in 0..5 {
                assert_eq!(arch.distance(u, v), arch.distance(v, u));
            }
        }
    }

    #[test]
    fn test_coupling_limit_linear() {
        let arch = Architecture::linear(5);
        assert_eq!(arch.coupling_limit(), 4);
    }

    #[test]
    fn test_coupling_limit_subset() {
        let arch = Architecture::linear(5);
        let subset: QubitSubset = [0, 1, 2].into_iter().collect();
        assert_eq!(arch.coupling_limit_of(&subset), 2);
    }

    #[test]
    fn test_connected_subsets() {
        let arch = Architecture::linear(4);
        let pairs = arch.connected_subsets(2).unwrap();
        // of the six 2-subsets only the three chain edges are connected
        assert_eq!(pairs.len(), 3);
        for subset in &pairs {
            let v: Vec<u16> = subset.iter().copied().collect();
            assert_eq!(v[1], v[0] + 1);
        }
    }

    #[test]
    fn test_connected_subsets_full_device() {
        let arch = Architecture::linear(3);
        let all = arch.connected_subsets(3).unwrap();
        assert_eq!(all, vec![arch.qubit_set()]);
    }

    #[test]
    fn test_subset_too_large() {
        let arch = Architecture::linear(3);
        assert!(matches!(
            arch.connected_subsets(4),
            Err(ArchError::SubsetTooLarge { .. })
        ));
    }

    #[test]
    fn test_minimum_swaps_cyclic_shift() {
        let arch = Architecture::ring(5);
        let permutation = vec![1, 2, 3, 4, 0];
        assert_eq!(arch.minimum_number_of_swaps(&permutation, None), 4);
    }

    #[test]
    fn test_minimum_swaps_identity() {
        let arch = Architecture::ring(5);
        let permutation = vec![0, 1, 2, 3, 4];
        assert_eq!(arch.minimum_number_of_swaps(&permutation, None), 0);
    }

    #[test]
    fn test_minimum_swap_sequence_realizes_permutation() {
        let arch = Architecture::ring(5);
        let permutation = vec![1, 2, 3, 4, 0];
        let swaps = arch.minimum_swap_sequence(&permutation);
        assert_eq!(swaps.len(), 4);

        let mut state: Vec<u16> = (0..5).collect();
        for (u, v) in swaps {
            assert!(arch.is_edge_connected(u, v));
            state.swap(u as usize, v as usize);
        }
        assert_eq!(state, permutation);
    }

    #[test]
    fn test_minimum_swaps_limit_aborts() {
        let arch = Architecture::ring(5);
        let permutation = vec![1, 2, 3, 4, 0];
        assert_eq!(arch.minimum_number_of_swaps(&permutation, Some(2)), 3);
    }

    fn calibration_line4() -> String {
        // errors: edges (0,1) and (1,2) at 0.1, (2,3) at 0.05
        let mut s = String::from("qubit,T1,T2,frequency,readoutError,singleErr,cnotList,date\n");
        s.push_str("Q0,50,60,4.8,0.02,0.001,\"0_1: 0.1\",2024-11-02\n");
        s.push_str("Q1,50,60,4.8,0.02,0.001,\"1_0: 0.1, 1_2: 0.1\",2024-11-02\n");
        s.push_str("Q2,50,60,4.8,0.02,0.001,\"2_1: 0.1, 2_3: 0.05\",2024-11-02\n");
        s.push_str("Q3,50,60,4.8,0.02,0.001,\"3_2: 0.05\",2024-11-02\n");
        s
    }

    #[test]
    fn test_load_calibration_on_existing_map() {
        let mut arch = Architecture::linear(4);
        arch.load_calibration(Cursor::new(calibration_line4())).unwrap();

        assert!(arch.supports_fidelity());
        let expected = fidelity_cost(0.05);
        assert!((arch.two_qubit_fidelity_cost(2, 3) - expected).abs() < 1e-12);
        // swap across a bidirectional edge is three CNOTs
        assert!((arch.swap_fidelity_cost(2, 3) - 3.0 * expected).abs() < 1e-12);
        assert!(arch.swap_fidelity_cost(2, 3) < arch.swap_fidelity_cost(0, 1));
    }

    #[test]
    fn test_load_calibration_infers_edges() {
        let mut arch = Architecture::default();
        arch.load_calibration(Cursor::new(calibration_line4())).unwrap();
        assert_eq!(arch.num_qubits(), 4);
        assert!(arch.is_edge_connected(0, 1));
        assert!(arch.is_edge_connected(2, 3));
        assert!(!arch.is_edge_connected(0, 3));
    }

    #[test]
    fn test_fidelity_distance_monotone_in_carry() {
        let mut arch = Architecture::linear(4);
        arch.load_calibration(Cursor::new(calibration_line4())).unwrap();

        for carry in 0..3 {
            for u in 0..4 {
                for v in 0..4 {
                    assert!(
                        arch.fidelity_distance(u, v, carry + 1)
                            <= arch.fidelity_distance(u, v, carry)
                    );
                }
            }
        }
    }

    #[test]
    fn test_highest_fidelity_coupling_map() {
        let mut arch = Architecture::linear(4);
        arch.load_calibration(Cursor::new(calibration_line4())).unwrap();

        let best = arch.highest_fidelity_coupling_map(2).unwrap();
        // the (2,3) edge has the lowest error
        assert!(best.contains(&(2, 3)));
        assert!(!best.contains(&(0, 1)));
    }

    #[test]
    fn test_teleportation_distance_shortcut() {
        let arch = Architecture::ring(9);
        let virtual_edges: BTreeSet<Edge> = [(0, 5)].into_iter().collect();
        // 0 → (teleport) → 5 → 4: one swap after the virtual hop
        let direct = arch.distance(0, 4);
        let with_tele = arch.distance_with_teleportations(0, 4, &virtual_edges);
        assert_eq!(with_tele, COST_BIDIRECTIONAL_SWAP);
        assert!(with_tele < direct);
    }

    #[test]
    fn test_teleportation_distance_pure_hop() {
        let arch = Architecture::ring(9);
        let virtual_edges: BTreeSet<Edge> = [(0, 5)].into_iter().collect();
        let cost = arch.distance_with_teleportations(0, 5, &virtual_edges);
        assert_eq!(cost, COST_TELEPORTATION);
    }
}
