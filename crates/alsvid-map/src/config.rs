//! Mapping configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The mapping method to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Heuristic A*-based routing (this engine).
    #[default]
    Heuristic,
    /// Exact SAT-based mapping (separate subsystem).
    Exact,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Heuristic => write!(f, "heuristic"),
            Method::Exact => write!(f, "exact"),
        }
    }
}

/// How the gate stream is partitioned into routing layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layering {
    /// No explicit choice; the router treats this as individual gates.
    #[default]
    None,
    /// One gate per layer.
    IndividualGates,
    /// A gate joins the current layer iff its qubits are untouched there.
    DisjointQubits,
    /// Exact-mapper strategy; rejected by the heuristic router.
    OddGates,
    /// Exact-mapper strategy; rejected by the heuristic router.
    QubitTriangle,
    /// Like disjoint qubits, but only two-qubit gates delimit layers and
    /// repeated gates on the same pair extend the block.
    #[serde(rename = "disjoint_2q_blocks")]
    Disjoint2qBlocks,
    /// Like disjoint 2q blocks, restricted to one operation type per block.
    DisjointSameOpTypeBlocks,
}

impl fmt::Display for Layering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Layering::None => "none",
            Layering::IndividualGates => "individual_gates",
            Layering::DisjointQubits => "disjoint_qubits",
            Layering::OddGates => "odd_gates",
            Layering::QubitTriangle => "qubit_triangle",
            Layering::Disjoint2qBlocks => "disjoint_2q_blocks",
            Layering::DisjointSameOpTypeBlocks => "disjoint_same_op_type_blocks",
        };
        write!(f, "{s}")
    }
}

/// Initial placement strategy for the heuristic router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialLayout {
    /// No explicit choice; placement happens on demand during search.
    #[default]
    None,
    /// Logical qubit i starts on physical qubit i.
    Identity,
    /// Greedily match first-layer pairs to device edges.
    Static,
    /// Defer placement until the search demands it.
    Dynamic,
}

impl fmt::Display for InitialLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InitialLayout::None => "none",
            InitialLayout::Identity => "identity",
            InitialLayout::Static => "static",
            InitialLayout::Dynamic => "dynamic",
        };
        write!(f, "{s}")
    }
}

/// Configuration of a mapping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which mapping method to use.
    pub method: Method,
    /// Use the admissible (max-based) heuristic instead of the summed one.
    pub admissible_heuristic: bool,
    /// Optimize for fidelity instead of gate count. Needs calibration data.
    pub consider_fidelity: bool,

    /// Run the peephole cleanup on the input circuit before mapping.
    pub pre_mapping_optimizations: bool,
    /// Run the peephole cleanup on the mapped circuit.
    pub post_mapping_optimizations: bool,

    /// Re-append stripped measurements to the mapped circuit.
    pub add_measurements_to_mapped_circuit: bool,
    /// Emit the swaps of the first layer instead of folding them into the
    /// initial layout.
    pub swap_on_first_layer: bool,

    /// Verbose progress reporting.
    pub verbose: bool,
    /// Debug-level reporting.
    pub debug: bool,
    /// When non-empty, append per-layer search records (JSON lines) here.
    pub data_logging_path: String,

    /// Layer construction strategy.
    pub layering: Layering,
    /// Initial placement strategy.
    pub initial_layout: InitialLayout,

    /// Number of forward/backward settling passes to refine a dynamic
    /// initial layout before the real routing pass.
    pub iterative_bidirectional_routing: usize,

    /// Penalize placements that hurt upcoming layers.
    pub lookahead: bool,
    /// How many future layers the lookahead inspects.
    pub nr_lookaheads: usize,
    /// Decay factor applied to the first lookahead layer.
    pub first_lookahead_factor: f64,
    /// Decay factor applied to each further lookahead layer.
    pub lookahead_factor: f64,

    /// Allow teleportation via reserved ancilla pairs.
    pub use_teleportation: bool,
    /// Number of reserved teleportation ancillas (even).
    pub teleportation_qubits: usize,
    /// RNG seed for ancilla placement; 0 draws from entropy.
    pub teleportation_seed: u64,
    /// Reserve the ancillas but never teleport (placement experiments).
    pub teleportation_fake: bool,

    /// Timeout in milliseconds; only honored by the exact mapper.
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: Method::Heuristic,
            admissible_heuristic: true,
            consider_fidelity: false,
            pre_mapping_optimizations: true,
            post_mapping_optimizations: true,
            add_measurements_to_mapped_circuit: true,
            swap_on_first_layer: false,
            verbose: false,
            debug: false,
            data_logging_path: String::new(),
            layering: Layering::None,
            initial_layout: InitialLayout::None,
            iterative_bidirectional_routing: 0,
            lookahead: true,
            nr_lookaheads: 15,
            first_lookahead_factor: 0.75,
            lookahead_factor: 0.5,
            use_teleportation: false,
            teleportation_qubits: 0,
            teleportation_seed: 0,
            teleportation_fake: false,
            timeout: 3_600_000,
        }
    }
}

impl Config {
    /// Render the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// True iff the search data log is enabled.
    pub fn data_logging_enabled(&self) -> bool {
        !self.data_logging_path.is_empty()
    }
}
