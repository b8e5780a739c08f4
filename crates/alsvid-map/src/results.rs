//! Mapping results and circuit statistics.

use alsvid_ir::{Circuit, InstructionKind, StandardGate};
use serde::Serialize;

use crate::config::Config;

/// Gate statistics for a circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CircuitStats {
    /// Number of qubits.
    pub qubits: u32,
    /// Total number of operations.
    pub gates: usize,
    /// Number of single-qubit gates.
    pub single_qubit_gates: usize,
    /// Number of CNOT gates.
    pub cnots: usize,
    /// Number of SWAP gates.
    pub swaps: usize,
    /// Number of teleportations.
    pub teleportations: usize,
    /// Number of CNOTs executed against their native direction.
    pub direction_reverse: usize,
    /// Number of routing layers.
    pub layers: usize,
}

impl CircuitStats {
    /// Count the operations of a circuit.
    pub fn of(circuit: &Circuit) -> Self {
        let mut stats = Self {
            qubits: circuit.num_qubits(),
            ..Self::default()
        };
        for inst in circuit.instructions() {
            match &inst.kind {
                InstructionKind::Gate(gate) => {
                    stats.gates += 1;
                    match gate {
                        StandardGate::CX => stats.cnots += 1,
                        StandardGate::Swap => stats.swaps += 1,
                        g if g.num_qubits() == 1 => stats.single_qubit_gates += 1,
                        _ => {}
                    }
                }
                InstructionKind::Teleportation => {
                    stats.gates += 1;
                    stats.teleportations += 1;
                }
                InstructionKind::Measure | InstructionKind::Barrier => {}
            }
        }
        stats
    }
}

/// The outcome of a mapping run.
#[derive(Debug, Clone)]
pub struct MappingResults {
    /// Statistics of the input circuit.
    pub input: CircuitStats,
    /// Statistics of the mapped circuit.
    pub output: CircuitStats,
    /// Wall-clock mapping time in seconds.
    pub time: f64,
    /// The (validated, possibly downgraded) configuration that was used.
    pub config: Config,
    /// The mapped circuit.
    pub mapped: Circuit,
}
