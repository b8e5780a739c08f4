//! Shared helpers for the mapping integration tests.

use alsvid_arch::Architecture;
use alsvid_ir::{Circuit, InstructionKind, StandardGate};

/// The logical gate sequence a mapped circuit realizes.
///
/// Walks the emitted stream, tracking which logical qubit occupies each
/// physical qubit (starting from `initial_layout`, updated by routing
/// SWAPs and teleportations), and records every remaining gate with its
/// logical operands. Assumes the input circuit itself contains no SWAPs.
pub fn logical_gate_trace(mapped: &Circuit) -> Vec<(String, Vec<u32>)> {
    let p = mapped.num_qubits() as usize;
    let mut occupant: Vec<Option<u32>> = (0..p)
        .map(|phys| mapped.initial_layout.logical_of(phys as u16).map(|q| q.0))
        .collect();

    let mut trace = vec![];
    for inst in mapped.instructions() {
        match &inst.kind {
            InstructionKind::Gate(StandardGate::Swap) | InstructionKind::Teleportation => {
                let (a, b) = (inst.qubits[0].0 as usize, inst.qubits[1].0 as usize);
                occupant.swap(a, b);
            }
            InstructionKind::Gate(gate) => {
                let operands = inst
                    .qubits
                    .iter()
                    .map(|q| occupant[q.0 as usize].expect("gate on an empty wire"))
                    .collect();
                trace.push((gate.name().to_string(), operands));
            }
            InstructionKind::Measure | InstructionKind::Barrier => {}
        }
    }
    trace
}

/// The gate sequence of an input circuit, as (name, logical operands).
pub fn input_gate_list(circuit: &Circuit) -> Vec<(String, Vec<u32>)> {
    circuit
        .instructions()
        .iter()
        .filter(|inst| inst.is_gate())
        .map(|inst| {
            (
                inst.name().to_string(),
                inst.qubits.iter().map(|q| q.0).collect(),
            )
        })
        .collect()
}

/// Assert that every emitted two-qubit operation acts on a coupled pair.
pub fn assert_adjacency(mapped: &Circuit, arch: &Architecture) {
    for inst in mapped.instructions() {
        if inst.is_gate() && inst.qubits.len() == 2 {
            let (u, v) = (inst.qubits[0].0 as u16, inst.qubits[1].0 as u16);
            assert!(
                arch.is_edge_connected(u, v),
                "{} emitted on unconnected pair ({u}, {v})",
                inst.name()
            );
        }
    }
}

/// Assert that the output permutation matches the placement reached by
/// replaying the emitted routing operations.
pub fn assert_output_permutation(mapped: &Circuit) {
    let p = mapped.num_qubits() as usize;
    let mut occupant: Vec<Option<u32>> = (0..p)
        .map(|phys| mapped.initial_layout.logical_of(phys as u16).map(|q| q.0))
        .collect();
    for inst in mapped.instructions() {
        if matches!(
            &inst.kind,
            InstructionKind::Gate(StandardGate::Swap) | InstructionKind::Teleportation
        ) {
            let (a, b) = (inst.qubits[0].0 as usize, inst.qubits[1].0 as usize);
            occupant.swap(a, b);
        }
    }
    for phys in 0..p {
        if let Some(logical) = mapped.output_permutation.logical_of(phys as u16) {
            assert_eq!(
                occupant[phys],
                Some(logical.0),
                "output permutation disagrees with replay at physical {phys}"
            );
        }
    }
}
