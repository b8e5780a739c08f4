//! Layer construction: partitioning the gate stream for the router.

use alsvid_ir::{Instruction, InstructionKind};
use rustc_hash::FxHashSet;

use crate::config::Layering;
use crate::error::{MapError, MapResult};

/// The router's view of one gate: operand roles plus an index back into
/// the instruction stream for lossless emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRef {
    /// A single-qubit gate.
    Single {
        /// Logical target qubit.
        target: u16,
        /// Index of the instruction in the preprocessed stream.
        op: usize,
    },
    /// A two-qubit gate.
    Two {
        /// Logical control qubit.
        control: u16,
        /// Logical target qubit.
        target: u16,
        /// Index of the instruction in the preprocessed stream.
        op: usize,
    },
}

impl GateRef {
    /// Check if this is a single-qubit gate.
    pub fn is_single(&self) -> bool {
        matches!(self, GateRef::Single { .. })
    }

    /// The logical qubits this gate acts on.
    pub fn qubits(&self) -> Vec<u16> {
        match *self {
            GateRef::Single { target, .. } => vec![target],
            GateRef::Two {
                control, target, ..
            } => vec![control, target],
        }
    }

    /// Index of the backing instruction.
    pub fn op(&self) -> usize {
        match *self {
            GateRef::Single { op, .. } | GateRef::Two { op, .. } => op,
        }
    }
}

/// One routing layer: an ordered group of gates.
pub type Layer = Vec<GateRef>;

/// Partition the instruction stream into routing layers.
///
/// `odd_gates` and `qubit_triangle` exist only for the exact mapper and
/// are rejected here. Barriers close the current layer and are dropped.
pub fn create_layers(instructions: &[Instruction], strategy: Layering) -> MapResult<Vec<Layer>> {
    let strategy = match strategy {
        Layering::None => Layering::IndividualGates,
        Layering::OddGates | Layering::QubitTriangle => {
            return Err(MapError::UnsupportedLayering(strategy))
        }
        other => other,
    };

    let mut layers: Vec<Layer> = vec![];
    let mut current: Layer = vec![];
    let mut used_qubits: FxHashSet<u16> = FxHashSet::default();
    let mut pairs: FxHashSet<(u16, u16)> = FxHashSet::default();
    let mut block_name: Option<&str> = None;

    macro_rules! close_layer {
        () => {
            if !current.is_empty() {
                layers.push(std::mem::take(&mut current));
            }
            used_qubits.clear();
            pairs.clear();
            block_name = None;
        };
    }

    for (op, inst) in instructions.iter().enumerate() {
        let gate = match &inst.kind {
            InstructionKind::Gate(g) => g,
            InstructionKind::Barrier => {
                close_layer!();
                continue;
            }
            other => {
                return Err(MapError::UnsupportedOperation(format!(
                    "{:?} cannot be layered for routing",
                    other
                )))
            }
        };

        let gate_ref = match inst.qubits.len() {
            1 => GateRef::Single {
                target: inst.qubits[0].0 as u16,
                op,
            },
            2 => GateRef::Two {
                control: inst.qubits[0].0 as u16,
                target: inst.qubits[1].0 as u16,
                op,
            },
            n => {
                return Err(MapError::UnsupportedOperation(format!(
                    "{}-qubit gate '{}' cannot be routed",
                    n,
                    gate.name()
                )))
            }
        };

        match strategy {
            Layering::IndividualGates => {
                layers.push(vec![gate_ref]);
            }
            Layering::DisjointQubits => {
                if gate_ref.qubits().iter().any(|q| used_qubits.contains(q)) {
                    close_layer!();
                }
                used_qubits.extend(gate_ref.qubits());
                current.push(gate_ref);
            }
            Layering::Disjoint2qBlocks | Layering::DisjointSameOpTypeBlocks => {
                let same_type_only = strategy == Layering::DisjointSameOpTypeBlocks;
                if same_type_only && block_name.is_some_and(|name| name != gate.name()) {
                    close_layer!();
                }
                if let GateRef::Two {
                    control, target, ..
                } = gate_ref
                {
                    let key = canonical_pair(control, target);
                    // a repeated interaction extends its block
                    if !pairs.contains(&key)
                        && (used_qubits.contains(&control) || used_qubits.contains(&target))
                    {
                        close_layer!();
                    }
                    pairs.insert(canonical_pair(control, target));
                    used_qubits.insert(control);
                    used_qubits.insert(target);
                }
                if same_type_only {
                    block_name = Some(gate.name());
                }
                current.push(gate_ref);
            }
            Layering::None | Layering::OddGates | Layering::QubitTriangle => unreachable!(),
        }
    }
    if !current.is_empty() {
        layers.push(current);
    }

    Ok(layers)
}

/// Canonical (smaller, larger) form of a logical pair.
#[inline]
pub fn canonical_pair(a: u16, b: u16) -> (u16, u16) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
