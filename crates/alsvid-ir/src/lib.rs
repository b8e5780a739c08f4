//! Alsvid Circuit Intermediate Representation
//!
//! This crate provides the core data structures for representing quantum
//! circuits in Alsvid. Circuits are stored as a linear, order-preserving
//! instruction stream — the unit the mapping engine consumes — together
//! with the placement metadata (`initial_layout`, `output_permutation`)
//! that a mapped circuit carries.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`] for addressing
//!   quantum and classical wires
//! - **Gates**: [`StandardGate`] for built-in gates (H, X, CX, ...)
//! - **Instructions**: [`Instruction`] combining an operation with its operands
//! - **Circuit**: [`Circuit`] high-level builder API over the instruction stream
//! - **Layout**: [`Layout`] inverse pair of logical↔physical partial maps
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use alsvid_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3); // H, CX, measure
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod layout;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use layout::Layout;
pub use qubit::{ClbitId, QubitId};
