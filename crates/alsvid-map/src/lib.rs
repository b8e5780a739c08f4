//! Alsvid Heuristic Mapping Engine
//!
//! Maps a logical quantum circuit onto a target device with limited
//! connectivity: every two-qubit gate of the output acts on physically
//! coupled qubits, with SWAPs (and optionally teleportations) inserted by
//! a per-layer A* search over placement permutations.
//!
//! # Pipeline
//!
//! ```text
//! Circuit ──▶ layering ──▶ initial layout ──▶ per-layer A* ──▶ emission
//!                │               │                  │              │
//!                │               │       SearchNode queue,   swaps + gates,
//!           Vec<Layer>    locations/qubits   heuristic + lookahead   CNOT reversal
//! ```
//!
//! # Example
//!
//! ```rust
//! use alsvid_arch::Architecture;
//! use alsvid_ir::{Circuit, QubitId};
//! use alsvid_map::{Config, HeuristicMapper};
//!
//! let arch = Architecture::ring(5);
//! let mut circuit = Circuit::with_size("example", 4, 0);
//! circuit.cx(QubitId(0), QubitId(2)).unwrap();
//!
//! let mut mapper = HeuristicMapper::new(&circuit, &arch);
//! let results = mapper.map(&Config::default()).unwrap();
//!
//! // every emitted two-qubit gate acts on a coupled pair
//! for inst in results.mapped.instructions() {
//!     if inst.is_gate() && inst.qubits.len() == 2 {
//!         let (u, v) = (inst.qubits[0].0 as u16, inst.qubits[1].0 as u16);
//!         assert!(arch.is_edge_connected(u, v));
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod layering;
pub mod mapper;
pub mod node;
pub mod optimize;
pub mod results;
mod search;

pub use config::{Config, InitialLayout, Layering, Method};
pub use error::{MapError, MapResult};
pub use layering::{create_layers, GateRef, Layer};
pub use mapper::HeuristicMapper;
pub use node::{SearchNode, SwapKind, SwapOp};
pub use results::{CircuitStats, MappingResults};
