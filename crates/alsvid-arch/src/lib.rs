//! Alsvid Device Model
//!
//! This crate models the target quantum device for the Alsvid mapping
//! engine: the coupling graph, calibration-derived fidelity data, and the
//! precomputed distance tables the heuristic router queries in its inner
//! loop.
//!
//! # Overview
//!
//! - [`Architecture`]: the device — connectivity, bidirectionality,
//!   distance tables, fidelity cost tables, subset analysis, and the
//!   minimum-swap computation for permutations
//! - [`CalibrationData`]: per-qubit calibration records parsed from CSV
//! - [`dijkstra`]: distance-table construction with CNOT-reversal
//!   accounting and edge-skip variants
//! - [`cost`]: gate-count cost constants and the `-log2(1-err)` fidelity
//!   cost conversion
//!
//! # Example
//!
//! ```rust
//! use alsvid_arch::Architecture;
//!
//! let arch = Architecture::ring(5);
//! assert!(arch.bidirectional());
//! assert!(arch.is_edge_connected(4, 0));
//! // adjacent qubits need no SWAP: the gate itself realizes the adjacency
//! assert_eq!(arch.distance(0, 1), 0.0);
//! ```

pub mod architecture;
pub mod calibration;
pub mod cost;
pub mod dijkstra;
pub mod error;

pub use architecture::{Architecture, QubitSubset};
pub use calibration::CalibrationData;
pub use dijkstra::{Edge, Matrix};
pub use error::{ArchError, ArchResult};
