//! Error types for the mapping engine.

use thiserror::Error;

use crate::config::{Layering, Method};

/// Errors that can occur during circuit mapping.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MapError {
    /// Device-model error.
    #[error("architecture error: {0}")]
    Arch(#[from] alsvid_arch::ArchError),

    /// IR error while building the mapped circuit.
    #[error("circuit error: {0}")]
    Ir(#[from] alsvid_ir::IrError),

    /// Failure writing the search data log.
    #[error("data log error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested mapping method is not provided by this engine.
    #[error("mapping method '{0}' is not supported by the heuristic engine")]
    UnsupportedMethod(Method),

    /// A layering strategy the router cannot consume.
    #[error("layering strategy '{0}' is not suitable for the heuristic router")]
    UnsupportedLayering(Layering),

    /// An unrecoverable configuration combination.
    #[error("incompatible configuration: {0}")]
    IncompatibleConfig(String),

    /// The circuit needs more qubits than the device provides.
    #[error("circuit requires {required} qubits, device has {available}")]
    CircuitTooLarge {
        /// Qubits required (circuit plus teleportation ancillas).
        required: usize,
        /// Qubits available on the device.
        available: u16,
    },

    /// An operation the router cannot map.
    #[error("unsupported operation during mapping: {0}")]
    UnsupportedOperation(String),

    /// The search exhausted its queue without reaching a routed state.
    #[error("no viable mapping found for layer {layer}")]
    NoViableMapping {
        /// Index of the layer being routed.
        layer: usize,
    },

    /// A SWAP was emitted on a pair that is not connected on the device.
    #[error("invalid SWAP: {first} <-> {second}")]
    InvalidSwap {
        /// First physical qubit.
        first: u16,
        /// Second physical qubit.
        second: u16,
    },

    /// A two-qubit gate was emitted on a pair that is not connected.
    #[error("invalid two-qubit gate on unconnected pair: {first}-{second}")]
    InvalidTwoQubitGate {
        /// Control location.
        first: u16,
        /// Target location.
        second: u16,
    },

    /// Teleportation endpoint resolution failed.
    #[error("teleportation between seemingly wrong qubits: {first} <--> {second}")]
    TeleportationFailed {
        /// First physical qubit.
        first: u16,
        /// Second physical qubit.
        second: u16,
    },
}

/// Result type for mapping operations.
pub type MapResult<T> = Result<T, MapError>;
