//! Error types for the device model.

use thiserror::Error;

/// Errors that can occur while loading or querying a device model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchError {
    /// Failure reading a device or calibration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed coupling-map description.
    #[error("Invalid coupling map: {0}")]
    InvalidCouplingMap(String),

    /// Malformed calibration data.
    #[error("Invalid calibration data: {0}")]
    InvalidCalibration(String),

    /// A qubit index outside the device.
    #[error("Qubit {qubit} out of range for device with {num_qubits} qubits")]
    QubitOutOfRange {
        /// The offending qubit index.
        qubit: u16,
        /// Number of qubits on the device.
        num_qubits: u16,
    },

    /// A requested qubit subset exceeds the device size.
    #[error("Requested subset of {requested} qubits, device has only {available}")]
    SubsetTooLarge {
        /// Requested subset size.
        requested: u16,
        /// Available qubits.
        available: u16,
    },

    /// An empty subset was requested.
    #[error("Subset size must be greater than zero")]
    EmptySubset,

    /// Fidelity data was queried but no calibration is loaded.
    #[error("No calibration data loaded for this device")]
    NoCalibration,
}

/// Result type for device-model operations.
pub type ArchResult<T> = Result<T, ArchError>;
