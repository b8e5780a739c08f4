//! Cost constants and fidelity-cost conversion.
//!
//! Gate-count costs express routing operations in elementary-gate units:
//! a SWAP on a bidirectional edge decomposes into three CNOTs, on a
//! unidirectional edge into three CNOTs plus four Hadamards, and a CNOT
//! against the native direction costs four extra Hadamards.

/// Cost of a single-qubit gate.
pub const COST_SINGLE_QUBIT_GATE: f64 = 1.0;

/// Cost of a CNOT gate.
pub const COST_CNOT_GATE: f64 = 10.0;

/// Cost of a measurement.
pub const COST_MEASUREMENT: f64 = 10.0;

/// Cost of a SWAP on a device where every edge is bidirectional.
pub const COST_BIDIRECTIONAL_SWAP: f64 = 3.0 * COST_CNOT_GATE;

/// Cost of a SWAP on a device with unidirectional edges.
pub const COST_UNIDIRECTIONAL_SWAP: f64 = 3.0 * COST_CNOT_GATE + 4.0 * COST_SINGLE_QUBIT_GATE;

/// Cost of a teleportation (two CNOTs, a measurement, four single-qubit gates).
pub const COST_TELEPORTATION: f64 =
    2.0 * COST_CNOT_GATE + COST_MEASUREMENT + 4.0 * COST_SINGLE_QUBIT_GATE;

/// Cost of reversing a CNOT with a Hadamard sandwich.
pub const COST_DIRECTION_REVERSE: f64 = 4.0 * COST_SINGLE_QUBIT_GATE;

/// Convert an error rate into an additive fidelity cost.
///
/// `-log2(1 - err)` turns products of fidelities into sums, so lower cost
/// means higher fidelity and path costs can be minimized additively.
#[inline]
pub fn fidelity_cost(error_rate: f64) -> f64 {
    -(1.0 - error_rate).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(COST_BIDIRECTIONAL_SWAP, 30.0);
        assert_eq!(COST_UNIDIRECTIONAL_SWAP, 34.0);
        assert_eq!(COST_TELEPORTATION, 34.0);
        assert_eq!(COST_DIRECTION_REVERSE, 4.0);
    }

    #[test]
    fn test_fidelity_cost() {
        assert_eq!(fidelity_cost(0.0), 0.0);
        assert!((fidelity_cost(0.5) - 1.0).abs() < 1e-12);
        // costs add where fidelities multiply
        let combined = fidelity_cost(0.1) + fidelity_cost(0.2);
        let product = -(0.9f64 * 0.8).log2();
        assert!((combined - product).abs() < 1e-12);
    }
}
