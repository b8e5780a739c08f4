//! Fidelity-aware routing scenarios.

mod common;

use std::io::Cursor;

use alsvid_arch::Architecture;
use alsvid_ir::{Circuit, QubitId, StandardGate};
use alsvid_map::{Config, HeuristicMapper, InitialLayout, Layering, MapError};
use common::{assert_adjacency, input_gate_list, logical_gate_trace};

/// Four-qubit line where the (2, 3) edge is markedly better than the
/// others; single-qubit errors are uniform.
fn calibrated_line4() -> Architecture {
    let mut arch = Architecture::linear(4);
    let mut csv = String::from("qubit,T1,T2,frequency,readoutError,singleErr,cnotList,date\n");
    csv.push_str("Q0,50,60,4.8,0.02,0.001,\"0_1: 0.1\",2024-11-02\n");
    csv.push_str("Q1,50,60,4.8,0.02,0.001,\"1_0: 0.1, 1_2: 0.1\",2024-11-02\n");
    csv.push_str("Q2,50,60,4.8,0.02,0.001,\"2_1: 0.1, 2_3: 0.05\",2024-11-02\n");
    csv.push_str("Q3,50,60,4.8,0.02,0.001,\"3_2: 0.05\",2024-11-02\n");
    arch.load_calibration(Cursor::new(csv)).unwrap();
    arch
}

fn fidelity_config() -> Config {
    Config {
        consider_fidelity: true,
        layering: Layering::Disjoint2qBlocks,
        initial_layout: InitialLayout::Identity,
        // repeated gates on the same pair must survive into one block
        pre_mapping_optimizations: false,
        post_mapping_optimizations: false,
        ..Config::default()
    }
}

#[test]
fn test_fidelity_prefers_high_fidelity_edge() {
    let arch = calibrated_line4();
    let mut circuit = Circuit::with_size("noise_aware", 4, 0);
    circuit.h(QubitId(0)).unwrap();
    for _ in 0..5 {
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
    }

    let results = HeuristicMapper::new(&circuit, &arch)
        .map(&fidelity_config())
        .unwrap();

    // paying two extra swaps to reach the good edge beats executing five
    // CNOTs on a bad one
    for inst in results.mapped.instructions() {
        if inst.as_gate() == Some(&StandardGate::CX) {
            let mut operands: Vec<u16> = inst.qubits.iter().map(|q| q.0 as u16).collect();
            operands.sort_unstable();
            assert_eq!(operands, vec![2, 3], "CNOT must land on the (2, 3) edge");
        }
    }
    assert_adjacency(&results.mapped, &arch);
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));
    // lookahead is auto-disabled for fidelity-aware mapping
    assert!(!results.config.lookahead);
}

#[test]
fn test_fidelity_moves_single_qubit_gates() {
    // physical 0 has a noisy single-qubit gate; everything else is clean
    let mut arch = Architecture::linear(4);
    let mut csv = String::from("qubit,T1,T2,frequency,readoutError,singleErr,cnotList,date\n");
    csv.push_str("Q0,50,60,4.8,0.02,0.2,\"0_1: 0.01\",2024-11-02\n");
    csv.push_str("Q1,50,60,4.8,0.02,0.0001,\"1_0: 0.01, 1_2: 0.01\",2024-11-02\n");
    csv.push_str("Q2,50,60,4.8,0.02,0.0001,\"2_1: 0.01, 2_3: 0.01\",2024-11-02\n");
    csv.push_str("Q3,50,60,4.8,0.02,0.0001,\"3_2: 0.01\",2024-11-02\n");
    arch.load_calibration(Cursor::new(csv)).unwrap();

    let mut circuit = Circuit::with_size("noisy_single", 1, 0);
    circuit.h(QubitId(0)).unwrap();

    let results = HeuristicMapper::new(&circuit, &arch)
        .map(&fidelity_config())
        .unwrap();

    let h = results
        .mapped
        .instructions()
        .iter()
        .find(|inst| inst.as_gate() == Some(&StandardGate::H))
        .expect("the H gate must survive");
    assert_ne!(h.qubits[0].0, 0, "H must leave the noisy physical qubit");
    assert_eq!(results.output.swaps, 0, "first-layer swaps fold into the layout");
}

#[test]
fn test_fidelity_without_calibration_downgrades() {
    let arch = Architecture::linear(4);
    let mut circuit = Circuit::with_size("no_calibration", 3, 0);
    circuit.cx(QubitId(0), QubitId(2)).unwrap();

    let results = HeuristicMapper::new(&circuit, &arch)
        .map(&fidelity_config())
        .unwrap();
    assert!(!results.config.consider_fidelity);
    assert_adjacency(&results.mapped, &arch);
}

#[test]
fn test_fidelity_with_dynamic_layout_rejected() {
    let arch = calibrated_line4();
    let circuit = Circuit::with_size("dynamic_fidelity", 2, 0);
    let config = Config {
        initial_layout: InitialLayout::Dynamic,
        ..fidelity_config()
    };
    let result = HeuristicMapper::new(&circuit, &arch).map(&config);
    assert!(matches!(result, Err(MapError::IncompatibleConfig(_))));
}

#[test]
fn test_fidelity_disables_teleportation() {
    let arch = calibrated_line4();
    let mut circuit = Circuit::with_size("tele_fidelity", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let config = Config {
        use_teleportation: true,
        teleportation_qubits: 2,
        ..fidelity_config()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();
    assert_eq!(results.config.teleportation_qubits, 0);
    assert_eq!(results.output.teleportations, 0);
}
