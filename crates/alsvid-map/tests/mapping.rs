//! End-to-end routing scenarios for the heuristic mapper.

mod common;

use alsvid_arch::Architecture;
use alsvid_ir::{Circuit, QubitId, StandardGate};
use alsvid_map::{Config, HeuristicMapper, InitialLayout, Layering, MapError, Method};
use common::{assert_adjacency, assert_output_permutation, input_gate_list, logical_gate_trace};

fn base_config() -> Config {
    Config {
        layering: Layering::IndividualGates,
        initial_layout: InitialLayout::Identity,
        ..Config::default()
    }
}

#[test]
fn test_ring5_requires_swap() {
    let arch = Architecture::ring(5);
    let mut circuit = Circuit::with_size("ring5", 4, 0);
    circuit.cx(QubitId(0), QubitId(2)).unwrap();
    circuit.cx(QubitId(1), QubitId(3)).unwrap();

    let config = Config {
        swap_on_first_layer: true,
        ..base_config()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    assert!(results.output.swaps >= 1, "routing must insert a SWAP");
    assert_adjacency(&results.mapped, &arch);
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));
    assert_output_permutation(&results.mapped);
}

#[test]
fn test_reverse_cnot_surcharge() {
    // directed chain 0 -> 1 -> 2
    let arch = Architecture::from_edge_list(3, [(0, 1), (1, 2)]).unwrap();
    let mut circuit = Circuit::with_size("reverse", 3, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(2), QubitId(0)).unwrap();

    let results = HeuristicMapper::new(&circuit, &arch)
        .map(&base_config())
        .unwrap();

    assert_eq!(results.output.swaps, 1);
    assert_eq!(results.output.direction_reverse, 1);
    // every CNOT must sit on a native (forward) edge
    for inst in results.mapped.instructions() {
        if inst.as_gate() == Some(&StandardGate::CX) {
            let (u, v) = (inst.qubits[0].0 as u16, inst.qubits[1].0 as u16);
            assert!(arch.coupling_map().contains(&(u, v)));
        }
    }
}

#[test]
fn test_identity_mapping_on_fully_connected() {
    let arch = Architecture::fully_connected(4);
    let mut circuit = Circuit::with_size("trivial", 4, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(2), QubitId(3)).unwrap();

    let config = Config {
        layering: Layering::DisjointQubits,
        ..base_config()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    assert_eq!(results.output.swaps, 0);
    for l in 0..4u32 {
        assert_eq!(
            results.mapped.initial_layout.physical_of(QubitId(l)),
            Some(l as u16),
            "identity layout must be preserved"
        );
    }
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));
}

#[test]
fn test_already_mapped_layers_need_no_swaps() {
    let arch = Architecture::linear(4);
    let mut circuit = Circuit::with_size("settled", 4, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(2), QubitId(3)).unwrap();
    circuit.cx(QubitId(1), QubitId(2)).unwrap();

    let config = Config {
        layering: Layering::DisjointQubits,
        swap_on_first_layer: true,
        ..base_config()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    assert_eq!(results.output.swaps, 0);
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));
}

#[test]
fn test_linear_chain_swap_count() {
    // distance 0-4 on a line is four hops: three SWAPs, the gate itself
    // covers the last one
    let arch = Architecture::linear(5);
    let mut circuit = Circuit::with_size("far", 5, 0);
    circuit.cx(QubitId(0), QubitId(4)).unwrap();

    let config = Config {
        swap_on_first_layer: true,
        ..base_config()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    assert_eq!(results.output.swaps, 3);
    assert_adjacency(&results.mapped, &arch);
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));

    // the committed count realizes the placement permutation, so it cannot
    // beat the device's minimum swap count for it
    let sigma: Vec<u16> = (0..5)
        .map(|p| {
            results
                .mapped
                .output_permutation
                .logical_of(p)
                .map_or(p, |q| q.0 as u16)
        })
        .collect();
    assert!(results.output.swaps >= arch.minimum_number_of_swaps(&sigma, None));
}

#[test]
fn test_dynamic_layout_places_on_demand() {
    let arch = Architecture::linear(5);
    let mut circuit = Circuit::with_size("dynamic", 3, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(1), QubitId(2)).unwrap();
    circuit.cx(QubitId(0), QubitId(2)).unwrap();

    let config = Config {
        initial_layout: InitialLayout::Dynamic,
        layering: Layering::IndividualGates,
        ..Config::default()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    assert_adjacency(&results.mapped, &arch);
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));
    assert_output_permutation(&results.mapped);
}

#[test]
fn test_static_layout_uses_first_free_edges() {
    let arch = Architecture::linear(6);
    let mut circuit = Circuit::with_size("static", 4, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(2), QubitId(3)).unwrap();

    let config = Config {
        initial_layout: InitialLayout::Static,
        layering: Layering::DisjointQubits,
        ..Config::default()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    assert_eq!(results.output.swaps, 0);
    assert_adjacency(&results.mapped, &arch);
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));
}

#[test]
fn test_iterative_bidirectional_routing() {
    let arch = Architecture::ring(5);
    let mut circuit = Circuit::with_size("iterative", 4, 0);
    circuit.cx(QubitId(0), QubitId(2)).unwrap();
    circuit.cx(QubitId(1), QubitId(3)).unwrap();
    circuit.cx(QubitId(0), QubitId(3)).unwrap();

    let config = Config {
        initial_layout: InitialLayout::Dynamic,
        layering: Layering::IndividualGates,
        iterative_bidirectional_routing: 2,
        ..Config::default()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    assert_adjacency(&results.mapped, &arch);
    assert_eq!(logical_gate_trace(&results.mapped), input_gate_list(&circuit));
    assert_output_permutation(&results.mapped);
}

#[test]
fn test_measurements_reappended_at_final_location() {
    let arch = Architecture::ring(5);
    let mut circuit = Circuit::with_size("measured", 4, 0);
    circuit.cx(QubitId(0), QubitId(2)).unwrap();
    circuit.cx(QubitId(1), QubitId(3)).unwrap();
    circuit.measure_all().unwrap();

    let config = Config {
        swap_on_first_layer: true,
        ..base_config()
    };
    let results = HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    let measures: Vec<_> = results
        .mapped
        .instructions()
        .iter()
        .filter(|inst| inst.is_measure())
        .collect();
    assert_eq!(measures.len(), 4);
    for measure in measures {
        let phys = measure.qubits[0].0 as u16;
        let logical = results
            .mapped
            .output_permutation
            .logical_of(phys)
            .expect("measured qubit must carry circuit data");
        // measured into the classical bit of its logical qubit
        assert_eq!(measure.clbits[0].0, logical.0);
        assert!(!results.mapped.garbage[phys as usize]);
    }
}

#[test]
fn test_mid_circuit_measurement_rejected() {
    let arch = Architecture::linear(3);
    let mut circuit = Circuit::with_size("mid", 2, 1);
    circuit.measure(QubitId(0), alsvid_ir::ClbitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();

    let result = HeuristicMapper::new(&circuit, &arch).map(&base_config());
    assert!(matches!(result, Err(MapError::UnsupportedOperation(_))));
}

#[test]
fn test_exact_method_rejected() {
    let arch = Architecture::linear(3);
    let circuit = Circuit::with_size("exact", 2, 0);
    let config = Config {
        method: Method::Exact,
        ..Config::default()
    };
    let result = HeuristicMapper::new(&circuit, &arch).map(&config);
    assert!(matches!(result, Err(MapError::UnsupportedMethod(_))));
}

#[test]
fn test_exact_layering_strategies_rejected() {
    let arch = Architecture::linear(3);
    let circuit = Circuit::with_size("layering", 2, 0);
    for layering in [Layering::OddGates, Layering::QubitTriangle] {
        let config = Config {
            layering,
            ..Config::default()
        };
        let result = HeuristicMapper::new(&circuit, &arch).map(&config);
        assert!(matches!(result, Err(MapError::UnsupportedLayering(_))));
    }
}

#[test]
fn test_circuit_too_large() {
    let arch = Architecture::linear(3);
    let circuit = Circuit::with_size("big", 5, 0);
    let result = HeuristicMapper::new(&circuit, &arch).map(&Config::default());
    assert!(matches!(result, Err(MapError::CircuitTooLarge { .. })));
}

#[test]
fn test_unreachable_pair_is_fatal() {
    // two disconnected components
    let arch = Architecture::from_edge_list(4, [(0, 1), (1, 0), (2, 3), (3, 2)]).unwrap();
    let mut circuit = Circuit::with_size("split", 4, 0);
    circuit.cx(QubitId(0), QubitId(3)).unwrap();

    let result = HeuristicMapper::new(&circuit, &arch).map(&base_config());
    assert!(result.is_err());
}

#[test]
fn test_data_logging_writes_layer_records() {
    let arch = Architecture::ring(5);
    let mut circuit = Circuit::with_size("logged", 4, 0);
    circuit.cx(QubitId(0), QubitId(2)).unwrap();

    let path = std::env::temp_dir().join(format!("alsvid_search_{}.jsonl", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let config = Config {
        data_logging_path: path.to_string_lossy().into_owned(),
        ..base_config()
    };
    HeuristicMapper::new(&circuit, &arch).map(&config).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let first = contents.lines().next().unwrap();
    let record: serde_json::Value = serde_json::from_str(first).unwrap();
    assert!(record.get("layer").is_some());
    assert!(record.get("expanded_nodes").is_some());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_peephole_removes_cancelling_pair() {
    let arch = Architecture::linear(3);
    let mut circuit = Circuit::with_size("peephole", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.h(QubitId(0)).unwrap();

    let results = HeuristicMapper::new(&circuit, &arch)
        .map(&base_config())
        .unwrap();

    // the CX pair cancels during pre-mapping optimization
    assert_eq!(results.output.cnots, 0);
    assert_eq!(results.output.single_qubit_gates, 1);
}
