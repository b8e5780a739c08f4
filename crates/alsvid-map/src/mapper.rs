//! The heuristic mapper: state, driver, and circuit emission.

use std::time::Instant;

use alsvid_arch::Architecture;
use alsvid_ir::{Circuit, ClbitId, Instruction, InstructionKind, Layout, QubitId, StandardGate};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, InitialLayout, Layering, Method};
use crate::error::{MapError, MapResult};
use crate::layering::{create_layers, GateRef, Layer};
use crate::node::{SearchNode, SwapKind};
use crate::optimize::cancel_self_inverse_pairs;
use crate::results::{CircuitStats, MappingResults};

/// Heuristic A*-based circuit mapper.
///
/// Routes a logical circuit onto a device by committing, per layer, the
/// swap sequence found by an A* search over placement permutations.
pub struct HeuristicMapper<'a> {
    pub(crate) arch: &'a Architecture,
    pub(crate) circuit: &'a Circuit,
    pub(crate) config: Config,
    /// Preprocessed instruction stream (measurements stripped).
    pub(crate) ops: Vec<Instruction>,
    /// Stripped final measurements, re-appended after mapping.
    pub(crate) measurements: Vec<(QubitId, ClbitId)>,
    pub(crate) layers: Vec<Layer>,
    /// Logical occupant of each physical qubit.
    pub(crate) qubits: Vec<Option<u16>>,
    /// Physical location of each logical qubit (ancillas included).
    pub(crate) locations: Vec<Option<u16>>,
    pub(crate) mapped: Circuit,
    pub(crate) next_node_id: u64,
    pub(crate) direction_reverse: usize,
    pub(crate) data_log: Option<std::fs::File>,
    /// True while the iterative-bidirectional settling passes run.
    pub(crate) settling: bool,
}

impl<'a> HeuristicMapper<'a> {
    /// Create a mapper for one circuit on one device.
    pub fn new(circuit: &'a Circuit, arch: &'a Architecture) -> Self {
        Self {
            arch,
            circuit,
            config: Config::default(),
            ops: vec![],
            measurements: vec![],
            layers: vec![],
            qubits: vec![],
            locations: vec![],
            mapped: Circuit::with_size("mapped", 0, 0),
            next_node_id: 0,
            direction_reverse: 0,
            data_log: None,
            settling: false,
        }
    }

    /// Map the circuit with the given configuration.
    #[instrument(skip_all, fields(circuit = self.circuit.name(), device = self.arch.name()))]
    pub fn map(&mut self, config: &Config) -> MapResult<MappingResults> {
        let start = Instant::now();
        self.config = self.validate_config(config)?;
        self.preprocess()?;
        self.layers = create_layers(&self.ops, self.config.layering)?;
        debug!(layers = self.layers.len(), "created layers");

        let p = self.arch.num_qubits() as usize;
        self.qubits = vec![None; p];
        self.locations = vec![None; p];
        let clbits = if self.config.add_measurements_to_mapped_circuit {
            self.circuit.num_clbits().max(self.circuit.num_qubits())
        } else {
            self.circuit.num_clbits()
        };
        self.mapped = Circuit::with_size(
            format!("{}_mapped", self.circuit.name()),
            p as u32,
            clbits,
        );
        self.next_node_id = 0;
        self.direction_reverse = 0;
        self.data_log = if self.config.data_logging_enabled() {
            Some(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.config.data_logging_path)?,
            )
        } else {
            None
        };

        self.create_initial_mapping()?;
        if self.config.iterative_bidirectional_routing > 0 {
            self.settle_initial_layout()?;
        }

        let mut gates_to_adjust = vec![];
        for layer in 0..self.layers.len() {
            let result = self.a_star_map(layer)?;
            self.qubits.clone_from(&result.qubits);
            self.locations.clone_from(&result.locations);
            if self.config.verbose {
                info!(layer, locations = ?self.locations, "committed placement");
            }
            self.emit_layer(layer, &result, &mut gates_to_adjust)?;
        }

        self.infer_output_permutation();
        self.adjust_floating_gates(&gates_to_adjust)?;
        self.append_measurements()?;
        if self.config.post_mapping_optimizations {
            cancel_self_inverse_pairs(self.mapped.instructions_mut());
        }

        let mut input = CircuitStats::of(self.circuit);
        input.layers = self.layers.len();
        let mut output = CircuitStats::of(&self.mapped);
        output.layers = self.layers.len();
        output.direction_reverse = self.direction_reverse;

        let results = MappingResults {
            input,
            output,
            time: start.elapsed().as_secs_f64(),
            config: self.config.clone(),
            mapped: self.mapped.clone(),
        };
        info!(
            swaps = results.output.swaps,
            teleportations = results.output.teleportations,
            direction_reverse = results.output.direction_reverse,
            time_s = results.time,
            "mapping finished"
        );
        Ok(results)
    }

    /// Check the configuration against this device, downgrading what can
    /// be downgraded and rejecting what cannot.
    fn validate_config(&self, config: &Config) -> MapResult<Config> {
        let mut config = config.clone();

        if config.method != Method::Heuristic {
            return Err(MapError::UnsupportedMethod(config.method));
        }
        if matches!(config.layering, Layering::OddGates | Layering::QubitTriangle) {
            return Err(MapError::UnsupportedLayering(config.layering));
        }

        if config.consider_fidelity && !self.arch.supports_fidelity() {
            warn!("no calibration data available; mapping without considering fidelity");
            config.consider_fidelity = false;
        }
        if config.consider_fidelity && config.lookahead {
            warn!("lookahead is not supported for fidelity-aware mapping; disabling lookahead");
            config.lookahead = false;
        }
        if config.consider_fidelity && config.initial_layout == InitialLayout::Dynamic {
            return Err(MapError::IncompatibleConfig(
                "dynamic initial layout is not supported for fidelity-aware mapping".into(),
            ));
        }
        if config.consider_fidelity && config.teleportation_qubits > 0 {
            warn!("teleportation is not supported for fidelity-aware mapping; disabling it");
            config.use_teleportation = false;
            config.teleportation_qubits = 0;
        }

        if config.use_teleportation && config.teleportation_qubits == 0 {
            config.teleportation_qubits = 2;
        }
        if config.teleportation_qubits % 2 != 0 {
            return Err(MapError::IncompatibleConfig(
                "teleportation requires an even number of reserved qubits".into(),
            ));
        }

        let required = self.circuit.num_qubits() as usize + config.teleportation_qubits;
        if required > self.arch.num_qubits() as usize {
            return Err(MapError::CircuitTooLarge {
                required,
                available: self.arch.num_qubits(),
            });
        }

        Ok(config)
    }

    /// Split the input into the routable gate stream and its trailing
    /// measurements.
    fn preprocess(&mut self) -> MapResult<()> {
        self.ops.clear();
        self.measurements.clear();
        let mut measured = vec![false; self.circuit.num_qubits() as usize];

        for inst in self.circuit.instructions() {
            match &inst.kind {
                InstructionKind::Measure => {
                    for (&q, &c) in inst.qubits.iter().zip(inst.clbits.iter()) {
                        self.measurements.push((q, c));
                        measured[q.0 as usize] = true;
                    }
                }
                InstructionKind::Teleportation => {
                    return Err(MapError::UnsupportedOperation(
                        "teleportation in the input circuit".into(),
                    ));
                }
                InstructionKind::Gate(_) | InstructionKind::Barrier => {
                    if inst.qubits.iter().any(|q| measured[q.0 as usize]) {
                        return Err(MapError::UnsupportedOperation(
                            "mid-circuit measurement".into(),
                        ));
                    }
                    self.ops.push(inst.clone());
                }
            }
        }

        if self.config.pre_mapping_optimizations {
            cancel_self_inverse_pairs(&mut self.ops);
        }
        Ok(())
    }

    /// Place teleportation ancillas and apply the configured initial
    /// layout strategy.
    fn create_initial_mapping(&mut self) -> MapResult<()> {
        if self.layers.is_empty() {
            return Ok(());
        }

        match self.config.initial_layout {
            InitialLayout::Identity => {
                for l in 0..self.circuit.num_qubits() as u16 {
                    self.locations[l as usize] = Some(l);
                    self.qubits[l as usize] = Some(l);
                }
            }
            InitialLayout::Static => self.static_initial_mapping(),
            InitialLayout::Dynamic | InitialLayout::None => {}
        }

        // ancillas go onto edges the layout strategy left free
        if self.config.teleportation_qubits > 0 {
            self.place_teleportation_qubits()?;
            if self.config.teleportation_fake {
                self.config.teleportation_qubits = 0;
            }
        }
        Ok(())
    }

    /// Draw a random free coupling edge for each reserved ancilla pair.
    fn place_teleportation_qubits(&mut self) -> MapResult<()> {
        let mut rng = if self.config.teleportation_seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(self.config.teleportation_seed)
        };

        let n_logical = self.circuit.num_qubits() as usize;
        for i in (0..self.config.teleportation_qubits).step_by(2) {
            let free_edges: Vec<_> = self
                .arch
                .coupling_map()
                .iter()
                .copied()
                .filter(|&(u, v)| {
                    self.qubits[u as usize].is_none() && self.qubits[v as usize].is_none()
                })
                .collect();
            if free_edges.is_empty() {
                return Err(MapError::IncompatibleConfig(
                    "no free coupling edge left for teleportation ancillas".into(),
                ));
            }
            let (u, v) = free_edges[rng.gen_range(0..free_edges.len())];
            let anc1 = (n_logical + i) as u16;
            let anc2 = (n_logical + i + 1) as u16;
            self.locations[anc1 as usize] = Some(u);
            self.locations[anc2 as usize] = Some(v);
            self.qubits[u as usize] = Some(anc1);
            self.qubits[v as usize] = Some(anc2);
            self.mapped.initial_layout.find_and_swap(QubitId::from(anc1), u);
            self.mapped.initial_layout.find_and_swap(QubitId::from(anc2), v);
            self.mapped
                .output_permutation
                .find_and_swap(QubitId::from(anc1), u);
            self.mapped
                .output_permutation
                .find_and_swap(QubitId::from(anc2), v);
            debug!(ancillas = ?(anc1, anc2), edge = ?(u, v), "placed teleportation pair");
        }
        Ok(())
    }

    /// Greedily place first-layer pairs onto free device edges, then fill
    /// the remaining logical qubits into free slots.
    fn static_initial_mapping(&mut self) {
        let first_layer = self.layers[0].clone();
        for gate in first_layer {
            let GateRef::Two {
                control, target, ..
            } = gate
            else {
                continue;
            };
            if self.locations[control as usize].is_some()
                || self.locations[target as usize].is_some()
            {
                continue;
            }
            for &(u, v) in self.arch.coupling_map() {
                if self.qubits[u as usize].is_none() && self.qubits[v as usize].is_none() {
                    self.qubits[u as usize] = Some(control);
                    self.qubits[v as usize] = Some(target);
                    self.locations[control as usize] = Some(u);
                    self.locations[target as usize] = Some(v);
                    self.mapped.initial_layout.find_and_swap(QubitId::from(control), u);
                    self.mapped.initial_layout.find_and_swap(QubitId::from(target), v);
                    self.mapped
                        .output_permutation
                        .find_and_swap(QubitId::from(control), u);
                    self.mapped
                        .output_permutation
                        .find_and_swap(QubitId::from(target), v);
                    break;
                }
            }
        }

        // assign remaining logical qubits to arbitrary free slots
        for l in 0..self.circuit.num_qubits() as u16 {
            if self.locations[l as usize].is_some() {
                continue;
            }
            for p in 0..self.arch.num_qubits() {
                if self.qubits[p as usize].is_none() {
                    self.locations[l as usize] = Some(p);
                    self.qubits[p as usize] = Some(l);
                    self.mapped.initial_layout.find_and_swap(QubitId::from(l), p);
                    self.mapped.output_permutation.find_and_swap(QubitId::from(l), p);
                    break;
                }
            }
        }
    }

    /// Route the layer sequence forward and backward without emitting
    /// anything, letting a dynamic placement settle; then restart from the
    /// settled placement.
    fn settle_initial_layout(&mut self) -> MapResult<()> {
        self.settling = true;
        for round in 0..self.config.iterative_bidirectional_routing {
            debug!(round, "iterative bidirectional routing pass");
            for layer in 0..self.layers.len() {
                let result = self.a_star_map(layer)?;
                self.qubits = result.qubits;
                self.locations = result.locations;
            }
            for layer in (0..self.layers.len()).rev() {
                let result = self.a_star_map(layer)?;
                self.qubits = result.qubits;
                self.locations = result.locations;
            }
        }
        self.settling = false;

        let p = self.arch.num_qubits() as usize;
        self.mapped.initial_layout = Layout::identity(p);
        self.mapped.output_permutation = Layout::identity(p);
        for l in 0..p {
            if let Some(loc) = self.locations[l] {
                self.mapped
                    .initial_layout
                    .find_and_swap(QubitId(l as u32), loc);
                self.mapped
                    .output_permutation
                    .find_and_swap(QubitId(l as u32), loc);
            }
        }
        Ok(())
    }

    /// Emit the committed swaps and the layer's gates into the mapped
    /// circuit. Swaps of the first layer are folded into the initial
    /// layout unless `swap_on_first_layer` is set.
    fn emit_layer(
        &mut self,
        layer: usize,
        result: &SearchNode,
        gates_to_adjust: &mut Vec<usize>,
    ) -> MapResult<()> {
        if layer != 0 || self.config.swap_on_first_layer {
            for batch in &result.swaps {
                for op in batch {
                    match op.kind {
                        SwapKind::Swap => {
                            if !self.arch.is_edge_connected(op.first, op.second) {
                                return Err(MapError::InvalidSwap {
                                    first: op.first,
                                    second: op.second,
                                });
                            }
                            self.mapped
                                .swap(QubitId::from(op.first), QubitId::from(op.second))?;
                        }
                        SwapKind::Teleport => {
                            let middle = op.middle.ok_or(MapError::TeleportationFailed {
                                first: op.first,
                                second: op.second,
                            })?;
                            self.mapped.append(Instruction::teleportation(
                                QubitId::from(op.first),
                                QubitId::from(op.second),
                                QubitId::from(middle),
                            ))?;
                        }
                    }
                }
            }
        } else {
            // a pre-circuit exchange is just a relabeling of the start
            // placement
            for batch in &result.swaps {
                for op in batch {
                    self.mapped.initial_layout.swap_physical(op.first, op.second);
                }
            }
        }

        let gates = self.layers[layer].clone();
        for gate in gates {
            match gate {
                GateRef::Single { target, op } => {
                    let mut inst = self.ops[op].clone();
                    match self.locations[target as usize] {
                        Some(loc) => inst.qubits = vec![QubitId::from(loc)],
                        None => {
                            // floating single-qubit-only logical; emitted at
                            // its logical index and fixed up afterwards
                            inst.qubits = vec![QubitId::from(target)];
                            gates_to_adjust.push(self.mapped.num_ops());
                        }
                    }
                    self.mapped.append(inst)?;
                }
                GateRef::Two {
                    control, target, op,
                } => {
                    let (Some(lc), Some(lt)) = (
                        self.locations[control as usize],
                        self.locations[target as usize],
                    ) else {
                        return Err(MapError::UnsupportedOperation(
                            "two-qubit gate with unmapped operand at emission".into(),
                        ));
                    };
                    self.emit_two_qubit_gate(op, lc, lt)?;
                }
            }
        }
        Ok(())
    }

    fn emit_two_qubit_gate(&mut self, op: usize, lc: u16, lt: u16) -> MapResult<()> {
        let mut inst = self.ops[op].clone();
        if self.arch.coupling_map().contains(&(lc, lt)) {
            inst.qubits = vec![QubitId::from(lc), QubitId::from(lt)];
            self.mapped.append(inst)?;
            return Ok(());
        }
        if !self.arch.coupling_map().contains(&(lt, lc)) {
            return Err(MapError::InvalidTwoQubitGate {
                first: lc,
                second: lt,
            });
        }

        let gate = inst.as_gate().cloned().ok_or_else(|| {
            MapError::UnsupportedOperation("non-gate instruction in routing layer".into())
        })?;
        if gate == StandardGate::CX {
            // execute on the reversed edge with a Hadamard sandwich
            self.mapped.h(QubitId::from(lt))?;
            self.mapped.h(QubitId::from(lc))?;
            self.mapped.cx(QubitId::from(lt), QubitId::from(lc))?;
            self.mapped.h(QubitId::from(lc))?;
            self.mapped.h(QubitId::from(lt))?;
            self.direction_reverse += 1;
        } else if gate.is_symmetric() {
            inst.qubits = vec![QubitId::from(lt), QubitId::from(lc)];
            self.mapped.append(inst)?;
        } else {
            return Err(MapError::UnsupportedOperation(format!(
                "cannot reverse '{}' on the directed edge {lt}->{lc}",
                gate.name()
            )));
        }
        Ok(())
    }

    /// Rebuild the output permutation from the final placement and mark
    /// physical qubits without circuit data as garbage.
    fn infer_output_permutation(&mut self) {
        let p = self.arch.num_qubits() as usize;
        let n_logical = self.circuit.num_qubits();
        self.mapped.output_permutation = Layout::with_capacity(p);
        self.mapped.garbage = vec![false; p];
        for phys in 0..p {
            match self.qubits[phys] {
                Some(l) => {
                    self.mapped
                        .output_permutation
                        .add(QubitId::from(l), phys as u16);
                    self.mapped.garbage[phys] = u32::from(l) >= n_logical;
                }
                None => self.mapped.garbage[phys] = true,
            }
        }
    }

    /// Rewind the emitted stream to rewrite single-qubit gates whose
    /// logical target had no location when they were emitted.
    fn adjust_floating_gates(&mut self, gates_to_adjust: &[usize]) -> MapResult<()> {
        if gates_to_adjust.is_empty() {
            return Ok(());
        }

        let mut pending = gates_to_adjust.to_vec();
        let mut qubits = self.qubits.clone();
        let mut locations = self.locations.clone();
        let mut layout_patches: Vec<(QubitId, u16)> = vec![];

        let instructions = self.mapped.instructions_mut();
        for idx in (0..instructions.len()).rev() {
            // un-apply routing operations to recover the placement at this
            // point of the program
            let exchanged = match &instructions[idx].kind {
                InstructionKind::Gate(StandardGate::Swap) | InstructionKind::Teleportation => {
                    Some((instructions[idx].qubits[0], instructions[idx].qubits[1]))
                }
                _ => None,
            };
            if let Some((p0, p1)) = exchanged {
                let (p0, p1) = (p0.0 as usize, p1.0 as usize);
                let q0 = qubits[p0];
                let q1 = qubits[p1];
                qubits[p0] = q1;
                qubits[p1] = q0;
                if let Some(q0) = q0 {
                    locations[q0 as usize] = Some(p1 as u16);
                }
                if let Some(q1) = q1 {
                    locations[q1 as usize] = Some(p0 as u16);
                }
            }

            if pending.last() == Some(&idx) {
                pending.pop();
                let logical = instructions[idx].qubits[0].0 as usize;
                match locations[logical] {
                    Some(loc) => instructions[idx].qubits = vec![QubitId::from(loc)],
                    None => {
                        // the qubit only ever occurs in single-qubit gates;
                        // any physical qubit free both here and at the end
                        // of the circuit will do
                        let mut free = 0usize;
                        while free < qubits.len()
                            && (qubits[free].is_some() || self.qubits[free].is_some())
                        {
                            free += 1;
                        }
                        if free == qubits.len() {
                            return Err(MapError::CircuitTooLarge {
                                required: qubits.len() + 1,
                                available: self.arch.num_qubits(),
                            });
                        }
                        locations[logical] = Some(free as u16);
                        qubits[free] = Some(logical as u16);
                        self.qubits[free] = Some(logical as u16);
                        instructions[idx].qubits = vec![QubitId::from(free as u16)];
                        layout_patches.push((QubitId(logical as u32), free as u16));
                    }
                }
            }
        }

        for (logical, phys) in layout_patches {
            self.mapped.initial_layout.find_and_swap(logical, phys);
            self.mapped.output_permutation.add(logical, phys);
            self.mapped.garbage[phys as usize] = false;
        }
        Ok(())
    }

    /// Re-append the stripped measurements at each logical qubit's final
    /// physical location.
    fn append_measurements(&mut self) -> MapResult<()> {
        if !self.config.add_measurements_to_mapped_circuit {
            return Ok(());
        }

        let targets: Vec<(QubitId, ClbitId)> = if self.measurements.is_empty() {
            (0..self.circuit.num_qubits())
                .map(|q| (QubitId(q), ClbitId(q)))
                .collect()
        } else {
            self.measurements.clone()
        };

        for (logical, clbit) in targets {
            let loc = match self.mapped.output_permutation.physical_of(logical) {
                Some(loc) => loc,
                None => {
                    // a logical qubit the circuit never placed; park it on a
                    // free physical so its readout is well-defined
                    let mut free = None;
                    for p in 0..self.arch.num_qubits() {
                        if self.qubits[p as usize].is_none() {
                            free = Some(p);
                            break;
                        }
                    }
                    let free = free.ok_or(MapError::CircuitTooLarge {
                        required: self.arch.num_qubits() as usize + 1,
                        available: self.arch.num_qubits(),
                    })?;
                    self.qubits[free as usize] = Some(logical.0 as u16);
                    self.mapped.initial_layout.find_and_swap(logical, free);
                    self.mapped.output_permutation.add(logical, free);
                    free
                }
            };
            self.mapped.garbage[loc as usize] = false;
            self.mapped.measure(QubitId::from(loc), clbit)?;
        }
        Ok(())
    }
}
