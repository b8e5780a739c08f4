//! Peephole cleanup: cancel adjacent self-inverse gate pairs.

use alsvid_ir::{Instruction, InstructionKind, StandardGate};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Cancel adjacent self-inverse pairs (G·G = I) on identical operands.
///
/// Two gates form a pair when no other operation touches any of their
/// qubits in between; measurements, barriers, and teleportations block
/// cancellation. Runs to a fixpoint. Returns the number of removed
/// instructions.
pub fn cancel_self_inverse_pairs(instructions: &mut Vec<Instruction>) -> usize {
    let mut removed_total = 0;
    loop {
        let removed = cancel_pass(instructions);
        removed_total += removed;
        if removed == 0 {
            break;
        }
    }
    if removed_total > 0 {
        debug!(removed = removed_total, "peephole cancellation");
    }
    removed_total
}

fn cancel_pass(instructions: &mut Vec<Instruction>) -> usize {
    // last surviving instruction index per qubit
    let mut last_on_qubit: FxHashMap<u32, usize> = FxHashMap::default();
    let mut remove = vec![false; instructions.len()];

    for idx in 0..instructions.len() {
        let inst = &instructions[idx];
        let cancellable = matches!(&inst.kind, InstructionKind::Gate(g) if g.is_self_inverse());

        if cancellable {
            let prev = inst
                .qubits
                .iter()
                .map(|q| last_on_qubit.get(&q.0).copied())
                .collect::<Option<Vec<_>>>();
            if let Some(prev) = prev {
                if let [first, rest @ ..] = prev.as_slice() {
                    let same_pred = rest.iter().all(|p| p == first);
                    if same_pred && !remove[*first] && cancels(&instructions[*first], inst) {
                        remove[*first] = true;
                        remove[idx] = true;
                        for q in &instructions[idx].qubits {
                            last_on_qubit.remove(&q.0);
                        }
                        continue;
                    }
                }
            }
        }

        for q in &inst.qubits {
            last_on_qubit.insert(q.0, idx);
        }
    }

    let before = instructions.len();
    let mut keep = remove.iter().map(|r| !r);
    instructions.retain(|_| keep.next().unwrap_or(true));
    before - instructions.len()
}

/// Two instructions cancel when they are the same self-inverse gate on the
/// same operands (order-insensitive for symmetric gates).
fn cancels(a: &Instruction, b: &Instruction) -> bool {
    let (InstructionKind::Gate(ga), InstructionKind::Gate(gb)) = (&a.kind, &b.kind) else {
        return false;
    };
    if ga != gb {
        return false;
    }
    if a.qubits == b.qubits {
        return true;
    }
    ga == &StandardGate::Swap
        && a.qubits.len() == 2
        && a.qubits[0] == b.qubits[1]
        && a.qubits[1] == b.qubits[0]
}
