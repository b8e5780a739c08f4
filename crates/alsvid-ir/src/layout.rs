//! Logical-to-physical qubit layouts.

use serde::{Deserialize, Serialize};

use crate::qubit::QubitId;

/// A mapping between logical qubits and physical qubits.
///
/// Both directions are stored as dense vectors indexed by qubit id, so
/// lookups are O(1) in the hot search loop. The two maps are kept as
/// inverse partial bijections: `logical_of(physical_of(l)) == l` for every
/// mapped logical `l`, and symmetrically for every occupied physical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Map from physical qubit index to the logical qubit occupying it.
    physical_to_logical: Vec<Option<u16>>,
    /// Map from logical qubit index to its physical location.
    logical_to_physical: Vec<Option<u16>>,
}

impl Layout {
    /// Create an empty layout with room for `capacity` qubits on each side.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            physical_to_logical: vec![None; capacity],
            logical_to_physical: vec![None; capacity],
        }
    }

    /// Create an identity layout (logical qubit i ↔ physical qubit i) over
    /// `n` qubits.
    pub fn identity(n: usize) -> Self {
        let mut layout = Self::with_capacity(n);
        for i in 0..n {
            let q = i as u16;
            layout.physical_to_logical[i] = Some(q);
            layout.logical_to_physical[i] = Some(q);
        }
        layout
    }

    /// Add a mapping from logical to physical qubit.
    ///
    /// Conflicting previous mappings of either side are removed first so
    /// that the two maps stay mutually inverse.
    pub fn add(&mut self, logical: QubitId, physical: u16) {
        let l = logical.0 as usize;
        let p = physical as usize;
        if let Some(old_logical) = self.physical_to_logical[p] {
            if old_logical as usize != l {
                self.logical_to_physical[old_logical as usize] = None;
            }
        }
        if let Some(old_physical) = self.logical_to_physical[l] {
            if old_physical != physical {
                self.physical_to_logical[old_physical as usize] = None;
            }
        }
        self.physical_to_logical[p] = Some(logical.0 as u16);
        self.logical_to_physical[l] = Some(physical);
    }

    /// Get the physical qubit for a logical qubit.
    pub fn physical_of(&self, logical: QubitId) -> Option<u16> {
        self.logical_to_physical
            .get(logical.0 as usize)
            .copied()
            .flatten()
    }

    /// Get the logical qubit for a physical qubit.
    pub fn logical_of(&self, physical: u16) -> Option<QubitId> {
        self.physical_to_logical
            .get(physical as usize)
            .copied()
            .flatten()
            .map(u32::from)
            .map(QubitId)
    }

    /// Swap the logical occupants of two physical qubits.
    pub fn swap_physical(&mut self, p1: u16, p2: u16) {
        let l1 = self.physical_to_logical[p1 as usize];
        let l2 = self.physical_to_logical[p2 as usize];
        self.physical_to_logical[p1 as usize] = l2;
        self.physical_to_logical[p2 as usize] = l1;
        if let Some(l1) = l1 {
            self.logical_to_physical[l1 as usize] = Some(p2);
        }
        if let Some(l2) = l2 {
            self.logical_to_physical[l2 as usize] = Some(p1);
        }
    }

    /// Move `logical` onto `physical` by exchanging the two affected slots.
    ///
    /// If `logical` is currently unmapped it simply takes the slot,
    /// displacing nothing but the slot's previous occupant (which becomes
    /// unmapped).
    pub fn find_and_swap(&mut self, logical: QubitId, physical: u16) {
        match self.physical_of(logical) {
            Some(current) if current == physical => {}
            Some(current) => self.swap_physical(current, physical),
            None => self.add(logical, physical),
        }
    }

    /// Number of mapped logical qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical
            .iter()
            .filter(|p| p.is_some())
            .count()
    }

    /// Check if the layout maps nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over (logical, physical) pairs in logical order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u16)> + '_ {
        self.logical_to_physical
            .iter()
            .enumerate()
            .filter_map(|(l, p)| p.map(|p| (QubitId(l as u32), p)))
    }

    /// Verify that the two maps are mutually inverse.
    pub fn is_consistent(&self) -> bool {
        for (l, p) in self.logical_to_physical.iter().enumerate() {
            if let Some(p) = p {
                if self.physical_to_logical[*p as usize] != Some(l as u16) {
                    return false;
                }
            }
        }
        for (p, l) in self.physical_to_logical.iter().enumerate() {
            if let Some(l) = l {
                if self.logical_to_physical[*l as usize] != Some(p as u16) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let layout = Layout::identity(5);
        assert_eq!(layout.physical_of(QubitId(0)), Some(0));
        assert_eq!(layout.physical_of(QubitId(4)), Some(4));
        assert_eq!(layout.logical_of(2), Some(QubitId(2)));
        assert!(layout.is_consistent());
    }

    #[test]
    fn test_swap_physical() {
        let mut layout = Layout::identity(3);
        layout.swap_physical(0, 2);

        assert_eq!(layout.physical_of(QubitId(0)), Some(2));
        assert_eq!(layout.physical_of(QubitId(2)), Some(0));
        assert_eq!(layout.logical_of(0), Some(QubitId(2)));
        assert!(layout.is_consistent());
    }

    #[test]
    fn test_swap_with_hole() {
        let mut layout = Layout::with_capacity(3);
        layout.add(QubitId(0), 0);
        layout.swap_physical(0, 2);

        assert_eq!(layout.physical_of(QubitId(0)), Some(2));
        assert_eq!(layout.logical_of(0), None);
        assert!(layout.is_consistent());
    }

    #[test]
    fn test_find_and_swap() {
        let mut layout = Layout::identity(4);
        layout.find_and_swap(QubitId(0), 3);

        assert_eq!(layout.physical_of(QubitId(0)), Some(3));
        assert_eq!(layout.physical_of(QubitId(3)), Some(0));
        assert!(layout.is_consistent());

        // already in place: no change
        layout.find_and_swap(QubitId(0), 3);
        assert_eq!(layout.physical_of(QubitId(0)), Some(3));
    }

    #[test]
    fn test_add_removes_conflicts() {
        let mut layout = Layout::identity(3);
        layout.add(QubitId(0), 1);

        assert_eq!(layout.physical_of(QubitId(0)), Some(1));
        assert_eq!(layout.physical_of(QubitId(1)), None);
        assert_eq!(layout.logical_of(0), None);
        assert!(layout.is_consistent());
    }
}
