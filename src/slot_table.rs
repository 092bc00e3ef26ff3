//! Fixed-size direct-mapped table holding records whose mate has not arrived

use crate::record::{Keyed, MateRecord};

/// The outcome of admitting a record into the [`SlotTable`]
#[derive(Debug)]
pub enum Admission<R> {
    /// The record now occupies its slot
    Stored,

    /// The record completed a pair with the slot's occupant; ordered read1 first
    Paired(R, R),

    /// The slot held an unrelated record, which was displaced by the new one
    Evicted(Keyed<R>),
}

/// A direct-mapped hash table of `2^hash_bits` slots, one record per slot
///
/// There is no probing and no resizing: a collision always evicts the current
/// occupant, which keeps residency bounded regardless of input order.
///
/// Residents are boxed so that an empty slot costs one pointer.
pub struct SlotTable<R> {
    slots: Vec<Option<Box<Keyed<R>>>>,
    mask: u64,
    occupied: usize,
}
impl<R: MateRecord> SlotTable<R> {
    /// Creates an empty table of `2^hash_bits` slots
    #[must_use]
    pub fn new(hash_bits: u32) -> Self {
        let num_slots = 1usize << hash_bits;
        let mut slots = Vec::with_capacity(num_slots);
        slots.resize_with(num_slots, || None);
        Self {
            slots,
            mask: (num_slots as u64) - 1,
            occupied: 0,
        }
    }

    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently holding a record
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Admits a record into its slot
    ///
    /// A mate already waiting in the slot is removed and returned together
    /// with the new record. Any other occupant is evicted in favour of the
    /// new record.
    pub fn insert(&mut self, entry: Keyed<R>) -> Admission<R> {
        let slot = &mut self.slots[(entry.hash & self.mask) as usize];
        match slot.take() {
            None => {
                *slot = Some(Box::new(entry));
                self.occupied += 1;
                Admission::Stored
            }
            Some(resident) if resident.is_mate_of(&entry) => {
                self.occupied -= 1;
                let (first, second) = (*resident).into_ordered_pair(entry);
                Admission::Paired(first, second)
            }
            Some(resident) => {
                *slot = Some(Box::new(entry));
                Admission::Evicted(*resident)
            }
        }
    }

    /// Empties the table, returning the residents in slot order
    pub fn drain(&mut self) -> Vec<Keyed<R>> {
        let residents: Vec<_> = self
            .slots
            .iter_mut()
            .filter_map(Option::take)
            .map(|resident| *resident)
            .collect();
        self.occupied = 0;
        residents
    }
}
