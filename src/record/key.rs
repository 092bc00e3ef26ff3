use std::cmp::Ordering;

use ahash::RandomState;

use super::{MateRecord, ReadRole};

/// Fixed seeds so that hashes (and therefore slot placement and spill order)
/// are identical across runs
const HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Computes the 64-bit collation hash of a read name
#[must_use]
pub fn name_hash(name: &[u8]) -> u64 {
    let [k0, k1, k2, k3] = HASH_SEEDS;
    RandomState::with_seeds(k0, k1, k2, k3).hash_one(name)
}

/// Whether `a` and `b` are the two mates of one read pair
///
/// Both must share a name, carry complementary read1/read2 roles, and be
/// primary alignments.
#[must_use]
pub fn is_pair<R: MateRecord>(a: &R, b: &R) -> bool {
    let primary = |r: &R| !r.is_secondary() && !r.is_supplementary();
    a.read_role().complement() == Some(b.read_role())
        && primary(a)
        && primary(b)
        && a.name() == b.name()
}

/// A record together with its cached name hash
///
/// The hash is computed once on ingestion and travels with the record through
/// the slot table and the write-out buffer.
#[derive(Debug, Clone)]
pub struct Keyed<R> {
    pub hash: u64,
    pub record: R,
}
impl<R: MateRecord> Keyed<R> {
    #[must_use]
    pub fn new(record: R) -> Self {
        Self {
            hash: name_hash(record.name()),
            record,
        }
    }

    /// Whether the two records are mates
    ///
    /// Records with differing hashes can never be mates, so the name
    /// comparison is skipped for them.
    #[inline]
    #[must_use]
    pub fn is_mate_of(&self, other: &Self) -> bool {
        self.hash == other.hash && is_pair(&self.record, &other.record)
    }

    /// Orders two mates read1 first
    #[must_use]
    pub fn into_ordered_pair(self, other: Self) -> (R, R) {
        if self.record.read_role() == ReadRole::Read2 {
            (other.record, self.record)
        } else {
            (self.record, other.record)
        }
    }

    /// The collation order: name hash, then name, then primary before
    /// secondary or supplementary, then read role
    ///
    /// Mates compare equal on the first three keys so they always sort
    /// adjacently, read1 first.
    #[must_use]
    pub fn collation_cmp(&self, other: &Self) -> Ordering {
        let non_primary = |r: &R| r.is_secondary() || r.is_supplementary();
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.record.name().cmp(other.record.name()))
            .then_with(|| non_primary(&self.record).cmp(&non_primary(&other.record)))
            .then_with(|| self.record.read_role().cmp(&other.record.read_role()))
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        Alignment, FLAG_PAIRED, FLAG_READ1, FLAG_READ2, FLAG_SECONDARY, FLAG_SUPPLEMENTARY,
    };

    fn aln(name: &str, flags: u16) -> Alignment {
        Alignment::builder().name(name).flag(flags).build().unwrap()
    }

    #[test]
    fn test_name_hash_is_deterministic() {
        assert_eq!(name_hash(b"read_001"), name_hash(b"read_001"));
        assert_ne!(name_hash(b"read_001"), name_hash(b"read_002"));
    }

    // ==================== is_pair Tests ====================

    #[test]
    fn test_is_pair_complementary_roles() {
        let r1 = aln("x", FLAG_PAIRED | FLAG_READ1);
        let r2 = aln("x", FLAG_PAIRED | FLAG_READ2);
        assert!(is_pair(&r1, &r2));
        assert!(is_pair(&r2, &r1));
    }

    #[test]
    fn test_is_pair_same_role() {
        let a = aln("x", FLAG_PAIRED | FLAG_READ1);
        let b = aln("x", FLAG_PAIRED | FLAG_READ1);
        assert!(!is_pair(&a, &b));
    }

    #[test]
    fn test_is_pair_different_names() {
        let r1 = aln("x", FLAG_PAIRED | FLAG_READ1);
        let r2 = aln("y", FLAG_PAIRED | FLAG_READ2);
        assert!(!is_pair(&r1, &r2));
    }

    #[test]
    fn test_is_pair_rejects_secondary_and_supplementary() {
        let r1 = aln("x", FLAG_PAIRED | FLAG_READ1);
        let sec = aln("x", FLAG_PAIRED | FLAG_READ2 | FLAG_SECONDARY);
        let sup = aln("x", FLAG_PAIRED | FLAG_READ2 | FLAG_SUPPLEMENTARY);
        assert!(!is_pair(&r1, &sec));
        assert!(!is_pair(&r1, &sup));
    }

    #[test]
    fn test_is_pair_unpaired_fragment() {
        let a = aln("x", 0);
        let b = aln("x", FLAG_PAIRED | FLAG_READ2);
        assert!(!is_pair(&a, &b));
    }

    // ==================== Keyed Tests ====================

    #[test]
    fn test_into_ordered_pair() {
        let r1 = Keyed::new(aln("x", FLAG_PAIRED | FLAG_READ1));
        let r2 = Keyed::new(aln("x", FLAG_PAIRED | FLAG_READ2));
        let (first, second) = r2.clone().into_ordered_pair(r1.clone());
        assert_eq!(first.read_role(), ReadRole::Read1);
        assert_eq!(second.read_role(), ReadRole::Read2);

        let (first, second) = r1.into_ordered_pair(r2);
        assert_eq!(first.read_role(), ReadRole::Read1);
        assert_eq!(second.read_role(), ReadRole::Read2);
    }

    #[test]
    fn test_collation_cmp_places_mates_adjacent() {
        let mut entries: Vec<Keyed<Alignment>> = ["a", "b", "c", "d", "e"]
            .iter()
            .flat_map(|name| {
                [
                    Keyed::new(aln(name, FLAG_PAIRED | FLAG_READ2)),
                    Keyed::new(aln(name, FLAG_PAIRED | FLAG_READ1)),
                ]
            })
            .collect();
        entries.reverse();
        entries.sort_by(Keyed::collation_cmp);
        for chunk in entries.chunks(2) {
            assert!(chunk[0].is_mate_of(&chunk[1]));
            assert_eq!(chunk[0].record.read_role(), ReadRole::Read1);
        }
    }

    #[test]
    fn test_collation_cmp_sorts_supplementary_after_mates() {
        let mut entries = vec![
            Keyed::new(aln("x", FLAG_PAIRED | FLAG_READ1 | FLAG_SUPPLEMENTARY)),
            Keyed::new(aln("x", FLAG_PAIRED | FLAG_READ2)),
            Keyed::new(aln("x", FLAG_PAIRED | FLAG_READ2 | FLAG_SUPPLEMENTARY)),
            Keyed::new(aln("x", FLAG_PAIRED | FLAG_READ1)),
        ];
        entries.sort_by(Keyed::collation_cmp);
        assert!(entries[0].is_mate_of(&entries[1]));
        assert!(entries[2].record.is_supplementary());
        assert!(entries[3].record.is_supplementary());
    }
}
