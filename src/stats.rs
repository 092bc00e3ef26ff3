use std::collections::BTreeMap;
use std::fmt;

/// Counters describing a collation run
///
/// Pair counters count pairs, not records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollateStats {
    /// Records pulled from the source
    pub records_read: u64,

    /// Records dropped because they carried an excluded flag
    pub records_excluded: u64,

    /// Records handed to the caller of `get`
    pub records_emitted: u64,

    /// Records with neither or both segment flags, emitted as they arrive
    pub fragments: u64,

    /// Pairs completed inside the slot table
    pub pairs_in_table: u64,

    /// Pairs completed while sorting the write-out buffer
    pub pairs_at_flush: u64,

    /// Pairs completed while merging spill blocks
    pub pairs_merged: u64,

    /// Records emitted without a mate
    pub orphans: u64,

    /// Records dropped by `get_pair` because no mate followed them
    pub singles_discarded: u64,

    /// Number of blocks written to the spill file
    pub spill_blocks: u64,

    /// Number of records written to the spill file
    pub records_spilled: u64,

    /// Compressed size of the spill file
    pub spill_bytes: u64,

    /// Spilled records per reference id (`-1` for unmapped)
    pub spilled_by_reference: BTreeMap<i32, u64>,
}
impl CollateStats {
    /// Total number of pairs completed in any phase
    #[must_use]
    pub fn pairs(&self) -> u64 {
        self.pairs_in_table + self.pairs_at_flush + self.pairs_merged
    }
}

impl fmt::Display for CollateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "records read:      {}", self.records_read)?;
        writeln!(f, "records excluded:  {}", self.records_excluded)?;
        writeln!(f, "records emitted:   {}", self.records_emitted)?;
        writeln!(
            f,
            "pairs:             {} (table: {}, flush: {}, merge: {})",
            self.pairs(),
            self.pairs_in_table,
            self.pairs_at_flush,
            self.pairs_merged
        )?;
        writeln!(f, "fragments:         {}", self.fragments)?;
        writeln!(f, "orphans:           {}", self.orphans)?;
        write!(
            f,
            "spilled:           {} records in {} blocks ({} bytes)",
            self.records_spilled, self.spill_blocks, self.spill_bytes
        )?;
        for (ref_id, count) in &self.spilled_by_reference {
            write!(f, "\n  ref {ref_id:>6}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_total() {
        let stats = CollateStats {
            pairs_in_table: 5,
            pairs_at_flush: 2,
            pairs_merged: 1,
            ..Default::default()
        };
        assert_eq!(stats.pairs(), 8);
    }

    #[test]
    fn test_display_lists_reference_histogram() {
        let mut stats = CollateStats::default();
        stats.spilled_by_reference.insert(-1, 4);
        stats.spilled_by_reference.insert(2, 9);
        let text = stats.to_string();
        assert!(text.contains("ref     -1: 4"));
        assert!(text.contains("ref      2: 9"));
    }
}
