//! The collating state machine
//!
//! A [`Collator`] moves through three phases:
//!
//! 1. **Reading** - records are pulled from the source and admitted into the
//!    slot table. Mates meeting in a slot are emitted at once; displaced records
//!    go to the spill writer, which pairs what it can and spills the rest.
//! 2. **Merging** - once the source is exhausted and something was spilled,
//!    all spill blocks are merged to recover mates separated across blocks.
//! 3. **Done** - every record has been emitted.
//!
//! Merging is skipped when nothing reached disk.

use std::collections::VecDeque;

use log::info;

use crate::{
    record::{is_pair, Keyed, MateRecord, ReadRole, SpillCodec},
    slot_table::{Admission, SlotTable},
    source::RecordSource,
    spill::{MergeReplay, SpillWriter},
    CollateStats, CollatorConfig, Result,
};

/// The externally visible phase of a [`Collator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Reading,
    Merging,
    Done,
}

/// Phase data; each phase owns exactly the structures it needs
enum Phase<R> {
    Reading {
        table: SlotTable<R>,
        spill: SpillWriter<R>,
    },
    Merging(MergeReplay<R>),
    Done,
}

/// Groups an arbitrarily ordered record stream into adjacent mate pairs
///
/// Records are pulled with [`get`](Self::get); mates come out back to back,
/// read1 first. Records whose mate never appears are emitted alone once the
/// input is exhausted. Memory is bounded by the slot table and write-out
/// buffer sizes; overflow is spilled to a temporary file.
///
/// # Example
///
/// ```
/// use matecollate::{Alignment, Collator, CollatorConfig, IterSource, FLAG_PAIRED, FLAG_READ1, FLAG_READ2};
///
/// let record = |name: &str, flag: u16| {
///     Alignment::builder().name(name).flag(FLAG_PAIRED | flag).build().unwrap()
/// };
/// let records = vec![
///     record("x", FLAG_READ2),
///     record("y", FLAG_READ1),
///     record("x", FLAG_READ1),
///     record("y", FLAG_READ2),
/// ];
///
/// let source = IterSource::new((), records);
/// let config = CollatorConfig::builder().hash_bits(8).build().unwrap();
/// let mut collator = Collator::new(source, config);
/// let mut emitted = 0;
/// while let Some(_record) = collator.get().unwrap() {
///     emitted += 1;
/// }
/// assert_eq!(emitted, 4);
/// assert_eq!(collator.stats().pairs(), 2);
/// ```
pub struct Collator<S: RecordSource> {
    source: S,
    config: CollatorConfig,
    phase: Phase<S::Record>,

    /// Records ready for the caller
    output: VecDeque<S::Record>,

    /// Complete pairs buffered by `get_pair`
    pairs: VecDeque<S::Record>,

    stats: CollateStats,
}
impl<S> Collator<S>
where
    S: RecordSource,
    S::Record: MateRecord + SpillCodec,
{
    #[must_use]
    pub fn new(source: S, config: CollatorConfig) -> Self {
        let phase = Phase::Reading {
            table: SlotTable::new(config.hash_bits),
            spill: SpillWriter::new(&config),
        };
        Self {
            source,
            config,
            phase,
            output: VecDeque::new(),
            pairs: VecDeque::new(),
            stats: CollateStats::default(),
        }
    }

    /// The source's header, passed through unmodified
    pub fn header(&self) -> &S::Header {
        self.source.header()
    }

    #[must_use]
    pub fn config(&self) -> &CollatorConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> State {
        match self.phase {
            Phase::Reading { .. } => State::Reading,
            Phase::Merging(_) => State::Merging,
            Phase::Done => State::Done,
        }
    }

    #[must_use]
    pub fn stats(&self) -> &CollateStats {
        &self.stats
    }

    /// Pulls the next record
    ///
    /// Mates are returned by consecutive calls, read1 first. Returns `None`
    /// once every record has been emitted. After an error the collator must
    /// not be used again.
    pub fn get(&mut self) -> Result<Option<S::Record>> {
        if self.output.is_empty() {
            self.fill()?;
        }
        let record = self.output.pop_front();
        if record.is_some() {
            self.stats.records_emitted += 1;
        }
        Ok(record)
    }

    /// Pulls the next pair, or a single record when no mate follows it
    ///
    /// A single record is placed in the slot matching its read role (read2
    /// on the right, anything else on the left). A following record that is
    /// not its mate is kept for the next call.
    pub fn try_pair(&mut self) -> Result<(Option<S::Record>, Option<S::Record>)> {
        let Some(first) = self.get()? else {
            return Ok((None, None));
        };
        match self.get()? {
            Some(second) if is_pair(&first, &second) => {
                if first.read_role() == ReadRole::Read2 {
                    Ok((Some(second), Some(first)))
                } else {
                    Ok((Some(first), Some(second)))
                }
            }
            Some(second) => {
                self.output.push_front(second);
                self.stats.records_emitted -= 1;
                Ok(Self::position_single(first))
            }
            None => Ok(Self::position_single(first)),
        }
    }

    /// Pulls the next record belonging to a complete pair
    ///
    /// Pairs are returned as consecutive calls, read1 first. Records without
    /// a mate are dropped silently; use [`get`](Self::get) or
    /// [`try_pair`](Self::try_pair) to observe them.
    pub fn get_pair(&mut self) -> Result<Option<S::Record>> {
        while self.pairs.is_empty() {
            match self.try_pair()? {
                (Some(first), Some(second)) => {
                    self.pairs.push_back(first);
                    self.pairs.push_back(second);
                }
                (None, None) => return Ok(None),
                _ => self.stats.singles_discarded += 1,
            }
        }
        Ok(self.pairs.pop_front())
    }

    fn position_single(record: S::Record) -> (Option<S::Record>, Option<S::Record>) {
        if record.read_role() == ReadRole::Read2 {
            (None, Some(record))
        } else {
            (Some(record), None)
        }
    }

    /// Runs the current phase until output is available or collation is done
    fn fill(&mut self) -> Result<()> {
        while self.output.is_empty() {
            match self.phase {
                Phase::Reading { .. } => self.fill_reading()?,
                Phase::Merging(_) => self.fill_merging()?,
                Phase::Done => break,
            }
        }
        Ok(())
    }

    fn fill_reading(&mut self) -> Result<()> {
        let Phase::Reading { table, spill } = &mut self.phase else {
            return Ok(());
        };

        let mut exhausted = false;
        while self.output.is_empty() {
            let Some(record) = self.source.next_record()? else {
                exhausted = true;
                break;
            };
            self.stats.records_read += 1;

            if record.has_any_flag(self.config.exclude_flags) {
                self.stats.records_excluded += 1;
                continue;
            }

            // fragments can never be completed by a mate
            if record.read_role() == ReadRole::Other {
                self.stats.fragments += 1;
                self.output.push_back(record);
                continue;
            }

            match table.insert(Keyed::new(record)) {
                Admission::Stored => {}
                Admission::Paired(first, second) => {
                    self.output.push_back(first);
                    self.output.push_back(second);
                    self.stats.pairs_in_table += 1;
                }
                Admission::Evicted(evicted) => {
                    spill.push(evicted, &mut self.output, &mut self.stats)?;
                }
            }
        }

        if exhausted {
            self.finish_reading()?;
        }
        Ok(())
    }

    /// Drains the slot table into the spill writer and leaves the Reading phase
    fn finish_reading(&mut self) -> Result<()> {
        let Phase::Reading { mut table, mut spill } = std::mem::replace(&mut self.phase, Phase::Done)
        else {
            return Ok(());
        };

        for entry in table.drain() {
            spill.push(entry, &mut self.output, &mut self.stats)?;
        }
        match spill.finish(&mut self.output, &mut self.stats)? {
            Some(run) => {
                info!(
                    "Finished reading {} records; spilled {} records in {} blocks",
                    self.stats.records_read, self.stats.records_spilled, self.stats.spill_blocks
                );
                self.phase = Phase::Merging(MergeReplay::open(run)?);
            }
            None => {
                info!(
                    "Finished reading {} records without spilling",
                    self.stats.records_read
                );
            }
        }
        Ok(())
    }

    fn fill_merging(&mut self) -> Result<()> {
        let Phase::Merging(replay) = &mut self.phase else {
            return Ok(());
        };

        while self.output.is_empty() {
            if !replay.step(&mut self.output, &mut self.stats)? {
                info!(
                    "Merge complete: {} pairs recovered, {} orphans",
                    self.stats.pairs_merged, self.stats.orphans
                );
                self.phase = Phase::Done;
                break;
            }
        }
        Ok(())
    }
}

impl<S> Iterator for Collator<S>
where
    S: RecordSource,
    S::Record: MateRecord + SpillCodec,
{
    type Item = Result<S::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Alignment, FLAG_PAIRED, FLAG_READ1, FLAG_READ2, FLAG_SECONDARY};
    use crate::source::IterSource;

    type TestCollator = Collator<IterSource<std::vec::IntoIter<Alignment>, &'static str>>;

    fn aln(name: &str, flags: u16) -> Alignment {
        Alignment::builder()
            .name(name)
            .flag(flags)
            .reference_id(0)
            .seq(b"ACGT")
            .qual(b"IIII")
            .build()
            .unwrap()
    }

    fn r1(name: &str) -> Alignment {
        aln(name, FLAG_PAIRED | FLAG_READ1)
    }

    fn r2(name: &str) -> Alignment {
        aln(name, FLAG_PAIRED | FLAG_READ2)
    }

    fn new_collator(records: Vec<Alignment>, hash_bits: u32, max_buffered: usize) -> TestCollator {
        let config = CollatorConfig::builder()
            .hash_bits(hash_bits)
            .max_buffered(max_buffered)
            .build()
            .unwrap();
        Collator::new(IterSource::new("@HD\tVN:1.6", records), config)
    }

    fn names(records: &[Alignment]) -> Vec<(String, ReadRole)> {
        records
            .iter()
            .map(|r| (String::from_utf8_lossy(r.name()).into_owned(), r.read_role()))
            .collect()
    }

    // ==================== get Tests ====================

    #[test]
    fn test_header_pass_through() {
        let collator = new_collator(vec![], 4, 4);
        assert_eq!(*collator.header(), "@HD\tVN:1.6");
        assert_eq!(collator.config().hash_bits(), 4);
    }

    #[test]
    fn test_empty_source() {
        let mut collator = new_collator(vec![], 4, 4);
        assert_eq!(collator.state(), State::Reading);
        assert!(collator.get().unwrap().is_none());
        assert_eq!(collator.state(), State::Done);
        assert!(collator.get().unwrap().is_none());
    }

    #[test]
    fn test_immediate_pair_either_order() {
        for records in [vec![r1("x"), r2("x")], vec![r2("x"), r1("x")]] {
            let mut collator = new_collator(records, 8, 4);
            let first = collator.get().unwrap().unwrap();
            let second = collator.get().unwrap().unwrap();
            assert_eq!(first.read_role(), ReadRole::Read1);
            assert_eq!(second.read_role(), ReadRole::Read2);
            assert_eq!(first.name(), b"x");
            assert_eq!(second.name(), b"x");
            assert!(collator.get().unwrap().is_none());
            assert_eq!(collator.stats().pairs_in_table, 1);
        }
    }

    #[test]
    fn test_secondary_records_are_excluded() {
        let records = vec![
            r1("x"),
            aln("x", FLAG_PAIRED | FLAG_READ2 | FLAG_SECONDARY),
            r2("x"),
        ];
        let mut collator = new_collator(records, 8, 4);
        let out: Vec<_> = collator.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.is_secondary()));
        assert_eq!(collator.stats().records_excluded, 1);
        assert_eq!(collator.stats().records_read, 3);
    }

    #[test]
    fn test_fragments_pass_straight_through() {
        let mut collator = new_collator(vec![aln("frag", 0), r1("x"), r2("x")], 8, 4);
        let first = collator.get().unwrap().unwrap();
        assert_eq!(first.name(), b"frag");
        assert_eq!(collator.state(), State::Reading);
        assert_eq!(collator.stats().fragments, 1);
    }

    #[test]
    fn test_eviction_and_orphan_without_spill() {
        // a single slot: q evicts p into the write-out buffer, which never fills
        let mut collator = new_collator(vec![r1("p"), r1("q")], 0, 16);
        let out: Vec<_> = collator.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(out.len(), 2);
        assert_eq!(collator.stats().orphans, 2);
        assert_eq!(collator.stats().spill_blocks, 0);
        assert_eq!(collator.state(), State::Done);
    }

    #[test]
    fn test_spill_then_merge() {
        let records = vec![r1("x"), r1("y"), r2("x"), r2("y")];
        let mut collator = new_collator(records, 0, 1);
        let mut out = Vec::new();
        let mut saw_merging = false;
        while let Some(record) = collator.get().unwrap() {
            saw_merging |= collator.state() == State::Merging;
            out.push(record);
        }
        assert!(saw_merging);
        assert_eq!(collator.state(), State::Done);

        let named = names(&out);
        assert_eq!(named.len(), 4);
        for pair in named.chunks(2) {
            assert_eq!(pair[0].0, pair[1].0);
            assert_eq!(pair[0].1, ReadRole::Read1);
            assert_eq!(pair[1].1, ReadRole::Read2);
        }
        assert_eq!(collator.stats().pairs_merged, 2);
        assert_eq!(collator.stats().records_emitted, 4);
    }

    // ==================== try_pair Tests ====================

    #[test]
    fn test_try_pair_returns_ordered_pair() {
        let mut collator = new_collator(vec![r2("x"), r1("x")], 8, 4);
        let (a, b) = collator.try_pair().unwrap();
        assert_eq!(a.unwrap().read_role(), ReadRole::Read1);
        assert_eq!(b.unwrap().read_role(), ReadRole::Read2);
        assert_eq!(collator.try_pair().unwrap(), (None, None));
    }

    #[test]
    fn test_try_pair_single_positions_by_role() {
        let mut collator = new_collator(vec![r2("lonely")], 8, 4);
        let (a, b) = collator.try_pair().unwrap();
        assert!(a.is_none());
        assert_eq!(b.unwrap().name(), b"lonely");

        let mut collator = new_collator(vec![aln("frag", 0)], 8, 4);
        let (a, b) = collator.try_pair().unwrap();
        assert_eq!(a.unwrap().name(), b"frag");
        assert!(b.is_none());
    }

    #[test]
    fn test_try_pair_keeps_unrelated_second_record() {
        let mut collator = new_collator(vec![aln("frag", 0), r1("x"), r2("x")], 8, 4);
        let (a, b) = collator.try_pair().unwrap();
        assert_eq!(a.unwrap().name(), b"frag");
        assert!(b.is_none());

        let (a, b) = collator.try_pair().unwrap();
        assert_eq!(a.unwrap().name(), b"x");
        assert_eq!(b.unwrap().name(), b"x");
        assert_eq!(collator.stats().records_emitted, 3);
    }

    // ==================== get_pair Tests ====================

    #[test]
    fn test_get_pair_drops_orphans() {
        let records = vec![r1("solo"), r1("x"), aln("frag", 0), r2("x")];
        let mut collator = new_collator(records, 8, 4);
        let mut out = Vec::new();
        while let Some(record) = collator.get_pair().unwrap() {
            out.push(record);
        }
        let named = names(&out);
        assert_eq!(
            named,
            vec![
                ("x".to_string(), ReadRole::Read1),
                ("x".to_string(), ReadRole::Read2)
            ]
        );
        assert_eq!(collator.stats().singles_discarded, 2);
    }
}
