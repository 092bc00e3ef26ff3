use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::io::{self, BufReader, Read};
use std::sync::Arc;

use log::{debug, info};
use memmap2::Mmap;
use tempfile::NamedTempFile;
use zstd::stream::read::Decoder;

use super::utils::read_frame;
use super::{SpillIndex, SpilledRun};
use crate::{
    error::ReplayError,
    record::{Keyed, MateRecord, SpillCodec},
    CollateStats, Result,
};

/// A byte range of the memory-mapped spill file read as a stream
struct MappedRange {
    map: Arc<Mmap>,
    pos: usize,
    end: usize,
}
impl Read for MappedRange {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes: &[u8] = &self.map;
        let avail = &bytes[self.pos..self.end];
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Streaming decoder over one spill block
type BlockCursor = Decoder<'static, BufReader<MappedRange>>;

/// The next unread record of a block, keyed for the merge
struct HeapEntry<R> {
    entry: Keyed<R>,
    block: usize,
}
impl<R: MateRecord> PartialEq for HeapEntry<R> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<R: MateRecord> Eq for HeapEntry<R> {}
impl<R: MateRecord> PartialOrd for HeapEntry<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<R: MateRecord> Ord for HeapEntry<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entry
            .collation_cmp(&other.entry)
            .then_with(|| self.block.cmp(&other.block))
    }
}

/// K-way merge over all blocks of a spill file
///
/// One cursor is kept per block with at most one decoded record per block
/// resident in the heap. Records come out in collation order, so mates that
/// were spilled into different blocks are returned back to back.
pub struct MergeReplay<R> {
    map: Arc<Mmap>,
    index: SpillIndex,

    /// One decoder per block, dropped once the block is exhausted
    cursors: Vec<Option<BlockCursor>>,
    heap: BinaryHeap<Reverse<HeapEntry<R>>>,

    /// The last unmatched record, waiting to see if its mate comes next
    pending: Option<Keyed<R>>,

    /// Reusable frame buffer
    frame: Vec<u8>,

    /// Deleted on drop, after the map is released
    _tmp: NamedTempFile,
}
impl<R: MateRecord + SpillCodec> MergeReplay<R> {
    /// Maps the spill file and primes one cursor per block
    pub fn open(run: SpilledRun) -> Result<Self> {
        let SpilledRun { tmp, index } = run;

        // Safety: the spill file is private to this collator and no longer written
        let map = Arc::new(unsafe { Mmap::map(tmp.as_file()) }?);

        let mut cursors = Vec::with_capacity(index.num_blocks());
        for (block, range) in index.iter_blocks().enumerate() {
            if range.end > map.len() as u64 {
                return Err(ReplayError::RangeOutOfBounds {
                    block,
                    end: range.end,
                    len: map.len() as u64,
                }
                .into());
            }
            let cursor = if range.has_remaining() {
                let reader = MappedRange {
                    map: map.clone(),
                    pos: range.start as usize,
                    end: range.end as usize,
                };
                Some(Decoder::new(reader)?.single_frame())
            } else {
                None
            };
            cursors.push(cursor);
        }

        info!(
            "Merging {} spill blocks ({} records, {} bytes)",
            index.num_blocks(),
            index.num_records(),
            index.num_bytes()
        );

        let mut replay = Self {
            map,
            heap: BinaryHeap::with_capacity(index.num_blocks()),
            index,
            cursors,
            pending: None,
            frame: Vec::new(),
            _tmp: tmp,
        };
        for block in 0..replay.cursors.len() {
            replay.advance(block)?;
        }
        Ok(replay)
    }

    #[must_use]
    pub fn index(&self) -> &SpillIndex {
        &self.index
    }

    /// Number of blocks that still have records to replay
    #[must_use]
    pub fn num_active_cursors(&self) -> usize {
        self.cursors.iter().filter(|cursor| cursor.is_some()).count()
    }

    /// Size of the mapped spill file in bytes
    #[must_use]
    pub fn mapped_len(&self) -> usize {
        self.map.len()
    }

    /// Returns the next record in merge order
    ///
    /// The popped record's block is immediately refilled from its cursor.
    pub fn next_record(&mut self) -> Result<Option<Keyed<R>>> {
        let Some(Reverse(top)) = self.heap.pop() else {
            return Ok(None);
        };
        self.advance(top.block)?;
        Ok(Some(top.entry))
    }

    /// Replays one record through the pending slot
    ///
    /// A record matching the pending one completes a pair; otherwise the
    /// pending record is emitted alone and replaced. Returns `false` once the
    /// merge is exhausted and nothing is left pending.
    pub fn step(&mut self, out: &mut VecDeque<R>, stats: &mut CollateStats) -> Result<bool> {
        let Some(entry) = self.next_record()? else {
            return Ok(match self.pending.take() {
                Some(orphan) => {
                    out.push_back(orphan.into_inner());
                    stats.orphans += 1;
                    true
                }
                None => false,
            });
        };

        match self.pending.take() {
            Some(pending) if pending.is_mate_of(&entry) => {
                let (first, second) = pending.into_ordered_pair(entry);
                out.push_back(first);
                out.push_back(second);
                stats.pairs_merged += 1;
            }
            Some(orphan) => {
                out.push_back(orphan.into_inner());
                stats.orphans += 1;
                self.pending = Some(entry);
            }
            None => self.pending = Some(entry),
        }
        Ok(true)
    }

    /// Loads the next record of `block` into the heap, or retires its cursor
    fn advance(&mut self, block: usize) -> Result<()> {
        let range = self.index.block_mut(block);
        if !range.has_remaining() {
            if self.cursors[block].take().is_some() {
                debug!("Spill block {block} exhausted");
            }
            return Ok(());
        }
        let Some(cursor) = self.cursors[block].as_mut() else {
            return Ok(());
        };

        if !read_frame(cursor, &mut self.frame, block)? {
            return Err(ReplayError::TruncatedBlock {
                block,
                expected: range.num_records,
                got: range.read_back,
            }
            .into());
        }
        range.read_back += 1;

        let record = R::decode(&self.frame)?;
        self.heap.push(Reverse(HeapEntry {
            entry: Keyed::new(record),
            block,
        }));
        Ok(())
    }
}
