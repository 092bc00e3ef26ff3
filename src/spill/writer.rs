use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;
use zstd::zstd_safe;

use super::utils::{sized_compress, write_frame};
use super::{SpillIndex, SpillRange};
use crate::{
    record::{Keyed, MateRecord, SpillCodec},
    CollateStats, CollatorConfig, Result, SPILL_PREFIX,
};

/// The spill file and index handed from the writer to the merge phase
pub struct SpilledRun {
    pub(crate) tmp: NamedTempFile,
    pub(crate) index: SpillIndex,
}
impl SpilledRun {
    #[must_use]
    pub fn index(&self) -> &SpillIndex {
        &self.index
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.tmp.path()
    }
}

/// An open spill file and the current end of its compressed stream
struct SpillFile {
    tmp: NamedTempFile,
    inner: BufWriter<File>,
    offset: u64,
}
impl SpillFile {
    fn create(dir: &Path) -> Result<Self> {
        let tmp = tempfile::Builder::new()
            .prefix(SPILL_PREFIX)
            .suffix(".zst")
            .tempfile_in(dir)?;
        let inner = BufWriter::new(tmp.as_file().try_clone()?);
        debug!("Created spill file {}", tmp.path().display());
        Ok(Self {
            tmp,
            inner,
            offset: 0,
        })
    }

    /// Appends a compressed block, returning its byte range
    fn append(&mut self, z_block: &[u8]) -> Result<(u64, u64)> {
        self.inner.write_all(z_block)?;
        let start = self.offset;
        self.offset += z_block.len() as u64;
        Ok((start, self.offset))
    }

    fn close(self) -> Result<NamedTempFile> {
        let Self { tmp, mut inner, .. } = self;
        inner.flush()?;
        Ok(tmp)
    }
}

/// Buffers evicted records and spills the unmatched ones to disk
///
/// Records are pushed one at a time. Once `max_buffered` records are held the
/// buffer is sorted so that mates sit next to each other, completed pairs are
/// emitted straight away and the remainder is written as one zstd-compressed
/// block of the spill file. The spill file is only created on the first block.
pub struct SpillWriter<R> {
    /// The write-out buffer
    buffer: Vec<Keyed<R>>,
    max_buffered: usize,

    tmp_dir: PathBuf,
    file: Option<SpillFile>,
    index: SpillIndex,

    /// Compression context and level for spill blocks
    cctx: zstd_safe::CCtx<'static>,
    level: i32,

    /// Reusable encoding buffers
    r_buf: Vec<u8>,
    u_buf: Vec<u8>,
    z_buf: Vec<u8>,
}
impl<R: MateRecord + SpillCodec> SpillWriter<R> {
    #[must_use]
    pub fn new(config: &CollatorConfig) -> Self {
        Self {
            buffer: Vec::with_capacity(config.max_buffered.min(1 << 16)),
            max_buffered: config.max_buffered,
            tmp_dir: config.tmp_dir.clone(),
            file: None,
            index: SpillIndex::default(),
            cctx: zstd_safe::CCtx::create(),
            level: config.compression_level,
            r_buf: Vec::new(),
            u_buf: Vec::new(),
            z_buf: Vec::new(),
        }
    }

    /// Number of records waiting in the write-out buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether at least one block has reached the spill file
    #[must_use]
    pub fn is_spilled(&self) -> bool {
        self.file.is_some()
    }

    #[must_use]
    pub fn index(&self) -> &SpillIndex {
        &self.index
    }

    /// Buffers a record, flushing synchronously once the buffer is full
    pub fn push(
        &mut self,
        entry: Keyed<R>,
        out: &mut VecDeque<R>,
        stats: &mut CollateStats,
    ) -> Result<()> {
        self.buffer.push(entry);
        if self.buffer.len() >= self.max_buffered {
            self.flush(out, stats)?;
        }
        Ok(())
    }

    /// Pairs up buffered mates and spills the remainder as one block
    ///
    /// Flushing an empty buffer, or one made only of mate pairs, leaves the
    /// spill file and index untouched.
    pub fn flush(&mut self, out: &mut VecDeque<R>, stats: &mut CollateStats) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let remainder = self.pair_buffered(out, stats);
        if remainder.is_empty() {
            return Ok(());
        }
        self.write_block(&remainder, stats)
    }

    /// Closes the writer at end of stream
    ///
    /// If nothing was ever spilled the buffer holds every unpaired record of
    /// the stream, so it is paired locally and the leftovers are emitted as
    /// orphans without touching disk. Otherwise the buffer is flushed and the
    /// spill file handed back for replay.
    pub fn finish(
        mut self,
        out: &mut VecDeque<R>,
        stats: &mut CollateStats,
    ) -> Result<Option<SpilledRun>> {
        if !self.is_spilled() {
            let orphans = self.pair_buffered(out, stats);
            stats.orphans += orphans.len() as u64;
            out.extend(orphans.into_iter().map(Keyed::into_inner));
            return Ok(None);
        }

        self.flush(out, stats)?;
        let Some(file) = self.file.take() else {
            return Ok(None);
        };
        Ok(Some(SpilledRun {
            tmp: file.close()?,
            index: std::mem::take(&mut self.index),
        }))
    }

    /// Sorts the buffer and emits adjacent mates, returning the unmatched records
    fn pair_buffered(&mut self, out: &mut VecDeque<R>, stats: &mut CollateStats) -> Vec<Keyed<R>> {
        self.buffer.sort_unstable_by(Keyed::collation_cmp);

        let mut remainder = Vec::new();
        let mut entries = self.buffer.drain(..).peekable();
        while let Some(entry) = entries.next() {
            match entries.next_if(|next| entry.is_mate_of(next)) {
                Some(mate) => {
                    let (first, second) = entry.into_ordered_pair(mate);
                    out.push_back(first);
                    out.push_back(second);
                    stats.pairs_at_flush += 1;
                }
                None => remainder.push(entry),
            }
        }
        remainder
    }

    fn write_block(&mut self, entries: &[Keyed<R>], stats: &mut CollateStats) -> Result<()> {
        // encode all records as length-prefixed frames
        self.u_buf.clear();
        for entry in entries {
            self.r_buf.clear();
            entry.record.encode(&mut self.r_buf);
            write_frame(&mut self.u_buf, &self.r_buf)?;
            *stats
                .spilled_by_reference
                .entry(entry.record.reference_id())
                .or_default() += 1;
        }

        // compress the block as a single frame
        sized_compress(&mut self.z_buf, &self.u_buf, self.level, &mut self.cctx)?;

        let file = match self.file {
            Some(ref mut file) => file,
            None => self.file.insert(SpillFile::create(&self.tmp_dir)?),
        };
        let (start, end) = file.append(&self.z_buf)?;

        let num_records = entries.len() as u64;
        self.index.push(SpillRange::new(start, end, num_records));
        stats.spill_blocks += 1;
        stats.records_spilled += num_records;
        stats.spill_bytes = end;

        debug!(
            "Spilled block {} ({} records, bytes {}..{})",
            self.index.num_blocks() - 1,
            num_records,
            start,
            end
        );
        Ok(())
    }
}
