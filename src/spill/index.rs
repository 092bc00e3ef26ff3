/// An index of spill blocks, one entry per flush in flush order
#[derive(Clone, Debug, Default)]
pub struct SpillIndex {
    ranges: Vec<SpillRange>,
}
impl SpillIndex {
    pub(crate) fn push(&mut self, range: SpillRange) {
        self.ranges.push(range);
    }

    /// Returns the number of records across all blocks
    #[must_use]
    pub fn num_records(&self) -> u64 {
        self.ranges.iter().map(|range| range.num_records).sum()
    }

    /// Returns the number of blocks in the index
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the number of compressed bytes covered by the index
    #[must_use]
    pub fn num_bytes(&self) -> u64 {
        self.ranges.last().map_or(0, |range| range.end)
    }

    #[must_use]
    pub fn iter_blocks(&self) -> std::slice::Iter<'_, SpillRange> {
        self.ranges.iter()
    }

    pub(crate) fn block_mut(&mut self, block: usize) -> &mut SpillRange {
        &mut self.ranges[block]
    }
}

/// The location of one spill block within the spill file
///
/// Offsets are positions in the compressed byte stream, not record offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SpillRange {
    /// Byte offset of the first compressed byte of this block
    pub(crate) start: u64,

    /// Byte offset one past the last compressed byte of this block
    pub(crate) end: u64,

    /// Number of records written to this block
    pub(crate) num_records: u64,

    /// Number of records replayed from this block so far
    pub(crate) read_back: u64,
}
impl SpillRange {
    #[must_use]
    pub fn new(start: u64, end: u64, num_records: u64) -> Self {
        Self {
            start,
            end,
            num_records,
            read_back: 0,
        }
    }

    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    #[must_use]
    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    #[must_use]
    pub fn read_back(&self) -> u64 {
        self.read_back
    }

    /// Whether records remain to be replayed from this block
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.read_back < self.num_records
    }

    #[must_use]
    pub fn z_bytes(&self) -> u64 {
        self.end - self.start
    }
}
