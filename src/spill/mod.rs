//! # Spill file
//!
//! Records evicted from the slot table that find no mate in the write-out
//! buffer are spilled to a temporary file. The file is a plain sequence of
//! zstd frames, one per flush, and is described by an in-memory [`SpillIndex`].
//!
//! ```text
//! ┌───────────────────┐  <- SpillRange { start, end, num_records }
//! │   zstd frame 0    │
//! ├───────────────────┤
//! │   zstd frame 1    │
//! ├───────────────────┤
//! │       ...         │  one frame per flush
//! └───────────────────┘
//! ```
//!
//! Decompressed, a frame is a run of records in collation order (name hash,
//! name, read role), each prefixed by its little-endian u32 byte length:
//!
//! ```text
//! [len][record][len][record]...
//! ```
//!
//! Because every block is sorted the same way, a k-way merge across blocks
//! ([`MergeReplay`]) brings mates from different blocks next to each other.

mod index;
mod replay;
mod utils;
mod writer;

pub use index::{SpillIndex, SpillRange};
pub use replay::MergeReplay;
pub use writer::{SpillWriter, SpilledRun};
