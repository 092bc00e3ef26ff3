//! # matecollate
//!
//! Bounded-memory collation of an arbitrarily ordered stream of alignment
//! records into adjacent mate pairs.
//!
//! Records are first admitted into a direct-mapped [`SlotTable`], where most
//! mates meet while the stream is still being read. Records displaced from the
//! table are collected in a write-out buffer that is sorted and paired on
//! flush; whatever stays unpaired is spilled as a zstd block to a temporary
//! file. Once the input is exhausted, a k-way merge over the spill blocks
//! ([`MergeReplay`]) brings the remaining mates together.
//!
//! The [`Collator`] drives all of this behind a pull API: each call to
//! [`Collator::get`] returns the next record, with mates returned back to
//! back, read1 first.

mod collator;
mod config;
pub mod error;
mod record;
mod slot_table;
mod source;
mod spill;
mod stats;

pub use collator::{Collator, State};
pub use config::{CollatorConfig, CollatorConfigBuilder, MAX_HASH_BITS};
pub use error::{Error, IntoCollateError, Result};
pub use record::{
    is_pair, name_hash, Alignment, AlignmentBuilder, Keyed, MateRecord, ReadRole, SpillCodec,
    FLAG_DUPLICATE, FLAG_PAIRED, FLAG_QCFAIL, FLAG_READ1, FLAG_READ2, FLAG_SECONDARY,
    FLAG_SUPPLEMENTARY,
};
pub use slot_table::{Admission, SlotTable};
pub use source::{IterSource, RecordSource};
pub use spill::{MergeReplay, SpillIndex, SpillRange, SpillWriter, SpilledRun};
pub use stats::CollateStats;

/// Default number of hash bits; the slot table holds `2^20` records
pub const DEFAULT_HASH_BITS: u32 = 20;

/// Default number of evicted records buffered before a flush
pub const DEFAULT_MAX_BUFFERED: usize = 65_536;

/// zstd level used for spill blocks (0 selects the library default)
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 0;

/// Prefix of spill file names in the temporary directory
pub const SPILL_PREFIX: &str = "matecollate-";
