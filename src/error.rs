use std::error::Error as StdError;

/// Custom Result type for collation operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the matecollate library, encompassing all possible error cases
/// that can occur while collating a record stream.
///
/// Every variant is fatal: once [`Collator::get`](crate::Collator::get) has returned an
/// error the collator must not be polled again.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to an invalid collator configuration
    #[error("Error in configuration: {0}")]
    ConfigError(#[from] ConfigError),

    /// Errors encoding or decoding a single record
    #[error("Error in record codec: {0}")]
    CodecError(#[from] CodecError),

    /// Errors that occur while writing spill blocks
    #[error("Error writing spill file: {0}")]
    SpillError(#[from] SpillError),

    /// Errors that occur while replaying spill blocks
    #[error("Error replaying spill file: {0}")]
    ReplayError(#[from] ReplayError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// Errors raised by a record source, or any other unexpected situation
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error indicates a corrupted spill file
    ///
    /// Codec and replay errors can only be raised while reading back spilled
    /// records, so they mean the spill content no longer matches its index.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CodecError(_) | Self::ReplayError(_))
    }
}

/// Errors raised while validating a [`CollatorConfig`](crate::CollatorConfig)
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The slot table would need more than 2^28 slots
    #[error("Hash bits ({0}) exceeds the maximum of {max}", max = crate::MAX_HASH_BITS)]
    HashBitsTooLarge(u32),

    /// The write-out buffer must hold at least one record
    #[error("Maximum number of buffered records must be at least 1")]
    ZeroMaxBuffered,
}

/// Errors raised by a [`SpillCodec`](crate::SpillCodec) implementation
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// Fewer bytes than the fixed record header
    #[error("Record is too short: expected at least {expected} bytes, got {got}")]
    RecordTooShort { expected: usize, got: usize },

    /// The variable-length fields do not add up to the encoded length
    #[error("Record length mismatch: header describes {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// A record was built without a read name
    #[error("AlignmentBuilder requires a read name")]
    MissingName,
}

/// Errors that can occur while writing spill blocks
#[derive(thiserror::Error, Debug)]
pub enum SpillError {
    /// The block compressor rejected its input
    #[error("Unable to compress spill block: {0}")]
    Compression(String),
}

/// Errors that can occur while replaying spill blocks
#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    /// A block ended before yielding the number of records recorded in the index
    #[error("Spill block {block} ended after {got} records - expected {expected}")]
    TruncatedBlock {
        block: usize,
        expected: u64,
        got: u64,
    },

    /// A record inside a block was shorter than its length prefix
    #[error("Spill block {block} holds a truncated record: expected {expected} bytes, got {got}")]
    TruncatedRecord {
        block: usize,
        expected: usize,
        got: usize,
    },

    /// The index points past the end of the spill file
    #[error("Spill block {block} ends at byte {end} but the spill file is {len} bytes")]
    RangeOutOfBounds { block: usize, end: u64, len: u64 },
}

/// Trait for converting arbitrary errors into `Error`
///
/// Record sources use this to surface their own failures through the collator.
pub trait IntoCollateError {
    fn into_collate_error(self) -> Error;
}

impl<E> IntoCollateError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_collate_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}
