use std::path::{Path, PathBuf};

use crate::{
    error::ConfigError,
    record::FLAG_SECONDARY,
    Result, DEFAULT_COMPRESSION_LEVEL, DEFAULT_HASH_BITS, DEFAULT_MAX_BUFFERED,
};

/// Largest supported slot table (2^28 slots, 2 GiB of empty slots)
pub const MAX_HASH_BITS: u32 = 28;

/// Tuning parameters of a [`Collator`](crate::Collator)
///
/// Use [`CollatorConfigBuilder`] to construct a validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollatorConfig {
    /// The slot table holds `2^hash_bits` records
    pub(crate) hash_bits: u32,

    /// Number of evicted records buffered before a flush
    pub(crate) max_buffered: usize,

    /// Records carrying any of these flag bits are dropped on ingestion
    pub(crate) exclude_flags: u16,

    /// Directory receiving the spill file
    pub(crate) tmp_dir: PathBuf,

    /// zstd level used for spill blocks
    pub(crate) compression_level: i32,
}
impl Default for CollatorConfig {
    fn default() -> Self {
        Self {
            hash_bits: DEFAULT_HASH_BITS,
            max_buffered: DEFAULT_MAX_BUFFERED,
            exclude_flags: FLAG_SECONDARY,
            tmp_dir: std::env::temp_dir(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}
impl CollatorConfig {
    #[must_use]
    pub fn builder() -> CollatorConfigBuilder {
        CollatorConfigBuilder::default()
    }

    #[must_use]
    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }

    #[must_use]
    pub fn max_buffered(&self) -> usize {
        self.max_buffered
    }

    #[must_use]
    pub fn exclude_flags(&self) -> u16 {
        self.exclude_flags
    }

    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    #[must_use]
    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }

    fn validate(&self) -> Result<()> {
        if self.hash_bits > MAX_HASH_BITS {
            return Err(ConfigError::HashBitsTooLarge(self.hash_bits).into());
        }
        if self.max_buffered == 0 {
            return Err(ConfigError::ZeroMaxBuffered.into());
        }
        Ok(())
    }
}

/// A convenience builder for [`CollatorConfig`]
///
/// # Example
///
/// ```
/// use matecollate::{CollatorConfig, FLAG_SECONDARY, FLAG_SUPPLEMENTARY};
///
/// let config = CollatorConfig::builder()
///     .hash_bits(16)
///     .max_buffered(4096)
///     .exclude_flags(FLAG_SECONDARY | FLAG_SUPPLEMENTARY)
///     .build()
///     .unwrap();
/// assert_eq!(config.hash_bits(), 16);
/// ```
#[derive(Default)]
pub struct CollatorConfigBuilder {
    hash_bits: Option<u32>,
    max_buffered: Option<usize>,
    exclude_flags: Option<u16>,
    tmp_dir: Option<PathBuf>,
    compression_level: Option<i32>,
}

impl CollatorConfigBuilder {
    #[must_use]
    pub fn hash_bits(mut self, hash_bits: u32) -> Self {
        self.hash_bits = Some(hash_bits);
        self
    }

    #[must_use]
    pub fn max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = Some(max_buffered);
        self
    }

    #[must_use]
    pub fn exclude_flags(mut self, exclude_flags: u16) -> Self {
        self.exclude_flags = Some(exclude_flags);
        self
    }

    #[must_use]
    pub fn tmp_dir<P: AsRef<Path>>(mut self, tmp_dir: P) -> Self {
        self.tmp_dir = Some(tmp_dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Builds and validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if `hash_bits` exceeds [`MAX_HASH_BITS`] or
    /// `max_buffered` is zero.
    pub fn build(self) -> Result<CollatorConfig> {
        let defaults = CollatorConfig::default();
        let config = CollatorConfig {
            hash_bits: self.hash_bits.unwrap_or(defaults.hash_bits),
            max_buffered: self.max_buffered.unwrap_or(defaults.max_buffered),
            exclude_flags: self.exclude_flags.unwrap_or(defaults.exclude_flags),
            tmp_dir: self.tmp_dir.unwrap_or(defaults.tmp_dir),
            compression_level: self.compression_level.unwrap_or(defaults.compression_level),
        };
        config.validate()?;
        Ok(config)
    }
}
