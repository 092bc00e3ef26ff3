//! Record abstractions used by the collator
//!
//! The collator never looks inside a record beyond the handful of attributes
//! exposed by [`MateRecord`]. Records that can be spilled to disk additionally
//! implement [`SpillCodec`], a stable self-delimiting binary encoding.

mod alignment;
mod key;

pub use alignment::{Alignment, AlignmentBuilder};
pub use key::{is_pair, name_hash, Keyed};

use crate::Result;

/// Template having multiple segments
pub const FLAG_PAIRED: u16 = 0x1;

/// First segment in the template
pub const FLAG_READ1: u16 = 0x40;

/// Last segment in the template
pub const FLAG_READ2: u16 = 0x80;

/// Secondary alignment
pub const FLAG_SECONDARY: u16 = 0x100;

/// Not passing quality controls
pub const FLAG_QCFAIL: u16 = 0x200;

/// PCR or optical duplicate
pub const FLAG_DUPLICATE: u16 = 0x400;

/// Supplementary alignment
pub const FLAG_SUPPLEMENTARY: u16 = 0x800;

/// The position of a record within its read pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadRole {
    Read1,
    Read2,
    /// Neither or both segment flags are set
    Other,
}
impl ReadRole {
    /// Derives the role from SAM flag bits
    #[must_use]
    pub fn from_flags(flags: u16) -> Self {
        match (flags & FLAG_READ1 != 0, flags & FLAG_READ2 != 0) {
            (true, false) => Self::Read1,
            (false, true) => Self::Read2,
            _ => Self::Other,
        }
    }

    /// Returns the role a mate of this record must have
    #[must_use]
    pub fn complement(self) -> Option<Self> {
        match self {
            Self::Read1 => Some(Self::Read2),
            Self::Read2 => Some(Self::Read1),
            Self::Other => None,
        }
    }
}

/// The attributes of an alignment record the collator depends on
pub trait MateRecord {
    /// The read name shared by both mates
    fn name(&self) -> &[u8];

    /// SAM flag bits
    fn flags(&self) -> u16;

    /// Reference sequence id, `-1` when unmapped (diagnostics only)
    fn reference_id(&self) -> i32;

    #[inline]
    fn read_role(&self) -> ReadRole {
        ReadRole::from_flags(self.flags())
    }

    #[inline]
    fn is_secondary(&self) -> bool {
        self.flags() & FLAG_SECONDARY != 0
    }

    #[inline]
    fn is_supplementary(&self) -> bool {
        self.flags() & FLAG_SUPPLEMENTARY != 0
    }

    /// Whether any of the bits in `mask` are set on this record
    #[inline]
    fn has_any_flag(&self, mask: u16) -> bool {
        self.flags() & mask != 0
    }
}

/// Stable binary encoding used for spill blocks
///
/// `decode` must accept exactly the bytes produced by `encode` and reject
/// anything shorter or longer.
pub trait SpillCodec: Sized {
    /// Appends the encoded record to `dst`
    fn encode(&self, dst: &mut Vec<u8>);

    /// Decodes a record from exactly `src`
    fn decode(src: &[u8]) -> Result<Self>;
}
