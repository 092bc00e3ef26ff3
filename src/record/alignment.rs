use bytemuck::{Pod, Zeroable};

use super::{MateRecord, SpillCodec};
use crate::{error::CodecError, Result};

/// An owned alignment record.
///
/// This carries the subset of SAM/BAM fields needed to collate and re-emit a
/// read: the name, flags, placement of the record and its mate, and the read
/// bases with their qualities.
///
/// # Example
///
/// ```
/// use matecollate::{Alignment, MateRecord, ReadRole, FLAG_PAIRED, FLAG_READ1};
///
/// let record = Alignment::builder()
///     .name("read_001")
///     .flag(FLAG_PAIRED | FLAG_READ1)
///     .reference_id(0)
///     .pos(1042)
///     .seq(b"ACGTACGT")
///     .qual(b"IIIIFFFF")
///     .build()
///     .unwrap();
/// assert_eq!(record.read_role(), ReadRole::Read1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    pub(crate) name: Vec<u8>,
    pub(crate) flag: u16,
    pub(crate) ref_id: i32,
    pub(crate) pos: i32,
    pub(crate) mapq: u8,
    pub(crate) next_ref_id: i32,
    pub(crate) next_pos: i32,
    pub(crate) tlen: i32,
    pub(crate) seq: Vec<u8>,
    pub(crate) qual: Vec<u8>,
}

impl Alignment {
    #[must_use]
    pub fn builder() -> AlignmentBuilder {
        AlignmentBuilder::default()
    }

    #[inline]
    #[must_use]
    pub fn flag(&self) -> u16 {
        self.flag
    }

    /// 0-based leftmost position, `-1` when unmapped
    #[inline]
    #[must_use]
    pub fn pos(&self) -> i32 {
        self.pos
    }

    #[inline]
    #[must_use]
    pub fn mapq(&self) -> u8 {
        self.mapq
    }

    #[inline]
    #[must_use]
    pub fn next_reference_id(&self) -> i32 {
        self.next_ref_id
    }

    #[inline]
    #[must_use]
    pub fn next_pos(&self) -> i32 {
        self.next_pos
    }

    #[inline]
    #[must_use]
    pub fn tlen(&self) -> i32 {
        self.tlen
    }

    #[inline]
    #[must_use]
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    #[inline]
    #[must_use]
    pub fn qual(&self) -> &[u8] {
        &self.qual
    }

    /// Number of bytes this record occupies when encoded
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        size_of::<AlignmentHeader>() + self.name.len() + self.seq.len() + self.qual.len()
    }
}

impl MateRecord for Alignment {
    #[inline]
    fn name(&self) -> &[u8] {
        &self.name
    }

    #[inline]
    fn flags(&self) -> u16 {
        self.flag
    }

    #[inline]
    fn reference_id(&self) -> i32 {
        self.ref_id
    }
}

/// Fixed-size prefix of an encoded [`Alignment`]
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, Zeroable, Pod)]
#[repr(C)]
struct AlignmentHeader {
    ref_id: i32,
    pos: i32,
    next_ref_id: i32,
    next_pos: i32,
    tlen: i32,
    l_name: u32,
    l_seq: u32,
    l_qual: u32,
    flag: u16,
    mapq: u8,
    reserved: u8,
}

impl SpillCodec for Alignment {
    fn encode(&self, dst: &mut Vec<u8>) {
        let header = AlignmentHeader {
            ref_id: self.ref_id,
            pos: self.pos,
            next_ref_id: self.next_ref_id,
            next_pos: self.next_pos,
            tlen: self.tlen,
            l_name: self.name.len() as u32,
            l_seq: self.seq.len() as u32,
            l_qual: self.qual.len() as u32,
            flag: self.flag,
            mapq: self.mapq,
            reserved: 0,
        };
        dst.reserve(self.encoded_size());
        dst.extend_from_slice(bytemuck::bytes_of(&header));
        dst.extend_from_slice(&self.name);
        dst.extend_from_slice(&self.seq);
        dst.extend_from_slice(&self.qual);
    }

    fn decode(src: &[u8]) -> Result<Self> {
        const HEADER_SIZE: usize = size_of::<AlignmentHeader>();
        if src.len() < HEADER_SIZE {
            return Err(CodecError::RecordTooShort {
                expected: HEADER_SIZE,
                got: src.len(),
            }
            .into());
        }

        // spill buffers carry no alignment guarantee
        let header: AlignmentHeader = bytemuck::pod_read_unaligned(&src[..HEADER_SIZE]);
        let (l_name, l_seq, l_qual) = (
            header.l_name as usize,
            header.l_seq as usize,
            header.l_qual as usize,
        );
        let expected = HEADER_SIZE + l_name + l_seq + l_qual;
        if expected != src.len() {
            return Err(CodecError::LengthMismatch {
                expected,
                got: src.len(),
            }
            .into());
        }

        let body = &src[HEADER_SIZE..];
        let (name, body) = body.split_at(l_name);
        let (seq, qual) = body.split_at(l_seq);
        Ok(Self {
            name: name.to_vec(),
            flag: header.flag,
            ref_id: header.ref_id,
            pos: header.pos,
            mapq: header.mapq,
            next_ref_id: header.next_ref_id,
            next_pos: header.next_pos,
            tlen: header.tlen,
            seq: seq.to_vec(),
            qual: qual.to_vec(),
        })
    }
}

/// A convenience builder struct for creating an [`Alignment`]
///
/// Placement fields default to unmapped (`-1`).
pub struct AlignmentBuilder {
    name: Option<Vec<u8>>,
    flag: u16,
    ref_id: i32,
    pos: i32,
    mapq: u8,
    next_ref_id: i32,
    next_pos: i32,
    tlen: i32,
    seq: Vec<u8>,
    qual: Vec<u8>,
}

impl Default for AlignmentBuilder {
    fn default() -> Self {
        Self {
            name: None,
            flag: 0,
            ref_id: -1,
            pos: -1,
            mapq: 0,
            next_ref_id: -1,
            next_pos: -1,
            tlen: 0,
            seq: Vec::new(),
            qual: Vec::new(),
        }
    }
}

impl AlignmentBuilder {
    /// Sets the read name (required)
    #[must_use]
    pub fn name(mut self, name: impl AsRef<[u8]>) -> Self {
        self.name = Some(name.as_ref().to_vec());
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: u16) -> Self {
        self.flag = flag;
        self
    }

    #[must_use]
    pub fn reference_id(mut self, ref_id: i32) -> Self {
        self.ref_id = ref_id;
        self
    }

    #[must_use]
    pub fn pos(mut self, pos: i32) -> Self {
        self.pos = pos;
        self
    }

    #[must_use]
    pub fn mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    /// Sets the reference id and position of the mate
    #[must_use]
    pub fn mate(mut self, next_ref_id: i32, next_pos: i32) -> Self {
        self.next_ref_id = next_ref_id;
        self.next_pos = next_pos;
        self
    }

    #[must_use]
    pub fn tlen(mut self, tlen: i32) -> Self {
        self.tlen = tlen;
        self
    }

    #[must_use]
    pub fn seq(mut self, seq: &[u8]) -> Self {
        self.seq = seq.to_vec();
        self
    }

    #[must_use]
    pub fn qual(mut self, qual: &[u8]) -> Self {
        self.qual = qual.to_vec();
        self
    }

    /// Builds the `Alignment`
    ///
    /// # Errors
    ///
    /// Returns an error if the read name is not set.
    pub fn build(self) -> Result<Alignment> {
        let Some(name) = self.name else {
            return Err(CodecError::MissingName.into());
        };
        Ok(Alignment {
            name,
            flag: self.flag,
            ref_id: self.ref_id,
            pos: self.pos,
            mapq: self.mapq,
            next_ref_id: self.next_ref_id,
            next_pos: self.next_pos,
            tlen: self.tlen,
            seq: self.seq,
            qual: self.qual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ReadRole, FLAG_PAIRED, FLAG_READ2};
    use crate::Error;

    fn full_record() -> Alignment {
        Alignment::builder()
            .name("SRR000001.17")
            .flag(FLAG_PAIRED | FLAG_READ2)
            .reference_id(3)
            .pos(99_812)
            .mapq(60)
            .mate(3, 99_650)
            .tlen(-312)
            .seq(b"ACGTNACGTT")
            .qual(b"IIIIIFFFFF")
            .build()
            .unwrap()
    }

    #[test]
    fn test_header_has_no_padding() {
        assert_eq!(size_of::<AlignmentHeader>(), 36);
    }

    #[test]
    fn test_builder_requires_name() {
        let result = Alignment::builder().flag(FLAG_PAIRED).build();
        assert!(matches!(
            result,
            Err(Error::CodecError(CodecError::MissingName))
        ));
    }

    #[test]
    fn test_builder_defaults_to_unmapped() {
        let record = Alignment::builder().name("r").build().unwrap();
        assert_eq!(record.reference_id(), -1);
        assert_eq!(record.pos(), -1);
        assert_eq!(record.next_reference_id(), -1);
        assert!(record.seq().is_empty());
    }

    #[test]
    fn test_builder_sets_placement() {
        let record = full_record();
        assert_eq!(record.read_role(), ReadRole::Read2);
        assert_eq!(record.mapq(), 60);
        assert_eq!((record.next_reference_id(), record.next_pos()), (3, 99_650));
        assert_eq!(record.tlen(), -312);
        assert_eq!(record.qual(), b"IIIIIFFFFF");
    }

    #[test]
    fn test_codec_round_trip() {
        let record = full_record();
        let mut buf = Vec::new();
        record.encode(&mut buf);
        assert_eq!(buf.len(), record.encoded_size());

        let decoded = Alignment::decode(&buf).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_codec_decode_from_unaligned_offset() {
        let record = full_record();
        let mut buf = vec![0u8];
        record.encode(&mut buf);
        let decoded = Alignment::decode(&buf[1..]).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_codec_rejects_short_input() {
        let result = Alignment::decode(&[0u8; 10]);
        assert!(matches!(
            result,
            Err(Error::CodecError(CodecError::RecordTooShort {
                expected: 36,
                got: 10
            }))
        ));
    }

    #[test]
    fn test_codec_rejects_truncated_body() {
        let record = full_record();
        let mut buf = Vec::new();
        record.encode(&mut buf);
        buf.truncate(buf.len() - 3);

        let err = Alignment::decode(&buf).unwrap_err();
        assert!(err.is_corruption());
        assert!(matches!(
            err,
            Error::CodecError(CodecError::LengthMismatch { .. })
        ));
    }
}
