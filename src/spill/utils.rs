use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use zstd::zstd_safe;

use crate::{
    error::{ReplayError, SpillError},
    Result,
};

/// Compresses `src` into `dst` as a single zstd frame
///
/// `dst` is cleared first; on return it holds exactly the compressed bytes.
pub(crate) fn sized_compress(
    dst: &mut Vec<u8>,
    src: &[u8],
    level: i32,
    cctx: &mut zstd_safe::CCtx,
) -> Result<()> {
    // zstd writes into the spare capacity and sets the length itself
    dst.clear();
    dst.reserve(zstd_safe::compress_bound(src.len()));

    cctx.compress(dst, src, level)
        .map_err(|e| SpillError::Compression(zstd_safe::get_error_name(e).to_string()))?;
    Ok(())
}

/// Appends one length-prefixed record frame to `dst`
pub(crate) fn write_frame(dst: &mut Vec<u8>, payload: &[u8]) -> Result<()> {
    dst.write_u32::<LittleEndian>(payload.len() as u32)?;
    dst.extend_from_slice(payload);
    Ok(())
}

/// Reads one length-prefixed record frame into `dst`
///
/// Returns `Ok(false)` if the stream ended cleanly before the length prefix.
/// A frame shorter than its prefix is reported as a truncated record of
/// spill block `block`.
pub(crate) fn read_frame<R: Read>(reader: &mut R, dst: &mut Vec<u8>, block: usize) -> Result<bool> {
    let expected = match reader.read_u32::<LittleEndian>() {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    dst.clear();
    let got = reader.by_ref().take(expected as u64).read_to_end(dst)?;
    if got != expected {
        return Err(ReplayError::TruncatedRecord {
            block,
            expected,
            got,
        }
        .into());
    }
    Ok(true)
}
