//! Decompression of deflate payloads found in class-path archives.
//!
//! Zip entries written with a trailing data descriptor do not record their compressed
//! size in the local header, so the inflater reports how much input it consumed and the
//! caller continues from there.

use flate2::{Decompress, FlushDecompress, Status};

use crate::Result;

/// Inflates a raw deflate stream (no zlib header) that starts at `data[0]`.
///
/// Returns the decompressed bytes and the number of input bytes the stream occupied.
/// Input after the end of the stream is ignored.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for corrupt or truncated streams.
pub fn inflate_raw(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut inflater = Decompress::new(false);
    let mut output = Vec::with_capacity(data.len().saturating_mul(4).max(64));

    loop {
        if output.len() == output.capacity() {
            output.reserve(output.capacity().max(64));
        }
        let consumed = inflater.total_in();
        let produced = inflater.total_out();
        let offset = usize::try_from(consumed)
            .map_err(|_| malformed_error!("Deflate stream too large"))?;
        let input = data.get(offset..).unwrap_or_default();

        let status = inflater
            .decompress_vec(input, &mut output, FlushDecompress::None)
            .map_err(|error| malformed_error!("Invalid deflate stream - {}", error))?;

        match status {
            Status::StreamEnd => {
                let length = usize::try_from(inflater.total_in())
                    .map_err(|_| malformed_error!("Deflate stream too large"))?;
                return Ok((output, length));
            }
            Status::Ok | Status::BufError => {
                // no progress with room left in the output means the input ran out
                let stalled = inflater.total_in() == consumed && inflater.total_out() == produced;
                if stalled && output.len() < output.capacity() {
                    return Err(malformed_error!("Truncated deflate stream"));
                }
            }
        }
    }
}

/// Inflates a raw deflate stream, discarding the consumed length.
///
/// # Errors
/// See [`inflate_raw`].
pub fn decompress_deflate(data: &[u8]) -> Result<Vec<u8>> {
    Ok(inflate_raw(data)?.0)
}
