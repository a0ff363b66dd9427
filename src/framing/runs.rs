//! Linear bit-pattern reports. These walk the raw stream with no frame model.

use std::io::{Read, Write};

use crate::{BitReader, Result};

/// Report the distance between consecutive set bits, one distance per line.
///
/// Adjacent set bits report 1; the first set bit reports its absolute 0-based
/// position. Returns the number of set bits seen.
///
/// # Errors
/// Any I/O failure.
pub fn one_distances<R, W>(reader: R, mut writer: W, invert: bool) -> Result<u64>
where
    R: Read,
    W: Write,
{
    let mut bits = BitReader::new(reader).inverted(invert);
    let mut count = 0u64;
    let mut index = 0u64;
    let mut last: Option<u64> = None;
    while let Some(bit) = bits.next_bit()? {
        if bit == 1 {
            let distance = match last {
                Some(prev) => index - prev,
                None => index,
            };
            writeln!(writer, "{distance}")?;
            last = Some(index);
            count += 1;
        }
        index += 1;
    }
    Ok(count)
}

/// Report maximal runs of equal bits as `value,length` lines, in stream order.
///
/// The run still open at end of stream is flushed with its own length. Returns the
/// number of runs.
///
/// # Errors
/// Any I/O failure.
pub fn run_lengths<R, W>(reader: R, mut writer: W, invert: bool) -> Result<u64>
where
    R: Read,
    W: Write,
{
    let mut bits = BitReader::new(reader).inverted(invert);
    let mut runs = 0u64;
    let mut current: Option<(u8, u64)> = None;
    while let Some(bit) = bits.next_bit()? {
        current = match current {
            Some((value, length)) if value == bit => Some((value, length + 1)),
            Some((value, length)) => {
                writeln!(writer, "{value},{length}")?;
                runs += 1;
                Some((bit, 1))
            }
            None => Some((bit, 1)),
        };
    }
    if let Some((value, length)) = current {
        writeln!(writer, "{value},{length}")?;
        runs += 1;
    }
    Ok(runs)
}
