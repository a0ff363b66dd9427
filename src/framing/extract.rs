use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::{BitReader, Result};

/// What a bit-range copy actually did.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub copied: u64,
    /// The stream ended before the requested range was satisfied. A warning, not an
    /// error; whatever was available has been written.
    pub truncated: bool,
}

/// Skip `skip_bits`, then copy `copy_bits` bits to `writer` as comma-separated
/// `0`/`1` tokens, with a line break every `row_width` bits (`0` disables wrapping).
///
/// # Errors
/// Any I/O failure. Running out of stream is reported via
/// [ExtractOutcome::truncated], not as an error.
pub fn extract_bits<R, W>(
    reader: R,
    mut writer: W,
    skip_bits: u64,
    copy_bits: u64,
    row_width: u32,
    invert: bool,
) -> Result<ExtractOutcome>
where
    R: Read,
    W: Write,
{
    let mut bits = BitReader::new(reader).inverted(invert);

    if bits.skip_bits(skip_bits)? < skip_bits {
        return Ok(ExtractOutcome {
            copied: 0,
            truncated: true,
        });
    }

    let mut copied = 0u64;
    let mut line_open = false;
    while copied < copy_bits {
        let Some(bit) = bits.next_bit()? else {
            return Ok(ExtractOutcome {
                copied,
                truncated: true,
            });
        };
        if line_open {
            writer.write_all(b",")?;
        }
        writer.write_all(if bit == 0 { b"0" } else { b"1" })?;
        copied += 1;
        line_open = true;
        if row_width > 0 && copied % u64::from(row_width) == 0 {
            writer.write_all(b"\n")?;
            line_open = false;
        }
    }
    Ok(ExtractOutcome {
        copied,
        truncated: false,
    })
}
