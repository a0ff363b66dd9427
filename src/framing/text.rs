use std::io::{Read, Write};

use super::{FrameLayout, Section};
use crate::{Error, Result};

/// Dump a framed stream as comma-separated `0`/`1` tokens.
///
/// A line break follows the last bit of a non-empty prologue and of each non-empty
/// block header. Within a block body a line break follows every `row_width` bits
/// (`row_width == 0` disables row wrapping) and the body's final bit when it does not
/// already complete a row; every body but the last block's is followed by one more
/// line break, leaving a blank line between blocks. The footer is a single unbroken
/// comma list with no trailing newline.
///
/// # Errors
/// [Error::InvalidParameter] for a degenerate layout, or any I/O failure.
pub fn dump_text<R, W>(
    reader: R,
    mut writer: W,
    layout: &FrameLayout,
    row_width: u32,
    invert: bool,
) -> Result<()>
where
    R: Read,
    W: Write,
{
    layout.validate()?;

    let mut line_open = false;
    for zult in layout.classify(reader, invert) {
        let cb = zult?;
        if line_open {
            writer.write_all(b",")?;
        }
        writer.write_all(if cb.bit == 0 { b"0" } else { b"1" })?;
        line_open = true;

        let mut breaks = 0;
        match cb.section {
            Section::Prologue if cb.offset + 1 == layout.prologue_bits => breaks = 1,
            Section::BlockHeader if cb.offset + 1 == layout.block_header_bits => breaks = 1,
            Section::BlockBody => {
                let ends_row =
                    row_width > 0 && (cb.offset + 1) % u64::from(row_width) == 0;
                let ends_body = cb.offset + 1 == layout.block_body_bits;
                if ends_row || ends_body {
                    breaks = 1;
                }
                if ends_body && cb.block + 1 < layout.block_count {
                    breaks += 1;
                }
            }
            _ => {}
        }
        for _ in 0..breaks {
            writer.write_all(b"\n")?;
        }
        if breaks > 0 {
            line_open = false;
        }
    }
    Ok(())
}

/// Pack a list of integer tokens back into bytes, the inverse of [dump_text]'s token
/// alphabet.
///
/// Tokens are delimited by whitespace or commas. `0` packs as bit 0 and any positive
/// value as bit 1, most-significant first, 8 bits per output byte; an incomplete final
/// byte is zero-padded. Returns the number of bits packed, excluding padding.
///
/// # Errors
/// [Error::InvalidToken] for a negative or non-numeric token, or any I/O failure.
pub fn pack_text<R, W>(reader: R, mut writer: W) -> Result<u64>
where
    R: Read,
    W: Write,
{
    let mut token = String::new();
    let mut acc = 0u8;
    let mut filled = 0u8;
    let mut total = 0u64;

    let mut push = |token: &mut String, acc: &mut u8, filled: &mut u8, writer: &mut W| {
        if token.is_empty() {
            return Ok(());
        }
        let value: i64 = token
            .parse()
            .map_err(|_| Error::InvalidToken(token.clone()))?;
        if value < 0 {
            return Err(Error::InvalidToken(token.clone()));
        }
        token.clear();

        *acc = (*acc << 1) | u8::from(value > 0);
        *filled += 1;
        total += 1;
        if *filled == 8 {
            writer.write_all(&[*acc])?;
            *acc = 0;
            *filled = 0;
        }
        Ok(())
    };

    for byte in reader.bytes() {
        let b = byte?;
        if b.is_ascii_whitespace() || b == b',' {
            push(&mut token, &mut acc, &mut filled, &mut writer)?;
        } else {
            token.push(char::from(b));
        }
    }
    push(&mut token, &mut acc, &mut filled, &mut writer)?;

    if filled > 0 {
        writer.write_all(&[acc << (8 - filled)])?;
    }
    Ok(total)
}
