use std::io;

use serde::{Deserialize, Serialize};

/// Order in which bits are assembled into multi-bit output values.
///
/// This does not affect how bits are fetched from the stream; fetching is always
/// most-significant-bit first within each byte.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    #[default]
    Msb,
    Lsb,
}

/// BitReader provides single-bit reads over any byte source.
///
/// Bits are delivered most-significant first within each byte, which is the wire bit
/// order. Bytes are loaded lazily, exactly when the intra-byte offset wraps to 0, so a
/// partially consumed final byte is still delivered bit-by-bit. When `invert` is set
/// every returned bit is flipped before the caller sees it.
pub struct BitReader<R>
where
    R: io::Read,
{
    reader: R,
    buf: [u8; 1],
    current: u8,
    index: u64,
    invert: bool,
    eof: bool,
}

impl<R> BitReader<R>
where
    R: io::Read,
{
    pub fn new(reader: R) -> Self {
        BitReader {
            reader,
            buf: [0u8; 1],
            current: 0,
            index: 0,
            invert: false,
            eof: false,
        }
    }

    #[must_use]
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Absolute bit position, i.e., the number of bits delivered so far.
    pub fn position(&self) -> u64 {
        self.index
    }

    /// Read the next bit, or `None` once the source is exhausted after a fully
    /// consumed final byte.
    ///
    /// # Errors
    /// Any underlying read error. End-of-stream is not an error.
    pub fn next_bit(&mut self) -> io::Result<Option<u8>> {
        if self.eof {
            return Ok(None);
        }
        let offset = (self.index % 8) as u8;
        if offset == 0 {
            let n = self.reader.read(&mut self.buf)?;
            if n == 0 {
                self.eof = true;
                return Ok(None);
            }
            self.current = self.buf[0];
        }
        let bit = (self.current >> (7 - offset)) & 1;
        self.index += 1;
        Ok(Some(if self.invert { bit ^ 1 } else { bit }))
    }

    /// Consume up to `count` bits, returning how many were actually available.
    ///
    /// # Errors
    /// Any underlying read error.
    pub fn skip_bits(&mut self, count: u64) -> io::Result<u64> {
        let mut skipped = 0;
        while skipped < count {
            if self.next_bit()?.is_none() {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }
}

impl<R> Iterator for BitReader<R>
where
    R: io::Read,
{
    type Item = io::Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_bit().transpose()
    }
}
