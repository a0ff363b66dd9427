//! Bitstream framing.
//!
//! A framed stream is a prologue, `block_count` repeated blocks (optional fixed-size
//! header plus fixed-size body), and a footer of whatever bits remain. [FrameLayout]
//! declares the section sizes and [FrameLayout::classify] walks a byte stream bit by
//! bit, tagging every bit with the section it belongs to. The projections in this
//! module turn that classification into text, statistics, or image pixels.

mod extract;
mod image;
mod runs;
mod stats;
mod text;

pub use extract::{extract_bits, ExtractOutcome};
pub use image::{encode_image, encode_image_sweep, ImageConfig, ImagePreamble, PIXEL_FORMAT_ID};
pub use runs::{one_distances, run_lengths};
pub use stats::{bit_stats, SectionStats, StreamStats};
pub use text::{dump_text, pack_text};

use std::io::Read;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{BitReader, Error, Result};

/// The section of a framed stream a bit belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Prologue,
    BlockHeader,
    BlockBody,
    Footer,
}

/// Declared sizes of a framed stream's sections.
///
/// The footer has no declared size; it is whatever remains after the last block, and
/// its length is only known once a traversal completes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct FrameLayout {
    #[builder(default)]
    pub prologue_bits: u64,
    #[builder(default)]
    pub block_header_bits: u64,
    pub block_body_bits: u64,
    #[builder(default = 1)]
    pub block_count: u32,
}

impl FrameLayout {
    /// Check the size bounds: a body of at least one bit and at least one block.
    ///
    /// # Errors
    /// [Error::InvalidParameter] when a bound is violated.
    pub fn validate(&self) -> Result<()> {
        if self.block_body_bits == 0 {
            return Err(Error::InvalidParameter(
                "block_body_bits must be at least 1".into(),
            ));
        }
        if self.block_count == 0 {
            return Err(Error::InvalidParameter(
                "block_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Total declared bits, i.e., everything but the footer.
    pub fn declared_bits(&self) -> u64 {
        self.prologue_bits
            + u64::from(self.block_count) * (self.block_header_bits + self.block_body_bits)
    }

    /// Walk `reader` bit by bit, classifying every bit by section.
    ///
    /// The traversal is lazy and finite; it ends when the stream does, even if that is
    /// before the declared sections are satisfied. Re-traversal requires a fresh reader.
    pub fn classify<R>(&self, reader: R, invert: bool) -> ClassifyIter<R>
    where
        R: Read,
    {
        ClassifyIter {
            bits: BitReader::new(reader).inverted(invert),
            layout: *self,
            section: Section::Prologue,
            offset: 0,
            block: 0,
        }
    }
}

/// One bit together with its position in the frame model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedBit {
    /// The bit value, already inverted if inversion was requested.
    pub bit: u8,
    pub section: Section,
    /// Bit offset within this section instance.
    pub offset: u64,
    /// Block index, 0-based. Saturates at the block count once the footer begins.
    pub block: u32,
}

/// Lazy classification of a bit stream against a [FrameLayout].
///
/// Created by [FrameLayout::classify].
pub struct ClassifyIter<R>
where
    R: Read,
{
    bits: BitReader<R>,
    layout: FrameLayout,
    section: Section,
    offset: u64,
    block: u32,
}

impl<R> ClassifyIter<R>
where
    R: Read,
{
    /// Bits consumed so far.
    pub fn position(&self) -> u64 {
        self.bits.position()
    }

    /// Advance past any exhausted (or zero-length) sections so the next bit is
    /// attributed to the section it actually belongs to. A block boundary happens on
    /// the bit immediately after the last body bit; no extra bit is consumed.
    fn settle(&mut self) {
        loop {
            match self.section {
                Section::Prologue if self.offset >= self.layout.prologue_bits => {
                    self.section = Section::BlockHeader;
                    self.offset = 0;
                }
                Section::BlockHeader if self.offset >= self.layout.block_header_bits => {
                    self.section = Section::BlockBody;
                    self.offset = 0;
                }
                Section::BlockBody if self.offset >= self.layout.block_body_bits => {
                    self.block += 1;
                    self.offset = 0;
                    self.section = if self.block >= self.layout.block_count {
                        Section::Footer
                    } else {
                        Section::BlockHeader
                    };
                }
                _ => return,
            }
        }
    }
}

impl<R> Iterator for ClassifyIter<R>
where
    R: Read,
{
    type Item = Result<ClassifiedBit>;

    fn next(&mut self) -> Option<Self::Item> {
        let bit = match self.bits.next_bit() {
            Ok(Some(bit)) => bit,
            Ok(None) => return None,
            Err(err) => return Some(Err(Error::Io(err))),
        };
        self.settle();
        let classified = ClassifiedBit {
            bit,
            section: self.section,
            offset: self.offset,
            block: self.block,
        };
        self.offset += 1;
        Some(Ok(classified))
    }
}
