use std::io::{Read, Write};
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{FrameLayout, Section};
use crate::{BitOrder, Error, Result};

/// Format identifier carried in every image preamble.
pub const PIXEL_FORMAT_ID: u16 = 0xAAAA;

/// Tag recording the byte order of the preamble fields and pixel payload. Always
/// little-endian ("II").
const ENDIAN_TAG: u16 = 0x4949;

const PREAMBLE_VERSION: u16 = 1;

/// Fixed 32-byte header written ahead of the pixel payload.
///
/// All fields are little-endian, as declared by `endian_tag`. The payload that follows
/// is raw pixel bytes, row-major within a frame, frames in stream order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreamble {
    pub endian_tag: u16,
    pub format_id: u16,
    pub header_size: u16,
    pub frame_count: u16,
    /// Bytes per pixel: 1, 2, or 4.
    pub pixel_width: u16,
    /// Pixels per row.
    pub row_width: u32,
    /// Rows per frame.
    pub row_count: u32,
    pub version: u16,
}

impl ImagePreamble {
    /// Encoded size in bytes, including the reserved tail.
    pub const LEN: usize = 32;

    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..2].copy_from_slice(&self.endian_tag.to_le_bytes());
        buf[2..4].copy_from_slice(&self.format_id.to_le_bytes());
        buf[4..6].copy_from_slice(&self.header_size.to_le_bytes());
        buf[6..8].copy_from_slice(&self.frame_count.to_le_bytes());
        buf[8..10].copy_from_slice(&self.pixel_width.to_le_bytes());
        buf[10..14].copy_from_slice(&self.row_width.to_le_bytes());
        buf[14..18].copy_from_slice(&self.row_count.to_le_bytes());
        buf[18..20].copy_from_slice(&self.version.to_le_bytes());
        // bytes 20..32 are reserved and zero
        buf
    }

    /// Construct from the provided bytes, or `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        Some(ImagePreamble {
            endian_tag: u16::from_le_bytes([dat[0], dat[1]]),
            format_id: u16::from_le_bytes([dat[2], dat[3]]),
            header_size: u16::from_le_bytes([dat[4], dat[5]]),
            frame_count: u16::from_le_bytes([dat[6], dat[7]]),
            pixel_width: u16::from_le_bytes([dat[8], dat[9]]),
            row_width: u32::from_le_bytes([dat[10], dat[11], dat[12], dat[13]]),
            row_count: u32::from_le_bytes([dat[14], dat[15], dat[16], dat[17]]),
            version: u16::from_le_bytes([dat[18], dat[19]]),
        })
    }
}

/// Pixel projection parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct ImageConfig {
    /// Pixels per output row.
    pub row_width: u32,
    /// Bits packed into each pixel, 1 through 32.
    pub bit_depth: u32,
    /// How bits are assembled into a pixel value.
    #[builder(default)]
    pub bit_order: BitOrder,
    #[builder(default)]
    pub invert: bool,
    /// With a bit depth of 1, map set bits to the maximum pixel value instead of 1.
    #[builder(default)]
    pub scale: bool,
}

impl ImageConfig {
    fn validate(&self) -> Result<()> {
        if !(1..=32).contains(&self.bit_depth) {
            return Err(Error::InvalidParameter(format!(
                "bit depth must be 1 through 32, got {}",
                self.bit_depth
            )));
        }
        if self.scale && self.bit_depth != 1 {
            return Err(Error::InvalidParameter(
                "scaling requires a bit depth of 1".into(),
            ));
        }
        if self.row_width == 0 {
            return Err(Error::InvalidParameter("row width must be positive".into()));
        }
        Ok(())
    }

    /// Bytes per output pixel for this bit depth.
    #[must_use]
    pub fn pixel_width(&self) -> u16 {
        match self.bit_depth {
            1..=8 => 1,
            9..=16 => 2,
            _ => 4,
        }
    }
}

fn write_pixel<W>(writer: &mut W, value: u32, pixel_width: u16) -> std::io::Result<()>
where
    W: Write,
{
    match pixel_width {
        // narrow pixels clip rather than wrap
        1 => writer.write_all(&[value.min(255) as u8]),
        2 => writer.write_all(&(value.min(65_535) as u16).to_le_bytes()),
        _ => writer.write_all(&value.to_le_bytes()),
    }
}

/// Project a framed stream's block bodies into packed image pixels.
///
/// Each pixel takes `bit_depth` consecutive body bits, assembled per `bit_order`;
/// prologue and header bits are consumed and discarded. Each block becomes one frame
/// of `row_count = block_body_bits / (row_width * bit_depth)` rows; body bits beyond
/// the last whole row are consumed and discarded. The 32-byte [ImagePreamble] is
/// written before the payload and also returned for inspection.
///
/// A stream that ends early yields a short payload; that is not an error.
///
/// # Errors
/// [Error::InvalidParameter] for a bad layout or parameter combination, or any I/O
/// failure.
pub fn encode_image<R, W>(
    reader: R,
    mut writer: W,
    layout: &FrameLayout,
    config: &ImageConfig,
) -> Result<ImagePreamble>
where
    R: Read,
    W: Write,
{
    layout.validate()?;
    config.validate()?;

    let depth = u64::from(config.bit_depth);
    let row_bits = u64::from(config.row_width) * depth;
    let row_count = u32::try_from(layout.block_body_bits / row_bits)
        .map_err(|_| Error::InvalidParameter("row count overflows the preamble".into()))?;
    let frame_count = u16::try_from(layout.block_count)
        .map_err(|_| Error::InvalidParameter("frame count overflows the preamble".into()))?;

    let preamble = ImagePreamble {
        endian_tag: ENDIAN_TAG,
        format_id: PIXEL_FORMAT_ID,
        header_size: ImagePreamble::LEN as u16,
        frame_count,
        pixel_width: config.pixel_width(),
        row_width: config.row_width,
        row_count,
        version: PREAMBLE_VERSION,
    };
    writer.write_all(&preamble.encode())?;

    let encodable_bits = u64::from(row_count) * row_bits;
    let mut acc = 0u32;
    let mut filled = 0u64;
    for zult in layout.classify(reader, config.invert) {
        let cb = zult?;
        if cb.section != Section::BlockBody || cb.offset >= encodable_bits {
            continue;
        }
        match config.bit_order {
            BitOrder::Msb => acc = (acc << 1) | u32::from(cb.bit),
            BitOrder::Lsb => acc |= u32::from(cb.bit) << filled,
        }
        filled += 1;
        if filled == depth {
            let value = if config.scale && acc == 1 { u32::MAX } else { acc };
            write_pixel(&mut writer, value, preamble.pixel_width)?;
            acc = 0;
            filled = 0;
        }
    }
    // a pixel cut short by EOF is dropped

    Ok(preamble)
}

/// Repeat the image projection once per row width in `widths`, producing one output
/// per width.
///
/// A traversal consumes its stream end-to-end, so the caller supplies a fresh reader
/// and writer per width. Preambles are returned in width order.
///
/// # Errors
/// The first failure from opening a stream or from [encode_image] ends the sweep.
pub fn encode_image_sweep<R, W, FR, FW>(
    widths: RangeInclusive<u32>,
    layout: &FrameLayout,
    config: &ImageConfig,
    mut open_input: FR,
    mut open_output: FW,
) -> Result<Vec<ImagePreamble>>
where
    R: Read,
    W: Write,
    FR: FnMut(u32) -> std::io::Result<R>,
    FW: FnMut(u32) -> std::io::Result<W>,
{
    let mut preambles = Vec::new();
    for width in widths {
        let cfg = ImageConfig {
            row_width: width,
            ..*config
        };
        let reader = open_input(width)?;
        let writer = open_output(width)?;
        preambles.push(encode_image(reader, writer, layout, &cfg)?);
    }
    Ok(preambles)
}
