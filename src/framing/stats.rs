use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::{FrameLayout, Section};
use crate::Result;

/// Set-bit accounting for one section instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStats {
    pub section: Section,
    /// Block index for header/body instances, otherwise 0.
    pub block: u32,
    /// Bits actually observed.
    pub length: u64,
    /// Bits declared by the layout. The footer declares nothing; its expected length
    /// is whatever was observed.
    pub expected: u64,
    pub ones: u64,
}

impl SectionStats {
    /// True when the stream ended before this section's declared length was satisfied.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.length < self.expected
    }

    #[must_use]
    pub fn percent_ones(&self) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            100.0 * self.ones as f64 / self.length as f64
        }
    }

    fn label(&self) -> String {
        match self.section {
            Section::Prologue => "prologue".to_string(),
            Section::BlockHeader => format!("block {} header", self.block),
            Section::BlockBody => format!("block {} body", self.block),
            Section::Footer => "footer".to_string(),
        }
    }
}

/// Per-section statistics for one traversal of a framed stream.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StreamStats {
    /// One entry per section instance that received at least one bit, in stream order.
    pub sections: Vec<SectionStats>,
    pub total_bits: u64,
}

impl StreamStats {
    /// Observed footer length. Only known after the traversal.
    #[must_use]
    pub fn footer_bits(&self) -> u64 {
        self.sections
            .iter()
            .filter(|s| s.section == Section::Footer)
            .map(|s| s.length)
            .sum()
    }

    /// Write the report, one `label: count, percentage` line per section instance.
    /// An instance the stream cut short reports `inconsistent size` instead of a
    /// percentage.
    ///
    /// # Errors
    /// Any I/O failure on `writer`.
    pub fn write_report<W>(&self, mut writer: W) -> std::io::Result<()>
    where
        W: Write,
    {
        for section in &self.sections {
            if section.truncated() {
                writeln!(writer, "{}: inconsistent size", section.label())?;
            } else {
                writeln!(
                    writer,
                    "{}: {}, {:.2}%",
                    section.label(),
                    section.ones,
                    section.percent_ones()
                )?;
            }
        }
        Ok(())
    }
}

/// Traverse `reader` against `layout` and accumulate set-bit counts per section
/// instance: the prologue, each block's header, each block's body, and the footer.
///
/// # Errors
/// [crate::Error::InvalidParameter] for a degenerate layout, or any I/O failure.
pub fn bit_stats<R>(reader: R, layout: &FrameLayout, invert: bool) -> Result<StreamStats>
where
    R: Read,
{
    layout.validate()?;

    let mut stats = StreamStats::default();
    let mut current: Option<SectionStats> = None;
    for zult in layout.classify(reader, invert) {
        let cb = zult?;
        stats.total_bits += 1;

        let same = current
            .as_ref()
            .is_some_and(|c| c.section == cb.section && c.block == cb.block);
        if !same {
            if let Some(done) = current.take() {
                stats.sections.push(done);
            }
            current = Some(SectionStats {
                section: cb.section,
                block: cb.block,
                length: 0,
                expected: match cb.section {
                    Section::Prologue => layout.prologue_bits,
                    Section::BlockHeader => layout.block_header_bits,
                    Section::BlockBody => layout.block_body_bits,
                    Section::Footer => 0,
                },
                ones: 0,
            });
        }
        // current was just set if it was empty or stale
        let c = current.as_mut().unwrap();
        c.length += 1;
        c.ones += u64::from(cb.bit);
    }
    if let Some(mut done) = current.take() {
        if done.section == Section::Footer {
            done.expected = done.length;
        }
        stats.sections.push(done);
    }
    Ok(stats)
}
