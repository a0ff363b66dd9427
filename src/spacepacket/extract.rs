use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use super::{fill, Apid, PrimaryHeader, SEQ_UNSEGMENTED};
use crate::{Error, Result};

/// APID reserved for idle (channel fill) packets.
pub const APID_IDLE: Apid = 0x7ff;
/// APID reserved for spacecraft time packets.
pub const APID_TIME: Apid = 0x000;

/// Parameters for one packet-extraction walk.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct ExtractConfig {
    /// Packets with this APID are written to the match output.
    pub target_apid: Apid,
    /// Leading bytes to discard before the first packet.
    #[builder(default)]
    pub skip_bytes: u64,
    /// Bytes of secondary header to omit from the matched data-field dump.
    #[builder(default)]
    pub secondary_header_size: usize,
    /// Apply the strict validation rules in addition to the version check.
    #[builder(default)]
    pub strict: bool,
}

/// Aggregate counts for one walk, reported on every termination.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PacketCounts {
    pub total: usize,
    pub idle: usize,
    pub telemetry: usize,
    pub command: usize,
    pub matched: usize,
    /// Every stream byte consumed, including the leading skip.
    pub bytes: usize,
}

/// Walk a stream of space packets, extracting those whose APID matches.
///
/// Every packet's primary header is decoded and validated: version 0 is always
/// required, and with [`ExtractConfig::strict`] a telemetry packet must carry a
/// secondary header (idle and time APIDs excepted) and every packet must be
/// unsegmented. Idle packets are skipped without decoding. A matching packet gets a
/// decoded header line followed by its data field from
/// [`ExtractConfig::secondary_header_size`] onward as space-separated hex pairs.
///
/// `summary`, when provided, receives one header line per non-idle packet, matches
/// flagged with a trailing `*`, and the aggregate counts on every termination,
/// normal or not.
///
/// # Errors
/// [Error::BadFileType] when the stream cannot provide the leading skip or a first
/// header; [Error::InvalidPacket] on a validation reject; [Error::NotEnoughData]
/// when a declared data field cannot be read or skipped; any I/O failure.
pub fn extract_packets<R, W, S>(
    mut reader: R,
    mut matches: W,
    mut summary: Option<&mut S>,
    config: &ExtractConfig,
) -> Result<PacketCounts>
where
    R: Read,
    W: Write,
    S: Write,
{
    let mut counts = PacketCounts::default();
    let walked = walk(
        &mut reader,
        &mut matches,
        summary.as_deref_mut(),
        config,
        &mut counts,
    );
    // counts go to the summary sink even when the walk failed
    let totals = match summary {
        Some(s) => write_totals(s, &counts),
        None => Ok(()),
    };
    walked?;
    totals?;
    Ok(counts)
}

fn walk<R, W, S>(
    reader: &mut R,
    matches: &mut W,
    mut summary: Option<&mut S>,
    config: &ExtractConfig,
    counts: &mut PacketCounts,
) -> Result<()>
where
    R: Read,
    W: Write,
    S: Write,
{
    let skipped = skip(reader, config.skip_bytes as usize)?;
    counts.bytes += skipped;
    if skipped < config.skip_bytes as usize {
        return Err(Error::BadFileType);
    }

    let mut index = 0usize;
    loop {
        let mut hbuf = [0u8; PrimaryHeader::LEN];
        let got = fill(reader, &mut hbuf)?;
        counts.bytes += got;
        if got < PrimaryHeader::LEN {
            if index == 0 {
                return Err(Error::BadFileType);
            }
            debug!(packets = index, bytes = counts.bytes, "packet stream ended");
            return Ok(());
        }
        // 6 bytes are present, decode cannot fail
        let header = PrimaryHeader::decode(&hbuf).unwrap();
        let data_len = header.data_len();
        counts.total += 1;

        validate(index, &header, config.strict)?;

        if header.apid == APID_IDLE {
            trace!(index, len = data_len, "skipping idle packet");
            counts.idle += 1;
            skip_data(reader, data_len)?;
            counts.bytes += data_len;
            index += 1;
            continue;
        }

        if header.type_flag == 0 {
            counts.telemetry += 1;
        } else {
            counts.command += 1;
        }

        let matched = header.apid == config.target_apid;
        if matched {
            counts.matched += 1;
            let data = read_data(reader, data_len)?;
            write_header_line(matches, index, &header)?;
            writeln!(matches)?;
            let dump_from = config.secondary_header_size.min(data.len());
            write_hex_line(matches, &data[dump_from..])?;
        } else {
            skip_data(reader, data_len)?;
        }
        counts.bytes += data_len;

        if let Some(s) = summary.as_deref_mut() {
            write_header_line(s, index, &header)?;
            if matched {
                write!(s, " *")?;
            }
            writeln!(s)?;
        }
        index += 1;
    }
}

fn validate(index: usize, header: &PrimaryHeader, strict: bool) -> Result<()> {
    if header.version != 0 {
        return Err(Error::InvalidPacket {
            index,
            reason: format!("unsupported version {}", header.version),
        });
    }
    if !strict {
        return Ok(());
    }
    if header.type_flag == 0
        && !header.has_secondary_header
        && header.apid != APID_IDLE
        && header.apid != APID_TIME
    {
        return Err(Error::InvalidPacket {
            index,
            reason: "telemetry packet without a secondary header".into(),
        });
    }
    if header.sequence_flags != SEQ_UNSEGMENTED {
        return Err(Error::InvalidPacket {
            index,
            reason: format!("segmented packet (sequence flags {})", header.sequence_flags),
        });
    }
    Ok(())
}

fn write_header_line<W>(writer: &mut W, index: usize, header: &PrimaryHeader) -> Result<()>
where
    W: Write,
{
    write!(
        writer,
        "{index:6} {version:1} {type_flag:1} {sec:1} 0x{apid:03x} {seq_flags:1} {seq_id:5} {len:6}",
        version = header.version,
        type_flag = header.type_flag,
        sec = u8::from(header.has_secondary_header),
        apid = header.apid,
        seq_flags = header.sequence_flags,
        seq_id = header.sequence_id,
        len = header.data_len(),
    )?;
    Ok(())
}

fn write_hex_line<W>(writer: &mut W, dat: &[u8]) -> Result<()>
where
    W: Write,
{
    for (i, b) in dat.iter().enumerate() {
        if i > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "{b:02x}")?;
    }
    writeln!(writer)?;
    Ok(())
}

fn write_totals<S>(writer: &mut S, counts: &PacketCounts) -> Result<()>
where
    S: Write,
{
    writeln!(writer, "packets: {}", counts.total)?;
    writeln!(writer, "idle packets: {}", counts.idle)?;
    writeln!(writer, "telemetry packets: {}", counts.telemetry)?;
    writeln!(writer, "command packets: {}", counts.command)?;
    writeln!(writer, "apid matches: {}", counts.matched)?;
    writeln!(writer, "bytes: {}", counts.bytes)?;
    Ok(())
}

fn skip<R>(reader: &mut R, len: usize) -> Result<usize>
where
    R: Read,
{
    let mut buf = [0u8; 8192];
    let mut skipped = 0usize;
    while skipped < len {
        let want = (len - skipped).min(buf.len());
        let n = reader.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        skipped += n;
    }
    Ok(skipped)
}

fn skip_data<R>(reader: &mut R, len: usize) -> Result<()>
where
    R: Read,
{
    let skipped = skip(reader, len)?;
    if skipped < len {
        return Err(Error::NotEnoughData {
            actual: skipped,
            minimum: len,
        });
    }
    Ok(())
}

fn read_data<R>(reader: &mut R, len: usize) -> Result<Vec<u8>>
where
    R: Read,
{
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| Error::Memory(len))?;
    data.resize(len, 0);
    let got = fill(reader, &mut data)?;
    if got < len {
        return Err(Error::NotEnoughData {
            actual: got,
            minimum: len,
        });
    }
    Ok(data)
}
