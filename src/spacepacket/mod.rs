//! CCSDS Space Packet decoding.
//!
//! References:
//! * CCSDS Space Packet Protocol 133.0-B-1
//!     - <https://public.ccsds.org/Pubs/133x0b1c2.pdf>

mod extract;
mod summary;

pub use extract::{extract_packets, ExtractConfig, PacketCounts, APID_IDLE, APID_TIME};
pub use summary::{ApidSummary, Summary};

use std::io::{ErrorKind, Read};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub type Apid = u16;

/// Packet is the first packet in a packet group
pub const SEQ_FIRST: u8 = 1;
/// Packet is a part of a packet group, but not first and not last
pub const SEQ_CONTINUATION: u8 = 0;
/// Packet is the last packet in a packet group
pub const SEQ_LAST: u8 = 2;
/// Packet is not part of a packet group, i.e., standalone.
pub const SEQ_UNSEGMENTED: u8 = 3;

/// CCSDS Primary Header
///
/// The primary header format is common to all CCSDS space packets.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrimaryHeader {
    pub version: u8,
    pub type_flag: u8,
    pub has_secondary_header: bool,
    pub apid: Apid,
    /// Defines a packet's grouping. See the `SEQ_*` values.
    pub sequence_flags: u8,
    pub sequence_id: u16,
    /// Stored data field length, which is the actual length minus 1.
    pub len_minus1: u16,
}

impl PrimaryHeader {
    /// Size of a ``PrimaryHeader``
    pub const LEN: usize = 6;
    pub const SEQ_MAX: u16 = 16383;

    /// Decode from bytes. Returns `None` if there are not enough bytes to construct
    /// the header.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let d1 = u16::from_be_bytes([buf[0], buf[1]]);
        let d2 = u16::from_be_bytes([buf[2], buf[3]]);
        let d3 = u16::from_be_bytes([buf[4], buf[5]]);

        Some(PrimaryHeader {
            version: (d1 >> 13 & 0x7) as u8,
            type_flag: (d1 >> 12 & 0x1) as u8,
            has_secondary_header: (d1 >> 11 & 0x1) == 1,
            apid: (d1 & 0x7ff),
            sequence_flags: (d2 >> 14 & 0x3) as u8,
            sequence_id: (d2 & 0x3fff),
            len_minus1: d3,
        })
    }

    /// Effective data field length in bytes.
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.len_minus1 as usize + 1
    }

    /// Read a header from `r`.
    ///
    /// # Errors
    /// Any ``std::io::Error`` reading, including an ``UnexpectedEof`` when fewer than
    /// [`Self::LEN`] bytes are available.
    #[allow(clippy::missing_panics_doc)]
    pub fn read<R>(mut r: R) -> Result<PrimaryHeader>
    where
        R: Read,
    {
        let mut buf = [0u8; Self::LEN];
        r.read_exact(&mut buf)?;

        // Can't panic because of read_exact
        Ok(Self::decode(&buf).unwrap())
    }
}

/// Packet represents a single CCSDS space packet and its associated data.
///
/// This packet contains the primary header data as well as the user data,
/// which may or may not contain a secondary header. See the header's
/// `has_secondary_header` flag.
///
/// # Example
/// Create a packet from the minimum number of bytes.
/// ```
/// use bitframe::spacepacket::Packet;
///
/// let dat: &[u8] = &[
///     // primary header bytes
///     0xd, 0x59, 0xd2, 0xab, 0x0, 07,
///     // Cds timecode bytes in secondary header (not decoded here)
///     0x52, 0xc0, 0x0, 0x0, 0x0, 0xa7, 0x0, 0xdb, 0xff,
///     // minimum 1 byte of user data
///     0xff
/// ];
/// let mut r = std::io::BufReader::new(dat);
/// let packet = Packet::read(&mut r).unwrap();
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Packet {
    /// All packets have a primary header
    pub header: PrimaryHeader,
    /// All packet bytes, including header and user data
    pub data: Vec<u8>,
}

impl Packet {
    #[must_use]
    pub fn is_standalone(&self) -> bool {
        self.header.sequence_flags == SEQ_UNSEGMENTED
    }

    /// Decode from bytes. Returns `None` if there are not enough bytes to construct
    /// the header or the packet of the length the header declares.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Packet> {
        let header = PrimaryHeader::decode(dat)?;
        if dat.len() < PrimaryHeader::LEN + header.data_len() {
            return None;
        }
        Some(Packet {
            header,
            data: dat.to_vec(),
        })
    }

    /// Read a single [Packet].
    ///
    /// The buffer is sized from the header-declared data length; a failed allocation
    /// is [Error::Memory], and a data field the stream cannot satisfy is
    /// [Error::NotEnoughData].
    ///
    /// # Errors
    /// An ``UnexpectedEof`` I/O error when the stream ends on the header boundary.
    #[allow(clippy::missing_panics_doc)]
    pub fn read<R>(mut r: R) -> Result<Packet>
    where
        R: Read,
    {
        let mut hbuf = [0u8; PrimaryHeader::LEN];
        r.read_exact(&mut hbuf)?;
        // we know there are enough bytes because we just read them
        let header = PrimaryHeader::decode(&hbuf).unwrap();

        let total_len = PrimaryHeader::LEN + header.data_len();
        let mut data = Vec::new();
        data.try_reserve_exact(total_len)
            .map_err(|_| Error::Memory(total_len))?;
        data.extend_from_slice(&hbuf);
        data.resize(total_len, 0);

        let got = fill(&mut r, &mut data[PrimaryHeader::LEN..])?;
        if got < header.data_len() {
            return Err(Error::NotEnoughData {
                actual: PrimaryHeader::LEN + got,
                minimum: total_len,
            });
        }
        Ok(Packet { header, data })
    }
}

/// Read until `buf` is full or the stream ends, returning how many bytes were read.
pub(crate) fn fill<R>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: Read,
{
    let mut n = 0;
    while n < buf.len() {
        let count = r.read(&mut buf[n..])?;
        if count == 0 {
            break;
        }
        n += count;
    }
    Ok(n)
}

/// Calculate the number of missing sequence ids.
///
/// `cur` is the current sequence id. `last` is the sequence id seen before `cur`.
#[must_use]
pub fn missing_packets(cur: u16, last: u16) -> u16 {
    let expected = if last + 1 > PrimaryHeader::SEQ_MAX {
        0
    } else {
        last + 1
    };
    if cur != expected {
        if last + 1 > cur {
            return cur + PrimaryHeader::SEQ_MAX - last;
        }
        return cur - last - 1;
    }
    0
}

struct PacketReaderIter<R>
where
    R: Read,
{
    reader: R,
}

impl<R> Iterator for PacketReaderIter<R>
where
    R: Read,
{
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        match Packet::read(&mut self.reader) {
            Ok(p) => Some(Ok(p)),
            // EOF on a header boundary is the normal end of a stream
            Err(Error::Io(err)) if err.kind() == ErrorKind::UnexpectedEof => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Return an iterator providing [Packet]s read from a byte-synchronized packet
/// stream.
///
/// # Examples
/// ```
/// use bitframe::spacepacket::decode_packets;
///
/// let dat: &[u8] = &[
///     // primary header bytes
///     0xd, 0x59, 0xd2, 0xab, 0x0, 07,
///     // CDS timecode bytes in secondary header
///     0x52, 0xc0, 0x0, 0x0, 0x0, 0xa7, 0x0, 0xdb, 0xff,
///     // minimum 1 byte of user data
///     0xff
/// ];
///
/// let r = std::io::BufReader::new(dat);
/// decode_packets(r).for_each(|zult| {
///     let packet = zult.unwrap();
///     assert_eq!(packet.header.apid, 1369);
/// });
/// ```
pub fn decode_packets<R>(reader: R) -> impl Iterator<Item = Result<Packet>>
where
    R: Read,
{
    PacketReaderIter { reader }
}
