use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{missing_packets, Apid, PrimaryHeader};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ApidSummary {
    pub count: usize,
    pub bytes: usize,
    pub missing: usize,
}

/// Per-APID accounting over a walked packet stream.
///
/// Accumulates from primary headers alone, so it works the same whether the packets'
/// data fields were read or skipped. Byte counts include the 6 header bytes. Missing
/// counts come from gaps in each APID's 14-bit sequence id.
///
/// # Example
/// ```
/// use bitframe::spacepacket::{decode_packets, Packet, Summary};
/// let dat: &[u8] = &[0xd, 0x59, 0xc0, 0x01, 0x0, 0x8, 0x52, 0xc0, 0x0, 0x0, 0x0, 0xa7, 0x0, 0xdb, 0xff];
///
/// let mut summary = Summary::default();
/// let packets: Vec<Packet> = decode_packets(dat)
///     .filter_map(Result::ok)
///     .inspect(|p| summary.add(&p.header))
///     .collect();
/// assert_eq!(summary.count, 1);
/// ```
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub bytes: usize,
    pub missing: usize,
    pub apids: HashMap<Apid, ApidSummary>,

    last_seq: HashMap<Apid, u16>,
}

impl Summary {
    pub fn add(&mut self, header: &PrimaryHeader) {
        let packet_len = PrimaryHeader::LEN + header.data_len();
        self.count += 1;
        self.bytes += packet_len;

        let apid = self.apids.entry(header.apid).or_default();
        apid.count += 1;
        apid.bytes += packet_len;

        if let Some(last) = self.last_seq.get(&header.apid) {
            let missing = missing_packets(header.sequence_id, *last) as usize;
            apid.missing += missing;
            self.missing += missing;
        }
        self.last_seq.insert(header.apid, header.sequence_id);
    }
}
