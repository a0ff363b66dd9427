use std::fs::File;
use std::io::{Read, Write};

use rand::{Rng, SeedableRng};

use bitframe::framing::{
    bit_stats, dump_text, encode_image, encode_image_sweep, extract_bits, pack_text, FrameLayout,
    ImageConfig, ImagePreamble,
};
use bitframe::spacepacket::{
    decode_packets, extract_packets, ExtractConfig, PacketCounts, Summary, APID_IDLE,
};
use bitframe::BitReader;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
    (0..len).map(|_| rng.gen()).collect()
}

/// Build a single space packet with a 2-byte secondary header stand-in.
fn packet(apid: u16, seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut dat = Vec::new();
    dat.extend_from_slice(&(0x0800 | apid).to_be_bytes());
    dat.extend_from_slice(&(0xc000 | (seq & 0x3fff)).to_be_bytes());
    dat.extend_from_slice(&((payload.len() - 1) as u16).to_be_bytes());
    dat.extend_from_slice(payload);
    dat
}

#[test]
fn text_dump_round_trips_through_pack() {
    let dat = random_bytes(64);
    let layout = FrameLayout::builder().block_body_bits(512).build();

    let mut text = Vec::new();
    dump_text(&dat[..], &mut text, &layout, 512, false).unwrap();
    let mut packed = Vec::new();
    let bits = pack_text(&text[..], &mut packed).unwrap();

    assert_eq!(bits, 512);
    assert_eq!(packed, dat);
}

#[test]
fn section_accounting_over_a_file() {
    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("stream.dat");
    File::create(&path)
        .unwrap()
        .write_all(&random_bytes(4096))
        .unwrap();

    let layout = FrameLayout::builder()
        .prologue_bits(13)
        .block_header_bits(7)
        .block_body_bits(101)
        .block_count(29)
        .build();
    let stats = bit_stats(File::open(&path).unwrap(), &layout, false).unwrap();

    assert_eq!(stats.total_bits, 4096 * 8);
    assert_eq!(layout.declared_bits() + stats.footer_bits(), stats.total_bits);
}

#[test]
fn inverting_twice_is_the_identity() {
    let dat = random_bytes(32);
    let flipped: Vec<u8> = dat.iter().map(|b| !b).collect();
    let layout = FrameLayout::builder()
        .prologue_bits(5)
        .block_body_bits(40)
        .block_count(4)
        .build();

    let mut a = Vec::new();
    dump_text(&dat[..], &mut a, &layout, 8, true).unwrap();
    let mut b = Vec::new();
    dump_text(&flipped[..], &mut b, &layout, 8, false).unwrap();

    assert_eq!(a, b);
}

#[test]
fn image_projection_reproduces_body_bits() {
    let dat = random_bytes(128);
    let layout = FrameLayout::builder()
        .block_header_bits(16)
        .block_body_bits(240)
        .block_count(4)
        .build();
    let config = ImageConfig::builder().row_width(16).bit_depth(1).build();

    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("pixels.img");
    let preamble = encode_image(
        &dat[..],
        File::create(&path).unwrap(),
        &layout,
        &config,
    )
    .unwrap();
    assert_eq!(preamble.row_count, 15);

    let mut encoded = Vec::new();
    File::open(&path).unwrap().read_to_end(&mut encoded).unwrap();
    assert_eq!(ImagePreamble::decode(&encoded).unwrap(), preamble);

    // depth 1: each payload byte is one body bit
    let payload = &encoded[ImagePreamble::LEN..];
    assert_eq!(payload.len(), 4 * 15 * 16);

    let body_bits: Vec<u8> = layout
        .classify(&dat[..], false)
        .map(Result::unwrap)
        .filter(|cb| cb.section == bitframe::framing::Section::BlockBody)
        .map(|cb| cb.bit)
        .collect();
    assert_eq!(payload, &body_bits[..]);
}

#[test]
fn sweep_writes_one_file_per_width() {
    let dat = random_bytes(64);
    let layout = FrameLayout::builder().block_body_bits(256).block_count(2).build();
    let config = ImageConfig::builder().row_width(1).bit_depth(8).build();

    let tmpdir = tempfile::tempdir().unwrap();
    let out_path = |width: u32| tmpdir.path().join(format!("sweep_{width}.img"));

    let preambles = encode_image_sweep(
        2..=4,
        &layout,
        &config,
        |_| Ok(&dat[..]),
        |width| File::create(out_path(width)),
    )
    .unwrap();
    assert_eq!(preambles.len(), 3);

    for preamble in preambles {
        let meta = std::fs::metadata(out_path(preamble.row_width)).unwrap();
        let rows = 256 / (u64::from(preamble.row_width) * 8);
        assert_eq!(preamble.row_count as u64, rows);
        let payload = 2 * rows * u64::from(preamble.row_width);
        assert_eq!(meta.len(), ImagePreamble::LEN as u64 + payload);
    }
}

#[test]
fn bit_range_extract_matches_the_dump() {
    let dat = random_bytes(16);

    let mut whole = Vec::new();
    extract_bits(&dat[..], &mut whole, 0, 128, 0, false).unwrap();
    let mut tail = Vec::new();
    let outcome = extract_bits(&dat[..], &mut tail, 40, 88, 0, false).unwrap();

    assert!(!outcome.truncated);
    let whole = String::from_utf8(whole).unwrap();
    let tail = String::from_utf8(tail).unwrap();
    // skipping 40 bits drops the first 20 tokens and their separators
    assert_eq!(whole[40 * 2..], tail);
}

#[test]
fn packet_extraction_over_a_file() {
    let mut stream = Vec::new();
    stream.extend(packet(800, 1, &[0x10, 0x20, 0xaa, 0xbb]));
    stream.extend(packet(APID_IDLE, 0, &[0u8; 17]));
    stream.extend(packet(801, 7, &[0x10, 0x20, 0xcc]));
    stream.extend(packet(800, 2, &[0x10, 0x20, 0xdd, 0xee]));
    let stream_len = stream.len();

    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("packets.dat");
    File::create(&path).unwrap().write_all(&stream).unwrap();

    let config = ExtractConfig::builder()
        .target_apid(800)
        .secondary_header_size(2)
        .strict(true)
        .build();
    let mut matched = Vec::new();
    let mut summary = Vec::new();
    let counts = extract_packets(
        File::open(&path).unwrap(),
        &mut matched,
        Some(&mut summary),
        &config,
    )
    .unwrap();

    assert_eq!(counts.total, 4);
    assert_eq!(counts.idle, 1);
    assert_eq!(counts.telemetry, 3);
    assert_eq!(counts.command, 0);
    assert_eq!(counts.matched, 2);
    assert_eq!(counts.bytes, stream_len);

    let matched = String::from_utf8(matched).unwrap();
    assert!(matched.contains("aa bb"), "{matched}");
    assert!(matched.contains("dd ee"), "{matched}");
    assert!(!matched.contains("cc"), "{matched}");

    let summary = String::from_utf8(summary).unwrap();
    assert_eq!(summary.matches('*').count(), 2);
    assert!(summary.contains("packets: 4"));
    assert!(summary.contains("idle packets: 1"));
    assert!(summary.contains(&format!("bytes: {stream_len}")));
}

#[test]
fn packet_iteration_feeds_a_summary() {
    let mut stream = Vec::new();
    stream.extend(packet(800, 1, &[0xaa; 4]));
    stream.extend(packet(800, 5, &[0xbb; 4]));
    stream.extend(packet(801, 9, &[0xcc; 8]));

    let mut summary = Summary::default();
    let packets: Vec<_> = decode_packets(&stream[..])
        .map(Result::unwrap)
        .inspect(|p| summary.add(&p.header))
        .collect();

    assert_eq!(packets.len(), 3);
    assert_eq!(summary.count, 3);
    assert_eq!(summary.bytes, stream.len());
    assert_eq!(summary.missing, 3);
    assert_eq!(summary.apids[&800].count, 2);
    assert_eq!(summary.apids[&801].missing, 0);
}

#[test]
fn reports_serialize_to_json() {
    let layout = FrameLayout::builder().block_body_bits(8).build();
    let stats = bit_stats(&[0xF0u8, 0x0F][..], &layout, false).unwrap();
    let json = serde_json::to_string(&stats).unwrap();
    let back: bitframe::framing::StreamStats = serde_json::from_str(&json).unwrap();
    assert_eq!(back.total_bits, stats.total_bits);
    assert_eq!(back.sections.len(), stats.sections.len());

    let counts = PacketCounts {
        total: 3,
        idle: 1,
        telemetry: 2,
        command: 0,
        matched: 1,
        bytes: 64,
    };
    let json = serde_json::to_string(&counts).unwrap();
    let back: PacketCounts = serde_json::from_str(&json).unwrap();
    assert_eq!(back, counts);
}

#[test]
fn wire_order_is_msb_first() {
    // 0x0d59d2ab0008 is a real CrIS primary header; its first byte must bit-stream
    // as 00001101
    let dat = hex::decode("0d").unwrap();
    let bits: Vec<u8> = BitReader::new(&dat[..]).map(Result::unwrap).collect();
    assert_eq!(bits, [0, 0, 0, 0, 1, 1, 0, 1]);
}
