use std::io::Cursor;

use bitframe::framing::{bit_stats, encode_image, FrameLayout, ImageConfig};
use bitframe::spacepacket::{extract_packets, ExtractConfig};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::Rng;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}

fn bench_classify(c: &mut Criterion) {
    let data = random_bytes(64 * 1024);
    let layout = FrameLayout::builder()
        .prologue_bits(64)
        .block_header_bits(32)
        .block_body_bits(4096)
        .block_count(100)
        .build();

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("stats", |b| {
        b.iter(|| {
            let stats = bit_stats(Cursor::new(&data), &layout, false).unwrap();
            assert_eq!(stats.total_bits, 64 * 1024 * 8);
        });
    });
    group.finish();
}

fn bench_image_encode(c: &mut Criterion) {
    let data = random_bytes(64 * 1024);
    let layout = FrameLayout::builder().block_body_bits(4096).block_count(128).build();
    let config = ImageConfig::builder().row_width(64).bit_depth(8).build();

    let mut group = c.benchmark_group("image");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| {
            encode_image(Cursor::new(&data), std::io::sink(), &layout, &config).unwrap();
        });
    });
    group.finish();
}

fn bench_packet_walk(c: &mut Criterion) {
    // 1000 packets of 250 data bytes each
    let mut data = Vec::new();
    for i in 0u16..1000 {
        data.extend_from_slice(&(0x0800u16 | 100).to_be_bytes());
        data.extend_from_slice(&(0xc000 | (i & 0x3fff)).to_be_bytes());
        data.extend_from_slice(&249u16.to_be_bytes());
        data.extend_from_slice(&[0xabu8; 250]);
    }
    let config = ExtractConfig::builder().target_apid(100).build();

    let mut group = c.benchmark_group("spacepacket");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("extract", |b| {
        b.iter(|| {
            let counts = extract_packets(
                Cursor::new(&data),
                std::io::sink(),
                None::<&mut std::io::Sink>,
                &config,
            )
            .unwrap();
            assert_eq!(counts.total, 1000);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_classify, bench_image_encode, bench_packet_walk);
criterion_main!(benches);
