//! Frame and message encoding/decoding benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use widerow_protocol::frame::Frame;
use widerow_protocol::{
    CellChunk, Decoder, Encoder, Filter, ReadRowsRequest, ReadRowsResponse, RowRange, RowSet,
    StreamMessage,
};

fn create_test_response(chunks: usize, value_size: usize) -> StreamMessage {
    let value = Bytes::from(vec![b'v'; value_size]);
    let chunks = (0..chunks)
        .map(|i| {
            CellChunk::new()
                .with_row_key(format!("row{:08}", i))
                .with_family("cf")
                .with_qualifier("col")
                .with_timestamp(1_000)
                .with_value(value.clone())
                .commit()
        })
        .collect();
    StreamMessage::Rows(ReadRowsResponse::new(chunks))
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [100, 1000, 10000] {
        let frame = Frame::new(Bytes::from("x".repeat(size)));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    for size in [100, 1000, 10000] {
        let encoded = Frame::new(Bytes::from("x".repeat(size))).encode().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = encoded.clone();
                black_box(Frame::decode(&mut buf).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_request_encode(c: &mut Criterion) {
    let request = ReadRowsRequest::new("projects/p/instances/i/tables/t")
        .with_rows(RowSet::from(RowRange::prefix("user#")).append_key("admin"))
        .with_filter(Filter::chain([
            Filter::family_regex("cf"),
            Filter::latest(1),
        ]))
        .with_rows_limit(1000);

    c.bench_function("request_encode", |b| {
        b.iter(|| black_box(Encoder::encode_request(&request).unwrap()));
    });
}

fn bench_response_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_roundtrip");

    for chunks in [10, 100, 1000] {
        let message = create_test_response(chunks, 64);

        group.throughput(Throughput::Elements(chunks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunks), &message, |b, message| {
            b.iter(|| {
                let encoded = Encoder::encode_message(message).unwrap();
                let mut decoder = Decoder::new();
                decoder.extend(&encoded);
                black_box(decoder.decode_message().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_request_encode,
    bench_response_roundtrip,
);

criterion_main!(benches);
