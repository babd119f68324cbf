//! Frame decoder benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sofablend_server::{FrameDecoder, CLOSE_TAG, OPEN_TAG};

fn message(vertices: usize) -> Vec<u8> {
    let position: Vec<String> = (0..vertices).map(|i| format!("[{i}.0,0.5,1.0]")).collect();
    let body = format!(
        r#"{{"iteration":0,"node_name":"root","objects":[{{"name":"mo","position":[{}]}}]}}"#,
        position.join(",")
    );
    [OPEN_TAG, body.as_bytes(), CLOSE_TAG].concat()
}

fn decode_chunked(c: &mut Criterion) {
    let bytes = message(10_000);
    c.bench_function("decode_chunked_10k", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            let mut count = 0;
            for chunk in bytes.chunks(4096) {
                decoder.push(black_box(chunk));
                while decoder.next_message().is_some() {
                    count += 1;
                }
            }
            count
        })
    });
}

fn decode_back_to_back(c: &mut Criterion) {
    let bytes = message(16).repeat(256);
    c.bench_function("decode_back_to_back_256", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            decoder.push(black_box(&bytes));
            std::iter::from_fn(|| decoder.next_message()).count()
        })
    });
}

criterion_group!(benches, decode_chunked, decode_back_to_back);
criterion_main!(benches);
