use bytes::Bytes;
use criterion::{criterion_group, criterion_main, Criterion};

use choke::{ChokeConfig, ChokeQueue, FiveTuple, Ipv4FlowFilter, Packet, SeededUniform};

fn bench_enqueue_dequeue(c: &mut Criterion) {
    let config = ChokeConfig::default().thresholds(70.0, 150.0).queue_limit(300);
    let mut queue = ChokeQueue::builder(config)
        .filter(Ipv4FlowFilter)
        .drop_rng(SeededUniform::new(1))
        .index_rng(SeededUniform::new(2))
        .build()
        .unwrap();

    let header = FiveTuple {
        src: "10.10.1.1".parse().unwrap(),
        dst: "10.10.1.2".parse().unwrap(),
        src_port: 1000,
        dst_port: 2000,
        protocol: 6,
    };
    let payload = Bytes::from(vec![0u8; 500]);

    c.bench_function("enqueue_dequeue", |b| {
        b.iter(|| {
            queue.enqueue(Packet::new(header, payload.clone()));
            queue.dequeue();
        })
    });
}

criterion_group!(benches, bench_enqueue_dequeue);
criterion_main!(benches);
