/*Measures the cost of rendering a typical per-tick bundle (two float messages,
as the CV module sends) and a larger mixed bundle into the reusable packet buffer. */
use criterion::{
    criterion_group,
    criterion_main,
    Criterion,
};
use osc_sender::{encode, Bundle, Message, MAX_PACKET_SIZE};

use std::{
    hint::black_box,
    time::SystemTime,
};

fn bench_encode(c: &mut Criterion) {
    let mut buffer = [0u8; MAX_PACKET_SIZE];

    let tick = Bundle::new(SystemTime::now())
        .message(Message::new("/cv1").arg(0.42f32))
        .message(Message::new("/u_speed").arg(0.2f32));

    let mut mixed = Bundle::new(SystemTime::now());
    for i in 0..64 {
        mixed.push(
            Message::new(format!("/track/{i}/state"))
                .arg(i)
                .arg(i as f32 / 64.0)
                .arg("active"),
        );
    }

    c.bench_function("encode_tick_bundle", |b| {
        b.iter(|| black_box(encode(&mut buffer, black_box(&tick)).unwrap()));
    });

    c.bench_function("encode_64_message_bundle", |b| {
        b.iter(|| black_box(encode(&mut buffer, black_box(&mixed)).unwrap()));
    });
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
