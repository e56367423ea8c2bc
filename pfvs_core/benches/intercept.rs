use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pfvs_core::GCodeInterceptor;
use pfvs_core::mocks::{FixedClassifier, ManualClock, RecordingPrinter, ScriptedGateway};

// Typical firmware chatter: moves, extrusion, temperature reports.
fn synth_log(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match i % 10 {
            0 => format!("ok T:{:.1} /210.0 B:60.0 /60.0 @:64 B@:0", 205.0 + (i % 7) as f32),
            1 => "M105".to_string(),
            _ => format!("G1 X{:.3} Y{:.3} E{:.5}", i as f32 * 0.1, i as f32 * 0.2, i as f32 * 0.001),
        })
        .collect()
}

fn interceptor() -> GCodeInterceptor {
    GCodeInterceptor::builder()
        .with_gateway(ScriptedGateway::uniform(10.0, 200.0))
        .with_classifier(FixedClassifier::new("PLA"))
        .with_printer(RecordingPrinter::new())
        .with_clock(Arc::new(ManualClock::new()))
        .build()
        .expect("build")
}

pub fn bench_intercept(c: &mut Criterion) {
    let lines = synth_log(10_000);

    c.bench_function("intercept_idle_10k_lines", |b| {
        let mut i = interceptor();
        b.iter(|| {
            for line in &lines {
                black_box(i.intercept(black_box(line)));
            }
        });
    });

    c.bench_function("intercept_printing_10k_lines", |b| {
        let mut i = interceptor();
        i.on_state_changed("STARTING");
        i.intercept("T:20.0 /210.0");
        i.on_state_changed("PRINTING");
        b.iter(|| {
            for line in &lines {
                black_box(i.intercept(black_box(line)));
            }
        });
    });
}

criterion_group!(benches, bench_intercept);
criterion_main!(benches);
