use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skyreel_animation_core::{
    AnimatableId, AnimationContext, EventBuffer, Handle, Parameter, ParameterKind, ParameterValue,
};

fn build(samples: usize, bezier: bool) -> Parameter {
    let mut p = Parameter::new(AnimatableId::new(), ParameterKind::LookAtElevation);
    let mut events = EventBuffer::default();
    for i in 0..samples {
        let frame = (i * 8) as i64;
        let value = ((i % 17) as f64) * 64.0;
        let sample = if bezier {
            ParameterValue::bezier(
                frame,
                value,
                Some(Handle::new(-3.0, -1.0)),
                Some(Handle::new(3.0, 1.0)),
            )
        } else {
            ParameterValue::linear(frame, value)
        };
        p.insert_sample(sample, &None, &mut events)
            .expect("bench samples are valid");
    }
    p
}

fn bench_curve_eval(c: &mut Criterion) {
    let ctx = AnimationContext::default();
    let linear = build(1_000, false);
    let bezier = build(1_000, true);

    c.bench_function("value_at_linear_1k", |b| {
        let mut frame = 0i64;
        b.iter(|| {
            frame = (frame + 13) % 8_000;
            black_box(linear.value_at(black_box(frame), &ctx))
        })
    });

    c.bench_function("value_at_bezier_1k", |b| {
        let mut frame = 0i64;
        b.iter(|| {
            frame = (frame + 13) % 8_000;
            black_box(bezier.value_at(black_box(frame), &ctx))
        })
    });

    c.bench_function("values_between_bezier_240", |b| {
        b.iter(|| black_box(bezier.values_between(1_000, 1_239, &ctx)))
    });
}

criterion_group!(benches, bench_curve_eval);
criterion_main!(benches);
