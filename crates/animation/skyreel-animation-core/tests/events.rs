use std::sync::Arc;

use parking_lot::Mutex;
use skyreel_animation_core::{
    Animatable, AnimatableId, AnimationContext, ChangeEvent, ChangeKind, EventBuffer,
    Interpolation, ParameterKind, Payload, Timeline,
};

/// Subscribe a listener that keeps a copy of every published event.
fn record(tl: &Timeline) -> Arc<Mutex<Vec<ChangeEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = tl.subscribe(move |e: &ChangeEvent| sink.lock().push(e.clone()));
    seen
}

fn keyframe_events(events: &[ChangeEvent], kind: ChangeKind) -> Vec<i64> {
    events
        .iter()
        .filter(|e| e.kind() == kind)
        .filter_map(|e| match e.payload() {
            Payload::KeyFrame { frame, .. } => Some(*frame),
            _ => None,
        })
        .collect()
}

#[test]
fn grouped_insert_fans_out_under_one_root() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    let seen = record(&tl);

    tl.insert_value(cam, ParameterKind::EyeLat, 10, 5.0, Interpolation::Linear)
        .unwrap();

    let events = seen.lock();
    let params: Vec<&ChangeEvent> = events
        .iter()
        .filter(|e| matches!(e.payload(), Payload::Parameter(_)))
        .collect();
    assert_eq!(params.len(), 6);
    assert!(params.iter().all(|e| e.kind() == ChangeKind::Added));
    assert_eq!(keyframe_events(&events, ChangeKind::Added), vec![10]);

    let root = events[0].root_cause();
    assert_eq!(root.kind(), ChangeKind::Changed);
    assert_eq!(*root.payload(), Payload::Animatable(cam));
    assert!(events.iter().all(|e| e.shares_root_with(&events[0])));
}

#[test]
fn replacing_a_sample_changes_without_new_keyframe() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    tl.insert_value(cam, ParameterKind::Roll, 4, 1.0, Interpolation::Linear)
        .unwrap();
    let seen = record(&tl);

    let prior = tl
        .insert_value(cam, ParameterKind::Roll, 4, 2.0, Interpolation::Linear)
        .unwrap();
    assert_eq!(prior.map(|s| s.value), Some(1.0));

    let events = seen.lock();
    assert!(keyframe_events(&events, ChangeKind::Added).is_empty());
    assert!(events.iter().any(|e| e.kind() == ChangeKind::Changed
        && matches!(e.payload(), Payload::Parameter(r) if r.kind == ParameterKind::Roll)));
}

#[test]
fn emptying_a_frame_removes_the_keyframe() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    tl.insert_value(cam, ParameterKind::EyeLon, 12, 3.0, Interpolation::Linear)
        .unwrap();
    tl.insert_value(cam, ParameterKind::Roll, 12, 3.0, Interpolation::Linear)
        .unwrap();
    let seen = record(&tl);

    tl.remove_sample(cam, ParameterKind::Roll, 12).unwrap();
    assert!(keyframe_events(&seen.lock(), ChangeKind::Removed).is_empty());

    tl.remove_keyframe(cam, 12).unwrap();
    assert_eq!(keyframe_events(&seen.lock(), ChangeKind::Removed), vec![12]);
}

#[test]
fn object_add_is_the_root_of_its_keyframes() {
    let mut tl = Timeline::default();
    let seen = record(&tl);

    let mut layer = Animatable::layer("overlay");
    let ctx = AnimationContext::default();
    let mut scratch = EventBuffer::default();
    for frame in [0, 30] {
        layer
            .insert_value(ParameterKind::Opacity, frame, 1.0, Interpolation::Linear, &ctx, &mut scratch)
            .unwrap();
    }
    let id = tl.add_object(layer);

    {
        let events = seen.lock();
        assert_eq!(keyframe_events(&events, ChangeKind::Added), vec![0, 30]);
        for e in events.iter().filter(|e| e.is_keyframe()) {
            let root = e.root_cause();
            assert_eq!(root.kind(), ChangeKind::Added);
            assert_eq!(*root.payload(), Payload::Animatable(id));
        }
    }

    tl.remove_object(id).unwrap();
    let events = seen.lock();
    assert_eq!(keyframe_events(&events, ChangeKind::Removed), vec![0, 30]);
    assert!(tl.remove_object(AnimatableId::new()).is_err());
}

#[test]
fn failed_edit_publishes_nothing() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    tl.insert_value(cam, ParameterKind::EyeLat, 0, 1.0, Interpolation::Linear)
        .unwrap();
    let seen = record(&tl);

    assert!(tl.remove_sample(cam, ParameterKind::EyeLat, 0).is_err());
    assert!(seen.lock().is_empty());
}

#[test]
fn unsubscribed_listener_hears_nothing() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    let count = Arc::new(Mutex::new(0usize));
    let c = Arc::clone(&count);
    let sub = tl.subscribe(move |_| *c.lock() += 1);

    tl.key_all(cam, 0).unwrap();
    let heard = *count.lock();
    assert!(heard > 0);

    assert!(tl.unsubscribe(sub));
    tl.key_all(cam, 5).unwrap();
    assert_eq!(*count.lock(), heard);
}

#[test]
fn edits_that_change_nothing_publish_nothing() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    tl.key_all(cam, 0).unwrap();
    let seen = record(&tl);

    // Every enabled parameter already holds its current value at 0.
    tl.key_all(cam, 0).unwrap();
    tl.set_parameter_enabled(cam, ParameterKind::Roll, true).unwrap();
    tl.remove_keyframe(cam, 7).unwrap();
    assert!(seen.lock().is_empty());

    tl.set_parameter_enabled(cam, ParameterKind::Roll, false).unwrap();
    let events = seen.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(*events[0].payload(), Payload::Animatable(cam));
    assert!(events[1].shares_root_with(&events[0]));
}
