use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skyreel_animation_core::{
    plan_retime, Animatable, AnimationContext, AnimationError, ChangeKind, EventBuffer,
    Interpolation, ParameterKind, ParameterValue, Payload,
};

/// Camera whose eye latitude steps by 10 at each keyframe; the other position
/// members stay constant, so each segment has length 10.
fn camera_at(frames: &[i64]) -> Animatable {
    let mut cam = Animatable::camera("camera");
    let ctx = AnimationContext::default();
    let mut events = EventBuffer::default();
    for (i, &frame) in frames.iter().enumerate() {
        cam.insert_keyframe(
            frame,
            &[
                (ParameterKind::EyeLat, ParameterValue::linear(frame, 10.0 * i as f64)),
                (ParameterKind::LookAtLat, ParameterValue::linear(frame, -(i as f64))),
            ],
            &ctx,
            &mut events,
        )
        .unwrap();
    }
    cam
}

fn lat_samples(cam: &Animatable) -> Vec<(i64, f64)> {
    cam.parameter(ParameterKind::EyeLat)
        .unwrap()
        .samples()
        .iter()
        .map(|s| (s.frame, s.value))
        .collect()
}

#[test]
fn uniform_path_is_left_in_place() {
    let mut cam = camera_at(&[0, 50, 100, 150]);
    let mut events = EventBuffer::default();
    let plan = cam
        .smooth_eye_speed(0..=150, &AnimationContext::default(), &mut events)
        .unwrap();
    let expected = [0, 50, 100, 150];
    for ((_, to), want) in plan.moves.iter().zip(expected) {
        assert!((to - want).abs() <= 1, "{to} vs {want}");
    }
    assert_eq!(plan.moves.first(), Some(&(0, 0)));
    assert_eq!(plan.moves.last(), Some(&(150, 150)));
    cam.check_invariants().unwrap();
}

#[test]
fn uneven_spacing_is_evened_out() {
    let mut cam = camera_at(&[0, 10, 20, 150]);
    let ctx = AnimationContext::default();
    let mut events = EventBuffer::default();
    let plan = cam.smooth_eye_speed(0..=150, &ctx, &mut events).unwrap();
    let new: Vec<i64> = plan.new_frames().collect();
    assert_eq!(new[0], 0);
    assert_eq!(new[3], 150);
    assert!((new[1] - 50).abs() <= 1, "{new:?}");
    assert!((new[2] - 100).abs() <= 1, "{new:?}");

    // Values are relocated, not re-interpolated.
    let lat = lat_samples(&cam);
    let values: Vec<f64> = lat.iter().map(|&(_, v)| v).collect();
    assert_eq!(values, vec![0.0, 10.0, 20.0, 30.0]);
    assert_eq!(lat.iter().map(|&(f, _)| f).collect::<Vec<_>>(), new);

    // Every group member moved with the eye.
    let look: Vec<i64> = cam.parameter(ParameterKind::LookAtLat).unwrap().frames().collect();
    assert_eq!(look, new);
    cam.check_invariants().unwrap();

    // Old frames are gone from the keyframe set and announced as removed.
    assert!(!cam.keyframes().contains(&10));
    assert!(events.events().iter().any(|e| e.kind() == ChangeKind::Removed
        && *e.payload()
            == Payload::KeyFrame {
                object: cam.id(),
                frame: 10
            }));
}

#[test]
fn frames_outside_range_are_untouched() {
    let mut cam = camera_at(&[0, 10, 20, 150, 160]);
    let ctx = AnimationContext::default();
    let mut events = EventBuffer::default();
    cam.smooth_eye_speed(0..=150, &ctx, &mut events).unwrap();
    assert!(cam.keyframes().contains(&160));
    assert_eq!(lat_samples(&cam).last(), Some(&(160, 40.0)));
}

#[test]
fn stationary_camera_is_a_no_op() {
    let mut cam = Animatable::camera("camera");
    let ctx = AnimationContext::default();
    let mut events = EventBuffer::default();
    for frame in [0, 3, 90] {
        cam.key_all(frame, &ctx, &mut events).unwrap();
    }
    let before = cam.clone();
    let plan = cam.smooth_eye_speed(0..=90, &ctx, &mut events).unwrap();
    assert!(plan.is_identity());
    assert_eq!(cam, before);
}

#[test]
fn inverted_range_fails() {
    let mut cam = camera_at(&[0, 10, 20]);
    let mut events = EventBuffer::default();
    let err = cam
        .smooth_eye_speed(20..=0, &AnimationContext::default(), &mut events)
        .unwrap_err();
    assert_eq!(err, AnimationError::InvalidRange { start: 20, end: 0 });
}

#[test]
fn layers_cannot_be_retimed() {
    let mut layer = Animatable::layer("overlay");
    layer
        .insert_value(
            ParameterKind::Opacity,
            0,
            1.0,
            Interpolation::Linear,
            &AnimationContext::default(),
            &mut EventBuffer::default(),
        )
        .unwrap();
    let err = layer
        .smooth_eye_speed(0..=10, &AnimationContext::default(), &mut EventBuffer::default())
        .unwrap_err();
    assert!(matches!(err, AnimationError::UnknownParameter { .. }));
}

/// First and last frames survive and output stays strictly increasing for
/// arbitrary spacing and arbitrary (non-degenerate) paths.
#[test]
fn plan_invariants_hold_for_random_paths() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let n = rng.random_range(2..12);
        let mut frames = Vec::with_capacity(n);
        let mut f = rng.random_range(-50..50);
        for _ in 0..n {
            frames.push(f);
            f += rng.random_range(1..30);
        }
        let weights: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..5.0)).collect();
        let first = frames[0];
        let path = move |frame: i64| {
            let i = ((frame - first).max(0) as usize / 7).min(weights.len() - 1);
            [frame as f64 * weights[i], 0.0, 1.0]
        };
        let plan = plan_retime(&frames, path).unwrap();
        let out: Vec<i64> = plan.new_frames().collect();
        assert_eq!(out.len(), frames.len());
        assert_eq!(out[0], frames[0]);
        assert_eq!(out[n - 1], frames[n - 1]);
        assert!(out.windows(2).all(|w| w[0] < w[1]), "{frames:?} -> {out:?}");
    }
}
