use skyreel_animation_core::{
    Animatable, AnimationError, Config, Handle, Interpolation, ParameterKind, Timeline,
};

fn frames(tl: &Timeline) -> Vec<i64> {
    tl.keyframes().into_iter().collect()
}

#[test]
fn doubling_spreads_frames_and_keeps_values() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    for (frame, value) in [(0, 1.0), (5, 2.0), (10, 3.0)] {
        tl.insert_value(cam, ParameterKind::Roll, frame, value, Interpolation::Linear)
            .unwrap();
    }
    tl.scale(2.0).unwrap();

    assert_eq!(frames(&tl), vec![0, 10, 20]);
    assert_eq!(tl.frame_count(), 200);
    let handle = tl.object(cam).unwrap();
    let roll = handle.read();
    let values: Vec<f64> = roll
        .parameter(ParameterKind::Roll)
        .unwrap()
        .samples()
        .iter()
        .map(|s| s.value)
        .collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn collisions_keep_the_later_original_frame() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    for (frame, value) in [(0, 1.0), (1, 2.0), (2, 3.0)] {
        tl.insert_value(cam, ParameterKind::Roll, frame, value, Interpolation::Linear)
            .unwrap();
    }
    tl.scale_object(cam, 0.5).unwrap();

    let handle = tl.object(cam).unwrap();
    let object = handle.read();
    let roll = object.parameter(ParameterKind::Roll).unwrap();
    let samples: Vec<(i64, f64)> = roll.samples().iter().map(|s| (s.frame, s.value)).collect();
    // 0.5 and 1.0 both round to frame 1; the sample from frame 2 wins.
    assert_eq!(samples, vec![(0, 1.0), (1, 3.0)]);
}

#[test]
fn bezier_handles_stretch_with_the_timeline() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    tl.insert_value(
        cam,
        ParameterKind::FieldOfView,
        0,
        40.0,
        Interpolation::Bezier {
            in_handle: None,
            out_handle: Some(Handle::new(4.0, 2.0)),
        },
    )
    .unwrap();
    tl.insert_value(
        cam,
        ParameterKind::FieldOfView,
        10,
        60.0,
        Interpolation::Bezier {
            in_handle: Some(Handle::new(-3.0, -1.0)),
            out_handle: None,
        },
    )
    .unwrap();
    let before = tl.value_at(cam, ParameterKind::FieldOfView, 5).unwrap();
    tl.scale_object(cam, 3.0).unwrap();

    let handle = tl.object(cam).unwrap();
    let object = handle.read();
    let fov = object.parameter(ParameterKind::FieldOfView).unwrap();
    assert_eq!(
        fov.sample_at(0).unwrap().interpolation.out_handle(),
        Some(Handle::new(12.0, 2.0))
    );
    assert_eq!(
        fov.sample_at(30).unwrap().interpolation.in_handle(),
        Some(Handle::new(-9.0, -1.0))
    );
    drop(object);
    let after = tl.value_at(cam, ParameterKind::FieldOfView, 15).unwrap();
    approx::assert_abs_diff_eq!(before, after, epsilon = 1e-6);
}

#[test]
fn group_members_scale_together() {
    let mut tl = Timeline::default();
    let cam = tl.add_object(Animatable::camera("camera"));
    tl.set_clipping_enabled(cam, true).unwrap();
    for frame in [3, 7, 11] {
        tl.insert_value(cam, ParameterKind::EyeLat, frame, frame as f64, Interpolation::Linear)
            .unwrap();
    }
    tl.scale(0.5).unwrap();
    let handle = tl.object(cam).unwrap();
    let object = handle.read();
    object.check_invariants().unwrap();
    let near: Vec<i64> = object.parameter(ParameterKind::NearClip).unwrap().frames().collect();
    assert_eq!(near, vec![2, 4, 6]);
}

#[test]
fn invalid_factors_are_rejected() {
    let mut tl = Timeline::new(&Config {
        frame_count: 10,
        ..Config::default()
    });
    for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            tl.scale(factor),
            Err(AnimationError::InvalidScaleFactor { .. })
        ));
    }
    assert_eq!(tl.frame_count(), 10);
}

#[test]
fn factors_overflowing_the_frame_range_are_rejected() {
    let mut tl = Timeline::new(&Config {
        frame_count: 10,
        ..Config::default()
    });
    let cam = tl.add_object(Animatable::camera("camera"));
    for frame in [0, 1_000_000_000_000, 2_000_000_000_000] {
        tl.insert_value(cam, ParameterKind::Roll, frame, 1.0, Interpolation::Linear)
            .unwrap();
    }

    // 2e12 * 1e8 is past i64::MAX; nothing may collapse onto the saturated frame.
    assert!(matches!(
        tl.scale_object(cam, 1.0e8),
        Err(AnimationError::InvalidScaleFactor { .. })
    ));
    assert_eq!(frames(&tl), vec![0, 1_000_000_000_000, 2_000_000_000_000]);

    // The frame count is checked before any object moves.
    assert!(matches!(
        tl.scale(1.0e18),
        Err(AnimationError::InvalidScaleFactor { .. })
    ));
    assert_eq!(tl.frame_count(), 10);
    assert_eq!(frames(&tl), vec![0, 1_000_000_000_000, 2_000_000_000_000]);
}
