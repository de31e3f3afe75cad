// Host-side tests for uniform binding and the uniform buffer layout.

use glam::Vec2;
use wave_core::*;

fn as_words(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned::<f32>)
        .collect()
}

fn store_with(n: usize) -> WavevectorStore {
    let mut store = WavevectorStore::new(400, 400, FieldParams::default());
    for i in 0..n {
        store.add(Vec2::new(50.0 + 60.0 * i as f32, 120.0));
    }
    store
}

#[test]
fn binder_produces_every_declared_name() {
    let store = store_with(3);
    let anim = AnimationState::new(true, 4.0).unwrap();
    let values = bind_uniforms(&store.snapshot(), &anim, 1.5, Vec2::new(640.0, 480.0));

    assert_eq!(values.get("resolution"), Some(UniformValue::Vec2([640.0, 480.0])));
    assert_eq!(values.get("time"), Some(UniformValue::F32(1.5)));
    assert_eq!(values.get("time_rate"), Some(UniformValue::F32(4.0)));
    for wv in store.snapshot() {
        let name = wavevector_uniform_name(wv.index);
        assert_eq!(values.get(&name), Some(UniformValue::Vec2(wv.k.to_array())));
    }
    assert_eq!(values.len(), 6);

    let src = synthesize(&store.snapshot(), DisplayMode::Both, true);
    let mut names: Vec<_> = values.names().map(str::to_string).collect();
    names.sort();
    let mut declared = src.uniforms.clone();
    declared.sort();
    assert_eq!(names, declared);
}

#[test]
fn binder_does_not_depend_on_time_flag() {
    let store = store_with(2);
    let on = AnimationState::new(true, 3.0).unwrap();
    let off = AnimationState::new(false, 3.0).unwrap();
    let size = Vec2::new(100.0, 100.0);
    assert_eq!(
        bind_uniforms(&store.snapshot(), &on, 2.0, size),
        bind_uniforms(&store.snapshot(), &off, 2.0, size)
    );
}

#[test]
fn layout_follows_wgsl_uniform_alignment() {
    let src = synthesize(&store_with(2).snapshot(), DisplayMode::Both, false);
    let layout = UniformLayout::for_program(&src);
    let offsets: Vec<_> = layout
        .slots()
        .iter()
        .map(|s| (s.name.as_str(), s.offset))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("resolution", 0),
            ("time", 8),
            ("time_rate", 12),
            ("k0", 16),
            ("k1", 24)
        ]
    );
    assert_eq!(layout.size(), 32);
    assert_eq!(layout.slot("time").unwrap().kind, UniformKind::F32);
    assert_eq!(layout.slot("k1").unwrap().kind, UniformKind::Vec2);
}

#[test]
fn layout_size_is_rounded_to_sixteen() {
    for (n, size) in [(0, 16), (1, 32), (2, 32), (3, 48)] {
        let src = synthesize(&store_with(n).snapshot(), DisplayMode::Both, false);
        assert_eq!(UniformLayout::for_program(&src).size(), size, "n={n}");
    }
}

#[test]
fn pack_places_values_and_reads_back() {
    let store = store_with(1);
    let src = synthesize(&store.snapshot(), DisplayMode::Both, false);
    let layout = UniformLayout::for_program(&src);
    let values = bind_uniforms(
        &store.snapshot(),
        &AnimationState::default(),
        0.25,
        Vec2::new(320.0, 200.0),
    );
    let bytes = layout.pack(&values);
    assert_eq!(bytes.len(), layout.size());

    let words = as_words(&bytes);
    assert_eq!(&words[0..4], &[320.0, 200.0, 0.25, DEFAULT_TIME_RATE]);
    let k0 = store.snapshot()[0].k;
    assert_eq!(&words[4..6], &[k0.x, k0.y]);

    assert_eq!(layout.read(&bytes, "time"), Some(UniformValue::F32(0.25)));
    assert_eq!(layout.read(&bytes, "k0"), Some(UniformValue::Vec2(k0.to_array())));
    assert_eq!(layout.read(&bytes, "k1"), None);
}

#[test]
fn pack_ignores_names_the_program_does_not_declare() {
    let src = synthesize(&store_with(1).snapshot(), DisplayMode::Both, false);
    let layout = UniformLayout::for_program(&src);

    let mut values = UniformValues::new();
    values.set("resolution", Vec2::new(10.0, 20.0));
    values.set("time", 1.0f32);
    values.set("time_rate", 2.0f32);
    values.set("k0", Vec2::new(3.0, 4.0));
    let expected = layout.pack(&values);

    values.set("k1", Vec2::new(99.0, 99.0));
    values.set("k7", Vec2::new(-1.0, -1.0));
    values.set("projection_mat", 5.0f32);
    assert_eq!(layout.pack(&values), expected);
}

#[test]
fn missing_and_mismatched_values_stay_zero() {
    let src = synthesize(&store_with(2).snapshot(), DisplayMode::Both, false);
    let layout = UniformLayout::for_program(&src);
    let mut values = UniformValues::new();
    values.set("time", Vec2::new(1.0, 1.0));
    values.set("k1", Vec2::new(7.0, 8.0));
    let bytes = layout.pack(&values);
    let words = as_words(&bytes);
    assert_eq!(words[2], 0.0);
    assert_eq!(&words[4..6], &[0.0, 0.0]);
    assert_eq!(&words[6..8], &[7.0, 8.0]);
}

#[test]
fn animation_state_rejects_bad_rates() {
    let mut anim = AnimationState::default();
    for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(
            anim.set_time_rate(bad),
            Err(WaveError::InvalidTimeRate(_))
        ));
        assert_eq!(anim.time_rate(), DEFAULT_TIME_RATE);
    }
    anim.set_time_rate(0.5).unwrap();
    assert_eq!(anim.time_rate(), 0.5);
    assert!(AnimationState::new(true, -2.0).is_err());
}

#[test]
fn manual_clock_only_moves_forward() {
    let mut clock = ManualClock::default();
    clock.advance(0.5);
    clock.advance(-3.0);
    assert_eq!(clock.now(), 0.5);
    let sys = SystemClock::new();
    let a = sys.now();
    let b = sys.now();
    assert!(b >= a);
}
