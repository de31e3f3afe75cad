// Host-side tests for WGSL program synthesis. Every program shape is run
// through naga so the text is known to compile.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wave_core::*;

fn wavevectors(n: usize) -> Vec<Wavevector> {
    let mut store = WavevectorStore::new(400, 300, FieldParams::default());
    for i in 0..n {
        store.add(Vec2::new(40.0 + 37.0 * i as f32, 250.0 - 19.0 * i as f32));
    }
    store.snapshot()
}

fn random_wavevectors(rng: &mut StdRng) -> Vec<Wavevector> {
    let mut store = WavevectorStore::new(640, 480, FieldParams::default());
    let n = rng.gen_range(0..12);
    for _ in 0..n {
        store.add(Vec2::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)));
    }
    store.snapshot()
}

#[test]
fn synthesis_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..32 {
        let wvs = random_wavevectors(&mut rng);
        let mode = DisplayMode::ALL[rng.gen_range(0..3)];
        let time = rng.gen::<bool>();
        let a = synthesize(&wvs, mode, time);
        let b = synthesize(&wvs, mode, time);
        assert_eq!(a.text, b.text);
        assert_eq!(a.uniforms, b.uniforms);
    }
}

#[test]
fn text_depends_on_count_not_on_k_values() {
    let mut store = WavevectorStore::new(400, 400, FieldParams::default());
    let h = store.add(Vec2::new(10.0, 10.0));
    let before = synthesize(&store.snapshot(), DisplayMode::Both, false);
    store.update(h, Vec2::new(390.0, 50.0)).unwrap();
    let after = synthesize(&store.snapshot(), DisplayMode::Both, false);
    assert_eq!(before.text, after.text);
}

#[test]
fn empty_set_contributes_nothing() {
    let src = synthesize(&[], DisplayMode::Both, false);
    assert!(!src.body().contains("resx +="));
    assert!(!src.body().contains("resy +="));
    assert!(src.body().contains("var resx: f32 = 0.0;"));
    assert!(src.body().contains("var resy: f32 = 0.0;"));
    assert!(src.body().contains("let max_intensity = 1.0;"));
    assert_eq!(src.uniforms, vec!["resolution", "time", "time_rate"]);
    assert_eq!(src.desc.max_intensity(), 1.0);
}

#[test]
fn max_intensity_is_max_of_one_and_count() {
    for n in 0..8 {
        let src = synthesize(&wavevectors(n), DisplayMode::Both, false);
        let expected = (n as f32).max(1.0);
        assert_eq!(src.desc.max_intensity(), expected);
        let line = format!("let max_intensity = {:.1};", expected);
        assert!(src.body().contains(&line), "missing `{line}` for n={n}");
    }
}

#[test]
fn each_wavevector_gets_a_uniform_and_an_accumulation_pair() {
    let src = synthesize(&wavevectors(3), DisplayMode::Both, false);
    assert_eq!(
        src.uniforms,
        vec!["resolution", "time", "time_rate", "k0", "k1", "k2"]
    );
    for i in 0..3 {
        assert!(src.header().contains(&format!("    k{i}: vec2<f32>,")));
        let angle = format!("u.k{i}.x * x / u.resolution.x + u.k{i}.y * y / u.resolution.y");
        assert!(src.body().contains(&format!("resx += cos({angle});")));
        assert!(src.body().contains(&format!("resy += sin({angle});")));
    }
    assert!(!src.header().contains("k3"));
    assert_eq!(src.body().matches("resx +=").count(), 3);
    assert_eq!(src.body().matches("resy +=").count(), 3);
}

#[test]
fn term_descriptors_follow_positions() {
    let desc = ProgramDesc::new(&wavevectors(4), DisplayMode::PhaseOnly, true);
    assert_eq!(desc.wave_count(), 4);
    for (i, term) in desc.terms.iter().enumerate() {
        assert_eq!(term.index, i);
        assert!(term.has_time_term);
        assert_eq!(term.uniform_name(), wavevector_uniform_name(i));
    }
}

#[test]
fn mode_switch_changes_only_the_tail() {
    let wvs = wavevectors(4);
    let both = synthesize(&wvs, DisplayMode::Both, true);
    for mode in [DisplayMode::IntensityOnly, DisplayMode::PhaseOnly] {
        let other = synthesize(&wvs, mode, true);
        assert_eq!(other.header(), both.header());
        assert_eq!(other.body(), both.body());
        assert_eq!(other.uniforms, both.uniforms);
        assert_ne!(other.tail(), both.tail());
        assert_ne!(other.text, both.text);
    }
}

#[test]
fn with_mode_matches_full_synthesis() {
    let wvs = wavevectors(2);
    let base = synthesize(&wvs, DisplayMode::Both, false);
    for mode in DisplayMode::ALL {
        assert_eq!(base.with_mode(mode), synthesize(&wvs, mode, false));
    }
}

#[test]
fn time_toggle_changes_every_phase_term_but_not_uniforms() {
    let wvs = wavevectors(5);
    let still = synthesize(&wvs, DisplayMode::Both, false);
    let moving = synthesize(&wvs, DisplayMode::Both, true);
    let time_term = "u.time * TAU / u.time_rate";
    assert_eq!(still.body().matches(time_term).count(), 0);
    assert_eq!(moving.body().matches(time_term).count(), 2 * wvs.len());
    assert_eq!(still.uniforms, moving.uniforms);
    assert_eq!(still.header(), moving.header());
    assert_eq!(still.tail(), moving.tail());
}

#[test]
fn tails_select_the_right_colour_mapping() {
    let both = synthesize(&[], DisplayMode::Both, false);
    assert!(both.tail().contains("rgb * intensity, 1.0"));
    let intensity = synthesize(&[], DisplayMode::IntensityOnly, false);
    assert!(intensity.tail().contains("vec4<f32>(intensity, intensity, intensity, 1.0)"));
    assert!(!intensity.tail().contains("hsv2rgb"));
    let phase = synthesize(&[], DisplayMode::PhaseOnly, false);
    assert!(phase.tail().contains("vec4<f32>(rgb, 1.0)"));
    assert!(!phase.tail().contains("max_intensity"));
}

#[test]
fn every_program_shape_validates_with_naga() {
    for n in [0, 1, 2, 7] {
        let wvs = wavevectors(n);
        for mode in DisplayMode::ALL {
            for time in [false, true] {
                let src = synthesize(&wvs, mode, time);
                validate_wgsl(&src.text)
                    .unwrap_or_else(|e| panic!("n={n} mode={mode} time={time}: {e}"));
            }
        }
    }
}

#[test]
fn malformed_text_is_rejected_with_a_message() {
    let mut src = synthesize(&wavevectors(1), DisplayMode::Both, false);
    src.text = src.text.replace("resx += cos(", "resx += cosine(");
    let err = validate_wgsl(&src.text).unwrap_err();
    assert!(!err.is_empty());
}

#[test]
fn entry_points_are_declared() {
    let src = synthesize(&wavevectors(1), DisplayMode::Both, false);
    assert!(src.text.contains(&format!("fn {VERTEX_ENTRY}(")));
    assert!(src.text.contains(&format!("fn {FRAGMENT_ENTRY}(")));
    assert!(src.declares("k0"));
    assert!(!src.declares("k1"));
}
