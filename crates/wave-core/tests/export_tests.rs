// Host-side tests for off-screen export through the software backend.

use glam::Vec2;
use wave_core::*;

fn context(width: u32, height: u32) -> FrameContext<SoftwareBackend> {
    FrameContext::new(
        SoftwareBackend::new(width, height),
        width,
        height,
        FieldParams::default(),
    )
}

#[test]
fn export_has_requested_size() {
    let mut ctx = context(40, 30);
    ctx.pointer_down(Vec2::new(30.0, 10.0)).unwrap();
    ctx.pointer_up(Vec2::new(30.0, 10.0)).unwrap();
    let pixels = ctx.export_image(Some((80, 60))).unwrap();
    assert_eq!((pixels.width, pixels.height), (80, 60));
    assert_eq!(pixels.data.len(), 80 * 60 * 4);
    assert!(!ctx.export_in_progress());
}

#[test]
fn export_defaults_to_canvas_size() {
    let mut ctx = context(40, 30);
    let pixels = ctx.export_image(None).unwrap();
    assert_eq!((pixels.width, pixels.height), (40, 30));
}

#[test]
fn export_is_independent_of_canvas_size_and_clock() {
    let mut ctx = context(400, 400);
    ctx.pointer_down(Vec2::new(260.0, 180.0)).unwrap();
    ctx.pointer_up(Vec2::new(260.0, 180.0)).unwrap();
    ctx.pointer_down(Vec2::new(90.0, 330.0)).unwrap();
    ctx.pointer_up(Vec2::new(90.0, 330.0)).unwrap();

    let first = ctx.export_image(Some((80, 60))).unwrap();

    ctx.resize(120, 30);
    ctx.frame(12.5).unwrap();
    let second = ctx.export_image(Some((80, 60))).unwrap();
    assert_eq!(first, second);

    // pixels are a function of the k values alone
    let store = ctx.store();
    let src = synthesize(&store.snapshot(), DisplayMode::Both, false);
    let layout = UniformLayout::for_program(&src);
    let mut values = UniformValues::new();
    values.set("resolution", Vec2::new(80.0, 60.0));
    values.set("time", 0.0f32);
    values.set("time_rate", 1.0f32);
    for wv in store.snapshot() {
        values.set(wavevector_uniform_name(wv.index), wv.k);
    }
    let inputs = field::FieldInputs::from_uniform_bytes(&src.desc, &layout, &layout.pack(&values));
    for (x, y) in [(0, 0), (17, 44), (79, 59)] {
        let c = inputs.color_at(&src.desc, x as f32 + 0.5, y as f32 + 0.5);
        assert_eq!(first.pixel(x, y), Some(field::to_rgba8(c)));
    }
}

#[test]
fn export_ignores_animation_clock() {
    let mut ctx = context(32, 32);
    ctx.pointer_down(Vec2::new(20.0, 8.0)).unwrap();
    ctx.pointer_up(Vec2::new(20.0, 8.0)).unwrap();
    ctx.set_time_active(true).unwrap();
    ctx.frame(0.3).unwrap();
    let a = ctx.export_image(Some((16, 16))).unwrap();
    ctx.frame(7.9).unwrap();
    let b = ctx.export_image(Some((16, 16))).unwrap();
    assert_eq!(a, b);
}

#[test]
fn non_positive_sizes_are_rejected_before_rendering() {
    let mut ctx = context(20, 20);
    for size in [(0, 10), (10, 0), (0, 0)] {
        assert_eq!(
            ctx.export_image(Some(size)),
            Err(WaveError::InvalidTargetSize {
                width: size.0,
                height: size.1
            })
        );
    }
    assert!(matches!(
        ctx.export_image(Some((EXPORT_MAX_DIMENSION + 1, 4))),
        Err(WaveError::InvalidTargetSize { .. })
    ));
    assert!(!ctx.export_in_progress());
    assert!(ctx.export_image(Some((4, 4))).is_ok());
}

#[test]
fn second_export_while_first_is_pending_is_rejected() {
    let mut ctx = context(20, 20);
    ctx.pointer_down(Vec2::new(15.0, 5.0)).unwrap();

    let job = ctx.begin_export(Some((12, 9))).unwrap();
    assert!(ctx.export_in_progress());
    assert_eq!(
        ctx.export_image(Some((12, 9))),
        Err(WaveError::ExportInProgress)
    );
    assert_eq!(ctx.begin_export(None).unwrap_err(), WaveError::ExportInProgress);

    let pixels = ctx.finish_export(job).unwrap();
    assert_eq!((pixels.width, pixels.height), (12, 9));
    assert!(!ctx.export_in_progress());
    assert!(ctx.export_image(Some((12, 9))).is_ok());
}

#[test]
fn dropped_job_releases_the_exporter() {
    let ctx = context(20, 20);
    let job = ctx.begin_export(None).unwrap();
    assert_eq!(job.size(), (20, 20));
    drop(job);
    assert!(!ctx.export_in_progress());
}

#[test]
fn failed_compile_during_export_releases_the_exporter() {
    let exporter = OffscreenExporter::new();
    let mut backend = SoftwareBackend::new(8, 8);
    let mut src = synthesize(&[], DisplayMode::Both, false);
    src.text.push_str("\nfn dangling(\n");
    let err = exporter
        .export_image(&mut backend, &src, &[], 8, 8)
        .unwrap_err();
    assert!(matches!(err, WaveError::CompileFailure { .. }));
    assert!(!exporter.is_busy());
}

#[test]
fn export_leaves_on_screen_program_alone() {
    let mut ctx = context(24, 24);
    ctx.pointer_down(Vec2::new(4.0, 20.0)).unwrap();
    let compiles = ctx.surface().compile_count();
    let before = ctx.surface().current_source().cloned();
    ctx.export_image(Some((48, 10))).unwrap();
    assert_eq!(ctx.surface().compile_count(), compiles);
    assert_eq!(ctx.surface().current_source().cloned(), before);
    assert_eq!(ctx.surface().resolution(), Vec2::new(24.0, 24.0));
}
