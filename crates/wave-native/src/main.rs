mod export;
mod gpu;

use std::path::PathBuf;

use anyhow::anyhow;
use glam::{Vec2, Vec4};
use wave_core::{
    Clock, DisplayMode, FieldParams, FrameContext, SystemClock, MAX_TIME_RATE, MIN_TIME_RATE,
    TIME_RATE_STEP,
};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use gpu::{MarkerInstance, WgpuBackend};

const MARKER_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.75);
const MARKER_HOVER_COLOR: Vec4 = Vec4::new(1.0, 1.0, 0.6, 0.9);
const MARKER_DRAG_COLOR: Vec4 = Vec4::new(1.0, 0.55, 0.1, 1.0);

#[derive(Clone, Copy, Debug, PartialEq)]
enum Action {
    Mode(DisplayMode),
    NextMode,
    ToggleTime,
    FasterTime,
    SlowerTime,
    Reset,
    /// Export at `scale` times the canvas size.
    Export { scale: u32 },
}

fn key_action(key: Key<&str>) -> Option<Action> {
    match key {
        Key::Character("1") => Some(Action::Mode(DisplayMode::Both)),
        Key::Character("2") => Some(Action::Mode(DisplayMode::IntensityOnly)),
        Key::Character("3") => Some(Action::Mode(DisplayMode::PhaseOnly)),
        Key::Character(c) if c.eq_ignore_ascii_case("r") => Some(Action::Reset),
        Key::Character(c) if c.eq_ignore_ascii_case("s") => Some(Action::Export { scale: 1 }),
        Key::Character(c) if c.eq_ignore_ascii_case("e") => Some(Action::Export { scale: 2 }),
        Key::Named(NamedKey::Tab) => Some(Action::NextMode),
        Key::Named(NamedKey::Space) => Some(Action::ToggleTime),
        Key::Named(NamedKey::ArrowUp) => Some(Action::FasterTime),
        Key::Named(NamedKey::ArrowDown) => Some(Action::SlowerTime),
        _ => None,
    }
}

/// Seconds per phase turn after one up/down step.
fn stepped_rate(rate: f32, faster: bool) -> f32 {
    let next = if faster {
        rate / TIME_RATE_STEP
    } else {
        rate * TIME_RATE_STEP
    };
    next.clamp(MIN_TIME_RATE, MAX_TIME_RATE)
}

struct App<'w> {
    ctx: FrameContext<WgpuBackend<'w>>,
    clock: SystemClock,
    cursor: Vec2,
    export_dir: PathBuf,
}

impl<'w> App<'w> {
    fn new(backend: WgpuBackend<'w>, export_dir: PathBuf) -> Self {
        let (width, height) = backend.surface_size();
        let ctx = FrameContext::new(backend, width, height, FieldParams::default());
        let app = Self {
            ctx,
            clock: SystemClock::new(),
            cursor: Vec2::ZERO,
            export_dir,
        };
        app.update_title();
        app
    }

    fn window(&self) -> &'w winit::window::Window {
        self.ctx.surface().backend().window
    }

    fn update_title(&self) {
        let anim = self.ctx.animation();
        let time = if anim.time_active() {
            format!("{:.2}s/turn", anim.time_rate())
        } else {
            "paused".to_string()
        };
        self.window().set_title(&format!(
            "wavefield | {} waves | {} | {}",
            self.ctx.store().len(),
            self.ctx.mode(),
            time
        ));
    }

    fn pointer(&mut self, event: wave_core::PointerEvent) {
        let before = self.ctx.store().len();
        if let Err(e) = self.ctx.handle_pointer(event) {
            log::warn!("[input] {}", e);
        }
        if self.ctx.store().len() != before {
            self.update_title();
        }
    }

    fn apply(&mut self, action: Action) {
        let result = match action {
            Action::Mode(mode) => self.ctx.set_mode(mode),
            Action::NextMode => {
                let mode = self.ctx.mode().next();
                self.ctx.set_mode(mode)
            }
            Action::ToggleTime => {
                let active = !self.ctx.animation().time_active();
                self.ctx.set_time_active(active)
            }
            Action::FasterTime | Action::SlowerTime => {
                let rate = stepped_rate(
                    self.ctx.animation().time_rate(),
                    action == Action::FasterTime,
                );
                self.ctx.set_time_rate(rate)
            }
            Action::Reset => self.ctx.reset(),
            Action::Export { scale } => {
                self.export(scale);
                Ok(())
            }
        };
        if let Err(e) = result {
            log::warn!("[controls] {:?}: {}", action, e);
        }
        self.update_title();
    }

    fn export(&mut self, scale: u32) {
        let (w, h) = self.ctx.canvas_size();
        let pixels = match self.ctx.export_image(Some((w * scale, h * scale))) {
            Ok(pixels) => pixels,
            Err(e) => {
                log::warn!("[export] {}", e);
                return;
            }
        };
        if let Err(e) = export::save_next(&pixels, &self.export_dir) {
            log::error!("[export] {:#}", e);
        }
    }

    fn update_markers(&mut self) {
        let radius = self.ctx.store().params().marker_radius_px;
        let dragging = self
            .ctx
            .input()
            .dragging()
            .and_then(|h| self.ctx.store().index_of(h));
        let hovered = self
            .ctx
            .input()
            .hovered()
            .and_then(|h| self.ctx.store().index_of(h));
        let instances: Vec<MarkerInstance> = self
            .ctx
            .store()
            .iter()
            .map(|wv| {
                let color = if Some(wv.index) == dragging {
                    MARKER_DRAG_COLOR
                } else if Some(wv.index) == hovered {
                    MARKER_HOVER_COLOR
                } else {
                    MARKER_COLOR
                };
                MarkerInstance::new(wv.screen_position, radius, color)
            })
            .collect();
        self.ctx.surface_mut().backend_mut().set_markers(&instances);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.update_markers();
        self.ctx.frame(self.clock.now())
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.ctx.resize(size.width, size.height);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let export_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    if !export_dir.is_dir() {
        return Err(anyhow!("export directory {} does not exist", export_dir.display()));
    }

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("wavefield")
        .with_inner_size(winit::dpi::LogicalSize::new(800.0, 800.0))
        .build(&event_loop)?;

    let backend = pollster::block_on(WgpuBackend::new(&window))?;
    let mut app = App::new(backend, export_dir);
    log::info!("[app] 1/2/3/tab mode, space time, up/down rate, r reset, s/e export");

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => app.resize(size),
            WindowEvent::CursorMoved { position, .. } => {
                app.cursor = Vec2::new(position.x as f32, position.y as f32);
                app.pointer(wave_core::PointerEvent::Move(app.cursor));
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let event = match state {
                    ElementState::Pressed => wave_core::PointerEvent::Down(app.cursor),
                    ElementState::Released => wave_core::PointerEvent::Up(app.cursor),
                };
                app.pointer(event);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(action) = key_action(logical_key.as_ref()) {
                    app.apply(action);
                }
            }
            _ => {}
        },
        Event::AboutToWait => match app.render() {
            Ok(_) => app.window().request_redraw(),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                app.resize(app.window().inner_size())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
            Err(e) => log::warn!("[gpu] {}", e),
        },
        _ => {}
    })?;
    Ok(())
}
