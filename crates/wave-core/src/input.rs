use glam::Vec2;

use crate::error::Result;
use crate::wavevector::{WavevectorHandle, WavevectorStore};

/// Pointer input in canvas pixel coordinates (origin top-left).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down(Vec2),
    Move(Vec2),
    Up(Vec2),
}

#[derive(Default, Clone, Copy, Debug)]
pub struct MouseState {
    pub position: Vec2,
    pub down: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    /// Pointer-down on empty canvas created a wavevector; it is now dragged.
    Created(WavevectorHandle),
    /// Pointer-down on an existing marker.
    DragStarted(WavevectorHandle),
    Dragged(WavevectorHandle),
    Released(WavevectorHandle),
    Hover(Option<WavevectorHandle>),
    Ignored,
}

/// Turns pointer events into store operations. Hit-testing decides between
/// creating a new wavevector and dragging an existing one.
#[derive(Default, Debug)]
pub struct InputController {
    mouse: MouseState,
    drag: Option<WavevectorHandle>,
    hover: Option<WavevectorHandle>,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mouse(&self) -> MouseState {
        self.mouse
    }

    pub fn dragging(&self) -> Option<WavevectorHandle> {
        self.drag
    }

    pub fn hovered(&self) -> Option<WavevectorHandle> {
        self.hover
    }

    /// Forget handles that a bulk clear invalidated.
    pub fn reset(&mut self) {
        self.drag = None;
        self.hover = None;
    }

    pub fn handle(&mut self, store: &mut WavevectorStore, event: PointerEvent) -> Result<InputOutcome> {
        match event {
            PointerEvent::Down(p) => Ok(self.pointer_down(store, p)),
            PointerEvent::Move(p) => self.pointer_move(store, p),
            PointerEvent::Up(p) => self.pointer_up(store, p),
        }
    }

    pub fn pointer_down(&mut self, store: &mut WavevectorStore, position: Vec2) -> InputOutcome {
        self.mouse = MouseState {
            position,
            down: true,
        };
        match store.hit_test(position) {
            Some(handle) => {
                log::debug!("[input] begin drag on k{:?}", store.index_of(handle));
                self.drag = Some(handle);
                InputOutcome::DragStarted(handle)
            }
            None => {
                let handle = store.add(position);
                self.drag = Some(handle);
                self.hover = Some(handle);
                InputOutcome::Created(handle)
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        store: &mut WavevectorStore,
        position: Vec2,
    ) -> Result<InputOutcome> {
        self.mouse.position = position;
        match self.drag {
            Some(handle) => {
                if let Err(e) = store.update(handle, position) {
                    self.drag = None;
                    return Err(e);
                }
                Ok(InputOutcome::Dragged(handle))
            }
            None => {
                self.hover = store.hit_test(position);
                Ok(InputOutcome::Hover(self.hover))
            }
        }
    }

    pub fn pointer_up(&mut self, store: &mut WavevectorStore, position: Vec2) -> Result<InputOutcome> {
        self.mouse = MouseState {
            position,
            down: false,
        };
        let Some(handle) = self.drag.take() else {
            return Ok(InputOutcome::Ignored);
        };
        store.update(handle, position)?;
        Ok(InputOutcome::Released(handle))
    }
}
