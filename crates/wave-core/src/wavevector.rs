//! Ordered collection of active wavevectors.
//!
//! Entries are addressed two ways: by a [`WavevectorHandle`] that stays valid
//! until the store is cleared, and by a dense index `0..N-1` that names the
//! entry's `k<i>` uniform in the synthesized program. Dense indices follow
//! insertion order and are reassigned whenever the set changes size.

use glam::Vec2;
use smallvec::SmallVec;

use crate::constants::FieldParams;
use crate::error::{Result, WaveError};

/// Identity of one wavevector for as long as it exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WavevectorHandle(u64);

/// One plane-wave contributor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wavevector {
    pub index: usize,
    pub k: Vec2,
    pub screen_position: Vec2,
}

impl Wavevector {
    #[inline]
    pub fn kx(&self) -> f32 {
        self.k.x
    }
    #[inline]
    pub fn ky(&self) -> f32 {
        self.k.y
    }
}

/// Change notifications, consumed by whoever drives synthesis and binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// The number of entries changed; the program must be resynthesized.
    SetChanged,
    /// Only k values moved; a uniform push is enough.
    ValuesChanged,
}

#[derive(Clone, Debug)]
struct Entry {
    handle: WavevectorHandle,
    k: Vec2,
    screen_position: Vec2,
}

pub struct WavevectorStore {
    entries: Vec<Entry>,
    params: FieldParams,
    canvas_size: Vec2,
    next_handle: u64,
    pending: SmallVec<[StoreEvent; 4]>,
}

/// Map a screen position to a wavevector: offset from the canvas center,
/// normalized by the shorter canvas side and scaled to angular frequency.
#[inline]
pub fn wavevector_from_screen(position: Vec2, canvas_size: Vec2, k_scale: f32) -> Vec2 {
    let length = canvas_size.x.min(canvas_size.y).max(1.0);
    let center = canvas_size * 0.5;
    (position - center) / length * k_scale
}

impl WavevectorStore {
    pub fn new(canvas_width: u32, canvas_height: u32, params: FieldParams) -> Self {
        Self {
            entries: Vec::new(),
            params,
            canvas_size: Vec2::new(canvas_width as f32, canvas_height as f32),
            next_handle: 0,
            pending: SmallVec::new(),
        }
    }

    pub fn params(&self) -> FieldParams {
        self.params
    }

    pub fn canvas_size(&self) -> Vec2 {
        self.canvas_size
    }

    /// Later adds and updates map positions against the new size. Existing
    /// k values are left alone.
    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_size = Vec2::new(width as f32, height as f32);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, screen_position: Vec2) -> WavevectorHandle {
        let handle = WavevectorHandle(self.next_handle);
        self.next_handle += 1;
        let k = wavevector_from_screen(screen_position, self.canvas_size, self.params.k_scale);
        self.entries.push(Entry {
            handle,
            k,
            screen_position,
        });
        log::debug!(
            "[store] add k{} = ({:.3}, {:.3})",
            self.entries.len() - 1,
            k.x,
            k.y
        );
        self.emit(StoreEvent::SetChanged);
        handle
    }

    pub fn update(&mut self, handle: WavevectorHandle, screen_position: Vec2) -> Result<()> {
        let k = wavevector_from_screen(screen_position, self.canvas_size, self.params.k_scale);
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.handle == handle)
            .ok_or(WaveError::UnknownHandle(handle))?;
        entry.k = k;
        entry.screen_position = screen_position;
        self.emit(StoreEvent::ValuesChanged);
        Ok(())
    }

    pub fn clear(&mut self) {
        log::debug!("[store] clear {} wavevectors", self.entries.len());
        self.entries.clear();
        self.emit(StoreEvent::SetChanged);
    }

    /// Dense index of a live handle.
    pub fn index_of(&self, handle: WavevectorHandle) -> Option<usize> {
        self.entries.iter().position(|e| e.handle == handle)
    }

    pub fn get(&self, handle: WavevectorHandle) -> Option<Wavevector> {
        self.index_of(handle).map(|i| self.wavevector_at(i))
    }

    /// Most recently added marker whose center lies within the marker radius.
    pub fn hit_test(&self, position: Vec2) -> Option<WavevectorHandle> {
        let r2 = self.params.marker_radius_px * self.params.marker_radius_px;
        self.entries
            .iter()
            .rev()
            .find(|e| e.screen_position.distance_squared(position) <= r2)
            .map(|e| e.handle)
    }

    /// Ordered snapshot with dense indices.
    pub fn snapshot(&self) -> Vec<Wavevector> {
        (0..self.entries.len()).map(|i| self.wavevector_at(i)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Wavevector> + '_ {
        (0..self.entries.len()).map(move |i| self.wavevector_at(i))
    }

    /// Pending events, oldest first. Repeats of the same event in a row are
    /// collapsed into one.
    pub fn drain_events(&mut self) -> SmallVec<[StoreEvent; 4]> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    fn wavevector_at(&self, index: usize) -> Wavevector {
        let e = &self.entries[index];
        Wavevector {
            index,
            k: e.k,
            screen_position: e.screen_position,
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        if self.pending.last() != Some(&event) {
            self.pending.push(event);
        }
    }
}
