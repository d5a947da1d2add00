//! Variable frames and the arena that owns them.
//!
//! A frame maps variable names to absolute operand-stack slots. Exactly one
//! frame is current. CALL parks the caller's frame in the arena and records
//! its [`FrameId`] in a `SavedFrame` stack cell; RET reinstates it and
//! releases the callee's slot. Frames are only reachable through ids, so a
//! parked frame cannot be aliased or mutated while it waits.

use std::collections::BTreeMap;
use std::fmt;

/// Index of a frame in the [`FrameArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) usize);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Variable bindings of one call (or of the top level).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    slots: BTreeMap<String, usize>,
}

impl Frame {
    /// An empty frame with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack slot bound to `name`.
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    /// Whether `name` is declared in this frame.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Bind `name` to `slot`. Returns false if `name` was already bound.
    pub fn bind(&mut self, name: &str, slot: usize) -> bool {
        if self.slots.contains_key(name) {
            return false;
        }
        self.slots.insert(name.to_string(), slot);
        true
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.slots.iter().map(|(name, &slot)| (name.as_str(), slot))
    }
}

/// Growable arena of frames. Released slots are reused.
#[derive(Debug, Clone, Default)]
pub struct FrameArena {
    slots: Vec<Option<Frame>>,
    free: Vec<usize>,
}

impl FrameArena {
    /// An arena holding no frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `frame` into the arena.
    pub fn alloc(&mut self, frame: Frame) -> FrameId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(frame);
                FrameId(index)
            }
            None => {
                self.slots.push(Some(frame));
                FrameId(self.slots.len() - 1)
            }
        }
    }

    /// Move a frame back out of the arena, freeing its slot.
    pub fn release(&mut self, id: FrameId) -> Option<Frame> {
        let frame = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(frame)
    }

    /// The frame behind `id`, or `None` once it has been released.
    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.slots.get(id.0)?.as_ref()
    }

    /// Mutable access to the frame behind `id`.
    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Number of frames currently held (current plus parked).
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
