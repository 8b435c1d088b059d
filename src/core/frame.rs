// Frame-slot allocation. Slots are dense non-negative indices handed out in
// insertion order; each logical identifier gets at most one slot during
// lowering. The post-optimizer sharing pass may later coalesce identifiers
// with disjoint lifetimes onto one slot; the descriptors for that live in
// FrameSharingInfo and are produced by the peephole module.

//! The frame allocator and frame metadata types.

use std::collections::HashMap;

use super::error::{CompileError, CompileResult};
use super::ident::Ident;

/// A global referenced by the function, with its frame slot.
#[derive(Clone, Copy, Debug)]
pub struct GlobalInfo<'a> {
    pub id: Ident<'a>,
    pub slot: u32,
}

/// A group of identifiers sharing one frame slot.
///
/// `ids` and `id_start` run in parallel: `id_start[i]` is the instruction
/// index where `ids[i]`'s live range begins. Before finalization the starts
/// and `scope_end` are in provisional numbering; the finalizer projects both
/// onto the compacted numbering.
#[derive(Clone, Debug)]
pub struct FrameSharingInfo<'a> {
    pub ids: Vec<Ident<'a>>,
    pub id_start: Vec<usize>,
    /// One past the last instruction of the group's live range.
    pub scope_end: usize,
    pub is_managed: bool,
}

/// Assigns dense slot indices to identifiers in insertion order.
#[derive(Debug, Default)]
pub struct FrameAllocator<'a> {
    layout: Vec<(Ident<'a>, u32)>,
    slots: HashMap<&'a str, u32>,
}

impl<'a> FrameAllocator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new slot for the identifier and return its index.
    pub fn add_to_frame(&mut self, id: Ident<'a>) -> CompileResult<u32> {
        if self.slots.contains_key(id.name()) {
            return Err(CompileError::DuplicateSlot {
                name: id.name().to_string(),
            });
        }
        let slot = self.layout.len() as u32;
        self.layout.push((id, slot));
        self.slots.insert(id.name(), slot);
        Ok(slot)
    }

    pub fn has_frame_slot(&self, id: &Ident<'a>) -> bool {
        self.slots.contains_key(id.name())
    }

    pub fn slot_of(&self, id: &Ident<'a>) -> Option<u32> {
        self.slots.get(id.name()).copied()
    }

    /// Number of slots allocated.
    pub fn size(&self) -> usize {
        self.layout.len()
    }

    /// The layout in insertion order; slot indices are dense.
    pub fn layout(&self) -> &[(Ident<'a>, u32)] {
        &self.layout
    }

    /// The slots whose identifier's type is managed.
    pub fn classify_managed(&self) -> Vec<u32> {
        self.layout
            .iter()
            .filter(|(id, _)| id.is_managed())
            .map(|&(_, slot)| slot)
            .collect()
    }
}
