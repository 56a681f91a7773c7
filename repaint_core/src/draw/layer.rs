// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer records and their generational arena.

use crate::area::Area;
use crate::color::ColorFormat;
use crate::pixbuf::SharedBuffer;

use super::id::LayerId;
use super::task::DrawTask;

/// A drawing surface and the tasks targeting it.
#[derive(Debug)]
pub(crate) struct Layer {
    /// Area the buffer covers, in display coordinates.
    pub(crate) area: Area,
    pub(crate) format: ColorFormat,
    /// The layer this one is composited into; `None` for the root.
    pub(crate) parent: Option<LayerId>,
    /// Allocated when the first task is taken.
    pub(crate) buffer: Option<SharedBuffer>,
    /// Tasks in creation order.
    pub(crate) tasks: Vec<DrawTask>,
    /// Set once the composite into the parent has been queued.
    pub(crate) all_tasks_added: bool,
}

impl Layer {
    pub(crate) fn new(area: Area, format: ColorFormat, parent: Option<LayerId>) -> Self {
        Self {
            area,
            format,
            parent,
            buffer: None,
            tasks: Vec::new(),
            all_tasks_added: false,
        }
    }
}

/// Slot storage for layers.
///
/// Freed slots are recycled through a free list; generation counters make
/// handles to freed layers fail lookups.
#[derive(Debug, Default)]
pub(crate) struct LayerArena {
    slots: Vec<Option<Layer>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    /// Live layers in creation order. Dispatch walks this, so parents are
    /// visited before their children.
    order: Vec<LayerId>,
}

impl LayerArena {
    pub(crate) fn insert(&mut self, layer: Layer) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            self.slots[idx as usize] = Some(layer);
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "a display never holds anywhere near u32::MAX layers"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Some(layer));
            self.generation.push(0);
            idx
        };
        let id = LayerId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.order.push(id);
        id
    }

    /// Removes a layer, returning it so its buffer is dropped by the caller.
    pub(crate) fn remove(&mut self, id: LayerId) -> Option<Layer> {
        if !self.is_alive(id) {
            return None;
        }
        let layer = self.slots[id.idx as usize].take();
        self.free_list.push(id.idx);
        self.order.retain(|l| *l != id);
        layer
    }

    pub(crate) fn is_alive(&self, id: LayerId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].is_some()
    }

    pub(crate) fn get(&self, id: LayerId) -> Option<&Layer> {
        if !self.is_alive(id) {
            return None;
        }
        self.slots[id.idx as usize].as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        if !self.is_alive(id) {
            return None;
        }
        self.slots[id.idx as usize].as_mut()
    }

    /// Live layers in creation order.
    pub(crate) fn order(&self) -> &[LayerId] {
        &self.order
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
