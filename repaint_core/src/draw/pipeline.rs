// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer lifecycle and task dispatch.
//!
//! The pipeline owns every layer of one display: the root layer, which
//! draws into the render buffer, and the offscreen layers created for
//! isolated objects. Tasks are appended to a layer's list and handed to
//! draw units by [`DrawPipeline::dispatch`]:
//!
//! ```text
//!   for each layer, in creation order:
//!     drop Ready tasks ──► free the source layer of finished composites
//!     layer complete?  ──► promote the parent's Waiting composite
//!     otherwise        ──► offer the layer to every draw unit
//! ```
//!
//! Draw units may run tasks inline while the pipeline is locked, or send
//! them to worker threads and report back through [`TaskJob::finish`].
//! Every completion requests another dispatch round.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::area::Area;
use crate::color::ColorFormat;
use crate::error::DrawError;
use crate::pixbuf::{PixelBuf, SharedBuffer};

use super::id::{LayerId, TaskId};
use super::layer::{Layer, LayerArena};
use super::signal::DispatchSignal;
use super::task::{self, DrawDescriptor, DrawTask, LayerDescriptor, TaskState};

/// What a draw unit did when offered a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// The unit wants no more work this round; later units are not asked.
    Refused,
    /// Nothing was taken.
    Idle,
    /// This many tasks were taken.
    Taken(usize),
}

/// An executor of draw tasks.
///
/// `dispatch` is called with the pipeline locked. A unit either runs the
/// jobs it takes right away and hands them back with
/// [`TaskQueue::complete`], or moves them elsewhere and calls
/// [`TaskJob::finish`] once done. A unit must not call back into the
/// pipeline from `dispatch`.
pub trait DrawUnit: Send {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Takes tasks from `queue`.
    fn dispatch(&mut self, queue: &mut TaskQueue<'_>) -> DispatchOutcome;
}

/// Counters describing pipeline activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Offscreen layers created.
    pub layers_created: u64,
    /// Offscreen layers with an alpha format created.
    pub alpha_layers_created: u64,
    /// Offscreen layers freed after their composite finished.
    pub layers_freed: u64,
    /// Tasks added.
    pub tasks_created: u64,
    /// Tasks that reached `Ready`.
    pub tasks_finished: u64,
    /// Tasks dropped because their layer buffer could not be allocated, or
    /// because no draw unit would take them.
    pub tasks_dropped: u64,
}

/// What one dispatch round achieved.
#[derive(Clone, Copy, Debug)]
struct Round {
    taken: bool,
    /// Tasks remain but nothing was taken, removed or promoted, and nothing
    /// is in flight.
    stalled: bool,
}

struct PipelineState {
    layers: LayerArena,
    units: Vec<Box<dyn DrawUnit>>,
    in_flight: usize,
    next_task: u64,
    stats: PipelineStats,
}

impl core::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let units: Vec<&str> = self.units.iter().map(|u| u.name()).collect();
        f.debug_struct("PipelineState")
            .field("layers", &self.layers.len())
            .field("units", &units)
            .field("in_flight", &self.in_flight)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Layers, tasks and draw units of one display.
#[derive(Debug)]
pub struct DrawPipeline {
    state: Mutex<PipelineState>,
    signal: DispatchSignal,
    screen: Area,
    this: Weak<Self>,
}

impl DrawPipeline {
    /// Creates a pipeline for a screen with the given draw units.
    #[must_use]
    pub fn new(screen: Area, units: Vec<Box<dyn DrawUnit>>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(PipelineState {
                layers: LayerArena::default(),
                units,
                in_flight: 0,
                next_task: 0,
                stats: PipelineStats::default(),
            }),
            signal: DispatchSignal::new(),
            screen,
            this: this.clone(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a draw unit. Units are offered work in the order added.
    pub fn add_unit(&self, unit: Box<dyn DrawUnit>) {
        self.lock_state().units.push(unit);
    }

    /// The screen area.
    #[inline]
    #[must_use]
    pub fn screen(&self) -> Area {
        self.screen
    }

    /// Creates a root layer drawing into `buffer`.
    pub fn create_root(&self, buffer: SharedBuffer, area: Area, format: ColorFormat) -> LayerId {
        let mut layer = Layer::new(area, format, None);
        layer.buffer = Some(buffer);
        self.lock_state().layers.insert(layer)
    }

    /// Points a root layer at a new buffer region.
    ///
    /// The layer must have no outstanding tasks.
    pub fn set_target(
        &self,
        layer: LayerId,
        buffer: SharedBuffer,
        area: Area,
    ) -> Result<(), DrawError> {
        let mut state = self.lock_state();
        let l = state
            .layers
            .get_mut(layer)
            .ok_or(DrawError::StaleLayer(layer))?;
        debug_assert!(l.tasks.is_empty(), "retargeting a layer with pending tasks");
        l.buffer = Some(buffer);
        l.area = area;
        Ok(())
    }

    /// Creates an offscreen layer that will be composited into `parent`.
    ///
    /// The buffer is allocated when the first task is taken.
    pub fn create_layer(
        &self,
        parent: LayerId,
        area: Area,
        format: ColorFormat,
    ) -> Result<LayerId, DrawError> {
        let mut state = self.lock_state();
        if !state.layers.is_alive(parent) {
            return Err(DrawError::StaleLayer(parent));
        }
        state.stats.layers_created += 1;
        if format.has_alpha() {
            state.stats.alpha_layers_created += 1;
        }
        Ok(state.layers.insert(Layer::new(area, format, Some(parent))))
    }

    /// The area and format of a layer.
    #[must_use]
    pub fn layer_info(&self, layer: LayerId) -> Option<(Area, ColorFormat)> {
        self.lock_state().layers.get(layer).map(|l| (l.area, l.format))
    }

    /// Whether the layer still exists.
    #[must_use]
    pub fn is_alive(&self, layer: LayerId) -> bool {
        self.lock_state().layers.is_alive(layer)
    }

    /// Number of live layers, the root included.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.lock_state().layers.len()
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.lock_state().stats
    }

    /// Queues a task drawing `area` clipped to `clip`, then dispatches.
    ///
    /// Returns `Ok(None)` when the area lies outside the clip.
    pub fn add_task(
        &self,
        layer: LayerId,
        area: Area,
        clip: Area,
        descriptor: DrawDescriptor,
    ) -> Result<Option<TaskId>, DrawError> {
        debug_assert!(
            descriptor.source_layer().is_none(),
            "layer composites go through add_composite"
        );
        let Some(bounds) = area.intersect(&clip) else {
            return Ok(None);
        };
        let id = self.push_task(layer, area, clip, bounds, TaskState::Queued, descriptor)?;
        self.dispatch();
        Ok(Some(id))
    }

    /// Queues the composite of `desc.source` into `parent`.
    ///
    /// The source layer is closed for new tasks. The composite waits until
    /// every task on the source has finished.
    pub fn add_composite(
        &self,
        parent: LayerId,
        area: Area,
        clip: Area,
        desc: LayerDescriptor,
    ) -> Result<TaskId, DrawError> {
        {
            let mut state = self.lock_state();
            let source = state
                .layers
                .get_mut(desc.source)
                .ok_or(DrawError::StaleLayer(desc.source))?;
            source.all_tasks_added = true;
        }
        // A composite is never dropped: it owns the source layer.
        let bounds = area.intersect(&clip).unwrap_or(area);
        let id = self.push_task(
            parent,
            area,
            clip,
            bounds,
            TaskState::Waiting,
            DrawDescriptor::Layer(desc),
        )?;
        self.dispatch();
        Ok(id)
    }

    fn push_task(
        &self,
        layer: LayerId,
        area: Area,
        clip: Area,
        bounds: Area,
        state: TaskState,
        descriptor: DrawDescriptor,
    ) -> Result<TaskId, DrawError> {
        let mut st = self.lock_state();
        let id = TaskId(st.next_task);
        let l = st.layers.get_mut(layer).ok_or(DrawError::StaleLayer(layer))?;
        l.tasks.push(DrawTask {
            id,
            area,
            clip,
            bounds,
            state,
            descriptor: Arc::new(descriptor),
        });
        st.next_task += 1;
        st.stats.tasks_created += 1;
        Ok(id)
    }

    /// Whether the layer has tasks that were not yet removed.
    #[must_use]
    pub fn has_tasks(&self, layer: LayerId) -> bool {
        self.lock_state()
            .layers
            .get(layer)
            .is_some_and(|l| !l.tasks.is_empty())
    }

    /// Runs one dispatch round over every layer.
    ///
    /// Returns whether any unit took a task.
    pub fn dispatch(&self) -> bool {
        self.round().taken
    }

    fn round(&self) -> Round {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let mut one_taken = false;
        let mut changed = false;
        let mut pending = false;

        let order = state.layers.order().to_vec();
        for id in order {
            let Some(layer) = state.layers.get_mut(id) else {
                // Consumed earlier in this round.
                continue;
            };

            let mut consumed = Vec::new();
            let before = layer.tasks.len();
            layer.tasks.retain(|t| {
                if t.state != TaskState::Ready {
                    return true;
                }
                if let Some(src) = t.descriptor.source_layer() {
                    consumed.push(src);
                }
                false
            });
            changed |= layer.tasks.len() != before;
            pending |= !layer.tasks.is_empty();
            let parent = layer.parent;
            let complete = layer.all_tasks_added && layer.tasks.is_empty();

            for src in consumed {
                if state.layers.remove(src).is_some() {
                    state.stats.layers_freed += 1;
                } else {
                    log::warn!("composite source {src:?} was already freed");
                }
            }

            if let (Some(parent), true) = (parent, complete) {
                if promote_composite(&mut state.layers, parent, id) {
                    changed = true;
                    self.signal.request();
                }
                continue;
            }

            for unit in &mut state.units {
                let mut queue = TaskQueue {
                    layer: id,
                    layers: &mut state.layers,
                    in_flight: &mut state.in_flight,
                    stats: &mut state.stats,
                    screen: self.screen,
                    signal: &self.signal,
                    pipeline: &self.this,
                };
                match unit.dispatch(&mut queue) {
                    DispatchOutcome::Refused => break,
                    DispatchOutcome::Idle => {}
                    DispatchOutcome::Taken(n) => one_taken |= n > 0,
                }
            }
        }

        // With work in flight, its completion will request the next round.
        if !one_taken && state.in_flight == 0 {
            self.signal.request();
        }
        Round {
            taken: one_taken,
            stalled: pending && !one_taken && !changed && state.in_flight == 0,
        }
    }

    /// Blocks until a dispatch round is requested.
    pub fn wait_for_request(&self) {
        self.signal.wait();
    }

    /// Requests a dispatch round.
    pub fn request(&self) {
        self.signal.request();
    }

    /// Dispatches until every task of `layer` is finished and removed.
    ///
    /// If a round makes no progress while nothing is in flight, no unit
    /// will ever take the remaining tasks: they are dropped together with
    /// every offscreen layer.
    pub fn finish(&self, layer: LayerId) {
        while self.has_tasks(layer) {
            self.wait_for_request();
            if self.round().stalled {
                self.abandon();
            }
        }
    }

    fn abandon(&self) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let mut dropped = 0;
        let order = state.layers.order().to_vec();
        for id in order {
            let Some(layer) = state.layers.get_mut(id) else {
                continue;
            };
            dropped += layer.tasks.len();
            layer.tasks.clear();
            if layer.parent.is_some() && state.layers.remove(id).is_some() {
                state.stats.layers_freed += 1;
            }
        }
        state.stats.tasks_dropped += dropped as u64;
        let units: Vec<&str> = state.units.iter().map(|u| u.name()).collect();
        log::error!("no draw unit takes the remaining tasks; dropped {dropped} (units: {units:?})");
    }

    fn complete(&self, layer: LayerId, task: TaskId) {
        {
            let mut state = self.lock_state();
            let state = &mut *state;
            mark_ready(&mut state.layers, layer, task);
            state.in_flight = state.in_flight.saturating_sub(1);
            state.stats.tasks_finished += 1;
        }
        self.signal.request();
    }
}

/// Moves the parent's waiting composite of `source` to `Queued`.
fn promote_composite(layers: &mut LayerArena, parent: LayerId, source: LayerId) -> bool {
    let Some(parent) = layers.get_mut(parent) else {
        return false;
    };
    let waiting = parent.tasks.iter_mut().find(|t| {
        t.state == TaskState::Waiting && t.descriptor.source_layer() == Some(source)
    });
    match waiting {
        Some(t) => {
            t.state = TaskState::Queued;
            true
        }
        None => false,
    }
}

fn mark_ready(layers: &mut LayerArena, layer: LayerId, task: TaskId) {
    let slot = layers
        .get_mut(layer)
        .and_then(|l| l.tasks.iter_mut().find(|t| t.id == task));
    match slot {
        Some(t) => t.state = TaskState::Ready,
        None => log::warn!("finished {task:?} is no longer on {layer:?}"),
    }
}

/// A layer's task list as seen by a draw unit during dispatch.
#[derive(Debug)]
pub struct TaskQueue<'a> {
    layer: LayerId,
    layers: &'a mut LayerArena,
    in_flight: &'a mut usize,
    stats: &'a mut PipelineStats,
    screen: Area,
    signal: &'a DispatchSignal,
    pipeline: &'a Weak<DrawPipeline>,
}

impl TaskQueue<'_> {
    /// The layer being offered.
    #[inline]
    #[must_use]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Takes the first queued task that does not overlap an unfinished
    /// earlier task of the layer.
    ///
    /// The task is marked in progress before it is returned, so no other
    /// unit can take it.
    pub fn next_available(&mut self) -> Option<TaskJob> {
        loop {
            let layer = self.layers.get_mut(self.layer)?;
            let idx = task::next_available(&layer.tasks, &self.screen)?;

            let existing = layer.buffer.clone();
            let target = match existing {
                Some(buf) => buf,
                None => match PixelBuf::try_new(layer.area, layer.format) {
                    Ok(buf) => {
                        let buf = Arc::new(Mutex::new(buf));
                        layer.buffer = Some(buf.clone());
                        buf
                    }
                    Err(err) => {
                        log::error!("{:?}: {err}; dropping its tasks", self.layer);
                        layer.tasks[idx].state = TaskState::Ready;
                        self.stats.tasks_dropped += 1;
                        self.signal.request();
                        continue;
                    }
                },
            };

            let t = &mut layer.tasks[idx];
            t.state = TaskState::InProgress;
            let (id, area, clip, descriptor) = (t.id, t.area, t.clip, t.descriptor.clone());
            let source = descriptor
                .source_layer()
                .and_then(|src| self.layers.get(src))
                .and_then(|src| src.buffer.clone());
            *self.in_flight += 1;

            return Some(TaskJob {
                layer: self.layer,
                task: id,
                area,
                clip,
                descriptor,
                target,
                source,
                pipeline: self.pipeline.clone(),
            });
        }
    }

    /// Marks a job taken from this queue as finished.
    ///
    /// For units that run jobs inline during dispatch.
    pub fn complete(&mut self, job: TaskJob) {
        mark_ready(self.layers, job.layer, job.task);
        *self.in_flight = self.in_flight.saturating_sub(1);
        self.stats.tasks_finished += 1;
        self.signal.request();
    }
}

/// A task taken by a draw unit.
///
/// Every job must be handed back exactly once, through
/// [`TaskQueue::complete`] or [`TaskJob::finish`]. Buffer locks taken while
/// executing must be released before that.
#[derive(Debug)]
pub struct TaskJob {
    layer: LayerId,
    task: TaskId,
    /// Area the task draws to.
    pub area: Area,
    /// Clip the drawing is limited to.
    pub clip: Area,
    /// What to draw.
    pub descriptor: Arc<DrawDescriptor>,
    /// Buffer of the target layer.
    pub target: SharedBuffer,
    /// Buffer of the source layer for composites. `None` if the source
    /// never drew anything.
    pub source: Option<SharedBuffer>,
    pipeline: Weak<DrawPipeline>,
}

impl TaskJob {
    /// The task's id.
    #[inline]
    #[must_use]
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// The target layer.
    #[inline]
    #[must_use]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Reports the job finished from outside a dispatch round.
    pub fn finish(self) {
        let Self {
            layer,
            task,
            pipeline,
            ..
        } = self;
        if let Some(pipeline) = pipeline.upgrade() {
            pipeline.complete(layer, task);
        }
    }
}
