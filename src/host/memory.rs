//! In-memory host.
//!
//! [`MemoryHost`] models the parts of a browser-like environment the
//! watermark controller relies on, without any event loop:
//!
//! - Elements carry an inline style map and a content size
//! - Every style write queues a `style` mutation record for each observer
//!   watching that element, including writes of an identical value
//! - Size changes queue resize entries, coalesced per element, and
//!   observing an element queues an entry for its current size
//! - [`MemoryHost::flush`] delivers queued notifications in rounds until
//!   nothing is pending, stopping after a bounded number of rounds
//!
//! Callbacks run with no host state borrowed, so they may write styles,
//! resize elements, or disconnect observers.

use super::{
    ContentRect, Element, ElementRef, Host, MutationCallback, MutationObserver, MutationRecord,
    NodeId, ObserveOptions, ResizeCallback, ResizeEntry, ResizeObserver, STYLE_ATTRIBUTE,
};
use crate::watermark::{RasterSurfaceFactory, SurfaceFactory};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Viewport width of a new host.
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

/// Delivery rounds per flush before pending notifications are dropped.
pub const DEFAULT_MAX_ROUNDS: usize = 64;

struct HostInner {
    viewport_width: Cell<f64>,
    resize_supported: Cell<bool>,
    max_rounds: Cell<usize>,
    next_node: Cell<NodeId>,
    elements: RefCell<Vec<Weak<MemoryElement>>>,
    resize_observers: RefCell<Vec<Weak<ResizeObserverState>>>,
    mutation_observers: RefCell<Vec<Weak<MutationObserverState>>>,
}

impl HostInner {
    fn content_rect(&self, id: NodeId) -> Option<ContentRect> {
        self.elements
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .find(|el| el.id == id)
            .map(|el| el.content_size())
    }

    fn live_resize_observers(&self) -> Vec<Rc<ResizeObserverState>> {
        let mut observers = self.resize_observers.borrow_mut();
        observers.retain(|o| o.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }

    fn live_mutation_observers(&self) -> Vec<Rc<MutationObserverState>> {
        let mut observers = self.mutation_observers.borrow_mut();
        observers.retain(|o| o.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }

    fn queue_attribute_mutation(&self, target: ElementRef, attribute: &str) {
        for observer in self.live_mutation_observers() {
            let watching = observer
                .targets
                .borrow()
                .iter()
                .any(|(id, options)| *id == target.node_id() && options.accepts(attribute));
            if watching {
                observer.pending.borrow_mut().push(MutationRecord {
                    target: Rc::clone(&target),
                    attribute_name: Some(attribute.to_string()),
                });
            }
        }
    }

    fn queue_resize(&self, target: ElementRef, content_rect: ContentRect) {
        for observer in self.live_resize_observers() {
            if observer.targets.borrow().contains(&target.node_id()) {
                observer.queue(ResizeEntry {
                    target: Rc::clone(&target),
                    content_rect,
                });
            }
        }
    }
}

/// An element owned by a [`MemoryHost`].
pub struct MemoryElement {
    id: NodeId,
    this: Weak<MemoryElement>,
    host: Weak<HostInner>,
    style: RefCell<BTreeMap<String, String>>,
    content: Cell<ContentRect>,
}

impl std::fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryElement")
            .field("id", &self.id)
            .field("style", &self.style.borrow())
            .field("content", &self.content.get())
            .finish()
    }
}

impl MemoryElement {
    fn as_element_ref(&self) -> Option<ElementRef> {
        self.this.upgrade().map(|el| el as ElementRef)
    }

    fn notify_style_write(&self) {
        if let (Some(host), Some(target)) = (self.host.upgrade(), self.as_element_ref()) {
            host.queue_attribute_mutation(target, STYLE_ATTRIBUTE);
        }
    }

    pub fn content_size(&self) -> ContentRect {
        self.content.get()
    }

    /// Change the content size and queue a resize entry for observers.
    pub fn set_content_size(&self, width: f64, height: f64) {
        let rect = ContentRect::new(width, height);
        self.content.set(rect);
        if let (Some(host), Some(target)) = (self.host.upgrade(), self.as_element_ref()) {
            host.queue_resize(target, rect);
        }
    }

    /// Inline style serialized as `name: value; ...` in property order.
    pub fn style_text(&self) -> String {
        self.style
            .borrow()
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Replace the whole inline style, as external code assigning the
    /// style attribute would.
    pub fn replace_style(&self, text: &str) {
        let parsed = text
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                (!name.is_empty()).then(|| (name, value.to_string()))
            })
            .collect();
        *self.style.borrow_mut() = parsed;
        self.notify_style_write();
    }
}

impl Element for MemoryElement {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn style_property(&self, name: &str) -> Option<String> {
        self.style.borrow().get(name).cloned()
    }

    fn set_style_property(&self, name: &str, value: &str) {
        self.style
            .borrow_mut()
            .insert(name.to_ascii_lowercase(), value.to_string());
        self.notify_style_write();
    }
}

struct ResizeObserverState {
    host: Weak<HostInner>,
    callback: RefCell<ResizeCallback>,
    targets: RefCell<Vec<NodeId>>,
    pending: RefCell<Vec<ResizeEntry>>,
}

impl ResizeObserverState {
    /// Queue `entry`, replacing an older pending entry for the same target.
    fn queue(&self, entry: ResizeEntry) {
        let mut pending = self.pending.borrow_mut();
        let id = entry.target.node_id();
        match pending.iter_mut().find(|e| e.target.node_id() == id) {
            Some(existing) => *existing = entry,
            None => pending.push(entry),
        }
    }
}

struct MemoryResizeObserver {
    state: Rc<ResizeObserverState>,
}

impl ResizeObserver for MemoryResizeObserver {
    fn observe(&self, target: &ElementRef) {
        let id = target.node_id();
        {
            let mut targets = self.state.targets.borrow_mut();
            if targets.contains(&id) {
                return;
            }
            targets.push(id);
        }

        // The host reports the initial size of a newly observed element
        let rect = self
            .state
            .host
            .upgrade()
            .and_then(|host| host.content_rect(id));
        if let Some(content_rect) = rect {
            self.state.queue(ResizeEntry {
                target: Rc::clone(target),
                content_rect,
            });
        }
    }

    fn unobserve(&self, target: &ElementRef) {
        let id = target.node_id();
        self.state.targets.borrow_mut().retain(|t| *t != id);
        self.state
            .pending
            .borrow_mut()
            .retain(|e| e.target.node_id() != id);
    }

    fn disconnect(&self) {
        self.state.targets.borrow_mut().clear();
        self.state.pending.borrow_mut().clear();
    }
}

struct MutationObserverState {
    callback: RefCell<MutationCallback>,
    targets: RefCell<Vec<(NodeId, ObserveOptions)>>,
    pending: RefCell<Vec<MutationRecord>>,
}

struct MemoryMutationObserver {
    state: Rc<MutationObserverState>,
}

impl MutationObserver for MemoryMutationObserver {
    fn observe(&self, target: &ElementRef, options: ObserveOptions) {
        let id = target.node_id();
        let mut targets = self.state.targets.borrow_mut();
        match targets.iter_mut().find(|(t, _)| *t == id) {
            Some(existing) => existing.1 = options,
            None => targets.push((id, options)),
        }
    }

    fn disconnect(&self) {
        self.state.targets.borrow_mut().clear();
        self.state.pending.borrow_mut().clear();
    }
}

/// Deterministic single-threaded [`Host`].
pub struct MemoryHost {
    inner: Rc<HostInner>,
    surfaces: Box<dyn SurfaceFactory>,
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("viewport_width", &self.inner.viewport_width.get())
            .field("resize_supported", &self.inner.resize_supported.get())
            .field("pending", &self.pending_notifications())
            .finish()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Host with a software rasterizer and a 1280px viewport.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HostInner {
                viewport_width: Cell::new(DEFAULT_VIEWPORT_WIDTH),
                resize_supported: Cell::new(true),
                max_rounds: Cell::new(DEFAULT_MAX_ROUNDS),
                next_node: Cell::new(1),
                elements: RefCell::new(Vec::new()),
                resize_observers: RefCell::new(Vec::new()),
                mutation_observers: RefCell::new(Vec::new()),
            }),
            surfaces: Box::new(RasterSurfaceFactory::new()),
        }
    }

    pub fn with_surfaces(mut self, surfaces: Box<dyn SurfaceFactory>) -> Self {
        self.surfaces = surfaces;
        self
    }

    pub fn with_viewport_width(self, width: f64) -> Self {
        self.set_viewport_width(width);
        self
    }

    /// Host that cannot observe geometry.
    pub fn without_resize_observer(self) -> Self {
        self.inner.resize_supported.set(false);
        self
    }

    pub fn with_max_rounds(self, max_rounds: usize) -> Self {
        self.inner.max_rounds.set(max_rounds.max(1));
        self
    }

    pub fn set_viewport_width(&self, width: f64) {
        self.inner.viewport_width.set(width);
    }

    /// Create an element with the given content size and an empty style.
    pub fn create_element(&self, width: f64, height: f64) -> Rc<MemoryElement> {
        let id = self.inner.next_node.get();
        self.inner.next_node.set(id + 1);

        let host = Rc::downgrade(&self.inner);
        let element = Rc::new_cyclic(|this| MemoryElement {
            id,
            this: this.clone(),
            host,
            style: RefCell::new(BTreeMap::new()),
            content: Cell::new(ContentRect::new(width, height)),
        });
        let mut elements = self.inner.elements.borrow_mut();
        elements.retain(|el| el.strong_count() > 0);
        elements.push(Rc::downgrade(&element));
        drop(elements);
        element
    }

    /// Number of resize observers watching at least one element.
    pub fn active_resize_observers(&self) -> usize {
        self.inner
            .live_resize_observers()
            .iter()
            .filter(|o| !o.targets.borrow().is_empty())
            .count()
    }

    /// Number of mutation observers watching at least one element.
    pub fn active_mutation_observers(&self) -> usize {
        self.inner
            .live_mutation_observers()
            .iter()
            .filter(|o| !o.targets.borrow().is_empty())
            .count()
    }

    /// Queued notifications not yet delivered.
    pub fn pending_notifications(&self) -> usize {
        let resizes: usize = self
            .inner
            .live_resize_observers()
            .iter()
            .map(|o| o.pending.borrow().len())
            .sum();
        let mutations: usize = self
            .inner
            .live_mutation_observers()
            .iter()
            .map(|o| o.pending.borrow().len())
            .sum();
        resizes + mutations
    }

    /// Deliver queued notifications until none are pending.
    ///
    /// Each round hands every observer its pending batch, mutation observers
    /// first. Notifications queued by callbacks go to the next round.
    /// Returns the number of rounds run. When the round limit is reached the
    /// remaining notifications are dropped.
    pub fn flush(&self) -> usize {
        let max_rounds = self.inner.max_rounds.get();
        let mut rounds = 0;

        loop {
            let mutation_batches: Vec<_> = self
                .inner
                .live_mutation_observers()
                .into_iter()
                .filter_map(|o| {
                    let batch = std::mem::take(&mut *o.pending.borrow_mut());
                    (!batch.is_empty()).then_some((o, batch))
                })
                .collect();
            let resize_batches: Vec<_> = self
                .inner
                .live_resize_observers()
                .into_iter()
                .filter_map(|o| {
                    let batch = std::mem::take(&mut *o.pending.borrow_mut());
                    (!batch.is_empty()).then_some((o, batch))
                })
                .collect();

            if mutation_batches.is_empty() && resize_batches.is_empty() {
                break;
            }

            if rounds == max_rounds {
                let dropped: usize = mutation_batches.iter().map(|(_, b)| b.len()).sum::<usize>()
                    + resize_batches.iter().map(|(_, b)| b.len()).sum::<usize>();
                tracing::warn!(
                    rounds = rounds,
                    dropped = dropped,
                    "Notification delivery did not settle, dropping pending notifications"
                );
                break;
            }
            rounds += 1;

            for (observer, records) in mutation_batches {
                // A callback earlier in this round may have disconnected it
                let records: Vec<_> = records
                    .into_iter()
                    .filter(|r| {
                        observer
                            .targets
                            .borrow()
                            .iter()
                            .any(|(id, _)| *id == r.target.node_id())
                    })
                    .collect();
                if !records.is_empty() {
                    let mut callback = observer.callback.borrow_mut();
                    (*callback)(&records);
                }
            }

            for (observer, entries) in resize_batches {
                let entries: Vec<_> = entries
                    .into_iter()
                    .filter(|e| observer.targets.borrow().contains(&e.target.node_id()))
                    .collect();
                if !entries.is_empty() {
                    let mut callback = observer.callback.borrow_mut();
                    (*callback)(&entries);
                }
            }
        }

        tracing::trace!(rounds = rounds, "Flushed host notifications");
        rounds
    }
}

impl Host for MemoryHost {
    fn create_resize_observer(&self, callback: ResizeCallback) -> Option<Box<dyn ResizeObserver>> {
        if !self.inner.resize_supported.get() {
            return None;
        }

        let state = Rc::new(ResizeObserverState {
            host: Rc::downgrade(&self.inner),
            callback: RefCell::new(callback),
            targets: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        });
        self.inner
            .resize_observers
            .borrow_mut()
            .push(Rc::downgrade(&state));

        Some(Box::new(MemoryResizeObserver { state }))
    }

    fn create_mutation_observer(&self, callback: MutationCallback) -> Box<dyn MutationObserver> {
        let state = Rc::new(MutationObserverState {
            callback: RefCell::new(callback),
            targets: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        });
        self.inner
            .mutation_observers
            .borrow_mut()
            .push(Rc::downgrade(&state));

        Box::new(MemoryMutationObserver { state })
    }

    fn viewport_width(&self) -> f64 {
        self.inner.viewport_width.get()
    }

    fn surfaces(&self) -> &dyn SurfaceFactory {
        self.surfaces.as_ref()
    }
}
