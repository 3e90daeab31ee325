//! Watermark controller.
//!
//! Keeps a container's background showing the configured watermark:
//!
//! 1. Waits until the container holds an element (now or on a later write
//!    to the container [`Observable`]) and the text is non-empty.
//! 2. Starts geometry and `style` attribute observation once.
//! 3. On every resize entry, records the new content size and reapplies
//!    the background. On every style mutation that removed or altered the
//!    watermark, reapplies it.
//!
//! # Self-originated mutations
//!
//! Writing the background is itself a style mutation. The controller tags
//! its own writes: while it writes, and afterwards as long as the element
//! still carries exactly the background it wrote, mutation records are
//! ignored. An external overwrite always changes one of the two properties
//! and is therefore repaired, after which the element is back at the same
//! fixed point.
//!
//! # Example
//!
//! ```ignore
//! let host = Rc::new(MemoryHost::new());
//! let container: Observable<Option<ElementRef>> = Observable::new(None);
//! let handle = attach(WatermarkConfig::new("SECRET"), host.clone(), &container);
//!
//! container.set(Some(host.create_element(500.0, 500.0)));
//! host.flush();
//!
//! handle.teardown();
//! ```

use crate::host::{
    ElementRef, Host, MutationObserver, MutationRecord, ObserveOptions, ResizeEntry,
    ResizeObserver, BACKGROUND_IMAGE, BACKGROUND_REPEAT, STYLE_ATTRIBUTE,
};
use crate::reactive::{Observable, Scope, Subscription};
use crate::watermark::{
    render_aligned_tile, render_free_tile, BackgroundRepeat, CanvasSize, TileImage, TileMode,
    WatermarkConfig, WatermarkError,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Background written by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedBackground {
    /// `background-image` value, `url(data:...)`.
    pub image: String,
    pub repeat: BackgroundRepeat,
}

impl AppliedBackground {
    fn is_carried_by(&self, element: &ElementRef) -> bool {
        element.style_property(BACKGROUND_IMAGE).as_deref() == Some(self.image.as_str())
            && element.style_property(BACKGROUND_REPEAT).as_deref() == Some(self.repeat.as_css())
    }
}

struct ControllerState {
    config: WatermarkConfig,
    host: Rc<dyn Host>,
    canvas: Cell<CanvasSize>,
    resize_observer: RefCell<Option<Box<dyn ResizeObserver>>>,
    mutation_observer: RefCell<Option<Box<dyn MutationObserver>>>,
    observed: RefCell<Option<ElementRef>>,
    applied: RefCell<Option<AppliedBackground>>,
    aligned_tile: RefCell<Option<TileImage>>,
    started: Cell<bool>,
    writing: Cell<bool>,
    alive: Cell<bool>,
}

impl ControllerState {
    fn start(self: &Rc<Self>, element: ElementRef) {
        if !self.alive.get() || self.started.replace(true) {
            return;
        }

        let weak = Rc::downgrade(self);
        let resize_observer = self.host.create_resize_observer(Box::new(move |entries| {
            if let Some(state) = weak.upgrade() {
                state.on_resize(entries);
            }
        }));

        let Some(resize_observer) = resize_observer else {
            tracing::debug!(
                error = %WatermarkError::MissingCapability,
                "Watermark disabled"
            );
            return;
        };

        let weak = Rc::downgrade(self);
        let mutation_observer = self.host.create_mutation_observer(Box::new(move |records| {
            if let Some(state) = weak.upgrade() {
                state.on_mutation(records);
            }
        }));

        resize_observer.observe(&element);
        mutation_observer.observe(&element, ObserveOptions::style_only());

        tracing::debug!(
            element = element.node_id(),
            mode = ?self.config.tile_mode(),
            "Watermark observation started"
        );

        *self.observed.borrow_mut() = Some(element);
        *self.resize_observer.borrow_mut() = Some(resize_observer);
        *self.mutation_observer.borrow_mut() = Some(mutation_observer);
    }

    fn on_resize(&self, entries: &[ResizeEntry]) {
        if !self.alive.get() {
            return;
        }

        for entry in entries {
            self.canvas.set(CanvasSize::new(
                entry.content_rect.width,
                entry.content_rect.height,
            ));
            self.handle_style(&entry.target);
        }
    }

    fn on_mutation(&self, records: &[MutationRecord]) {
        if !self.alive.get() {
            return;
        }

        for record in records {
            if record.attribute_name.as_deref() != Some(STYLE_ATTRIBUTE) {
                continue;
            }

            if self.writing.get() || self.is_own_write(&record.target) {
                tracing::trace!(
                    element = record.target.node_id(),
                    "Ignoring self-originated style mutation"
                );
                continue;
            }

            tracing::debug!(
                element = record.target.node_id(),
                "Watermark background changed externally, reapplying"
            );
            self.handle_style(&record.target);
        }
    }

    fn is_own_write(&self, target: &ElementRef) -> bool {
        self.applied
            .borrow()
            .as_ref()
            .map_or(false, |applied| applied.is_carried_by(target))
    }

    fn render(&self) -> Result<TileImage, WatermarkError> {
        match self.config.tile_mode() {
            TileMode::Aligned => {
                if let Some(tile) = self.aligned_tile.borrow().as_ref() {
                    return Ok(tile.clone());
                }
                let tile = render_aligned_tile(&self.config, self.host.surfaces())?;
                *self.aligned_tile.borrow_mut() = Some(tile.clone());
                Ok(tile)
            }
            TileMode::Free => render_free_tile(
                &self.config,
                self.canvas.get(),
                self.host.viewport_width(),
                self.host.surfaces(),
            ),
        }
    }

    /// Regenerate the watermark and write it onto `target`.
    fn handle_style(&self, target: &ElementRef) {
        let tile = match self.render() {
            Ok(tile) => tile,
            Err(e) => {
                tracing::warn!(
                    element = target.node_id(),
                    error = %e,
                    "Failed to generate watermark, leaving background untouched"
                );
                return;
            }
        };

        let applied = AppliedBackground {
            image: tile.css_url(),
            repeat: self.config.tile_mode().background_repeat(),
        };
        *self.applied.borrow_mut() = Some(applied.clone());

        self.writing.set(true);
        target.set_style_property(BACKGROUND_IMAGE, &applied.image);
        target.set_style_property(BACKGROUND_REPEAT, applied.repeat.as_css());
        self.writing.set(false);

        tracing::debug!(
            element = target.node_id(),
            width = tile.width,
            height = tile.height,
            repeat = %applied.repeat,
            "Applied watermark background"
        );
    }

    fn teardown(&self) {
        if !self.alive.replace(false) {
            return;
        }

        let observed = self.observed.borrow_mut().take();
        if let Some(observer) = self.resize_observer.borrow_mut().take() {
            if let Some(element) = &observed {
                observer.unobserve(element);
            }
        }
        if let Some(observer) = self.mutation_observer.borrow_mut().take() {
            observer.disconnect();
        }

        if self.started.get() {
            tracing::debug!("Watermark observation stopped");
        }
    }
}

/// Owner of a watermark attachment.
///
/// Tearing down (explicitly or by dropping the handle) stops observation
/// and stops reacting to later container writes. The background already
/// written stays on the element.
pub struct WatermarkHandle {
    state: Rc<ControllerState>,
    subscription: RefCell<Option<Subscription>>,
}

impl std::fmt::Debug for WatermarkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkHandle")
            .field("started", &self.state.started.get())
            .field("observing", &self.is_observing())
            .field("alive", &self.state.alive.get())
            .finish()
    }
}

impl WatermarkHandle {
    /// Stop observation. Safe to call any number of times.
    pub fn teardown(&self) {
        self.subscription.borrow_mut().take();
        self.state.teardown();
    }

    /// Whether both observers are currently registered.
    pub fn is_observing(&self) -> bool {
        self.state.resize_observer.borrow().is_some()
            && self.state.mutation_observer.borrow().is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        !self.state.alive.get()
    }

    /// Container size used for free-mode rendering.
    pub fn canvas_size(&self) -> CanvasSize {
        self.state.canvas.get()
    }

    /// Background most recently written.
    pub fn applied_background(&self) -> Option<AppliedBackground> {
        self.state.applied.borrow().clone()
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.state.config
    }
}

impl Drop for WatermarkHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Attach a watermark to whatever element `container` holds.
///
/// Observation starts as soon as the container holds an element, checked
/// now and on every later write to `container`. An empty text, or a
/// configuration that fails validation, makes the handle inert for its
/// whole lifetime.
pub fn attach(
    config: WatermarkConfig,
    host: Rc<dyn Host>,
    container: &Observable<Option<ElementRef>>,
) -> WatermarkHandle {
    let inert = if config.is_inert() {
        tracing::debug!("Watermark text is empty, controller inert");
        true
    } else if let Err(e) = config.validate() {
        tracing::warn!(
            error = %WatermarkError::ConfigError(e),
            "Invalid watermark configuration, controller inert"
        );
        true
    } else {
        false
    };

    let state = Rc::new(ControllerState {
        config,
        host,
        canvas: Cell::new(CanvasSize::default()),
        resize_observer: RefCell::new(None),
        mutation_observer: RefCell::new(None),
        observed: RefCell::new(None),
        applied: RefCell::new(None),
        aligned_tile: RefCell::new(None),
        started: Cell::new(false),
        writing: Cell::new(false),
        alive: Cell::new(true),
    });

    let handle = WatermarkHandle {
        state: Rc::clone(&state),
        subscription: RefCell::new(None),
    };
    if inert {
        return handle;
    }

    if let Some(element) = container.get() {
        state.start(element);
    }

    if !state.started.get() {
        let weak = Rc::downgrade(&state);
        let subscription = container.subscribe(move |element| {
            if let (Some(state), Some(element)) = (weak.upgrade(), element) {
                state.start(Rc::clone(element));
            }
        });
        *handle.subscription.borrow_mut() = Some(subscription);
    }

    handle
}

/// Attach a watermark for the lifetime of `scope`.
pub fn use_watermark(
    scope: &Scope,
    host: Rc<dyn Host>,
    container: &Observable<Option<ElementRef>>,
    config: WatermarkConfig,
) {
    let handle = attach(config, host, container);
    scope.adopt(handle);
}
