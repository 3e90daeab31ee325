//! Host capabilities consumed by the watermark controller.
//!
//! The controller never talks to a concrete UI toolkit. Instead a [`Host`]
//! supplies:
//!
//! - **Geometry observation** ([`ResizeObserver`]): callbacks with the
//!   content rectangle of observed elements. Hosts without this capability
//!   return `None` and the watermark stays off.
//! - **Attribute observation** ([`MutationObserver`]): callbacks with a
//!   record for every attribute write matching the observation filter.
//! - **Offscreen drawing** ([`SurfaceFactory`]).
//! - **Viewport width**, used to bound free-mode tiling.
//!
//! [`MemoryHost`] is a deterministic in-process implementation.

pub mod memory;

pub use memory::{MemoryElement, MemoryHost, DEFAULT_MAX_ROUNDS, DEFAULT_VIEWPORT_WIDTH};

use crate::watermark::SurfaceFactory;
use std::fmt;
use std::rc::Rc;

/// Name of the style attribute.
pub const STYLE_ATTRIBUTE: &str = "style";
/// Style property holding the background image.
pub const BACKGROUND_IMAGE: &str = "background-image";
/// Style property holding the background repeat mode.
pub const BACKGROUND_REPEAT: &str = "background-repeat";

/// Identity of an element within its host.
pub type NodeId = u64;

/// A visual container whose inline style can be read and written.
pub trait Element {
    fn node_id(&self) -> NodeId;

    /// Inline style property value, `None` when unset.
    fn style_property(&self, name: &str) -> Option<String>;

    /// Set an inline style property. The host reports every call as a
    /// `style` attribute mutation, whether or not the value changed.
    fn set_style_property(&self, name: &str, value: &str);
}

/// Shared handle to a host element.
pub type ElementRef = Rc<dyn Element>;

/// Content-box size reported by geometry observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentRect {
    pub width: f64,
    pub height: f64,
}

impl ContentRect {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// One geometry change.
#[derive(Clone)]
pub struct ResizeEntry {
    pub target: ElementRef,
    pub content_rect: ContentRect,
}

impl fmt::Debug for ResizeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeEntry")
            .field("target", &self.target.node_id())
            .field("content_rect", &self.content_rect)
            .finish()
    }
}

/// One attribute change.
#[derive(Clone)]
pub struct MutationRecord {
    pub target: ElementRef,
    pub attribute_name: Option<String>,
}

impl fmt::Debug for MutationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationRecord")
            .field("target", &self.target.node_id())
            .field("attribute_name", &self.attribute_name)
            .finish()
    }
}

/// What a [`MutationObserver`] reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Report attribute changes.
    pub attributes: bool,
    /// Only report these attributes; `None` reports all of them.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Attribute changes on `style` only.
    pub fn style_only() -> Self {
        Self {
            attributes: true,
            attribute_filter: Some(vec![STYLE_ATTRIBUTE.to_string()]),
        }
    }

    /// Whether a change of `attribute` is reported.
    pub fn accepts(&self, attribute: &str) -> bool {
        self.attributes
            && self
                .attribute_filter
                .as_ref()
                .map_or(true, |filter| filter.iter().any(|a| a == attribute))
    }
}

pub type ResizeCallback = Box<dyn FnMut(&[ResizeEntry])>;
pub type MutationCallback = Box<dyn FnMut(&[MutationRecord])>;

/// Geometry observation handle.
pub trait ResizeObserver {
    fn observe(&self, target: &ElementRef);
    fn unobserve(&self, target: &ElementRef);
    fn disconnect(&self);
}

/// Attribute observation handle.
pub trait MutationObserver {
    fn observe(&self, target: &ElementRef, options: ObserveOptions);
    fn disconnect(&self);
}

/// Capabilities of the environment a watermark runs in.
pub trait Host {
    /// `None` when the host cannot observe geometry.
    fn create_resize_observer(&self, callback: ResizeCallback) -> Option<Box<dyn ResizeObserver>>;

    fn create_mutation_observer(&self, callback: MutationCallback) -> Box<dyn MutationObserver>;

    /// Width of the viewport in CSS pixels.
    fn viewport_width(&self) -> f64;

    fn surfaces(&self) -> &dyn SurfaceFactory;
}
