// Sukashi watermark library

pub mod config;
pub mod controller;
pub mod host;
pub mod logging;
pub mod reactive;
pub mod watermark;

pub use controller::{attach, use_watermark, AppliedBackground, WatermarkHandle};
pub use host::{ElementRef, Host, MemoryElement, MemoryHost};
pub use reactive::{Observable, Scope, Subscription};
pub use watermark::{TileImage, WatermarkConfig, WatermarkError};
