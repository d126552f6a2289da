//! Platform abstraction layer
//!
//! Browser-independent pieces of the widget's host integration:
//! - Pointer routing across surfaces
//! - Surface lifecycle (visibility, resize, frame clock)
//! - Per-instance host state shared with browser callbacks
//! - Timing helpers

pub mod host;
pub mod input;
pub mod surface;
pub mod time;

pub use host::{SharedHost, Teardown, WeakHost};
pub use input::{
    EventSource, PointerBroker, PointerEvent, PointerHooks, PointerState, Rect, Registration,
    SurfaceKey, WeakPointerBroker,
};
pub use surface::{RenderSurface, SurfaceOptions, SurfaceSize, SurfaceState, Transition};
pub use time::{Clock, Debouncer, FrameTime};
