#![forbid(unsafe_code)]

//! Core primitives for Vitrine.
//!
//! - [`event`]: input events delivered to controllers and the outcome the host
//!   should apply to the native event.
//! - [`geometry`]: points, viewport dimensions, and vertical section bounds.
//! - [`dom`]: the [`Dom`](dom::Dom) host trait and the in-memory
//!   [`Document`](dom::Document) used for headless operation and tests.
//! - [`timing`]: throttle, debounce, frame-gate, and timer-queue primitives.
//!   All of them take time as an explicit argument so transitions stay
//!   deterministic.

pub mod dom;
pub mod event;
pub mod geometry;
pub mod timing;

pub use dom::{Document, Dom, DomError, ElementId, ScrollBehavior};
pub use event::{Event, EventOutcome, KeyCode, KeyEvent, Modifiers, TouchEvent, TouchPhase};
pub use geometry::{Bounds, Point, Viewport};
pub use timing::{Debounce, FrameGate, Throttle, TimerId, TimerQueue};
pub use web_time::Instant;
