#![forbid(unsafe_code)]

//! Startup barrier.
//!
//! Each module marks itself ready exactly once during `App::init`. When the
//! last required module is marked, the queued `on_ready` callbacks run, once.
//! Callbacks registered after that run immediately.

use std::fmt;

use bitflags::bitflags;
use tracing::{debug, warn};

bitflags! {
    /// Modules taking part in startup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modules: u16 {
        const DOCUMENT    = 1 << 0;
        const NAVIGATION  = 1 << 1;
        const SCROLL_FX   = 1 << 2;
        const MOBILE_MENU = 1 << 3;
        const MODALS      = 1 << 4;
        const FORMS       = 1 << 5;
        const VOICE       = 1 << 6;
        const BUS         = 1 << 7;
    }
}

/// One-shot readiness barrier over a set of [`Modules`].
pub struct ReadinessBarrier {
    required: Modules,
    ready: Modules,
    callbacks: Vec<Box<dyn FnOnce()>>,
    fired: bool,
}

impl fmt::Debug for ReadinessBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessBarrier")
            .field("required", &self.required)
            .field("ready", &self.ready)
            .field("pending_callbacks", &self.callbacks.len())
            .field("fired", &self.fired)
            .finish()
    }
}

impl ReadinessBarrier {
    pub fn new(required: Modules) -> Self {
        Self {
            required,
            ready: Modules::empty(),
            callbacks: Vec::new(),
            fired: false,
        }
    }

    /// Record `module` as ready. Returns `false` if it was already marked.
    pub fn mark(&mut self, module: Modules) -> bool {
        if self.ready.contains(module) {
            warn!(?module, "module marked ready twice");
            return false;
        }
        self.ready |= module;
        debug!(?module, missing = ?self.missing(), "module ready");
        if self.is_ready() && !self.fired {
            self.fired = true;
            for callback in self.callbacks.drain(..) {
                callback();
            }
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.ready.contains(self.required)
    }

    /// Required modules not yet marked.
    pub fn missing(&self) -> Modules {
        self.required - self.ready
    }

    pub fn ready(&self) -> Modules {
        self.ready
    }

    /// Run `callback` once every required module is ready.
    pub fn on_ready(&mut self, callback: impl FnOnce() + 'static) {
        if self.fired {
            callback();
        } else {
            self.callbacks.push(Box::new(callback));
        }
    }

    /// Forget all readiness; pending callbacks are dropped.
    pub fn reset(&mut self) {
        self.ready = Modules::empty();
        self.callbacks.clear();
        self.fired = false;
    }
}
