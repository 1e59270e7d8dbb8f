//! Repaint coalescing
//!
//! Any number of repaint requests between two paints turn into a single
//! invalidation of the host surface. The flag is raised on request and
//! cleared when the paint begins, so a request made during a paint schedules
//! exactly one more.

use crate::surface::SurfaceHost;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coalesces repaint requests into host invalidations
#[derive(Default)]
pub struct RepaintSignal {
    pending: AtomicBool,
    host: RwLock<Option<Arc<dyn SurfaceHost>>>,
}

impl RepaintSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect the host surface
    ///
    /// A request made before the surface existed is delivered now.
    pub fn attach(&self, host: Arc<dyn SurfaceHost>) {
        *self.host.write() = Some(Arc::clone(&host));
        if self.pending.load(Ordering::Acquire) {
            host.invalidate();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.host.read().is_some()
    }

    /// Ask for a repaint
    ///
    /// Only the request that raises the flag invalidates the host. Returns
    /// whether this call did so.
    pub fn request(&self) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Clone out so the host runs without our lock held
        let host = self.host.read().clone();
        match host {
            Some(host) => {
                host.invalidate();
                true
            }
            None => false,
        }
    }

    /// Called at the start of a paint; later requests schedule a new one
    pub fn begin_paint(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether a repaint has been requested and not yet started
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for RepaintSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepaintSignal")
            .field("pending", &self.is_pending())
            .field("attached", &self.is_attached())
            .finish()
    }
}
