//! Host drawing surface

/// The visual host's drawing surface
///
/// The player never paints on its own initiative. It asks the host to
/// schedule a paint; the host later calls
/// [`RivePlayer::on_paint`](crate::RivePlayer::on_paint) on its render
/// thread. `invalidate` may be called from the frame clock thread.
pub trait SurfaceHost: Send + Sync + 'static {
    /// Schedule a paint of the surface
    fn invalidate(&self);
}

impl<F> SurfaceHost for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn invalidate(&self) {
        self()
    }
}
