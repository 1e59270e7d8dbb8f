//! Byte-fetch abstraction
//!
//! Source loads obtain `.riv` bytes through a [`ByteFetcher`]. The player
//! places no constraint on URI schemes beyond what the fetcher supports;
//! `rive_player_assets` provides the default filesystem/HTTP implementation.

use crate::error::FetchError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by [`ByteFetcher::fetch`]
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + 'static>>;

/// Fetches raw bytes for a source URI
pub trait ByteFetcher: Send + Sync + 'static {
    /// Start fetching `uri`
    ///
    /// The returned future must not borrow from `self` or `uri`; it runs on
    /// the loader's async runtime, independently of the frame clock.
    fn fetch(&self, uri: &str) -> FetchFuture;
}

impl<F: ByteFetcher + ?Sized> ByteFetcher for Arc<F> {
    fn fetch(&self, uri: &str) -> FetchFuture {
        (**self).fetch(uri)
    }
}

impl<F: ByteFetcher + ?Sized> ByteFetcher for Box<F> {
    fn fetch(&self, uri: &str) -> FetchFuture {
        (**self).fetch(uri)
    }
}
