//! Scene mutation queue
//!
//! Every change to the live scene (source loads, artboard and state machine
//! name changes, input values) is expressed as a closure and appended here.
//! Producers may enqueue from any thread; the frame clock is the single
//! consumer and applies the pending batch in enqueue order before it
//! advances and paints.
//!
//! Draining swaps the pending batch out under the lock, so anything enqueued
//! while a batch is being applied (including by a mutation itself) lands in
//! the next batch. Nothing is reordered, lost, or applied twice.

use parking_lot::Mutex;
use std::fmt;

/// A queued unit of work against state `S`
///
/// Mutations receive the owner's state at apply time rather than capturing a
/// particular scene, so a mutation applied after the scene was replaced acts
/// on the current scene.
pub type Mutation<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Ordered multi-producer, single-consumer queue of mutations
pub struct MutationQueue<S> {
    pending: Mutex<Vec<Mutation<S>>>,
}

impl<S> MutationQueue<S> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Append a mutation
    pub fn enqueue<F>(&self, mutation: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.pending.lock().push(Box::new(mutation));
    }

    /// Append already boxed mutations as one contiguous run
    ///
    /// No other producer's mutation can interleave with the run.
    pub fn extend<I>(&self, mutations: I)
    where
        I: IntoIterator<Item = Mutation<S>>,
    {
        self.pending.lock().extend(mutations);
    }

    /// Apply every pending mutation to `state`, in enqueue order
    ///
    /// Returns the number of mutations applied. Exclusive access to `state`
    /// is what makes this the single consumer; callers hold the state lock
    /// for the whole batch so no paint observes a half-applied batch.
    pub fn drain_and_apply(&self, state: &mut S) -> usize {
        let batch = std::mem::take(&mut *self.pending.lock());
        let applied = batch.len();
        for mutation in batch {
            mutation(&mut *state);
        }
        if applied > 0 {
            tracing::trace!("Applied {} scene mutations", applied);
        }
        applied
    }

    /// Discard every pending mutation without applying it
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    /// Number of mutations waiting for the next drain
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl<S> Default for MutationQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for MutationQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationQueue")
            .field("pending", &self.len())
            .finish()
    }
}
