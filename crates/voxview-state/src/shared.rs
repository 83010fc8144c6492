//! A viewer state shared between threads behind one lock.
//!
//! All access goes through [`SharedViewerState::read`] and
//! [`SharedViewerState::mutate`], so a multi-step read such as "the current
//! source, then its index" sees one consistent state.
//!
//! Listeners are called on the mutating thread with the lock still held but
//! the state itself released. They may read through the facade; any attempt
//! to mutate from inside a listener fails with
//! [`Error::ReentrantMutation`].

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::events::{self, ListenerId, Listeners, ViewerStateListener};
use crate::state::ViewerState;
use crate::view::ViewerSnapshot;

struct Shared {
    state: RefCell<ViewerState>,
    dispatching: Cell<bool>,
}

/// Owns the listeners while they are being called. Dropping it, on return or
/// on unwind from a panicking listener, puts them back and lowers the
/// dispatching flag.
struct DispatchGuard<'a> {
    shared: &'a Shared,
    listeners: Listeners,
}

impl<'a> DispatchGuard<'a> {
    fn raise(shared: &'a Shared, listeners: Listeners) -> Self {
        shared.dispatching.set(true);
        Self { shared, listeners }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.shared.dispatching.set(false);
        let listeners = std::mem::take(&mut self.listeners);
        match self.shared.state.try_borrow_mut() {
            Ok(mut state) => state.restore_listeners(listeners),
            Err(_) => warn!("viewer state busy, listeners dropped"),
        }
    }
}

/// Cloneable handle to one lock-guarded [`ViewerState`].
#[derive(Clone)]
pub struct SharedViewerState {
    inner: Arc<ReentrantMutex<Shared>>,
}

impl SharedViewerState {
    /// Move a state behind a lock.
    pub fn new(state: ViewerState) -> Self {
        Self {
            inner: Arc::new(ReentrantMutex::new(Shared {
                state: RefCell::new(state),
                dispatching: Cell::new(false),
            })),
        }
    }

    /// Run `f` with the lock held.
    ///
    /// Fails only when called from inside a [`mutate`](Self::mutate) closure
    /// on the same thread.
    pub fn read<R>(&self, f: impl FnOnce(&ViewerState) -> R) -> Result<R> {
        let guard = self.inner.lock();
        let state = guard
            .state
            .try_borrow()
            .map_err(|_| Error::ReentrantMutation)?;
        Ok(f(&state))
    }

    /// Run `f` with the lock held and notify listeners afterwards.
    ///
    /// Everything `f` does is coalesced as one
    /// [`batch`](ViewerState::batch).
    pub fn mutate<R>(&self, f: impl FnOnce(&mut ViewerState) -> Result<R>) -> Result<R> {
        let guard = self.inner.lock();
        if guard.dispatching.get() {
            warn!("viewer state mutation attempted from a change listener");
            return Err(Error::ReentrantMutation);
        }

        let (result, changes, listeners) = {
            let mut state = guard
                .state
                .try_borrow_mut()
                .map_err(|_| Error::ReentrantMutation)?;
            state.defer_notifications();
            let result = state.batch(f);
            let (changes, listeners) = state.take_deferred_notifications();
            (result, changes, listeners)
        };

        let mut dispatching = DispatchGuard::raise(&guard, listeners);
        events::dispatch(&mut dispatching.listeners, &changes);
        drop(dispatching);
        result
    }

    /// Take a snapshot under the lock.
    pub fn snapshot(&self) -> Result<ViewerSnapshot> {
        self.read(ViewerState::snapshot)
    }

    /// Register a listener. Not allowed from inside a listener.
    pub fn add_listener(
        &self,
        listener: impl ViewerStateListener + 'static,
    ) -> Result<ListenerId> {
        self.mutate(|state| Ok(state.add_listener(listener)))
    }

    /// Unregister a listener. Not allowed from inside a listener.
    pub fn remove_listener(&self, id: ListenerId) -> Result<bool> {
        self.mutate(|state| Ok(state.remove_listener(id)))
    }
}

impl From<ViewerState> for SharedViewerState {
    fn from(state: ViewerState) -> Self {
        Self::new(state)
    }
}

impl std::fmt::Debug for SharedViewerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedViewerState").finish_non_exhaustive()
    }
}
