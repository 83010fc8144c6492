//! Change notifications.
//!
//! Listeners receive only the kind of change, never a payload, and re-query
//! the state for details. Events raised while a notification scope is open
//! are collected (each kind at most once) and dispatched when the outermost
//! scope closes.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Kinds of viewer state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewerStateChange {
    /// A source was added or removed
    NumSourcesChanged,
    /// The current source changed
    CurrentSourceChanged,
    /// A source was activated or deactivated
    SourceActivityChanged,
    /// Group membership of some source changed
    SourceToGroupAssignmentChanged,
    /// A group was added or removed
    NumGroupsChanged,
    /// The current group changed
    CurrentGroupChanged,
    /// A group was activated or deactivated
    GroupActivityChanged,
    /// A group was renamed
    GroupNameChanged,
    /// The display mode changed
    DisplayModeChanged,
    /// The interpolation changed
    InterpolationChanged,
    /// The number of timepoints changed
    NumTimepointsChanged,
    /// The current timepoint changed
    CurrentTimepointChanged,
    /// The viewer transform changed
    ViewerTransformChanged,
    /// The set of visible sources changed
    VisibilityChanged,
}

impl fmt::Display for ViewerStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Receives viewer state change notifications.
///
/// Called synchronously on the mutating thread. Implementations must not
/// mutate the state that is notifying them.
pub trait ViewerStateListener: Send {
    /// Called once per change kind.
    fn viewer_state_changed(&mut self, change: ViewerStateChange);
}

impl<F> ViewerStateListener for F
where
    F: FnMut(ViewerStateChange) + Send,
{
    fn viewer_state_changed(&mut self, change: ViewerStateChange) {
        self(change)
    }
}

/// Handle returned when registering a listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listeners detached from a notifier while changes are dispatched to them.
pub(crate) type Listeners = Vec<(ListenerId, Box<dyn ViewerStateListener>)>;

/// Listener list plus the coalescing buffer for pending changes.
#[derive(Default)]
pub(crate) struct ChangeNotifier {
    listeners: Listeners,
    next_id: u64,
    pending: Vec<ViewerStateChange>,
    depth: usize,
    deferred: bool,
}

impl ChangeNotifier {
    pub fn add_listener(&mut self, listener: Box<dyn ViewerStateListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Record a change. Repeated kinds within one scope collapse.
    pub fn post(&mut self, change: ViewerStateChange) {
        if !self.pending.contains(&change) {
            self.pending.push(change);
        }
    }

    /// Open a notification scope.
    pub fn hold(&mut self) {
        self.depth += 1;
    }

    /// Nesting depth of open scopes.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Close a scope. Dispatches pending changes when the outermost scope
    /// closes, unless dispatch has been deferred to the caller.
    pub fn release(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 && !self.deferred {
            let changes = std::mem::take(&mut self.pending);
            dispatch(&mut self.listeners, &changes);
        }
    }

    /// Drop every open scope and pending change. Used when a scope unwinds.
    pub fn abandon(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                depth = self.depth,
                discarded = ?self.pending,
                "notification scope unwound, pending changes discarded"
            );
        }
        self.depth = 0;
        self.pending.clear();
        self.deferred = false;
    }

    /// Keep pending changes buffered until [`take_deferred`](Self::take_deferred).
    pub fn defer(&mut self) {
        self.deferred = true;
    }

    /// Stop deferring and hand the buffered changes and the listeners to the
    /// caller, which dispatches and then calls [`restore`](Self::restore).
    pub fn take_deferred(&mut self) -> (Vec<ViewerStateChange>, Listeners) {
        self.deferred = false;
        (
            std::mem::take(&mut self.pending),
            std::mem::take(&mut self.listeners),
        )
    }

    /// Reattach listeners taken by [`take_deferred`](Self::take_deferred).
    pub fn restore(&mut self, mut listeners: Listeners) {
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }
}

/// Deliver each change to each listener, in registration order.
pub(crate) fn dispatch(listeners: &mut Listeners, changes: &[ViewerStateChange]) {
    for &change in changes {
        trace!(%change, listeners = listeners.len(), "dispatching change");
        for (_, listener) in listeners.iter_mut() {
            listener.viewer_state_changed(change);
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .field("depth", &self.depth)
            .field("deferred", &self.deferred)
            .finish()
    }
}

/// A change together with its position in the recorded timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedChange {
    pub seq: u64,
    pub change: ViewerStateChange,
}

/// Listener that records every change it receives.
///
/// Clones share the same timeline, so one clone can be registered as a
/// listener while another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct ChangeRecorder {
    timeline: Arc<Mutex<Timeline>>,
}

#[derive(Debug, Default)]
struct Timeline {
    next_seq: u64,
    entries: Vec<RecordedChange>,
}

impl ChangeRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded changes so far.
    pub fn timeline(&self) -> Vec<RecordedChange> {
        self.timeline.lock().entries.clone()
    }

    /// Recorded change kinds, without sequence numbers.
    pub fn changes(&self) -> Vec<ViewerStateChange> {
        self.timeline.lock().entries.iter().map(|r| r.change).collect()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<ViewerStateChange> {
        self.timeline
            .lock()
            .entries
            .drain(..)
            .map(|r| r.change)
            .collect()
    }

    /// How many times a given kind was recorded.
    pub fn count(&self, change: ViewerStateChange) -> usize {
        self.timeline
            .lock()
            .entries
            .iter()
            .filter(|r| r.change == change)
            .count()
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.timeline.lock().entries.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.timeline.lock().entries.is_empty()
    }
}

impl ViewerStateListener for ChangeRecorder {
    fn viewer_state_changed(&mut self, change: ViewerStateChange) {
        let mut timeline = self.timeline.lock();
        let seq = timeline.next_seq;
        timeline.next_seq += 1;
        timeline.entries.push(RecordedChange { seq, change });
    }
}
