//! The viewer state container.
//!
//! Every mutation returns `Ok(true)` iff it changed observable state, posts
//! the matching [`ViewerStateChange`]s, and, for anything that can affect
//! which sources are drawn, recomputes the visible set and posts
//! [`ViewerStateChange::VisibilityChanged`] if it differs from the last one.
//!
//! Arguments are validated before anything is touched, so a call that
//! returns an error has no effect.
//!
//! `ViewerState` is not synchronized. Share it between threads through
//! [`SharedViewerState`](crate::SharedViewerState).

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use crate::config::StateConfig;
use crate::error::{Error, Result};
use crate::events::{ChangeNotifier, ListenerId, Listeners, ViewerStateChange, ViewerStateListener};
use crate::mode::{DisplayMode, Interpolation};
use crate::query::{StateData, ViewerStateQuery};
use crate::source::{Source, SourceGroup};
use crate::transform::AffineTransform3D;
use crate::view::{ReadOnlyViewerState, ViewerSnapshot};

use crate::events::ViewerStateChange::{
    CurrentGroupChanged, CurrentSourceChanged, CurrentTimepointChanged, DisplayModeChanged,
    GroupActivityChanged, GroupNameChanged, InterpolationChanged, NumGroupsChanged,
    NumSourcesChanged, NumTimepointsChanged, SourceActivityChanged,
    SourceToGroupAssignmentChanged, ViewerTransformChanged, VisibilityChanged,
};

/// Mutations over viewer state.
///
/// Implemented by [`ViewerState`], and by [`ReadOnlyViewerState`] which
/// rejects every call with [`Error::UnsupportedMutation`].
pub trait ViewerStateMut: ViewerStateQuery {
    fn set_interpolation(&mut self, interpolation: Interpolation) -> Result<bool>;

    fn set_display_mode(&mut self, mode: DisplayMode) -> Result<bool>;

    /// The current timepoint is left as is, even if it is now out of range.
    fn set_num_timepoints(&mut self, num_timepoints: usize) -> Result<bool>;

    fn set_current_timepoint(&mut self, timepoint: usize) -> Result<bool>;

    fn set_viewer_transform(&mut self, transform: &AffineTransform3D) -> Result<bool>;

    /// `None` clears the current source. `Some` must be tracked.
    fn set_current_source(&mut self, source: Option<&Source>) -> Result<bool>;

    /// Append a source. It becomes current if nothing is.
    fn add_source(&mut self, source: &Source) -> Result<bool>;

    fn add_sources(&mut self, sources: &[Source]) -> Result<bool>;

    /// Remove a source from the state, the active set and every group.
    /// If it was current, the first remaining source becomes current.
    fn remove_source(&mut self, source: &Source) -> Result<bool>;

    fn remove_sources(&mut self, sources: &[Source]) -> Result<bool>;

    fn clear_sources(&mut self) -> Result<bool>;

    fn set_source_active(&mut self, source: &Source, active: bool) -> Result<bool>;

    fn set_sources_active(&mut self, sources: &[Source], active: bool) -> Result<bool>;

    /// `None` clears the current group. `Some` must be tracked.
    fn set_current_group(&mut self, group: Option<&SourceGroup>) -> Result<bool>;

    /// Append a group, named after its label. It becomes current if nothing is.
    fn add_group(&mut self, group: &SourceGroup) -> Result<bool>;

    fn add_groups(&mut self, groups: &[SourceGroup]) -> Result<bool>;

    /// Remove a group and discard its name and members.
    /// If it was current, the first remaining group becomes current.
    fn remove_group(&mut self, group: &SourceGroup) -> Result<bool>;

    fn remove_groups(&mut self, groups: &[SourceGroup]) -> Result<bool>;

    fn clear_groups(&mut self) -> Result<bool>;

    fn set_group_active(&mut self, group: &SourceGroup, active: bool) -> Result<bool>;

    fn set_groups_active(&mut self, groups: &[SourceGroup], active: bool) -> Result<bool>;

    fn set_group_name(&mut self, group: &SourceGroup, name: &str) -> Result<bool>;

    fn add_source_to_group(&mut self, source: &Source, group: &SourceGroup) -> Result<bool>;

    fn add_sources_to_group(&mut self, sources: &[Source], group: &SourceGroup) -> Result<bool>;

    fn remove_source_from_group(&mut self, source: &Source, group: &SourceGroup) -> Result<bool>;

    fn remove_sources_from_group(
        &mut self,
        sources: &[Source],
        group: &SourceGroup,
    ) -> Result<bool>;
}

/// Tracks sources, groups and display settings of one viewer.
#[derive(Debug)]
pub struct ViewerState {
    data: StateData,
    previous_visible: HashSet<Source>,
    notifier: ChangeNotifier,
    strict: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerState {
    /// Create an empty state with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    /// Create an empty state.
    pub fn with_config(config: StateConfig) -> Self {
        Self {
            data: StateData::from_config(&config),
            previous_visible: HashSet::new(),
            notifier: ChangeNotifier::default(),
            strict: config.strict_tracking,
        }
    }

    /// Whether untracked references are rejected or ignored.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Register a listener. It is called once per change kind per mutation.
    pub fn add_listener(&mut self, listener: impl ViewerStateListener + 'static) -> ListenerId {
        self.notifier.add_listener(Box::new(listener))
    }

    /// Unregister a listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.notifier.remove_listener(id)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.notifier.listener_count()
    }

    /// An independent copy of the current data, without listeners.
    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot::new(self.data.clone())
    }

    /// A view that answers queries from this state and rejects mutations.
    pub fn as_read_only(&self) -> ReadOnlyViewerState<'_> {
        ReadOnlyViewerState::new(self)
    }

    /// Run several mutations as one.
    ///
    /// Notifications are coalesced as for bulk calls: each kind is delivered
    /// at most once, after `f` returns, and visibility is compared once.
    /// This is not a transaction: mutations made before an error stay
    /// applied and are still notified.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.scope(f)
    }

    pub(crate) fn defer_notifications(&mut self) {
        self.notifier.defer();
    }

    pub(crate) fn take_deferred_notifications(&mut self) -> (Vec<ViewerStateChange>, Listeners) {
        self.notifier.take_deferred()
    }

    pub(crate) fn restore_listeners(&mut self, listeners: Listeners) {
        self.notifier.restore(listeners);
    }

    /// Open a notification scope around `f`. When the outermost scope
    /// closes, visibility is compared and pending changes are dispatched.
    fn scope<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.notifier.hold();
        let guard = ScopeGuard { state: self };
        let result = f(&mut *guard.state);
        if guard.state.notifier.depth() == 1 {
            guard.state.check_visibility();
        }
        guard.state.notifier.release();
        result
    }

    /// Post a change that cannot affect visibility.
    fn notify(&mut self, change: ViewerStateChange) {
        self.notifier.hold();
        self.notifier.post(change);
        self.notifier.release();
    }

    fn check_visibility(&mut self) {
        let visible = self.data.selections().visible();
        if visible != self.previous_visible {
            trace!(
                before = self.previous_visible.len(),
                after = visible.len(),
                "visible sources changed"
            );
            self.previous_visible = visible;
            self.notifier.post(VisibilityChanged);
        }
    }

    // --- tracking checks ---

    /// `Ok(true)` if tracked, `Ok(false)` if untracked in lenient mode.
    fn check_source(&self, source: &Source) -> Result<bool> {
        if self.data.sources.contains(source) {
            Ok(true)
        } else if self.strict {
            Err(Error::source_not_tracked(source))
        } else {
            warn!(source = %source, "ignoring untracked source");
            Ok(false)
        }
    }

    fn check_group(&self, group: &SourceGroup) -> Result<bool> {
        if self.data.groups.contains(group) {
            Ok(true)
        } else if self.strict {
            Err(Error::group_not_tracked(group))
        } else {
            warn!(group = %group, "ignoring untracked group");
            Ok(false)
        }
    }

    /// The tracked subset of `sources`. Strict mode fails on the first
    /// untracked one instead.
    fn tracked_sources<'a>(&self, sources: &'a [Source]) -> Result<Vec<&'a Source>> {
        let mut tracked = Vec::with_capacity(sources.len());
        for source in sources {
            if self.check_source(source)? {
                tracked.push(source);
            }
        }
        Ok(tracked)
    }

    fn tracked_groups<'a>(&self, groups: &'a [SourceGroup]) -> Result<Vec<&'a SourceGroup>> {
        let mut tracked = Vec::with_capacity(groups.len());
        for group in groups {
            if self.check_group(group)? {
                tracked.push(group);
            }
        }
        Ok(tracked)
    }

    // --- unchecked single-element operations, called inside a scope ---

    fn insert_source(&mut self, source: &Source) -> bool {
        if !self.data.sources.insert(source.clone()) {
            return false;
        }
        debug!(source = %source, index = self.data.sources.len() - 1, "source added");
        self.notifier.post(NumSourcesChanged);

        if self.data.current_source.is_none() {
            self.data.current_source = Some(source.clone());
            self.notifier.post(CurrentSourceChanged);
        }
        true
    }

    fn delete_source(&mut self, source: &Source) -> bool {
        if !self.data.sources.remove(source) {
            return false;
        }
        debug!(source = %source, "source removed");
        self.notifier.post(NumSourcesChanged);

        self.data.active_sources.remove(source);

        if self.data.current_source.as_ref() == Some(source) {
            self.data.current_source = self.data.sources.first().cloned();
            debug!(current = ?self.data.current_source, "current source promoted");
            self.notifier.post(CurrentSourceChanged);
        }

        let mut reassigned = false;
        for members in self.data.group_members.values_mut() {
            reassigned |= members.remove(source);
        }
        if reassigned {
            self.notifier.post(SourceToGroupAssignmentChanged);
        }
        true
    }

    fn toggle_source(&mut self, source: &Source, active: bool) -> bool {
        let changed = if active {
            self.data.active_sources.insert(source.clone())
        } else {
            self.data.active_sources.remove(source)
        };
        if changed {
            self.notifier.post(SourceActivityChanged);
        }
        changed
    }

    fn insert_group(&mut self, group: &SourceGroup) -> bool {
        if !self.data.groups.insert(group.clone()) {
            return false;
        }
        debug!(group = %group, index = self.data.groups.len() - 1, "group added");
        self.data
            .group_names
            .insert(group.clone(), group.label().to_owned());
        self.data.group_members.insert(group.clone(), HashSet::new());
        self.notifier.post(NumGroupsChanged);

        if self.data.current_group.is_none() {
            self.data.current_group = Some(group.clone());
            self.notifier.post(CurrentGroupChanged);
        }
        true
    }

    fn delete_group(&mut self, group: &SourceGroup) -> bool {
        if !self.data.groups.remove(group) {
            return false;
        }
        debug!(group = %group, "group removed");
        self.notifier.post(NumGroupsChanged);

        self.data.active_groups.remove(group);
        self.data.group_names.remove(group);
        self.data.group_members.remove(group);

        if self.data.current_group.as_ref() == Some(group) {
            self.data.current_group = self.data.groups.first().cloned();
            debug!(current = ?self.data.current_group, "current group promoted");
            self.notifier.post(CurrentGroupChanged);
        }
        true
    }

    fn toggle_group(&mut self, group: &SourceGroup, active: bool) -> bool {
        let changed = if active {
            self.data.active_groups.insert(group.clone())
        } else {
            self.data.active_groups.remove(group)
        };
        if changed {
            self.notifier.post(GroupActivityChanged);
        }
        changed
    }

    fn assign(&mut self, source: &Source, group: &SourceGroup, member: bool) -> bool {
        let Some(members) = self.data.group_members.get_mut(group) else {
            return false;
        };
        let changed = if member {
            members.insert(source.clone())
        } else {
            members.remove(source)
        };
        if changed {
            self.notifier.post(SourceToGroupAssignmentChanged);
        }
        changed
    }

    fn assign_all(&mut self, sources: &[Source], group: &SourceGroup, member: bool) -> Result<bool> {
        if !self.check_group(group)? {
            return Ok(false);
        }
        let sources = self.tracked_sources(sources)?;
        self.scope(|state| {
            let mut changed = false;
            for source in sources {
                changed |= state.assign(source, group, member);
            }
            Ok(changed)
        })
    }
}

/// Resets the notifier if a scope unwinds, so a panicking mutation does not
/// leave a scope open or leak its changes into the next one.
struct ScopeGuard<'a> {
    state: &'a mut ViewerState,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.state.notifier.abandon();
        }
    }
}

impl ViewerStateQuery for ViewerState {
    fn state_data(&self) -> &StateData {
        &self.data
    }
}

impl ViewerStateMut for ViewerState {
    fn set_interpolation(&mut self, interpolation: Interpolation) -> Result<bool> {
        if self.data.interpolation == interpolation {
            return Ok(false);
        }
        self.data.interpolation = interpolation;
        self.notify(InterpolationChanged);
        Ok(true)
    }

    fn set_display_mode(&mut self, mode: DisplayMode) -> Result<bool> {
        if self.data.display_mode == mode {
            return Ok(false);
        }
        self.scope(|state| {
            debug!(?mode, "display mode changed");
            state.data.display_mode = mode;
            state.notifier.post(DisplayModeChanged);
            Ok(true)
        })
    }

    fn set_num_timepoints(&mut self, num_timepoints: usize) -> Result<bool> {
        if self.data.num_timepoints == num_timepoints {
            return Ok(false);
        }
        self.data.num_timepoints = num_timepoints;
        if self.data.current_timepoint >= num_timepoints {
            debug!(
                current = self.data.current_timepoint,
                num_timepoints, "current timepoint left out of range"
            );
        }
        self.notify(NumTimepointsChanged);
        Ok(true)
    }

    fn set_current_timepoint(&mut self, timepoint: usize) -> Result<bool> {
        if self.data.current_timepoint == timepoint {
            return Ok(false);
        }
        self.data.current_timepoint = timepoint;
        self.notify(CurrentTimepointChanged);
        Ok(true)
    }

    fn set_viewer_transform(&mut self, transform: &AffineTransform3D) -> Result<bool> {
        if self.data.viewer_transform == *transform {
            return Ok(false);
        }
        self.data.viewer_transform.set(transform);
        self.notify(ViewerTransformChanged);
        Ok(true)
    }

    fn set_current_source(&mut self, source: Option<&Source>) -> Result<bool> {
        if let Some(source) = source {
            if !self.check_source(source)? {
                return Ok(false);
            }
        }
        if self.data.current_source.as_ref() == source {
            return Ok(false);
        }
        self.scope(|state| {
            debug!(current = ?source, "current source changed");
            state.data.current_source = source.cloned();
            state.notifier.post(CurrentSourceChanged);
            Ok(true)
        })
    }

    fn add_source(&mut self, source: &Source) -> Result<bool> {
        self.scope(|state| Ok(state.insert_source(source)))
    }

    fn add_sources(&mut self, sources: &[Source]) -> Result<bool> {
        self.scope(|state| {
            let mut changed = false;
            for source in sources {
                changed |= state.insert_source(source);
            }
            Ok(changed)
        })
    }

    fn remove_source(&mut self, source: &Source) -> Result<bool> {
        self.scope(|state| Ok(state.delete_source(source)))
    }

    fn remove_sources(&mut self, sources: &[Source]) -> Result<bool> {
        self.scope(|state| {
            let mut changed = false;
            for source in sources {
                changed |= state.delete_source(source);
            }
            Ok(changed)
        })
    }

    fn clear_sources(&mut self) -> Result<bool> {
        if self.data.sources.is_empty() {
            return Ok(false);
        }
        self.scope(|state| {
            let removed = state.data.sources.drain();
            debug!(count = removed.len(), "all sources removed");
            state.notifier.post(NumSourcesChanged);

            state.data.active_sources.clear();

            if state.data.current_source.take().is_some() {
                state.notifier.post(CurrentSourceChanged);
            }

            let mut reassigned = false;
            for members in state.data.group_members.values_mut() {
                reassigned |= !members.is_empty();
                members.clear();
            }
            if reassigned {
                state.notifier.post(SourceToGroupAssignmentChanged);
            }
            Ok(true)
        })
    }

    fn set_source_active(&mut self, source: &Source, active: bool) -> Result<bool> {
        if !self.check_source(source)? {
            return Ok(false);
        }
        self.scope(|state| Ok(state.toggle_source(source, active)))
    }

    fn set_sources_active(&mut self, sources: &[Source], active: bool) -> Result<bool> {
        let sources = self.tracked_sources(sources)?;
        self.scope(|state| {
            let mut changed = false;
            for source in sources {
                changed |= state.toggle_source(source, active);
            }
            Ok(changed)
        })
    }

    fn set_current_group(&mut self, group: Option<&SourceGroup>) -> Result<bool> {
        if let Some(group) = group {
            if !self.check_group(group)? {
                return Ok(false);
            }
        }
        if self.data.current_group.as_ref() == group {
            return Ok(false);
        }
        self.scope(|state| {
            debug!(current = ?group, "current group changed");
            state.data.current_group = group.cloned();
            state.notifier.post(CurrentGroupChanged);
            Ok(true)
        })
    }

    fn add_group(&mut self, group: &SourceGroup) -> Result<bool> {
        self.scope(|state| Ok(state.insert_group(group)))
    }

    fn add_groups(&mut self, groups: &[SourceGroup]) -> Result<bool> {
        self.scope(|state| {
            let mut changed = false;
            for group in groups {
                changed |= state.insert_group(group);
            }
            Ok(changed)
        })
    }

    fn remove_group(&mut self, group: &SourceGroup) -> Result<bool> {
        self.scope(|state| Ok(state.delete_group(group)))
    }

    fn remove_groups(&mut self, groups: &[SourceGroup]) -> Result<bool> {
        self.scope(|state| {
            let mut changed = false;
            for group in groups {
                changed |= state.delete_group(group);
            }
            Ok(changed)
        })
    }

    fn clear_groups(&mut self) -> Result<bool> {
        if self.data.groups.is_empty() {
            return Ok(false);
        }
        self.scope(|state| {
            let removed = state.data.groups.drain();
            debug!(count = removed.len(), "all groups removed");
            state.notifier.post(NumGroupsChanged);

            state.data.active_groups.clear();
            state.data.group_names.clear();
            state.data.group_members.clear();

            if state.data.current_group.take().is_some() {
                state.notifier.post(CurrentGroupChanged);
            }
            Ok(true)
        })
    }

    fn set_group_active(&mut self, group: &SourceGroup, active: bool) -> Result<bool> {
        if !self.check_group(group)? {
            return Ok(false);
        }
        self.scope(|state| Ok(state.toggle_group(group, active)))
    }

    fn set_groups_active(&mut self, groups: &[SourceGroup], active: bool) -> Result<bool> {
        let groups = self.tracked_groups(groups)?;
        self.scope(|state| {
            let mut changed = false;
            for group in groups {
                changed |= state.toggle_group(group, active);
            }
            Ok(changed)
        })
    }

    fn set_group_name(&mut self, group: &SourceGroup, name: &str) -> Result<bool> {
        if !self.check_group(group)? {
            return Ok(false);
        }
        match self.data.group_names.get_mut(group) {
            Some(current) if current.as_str() != name => {
                debug!(group = %group, name, "group renamed");
                *current = name.to_owned();
                self.notify(GroupNameChanged);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn add_source_to_group(&mut self, source: &Source, group: &SourceGroup) -> Result<bool> {
        if !(self.check_source(source)? && self.check_group(group)?) {
            return Ok(false);
        }
        self.scope(|state| Ok(state.assign(source, group, true)))
    }

    fn add_sources_to_group(&mut self, sources: &[Source], group: &SourceGroup) -> Result<bool> {
        self.assign_all(sources, group, true)
    }

    fn remove_source_from_group(&mut self, source: &Source, group: &SourceGroup) -> Result<bool> {
        if !(self.check_source(source)? && self.check_group(group)?) {
            return Ok(false);
        }
        self.scope(|state| Ok(state.assign(source, group, false)))
    }

    fn remove_sources_from_group(
        &mut self,
        sources: &[Source],
        group: &SourceGroup,
    ) -> Result<bool> {
        self.assign_all(sources, group, false)
    }
}
