//! Snapshots and read-only views of a viewer state.

use crate::error::{Error, Result};
use crate::mode::{DisplayMode, Interpolation};
use crate::query::{StateData, ViewerStateQuery};
use crate::source::{Source, SourceGroup};
use crate::state::{ViewerState, ViewerStateMut};
use crate::transform::AffineTransform3D;

/// An independent copy of viewer state data.
///
/// Taking one is the way to hand a stable view to another thread (a render
/// loop, say) without holding the state's lock while it is read.
#[derive(Debug, Clone)]
pub struct ViewerSnapshot {
    data: StateData,
}

impl ViewerSnapshot {
    pub(crate) fn new(data: StateData) -> Self {
        Self { data }
    }
}

impl ViewerStateQuery for ViewerSnapshot {
    fn state_data(&self) -> &StateData {
        &self.data
    }
}

/// A live view of a [`ViewerState`] that rejects every mutation with
/// [`Error::UnsupportedMutation`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyViewerState<'a> {
    state: &'a ViewerState,
}

impl<'a> ReadOnlyViewerState<'a> {
    pub(crate) fn new(state: &'a ViewerState) -> Self {
        Self { state }
    }
}

impl ViewerStateQuery for ReadOnlyViewerState<'_> {
    fn state_data(&self) -> &StateData {
        self.state.state_data()
    }
}

impl ViewerStateMut for ReadOnlyViewerState<'_> {
    fn set_interpolation(&mut self, _: Interpolation) -> Result<bool> {
        Err(Error::unsupported("set_interpolation"))
    }

    fn set_display_mode(&mut self, _: DisplayMode) -> Result<bool> {
        Err(Error::unsupported("set_display_mode"))
    }

    fn set_num_timepoints(&mut self, _: usize) -> Result<bool> {
        Err(Error::unsupported("set_num_timepoints"))
    }

    fn set_current_timepoint(&mut self, _: usize) -> Result<bool> {
        Err(Error::unsupported("set_current_timepoint"))
    }

    fn set_viewer_transform(&mut self, _: &AffineTransform3D) -> Result<bool> {
        Err(Error::unsupported("set_viewer_transform"))
    }

    fn set_current_source(&mut self, _: Option<&Source>) -> Result<bool> {
        Err(Error::unsupported("set_current_source"))
    }

    fn add_source(&mut self, _: &Source) -> Result<bool> {
        Err(Error::unsupported("add_source"))
    }

    fn add_sources(&mut self, _: &[Source]) -> Result<bool> {
        Err(Error::unsupported("add_sources"))
    }

    fn remove_source(&mut self, _: &Source) -> Result<bool> {
        Err(Error::unsupported("remove_source"))
    }

    fn remove_sources(&mut self, _: &[Source]) -> Result<bool> {
        Err(Error::unsupported("remove_sources"))
    }

    fn clear_sources(&mut self) -> Result<bool> {
        Err(Error::unsupported("clear_sources"))
    }

    fn set_source_active(&mut self, _: &Source, _: bool) -> Result<bool> {
        Err(Error::unsupported("set_source_active"))
    }

    fn set_sources_active(&mut self, _: &[Source], _: bool) -> Result<bool> {
        Err(Error::unsupported("set_sources_active"))
    }

    fn set_current_group(&mut self, _: Option<&SourceGroup>) -> Result<bool> {
        Err(Error::unsupported("set_current_group"))
    }

    fn add_group(&mut self, _: &SourceGroup) -> Result<bool> {
        Err(Error::unsupported("add_group"))
    }

    fn add_groups(&mut self, _: &[SourceGroup]) -> Result<bool> {
        Err(Error::unsupported("add_groups"))
    }

    fn remove_group(&mut self, _: &SourceGroup) -> Result<bool> {
        Err(Error::unsupported("remove_group"))
    }

    fn remove_groups(&mut self, _: &[SourceGroup]) -> Result<bool> {
        Err(Error::unsupported("remove_groups"))
    }

    fn clear_groups(&mut self) -> Result<bool> {
        Err(Error::unsupported("clear_groups"))
    }

    fn set_group_active(&mut self, _: &SourceGroup, _: bool) -> Result<bool> {
        Err(Error::unsupported("set_group_active"))
    }

    fn set_groups_active(&mut self, _: &[SourceGroup], _: bool) -> Result<bool> {
        Err(Error::unsupported("set_groups_active"))
    }

    fn set_group_name(&mut self, _: &SourceGroup, _: &str) -> Result<bool> {
        Err(Error::unsupported("set_group_name"))
    }

    fn add_source_to_group(&mut self, _: &Source, _: &SourceGroup) -> Result<bool> {
        Err(Error::unsupported("add_source_to_group"))
    }

    fn add_sources_to_group(&mut self, _: &[Source], _: &SourceGroup) -> Result<bool> {
        Err(Error::unsupported("add_sources_to_group"))
    }

    fn remove_source_from_group(&mut self, _: &Source, _: &SourceGroup) -> Result<bool> {
        Err(Error::unsupported("remove_source_from_group"))
    }

    fn remove_sources_from_group(&mut self, _: &[Source], _: &SourceGroup) -> Result<bool> {
        Err(Error::unsupported("remove_sources_from_group"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeRecorder;

    fn populated() -> (ViewerState, Vec<Source>, SourceGroup) {
        let mut state = ViewerState::new();
        let sources: Vec<_> = ["A", "B", "C"].into_iter().map(Source::named).collect();
        let group = SourceGroup::new("g");
        state.add_sources(&sources).unwrap();
        state.add_group(&group).unwrap();
        state.add_sources_to_group(&sources[1..], &group).unwrap();
        state.set_sources_active(&sources[..2], true).unwrap();
        state.set_display_mode(DisplayMode::Fused).unwrap();
        (state, sources, group)
    }

    fn assert_same_answers(a: &impl ViewerStateQuery, b: &impl ViewerStateQuery, group: &SourceGroup) {
        assert_eq!(a.sources(), b.sources());
        assert_eq!(a.current_source(), b.current_source());
        assert_eq!(a.active_sources(), b.active_sources());
        assert_eq!(a.visible_sources(), b.visible_sources());
        assert_eq!(a.groups(), b.groups());
        assert_eq!(a.current_group(), b.current_group());
        assert_eq!(a.group_name(group), b.group_name(group));
        assert_eq!(a.sources_in_group(group), b.sources_in_group(group));
        assert_eq!(a.display_mode(), b.display_mode());
        assert_eq!(a.interpolation(), b.interpolation());
        assert_eq!(a.current_timepoint(), b.current_timepoint());
        assert_eq!(a.viewer_transform(), b.viewer_transform());
    }

    #[test]
    fn snapshot_and_read_only_agree_with_live_state() {
        let (state, _, group) = populated();
        let snapshot = state.snapshot();
        let read_only = state.as_read_only();

        assert_same_answers(&state, &snapshot, &group);
        assert_same_answers(&state, &read_only, &group);
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let (mut state, sources, group) = populated();
        let snapshot = state.snapshot();
        let visible_before = snapshot.visible_sources();

        state.remove_source(&sources[0]).unwrap();
        state.set_group_name(&group, "renamed").unwrap();
        state.set_display_mode(DisplayMode::Single).unwrap();
        state
            .set_viewer_transform(&AffineTransform3D::from_scale(glam::DVec3::splat(3.0)))
            .unwrap();

        assert_eq!(snapshot.sources().len(), 3);
        assert_eq!(snapshot.current_source(), Some(&sources[0]));
        assert_eq!(snapshot.group_name(&group), Some("g"));
        assert_eq!(snapshot.display_mode(), DisplayMode::Fused);
        assert_eq!(snapshot.visible_sources(), visible_before);
        assert_eq!(snapshot.viewer_transform(), AffineTransform3D::IDENTITY);
    }

    #[test]
    fn read_only_rejects_every_mutation() {
        let (mut state, sources, group) = populated();
        let recorder = ChangeRecorder::new();
        state.add_listener(recorder.clone());

        let mut view = state.as_read_only();
        let source = &sources[0];

        let results = [
            view.set_interpolation(Interpolation::NLinear),
            view.set_display_mode(DisplayMode::Group),
            view.set_num_timepoints(3),
            view.set_current_timepoint(1),
            view.set_viewer_transform(&AffineTransform3D::IDENTITY),
            view.set_current_source(None),
            view.add_source(&Source::named("new")),
            view.add_sources(&[]),
            view.remove_source(source),
            view.remove_sources(&sources),
            view.clear_sources(),
            view.set_source_active(source, false),
            view.set_sources_active(&sources, false),
            view.set_current_group(None),
            view.add_group(&SourceGroup::new("new")),
            view.add_groups(&[]),
            view.remove_group(&group),
            view.remove_groups(&[group.clone()]),
            view.clear_groups(),
            view.set_group_active(&group, true),
            view.set_groups_active(&[group.clone()], true),
            view.set_group_name(&group, "x"),
            view.add_source_to_group(source, &group),
            view.add_sources_to_group(&sources, &group),
            view.remove_source_from_group(&sources[1], &group),
            view.remove_sources_from_group(&sources, &group),
        ];

        for result in results {
            assert!(matches!(result, Err(Error::UnsupportedMutation { .. })));
        }
        assert_eq!(view.sources().len(), 3);
        assert!(recorder.is_empty());
    }

    #[test]
    fn snapshot_can_cross_threads() {
        let (state, sources, _) = populated();
        let snapshot = state.snapshot();

        let visible = std::thread::spawn(move || snapshot.visible_sources())
            .join()
            .unwrap();
        assert!(visible.contains(&sources[0]));
        assert!(visible.contains(&sources[1]));
    }
}
