//! Read access shared by the live state, snapshots, and read-only views.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::config::StateConfig;
use crate::mode::{DisplayMode, Interpolation};
use crate::registry::Registry;
use crate::source::{Source, SourceGroup};
use crate::transform::AffineTransform3D;
use crate::visibility::Selections;

/// The plain data behind every viewer state view.
///
/// Fields are private; read it through [`ViewerStateQuery`].
#[derive(Debug, Clone, Default)]
pub struct StateData {
    pub(crate) interpolation: Interpolation,
    pub(crate) display_mode: DisplayMode,
    pub(crate) num_timepoints: usize,
    pub(crate) current_timepoint: usize,
    pub(crate) viewer_transform: AffineTransform3D,

    pub(crate) sources: Registry<Source>,
    pub(crate) current_source: Option<Source>,
    pub(crate) active_sources: HashSet<Source>,

    pub(crate) groups: Registry<SourceGroup>,
    pub(crate) current_group: Option<SourceGroup>,
    pub(crate) active_groups: HashSet<SourceGroup>,
    pub(crate) group_names: HashMap<SourceGroup, String>,
    pub(crate) group_members: HashMap<SourceGroup, HashSet<Source>>,
}

impl StateData {
    pub(crate) fn from_config(config: &StateConfig) -> Self {
        Self {
            interpolation: config.interpolation,
            display_mode: config.display_mode,
            num_timepoints: config.num_timepoints,
            ..Self::default()
        }
    }

    pub(crate) fn selections(&self) -> Selections<'_> {
        Selections {
            display_mode: self.display_mode,
            current_source: self.current_source.as_ref(),
            active_sources: &self.active_sources,
            current_group: self.current_group.as_ref(),
            active_groups: &self.active_groups,
            group_members: &self.group_members,
        }
    }
}

/// Queries over viewer state.
///
/// Every method has a default implementation on top of
/// [`state_data`](Self::state_data), so all views answer identically for
/// the same underlying data.
pub trait ViewerStateQuery {
    /// The data being queried.
    fn state_data(&self) -> &StateData;

    fn interpolation(&self) -> Interpolation {
        self.state_data().interpolation
    }

    fn display_mode(&self) -> DisplayMode {
        self.state_data().display_mode
    }

    fn num_timepoints(&self) -> usize {
        self.state_data().num_timepoints
    }

    /// Not clamped to `num_timepoints`.
    fn current_timepoint(&self) -> usize {
        self.state_data().current_timepoint
    }

    fn viewer_transform(&self) -> AffineTransform3D {
        self.state_data().viewer_transform
    }

    // --- sources ---

    /// Tracked sources in insertion order.
    fn sources(&self) -> &[Source] {
        self.state_data().sources.as_slice()
    }

    fn contains_source(&self, source: &Source) -> bool {
        self.state_data().sources.contains(source)
    }

    /// Position of a source in [`sources`](Self::sources).
    fn source_index(&self, source: &Source) -> Option<usize> {
        self.state_data().sources.index_of(source)
    }

    fn current_source(&self) -> Option<&Source> {
        self.state_data().current_source.as_ref()
    }

    fn is_current_source(&self, source: &Source) -> bool {
        self.current_source() == Some(source)
    }

    fn active_sources(&self) -> &HashSet<Source> {
        &self.state_data().active_sources
    }

    fn is_source_active(&self, source: &Source) -> bool {
        self.state_data().active_sources.contains(source)
    }

    /// Sources visible under the current display mode, computed fresh.
    fn visible_sources(&self) -> HashSet<Source> {
        self.state_data().selections().visible()
    }

    fn is_source_visible(&self, source: &Source) -> bool {
        self.state_data().selections().is_visible(source)
    }

    /// Visible sources that also have data at the current timepoint.
    fn visible_and_present_sources(&self) -> HashSet<Source> {
        let timepoint = self.current_timepoint();
        self.visible_sources()
            .into_iter()
            .filter(|source| source.is_present(timepoint))
            .collect()
    }

    fn is_source_visible_and_present(&self, source: &Source) -> bool {
        self.is_source_visible(source) && source.is_present(self.current_timepoint())
    }

    /// Order sources by index. Untracked sources sort last.
    fn compare_sources(&self, a: &Source, b: &Source) -> Ordering {
        let key = |source: &Source| self.source_index(source).unwrap_or(usize::MAX);
        key(a).cmp(&key(b))
    }

    /// Collect sources into a vector ordered by [`compare_sources`](Self::compare_sources).
    fn sorted_sources<'s, I>(&self, sources: I) -> Vec<Source>
    where
        I: IntoIterator<Item = &'s Source>,
        Self: Sized,
    {
        let mut sorted: Vec<Source> = sources.into_iter().cloned().collect();
        sorted.sort_by(|a, b| self.compare_sources(a, b));
        sorted
    }

    // --- groups ---

    /// Tracked groups in insertion order.
    fn groups(&self) -> &[SourceGroup] {
        self.state_data().groups.as_slice()
    }

    fn contains_group(&self, group: &SourceGroup) -> bool {
        self.state_data().groups.contains(group)
    }

    /// Position of a group in [`groups`](Self::groups).
    fn group_index(&self, group: &SourceGroup) -> Option<usize> {
        self.state_data().groups.index_of(group)
    }

    fn current_group(&self) -> Option<&SourceGroup> {
        self.state_data().current_group.as_ref()
    }

    fn is_current_group(&self, group: &SourceGroup) -> bool {
        self.current_group() == Some(group)
    }

    fn active_groups(&self) -> &HashSet<SourceGroup> {
        &self.state_data().active_groups
    }

    fn is_group_active(&self, group: &SourceGroup) -> bool {
        self.state_data().active_groups.contains(group)
    }

    /// Name of a tracked group.
    fn group_name(&self, group: &SourceGroup) -> Option<&str> {
        self.state_data().group_names.get(group).map(String::as_str)
    }

    /// Members of a tracked group.
    fn sources_in_group(&self, group: &SourceGroup) -> Option<&HashSet<Source>> {
        self.state_data().group_members.get(group)
    }

    /// Groups containing a source, in group order.
    fn groups_containing(&self, source: &Source) -> Vec<SourceGroup> {
        let data = self.state_data();
        data.groups
            .iter()
            .filter(|group| {
                data.group_members
                    .get(*group)
                    .is_some_and(|members| members.contains(source))
            })
            .cloned()
            .collect()
    }

    /// Order groups by index. Untracked groups sort last.
    fn compare_groups(&self, a: &SourceGroup, b: &SourceGroup) -> Ordering {
        let key = |group: &SourceGroup| self.group_index(group).unwrap_or(usize::MAX);
        key(a).cmp(&key(b))
    }
}

impl ViewerStateQuery for StateData {
    fn state_data(&self) -> &StateData {
        self
    }
}
