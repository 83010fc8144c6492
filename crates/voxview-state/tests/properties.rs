//! Property tests over random mutation sequences.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use voxview_state::{
    ChangeRecorder, DisplayMode, Error, Source, SourceGroup, ViewerState, ViewerStateChange,
    ViewerStateMut, ViewerStateQuery,
};

const NUM_SOURCES: usize = 5;
const NUM_GROUPS: usize = 3;
const NAMES: [&str; 3] = ["g0", "nuclei", "membranes"];

#[derive(Debug, Clone)]
enum Op {
    AddSource(usize),
    AddSources(Vec<usize>),
    RemoveSource(usize),
    RemoveSources(Vec<usize>),
    SetCurrentSource(Option<usize>),
    SetSourceActive(usize, bool),
    SetSourcesActive(Vec<usize>, bool),
    ClearSources,
    AddGroup(usize),
    AddGroups(Vec<usize>),
    RemoveGroup(usize),
    RemoveGroups(Vec<usize>),
    ClearGroups,
    SetCurrentGroup(Option<usize>),
    SetGroupActive(usize, bool),
    SetGroupsActive(Vec<usize>, bool),
    SetGroupName(usize, usize),
    AddSourceToGroup(usize, usize),
    AddSourcesToGroup(Vec<usize>, usize),
    RemoveSourceFromGroup(usize, usize),
    RemoveSourcesFromGroup(Vec<usize>, usize),
    SetDisplayMode(DisplayMode),
    /// Several operations coalesced through `ViewerState::batch`
    Batch(Vec<Op>),
}

fn single_op_strategy() -> impl Strategy<Value = Op> {
    let source = 0..NUM_SOURCES;
    let group = 0..NUM_GROUPS;
    let many = proptest::collection::vec(0..NUM_SOURCES, 0..4);
    let many_groups = proptest::collection::vec(0..NUM_GROUPS, 0..3);
    prop_oneof![
        3 => source.clone().prop_map(Op::AddSource),
        1 => many.clone().prop_map(Op::AddSources),
        2 => source.clone().prop_map(Op::RemoveSource),
        1 => many.clone().prop_map(Op::RemoveSources),
        1 => Just(Op::ClearSources),
        2 => proptest::option::of(source.clone()).prop_map(Op::SetCurrentSource),
        2 => (source.clone(), any::<bool>()).prop_map(|(s, a)| Op::SetSourceActive(s, a)),
        1 => (many.clone(), any::<bool>()).prop_map(|(s, a)| Op::SetSourcesActive(s, a)),
        2 => group.clone().prop_map(Op::AddGroup),
        1 => many_groups.clone().prop_map(Op::AddGroups),
        1 => group.clone().prop_map(Op::RemoveGroup),
        1 => many_groups.clone().prop_map(Op::RemoveGroups),
        1 => Just(Op::ClearGroups),
        1 => proptest::option::of(group.clone()).prop_map(Op::SetCurrentGroup),
        2 => (group.clone(), any::<bool>()).prop_map(|(g, a)| Op::SetGroupActive(g, a)),
        1 => (many_groups, any::<bool>()).prop_map(|(g, a)| Op::SetGroupsActive(g, a)),
        1 => (group.clone(), 0..NAMES.len()).prop_map(|(g, n)| Op::SetGroupName(g, n)),
        2 => (source.clone(), group.clone()).prop_map(|(s, g)| Op::AddSourceToGroup(s, g)),
        1 => (many.clone(), group.clone()).prop_map(|(s, g)| Op::AddSourcesToGroup(s, g)),
        1 => (source, group.clone()).prop_map(|(s, g)| Op::RemoveSourceFromGroup(s, g)),
        1 => (many, group).prop_map(|(s, g)| Op::RemoveSourcesFromGroup(s, g)),
        2 => proptest::sample::select(DisplayMode::ALL.to_vec()).prop_map(Op::SetDisplayMode),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        9 => single_op_strategy(),
        1 => proptest::collection::vec(single_op_strategy(), 0..5).prop_map(Op::Batch),
    ]
}

struct Pool {
    sources: Vec<Source>,
    groups: Vec<SourceGroup>,
}

impl Pool {
    fn new() -> Self {
        Self {
            sources: (0..NUM_SOURCES).map(|i| Source::named(format!("s{i}"))).collect(),
            groups: (0..NUM_GROUPS).map(|i| SourceGroup::new(format!("g{i}"))).collect(),
        }
    }

    fn pick(&self, indices: &[usize]) -> Vec<Source> {
        indices.iter().map(|&i| self.sources[i].clone()).collect()
    }

    fn pick_groups(&self, indices: &[usize]) -> Vec<SourceGroup> {
        indices.iter().map(|&j| self.groups[j].clone()).collect()
    }

    fn apply(&self, state: &mut ViewerState, op: &Op) -> Result<bool, Error> {
        let s = |i: usize| &self.sources[i];
        let g = |i: usize| &self.groups[i];
        match op {
            Op::AddSource(i) => state.add_source(s(*i)),
            Op::AddSources(is) => state.add_sources(&self.pick(is)),
            Op::RemoveSource(i) => state.remove_source(s(*i)),
            Op::RemoveSources(is) => state.remove_sources(&self.pick(is)),
            Op::SetCurrentSource(i) => state.set_current_source(i.map(s)),
            Op::SetSourceActive(i, active) => state.set_source_active(s(*i), *active),
            Op::SetSourcesActive(is, active) => state.set_sources_active(&self.pick(is), *active),
            Op::ClearSources => state.clear_sources(),
            Op::AddGroup(j) => state.add_group(g(*j)),
            Op::AddGroups(js) => state.add_groups(&self.pick_groups(js)),
            Op::RemoveGroup(j) => state.remove_group(g(*j)),
            Op::RemoveGroups(js) => state.remove_groups(&self.pick_groups(js)),
            Op::ClearGroups => state.clear_groups(),
            Op::SetCurrentGroup(j) => state.set_current_group(j.map(g)),
            Op::SetGroupActive(j, active) => state.set_group_active(g(*j), *active),
            Op::SetGroupsActive(js, active) => {
                state.set_groups_active(&self.pick_groups(js), *active)
            }
            Op::SetGroupName(j, n) => state.set_group_name(g(*j), NAMES[*n]),
            Op::AddSourceToGroup(i, j) => state.add_source_to_group(s(*i), g(*j)),
            Op::AddSourcesToGroup(is, j) => state.add_sources_to_group(&self.pick(is), g(*j)),
            Op::RemoveSourceFromGroup(i, j) => state.remove_source_from_group(s(*i), g(*j)),
            Op::RemoveSourcesFromGroup(is, j) => {
                state.remove_sources_from_group(&self.pick(is), g(*j))
            }
            Op::SetDisplayMode(mode) => state.set_display_mode(*mode),
            Op::Batch(ops) => state.batch(|state| {
                let mut changed = false;
                for op in ops {
                    changed |= self.apply(state, op)?;
                }
                Ok(changed)
            }),
        }
    }
}

/// Everything observable through the query surface.
#[derive(Debug, PartialEq)]
struct Observed {
    sources: Vec<Source>,
    current_source: Option<Source>,
    active_sources: HashSet<Source>,
    groups: Vec<SourceGroup>,
    current_group: Option<SourceGroup>,
    active_groups: HashSet<SourceGroup>,
    members: HashMap<SourceGroup, HashSet<Source>>,
    names: HashMap<SourceGroup, String>,
    display_mode: DisplayMode,
    visible: HashSet<Source>,
}

fn observe(state: &impl ViewerStateQuery) -> Observed {
    Observed {
        sources: state.sources().to_vec(),
        current_source: state.current_source().cloned(),
        active_sources: state.active_sources().clone(),
        groups: state.groups().to_vec(),
        current_group: state.current_group().cloned(),
        active_groups: state.active_groups().clone(),
        members: state
            .groups()
            .iter()
            .map(|g| (g.clone(), state.sources_in_group(g).cloned().unwrap_or_default()))
            .collect(),
        names: state
            .groups()
            .iter()
            .map(|g| (g.clone(), state.group_name(g).unwrap_or_default().to_owned()))
            .collect(),
        display_mode: state.display_mode(),
        visible: state.visible_sources(),
    }
}

/// Visibility computed from the raw selections, independently of the crate.
fn expected_visible(o: &Observed) -> HashSet<Source> {
    match o.display_mode {
        DisplayMode::Single => o.current_source.iter().cloned().collect(),
        DisplayMode::Group => o
            .current_group
            .as_ref()
            .map(|g| o.members[g].clone())
            .unwrap_or_default(),
        DisplayMode::Fused => o.active_sources.clone(),
        DisplayMode::FusedGroup => o
            .active_groups
            .iter()
            .flat_map(|g| o.members[g].iter().cloned())
            .collect(),
    }
}

fn check_invariants(state: &ViewerState) {
    let o = observe(state);
    let tracked: HashSet<_> = o.sources.iter().cloned().collect();
    assert_eq!(tracked.len(), o.sources.len(), "duplicate sources");
    for (position, source) in o.sources.iter().enumerate() {
        assert_eq!(state.source_index(source), Some(position));
    }
    let tracked_groups: HashSet<_> = o.groups.iter().cloned().collect();
    assert_eq!(tracked_groups.len(), o.groups.len(), "duplicate groups");
    for (position, group) in o.groups.iter().enumerate() {
        assert_eq!(state.group_index(group), Some(position));
    }

    if let Some(current) = &o.current_source {
        assert!(tracked.contains(current));
    }
    assert!(o.active_sources.is_subset(&tracked));
    if let Some(current) = &o.current_group {
        assert!(tracked_groups.contains(current));
    }
    assert!(o.active_groups.is_subset(&tracked_groups));
    for members in o.members.values() {
        assert!(members.is_subset(&tracked), "group member not tracked");
    }

    assert_eq!(o.visible, expected_visible(&o));
}

proptest! {
    #[test]
    fn invariants_hold_and_notifications_are_exact(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let pool = Pool::new();
        let mut state = ViewerState::new();
        let recorder = ChangeRecorder::new();
        state.add_listener(recorder.clone());

        for op in &ops {
            let before = observe(&state);
            let snapshot = state.snapshot();

            let outcome = pool.apply(&mut state, op);
            let after = observe(&state);
            let changes = recorder.take();

            // every kind at most once, VisibilityChanged exactly when the set moved
            let unique: HashSet<_> = changes.iter().collect();
            prop_assert_eq!(unique.len(), changes.len(), "repeated change kind");
            let visibility_events = changes
                .iter()
                .filter(|c| **c == ViewerStateChange::VisibilityChanged)
                .count();
            prop_assert_eq!(visibility_events, usize::from(before.visible != after.visible));

            match outcome {
                Ok(changed) => {
                    prop_assert_eq!(changed, !changes.is_empty(), "{:?}", op);
                    // a batch may change and restore state, and is not idempotent
                    if !matches!(op, Op::Batch(_)) {
                        prop_assert_eq!(changed, before != after, "{:?}", op);
                        prop_assert_eq!(pool.apply(&mut state, op), Ok(false), "{:?}", op);
                        prop_assert!(recorder.is_empty());
                    }
                }
                Err(err) => {
                    prop_assert!(matches!(err, Error::NotTracked { .. }), "{:?}", err);
                    // a failed batch keeps the steps applied before the failure
                    if !matches!(op, Op::Batch(_)) {
                        prop_assert_eq!(&after, &before);
                        prop_assert!(changes.is_empty());
                    }
                }
            }

            prop_assert_eq!(observe(&snapshot), before);
            check_invariants(&state);
        }
    }

    #[test]
    fn removal_cascades(ops in proptest::collection::vec(op_strategy(), 1..40), victim in 0..NUM_SOURCES) {
        let pool = Pool::new();
        let mut state = ViewerState::new();
        for op in &ops {
            let _ = pool.apply(&mut state, op);
        }

        let source = &pool.sources[victim];
        prop_assume!(state.contains_source(source));
        let was_current = state.is_current_source(source);
        prop_assert_eq!(state.remove_source(source), Ok(true));

        prop_assert!(!state.contains_source(source));
        prop_assert!(!state.is_source_active(source));
        prop_assert!(state.groups_containing(source).is_empty());
        if was_current {
            prop_assert_eq!(state.current_source(), state.sources().first());
        }
        check_invariants(&state);
    }
}
