//! Replay scripts: a JSON description of sources, groups and a sequence of
//! mutations, applied one by one to a fresh viewer state.
//!
//! ```json
//! {
//!   "config": { "display_mode": "fused" },
//!   "sources": [{ "name": "dapi" }, { "name": "gfp", "present": [0, 4] }],
//!   "groups": [{ "name": "nuclei" }],
//!   "steps": [
//!     { "op": "add_sources", "sources": ["dapi", "gfp"] },
//!     { "op": "set_source_active", "source": "gfp", "active": true }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use voxview_state::{
    AffineTransform3D, ChangeRecorder, DisplayMode, Interpolation, RecordedChange, Source,
    SourceGroup, StateConfig, StaticSource, ViewerState, ViewerStateChange, ViewerStateMut,
    ViewerStateQuery,
};

/// Errors from loading or replaying a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error("Duplicate source name: {0}")]
    DuplicateSource(String),

    #[error("Duplicate group name: {0}")]
    DuplicateGroup(String),

    #[error("Step {index} failed: {error}")]
    Step {
        index: usize,
        #[source]
        error: voxview_state::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScriptError>;

/// A source declared up front. `present` limits it to an inclusive
/// timepoint range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    #[serde(default)]
    pub present: Option<[usize; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
}

/// One mutation, referring to sources and groups by declared name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SetInterpolation { interpolation: Interpolation },
    SetDisplayMode { mode: DisplayMode },
    SetNumTimepoints { count: usize },
    SetCurrentTimepoint { timepoint: usize },
    SetViewerTransform { rows: [[f64; 4]; 3] },

    SetCurrentSource { source: Option<String> },
    AddSource { source: String },
    AddSources { sources: Vec<String> },
    RemoveSource { source: String },
    RemoveSources { sources: Vec<String> },
    ClearSources,
    SetSourceActive { source: String, active: bool },
    SetSourcesActive { sources: Vec<String>, active: bool },

    SetCurrentGroup { group: Option<String> },
    AddGroup { group: String },
    AddGroups { groups: Vec<String> },
    RemoveGroup { group: String },
    RemoveGroups { groups: Vec<String> },
    ClearGroups,
    SetGroupActive { group: String, active: bool },
    SetGroupsActive { groups: Vec<String>, active: bool },
    SetGroupName { group: String, name: String },

    AddSourceToGroup { source: String, group: String },
    AddSourcesToGroup { sources: Vec<String>, group: String },
    RemoveSourceFromGroup { source: String, group: String },
    RemoveSourcesFromGroup { sources: Vec<String>, group: String },
}

/// A complete replay script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: StateConfig,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse a script from JSON text.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a script file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::parse(&json)
    }
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub changed: bool,
    pub changes: Vec<ViewerStateChange>,
    /// Visible source names, in source order
    pub visible: Vec<String>,
}

/// Outcome of a full replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub timeline: Vec<RecordedChange>,
}

/// A viewer state driven by script steps.
pub struct Replay {
    state: ViewerState,
    recorder: ChangeRecorder,
    sources: HashMap<String, Source>,
    groups: HashMap<String, SourceGroup>,
    steps_applied: usize,
}

impl Replay {
    /// Create the state and the declared handles. Nothing is added to the
    /// state until a step says so.
    pub fn new(script: &Script) -> Result<Self> {
        let mut sources = HashMap::new();
        for spec in &script.sources {
            let mut image = StaticSource::new(spec.name.clone());
            if let Some([first, last]) = spec.present {
                image = image.present_during(first..=last);
            }
            if sources.insert(spec.name.clone(), Source::new(image)).is_some() {
                return Err(ScriptError::DuplicateSource(spec.name.clone()));
            }
        }

        let mut groups = HashMap::new();
        for spec in &script.groups {
            if groups
                .insert(spec.name.clone(), SourceGroup::new(spec.name.clone()))
                .is_some()
            {
                return Err(ScriptError::DuplicateGroup(spec.name.clone()));
            }
        }

        let mut state = ViewerState::with_config(script.config.clone());
        let recorder = ChangeRecorder::new();
        state.add_listener(recorder.clone());

        debug!(
            sources = sources.len(),
            groups = groups.len(),
            "replay prepared"
        );

        Ok(Self {
            state,
            recorder,
            sources,
            groups,
            steps_applied: 0,
        })
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Every change recorded so far.
    pub fn timeline(&self) -> Vec<RecordedChange> {
        self.recorder.timeline()
    }

    /// Apply one step.
    pub fn apply(&mut self, step: &Step) -> Result<StepOutcome> {
        let index = self.steps_applied;
        let recorded_before = self.recorder.len();

        let changed = self
            .dispatch(step)?
            .map_err(|error| ScriptError::Step { index, error })?;
        self.steps_applied += 1;

        let changes = self.recorder.timeline()[recorded_before..]
            .iter()
            .map(|recorded| recorded.change)
            .collect();
        let visible = self
            .state
            .sorted_sources(&self.state.visible_sources())
            .iter()
            .map(|source| source.name().to_owned())
            .collect();

        Ok(StepOutcome {
            index,
            changed,
            changes,
            visible,
        })
    }

    /// Resolve names, then run the mutation. The outer result carries name
    /// lookup failures, the inner one the state's own verdict.
    fn dispatch(&mut self, step: &Step) -> Result<voxview_state::Result<bool>> {
        let state = &mut self.state;
        let outcome = match step {
            Step::SetInterpolation { interpolation } => state.set_interpolation(*interpolation),
            Step::SetDisplayMode { mode } => state.set_display_mode(*mode),
            Step::SetNumTimepoints { count } => state.set_num_timepoints(*count),
            Step::SetCurrentTimepoint { timepoint } => state.set_current_timepoint(*timepoint),
            Step::SetViewerTransform { rows } => {
                state.set_viewer_transform(&AffineTransform3D::from_row_major(*rows))
            }

            Step::SetCurrentSource { source } => {
                let source = source
                    .as_deref()
                    .map(|name| lookup_source(&self.sources, name))
                    .transpose()?;
                state.set_current_source(source.as_ref())
            }
            Step::AddSource { source } => state.add_source(&lookup_source(&self.sources, source)?),
            Step::AddSources { sources } => {
                state.add_sources(&lookup_sources(&self.sources, sources)?)
            }
            Step::RemoveSource { source } => {
                state.remove_source(&lookup_source(&self.sources, source)?)
            }
            Step::RemoveSources { sources } => {
                state.remove_sources(&lookup_sources(&self.sources, sources)?)
            }
            Step::ClearSources => state.clear_sources(),
            Step::SetSourceActive { source, active } => {
                state.set_source_active(&lookup_source(&self.sources, source)?, *active)
            }
            Step::SetSourcesActive { sources, active } => {
                state.set_sources_active(&lookup_sources(&self.sources, sources)?, *active)
            }

            Step::SetCurrentGroup { group } => {
                let group = group
                    .as_deref()
                    .map(|name| lookup_group(&self.groups, name))
                    .transpose()?;
                state.set_current_group(group.as_ref())
            }
            Step::AddGroup { group } => state.add_group(&lookup_group(&self.groups, group)?),
            Step::AddGroups { groups } => state.add_groups(&lookup_groups(&self.groups, groups)?),
            Step::RemoveGroup { group } => state.remove_group(&lookup_group(&self.groups, group)?),
            Step::RemoveGroups { groups } => {
                state.remove_groups(&lookup_groups(&self.groups, groups)?)
            }
            Step::ClearGroups => state.clear_groups(),
            Step::SetGroupActive { group, active } => {
                state.set_group_active(&lookup_group(&self.groups, group)?, *active)
            }
            Step::SetGroupsActive { groups, active } => {
                state.set_groups_active(&lookup_groups(&self.groups, groups)?, *active)
            }
            Step::SetGroupName { group, name } => {
                state.set_group_name(&lookup_group(&self.groups, group)?, name)
            }

            Step::AddSourceToGroup { source, group } => state.add_source_to_group(
                &lookup_source(&self.sources, source)?,
                &lookup_group(&self.groups, group)?,
            ),
            Step::AddSourcesToGroup { sources, group } => state.add_sources_to_group(
                &lookup_sources(&self.sources, sources)?,
                &lookup_group(&self.groups, group)?,
            ),
            Step::RemoveSourceFromGroup { source, group } => state.remove_source_from_group(
                &lookup_source(&self.sources, source)?,
                &lookup_group(&self.groups, group)?,
            ),
            Step::RemoveSourcesFromGroup { sources, group } => state.remove_sources_from_group(
                &lookup_sources(&self.sources, sources)?,
                &lookup_group(&self.groups, group)?,
            ),
        };
        Ok(outcome)
    }
}

fn lookup_source(sources: &HashMap<String, Source>, name: &str) -> Result<Source> {
    sources
        .get(name)
        .cloned()
        .ok_or_else(|| ScriptError::UnknownSource(name.to_owned()))
}

fn lookup_sources(sources: &HashMap<String, Source>, names: &[String]) -> Result<Vec<Source>> {
    names.iter().map(|name| lookup_source(sources, name)).collect()
}

fn lookup_group(groups: &HashMap<String, SourceGroup>, name: &str) -> Result<SourceGroup> {
    groups
        .get(name)
        .cloned()
        .ok_or_else(|| ScriptError::UnknownGroup(name.to_owned()))
}

fn lookup_groups(
    groups: &HashMap<String, SourceGroup>,
    names: &[String],
) -> Result<Vec<SourceGroup>> {
    names.iter().map(|name| lookup_group(groups, name)).collect()
}

/// Replay every step of `script`, stopping at the first failure.
pub fn run(script: &Script) -> Result<Report> {
    let mut replay = Replay::new(script)?;
    let mut steps = Vec::with_capacity(script.steps.len());

    for step in &script.steps {
        let outcome = replay.apply(step)?;
        info!(
            index = outcome.index,
            ?step,
            changed = outcome.changed,
            changes = ?outcome.changes,
            visible = ?outcome.visible,
            "step applied"
        );
        steps.push(outcome);
    }

    Ok(Report {
        steps,
        timeline: replay.timeline(),
    })
}
