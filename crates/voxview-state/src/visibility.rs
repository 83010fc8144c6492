//! Display-mode visibility resolution.
//!
//! | mode        | visible                               |
//! |-------------|---------------------------------------|
//! | Single      | the current source, if any            |
//! | Group       | members of the current group, if any  |
//! | Fused       | all active sources                    |
//! | FusedGroup  | union of members of all active groups |

use std::collections::{HashMap, HashSet};

use crate::mode::DisplayMode;
use crate::source::{Source, SourceGroup};

/// Borrowed view of everything that decides visibility.
#[derive(Debug, Clone, Copy)]
pub struct Selections<'a> {
    pub display_mode: DisplayMode,
    pub current_source: Option<&'a Source>,
    pub active_sources: &'a HashSet<Source>,
    pub current_group: Option<&'a SourceGroup>,
    pub active_groups: &'a HashSet<SourceGroup>,
    pub group_members: &'a HashMap<SourceGroup, HashSet<Source>>,
}

impl Selections<'_> {
    /// The set of sources that should be drawn.
    pub fn visible(&self) -> HashSet<Source> {
        match self.display_mode {
            DisplayMode::Single => self.current_source.into_iter().cloned().collect(),
            DisplayMode::Group => self
                .current_group
                .and_then(|group| self.group_members.get(group))
                .cloned()
                .unwrap_or_default(),
            DisplayMode::Fused => self.active_sources.clone(),
            DisplayMode::FusedGroup => self
                .active_groups
                .iter()
                .filter_map(|group| self.group_members.get(group))
                .flatten()
                .cloned()
                .collect(),
        }
    }

    /// Whether a single source is visible, without building the whole set.
    pub fn is_visible(&self, source: &Source) -> bool {
        match self.display_mode {
            DisplayMode::Single => self.current_source == Some(source),
            DisplayMode::Group => self
                .current_group
                .and_then(|group| self.group_members.get(group))
                .is_some_and(|members| members.contains(source)),
            DisplayMode::Fused => self.active_sources.contains(source),
            DisplayMode::FusedGroup => self.active_groups.iter().any(|group| {
                self.group_members
                    .get(group)
                    .is_some_and(|members| members.contains(source))
            }),
        }
    }
}
