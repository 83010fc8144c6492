//! Display modes and interpolation settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Selects which selections decide the visible sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Only the current source
    #[default]
    Single,
    /// Members of the current group
    Group,
    /// All active sources
    Fused,
    /// Members of all active groups
    FusedGroup,
}

impl DisplayMode {
    /// All modes, in the order they are cycled through.
    pub const ALL: [Self; 4] = [
        DisplayMode::Single,
        DisplayMode::Group,
        DisplayMode::Fused,
        DisplayMode::FusedGroup,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            DisplayMode::Single => "single-source mode",
            DisplayMode::Group => "single-group mode",
            DisplayMode::Fused => "fused mode",
            DisplayMode::FusedGroup => "fused group mode",
        }
    }

    /// Whether several entities are shown at once.
    pub fn has_fused(&self) -> bool {
        matches!(self, DisplayMode::Fused | DisplayMode::FusedGroup)
    }

    /// Whether visibility is decided by groups rather than sources.
    pub fn has_grouping(&self) -> bool {
        matches!(self, DisplayMode::Group | DisplayMode::FusedGroup)
    }

    /// The same grouping setting, with fusion switched on or off.
    pub fn with_fused(&self, fused: bool) -> Self {
        Self::from_flags(fused, self.has_grouping())
    }

    /// The same fusion setting, with grouping switched on or off.
    pub fn with_grouping(&self, grouping: bool) -> Self {
        Self::from_flags(self.has_fused(), grouping)
    }

    fn from_flags(fused: bool, grouping: bool) -> Self {
        match (fused, grouping) {
            (false, false) => DisplayMode::Single,
            (false, true) => DisplayMode::Group,
            (true, false) => DisplayMode::Fused,
            (true, true) => DisplayMode::FusedGroup,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Interpolation used when sampling sources for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Nearest-neighbor sampling
    #[default]
    NearestNeighbor,
    /// N-linear sampling
    NLinear,
}

impl Interpolation {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Interpolation::NearestNeighbor => "nearest-neighbor interpolation",
            Interpolation::NLinear => "tri-linear interpolation",
        }
    }

    /// The next setting when toggling.
    pub fn next(&self) -> Self {
        match self {
            Interpolation::NearestNeighbor => Interpolation::NLinear,
            Interpolation::NLinear => Interpolation::NearestNeighbor,
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
