//! Construction-time configuration for a viewer state.

use serde::{Deserialize, Serialize};

use crate::mode::{DisplayMode, Interpolation};

/// Configuration for a new [`ViewerState`](crate::ViewerState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Reject references to untracked sources and groups with
    /// [`Error::NotTracked`](crate::Error::NotTracked). When off, such calls
    /// are logged and treated as no-ops.
    pub strict_tracking: bool,
    /// Initial display mode
    pub display_mode: DisplayMode,
    /// Initial interpolation
    pub interpolation: Interpolation,
    /// Initial number of timepoints
    pub num_timepoints: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            strict_tracking: true,
            display_mode: DisplayMode::Single,
            interpolation: Interpolation::NearestNeighbor,
            num_timepoints: 1,
        }
    }
}

impl StateConfig {
    /// Default configuration with lenient tracking.
    pub fn lenient() -> Self {
        Self {
            strict_tracking: false,
            ..Self::default()
        }
    }
}
