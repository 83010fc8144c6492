//! Voxview Viewer State
//!
//! The state engine behind a viewer for large multi-resolution,
//! multi-timepoint volumes: which sources and source groups exist, which are
//! current and active, and therefore which are visible.
//!
//! # Architecture
//!
//! - **Registry**: insertion-ordered entities with an O(1) reverse index
//! - **Visibility**: display mode + selections → visible sources
//! - **ViewerState**: the container; every mutation reports whether it
//!   changed anything and notifies listeners of exactly what changed
//! - **Views**: detached snapshots and read-only views over a live state
//! - **SharedViewerState**: one lock around a state, for multi-threaded use
//!
//! # Display modes
//!
//! | mode        | visible                               |
//! |-------------|---------------------------------------|
//! | Single      | the current source                    |
//! | Group       | members of the current group          |
//! | Fused       | all active sources                    |
//! | FusedGroup  | members of all active groups          |
//!
//! # Usage
//!
//! ```
//! use voxview_state::{DisplayMode, Source, ViewerState, ViewerStateMut, ViewerStateQuery};
//!
//! let mut state = ViewerState::new();
//! let (a, b) = (Source::named("dapi"), Source::named("gfp"));
//! state.add_sources(&[a.clone(), b.clone()])?;
//! assert_eq!(state.current_source(), Some(&a));
//!
//! state.set_display_mode(DisplayMode::Fused)?;
//! state.set_source_active(&b, true)?;
//! assert!(state.is_source_visible(&b));
//! # Ok::<(), voxview_state::Error>(())
//! ```

mod config;
mod error;
mod events;
mod mode;
mod query;
mod registry;
mod shared;
mod source;
mod state;
mod transform;
mod view;
mod visibility;

pub use config::StateConfig;
pub use error::{EntityKind, Error, Result};
pub use events::{ChangeRecorder, ListenerId, RecordedChange, ViewerStateChange, ViewerStateListener};
pub use mode::{DisplayMode, Interpolation};
pub use query::{StateData, ViewerStateQuery};
pub use registry::Registry;
pub use shared::SharedViewerState;
pub use source::{ImageSource, Source, SourceGroup, StaticSource};
pub use state::{ViewerState, ViewerStateMut};
pub use transform::AffineTransform3D;
pub use view::{ReadOnlyViewerState, ViewerSnapshot};
pub use visibility::Selections;
