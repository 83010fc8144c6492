//! Voxview CLI
//!
//! Scripted replay of viewer state sessions. A script declares sources and
//! groups by name and lists mutations; replaying it reports what each step
//! changed and which sources ended up visible.

pub mod script;

pub use script::{run, Replay, Report, Script, ScriptError, Step, StepOutcome};
