//! posemix-mixer-core: priority-grouped mixing of pose sources (engine-agnostic)
//!
//! Producers link entries (task, priority, weight, additive flag, optional root
//! motion) to a mixer keyed by bound object and target. Each pass the system
//! resolves changed mixers into frozen programs and hands the consumer one
//! `ExecuteProgram` task per mixer.

pub mod arena;
pub mod config;
pub mod entry;
pub mod error;
pub mod host;
pub mod ids;
pub mod mixer;
pub mod resolve;
pub mod system;

pub use arena::EntryArena;
pub use config::MixerConfig;
pub use entry::{MixerEntry, RootMotionSettings};
pub use error::MixerError;
pub use host::{evaluate_target, SceneHost};
pub use ids::{EntryHandle, MixerKey, ObjectId};
pub use mixer::{Mixer, MixerChange};
pub use resolve::{resolve, sort_entries, BandSummary, RootMotionPlan};
pub use system::MixerSystem;
