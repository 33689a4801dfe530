//! Root motion data shared between a mixer's conversion/store tasks and the host.
//!
//! Access discipline per evaluation pass: `initialize` takes the write lock once,
//! before any task of that pass reads the cached conversion transforms.

use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use posemix_api_core::{quat, Quat, Transform};

static INTERACTIVE_MOVE_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

/// Flag the host raises while an object is being moved interactively; root motion
/// writes to scene components are suppressed while it is set.
pub fn set_interactive_move_in_progress(active: bool) {
    INTERACTIVE_MOVE_IN_PROGRESS.store(active, Ordering::Release);
}

pub fn is_interactive_move_in_progress() -> bool {
    INTERACTIVE_MOVE_IN_PROGRESS.load(Ordering::Acquire)
}

/// What happens to the resolved root motion after mixing.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RootMotionDestination {
    Discard,
    KeepOnRootBone,
    ApplyToComponent,
    #[default]
    ApplyToActor,
    /// Keep the root attributes on the keyframe for external consumers.
    LeaveAsAttribute,
}

/// Bitmask selecting how a pose's root is converted to world space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RootMotionConversion(u8);

impl RootMotionConversion {
    pub const NONE: Self = Self(0);
    /// Use the track's explicit root transform instead of the pose's root bone.
    pub const APPLY_ROOT_OVERRIDE: Self = Self(1 << 0);
    /// The component carries a keyed world transform this frame.
    pub const COMPONENT_HAS_KEYED_TRANSFORM: Self = Self(1 << 1);
    /// Offset the result by the track's transform origin.
    pub const APPLY_TRANSFORM_ORIGIN: Self = Self(1 << 2);

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RootMotionConversion {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RootMotionConversion {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// World transforms sampled from the host once per pass.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ComponentTransforms {
    pub component_world: Transform,
    pub actor_world: Transform,
}

/// Conversion transforms cached by `initialize`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConversionCache {
    pub component_world: Transform,
    pub actor_world: Transform,
    pub component_to_actor: Transform,
    pub inverse_mesh_to_actor_rotation: Quat,
}

impl Default for ConversionCache {
    fn default() -> Self {
        Self {
            component_world: Transform::IDENTITY,
            actor_world: Transform::IDENTITY,
            component_to_actor: Transform::IDENTITY,
            inverse_mesh_to_actor_rotation: quat::IDENTITY,
        }
    }
}

/// World transform the host should apply after the pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RootMotionWrite {
    Component(Transform),
    Actor(Transform),
}

#[derive(Debug, Default)]
struct RootMotionState {
    destination: RootMotionDestination,
    cache: ConversionCache,
    root_transform: Option<Transform>,
    root_delta: Option<Transform>,
    pending: Option<RootMotionWrite>,
}

#[derive(Debug, Default)]
pub struct RootMotionData {
    state: RwLock<RootMotionState>,
}

pub type SharedRootMotion = Arc<RootMotionData>;

impl RootMotionData {
    pub fn new(destination: RootMotionDestination) -> Self {
        Self {
            state: RwLock::new(RootMotionState {
                destination,
                ..Default::default()
            }),
        }
    }

    pub fn shared(destination: RootMotionDestination) -> SharedRootMotion {
        Arc::new(Self::new(destination))
    }

    fn read<R>(&self, f: impl FnOnce(&RootMotionState) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut RootMotionState) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Refresh the conversion transforms and clear last pass's results.
    pub fn initialize(&self, transforms: ComponentTransforms) {
        let component_to_actor = transforms
            .component_world
            .relative_to(&transforms.actor_world);
        self.write(|state| {
            state.cache = ConversionCache {
                component_world: transforms.component_world,
                actor_world: transforms.actor_world,
                component_to_actor,
                inverse_mesh_to_actor_rotation: quat::inverse(component_to_actor.rotation),
            };
            state.root_transform = None;
            state.root_delta = None;
            state.pending = None;
        });
    }

    pub fn conversion(&self) -> ConversionCache {
        self.read(|state| state.cache)
    }

    pub fn destination(&self) -> RootMotionDestination {
        self.read(|state| state.destination)
    }

    pub fn set_destination(&self, destination: RootMotionDestination) {
        self.write(|state| state.destination = destination);
    }

    /// Store the resolved root transform and delta of this pass.
    pub fn record(
        &self,
        root_transform: Option<Transform>,
        root_delta: Option<Transform>,
        pending: Option<RootMotionWrite>,
    ) {
        self.write(|state| {
            state.root_transform = root_transform;
            state.root_delta = root_delta;
            state.pending = pending;
        });
    }

    pub fn root_transform(&self) -> Option<Transform> {
        self.read(|state| state.root_transform)
    }

    pub fn root_delta(&self) -> Option<Transform> {
        self.read(|state| state.root_delta)
    }

    pub fn pending_write(&self) -> Option<RootMotionWrite> {
        self.read(|state| state.pending)
    }

    pub fn take_pending_write(&self) -> Option<RootMotionWrite> {
        self.write(|state| state.pending.take())
    }
}
