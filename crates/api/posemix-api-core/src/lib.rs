//! posemix-api-core: array-backed math, transforms and attribute values (engine-agnostic)

pub mod attribute;
pub mod blend;
pub mod quat;
pub mod serde_pairs;
pub mod tolerance;
pub mod transform;

pub use attribute::{AttributeId, AttributeKind, AttributeValue, BONE_NAMESPACE, INDEX_NONE};
pub use quat::{Quat, Vec3};
pub use tolerance::{
    is_nearly_equal, is_nearly_zero, KINDA_SMALL_NUMBER, SMALL_NUMBER, ZERO_ANIM_WEIGHT_THRESH,
};
pub use transform::Transform;
