use crate::ids::EntryHandle;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MixerError {
    /// Entry was unlinked (or its slot reused) since the handle was issued
    #[error("stale mixer entry handle {0}")]
    StaleHandle(EntryHandle),

    #[error("mixer entry weight must be finite, got {weight}")]
    InvalidWeight { weight: f32 },
}
