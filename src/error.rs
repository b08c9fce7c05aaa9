use thiserror::Error;

use crate::feeder::PrimitiveSpan;

/// Failure surfaces for the BVH builder core.
///
/// Mirrors the four error kinds the builder can produce: device-level
/// allocation failure (fatal), a scene reference the feeder could not
/// resolve (recoverable, the span is simply dropped), a validator
/// assertion (debug-only) and a validator-detected counter mismatch
/// (always a bug, never expected to recover).
#[derive(Error, Debug)]
pub enum BvhError {
    #[error("GPU buffer allocation failed for capacity {requested}: {source}")]
    Allocation {
        requested: u32,
        source: anyhow::Error,
    },

    #[error("scene span skipped, referenced mesh/subset is absent: {span:?}")]
    SceneInconsistency { span: PrimitiveSpan },

    #[error("validator assertion failed: {0}")]
    ValidationFailed(String),

    #[error("visit counter at internal node {node} is {value}, expected <= 2")]
    CounterMismatch { node: u32, value: u32 },
}

pub type Result<T> = std::result::Result<T, BvhError>;
