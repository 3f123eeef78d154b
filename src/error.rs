use crate::matcher::MatchError;
use thiserror::Error;

/// Soft failures raised while turning image pairs into speed estimates.
///
/// None of these end a run. The affected pair or channel is skipped for the
/// current tick and the accumulated samples are left untouched.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("image {image} has no geotag")]
    MissingGeotag { image: u64 },
    #[error("images {base} and {compare} were captured at the same instant")]
    DegenerateTimeDelta { base: u64, compare: u64 },
    #[error("expected at least {required} consistent matches but found {found}")]
    InsufficientMatches { found: usize, required: usize },
    #[error("expected at least {required} samples but only {available} survived filtering")]
    InsufficientData { available: usize, required: usize },
    #[error("match population has a zero median direction or distance")]
    DegenerateFilterMedian,
    #[error("feature matching failed: {0}")]
    MatchingFailed(#[from] MatchError),
}
