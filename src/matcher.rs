use crate::{image::Image, matches::CoordinatePair};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("too few features detected in image {image}")]
    TooFewFeatures { image: u64 },
    #[error("no recorded matches for images {base} -> {compare}")]
    NotRecorded { base: u64, compare: u64 },
}

/// An image-matching engine that finds corresponding points between two images.
pub trait FeatureMatcher {
    /// Returns candidate pairs with the first point in `base` and the second in `compare`.
    fn match_features(
        &mut self,
        base: &Image,
        compare: &Image,
    ) -> Result<Vec<CoordinatePair>, MatchError>;
}

impl<M: FeatureMatcher + ?Sized> FeatureMatcher for Box<M> {
    fn match_features(
        &mut self,
        base: &Image,
        compare: &Image,
    ) -> Result<Vec<CoordinatePair>, MatchError> {
        (**self).match_features(base, compare)
    }
}

/// Serves matches computed ahead of time, keyed by image identifiers.
#[derive(Clone, Debug, Default)]
pub struct RecordedMatcher {
    recorded: HashMap<(u64, u64), Vec<CoordinatePair>>,
}

impl RecordedMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `pairs` as the matches from image `base` to image `compare`.
    pub fn record(&mut self, base: u64, compare: u64, pairs: Vec<CoordinatePair>) {
        self.recorded.insert((base, compare), pairs);
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }
}

impl FeatureMatcher for RecordedMatcher {
    fn match_features(
        &mut self,
        base: &Image,
        compare: &Image,
    ) -> Result<Vec<CoordinatePair>, MatchError> {
        let key = (base.id(), compare.id());
        if let Some(pairs) = self.recorded.get(&key) {
            return Ok(pairs.clone());
        }

        // A recording in the opposite direction only needs its points swapped.
        self.recorded
            .get(&(key.1, key.0))
            .map(|pairs| pairs.iter().copied().map(CoordinatePair::swapped).collect())
            .ok_or(MatchError::NotRecorded {
                base: key.0,
                compare: key.1,
            })
    }
}
