use super::{Channel, Sample, elapsed};
use crate::{
    config::PipelineConfig, error::EstimateError, filter::GeometricFilter, image::Image,
    matches::MatchPopulation, optic::GroundSampleDistance,
};
use tracing::debug;
use uom::si::{
    f64::{Length, Velocity},
    length::meter,
    velocity::meter_per_second,
};

/// Estimates speed from the displacement of features matched between two images.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchEstimator {
    filter: GeometricFilter,
    gsd: GroundSampleDistance,
    min_match_count: usize,
}

impl MatchEstimator {
    pub fn new(filter: GeometricFilter, gsd: GroundSampleDistance, min_match_count: usize) -> Self {
        Self {
            filter,
            gsd,
            min_match_count,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            GeometricFilter::new(
                config.angle_tolerance_pct,
                config.distance_tolerance_pct,
                config.zero_median,
            ),
            config.ground_sample_distance(),
            config.min_match_count,
        )
    }

    /// Filters `matches` found between `base` and `compare` and converts
    /// their mean displacement into a speed.
    ///
    /// Pairs left with fewer than the minimum match count are reported as
    /// `InsufficientMatches` so that a noisy pair never reaches the aggregate.
    pub fn estimate(
        &self,
        matches: MatchPopulation,
        base: &Image,
        compare: &Image,
    ) -> Result<Sample, EstimateError> {
        let raw_count = matches.len();
        let filtered = self.filter.filter(matches)?;
        let required = self.min_match_count.max(1);

        if filtered.len() < required {
            return Err(EstimateError::InsufficientMatches {
                found: filtered.len(),
                required,
            });
        }

        let (Some(mean_px), Some(gsd)) = (
            filtered.mean_distance(),
            self.gsd.scaled_for(base.width(), base.height()),
        ) else {
            // An image without pixels cannot hold any features.
            return Err(EstimateError::InsufficientMatches { found: 0, required });
        };

        let time = elapsed(base, compare)?;
        let distance: Length = gsd * mean_px;
        let speed: Velocity = distance / time;

        debug!(
            base = base.id(),
            compare = compare.id(),
            raw = raw_count,
            kept = filtered.len(),
            mean_px,
            distance_m = distance.get::<meter>(),
            speed_mps = speed.get::<meter_per_second>(),
            "match sample"
        );

        Ok(Sample::new(Channel::Match, speed))
    }
}
