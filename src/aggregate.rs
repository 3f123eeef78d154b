use crate::{config::PipelineConfig, error::EstimateError, estimator::Sample, statistics};
use uom::si::{f64::Velocity, velocity::meter_per_second};

/// Mean and confidence of one channel's inlier samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelSummary {
    mean: Velocity,
    std_dev: Velocity,

    /// Inverse variance in s²/m², or the configured fallback when the
    /// variance is zero.
    weight: f64,

    rejected: usize,
}

impl ChannelSummary {
    pub fn new(mean: Velocity, std_dev: Velocity, weight: f64, rejected: usize) -> Self {
        Self {
            mean,
            std_dev,
            weight,
            rejected,
        }
    }

    pub fn mean(&self) -> Velocity {
        self.mean
    }

    pub fn std_dev(&self) -> Velocity {
        self.std_dev
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Number of samples discarded as outliers.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Rejects outliers from a channel's full sample history and summarises the rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopulationAggregator {
    /// Samples outside `mean ± deviation_threshold · sd` are outliers.
    deviation_threshold: f64,
    min_sample_count: usize,
    zero_variance_weight: f64,
}

impl PopulationAggregator {
    pub fn new(deviation_threshold: f64, min_sample_count: usize, zero_variance_weight: f64) -> Self {
        Self {
            deviation_threshold,
            min_sample_count,
            zero_variance_weight,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.anomalous_deviation,
            config.min_sample_count,
            config.zero_variance_weight,
        )
    }

    /// Summarises `samples`, which should all come from the same channel.
    ///
    /// Deterministic: the same samples always give the same summary.
    pub fn summarize(&self, samples: &[Sample]) -> Result<ChannelSummary, EstimateError> {
        let required = self.min_sample_count.max(1);
        let speeds: Vec<f64> = samples
            .iter()
            .map(|sample| sample.speed().get::<meter_per_second>())
            .collect();

        let (Some(mean), Some(sd)) = (statistics::mean(&speeds), statistics::std_dev(&speeds))
        else {
            return Err(EstimateError::InsufficientData {
                available: 0,
                required,
            });
        };

        let inliers: Vec<f64> = match sd == 0.0 {
            true => speeds.clone(),
            false => {
                let lower = mean - self.deviation_threshold * sd;
                let upper = mean + self.deviation_threshold * sd;
                speeds
                    .iter()
                    .copied()
                    .filter(|speed| (lower..=upper).contains(speed))
                    .collect()
            }
        };

        if inliers.len() < required {
            return Err(EstimateError::InsufficientData {
                available: inliers.len(),
                required,
            });
        }

        // Non-empty, so both are present.
        let mean = statistics::mean(&inliers).unwrap_or(mean);
        let sd = statistics::std_dev(&inliers).unwrap_or(0.0);
        let weight = match sd == 0.0 {
            true => self.zero_variance_weight,
            false => sd.powi(-2),
        };

        Ok(ChannelSummary::new(
            Velocity::new::<meter_per_second>(mean),
            Velocity::new::<meter_per_second>(sd),
            weight,
            speeds.len() - inliers.len(),
        ))
    }
}
