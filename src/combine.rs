use crate::{aggregate::ChannelSummary, error::EstimateError, estimator::Channel};
use std::fmt;
use uom::si::{
    f64::Velocity,
    velocity::{kilometer_per_second, meter_per_second},
};

/// How one channel took part in a [`FinalEstimate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelContribution {
    pub channel: Channel,

    /// `None` when the channel had no usable summary.
    pub summary: Option<ChannelSummary>,
}

impl ChannelContribution {
    pub fn is_valid(&self) -> bool {
        self.summary.is_some()
    }

    pub fn weight(&self) -> Option<f64> {
        self.summary.map(|summary| summary.weight())
    }
}

/// The combined speed of all channels at one point in a run.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalEstimate {
    speed: Velocity,
    contributions: Vec<ChannelContribution>,
}

impl FinalEstimate {
    pub fn speed(&self) -> Velocity {
        self.speed
    }

    pub fn contributions(&self) -> &[ChannelContribution] {
        &self.contributions
    }

    pub fn contribution(&self, channel: Channel) -> Option<&ChannelContribution> {
        self.contributions.iter().find(|c| c.channel == channel)
    }
}

impl fmt::Display for FinalEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} km/s", self.speed.get::<kilometer_per_second>())
    }
}

/// Merges channel summaries into one speed, biased towards the channel with
/// the lowest variance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConfidenceCombiner;

impl ConfidenceCombiner {
    pub fn new() -> Self {
        Self
    }

    /// Returns the inverse-variance weighted mean of every present summary.
    ///
    /// A single present summary is used as is. The order of `contributions`
    /// does not affect the result.
    pub fn combine(
        &self,
        contributions: Vec<ChannelContribution>,
    ) -> Result<FinalEstimate, EstimateError> {
        let present: Vec<ChannelSummary> = contributions.iter().filter_map(|c| c.summary).collect();

        let speed = match present.as_slice() {
            [] => {
                return Err(EstimateError::InsufficientData {
                    available: 0,
                    required: 1,
                });
            }
            [only] => only.mean(),
            many => {
                let total_weight: f64 = many.iter().map(ChannelSummary::weight).sum();
                let weighted: f64 = many
                    .iter()
                    .map(|s| s.mean().get::<meter_per_second>() * s.weight())
                    .sum();
                Velocity::new::<meter_per_second>(weighted / total_weight)
            }
        };

        Ok(FinalEstimate {
            speed,
            contributions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn summary(mean_mps: f64, weight: f64) -> ChannelSummary {
        ChannelSummary::new(
            Velocity::new::<meter_per_second>(mean_mps),
            Velocity::new::<meter_per_second>(weight.powf(-0.5)),
            weight,
            0,
        )
    }

    fn contributions(geotag: Option<ChannelSummary>, matches: Option<ChannelSummary>) -> Vec<ChannelContribution> {
        vec![
            ChannelContribution {
                channel: Channel::Geotag,
                summary: geotag,
            },
            ChannelContribution {
                channel: Channel::Match,
                summary: matches,
            },
        ]
    }

    #[test]
    fn equal_weights_give_arithmetic_mean() {
        let estimate = ConfidenceCombiner::new()
            .combine(contributions(Some(summary(7600.0, 0.5)), Some(summary(7700.0, 0.5))))
            .unwrap();
        assert_relative_eq!(estimate.speed().get::<meter_per_second>(), 7650.0);
    }

    #[test]
    fn weight_biases_towards_confident_channel() {
        let estimate = ConfidenceCombiner::new()
            .combine(contributions(Some(summary(7600.0, 3.0)), Some(summary(8000.0, 1.0))))
            .unwrap();
        assert_relative_eq!(estimate.speed().get::<meter_per_second>(), 7700.0);
    }

    #[rstest]
    #[case(Some(summary(7660.0, 0.01)), None, 7660.0)]
    #[case(None, Some(summary(7420.0, 1000.0)), 7420.0)]
    fn single_channel_is_used_directly(
        #[case] geotag: Option<ChannelSummary>,
        #[case] matches: Option<ChannelSummary>,
        #[case] expected_mps: f64,
    ) {
        let estimate = ConfidenceCombiner::new()
            .combine(contributions(geotag, matches))
            .unwrap();
        assert_eq!(estimate.speed().get::<meter_per_second>(), expected_mps);
        assert_eq!(
            estimate.contributions().iter().filter(|c| c.is_valid()).count(),
            1
        );
    }

    #[test]
    fn order_independent() {
        let forward = ConfidenceCombiner::new()
            .combine(contributions(Some(summary(7600.0, 2.0)), Some(summary(7800.0, 0.7))))
            .unwrap();
        let mut reversed = contributions(Some(summary(7600.0, 2.0)), Some(summary(7800.0, 0.7)));
        reversed.reverse();
        let reversed = ConfidenceCombiner::new().combine(reversed).unwrap();

        assert_relative_eq!(
            forward.speed().get::<meter_per_second>(),
            reversed.speed().get::<meter_per_second>(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn no_channels() {
        assert!(matches!(
            ConfidenceCombiner::new().combine(contributions(None, None)),
            Err(EstimateError::InsufficientData { .. })
        ));
    }

    #[test]
    fn report_line() {
        let estimate = ConfidenceCombiner::new()
            .combine(contributions(Some(summary(7660.0, 1.0)), None))
            .unwrap();
        insta::assert_snapshot!(estimate.to_string(), @"7.6600 km/s");
        assert_relative_eq!(
            estimate.contribution(Channel::Geotag).and_then(|c| c.weight()).unwrap(),
            1.0
        );
        assert!(!estimate.contribution(Channel::Match).unwrap().is_valid());
    }
}
