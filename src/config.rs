#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::{
    angle::degree,
    f64::{Angle, Length},
    length::meter,
};

use crate::optic::GroundSampleDistance;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("expected {field} to be {expected} but got: {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// What the geometric filter does when a population's median direction or
/// distance is exactly zero and the relative test is undefined.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ZeroMedianPolicy {
    /// Fail with `EstimateError::DegenerateFilterMedian`.
    Reject,

    /// Compare the degenerate axis against an absolute tolerance instead.
    AbsoluteTolerance { direction_deg: f64, distance_px: f64 },
}

impl ZeroMedianPolicy {
    pub fn direction_tolerance(&self) -> Option<Angle> {
        match self {
            ZeroMedianPolicy::Reject => None,
            ZeroMedianPolicy::AbsoluteTolerance { direction_deg, .. } => {
                Some(Angle::new::<degree>(*direction_deg))
            }
        }
    }

    pub fn distance_tolerance(&self) -> Option<f64> {
        match self {
            ZeroMedianPolicy::Reject => None,
            ZeroMedianPolicy::AbsoluteTolerance { distance_px, .. } => Some(*distance_px),
        }
    }
}

/// Tuning for a single estimation run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Number of prior images each new image is compared against.
    pub lookbehind: usize,

    /// Allowed relative deviation from the median match direction, in percent.
    pub angle_tolerance_pct: f64,

    /// Allowed relative deviation from the median match distance, in percent.
    pub distance_tolerance_pct: f64,

    /// Pairs with fewer surviving matches than this produce no match sample.
    pub min_match_count: usize,

    /// Samples further than this many standard deviations from the mean are outliers.
    pub anomalous_deviation: f64,

    /// A channel needs this many inlier samples before it reports a summary.
    pub min_sample_count: usize,

    pub earth_radius_m: f64,

    /// Height of the platform above `earth_radius_m`.
    pub platform_altitude_m: f64,

    /// Nominal ground sample distance at `gsd_reference_px`.
    pub gsd_cm_per_px: f64,

    /// Resolution (width, height) at which `gsd_cm_per_px` was measured.
    pub gsd_reference_px: (u32, u32),

    /// Weight used for a channel whose inlier samples have zero variance.
    pub zero_variance_weight: f64,

    pub zero_median: ZeroMedianPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookbehind: 2,
            angle_tolerance_pct: 25.0,
            distance_tolerance_pct: 25.0,
            min_match_count: 100,
            anomalous_deviation: 2.0,
            min_sample_count: 5,
            earth_radius_m: 6_371_000.0,
            platform_altitude_m: 408_000.0,
            gsd_cm_per_px: 12_648.0,
            gsd_reference_px: (4056, 3040),
            zero_variance_weight: 1000.0,
            zero_median: ZeroMedianPolicy::Reject,
        }
    }
}

impl PipelineConfig {
    /// Radius of the sphere the platform travels on.
    pub fn orbital_radius(&self) -> Length {
        Length::new::<meter>(self.earth_radius_m + self.platform_altitude_m)
    }

    pub fn ground_sample_distance(&self) -> GroundSampleDistance {
        GroundSampleDistance::new(self.gsd_cm_per_px, self.gsd_reference_px)
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(
            field: &'static str,
            expected: &'static str,
            value: f64,
            ok: bool,
        ) -> Result<(), ConfigError> {
            match ok && value.is_finite() {
                true => Ok(()),
                false => Err(ConfigError::OutOfRange {
                    field,
                    expected,
                    value,
                }),
            }
        }

        check(
            "lookbehind",
            "at least 1",
            self.lookbehind as f64,
            self.lookbehind >= 1,
        )?;
        check(
            "angle_tolerance_pct",
            "non-negative",
            self.angle_tolerance_pct,
            self.angle_tolerance_pct >= 0.0,
        )?;
        check(
            "distance_tolerance_pct",
            "non-negative",
            self.distance_tolerance_pct,
            self.distance_tolerance_pct >= 0.0,
        )?;
        check(
            "anomalous_deviation",
            "non-negative",
            self.anomalous_deviation,
            self.anomalous_deviation >= 0.0,
        )?;
        check(
            "orbital radius",
            "greater than zero",
            self.earth_radius_m + self.platform_altitude_m,
            self.earth_radius_m + self.platform_altitude_m > 0.0,
        )?;
        check(
            "gsd_cm_per_px",
            "greater than zero",
            self.gsd_cm_per_px,
            self.gsd_cm_per_px > 0.0,
        )?;

        let (cols, rows) = self.gsd_reference_px;
        let reference = cols as f64 * rows as f64;
        check(
            "gsd_reference_px",
            "a non-empty resolution",
            reference,
            reference > 0.0,
        )?;
        check(
            "zero_variance_weight",
            "greater than zero",
            self.zero_variance_weight,
            self.zero_variance_weight > 0.0,
        )?;

        if let ZeroMedianPolicy::AbsoluteTolerance {
            direction_deg,
            distance_px,
        } = self.zero_median
        {
            check(
                "zero_median.direction_deg",
                "non-negative",
                direction_deg,
                direction_deg >= 0.0,
            )?;
            check(
                "zero_median.distance_px",
                "non-negative",
                distance_px,
                distance_px >= 0.0,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn default_is_valid() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn default_orbital_radius() {
        assert_relative_eq!(
            PipelineConfig::default().orbital_radius().get::<meter>(),
            6_779_000.0
        );
    }

    #[rstest]
    #[case(PipelineConfig { lookbehind: 0, ..Default::default() }, "lookbehind")]
    #[case(PipelineConfig { angle_tolerance_pct: -1.0, ..Default::default() }, "angle_tolerance_pct")]
    #[case(PipelineConfig { distance_tolerance_pct: f64::NAN, ..Default::default() }, "distance_tolerance_pct")]
    #[case(PipelineConfig { gsd_cm_per_px: 0.0, ..Default::default() }, "gsd_cm_per_px")]
    #[case(PipelineConfig { gsd_reference_px: (0, 3040), ..Default::default() }, "gsd_reference_px")]
    #[case(PipelineConfig { zero_variance_weight: 0.0, ..Default::default() }, "zero_variance_weight")]
    #[case(
        PipelineConfig {
            zero_median: ZeroMedianPolicy::AbsoluteTolerance { direction_deg: -1.0, distance_px: 1.0 },
            ..Default::default()
        },
        "zero_median.direction_deg"
    )]
    fn invalid_config(#[case] config: PipelineConfig, #[case] expected_field: &str) {
        match config.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, expected_field),
            Ok(()) => panic!("expected {expected_field} to be rejected"),
        }
    }
}
