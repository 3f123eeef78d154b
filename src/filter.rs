use crate::{
    config::ZeroMedianPolicy,
    error::EstimateError,
    matches::{CoordinatePair, MatchPopulation, wrap},
};
use tracing::debug;
use uom::si::{
    angle::{degree, radian},
    f64::Angle,
};

/// Rejects matches whose displacement disagrees with the population's own
/// median direction or median distance.
///
/// Between two frames of a fast moving platform the scene shifts by one
/// dominant translation, so true matches cluster tightly in both angle and
/// length. A pair is kept only if both its direction and its distance lie
/// within a relative tolerance of the respective median.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometricFilter {
    /// Fraction, not percent.
    angle_tolerance: f64,

    /// Fraction, not percent.
    distance_tolerance: f64,

    zero_median: ZeroMedianPolicy,
}

impl GeometricFilter {
    pub fn new(
        angle_tolerance_pct: f64,
        distance_tolerance_pct: f64,
        zero_median: ZeroMedianPolicy,
    ) -> Self {
        Self {
            angle_tolerance: angle_tolerance_pct / 100.0,
            distance_tolerance: distance_tolerance_pct / 100.0,
            zero_median,
        }
    }

    /// Returns the subset of `population` consistent with its medians.
    ///
    /// An empty population is returned unchanged. A zero median is handled
    /// according to the configured [`ZeroMedianPolicy`].
    pub fn filter(&self, population: MatchPopulation) -> Result<MatchPopulation, EstimateError> {
        let (Some(median_direction), Some(median_distance)) =
            (population.median_direction(), population.median_distance())
        else {
            return Ok(population);
        };

        let direction_test = DirectionTest::new(
            median_direction,
            self.angle_tolerance,
            self.zero_median.direction_tolerance(),
        )?;
        let distance_test = DistanceTest::new(
            median_distance,
            self.distance_tolerance,
            self.zero_median.distance_tolerance(),
        )?;

        let total = population.len();
        let direction_iqr = population.direction_iqr().map(|iqr| iqr.get::<degree>());
        let distance_iqr = population.distance_iqr();
        let filtered: MatchPopulation = population
            .into_pairs()
            .into_iter()
            .filter(|pair| direction_test.accepts(pair) && distance_test.accepts(pair))
            .collect();

        debug!(
            median_direction_deg = median_direction.get::<degree>(),
            median_distance_px = median_distance,
            direction_iqr_deg = direction_iqr,
            distance_iqr_px = distance_iqr,
            kept = filtered.len(),
            total,
            "filtered match population"
        );

        Ok(filtered)
    }
}

enum DirectionTest {
    Relative { median: Angle, tolerance: f64 },
    Absolute { median: Angle, tolerance: Angle },
}

impl DirectionTest {
    fn new(
        median: Angle,
        tolerance: f64,
        fallback: Option<Angle>,
    ) -> Result<Self, EstimateError> {
        if median.get::<radian>() != 0.0 {
            return Ok(Self::Relative { median, tolerance });
        }

        match fallback {
            Some(tolerance) => Ok(Self::Absolute { median, tolerance }),
            None => Err(EstimateError::DegenerateFilterMedian),
        }
    }

    fn accepts(&self, pair: &CoordinatePair) -> bool {
        match self {
            DirectionTest::Relative { median, tolerance } => {
                let residual = wrap(pair.direction() - *median).get::<radian>();
                (residual / median.get::<radian>()).abs() <= *tolerance
            }
            DirectionTest::Absolute { median, tolerance } => {
                wrap(pair.direction() - *median).abs() <= *tolerance
            }
        }
    }
}

enum DistanceTest {
    Relative { median: f64, tolerance: f64 },
    Absolute { median: f64, tolerance: f64 },
}

impl DistanceTest {
    fn new(median: f64, tolerance: f64, fallback: Option<f64>) -> Result<Self, EstimateError> {
        if median != 0.0 {
            return Ok(Self::Relative { median, tolerance });
        }

        match fallback {
            Some(tolerance) => Ok(Self::Absolute { median, tolerance }),
            None => Err(EstimateError::DegenerateFilterMedian),
        }
    }

    fn accepts(&self, pair: &CoordinatePair) -> bool {
        match self {
            DistanceTest::Relative { median, tolerance } => {
                ((pair.distance() - median) / median).abs() <= *tolerance
            }
            DistanceTest::Absolute { median, tolerance } => {
                (pair.distance() - median).abs() <= *tolerance
            }
        }
    }
}
