use crate::statistics;
use nalgebra::Vector2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uom::si::{angle::radian, f64::Angle};

/// One feature found at `base` in the base image and at `compare` in the
/// compare image, both in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinatePair {
    base: Vector2<f64>,
    compare: Vector2<f64>,
}

impl CoordinatePair {
    pub fn new(base: Vector2<f64>, compare: Vector2<f64>) -> Self {
        Self { base, compare }
    }

    pub fn from_points(base: (f64, f64), compare: (f64, f64)) -> Self {
        Self::new(
            Vector2::new(base.0, base.1),
            Vector2::new(compare.0, compare.1),
        )
    }

    pub fn base(&self) -> &Vector2<f64> {
        &self.base
    }

    pub fn compare(&self) -> &Vector2<f64> {
        &self.compare
    }

    /// Returns the pair with base and compare points exchanged.
    pub fn swapped(self) -> Self {
        Self::new(self.compare, self.base)
    }

    pub fn displacement(&self) -> Vector2<f64> {
        self.compare - self.base
    }

    /// Angle of the displacement measured from +x towards +y.
    pub fn direction(&self) -> Angle {
        let d = self.displacement();
        Angle::new::<radian>(d.y.atan2(d.x))
    }

    /// Length of the displacement in pixels.
    pub fn distance(&self) -> f64 {
        let d = self.displacement();
        d.y.hypot(d.x)
    }
}

/// The matched features of one (base, compare) image pair.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchPopulation {
    pairs: Vec<CoordinatePair>,
}

impl MatchPopulation {
    pub fn new(pairs: Vec<CoordinatePair>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[CoordinatePair] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<CoordinatePair> {
        self.pairs
    }

    pub fn distances(&self) -> Vec<f64> {
        self.pairs.iter().map(CoordinatePair::distance).collect()
    }

    /// Directions in radians, each shifted by whole turns to lie within half a
    /// turn of the circular mean.
    ///
    /// A population that straddles the ±180° seam stays contiguous, so order
    /// statistics over these values are meaningful. Directions already near
    /// the mean are returned untouched.
    fn unwrapped_directions(&self) -> Vec<f64> {
        use std::f64::consts::{PI, TAU};

        let (sin, cos) = self
            .pairs
            .iter()
            .map(|pair| pair.direction().get::<radian>().sin_cos())
            .fold((0.0, 0.0), |(s, c), (sin, cos)| (s + sin, c + cos));
        let centre = sin.atan2(cos);

        self.pairs
            .iter()
            .map(|pair| {
                let mut direction = pair.direction().get::<radian>();
                while direction - centre > PI {
                    direction -= TAU;
                }
                while direction - centre <= -PI {
                    direction += TAU;
                }
                direction
            })
            .collect()
    }

    pub fn median_direction(&self) -> Option<Angle> {
        statistics::median(&self.unwrapped_directions())
            .map(|median| wrap(Angle::new::<radian>(median)))
    }

    pub fn direction_iqr(&self) -> Option<Angle> {
        statistics::iqr(&self.unwrapped_directions()).map(Angle::new::<radian>)
    }

    pub fn median_distance(&self) -> Option<f64> {
        statistics::median(&self.distances())
    }

    pub fn distance_iqr(&self) -> Option<f64> {
        statistics::iqr(&self.distances())
    }

    pub fn mean_distance(&self) -> Option<f64> {
        statistics::mean(&self.distances())
    }
}

/// Wraps `angle` into the half-open range (-180, 180] degrees.
pub(crate) fn wrap(mut angle: Angle) -> Angle {
    while angle > Angle::HALF_TURN {
        angle -= Angle::HALF_TURN * 2.;
    }

    while angle <= -Angle::HALF_TURN {
        angle += Angle::HALF_TURN * 2.;
    }

    angle
}

impl From<Vec<CoordinatePair>> for MatchPopulation {
    fn from(pairs: Vec<CoordinatePair>) -> Self {
        Self::new(pairs)
    }
}

impl FromIterator<CoordinatePair> for MatchPopulation {
    fn from_iter<T: IntoIterator<Item = CoordinatePair>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::angle::degree;

    #[rstest]
    #[case((0.0, 0.0), (3.0, 4.0), 53.130_102_354_155_98, 5.0)]
    #[case((10.0, 10.0), (10.0, 0.0), -90.0, 10.0)]
    #[case((5.0, 5.0), (1.0, 5.0), 180.0, 4.0)]
    fn direction_and_distance(
        #[case] base: (f64, f64),
        #[case] compare: (f64, f64),
        #[case] direction_deg: f64,
        #[case] distance: f64,
    ) {
        let pair = CoordinatePair::from_points(base, compare);
        assert_relative_eq!(pair.direction().get::<degree>(), direction_deg);
        assert_relative_eq!(pair.distance(), distance);
    }

    #[test]
    fn population_spread() {
        let population: MatchPopulation = [1.0, 2.0, 3.0, 4.0, 5.0]
            .into_iter()
            .map(|dx| CoordinatePair::from_points((0.0, 0.0), (dx, 0.0)))
            .collect();

        assert_relative_eq!(population.median_distance().unwrap(), 3.0);
        assert_relative_eq!(population.distance_iqr().unwrap(), 2.0);
        assert_relative_eq!(population.mean_distance().unwrap(), 3.0);
        assert_relative_eq!(population.median_direction().unwrap().get::<radian>(), 0.0);
    }

    #[rstest]
    #[case(5, 5, 180.0)]
    #[case(6, 4, 179.0)]
    #[case(4, 6, -179.0)]
    fn median_direction_across_half_turn(
        #[case] positive: usize,
        #[case] negative: usize,
        #[case] expected_deg: f64,
    ) {
        let at = |deg: f64| {
            let theta = deg.to_radians();
            CoordinatePair::from_points((0.0, 0.0), (theta.cos(), theta.sin()))
        };
        let population: MatchPopulation = std::iter::repeat_n(at(179.0), positive)
            .chain(std::iter::repeat_n(at(-179.0), negative))
            .collect();

        let median = population.median_direction().unwrap().get::<degree>();
        // 180 and -180 are the same direction.
        assert_relative_eq!(
            wrap(Angle::new::<degree>(median - expected_deg)).get::<degree>(),
            0.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            population.direction_iqr().unwrap().get::<degree>(),
            2.0,
            epsilon = 1e-9
        );
    }

    #[rstest]
    #[case(190.0, -170.0)]
    #[case(350.0, -10.0)]
    #[case(-200.0, 160.0)]
    #[case(45.0, 45.0)]
    fn wrap_angle(#[case] angle_deg: f64, #[case] wrapped_deg: f64) {
        assert_relative_eq!(
            wrap(Angle::new::<degree>(angle_deg)).get::<degree>(),
            wrapped_deg,
            epsilon = 1e-9
        );
    }

    #[test]
    fn swapped_reverses_direction() {
        let pair = CoordinatePair::from_points((0.0, 0.0), (1.0, 1.0));
        assert_relative_eq!(
            pair.swapped().direction().get::<degree>(),
            pair.direction().get::<degree>() - 180.0
        );
    }
}
