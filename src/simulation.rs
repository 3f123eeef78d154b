//! Synthetic captures and matches along a known orbit, for testing the
//! pipeline end to end without hardware or recorded data.

use crate::{
    camera::{Camera, CaptureError},
    image::Image,
    matcher::{FeatureMatcher, MatchError},
    matches::CoordinatePair,
    optic::GroundSampleDistance,
};
use chrono::{DateTime, TimeDelta, Utc};
use nalgebra::{Rotation2, Vector2};
use rand::{
    Rng, SeedableRng,
    distr::{Distribution, Uniform},
    rngs::StdRng,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use sguaba::systems::Wgs84;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, trace};
use uom::{
    ConstZero,
    si::{
        angle::{degree, radian},
        f64::{Angle, Length, Velocity},
        length::meter,
        velocity::meter_per_second,
    },
};

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("empty sampling range")]
    EmptyRange,
    #[error("non-finite sampling bound")]
    NonFinite,
    #[error("expected {name} between 0 and 1 but got: {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("expected latitude between -90 and 90 degrees but got: {0}")]
    InvalidLatitude(f64),
}

impl From<rand::distr::uniform::Error> for SimulationError {
    fn from(err: rand::distr::uniform::Error) -> Self {
        match err {
            rand::distr::uniform::Error::EmptyRange => SimulationError::EmptyRange,
            rand::distr::uniform::Error::NonFinite => SimulationError::NonFinite,
        }
    }
}

/// Describes a simulated pass over the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbitParams {
    /// Latitude and longitude of the first capture.
    pub start_deg: (f64, f64),

    /// Initial bearing of the track, clockwise from north. Simulated images
    /// are north-up with +x east and +y north, so features move at
    /// `90° - heading_deg` from +x towards +y.
    pub heading_deg: f64,

    pub speed_mps: f64,
    pub orbital_radius_m: f64,
    pub interval_s: f64,
    pub frame_count: usize,
    pub image_size_px: (u32, u32),

    /// Probability that a frame is captured without a geotag.
    pub geotag_dropout: f64,

    pub seed: u64,
}

impl Default for OrbitParams {
    fn default() -> Self {
        Self {
            start_deg: (0.0, 0.0),
            heading_deg: 51.6,
            speed_mps: 7660.0,
            orbital_radius_m: 6_779_000.0,
            interval_s: 10.0,
            frame_count: 54,
            image_size_px: (4056, 3040),
            geotag_dropout: 0.0,
            seed: 0,
        }
    }
}

/// A platform moving along a great circle at constant speed.
#[derive(Clone, Debug)]
pub struct OrbitSimulation {
    params: OrbitParams,
    start_time: DateTime<Utc>,
}

impl OrbitSimulation {
    pub fn new(params: OrbitParams, start_time: DateTime<Utc>) -> Result<Self, SimulationError> {
        let (latitude, longitude) = params.start_deg;
        for value in [
            latitude,
            longitude,
            params.heading_deg,
            params.speed_mps,
            params.orbital_radius_m,
            params.interval_s,
        ] {
            if !value.is_finite() {
                return Err(SimulationError::NonFinite);
            }
        }

        if params.interval_s <= 0.0 || params.orbital_radius_m <= 0.0 {
            return Err(SimulationError::EmptyRange);
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(SimulationError::InvalidLatitude(latitude));
        }

        probability("geotag_dropout", params.geotag_dropout)?;

        Ok(Self { params, start_time })
    }

    pub fn params(&self) -> &OrbitParams {
        &self.params
    }

    pub fn speed(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.params.speed_mps)
    }

    pub fn heading(&self) -> Angle {
        Angle::new::<degree>(self.params.heading_deg)
    }

    /// Direction of travel in image coordinates, from +x towards +y.
    pub fn image_direction(&self) -> Angle {
        Angle::new::<degree>(90.0 - self.params.heading_deg)
    }

    pub fn timestamp_at(&self, index: usize) -> DateTime<Utc> {
        let offset_ms = (self.params.interval_s * 1000.0 * index as f64).round() as i64;
        self.start_time + TimeDelta::milliseconds(offset_ms)
    }

    /// Position of the platform at the `index`th capture.
    pub fn position_at(&self, index: usize) -> Result<Wgs84, SimulationError> {
        let (lat_1, lon_1) = (
            self.params.start_deg.0.to_radians(),
            self.params.start_deg.1.to_radians(),
        );
        let bearing = self.params.heading_deg.to_radians();

        let travelled = self.params.speed_mps * self.params.interval_s * index as f64;
        let delta = travelled / self.params.orbital_radius_m;

        let lat_2 = (lat_1.sin() * delta.cos() + lat_1.cos() * delta.sin() * bearing.cos()).asin();
        let lon_2 = lon_1
            + (bearing.sin() * delta.sin() * lat_1.cos())
                .atan2(delta.cos() - lat_1.sin() * lat_2.sin());

        position(
            Angle::new::<radian>(lat_2),
            Angle::new::<radian>(wrap_longitude(lon_2)),
        )
    }

    /// Every frame of the pass, with geotags dropped at the configured rate.
    pub fn frames(&self) -> Result<Vec<Image>, SimulationError> {
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let unit = Uniform::new(0.0, 1.0)?;
        let (width, height) = self.params.image_size_px;

        (0..self.params.frame_count)
            .map(|index| {
                let image = Image::new(index as u64, self.timestamp_at(index), width, height);
                match unit.sample(&mut rng) < self.params.geotag_dropout {
                    true => {
                        trace!(image = index, "dropping geotag");
                        Ok(image)
                    }
                    false => Ok(image.with_position(self.position_at(index)?)),
                }
            })
            .collect()
    }

    pub fn camera(&self) -> Result<SimulatedCamera, SimulationError> {
        Ok(SimulatedCamera {
            frames: self.frames()?.into(),
        })
    }

    /// A matcher consistent with this pass, with displacements along
    /// [`Self::image_direction`].
    pub fn matcher(
        &self,
        gsd: GroundSampleDistance,
        noise: MatchNoise,
    ) -> Result<SimulatedMatcher<StdRng>, SimulationError> {
        SimulatedMatcher::try_new(
            self.speed(),
            self.image_direction(),
            gsd,
            noise,
            StdRng::seed_from_u64(self.params.seed.wrapping_add(1)),
        )
    }
}

/// Wraps a longitude in radians into [-π, π).
fn wrap_longitude(longitude: f64) -> f64 {
    use std::f64::consts::PI;
    (longitude + PI).rem_euclid(2.0 * PI) - PI
}

fn probability(name: &'static str, value: f64) -> Result<f64, SimulationError> {
    match (0.0..=1.0).contains(&value) {
        true => Ok(value),
        false => Err(SimulationError::InvalidProbability { name, value }),
    }
}

fn position(latitude: Angle, longitude: Angle) -> Result<Wgs84, SimulationError> {
    Ok(Wgs84::builder()
        .latitude(latitude)
        .ok_or(SimulationError::InvalidLatitude(latitude.get::<degree>()))?
        .longitude(longitude)
        .altitude(Length::ZERO)
        .build())
}

/// Replays the frames of an [`OrbitSimulation`].
#[derive(Clone, Debug)]
pub struct SimulatedCamera {
    frames: VecDeque<Image>,
}

impl Camera for SimulatedCamera {
    fn capture(&mut self) -> Result<Image, CaptureError> {
        self.frames.pop_front().ok_or(CaptureError::Exhausted)
    }
}

/// How far simulated matches stray from the true displacement.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchNoise {
    pub match_count: usize,

    /// Per-axis jitter as a fraction of the true displacement.
    pub jitter: f64,

    /// Probability that a match is rotated away from the true direction.
    pub outlier_fraction: f64,

    /// Probability that matching fails outright for a pair.
    pub feature_dropout: f64,
}

impl Default for MatchNoise {
    fn default() -> Self {
        Self {
            match_count: 150,
            jitter: 0.01,
            outlier_fraction: 0.1,
            feature_dropout: 0.0,
        }
    }
}

/// Synthesises matches for a platform moving at a known speed and direction.
#[derive(Clone, Debug)]
pub struct SimulatedMatcher<R> {
    speed: Velocity,
    direction: Angle,
    gsd: GroundSampleDistance,
    noise: MatchNoise,
    unit: Uniform<f64>,
    jitter: Uniform<f64>,

    /// Rotation applied to outliers; never close enough to the true
    /// direction to pass the filter.
    outlier_rotation: Uniform<f64>,

    rng: R,
}

impl<R: Rng> SimulatedMatcher<R> {
    pub fn try_new(
        speed: Velocity,
        direction: Angle,
        gsd: GroundSampleDistance,
        noise: MatchNoise,
        rng: R,
    ) -> Result<Self, SimulationError> {
        probability("outlier_fraction", noise.outlier_fraction)?;
        probability("feature_dropout", noise.feature_dropout)?;

        Ok(Self {
            speed,
            direction,
            gsd,
            noise,
            unit: Uniform::new(0.0, 1.0)?,
            jitter: Uniform::new_inclusive(-noise.jitter, noise.jitter)?,
            outlier_rotation: Uniform::new(60f64.to_radians(), 300f64.to_radians())?,
            rng,
        })
    }

    /// True displacement in pixels between two captures `elapsed_s` apart.
    fn displacement(&self, elapsed_s: f64, width: u32, height: u32) -> Option<Vector2<f64>> {
        let gsd = self.gsd.scaled_for(width, height)?;
        let shift_px = self.speed.get::<meter_per_second>() * elapsed_s / gsd.get::<meter>();
        let direction = self.direction.get::<radian>();
        Some(Vector2::new(direction.cos(), direction.sin()) * shift_px)
    }
}

impl<R: Rng> FeatureMatcher for SimulatedMatcher<R> {
    fn match_features(
        &mut self,
        base: &Image,
        compare: &Image,
    ) -> Result<Vec<CoordinatePair>, MatchError> {
        let elapsed_s = (base.timestamp() - compare.timestamp()).num_milliseconds().abs() as f64 / 1000.0;

        if self.unit.sample(&mut self.rng) < self.noise.feature_dropout {
            return Err(MatchError::TooFewFeatures { image: base.id() });
        }

        let (width, height) = (base.width() as f64, base.height() as f64);
        let truth = self
            .displacement(elapsed_s, base.width(), base.height())
            .ok_or(MatchError::TooFewFeatures { image: base.id() })?;

        let mut outliers = 0;
        let pairs = (0..self.noise.match_count)
            .map(|_| {
                let origin = Vector2::new(
                    self.unit.sample(&mut self.rng) * width,
                    self.unit.sample(&mut self.rng) * height,
                );
                let jitter = Vector2::new(
                    self.jitter.sample(&mut self.rng),
                    self.jitter.sample(&mut self.rng),
                ) * truth.norm();
                let mut shift = truth + jitter;

                if self.unit.sample(&mut self.rng) < self.noise.outlier_fraction {
                    outliers += 1;
                    shift = Rotation2::new(self.outlier_rotation.sample(&mut self.rng)) * shift;
                }

                CoordinatePair::new(origin, origin + shift)
            })
            .collect();

        debug!(
            base = base.id(),
            compare = compare.id(),
            shift_px = truth.norm(),
            outliers,
            "simulated matches"
        );

        Ok(pairs)
    }
}
