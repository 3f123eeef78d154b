use super::{Channel, Sample, elapsed};
use crate::{config::PipelineConfig, error::EstimateError, image::Image};
use sguaba::systems::Wgs84;
use tracing::debug;
use uom::si::{
    angle::radian,
    f64::{Length, Velocity},
    length::meter,
    velocity::meter_per_second,
};

/// Great-circle distance between `a` and `b` on a sphere of `radius`.
///
/// Uses the haversine formula. Altitudes stored in the positions are ignored.
pub fn haversine(a: &Wgs84, b: &Wgs84, radius: Length) -> Length {
    let lat_a = a.latitude().get::<radian>();
    let lat_b = b.latitude().get::<radian>();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude() - a.longitude()).get::<radian>();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    radius * central_angle
}

/// Estimates speed from the geotags of two images.
///
/// Distances are measured on the sphere the platform travels on (earth
/// radius plus platform altitude) rather than on the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeotagEstimator {
    orbital_radius: Length,
}

impl GeotagEstimator {
    pub fn new(orbital_radius: Length) -> Self {
        Self { orbital_radius }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.orbital_radius())
    }

    pub fn estimate(&self, base: &Image, compare: &Image) -> Result<Sample, EstimateError> {
        let from = base
            .position()
            .ok_or(EstimateError::MissingGeotag { image: base.id() })?;
        let to = compare
            .position()
            .ok_or(EstimateError::MissingGeotag { image: compare.id() })?;

        let time = elapsed(base, compare)?;
        let distance = haversine(from, to, self.orbital_radius);
        let speed: Velocity = distance / time;

        debug!(
            base = base.id(),
            compare = compare.id(),
            distance_m = distance.get::<meter>(),
            speed_mps = speed.get::<meter_per_second>(),
            "geotag sample"
        );

        Ok(Sample::new(Channel::Geotag, speed))
    }
}
