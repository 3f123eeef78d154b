mod geotag;
mod image_match;

pub use geotag::{GeotagEstimator, haversine};
pub use image_match::MatchEstimator;

use crate::{error::EstimateError, image::Image};
use std::fmt;
use uom::si::{
    f64::{Time, Velocity},
    time::{microsecond, millisecond, nanosecond},
};

/// An independent source of speed measurements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Great-circle distance between the geotags of two images.
    Geotag,

    /// Pixel displacement of matched features scaled by the ground sample distance.
    Match,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Geotag => write!(f, "GeoTag"),
            Channel::Match => write!(f, "Match"),
        }
    }
}

/// A single speed measurement from one image pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    channel: Channel,
    speed: Velocity,
}

impl Sample {
    pub fn new(channel: Channel, speed: Velocity) -> Self {
        Self { channel, speed }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn speed(&self) -> Velocity {
        self.speed
    }
}

/// Absolute time between the captures of `base` and `compare`.
///
/// Fails only when both carry the same timestamp.
pub(crate) fn elapsed(base: &Image, compare: &Image) -> Result<Time, EstimateError> {
    let delta = compare.timestamp() - base.timestamp();
    if delta.is_zero() {
        return Err(EstimateError::DegenerateTimeDelta {
            base: base.id(),
            compare: compare.id(),
        });
    }

    // Keep the finest resolution that does not overflow.
    let time = match (delta.num_nanoseconds(), delta.num_microseconds()) {
        (Some(ns), _) => Time::new::<nanosecond>(ns.unsigned_abs() as f64),
        (None, Some(us)) => Time::new::<microsecond>(us.unsigned_abs() as f64),
        (None, None) => Time::new::<millisecond>(delta.num_milliseconds().unsigned_abs() as f64),
    };

    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeDelta, TimeZone, Utc};
    use uom::si::time::second;

    #[test]
    fn elapsed_is_direction_agnostic() {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 19, 10, 0, 0).unwrap();
        let early = Image::new(1, t0, 4056, 3040);
        let late = Image::new(2, t0 + TimeDelta::seconds(10), 4056, 3040);

        assert_relative_eq!(elapsed(&early, &late).unwrap().get::<second>(), 10.0);
        assert_relative_eq!(elapsed(&late, &early).unwrap().get::<second>(), 10.0);
    }

    #[test]
    fn sub_millisecond_captures() {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 19, 10, 0, 0).unwrap();
        let early = Image::new(1, t0, 10, 10);
        let late = Image::new(2, t0 + TimeDelta::microseconds(500), 10, 10);

        assert_relative_eq!(
            elapsed(&early, &late).unwrap().get::<microsecond>(),
            500.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn simultaneous_captures() {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 19, 10, 0, 0).unwrap();
        assert!(matches!(
            elapsed(&Image::new(1, t0, 10, 10), &Image::new(2, t0, 10, 10)),
            Err(EstimateError::DegenerateTimeDelta { base: 1, compare: 2 })
        ));
    }
}
