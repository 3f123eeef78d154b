#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::centimeter};

/// Ground distance covered by one pixel, measured at a reference resolution.
///
/// Images captured at a different resolution cover the same ground with a
/// different number of pixels, so the nominal value is rescaled by pixel
/// count before use.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroundSampleDistance {
    cm_per_px: f64,
    reference_px: (u32, u32),
}

impl GroundSampleDistance {
    pub fn new(cm_per_px: f64, reference_px: (u32, u32)) -> Self {
        Self {
            cm_per_px,
            reference_px,
        }
    }

    pub fn reference_pixel_count(&self) -> u64 {
        self.reference_px.0 as u64 * self.reference_px.1 as u64
    }

    /// Returns the ground length of one pixel in an image of `width` by `height`.
    ///
    /// Returns `None` for an empty image.
    pub fn scaled_for(&self, width: u32, height: u32) -> Option<Length> {
        let pixel_count = width as u64 * height as u64;
        if pixel_count == 0 {
            return None;
        }

        let ratio = self.reference_pixel_count() as f64 / pixel_count as f64;
        Some(Length::new::<centimeter>(self.cm_per_px * ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::length::meter;

    #[rstest]
    #[case(4056, 3040, 126.48)]
    #[case(2028, 1520, 505.92)]
    #[case(2028, 3040, 252.96)]
    fn scales_by_pixel_count(#[case] width: u32, #[case] height: u32, #[case] meters: f64) {
        let gsd = GroundSampleDistance::new(12_648.0, (4056, 3040));
        assert_relative_eq!(
            gsd.scaled_for(width, height)
                .expect("image is not empty")
                .get::<meter>(),
            meters,
            max_relative = 1e-12
        );
    }

    #[test]
    fn empty_image() {
        let gsd = GroundSampleDistance::new(12_648.0, (4056, 3040));
        assert_eq!(gsd.scaled_for(0, 3040), None);
    }
}
