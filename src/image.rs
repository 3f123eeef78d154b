use chrono::{DateTime, Utc};
use sguaba::systems::Wgs84;

/// Metadata of a single captured photograph.
///
/// Produced by whatever reads the capture's metadata. The estimators only
/// ever borrow an `Image`.
#[derive(Clone, Debug)]
pub struct Image {
    /// Sequence number assigned at capture.
    id: u64,

    /// UTC time the photograph was taken.
    timestamp: DateTime<Utc>,

    /// Geotag of the platform at capture, if the metadata carried one.
    position: Option<Wgs84>,

    width: u32,
    height: u32,
}

impl Image {
    /// Creates an `Image` without a geotag.
    pub fn new(id: u64, timestamp: DateTime<Utc>, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp,
            position: None,
            width,
            height,
        }
    }

    /// Returns the `Image` with `position` attached as its geotag.
    pub fn with_position(mut self, position: Wgs84) -> Self {
        self.position = Some(position);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn position(&self) -> Option<&Wgs84> {
        self.position.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
