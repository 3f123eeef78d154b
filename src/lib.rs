//! Orbital Ground Speed Estimation
//!
//! Estimates the speed of an orbiting platform from a sequence of geotagged
//! photographs. Two independent channels produce speed samples for every
//! image pair: the great-circle distance between geotags, and the pixel
//! displacement of matched features scaled by the ground sample distance.
//! Outliers are rejected per channel and the channels are combined by
//! inverse-variance weighting.

pub mod aggregate;
pub mod camera;
pub mod combine;
pub mod config;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod image;
pub mod matcher;
pub mod matches;
pub mod optic;
pub mod pipeline;
pub mod simulation;
pub mod statistics;

pub mod prelude {
    pub use crate::{
        aggregate::{ChannelSummary, PopulationAggregator},
        camera::{Camera, CaptureError, GroupSelection, ReplayCamera},
        combine::{ChannelContribution, ConfidenceCombiner, FinalEstimate},
        config::{ConfigError, PipelineConfig, ZeroMedianPolicy},
        error::EstimateError,
        estimator::{Channel, GeotagEstimator, MatchEstimator, Sample, haversine},
        filter::GeometricFilter,
        image::Image,
        matcher::{FeatureMatcher, MatchError, RecordedMatcher},
        matches::{CoordinatePair, MatchPopulation},
        optic::GroundSampleDistance,
        pipeline::{PairOutcome, PipelineState, SampleHistory, SpeedPipeline, TickReport},
        simulation::{
            MatchNoise, OrbitParams, OrbitSimulation, SimulatedCamera, SimulatedMatcher,
            SimulationError,
        },
    };
}
