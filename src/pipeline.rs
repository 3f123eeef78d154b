use crate::{
    aggregate::PopulationAggregator,
    combine::{ChannelContribution, ConfidenceCombiner, FinalEstimate},
    config::{ConfigError, PipelineConfig},
    error::EstimateError,
    estimator::{Channel, GeotagEstimator, MatchEstimator, Sample},
    image::Image,
    matcher::FeatureMatcher,
    matches::MatchPopulation,
};
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use uom::si::velocity::{kilometer_per_second, meter_per_second};

/// Where a [`SpeedPipeline`] is within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// No image has arrived yet.
    Idle,
    AwaitingPair,
    Estimating,
    Aggregating,
    Reporting,

    /// The run is over and further images are ignored.
    Done,
}

/// Every sample collected during a run, per channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleHistory {
    geotag: Vec<Sample>,
    matches: Vec<Sample>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        match sample.channel() {
            Channel::Geotag => self.geotag.push(sample),
            Channel::Match => self.matches.push(sample),
        }
    }

    pub fn channel(&self, channel: Channel) -> &[Sample] {
        match channel {
            Channel::Geotag => &self.geotag,
            Channel::Match => &self.matches,
        }
    }

    pub fn len(&self) -> usize {
        self.geotag.len() + self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both channels' results for one (base, compare) pair.
#[derive(Debug)]
pub struct PairOutcome {
    pub base: u64,
    pub compare: u64,
    pub geotag: Result<Sample, EstimateError>,
    pub matches: Result<Sample, EstimateError>,
}

impl PairOutcome {
    /// The samples that were produced, geotag first.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        [&self.geotag, &self.matches]
            .into_iter()
            .filter_map(|result| result.as_ref().ok().copied())
    }
}

/// What happened when one image was ingested.
#[derive(Debug)]
pub struct TickReport {
    /// Identifier of the new base image.
    pub image: u64,

    /// One outcome per prior image, newest first.
    pub pairs: Vec<PairOutcome>,

    pub estimate: Result<FinalEstimate, EstimateError>,
}

/// Pairs each new image with the ones before it and keeps a running estimate
/// of the platform's speed.
pub struct SpeedPipeline<M> {
    config: PipelineConfig,
    matcher: M,
    geotag: GeotagEstimator,
    matches: MatchEstimator,
    aggregator: PopulationAggregator,
    combiner: ConfidenceCombiner,

    /// The most recent images, oldest first.
    window: VecDeque<Image>,

    history: SampleHistory,
    state: PipelineState,
}

impl<M: FeatureMatcher> SpeedPipeline<M> {
    pub fn new(config: PipelineConfig, matcher: M) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            geotag: GeotagEstimator::from_config(&config),
            matches: MatchEstimator::from_config(&config),
            aggregator: PopulationAggregator::from_config(&config),
            combiner: ConfidenceCombiner::new(),
            window: VecDeque::with_capacity(config.lookbehind + 1),
            history: SampleHistory::new(),
            state: PipelineState::Idle,
            config,
            matcher,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    /// Runs both estimators on one pair without touching the sample history.
    ///
    /// A failing matcher only costs the match sample of this pair.
    pub fn process_pair(&mut self, base: &Image, compare: &Image) -> PairOutcome {
        let geotag = self.geotag.estimate(base, compare);
        let matches = self
            .matcher
            .match_features(base, compare)
            .map_err(EstimateError::from)
            .and_then(|pairs| self.matches.estimate(MatchPopulation::new(pairs), base, compare));

        for (channel, result) in [(Channel::Geotag, &geotag), (Channel::Match, &matches)] {
            if let Err(err) = result {
                warn!(
                    base = base.id(),
                    compare = compare.id(),
                    %channel,
                    "skipping sample: {err}"
                );
            }
        }

        PairOutcome {
            base: base.id(),
            compare: compare.id(),
            geotag,
            matches,
        }
    }

    /// Adds `image` to the run and returns the updated estimate.
    ///
    /// The first image has nothing to be compared against and only fills
    /// the window. Returns `None` for it and for anything after [`finish`].
    ///
    /// [`finish`]: SpeedPipeline::finish
    pub fn ingest(&mut self, image: Image) -> Option<TickReport> {
        match self.state {
            PipelineState::Done => return None,
            PipelineState::Idle => {
                self.push_window(image);
                self.transition(PipelineState::AwaitingPair);
                return None;
            }
            _ => {}
        }

        self.transition(PipelineState::Estimating);
        let prior: Vec<Image> = self.window.iter().rev().cloned().collect();
        info!(
            base = image.id(),
            compare = ?prior.iter().map(Image::id).collect::<Vec<_>>(),
            "comparing"
        );

        let pairs: Vec<PairOutcome> = prior
            .iter()
            .map(|compare| self.process_pair(&image, compare))
            .collect();
        for outcome in &pairs {
            outcome.samples().for_each(|sample| self.history.push(sample));
        }

        self.transition(PipelineState::Aggregating);
        for channel in [Channel::Match, Channel::Geotag] {
            let speeds: Vec<f64> = self
                .history
                .channel(channel)
                .iter()
                .map(|sample| sample.speed().get::<meter_per_second>())
                .collect();
            info!(%channel, speeds_mps = ?speeds, "speeds");
        }
        let estimate = self.current_estimate();

        self.transition(PipelineState::Reporting);
        match &estimate {
            Ok(estimate) => info!(
                speed_kmps = estimate.speed().get::<kilometer_per_second>(),
                "final speed: {estimate}"
            ),
            Err(err) => warn!("no final speed: {err}"),
        }

        let report = TickReport {
            image: image.id(),
            pairs,
            estimate,
        };

        self.push_window(image);
        self.transition(PipelineState::AwaitingPair);
        Some(report)
    }

    fn push_window(&mut self, image: Image) {
        self.window.push_back(image);
        while self.window.len() > self.config.lookbehind {
            self.window.pop_front();
        }
    }

    /// Summarises both channels' histories and combines them.
    pub fn current_estimate(&self) -> Result<FinalEstimate, EstimateError> {
        let contributions = [Channel::Geotag, Channel::Match]
            .into_iter()
            .map(|channel| {
                let summary = match self.aggregator.summarize(self.history.channel(channel)) {
                    Ok(summary) => {
                        info!(
                            %channel,
                            mean_mps = summary.mean().get::<meter_per_second>(),
                            sd_mps = summary.std_dev().get::<meter_per_second>(),
                            rejected = summary.rejected(),
                            "channel total"
                        );
                        Some(summary)
                    }
                    Err(err) => {
                        info!(%channel, "no channel total: {err}");
                        None
                    }
                };
                ChannelContribution { channel, summary }
            })
            .collect();

        self.combiner.combine(contributions)
    }

    /// Ends the run. Later images are ignored.
    pub fn finish(&mut self) {
        self.transition(PipelineState::Done);
    }
}
